//! MCP `create_entities` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

use crate::graph::mutate::EntityDraft;

/// Parameters for the `create_entities` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateEntitiesParams {
    /// Entities to create; existing names are skipped.
    #[schemars(description = "Entities to create. Names that already exist are skipped.")]
    pub entities: Vec<EntityArg>,
}

/// One proposed entity.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityArg {
    /// Unique, case-sensitive name of the entity.
    #[schemars(description = "Unique, case-sensitive name of the entity")]
    pub name: String,
    /// Classification, e.g. `"person"`, `"project"`, `"event"`.
    #[schemars(description = "Classification of the entity, e.g. 'person' or 'project'")]
    pub entity_type: String,
    /// Free-text facts attached to the entity.
    #[schemars(description = "Free-text facts attached to the entity")]
    pub observations: Vec<String>,
}

impl From<EntityArg> for EntityDraft {
    fn from(arg: EntityArg) -> Self {
        Self {
            name: arg.name,
            entity_type: arg.entity_type,
            observations: arg.observations,
        }
    }
}
