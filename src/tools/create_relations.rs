//! MCP `create_relations` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

use crate::graph::types::Relation;

/// Parameters for the `create_relations` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRelationsParams {
    /// Relations to create; duplicate triples are skipped.
    #[schemars(description = "Relations to create. Duplicate triples are skipped.")]
    pub relations: Vec<RelationArg>,
}

/// One directed, typed relation. Relations should be stated in active voice,
/// e.g. `alice works_at acme`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationArg {
    /// Name of the source entity.
    #[schemars(description = "Name of the source entity")]
    pub from: String,
    /// Name of the target entity.
    #[schemars(description = "Name of the target entity")]
    pub to: String,
    /// Relationship label, e.g. `"works_at"` or `"depends_on"`.
    #[schemars(description = "Relationship label, e.g. 'works_at' or 'depends_on'")]
    pub relation_type: String,
}

impl From<RelationArg> for Relation {
    fn from(arg: RelationArg) -> Self {
        Self {
            from: arg.from,
            to: arg.to,
            relation_type: arg.relation_type,
        }
    }
}
