//! MCP `delete_entities` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

/// Parameters for the `delete_entities` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntitiesParams {
    /// Names of entities to delete. Every relation touching a deleted entity
    /// is removed as well; unknown names are ignored.
    #[schemars(
        description = "Names of entities to delete. Their relations are removed too; unknown names are ignored."
    )]
    pub entity_names: Vec<String>,
}
