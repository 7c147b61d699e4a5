//! MCP `delete_relations` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

use super::create_relations::RelationArg;

/// Parameters for the `delete_relations` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteRelationsParams {
    /// Relations to delete, identified by their full triple. Unknown triples
    /// are ignored.
    #[schemars(
        description = "Relations to delete, identified by their full triple. Unknown triples are ignored."
    )]
    pub relations: Vec<RelationArg>,
}
