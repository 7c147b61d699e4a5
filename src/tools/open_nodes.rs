//! MCP `open_nodes` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

/// Parameters for the `open_nodes` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OpenNodesParams {
    /// Entity names to open. Unknown names are skipped; relations to
    /// neighbors outside the set are included.
    #[schemars(
        description = "Entity names to open. Unknown names are skipped; half-edges to neighbors are included."
    )]
    pub names: Vec<String>,
}
