//! MCP `search_nodes` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

/// Parameters for the `search_nodes` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchNodesParams {
    /// Free-text query. Each term seeds one entry node; the result is the
    /// subgraph connecting them.
    #[schemars(
        description = "Free-text query. Each term seeds one entry node; the result is the subgraph connecting them."
    )]
    pub query: String,
}
