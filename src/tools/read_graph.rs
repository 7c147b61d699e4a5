//! MCP `read_graph` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

/// Parameters for the `read_graph` MCP tool. Takes no arguments.
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ReadGraphParams {}
