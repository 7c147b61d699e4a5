//! MCP `delete_observations` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

use crate::graph::mutate::ObservationRemoval;

/// Parameters for the `delete_observations` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteObservationsParams {
    /// Observations to remove, grouped by entity. Unknown entities and
    /// unknown observations are ignored.
    #[schemars(
        description = "Observations to remove, grouped by entity. Unknown targets are ignored."
    )]
    pub deletions: Vec<DeletionArg>,
}

/// Observations to remove from one entity.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletionArg {
    /// Name of the entity to trim.
    #[schemars(description = "Name of the entity to trim")]
    pub entity_name: String,
    /// Exact observation strings to remove.
    #[schemars(description = "Exact observation strings to remove")]
    pub observations: Vec<String>,
}

impl From<DeletionArg> for ObservationRemoval {
    fn from(arg: DeletionArg) -> Self {
        Self {
            entity_name: arg.entity_name,
            observations: arg.observations,
        }
    }
}
