//! MCP `add_observations` tool parameter definition.

use rmcp::schemars;
use serde::Deserialize;

use crate::graph::mutate::ObservationDraft;

/// Parameters for the `add_observations` MCP tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddObservationsParams {
    /// Observations to append, grouped by target entity. Every target must
    /// already exist or the whole call fails.
    #[schemars(
        description = "Observations to append, grouped by target entity. Every target must exist."
    )]
    pub observations: Vec<ObservationArg>,
}

/// New observations for one entity.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationArg {
    /// Name of the entity to extend.
    #[schemars(description = "Name of the entity to extend")]
    pub entity_name: String,
    /// Observation strings to append; ones already present are skipped.
    #[schemars(description = "Observation strings to append. Already-present ones are skipped.")]
    pub contents: Vec<String>,
}

impl From<ObservationArg> for ObservationDraft {
    fn from(arg: ObservationArg) -> Self {
        Self {
            entity_name: arg.entity_name,
            contents: arg.contents,
        }
    }
}
