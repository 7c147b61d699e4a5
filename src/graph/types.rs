//! Core knowledge-graph type definitions.
//!
//! Defines [`Entity`] (a named node with free-text observations),
//! [`Relation`] (a directed typed edge identified by its triple), and
//! [`KnowledgeGraph`] (the full in-memory model).

use serde::{Deserialize, Serialize};

/// A named node in the knowledge graph.
///
/// Entities are identified by their unique, case-sensitive `name`. The
/// timestamps are integer milliseconds since epoch and may be absent on
/// records written by older versions; absent means "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique, non-empty name — the canonical handle for this node.
    pub name: String,
    /// Free-form classification, e.g. `"person"` or `"project"`.
    #[serde(rename = "entityType")]
    pub entity_type: String,
    /// Ordered free-text facts. Duplicates within one entity are forbidden.
    pub observations: Vec<String>,
    /// Set once at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Refreshed whenever the observations change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// A directed, typed edge between two entity names.
///
/// Relations are identified by the full `(from, to, relation_type)` triple;
/// duplicate triples are forbidden. A relation may reference names that have
/// no entity record (no referential check on insert), but deleting an entity
/// removes every relation touching it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

/// The full in-memory graph: entity table plus relation list, both in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl KnowledgeGraph {
    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}
