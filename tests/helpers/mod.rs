#![allow(dead_code)]

use cairn::graph::mutate::EntityDraft;
use cairn::graph::search::SearchOptions;
use cairn::graph::store::Store;
use cairn::graph::types::Relation;
use tempfile::TempDir;

/// Open a fresh store in a temp directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn test_store() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let store = Store::new(tmp.path().join("memory.jsonl"));
    (tmp, store)
}

pub fn draft(name: &str, entity_type: &str, observations: &[&str]) -> EntityDraft {
    EntityDraft {
        name: name.into(),
        entity_type: entity_type.into(),
        observations: observations.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn relation(from: &str, to: &str, relation_type: &str) -> Relation {
    Relation {
        from: from.into(),
        to: to.into(),
        relation_type: relation_type.into(),
    }
}

pub fn default_options() -> SearchOptions {
    SearchOptions::default()
}

/// Names of the entities in a result graph, in order.
pub fn entity_names(graph: &cairn::graph::types::KnowledgeGraph) -> Vec<&str> {
    graph.entities.iter().map(|e| e.name.as_str()).collect()
}
