//! Tokenization and derived in-memory indexes.
//!
//! The indexes are derived state: they are rebuilt whole from a loaded graph
//! snapshot and never maintained incrementally. Each process builds its own
//! after every load.

use std::collections::{HashMap, HashSet};

use super::types::{Entity, KnowledgeGraph};

/// Tokens shorter than this are discarded.
const MIN_TOKEN_LEN: usize = 3;

/// Split text into index tokens.
///
/// Lowercases, turns every character that is not a word character
/// (`[A-Za-z0-9_]`), whitespace, or a hyphen into a space, then splits on
/// whitespace and drops short tokens. Hyphens survive inside tokens, so
/// `docker-compose` indexes as one token.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// The searchable text of an entity: name, type, and every observation,
/// space-separated.
pub fn indexed_text(entity: &Entity) -> String {
    let mut text = format!("{} {}", entity.name, entity.entity_type);
    for observation in &entity.observations {
        text.push(' ');
        text.push_str(observation);
    }
    text
}

/// Derived lookup structures over one graph snapshot.
#[derive(Debug, Default)]
pub struct GraphIndex {
    /// Entity name → position in the graph's entity table.
    names: HashMap<String, usize>,
    /// Token → names of entities whose indexed text contains it.
    inverted: HashMap<String, HashSet<String>>,
}

impl GraphIndex {
    /// Build both indexes from scratch.
    pub fn build(graph: &KnowledgeGraph) -> Self {
        let mut index = Self::default();
        for (pos, entity) in graph.entities.iter().enumerate() {
            index.names.insert(entity.name.clone(), pos);
            for token in tokenize(&indexed_text(entity)) {
                index
                    .inverted
                    .entry(token)
                    .or_default()
                    .insert(entity.name.clone());
            }
        }
        index
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Resolve a name back to its entity in the graph this index was built
    /// from.
    pub fn entity<'g>(&self, graph: &'g KnowledgeGraph, name: &str) -> Option<&'g Entity> {
        self.names.get(name).and_then(|&pos| graph.entities.get(pos))
    }

    /// Names of entities whose indexed text contains `token` exactly.
    pub fn candidates(&self, token: &str) -> Option<&HashSet<String>> {
        self.inverted.get(token)
    }
}

/// Relation-endpoint counts per entity name.
///
/// Each relation contributes one to each endpoint independently, so a
/// self-loop counts twice and parallel relations count once each per
/// endpoint.
pub fn degree_map(graph: &KnowledgeGraph) -> HashMap<&str, usize> {
    let mut degrees: HashMap<&str, usize> = HashMap::new();
    for relation in &graph.relations {
        *degrees.entry(relation.from.as_str()).or_insert(0) += 1;
        *degrees.entry(relation.to.as_str()).or_insert(0) += 1;
    }
    degrees
}
