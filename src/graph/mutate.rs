//! Graph mutations — lock, load, apply, atomically replace.
//!
//! Every mutation runs the same sequence: acquire the cooperative file lock,
//! load the current graph, apply the change in memory, and publish the
//! result with an atomic whole-file rewrite. Mutations that change nothing
//! skip the rewrite. All mutations are idempotent for duplicate inputs.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashSet;

use super::lock::FileLock;
use super::now_millis;
use super::store::Store;
use super::types::{Entity, Relation};

/// A proposed entity from the tool surface, before timestamps are assigned.
#[derive(Debug, Clone)]
pub struct EntityDraft {
    pub name: String,
    pub entity_type: String,
    pub observations: Vec<String>,
}

/// Observations to append to one existing entity.
#[derive(Debug, Clone)]
pub struct ObservationDraft {
    pub entity_name: String,
    pub contents: Vec<String>,
}

/// Observations to remove from one entity.
#[derive(Debug, Clone)]
pub struct ObservationRemoval {
    pub entity_name: String,
    pub observations: Vec<String>,
}

/// Per-target result of an add_observations call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedObservations {
    pub entity_name: String,
    pub added_observations: Vec<String>,
}

/// Create entities that do not exist yet. Existing names (and duplicates
/// within the batch) are silently skipped; returns the actually-added
/// records with both timestamps set to now.
pub fn create_entities(store: &Store, drafts: Vec<EntityDraft>) -> Result<Vec<Entity>> {
    let _lock = FileLock::acquire(&store.lock_path())?;
    let mut graph = store.load()?;

    let mut names: HashSet<String> = graph.entities.iter().map(|e| e.name.clone()).collect();
    let now = now_millis();
    let mut added = Vec::new();

    for draft in drafts {
        if draft.name.is_empty() {
            bail!("entity name must not be empty");
        }
        if !names.insert(draft.name.clone()) {
            tracing::debug!(name = %draft.name, "entity already exists, skipping");
            continue;
        }
        // Duplicate observations within one entity are forbidden.
        let mut observations = Vec::new();
        let mut seen = HashSet::new();
        for observation in draft.observations {
            if seen.insert(observation.clone()) {
                observations.push(observation);
            }
        }
        let entity = Entity {
            name: draft.name,
            entity_type: draft.entity_type,
            observations,
            created_at: Some(now),
            updated_at: Some(now),
        };
        graph.entities.push(entity.clone());
        added.push(entity);
    }

    if !added.is_empty() {
        store.atomic_replace(&graph)?;
        tracing::info!(added = added.len(), "entities created");
    }
    Ok(added)
}

/// Create relations whose triple is not already present. Duplicates are
/// silently skipped; endpoints are not checked for existence.
pub fn create_relations(store: &Store, proposed: Vec<Relation>) -> Result<Vec<Relation>> {
    let _lock = FileLock::acquire(&store.lock_path())?;
    let mut graph = store.load()?;

    let mut existing: HashSet<Relation> = graph.relations.iter().cloned().collect();
    let mut added = Vec::new();

    for relation in proposed {
        if !existing.insert(relation.clone()) {
            tracing::debug!(
                from = %relation.from,
                to = %relation.to,
                relation_type = %relation.relation_type,
                "relation already exists, skipping"
            );
            continue;
        }
        graph.relations.push(relation.clone());
        added.push(relation);
    }

    if !added.is_empty() {
        store.atomic_replace(&graph)?;
        tracing::info!(added = added.len(), "relations created");
    }
    Ok(added)
}

/// Append observations to existing entities.
///
/// Every target must exist — otherwise the whole call fails and nothing is
/// persisted. Observations an entity already carries are skipped;
/// `updated_at` is bumped only when at least one string was appended.
pub fn add_observations(
    store: &Store,
    additions: Vec<ObservationDraft>,
) -> Result<Vec<AddedObservations>> {
    let _lock = FileLock::acquire(&store.lock_path())?;
    let mut graph = store.load()?;

    for addition in &additions {
        if graph.entity(&addition.entity_name).is_none() {
            bail!("entity not found: {}", addition.entity_name);
        }
    }

    let now = now_millis();
    let mut results = Vec::new();
    let mut changed = false;

    for addition in additions {
        let Some(entity) = graph
            .entities
            .iter_mut()
            .find(|e| e.name == addition.entity_name)
        else {
            continue; // unreachable: validated above
        };
        let mut added = Vec::new();
        for observation in addition.contents {
            if entity.observations.contains(&observation) {
                continue;
            }
            entity.observations.push(observation.clone());
            added.push(observation);
        }
        if !added.is_empty() {
            entity.updated_at = Some(now);
            changed = true;
        }
        results.push(AddedObservations {
            entity_name: addition.entity_name,
            added_observations: added,
        });
    }

    if changed {
        store.atomic_replace(&graph)?;
    }
    Ok(results)
}

/// Delete the named entities and every relation touching any of them.
/// Missing names are ignored.
pub fn delete_entities(store: &Store, names: Vec<String>) -> Result<()> {
    let _lock = FileLock::acquire(&store.lock_path())?;
    let mut graph = store.load()?;

    let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
    let entities_before = graph.entities.len();
    let relations_before = graph.relations.len();

    graph.entities.retain(|e| !doomed.contains(e.name.as_str()));
    graph
        .relations
        .retain(|r| !doomed.contains(r.from.as_str()) && !doomed.contains(r.to.as_str()));

    if graph.entities.len() != entities_before || graph.relations.len() != relations_before {
        store.atomic_replace(&graph)?;
        tracing::info!(
            entities = entities_before - graph.entities.len(),
            relations = relations_before - graph.relations.len(),
            "entities deleted"
        );
    }
    Ok(())
}

/// Remove the listed observations from their entities. Missing entities and
/// missing observations are ignored; `updated_at` is bumped only on actual
/// removal.
pub fn delete_observations(store: &Store, deletions: Vec<ObservationRemoval>) -> Result<()> {
    let _lock = FileLock::acquire(&store.lock_path())?;
    let mut graph = store.load()?;

    let now = now_millis();
    let mut changed = false;

    for deletion in deletions {
        let Some(entity) = graph
            .entities
            .iter_mut()
            .find(|e| e.name == deletion.entity_name)
        else {
            continue;
        };
        let doomed: HashSet<&String> = deletion.observations.iter().collect();
        let before = entity.observations.len();
        entity.observations.retain(|o| !doomed.contains(o));
        if entity.observations.len() != before {
            entity.updated_at = Some(now);
            changed = true;
        }
    }

    if changed {
        store.atomic_replace(&graph)?;
    }
    Ok(())
}

/// Remove every relation whose triple is listed. Missing triples are
/// ignored.
pub fn delete_relations(store: &Store, doomed: Vec<Relation>) -> Result<()> {
    let _lock = FileLock::acquire(&store.lock_path())?;
    let mut graph = store.load()?;

    let doomed: HashSet<Relation> = doomed.into_iter().collect();
    let before = graph.relations.len();
    graph.relations.retain(|r| !doomed.contains(r));

    if graph.relations.len() != before {
        store.atomic_replace(&graph)?;
        tracing::info!(relations = before - graph.relations.len(), "relations deleted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path().join("memory.jsonl"));
        (tmp, store)
    }

    fn draft(name: &str, observations: &[&str]) -> EntityDraft {
        EntityDraft {
            name: name.into(),
            entity_type: "test".into(),
            observations: observations.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn relation(from: &str, to: &str, relation_type: &str) -> Relation {
        Relation {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }

    #[test]
    fn create_stamps_timestamps() {
        let (_tmp, store) = test_store();
        let added = create_entities(&store, vec![draft("a", &["fact"])]).unwrap();
        assert_eq!(added.len(), 1);
        assert!(added[0].created_at.is_some());
        assert_eq!(added[0].created_at, added[0].updated_at);
    }

    #[test]
    fn create_is_idempotent() {
        let (_tmp, store) = test_store();
        let first = create_entities(&store, vec![draft("a", &[])]).unwrap();
        assert_eq!(first.len(), 1);

        let second = create_entities(&store, vec![draft("a", &["new fact"])]).unwrap();
        assert!(second.is_empty());

        let graph = store.load().unwrap();
        assert_eq!(graph.entities.len(), 1);
        // the existing record is untouched
        assert!(graph.entities[0].observations.is_empty());
    }

    #[test]
    fn create_dedups_within_batch_and_within_draft() {
        let (_tmp, store) = test_store();
        let added = create_entities(
            &store,
            vec![draft("a", &["x", "x", "y"]), draft("a", &["z"])],
        )
        .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].observations, vec!["x", "y"]);
    }

    #[test]
    fn create_rejects_empty_name() {
        let (_tmp, store) = test_store();
        let err = create_entities(&store, vec![draft("", &[])]).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
        assert!(store.load().unwrap().entities.is_empty());
    }

    #[test]
    fn relations_dedup_on_triple() {
        let (_tmp, store) = test_store();
        let added = create_relations(
            &store,
            vec![
                relation("a", "b", "knows"),
                relation("a", "b", "knows"),
                relation("a", "b", "likes"),
            ],
        )
        .unwrap();
        assert_eq!(added.len(), 2);

        let again = create_relations(&store, vec![relation("a", "b", "likes")]).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.load().unwrap().relations.len(), 2);
    }

    #[test]
    fn add_observations_appends_only_new() {
        let (_tmp, store) = test_store();
        create_entities(&store, vec![draft("a", &["old"])]).unwrap();

        let results = add_observations(
            &store,
            vec![ObservationDraft {
                entity_name: "a".into(),
                contents: vec!["old".into(), "new".into()],
            }],
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].added_observations, vec!["new"]);
        let graph = store.load().unwrap();
        assert_eq!(graph.entities[0].observations, vec!["old", "new"]);
    }

    #[test]
    fn add_observations_noop_does_not_bump_updated_at() {
        let (_tmp, store) = test_store();
        create_entities(&store, vec![draft("a", &["old"])]).unwrap();
        let stamped = store.load().unwrap().entities[0].updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        let results = add_observations(
            &store,
            vec![ObservationDraft {
                entity_name: "a".into(),
                contents: vec!["old".into()],
            }],
        )
        .unwrap();

        assert!(results[0].added_observations.is_empty());
        assert_eq!(store.load().unwrap().entities[0].updated_at, stamped);
    }

    #[test]
    fn add_observations_unknown_target_fails_whole_call() {
        let (_tmp, store) = test_store();
        create_entities(&store, vec![draft("a", &[])]).unwrap();

        let err = add_observations(
            &store,
            vec![
                ObservationDraft {
                    entity_name: "a".into(),
                    contents: vec!["would be applied".into()],
                },
                ObservationDraft {
                    entity_name: "ghost".into(),
                    contents: vec!["whatever".into()],
                },
            ],
        )
        .unwrap_err();

        assert!(err.to_string().contains("entity not found: ghost"));
        // nothing was persisted, not even the valid target
        assert!(store.load().unwrap().entities[0].observations.is_empty());
    }

    #[test]
    fn delete_entities_cascades_to_relations() {
        let (_tmp, store) = test_store();
        create_entities(&store, vec![draft("a", &[]), draft("b", &[]), draft("c", &[])])
            .unwrap();
        create_relations(
            &store,
            vec![
                relation("a", "b", "knows"),
                relation("b", "c", "knows"),
                relation("c", "a", "knows"),
            ],
        )
        .unwrap();

        delete_entities(&store, vec!["a".into(), "ghost".into()]).unwrap();

        let graph = store.load().unwrap();
        assert_eq!(graph.entities.len(), 2);
        assert_eq!(graph.relations, vec![relation("b", "c", "knows")]);
    }

    #[test]
    fn delete_observations_ignores_missing() {
        let (_tmp, store) = test_store();
        create_entities(&store, vec![draft("a", &["keep", "drop"])]).unwrap();

        delete_observations(
            &store,
            vec![
                ObservationRemoval {
                    entity_name: "a".into(),
                    observations: vec!["drop".into(), "never existed".into()],
                },
                ObservationRemoval {
                    entity_name: "ghost".into(),
                    observations: vec!["whatever".into()],
                },
            ],
        )
        .unwrap();

        let graph = store.load().unwrap();
        assert_eq!(graph.entities[0].observations, vec!["keep"]);
    }

    #[test]
    fn delete_relations_removes_listed_triples() {
        let (_tmp, store) = test_store();
        create_relations(
            &store,
            vec![relation("a", "b", "knows"), relation("a", "b", "likes")],
        )
        .unwrap();

        delete_relations(
            &store,
            vec![relation("a", "b", "knows"), relation("x", "y", "ghost")],
        )
        .unwrap();

        let graph = store.load().unwrap();
        assert_eq!(graph.relations, vec![relation("a", "b", "likes")]);
    }

    #[test]
    fn noop_mutation_does_not_rewrite_file() {
        let (_tmp, store) = test_store();
        create_entities(&store, vec![draft("a", &[])]).unwrap();
        let mtime = std::fs::metadata(store.path()).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        delete_entities(&store, vec!["ghost".into()]).unwrap();

        assert_eq!(
            std::fs::metadata(store.path()).unwrap().modified().unwrap(),
            mtime
        );
    }
}
