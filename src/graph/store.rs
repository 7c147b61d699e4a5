//! Single-file JSONL persistence with atomic whole-file replacement.
//!
//! The store file holds one JSON object per line, discriminated by a `type`
//! field of `"entity"` or `"relation"`. Every save rewrites the whole file:
//! content is written to a sibling `<file>.tmp.<writer-id>` and renamed over
//! the live path, so readers only ever observe a complete version. There is
//! no in-process caching — [`Store::load`] always reads the file.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{Entity, KnowledgeGraph, Relation};

/// One line of the store file, on the way in.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Record {
    Entity(Entity),
    Relation(Relation),
}

/// One line of the store file, on the way out. Borrows so a save never
/// clones the graph.
#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RecordRef<'a> {
    Entity(&'a Entity),
    Relation(&'a Relation),
}

/// Handle on the persisted graph file.
pub struct Store {
    path: PathBuf,
    /// Disambiguates temp files when several writers race on one store.
    writer_id: String,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer_id: uuid::Uuid::now_v7().simple().to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the sibling lock file coordinating writers on this store.
    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.path, ".lock")
    }

    /// Read the complete graph from disk.
    ///
    /// An absent file is an empty graph. Blank lines are tolerated; any line
    /// that does not parse aborts the load with its line number.
    pub fn load(&self) -> Result<KnowledgeGraph> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(KnowledgeGraph::default())
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read store {}", self.path.display()))
            }
        };

        let mut graph = KnowledgeGraph::default();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(line).with_context(|| {
                format!(
                    "malformed record at line {} of {}",
                    lineno + 1,
                    self.path.display()
                )
            })?;
            match record {
                Record::Entity(entity) => graph.entities.push(entity),
                Record::Relation(relation) => graph.relations.push(relation),
            }
        }
        Ok(graph)
    }

    /// Atomically publish a new version of the graph.
    ///
    /// Entity lines precede relation lines, each group in insertion order.
    /// The content is written to a writer-specific temp file and renamed over
    /// the live path; on POSIX that rename is atomic for sibling paths, so a
    /// concurrent reader sees either the old file or the new one, never a
    /// partial write.
    pub fn atomic_replace(&self, graph: &KnowledgeGraph) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create store directory {}", parent.display())
                })?;
            }
        }

        let mut out = String::new();
        for entity in &graph.entities {
            out.push_str(&serde_json::to_string(&RecordRef::Entity(entity))?);
            out.push('\n');
        }
        for relation in &graph.relations {
            out.push_str(&serde_json::to_string(&RecordRef::Relation(relation))?);
            out.push('\n');
        }

        let tmp = sibling(&self.path, &format!(".tmp.{}", self.writer_id));
        if let Err(e) = fs::write(&tmp, &out) {
            // Abandon the partial temp file; the live file is untouched.
            let _ = fs::remove_file(&tmp);
            return Err(e)
                .with_context(|| format!("failed to write temp store {}", tmp.display()));
        }
        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "failed to publish {} over {}",
                tmp.display(),
                self.path.display()
            )
        })?;

        tracing::debug!(
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            store = %self.path.display(),
            "store replaced"
        );
        Ok(())
    }
}

/// Append a suffix to a path's final component, e.g. `memory.jsonl` →
/// `memory.jsonl.lock`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
