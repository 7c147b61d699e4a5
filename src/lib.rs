//! Persistent knowledge-graph memory for AI agents — served over MCP.
//!
//! Cairn stores a labeled multigraph of named entities (typed nodes with
//! free-text observations) and directed, typed relations between them, in a
//! single line-delimited JSON file. Its distinguishing operation is a
//! *context search*: given a free-text query it returns a minimal connected
//! subgraph — one semantically strong entry node per query term, plus only
//! the intermediate nodes needed to connect them, routed to avoid
//! high-degree hubs.
//!
//! # Architecture
//!
//! - **Storage**: one JSONL file, rewritten whole and published by atomic
//!   rename; writers serialize through a cooperative lock file with stale
//!   recovery, readers never lock
//! - **Search**: tokenized inverted index, per-term scoring (sublinear term
//!   frequency × importance × recency decay), and centrality-weighted
//!   shortest paths composed into a Steiner-tree approximation
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP/SSE
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`graph`] — Core graph engine: store, lock, indexes, mutations, and search

pub mod config;
pub mod graph;
