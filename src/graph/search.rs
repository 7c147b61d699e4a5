//! Context search — scoring, entry selection, and connecting-path discovery.
//!
//! The pipeline: tokenize the query, score each term's candidates from the
//! inverted index, pick one diverse entry node per term, connect the entries
//! with centrality-weighted shortest paths (a pairwise Steiner-tree
//! approximation), cap the node count, and return the induced subgraph.
//! High-degree hubs are expensive to route through, so connecting paths
//! prefer quiet intermediate nodes.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::index::{degree_map, indexed_text, tokenize, GraphIndex};
use super::types::{Entity, KnowledgeGraph};

/// Tuning knobs for the context-search pipeline.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Max distinct entities selected per query term.
    pub top_per_token: usize,
    /// Per-term cutoff as a fraction of that term's top score.
    pub min_relative_score: f64,
    /// Hop cap for pairwise connecting paths.
    pub max_path_length: usize,
    /// Cap on nodes returned by a search.
    pub max_total_nodes: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_per_token: 1,
            min_relative_score: 0.3,
            max_path_length: 5,
            max_total_nodes: 50,
        }
    }
}

/// Window of the exponential recency decay.
const RECENCY_WINDOW_MS: f64 = 30.0 * 24.0 * 3600.0 * 1000.0;

/// Run a context search over a graph snapshot.
///
/// Returns the minimal connected subgraph for `query`: entry nodes first,
/// then the intermediates needed to connect them, with every returned
/// relation closed over the returned entities.
pub fn search_nodes(
    graph: &KnowledgeGraph,
    query: &str,
    options: &SearchOptions,
    now_ms: i64,
) -> KnowledgeGraph {
    let index = GraphIndex::build(graph);
    let degrees = degree_map(graph);

    let entries = select_entries(graph, &index, &degrees, query, options, now_ms);
    tracing::debug!(query, entries = entries.len(), "entry selection complete");
    if entries.is_empty() {
        return KnowledgeGraph::default();
    }

    let connected = connect_entries(graph, &degrees, &entries, options.max_path_length);
    let selected = cap_nodes(&entries, &connected, options.max_total_nodes);
    induced_subgraph(graph, &index, &selected)
}

/// Return the named entities (unknown names silently skipped) and every
/// relation with at least one endpoint in the requested name set — a one-hop
/// neighborhood view, unlike [`search_nodes`] which closes relations over
/// its result.
pub fn open_nodes(graph: &KnowledgeGraph, names: &[String]) -> KnowledgeGraph {
    let requested: HashSet<&str> = names.iter().map(String::as_str).collect();
    let entities: Vec<Entity> = graph
        .entities
        .iter()
        .filter(|e| requested.contains(e.name.as_str()))
        .cloned()
        .collect();
    let relations = graph
        .relations
        .iter()
        .filter(|r| requested.contains(r.from.as_str()) || requested.contains(r.to.as_str()))
        .cloned()
        .collect();
    KnowledgeGraph { entities, relations }
}

// ── Scoring and entry selection ───────────────────────────────────────────────

/// Query terms in order, de-duplicated on first occurrence.
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Score one candidate entity for one query term.
///
/// Term frequency is a substring count over the concatenated lowercased
/// text — deliberately looser than the exact-token candidate lookup, so
/// `container` also counts its occurrences inside `containerization`.
fn score_entity(entity: &Entity, term: &str, degree: usize, now_ms: i64) -> f64 {
    let text = indexed_text(entity).to_lowercase();
    let occurrences = text.matches(term).count();
    let tf = 1.0 + (1.0 + occurrences as f64).ln();

    let observations = entity.observations.len() as f64;
    let importance = (observations + 1.0).ln() * (1.0 + (1.0 + degree as f64).ln());

    let recency = match entity.updated_at {
        Some(updated) => (-((now_ms - updated) as f64) / RECENCY_WINDOW_MS).exp(),
        None => 1.0,
    };

    tf * importance * recency
}

/// Pick the entry set: per term, rank candidates, cut below the relative
/// threshold, and take up to `top_per_token` entities no earlier term
/// already claimed.
fn select_entries(
    graph: &KnowledgeGraph,
    index: &GraphIndex,
    degrees: &HashMap<&str, usize>,
    query: &str,
    options: &SearchOptions,
    now_ms: i64,
) -> Vec<String> {
    let mut chosen = HashSet::new();
    let mut entries = Vec::new();

    for term in query_terms(query) {
        let Some(candidates) = index.candidates(&term) else {
            continue;
        };

        let mut scored: Vec<(&str, f64)> = candidates
            .iter()
            .filter_map(|name| {
                let entity = index.entity(graph, name)?;
                let degree = degrees.get(name.as_str()).copied().unwrap_or(0);
                Some((name.as_str(), score_entity(entity, &term, degree, now_ms)))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let Some(&(_, best)) = scored.first() else {
            continue;
        };
        let cutoff = best * options.min_relative_score;

        let mut taken = 0;
        for (name, score) in scored {
            if taken >= options.top_per_token || score < cutoff {
                break;
            }
            if chosen.insert(name.to_string()) {
                entries.push(name.to_string());
                taken += 1;
            }
        }
    }

    entries
}

// ── Weighted shortest paths ───────────────────────────────────────────────────

/// Cost of stepping onto a node: hubs are expensive to route through.
fn entry_cost(degrees: &HashMap<&str, usize>, name: &str) -> f64 {
    1.0 + (1.0 + degrees.get(name).copied().unwrap_or(0) as f64).ln()
}

/// Undirected adjacency over the relation list. Names that exist only as
/// relation endpoints still appear here; they are filtered out of the final
/// result because they have no entity record.
fn adjacency(graph: &KnowledgeGraph) -> HashMap<&str, Vec<&str>> {
    let mut adjacent: HashMap<&str, Vec<&str>> = HashMap::new();
    for relation in &graph.relations {
        adjacent
            .entry(relation.from.as_str())
            .or_default()
            .push(relation.to.as_str());
        adjacent
            .entry(relation.to.as_str())
            .or_default()
            .push(relation.from.as_str());
    }
    adjacent
}

/// Min-heap frontier entry. `BinaryHeap` is a max-heap, so the ordering is
/// reversed on cost; equal costs fall back to name order for determinism.
struct Frontier<'a> {
    cost: f64,
    node: &'a str,
}

impl PartialEq for Frontier<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier<'_> {}

impl PartialOrd for Frontier<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(self.node))
    }
}

/// Dijkstra from `source` to `target` with the hub-penalizing node cost.
///
/// Relations are traversed in either direction. Returns the node sequence
/// including both endpoints, or `None` when `target` is unreachable or the
/// cheapest path exceeds `max_hops` edges.
fn shortest_path<'a>(
    adjacent: &HashMap<&'a str, Vec<&'a str>>,
    degrees: &HashMap<&str, usize>,
    source: &'a str,
    target: &'a str,
    max_hops: usize,
) -> Option<Vec<&'a str>> {
    if source == target {
        return Some(vec![source]);
    }

    let mut dist: HashMap<&str, f64> = HashMap::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(source, 0.0);
    heap.push(Frontier {
        cost: 0.0,
        node: source,
    });

    while let Some(Frontier { cost, node }) = heap.pop() {
        if node == target {
            break;
        }
        if cost > dist.get(node).copied().unwrap_or(f64::INFINITY) {
            continue; // outdated frontier entry
        }
        let Some(neighbors) = adjacent.get(node) else {
            continue;
        };
        for &next in neighbors {
            let candidate = cost + entry_cost(degrees, next);
            if candidate < dist.get(next).copied().unwrap_or(f64::INFINITY) {
                dist.insert(next, candidate);
                parent.insert(next, node);
                heap.push(Frontier {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }

    if !parent.contains_key(target) {
        return None;
    }
    let mut path = vec![target];
    let mut cursor = target;
    while let Some(&prev) = parent.get(cursor) {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();

    if path.len() - 1 > max_hops {
        return None;
    }
    Some(path)
}

// ── Steiner approximation and final selection ────────────────────────────────

/// Connect the entry set: for every unordered entry pair, add the nodes on
/// the weighted shortest path (when one exists within the hop cap). Entries
/// come first; intermediates follow in discovery order.
fn connect_entries(
    graph: &KnowledgeGraph,
    degrees: &HashMap<&str, usize>,
    entries: &[String],
    max_hops: usize,
) -> Vec<String> {
    let mut connected: Vec<String> = entries.to_vec();
    if entries.len() <= 1 {
        return connected;
    }

    let adjacent = adjacency(graph);
    let mut seen: HashSet<String> = entries.iter().cloned().collect();

    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            let Some(path) = shortest_path(&adjacent, degrees, a, b, max_hops) else {
                continue;
            };
            for node in path {
                if seen.insert(node.to_string()) {
                    connected.push(node.to_string());
                }
            }
        }
    }
    connected
}

/// Cap the connected set without ever truncating entries. `connected` starts
/// with the entries, so taking a prefix keeps them plus the earliest
/// intermediates; when the entries alone exceed the cap they are all kept
/// and no intermediate is.
fn cap_nodes(entries: &[String], connected: &[String], max_total: usize) -> Vec<String> {
    if connected.len() <= max_total {
        return connected.to_vec();
    }
    if entries.len() >= max_total {
        return entries.to_vec();
    }
    connected[..max_total].to_vec()
}

/// Materialize the result: entities in selection order (names without an
/// entity record are dropped), relations with both endpoints among the
/// returned entities, in store order.
fn induced_subgraph(
    graph: &KnowledgeGraph,
    index: &GraphIndex,
    names: &[String],
) -> KnowledgeGraph {
    let mut entities = Vec::new();
    for name in names {
        if let Some(entity) = index.entity(graph, name) {
            entities.push(entity.clone());
        }
    }
    let kept: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let relations = graph
        .relations
        .iter()
        .filter(|r| kept.contains(r.from.as_str()) && kept.contains(r.to.as_str()))
        .cloned()
        .collect();
    KnowledgeGraph { entities, relations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::Relation;

    fn entity(name: &str, observations: &[&str]) -> Entity {
        Entity {
            name: name.into(),
            entity_type: "test".into(),
            observations: observations.iter().map(|s| s.to_string()).collect(),
            created_at: Some(0),
            updated_at: None,
        }
    }

    fn relation(from: &str, to: &str) -> Relation {
        Relation {
            from: from.into(),
            to: to.into(),
            relation_type: "linked".into(),
        }
    }

    const DAY_MS: i64 = 24 * 3600 * 1000;

    #[test]
    fn query_terms_dedup_preserves_order() {
        assert_eq!(
            query_terms("docker scope docker timeline"),
            vec!["docker", "scope", "timeline"]
        );
    }

    #[test]
    fn substring_tf_counts_inside_longer_tokens() {
        let e = entity("notes", &["containerization with containers"]);
        let with_hits = score_entity(&e, "container", 0, 0);
        let without = score_entity(&entity("notes", &["nothing relevant"]), "container", 0, 0);
        assert!(with_hits > without);
    }

    #[test]
    fn recency_decay_prefers_fresh_entities() {
        let now = 100 * DAY_MS;
        let mut fresh = entity("fresh", &["alpha"]);
        fresh.updated_at = Some(now);
        let mut old = entity("old", &["alpha"]);
        old.updated_at = Some(now - 60 * DAY_MS);

        let fresh_score = score_entity(&fresh, "alpha", 0, now);
        let old_score = score_entity(&old, "alpha", 0, now);
        assert!(fresh_score > old_score);
        // exp(-2) ≈ 0.135 of the fresh score
        assert!(old_score / fresh_score < 0.3);
    }

    #[test]
    fn unknown_timestamp_means_no_decay() {
        let no_stamp = entity("legacy", &["alpha"]);
        let mut fresh = entity("fresh", &["alpha"]);
        fresh.updated_at = Some(50 * DAY_MS);
        assert_eq!(
            score_entity(&no_stamp, "alpha", 0, 50 * DAY_MS),
            score_entity(&fresh, "alpha", 0, 50 * DAY_MS)
        );
    }

    #[test]
    fn degree_raises_importance() {
        let e = entity("svc", &["alpha"]);
        assert!(score_entity(&e, "alpha", 10, 0) > score_entity(&e, "alpha", 0, 0));
    }

    #[test]
    fn entries_are_deduplicated_across_terms() {
        // One entity matches both terms; a second entity matches only the
        // second term. The first term claims the shared entity, so the
        // second term falls through to its other candidate.
        let graph = KnowledgeGraph {
            entities: vec![
                entity("both", &["alpha beta", "alpha again"]),
                entity("only-beta", &["beta beta beta"]),
            ],
            relations: vec![],
        };
        let index = GraphIndex::build(&graph);
        let degrees = degree_map(&graph);
        let entries = select_entries(
            &graph,
            &index,
            &degrees,
            "alpha beta",
            &SearchOptions::default(),
            0,
        );
        assert_eq!(entries, vec!["both", "only-beta"]);
    }

    #[test]
    fn relative_cutoff_discards_weak_candidates() {
        let graph = KnowledgeGraph {
            entities: vec![
                // many matches and observations: strong
                entity("strong", &["alpha alpha alpha", "alpha alpha", "alpha"]),
                // single match, single observation: weak
                entity("weak", &["alpha"]),
            ],
            relations: vec![],
        };
        let index = GraphIndex::build(&graph);
        let degrees = degree_map(&graph);
        let options = SearchOptions {
            top_per_token: 5,
            ..SearchOptions::default()
        };
        let entries = select_entries(&graph, &index, &degrees, "alpha", &options, 0);
        assert_eq!(entries, vec!["strong"]);
    }

    #[test]
    fn dijkstra_routes_around_hubs() {
        // a—hub—b and a—quiet—b, with the hub inflated by extra edges.
        let mut relations = vec![
            relation("a", "hub"),
            relation("hub", "b"),
            relation("a", "quiet"),
            relation("quiet", "b"),
        ];
        for i in 0..20 {
            relations.push(relation("hub", &format!("filler-{i}")));
        }
        let graph = KnowledgeGraph {
            entities: vec![],
            relations,
        };
        let degrees = degree_map(&graph);
        let adjacent = adjacency(&graph);

        let path = shortest_path(&adjacent, &degrees, "a", "b", 5).unwrap();
        assert_eq!(path, vec!["a", "quiet", "b"]);
    }

    #[test]
    fn hop_cap_rejects_long_paths() {
        let relations = (0..7)
            .map(|i| relation(&format!("n{i}"), &format!("n{}", i + 1)))
            .collect();
        let graph = KnowledgeGraph {
            entities: vec![],
            relations,
        };
        let degrees = degree_map(&graph);
        let adjacent = adjacency(&graph);

        assert!(shortest_path(&adjacent, &degrees, "n0", "n7", 5).is_none());
        assert!(shortest_path(&adjacent, &degrees, "n0", "n5", 5).is_some());
    }

    #[test]
    fn trivial_path_is_single_node() {
        let graph = KnowledgeGraph::default();
        let degrees = degree_map(&graph);
        let adjacent = adjacency(&graph);
        assert_eq!(
            shortest_path(&adjacent, &degrees, "a", "a", 5),
            Some(vec!["a"])
        );
    }

    #[test]
    fn disconnected_target_has_no_path() {
        let graph = KnowledgeGraph {
            entities: vec![],
            relations: vec![relation("a", "b")],
        };
        let degrees = degree_map(&graph);
        let adjacent = adjacency(&graph);
        assert!(shortest_path(&adjacent, &degrees, "a", "z", 5).is_none());
    }

    #[test]
    fn cap_never_truncates_entries() {
        let entries: Vec<String> = (0..4).map(|i| format!("e{i}")).collect();
        let mut connected = entries.clone();
        connected.extend((0..10).map(|i| format!("mid{i}")));

        let capped = cap_nodes(&entries, &connected, 6);
        assert_eq!(capped.len(), 6);
        assert_eq!(&capped[..4], &entries[..]);

        // entries alone over the cap: all kept, no intermediates
        let capped = cap_nodes(&entries, &connected, 3);
        assert_eq!(capped, entries);
    }

    #[test]
    fn search_empty_graph_returns_empty() {
        let graph = KnowledgeGraph::default();
        let result = search_nodes(&graph, "anything", &SearchOptions::default(), 0);
        assert!(result.entities.is_empty());
        assert!(result.relations.is_empty());
    }

    #[test]
    fn dangling_endpoints_never_reach_the_result() {
        // "ghost" exists only as a relation endpoint; the path a—ghost—b is
        // the only connection, so the result keeps the entries but no
        // relation may reference the missing record.
        let graph = KnowledgeGraph {
            entities: vec![entity("a", &["alpha"]), entity("b", &["beta"])],
            relations: vec![relation("a", "ghost"), relation("ghost", "b")],
        };
        let result = search_nodes(&graph, "alpha beta", &SearchOptions::default(), 0);

        let names: Vec<&str> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(result.relations.is_empty());
    }

    #[test]
    fn open_nodes_includes_half_edges() {
        let graph = KnowledgeGraph {
            entities: vec![entity("a", &[]), entity("b", &[]), entity("c", &[])],
            relations: vec![relation("a", "b"), relation("b", "c")],
        };
        let result = open_nodes(&graph, &["a".into(), "ghost".into()]);

        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "a");
        // the a—b half-edge is included, b—c is not
        assert_eq!(result.relations, vec![relation("a", "b")]);
    }
}
