pub mod add_observations;
pub mod create_entities;
pub mod create_relations;
pub mod delete_entities;
pub mod delete_observations;
pub mod delete_relations;
pub mod open_nodes;
pub mod read_graph;
pub mod search_nodes;

use add_observations::AddObservationsParams;
use create_entities::CreateEntitiesParams;
use create_relations::CreateRelationsParams;
use delete_entities::DeleteEntitiesParams;
use delete_observations::DeleteObservationsParams;
use delete_relations::DeleteRelationsParams;
use open_nodes::OpenNodesParams;
use read_graph::ReadGraphParams;
use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_nodes::SearchNodesParams;
use std::future::Future;
use std::sync::Arc;

use crate::config::CairnConfig;
use crate::graph::search::SearchOptions;
use crate::graph::store::Store;
use crate::graph::{mutate, now_millis, search};

/// The cairn MCP tool handler. Holds shared state (store handle, config) and
/// exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct CairnTools {
    tool_router: ToolRouter<Self>,
    store: Arc<Store>,
    config: Arc<CairnConfig>,
}

impl CairnTools {
    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_per_token: self.config.search.top_per_token,
            min_relative_score: self.config.search.min_relative_score,
            max_path_length: self.config.search.max_path_length,
            max_total_nodes: self.config.search.max_total_nodes,
        }
    }
}

#[tool_router]
impl CairnTools {
    pub fn new(store: Arc<Store>, config: Arc<CairnConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            config,
        }
    }

    /// Create new entities in the knowledge graph.
    #[tool(description = "Create multiple new entities in the knowledge graph. Existing names are skipped. Returns the entities actually added.")]
    async fn create_entities(
        &self,
        Parameters(params): Parameters<CreateEntitiesParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.entities.len(), "create_entities called");

        let store = Arc::clone(&self.store);
        let drafts = params.entities.into_iter().map(Into::into).collect();
        let added = tokio::task::spawn_blocking(move || mutate::create_entities(&store, drafts))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("create_entities failed: {e}"))?;

        serde_json::to_string(&added).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Create new relations between entities.
    #[tool(description = "Create multiple new relations between entities. Relations should be in active voice, e.g. 'alice works_at acme'. Duplicate triples are skipped.")]
    async fn create_relations(
        &self,
        Parameters(params): Parameters<CreateRelationsParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.relations.len(), "create_relations called");

        let store = Arc::clone(&self.store);
        let proposed = params.relations.into_iter().map(Into::into).collect();
        let added = tokio::task::spawn_blocking(move || mutate::create_relations(&store, proposed))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("create_relations failed: {e}"))?;

        serde_json::to_string(&added).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Append observations to existing entities.
    #[tool(description = "Add new observations to existing entities. Fails if any target entity does not exist. Returns the observations actually added per entity.")]
    async fn add_observations(
        &self,
        Parameters(params): Parameters<AddObservationsParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.observations.len(), "add_observations called");

        let store = Arc::clone(&self.store);
        let additions = params.observations.into_iter().map(Into::into).collect();
        let results = tokio::task::spawn_blocking(move || mutate::add_observations(&store, additions))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("add_observations failed: {e}"))?;

        serde_json::to_string(&results).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Delete entities and their relations.
    #[tool(description = "Delete entities and every relation touching them. Unknown names are ignored.")]
    async fn delete_entities(
        &self,
        Parameters(params): Parameters<DeleteEntitiesParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.entity_names.len(), "delete_entities called");

        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || mutate::delete_entities(&store, params.entity_names))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("delete_entities failed: {e}"))?;

        Ok("Entities deleted successfully".into())
    }

    /// Remove observations from entities.
    #[tool(description = "Delete specific observations from entities. Unknown entities and observations are ignored.")]
    async fn delete_observations(
        &self,
        Parameters(params): Parameters<DeleteObservationsParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.deletions.len(), "delete_observations called");

        let store = Arc::clone(&self.store);
        let deletions = params.deletions.into_iter().map(Into::into).collect();
        tokio::task::spawn_blocking(move || mutate::delete_observations(&store, deletions))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("delete_observations failed: {e}"))?;

        Ok("Observations deleted successfully".into())
    }

    /// Delete relations by triple.
    #[tool(description = "Delete relations identified by their (from, to, relationType) triple. Unknown triples are ignored.")]
    async fn delete_relations(
        &self,
        Parameters(params): Parameters<DeleteRelationsParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.relations.len(), "delete_relations called");

        let store = Arc::clone(&self.store);
        let doomed = params.relations.into_iter().map(Into::into).collect();
        tokio::task::spawn_blocking(move || mutate::delete_relations(&store, doomed))
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("delete_relations failed: {e}"))?;

        Ok("Relations deleted successfully".into())
    }

    /// Read the entire graph.
    #[tool(description = "Read the entire knowledge graph: all entities and relations.")]
    async fn read_graph(
        &self,
        Parameters(_params): Parameters<ReadGraphParams>,
    ) -> Result<String, String> {
        tracing::info!("read_graph called");

        let store = Arc::clone(&self.store);
        let graph = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| format!("task failed: {e}"))?
            .map_err(|e| format!("read_graph failed: {e}"))?;

        serde_json::to_string(&graph).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Context search over the graph.
    #[tool(description = "Search the graph with a free-text query. Returns one strong entry node per query term plus the minimal connecting subgraph, avoiding high-degree hubs.")]
    async fn search_nodes(
        &self,
        Parameters(params): Parameters<SearchNodesParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "search_nodes called");

        let store = Arc::clone(&self.store);
        let options = self.search_options();
        let result = tokio::task::spawn_blocking(move || {
            let graph = store.load()?;
            anyhow::Ok(search::search_nodes(
                &graph,
                &params.query,
                &options,
                now_millis(),
            ))
        })
        .await
        .map_err(|e| format!("task failed: {e}"))?
        .map_err(|e| format!("search_nodes failed: {e}"))?;

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Open specific nodes with their neighborhoods.
    #[tool(description = "Open specific entities by name. Unknown names are skipped; relations to neighbors outside the set are included.")]
    async fn open_nodes(
        &self,
        Parameters(params): Parameters<OpenNodesParams>,
    ) -> Result<String, String> {
        tracing::info!(count = params.names.len(), "open_nodes called");

        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || {
            let graph = store.load()?;
            anyhow::Ok(search::open_nodes(&graph, &params.names))
        })
        .await
        .map_err(|e| format!("task failed: {e}"))?
        .map_err(|e| format!("open_nodes failed: {e}"))?;

        serde_json::to_string(&result).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for CairnTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Cairn is a knowledge-graph memory server. Use create_entities, \
                 create_relations, and add_observations to record knowledge; \
                 search_nodes to retrieve a connected subgraph for a query; \
                 open_nodes to inspect specific entities with their neighborhoods."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
