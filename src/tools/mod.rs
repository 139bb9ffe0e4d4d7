pub mod delete;
pub mod retrieve;
pub mod store;
pub mod summarize;
pub mod update;

use delete::MemoryDeleteParams;
use retrieve::MemoryRetrieveParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{
    AnnotateAble, ListResourcesResult, PaginatedRequestParam, RawResource,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use store::MemoryStoreParams;
use summarize::MemorySummarizeParams;
use update::MemoryUpdateParams;

use crate::engine::{MemoryEngine, ReturnType};
use crate::response::{Envelope, ErrorKind};
use crate::summarizer::{SummaryKind, SummaryLength};

const DOCS_AGENTS: &str = include_str!("../../docs/agents.md");
const DOCS_README: &str = include_str!("../../docs/readme.md");
const DOCS_SCHEMA: &str = include_str!("../../docs/schema.md");
const DOCS_ROADMAP: &str = include_str!("../../docs/roadmap.md");

/// Parameters for the `memory_initialize` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryInitializeParams {
    /// Whether to wipe and recreate existing memory. Defaults to `false`.
    #[schemars(description = "Whether to reset existing memory. Defaults to false.")]
    pub reset: Option<bool>,
}

/// Parameters for the `memory_delete_empty_topic` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteEmptyTopicParams {
    /// Name of the topic to delete if it holds no memories.
    #[schemars(description = "Name of the topic to delete if it has no memory items")]
    pub topic_name: String,
}

/// The memory MCP tool handler. Holds the engine and exposes all tools via
/// the `#[tool_router]` macro. Every tool serializes an envelope (or a list)
/// to JSON — engine operations never fail at this boundary.
#[derive(Clone)]
pub struct MemoryTools {
    tool_router: ToolRouter<Self>,
    engine: Arc<MemoryEngine>,
}

fn to_json(value: impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string(&value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl MemoryTools {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
        }
    }

    /// Initialize or reset the memory system databases.
    #[tool(description = "Initialize or reset the memory system databases. With reset=true, wipes and recreates both stores.")]
    async fn memory_initialize(
        &self,
        Parameters(params): Parameters<MemoryInitializeParams>,
    ) -> Result<String, String> {
        let reset = params.reset.unwrap_or(false);
        tracing::info!(reset, "memory_initialize called");
        to_json(self.engine.initialize(reset))
    }

    /// Store new information in the persistent memory system.
    #[tool(description = "Store new information in persistent memory under a topic, with optional tags. A default summary is generated based on content size.")]
    async fn memory_store(
        &self,
        Parameters(params): Parameters<MemoryStoreParams>,
    ) -> Result<String, String> {
        tracing::info!(
            content_len = params.content.len(),
            topic = %params.topic,
            "memory_store called"
        );
        let tags = params.tags.unwrap_or_default();
        to_json(self.engine.store(&params.content, &params.topic, &tags).await)
    }

    /// Retrieve information from memory using semantic search.
    #[tool(description = "Retrieve information from memory using semantic search over summaries. Returns a list; when nothing matches, the list holds a single status envelope.")]
    async fn memory_retrieve(
        &self,
        Parameters(params): Parameters<MemoryRetrieveParams>,
    ) -> Result<String, String> {
        let max_results = params
            .max_results
            .unwrap_or(self.engine.config().retrieval.default_max_results);
        let return_type = match params.return_type.as_deref() {
            None => ReturnType::FullText,
            Some(raw) => match raw.parse::<ReturnType>() {
                Ok(rt) => rt,
                Err(msg) => {
                    return to_json(vec![
                        Envelope::error(ErrorKind::InvalidArgument, msg).to_value()
                    ]);
                }
            },
        };

        tracing::info!(query = %params.query, max_results, "memory_retrieve called");
        to_json(self.engine.retrieve(
            &params.query,
            max_results,
            params.topic.as_deref(),
            return_type,
        ))
    }

    /// Update an existing memory item.
    #[tool(description = "Update an existing memory item's content, topic, or tags. At least one field is required; content changes regenerate the default summary.")]
    async fn memory_update(
        &self,
        Parameters(params): Parameters<MemoryUpdateParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.memory_id, "memory_update called");
        to_json(
            self.engine
                .update(
                    &params.memory_id,
                    params.content.as_deref(),
                    params.topic.as_deref(),
                    params.tags.as_deref(),
                )
                .await,
        )
    }

    /// Delete a memory item from the system.
    #[tool(description = "Delete a memory item and all of its summaries from both stores.")]
    async fn memory_delete(
        &self,
        Parameters(params): Parameters<MemoryDeleteParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.memory_id, "memory_delete called");
        to_json(self.engine.delete(&params.memory_id))
    }

    /// List all available topics in the memory system.
    #[tool(description = "List all topics/knowledge domains with item counts and descriptions.")]
    async fn memory_list_topics(&self) -> Result<String, String> {
        tracing::info!("memory_list_topics called");
        to_json(self.engine.list_topics())
    }

    /// Get memory system status and statistics.
    #[tool(description = "Get memory system status: counts, top topics, store paths, and system time.")]
    async fn memory_status(&self) -> Result<String, String> {
        tracing::info!("memory_status called");
        to_json(self.engine.status())
    }

    /// Generate a summary of memory items.
    #[tool(description = "Generate an on-demand summary of a memory (by id) or of memories found by query or topic. The result is returned, not persisted.")]
    async fn memory_summarize(
        &self,
        Parameters(params): Parameters<MemorySummarizeParams>,
    ) -> Result<String, String> {
        let kind = match params.summary_type.as_deref() {
            None => SummaryKind::Abstractive,
            Some(raw) => match raw.parse::<SummaryKind>() {
                Ok(kind) => kind,
                Err(msg) => {
                    return to_json(Envelope::error(ErrorKind::InvalidArgument, msg));
                }
            },
        };
        let length = match params.length.as_deref() {
            None => SummaryLength::Medium,
            Some(raw) => match raw.parse::<SummaryLength>() {
                Ok(length) => length,
                Err(msg) => {
                    return to_json(Envelope::error(ErrorKind::InvalidArgument, msg));
                }
            },
        };

        tracing::info!(kind = %kind, length = %length, "memory_summarize called");
        to_json(
            self.engine
                .summarize(
                    params.memory_id.as_deref(),
                    params.query.as_deref(),
                    params.topic.as_deref(),
                    kind,
                    length,
                )
                .await,
        )
    }

    /// Delete a topic if it has no associated memory items.
    #[tool(description = "Delete a topic only if it holds no memory items. Reports whether the topic was missing or still populated.")]
    async fn memory_delete_empty_topic(
        &self,
        Parameters(params): Parameters<DeleteEmptyTopicParams>,
    ) -> Result<String, String> {
        tracing::info!(topic = %params.topic_name, "memory_delete_empty_topic called");
        to_json(self.engine.delete_empty_topic(&params.topic_name))
    }
}

#[tool_handler]
impl ServerHandler for MemoryTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Engram is a persistent memory server. Use memory_store to save facts, \
                 memory_retrieve to search them semantically, memory_update/memory_delete to \
                 manage them, and memory_summarize for on-demand summaries."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = vec![
            RawResource::new("memory://docs/agents", "agents").no_annotation(),
            RawResource::new("memory://docs/readme", "readme").no_annotation(),
            RawResource::new("memory://docs/schema", "schema").no_annotation(),
            RawResource::new("memory://docs/roadmap", "roadmap").no_annotation(),
        ];
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = match uri.as_str() {
            "memory://docs/agents" => DOCS_AGENTS,
            "memory://docs/readme" => DOCS_README,
            "memory://docs/schema" => DOCS_SCHEMA,
            "memory://docs/roadmap" => DOCS_ROADMAP,
            other => {
                return Err(McpError::resource_not_found(
                    format!("unknown resource: {other}"),
                    None,
                ));
            }
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}
