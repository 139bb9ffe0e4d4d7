//! MCP `memory_summarize` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_summarize` MCP tool.
///
/// Exactly one of `memory_id`, `query`, or `topic` must be provided.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemorySummarizeParams {
    /// ID of a specific memory item to summarize.
    #[schemars(description = "ID of a specific memory item to summarize")]
    pub memory_id: Option<String>,

    /// A query to find relevant memories to summarize.
    #[schemars(description = "A query to find relevant memories to summarize")]
    pub query: Option<String>,

    /// A topic to find relevant memories to summarize.
    #[schemars(description = "A topic to find relevant memories to summarize")]
    pub topic: Option<String>,

    /// Summary kind: `"abstractive"`, `"extractive"`, or `"query_focused"`.
    #[schemars(
        description = "The type of summary to generate: 'abstractive', 'extractive', or 'query_focused'. Defaults to 'abstractive'."
    )]
    pub summary_type: Option<String>,

    /// Summary length: `"short"`, `"medium"`, or `"detailed"`.
    #[schemars(
        description = "The desired length of the summary: 'short', 'medium', or 'detailed'. Defaults to 'medium'."
    )]
    pub length: Option<String>,
}
