//! MCP `memory_store` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_store` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStoreParams {
    /// The text content to store in memory.
    #[schemars(description = "The content to store in memory")]
    pub content: String,

    /// Primary topic/category for this content.
    #[schemars(
        description = "Primary topic/category for this content, e.g. 'quantum_computing' or 'user_preferences'"
    )]
    pub topic: String,

    /// Optional tags for better retrieval.
    #[schemars(description = "Optional tags for better retrieval")]
    pub tags: Option<Vec<String>>,
}
