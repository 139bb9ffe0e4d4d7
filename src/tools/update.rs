//! MCP `memory_update` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_update` MCP tool.
///
/// At least one of `content`, `topic`, or `tags` must be provided.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryUpdateParams {
    /// ID of the memory item to update.
    #[schemars(description = "ID of the memory item to update")]
    pub memory_id: String,

    /// New content (if updating content).
    #[schemars(description = "New content (if updating content)")]
    pub content: Option<String>,

    /// New topic (if changing).
    #[schemars(description = "New topic (if changing)")]
    pub topic: Option<String>,

    /// New tags (if updating).
    #[schemars(description = "New tags (if updating); replaces the existing tag list")]
    pub tags: Option<Vec<String>>,
}
