//! MCP `memory_delete` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_delete` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryDeleteParams {
    /// ID of the memory item to delete.
    #[schemars(description = "ID of the memory item to delete")]
    pub memory_id: String,
}
