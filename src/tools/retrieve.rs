//! MCP `memory_retrieve` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_retrieve` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryRetrieveParams {
    /// Natural language query to search for.
    #[schemars(description = "The query to search for in memory")]
    pub query: String,

    /// Maximum number of results to return. Defaults to the configured value.
    #[schemars(description = "Maximum number of results to return. Defaults to 5.")]
    pub max_results: Option<usize>,

    /// Optional topic to restrict search to.
    #[schemars(description = "Optional topic to restrict search to")]
    pub topic: Option<String>,

    /// What each result carries: `"full_text"`, `"summary"`, or `"both"`.
    #[schemars(
        description = "The type of content to return: 'full_text', 'summary', or 'both'. Defaults to 'full_text'."
    )]
    pub return_type: Option<String>,
}
