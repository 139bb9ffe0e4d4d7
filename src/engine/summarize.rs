//! On-demand summarization over a single memory or a searched set.
//!
//! The produced summary is returned, not persisted; callers that want it
//! durable store it explicitly.

use super::{summarize_error_kind, MemoryEngine};
use crate::response::{Envelope, ErrorKind};
use crate::summarizer::{SummaryKind, SummaryLength};

/// How many candidate memories feed a multi-memory summary.
const CANDIDATE_LIMIT: usize = 10;

impl MemoryEngine {
    /// Summarize on demand. Exactly one selector — `memory_id`, `query`, or
    /// `topic` — must be provided.
    pub async fn summarize(
        &self,
        memory_id: Option<&str>,
        query: Option<&str>,
        topic: Option<&str>,
        kind: SummaryKind,
        length: SummaryLength,
    ) -> Envelope {
        let selectors = [memory_id, query, topic]
            .iter()
            .filter(|s| s.is_some_and(|v| !v.trim().is_empty()))
            .count();
        if selectors != 1 {
            return Envelope::error(
                ErrorKind::InvalidArgument,
                "exactly one of memory_id, query, or topic must be provided",
            );
        }

        let content = if let Some(memory_id) = memory_id {
            match self.relational.get_memory(memory_id) {
                Ok(Some(item)) => item.content,
                Ok(None) => {
                    return Envelope::error(
                        ErrorKind::NotFound,
                        format!("memory item with id {memory_id} not found"),
                    );
                }
                Err(e) => {
                    return Envelope::error(
                        ErrorKind::StoreIo,
                        format!("error generating summary: {e}"),
                    );
                }
            }
        } else {
            // Search the full-content collection — summaries are too lossy
            // as input for a second round of compression.
            let search_query = query.or(topic).unwrap_or_default();
            let ids = match self
                .vector
                .search_memories(search_query, CANDIDATE_LIMIT, topic)
            {
                Ok(ids) => ids,
                Err(e) => {
                    return Envelope::error(
                        ErrorKind::StoreIo,
                        format!("error generating summary: {e}"),
                    );
                }
            };
            if ids.is_empty() {
                return Envelope::ok("no relevant memories found to summarize");
            }

            let mut contents = Vec::with_capacity(ids.len());
            for id in &ids {
                match self.relational.get_memory(id) {
                    Ok(Some(item)) => contents.push(item.content),
                    Ok(None) => tracing::warn!(id = %id, "memory id missing during summarize"),
                    Err(e) => tracing::error!(id = %id, "memory hydration failed: {e:#}"),
                }
            }
            if contents.is_empty() {
                return Envelope::ok("could not retrieve content for relevant memories");
            }
            contents.join("\n\n")
        };

        let focus_query = if kind == SummaryKind::QueryFocused {
            query
        } else {
            None
        };
        match self.summarizer.summarize(&content, kind, length, focus_query).await {
            Ok(summary) => Envelope::ok("summary generated successfully").with("summary", summary),
            Err(e) => Envelope::error(summarize_error_kind(&e), format!("failed to generate summary: {e}")),
        }
    }
}
