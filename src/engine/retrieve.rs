//! Summary-first retrieval: semantic search over summary embeddings, then
//! hydration of the authoritative rows.

use serde_json::{json, Value};

use super::MemoryEngine;
use crate::response::{Envelope, ErrorKind};

/// What each retrieved element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    FullText,
    Summary,
    Both,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullText => "full_text",
            Self::Summary => "summary",
            Self::Both => "both",
        }
    }

    fn wants_full_text(&self) -> bool {
        matches!(self, Self::FullText | Self::Both)
    }

    fn wants_summary(&self) -> bool {
        matches!(self, Self::Summary | Self::Both)
    }
}

impl std::str::FromStr for ReturnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_text" => Ok(Self::FullText),
            "summary" => Ok(Self::Summary),
            "both" => Ok(Self::Both),
            _ => Err(format!("unknown return type: {s}")),
        }
    }
}

impl MemoryEngine {
    /// Retrieve memories semantically. Always returns a list; when nothing
    /// matches, the list holds a single ok-envelope element (clients detect
    /// the absence of `content`/`summary_text`).
    pub fn retrieve(
        &self,
        query: &str,
        max_results: usize,
        topic: Option<&str>,
        return_type: ReturnType,
    ) -> Vec<Value> {
        let summary_ids = match self.vector.search_summaries(query, max_results, topic) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("summary search failed: {e:#}");
                return vec![
                    Envelope::error(ErrorKind::StoreIo, format!("error retrieving from memory: {e}"))
                        .to_value(),
                ];
            }
        };

        let mut results = Vec::with_capacity(summary_ids.len());
        for summary_id in summary_ids {
            match self.hydrate(&summary_id, return_type) {
                Ok(Some(item)) => results.push(item),
                // Drift between the stores: the embedding exists but the
                // authoritative row is gone. Skip rather than surface a
                // half-shaped record.
                Ok(None) => {
                    tracing::warn!(id = %summary_id, "summary id not found in relational store")
                }
                Err(e) => tracing::error!(id = %summary_id, "hydration failed: {e:#}"),
            }
        }

        if results.is_empty() {
            return vec![Envelope::ok("no matching memories found").to_value()];
        }
        results
    }

    fn hydrate(
        &self,
        summary_id: &str,
        return_type: ReturnType,
    ) -> anyhow::Result<Option<Value>> {
        let Some(summary) = self.relational.get_summary_by_id(summary_id)? else {
            return Ok(None);
        };
        let Some(memory) = self.relational.get_memory(&summary.memory_id)? else {
            return Ok(None);
        };

        let mut item = json!({
            "id": memory.id,
            "topic": memory.topic_name,
            "tags": memory.tags,
        });
        let obj = item.as_object_mut().expect("item is an object");
        if return_type.wants_full_text() {
            obj.insert("content".into(), json!(memory.content));
            obj.insert("created_at".into(), json!(memory.created_at));
            obj.insert("updated_at".into(), json!(memory.updated_at));
            obj.insert("version".into(), json!(memory.version));
        }
        if return_type.wants_summary() {
            obj.insert("summary_text".into(), json!(summary.summary_text));
            obj.insert("summary_type".into(), json!(summary.summary_type));
        }
        Ok(Some(item))
    }
}
