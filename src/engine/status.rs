//! Topic listing, system status, and empty-topic cleanup.

use serde_json::Value;

use super::{storage_error_kind, MemoryEngine};
use crate::db::relational::TopicDeleteOutcome;
use crate::response::{timestamp, Envelope, ErrorKind};

impl MemoryEngine {
    /// All topics, most recently touched first. Always returns a list; with
    /// no topics the list holds a single ok-envelope element.
    pub fn list_topics(&self) -> Vec<Value> {
        match self.relational.list_topics() {
            Ok(topics) if topics.is_empty() => {
                vec![Envelope::ok("no topics found").to_value()]
            }
            Ok(topics) => topics
                .into_iter()
                .map(|t| serde_json::to_value(t).unwrap_or(Value::Null))
                .collect(),
            Err(e) => {
                tracing::error!("topic listing failed: {e:#}");
                vec![
                    Envelope::error(storage_error_kind(&e), format!("error listing topics: {e}"))
                        .to_value(),
                ]
            }
        }
    }

    /// Merged statistics from both stores plus system context.
    pub fn status(&self) -> Envelope {
        let relational = match self.relational.status() {
            Ok(status) => status,
            Err(e) => {
                return Envelope::error(
                    storage_error_kind(&e),
                    format!("error getting memory status: {e}"),
                );
            }
        };
        let vector = match self.vector.status() {
            Ok(status) => status,
            Err(e) => {
                return Envelope::error(
                    storage_error_kind(&e),
                    format!("error getting memory status: {e}"),
                );
            }
        };

        let stats = serde_json::json!({
            "total_memories": relational.total_memories,
            "total_topics": relational.total_topics,
            "total_summaries": relational.total_summaries,
            "top_topics": relational.top_topics,
            "latest_item_date": relational.latest_item_date,
            "memory_vectors": vector.memory_vectors,
            "summary_vectors": vector.summary_vectors,
            "topic_vectors": vector.topic_vectors,
            "vector_path": vector.vector_path,
            "db_path": self.config.resolved_db_path().display().to_string(),
            "last_backup": self
                .backup
                .last_timestamp()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
            "system_time": timestamp(),
        });

        Envelope::ok("memory status retrieved successfully").with("stats", stats)
    }

    /// Remove a topic row only when it holds no memories.
    pub fn delete_empty_topic(&self, topic_name: &str) -> Envelope {
        match self.relational.delete_topic_if_empty(topic_name) {
            Ok(TopicDeleteOutcome::Deleted) => Envelope::ok(format!(
                "topic '{topic_name}' deleted successfully because it was empty"
            )),
            Ok(TopicDeleteOutcome::NotFound) => Envelope::error(
                ErrorKind::NotFound,
                format!("topic '{topic_name}' not found"),
            ),
            Ok(TopicDeleteOutcome::NotEmpty(count)) => Envelope::error(
                ErrorKind::Conflict,
                format!(
                    "topic '{topic_name}' could not be deleted because it is not empty; \
                     it contains {count} items"
                ),
            )
            .with_detail("item_count", count),
            Err(e) => Envelope::error(
                storage_error_kind(&e),
                format!("error deleting topic: {e}"),
            ),
        }
    }
}
