//! Write path — relational insert, vector mirror, and the tiered default
//! summary.

use super::{normalize_tags, storage_error_kind, summarize_error_kind, MemoryEngine};
use crate::response::{create_memory_id, timestamp, Envelope, ErrorKind};
use crate::summarizer::{SummaryTier, DEFAULT_SUMMARY_TYPE};

impl MemoryEngine {
    /// Store new content under a topic. The relational insert is
    /// authoritative; vector-mirror and summary failures degrade to warnings
    /// on the successful envelope.
    pub async fn store(&self, content: &str, topic: &str, tags: &[String]) -> Envelope {
        if content.is_empty() {
            return Envelope::error(ErrorKind::InvalidArgument, "content must not be empty");
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Envelope::error(ErrorKind::InvalidArgument, "topic must not be empty");
        }
        let tags = match normalize_tags(tags) {
            Ok(tags) => tags,
            Err(msg) => return Envelope::error(ErrorKind::InvalidArgument, msg),
        };

        let memory_id = create_memory_id();
        let content_size = content.chars().count();

        if let Err(e) = self.relational.insert_memory(&memory_id, content, topic, &tags) {
            tracing::error!(topic, "relational insert failed: {e:#}");
            return Envelope::error(storage_error_kind(&e), format!("error storing content: {e}"));
        }

        let mut envelope = Envelope::ok("content stored successfully")
            .with("memory_id", &memory_id)
            .with("topic", topic)
            .with("tags", &tags)
            .with("timestamp", timestamp())
            .with("content_size", content_size);

        // Best-effort dual write: the relational row stays even if the
        // mirror fails, and the drift is reconcilable offline.
        if let Err(e) = self.vector.add_memory(&memory_id, content, topic, &tags) {
            tracing::warn!(id = %memory_id, "vector mirror failed: {e:#}");
            envelope = envelope.warn(ErrorKind::PartialWrite, "memory embedding was not stored");
        }
        if let Err(e) = self.vector.upsert_topic(topic, &tags) {
            tracing::warn!(topic, "topic upsert failed: {e:#}");
            envelope = envelope.warn(ErrorKind::PartialWrite, "topic document was not updated");
        }

        let tier = SummaryTier::for_content_len(
            content_size,
            self.config.retrieval.tiny_content_threshold,
            self.config.retrieval.small_content_threshold,
        );
        envelope = envelope.with("summary_tier", tier.as_str());

        let summary_text = match tier.strategy() {
            // Tiny content is its own summary; no LLM round-trip.
            None => {
                tracing::debug!(id = %memory_id, chars = content_size, "tiny content used as its own summary");
                Some(content.to_string())
            }
            Some((kind, length)) => {
                match self.summarizer.summarize(content, kind, length, None).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(id = %memory_id, "summary generation failed: {e}");
                        envelope = envelope.warn(summarize_error_kind(&e), &e.to_string());
                        None
                    }
                }
            }
        };

        match summary_text {
            Some(text) => {
                let summary_id = create_memory_id();
                match self
                    .relational
                    .store_summary(&summary_id, &memory_id, DEFAULT_SUMMARY_TYPE, &text)
                {
                    Ok(()) => {
                        if let Err(e) = self.vector.add_summary(
                            &summary_id,
                            &text,
                            &memory_id,
                            DEFAULT_SUMMARY_TYPE,
                            topic,
                        ) {
                            tracing::warn!(id = %summary_id, "summary embedding failed: {e:#}");
                            envelope = envelope
                                .warn(ErrorKind::PartialWrite, "summary embedding was not stored");
                        }
                        envelope = envelope
                            .with("summary_generated", true)
                            .with("summary_id", summary_id)
                            .with("summary_type", DEFAULT_SUMMARY_TYPE);
                    }
                    Err(e) => {
                        tracing::warn!(id = %memory_id, "storing summary failed: {e:#}");
                        envelope = envelope
                            .with("summary_generated", false)
                            .warn(storage_error_kind(&e), "summary row was not stored");
                    }
                }
            }
            None => {
                envelope = envelope.with("summary_generated", false);
            }
        }

        self.tick_backup();
        envelope
    }
}
