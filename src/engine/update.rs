//! Update path — field-selective relational update, read-merge-write vector
//! mirror, and default-summary regeneration on content change.

use super::{normalize_tags, storage_error_kind, summarize_error_kind, MemoryEngine};
use crate::response::{create_memory_id, timestamp, Envelope, ErrorKind};
use crate::summarizer::{SummaryTier, DEFAULT_SUMMARY_TYPE};

impl MemoryEngine {
    /// Update an existing memory. At least one of `content`, `topic`, `tags`
    /// must be provided; `version` increments on success and the default
    /// summary is regenerated under its existing id when content changes.
    pub async fn update(
        &self,
        memory_id: &str,
        content: Option<&str>,
        topic: Option<&str>,
        tags: Option<&[String]>,
    ) -> Envelope {
        if content.is_none() && topic.is_none() && tags.is_none() {
            return Envelope::error(
                ErrorKind::InvalidArgument,
                "at least one of content, topic, or tags must be provided",
            );
        }
        if matches!(content, Some(c) if c.is_empty()) {
            return Envelope::error(ErrorKind::InvalidArgument, "content must not be empty");
        }
        if matches!(topic, Some(t) if t.trim().is_empty()) {
            return Envelope::error(ErrorKind::InvalidArgument, "topic must not be empty");
        }
        let topic = topic.map(str::trim);
        let tags = match tags {
            Some(tags) => match normalize_tags(tags) {
                Ok(tags) => Some(tags),
                Err(msg) => return Envelope::error(ErrorKind::InvalidArgument, msg),
            },
            None => None,
        };

        let current = match self.relational.get_memory(memory_id) {
            Ok(Some(item)) => item,
            Ok(None) => {
                return Envelope::error(
                    ErrorKind::NotFound,
                    format!("memory item with id {memory_id} not found"),
                )
                .with_detail("memory_id", memory_id);
            }
            Err(e) => {
                return Envelope::error(storage_error_kind(&e), format!("error updating memory: {e}"));
            }
        };

        match self
            .relational
            .update_memory(memory_id, content, topic, tags.as_deref())
        {
            Ok(true) => {}
            Ok(false) => {
                return Envelope::error(
                    ErrorKind::NotFound,
                    format!("memory item with id {memory_id} not found"),
                );
            }
            Err(e) => {
                tracing::error!(id = %memory_id, "relational update failed: {e:#}");
                return Envelope::error(storage_error_kind(&e), format!("error updating memory: {e}"));
            }
        }

        // Re-read the merged row: the mirror and the summary pipeline work
        // from what the authoritative store now holds.
        let updated = match self.relational.get_memory(memory_id) {
            Ok(Some(item)) => item,
            Ok(None) | Err(_) => {
                return Envelope::error(
                    ErrorKind::Internal,
                    format!("memory {memory_id} disappeared during update"),
                );
            }
        };

        let mut envelope = Envelope::ok("memory item updated successfully")
            .with("memory_id", memory_id)
            .with(
                "updated_fields",
                serde_json::json!({
                    "content": content.is_some(),
                    "topic": topic.is_some(),
                    "tags": tags.is_some(),
                }),
            )
            .with("timestamp", timestamp())
            .with("version", updated.version);

        match self
            .vector
            .update_memory(memory_id, content, topic, tags.as_deref())
        {
            Ok(true) => {}
            // The mirror had no document for this id — heal it from the
            // authoritative row instead of leaving the drift in place.
            Ok(false) => {
                tracing::warn!(id = %memory_id, "vector document missing during update, re-adding");
                if let Err(e) = self.vector.add_memory(
                    memory_id,
                    &updated.content,
                    &updated.topic_name,
                    &updated.tags,
                ) {
                    tracing::warn!(id = %memory_id, "vector re-add failed: {e:#}");
                    envelope =
                        envelope.warn(ErrorKind::PartialWrite, "memory embedding was not updated");
                }
            }
            Err(e) => {
                tracing::warn!(id = %memory_id, "vector update failed: {e:#}");
                envelope =
                    envelope.warn(ErrorKind::PartialWrite, "memory embedding was not updated");
            }
        }

        let topic_changed = updated.topic_name != current.topic_name;
        if topic_changed {
            if let Err(e) = self.vector.upsert_topic(&updated.topic_name, &updated.tags) {
                tracing::warn!(topic = %updated.topic_name, "topic upsert failed: {e:#}");
                envelope = envelope.warn(ErrorKind::PartialWrite, "topic document was not updated");
            }
            // Summary metadata filters on topic; keep it pointing at the new
            // bucket so filtered retrieval still finds this memory.
            if let Err(e) = self.vector.retag_summaries(memory_id, &updated.topic_name) {
                tracing::warn!(id = %memory_id, "summary retag failed: {e:#}");
                envelope =
                    envelope.warn(ErrorKind::PartialWrite, "summary metadata was not updated");
            }
        }

        let mut summary_updated = false;
        if content.is_some() {
            (envelope, summary_updated) = self.regenerate_default_summary(envelope, &updated).await;
        }
        envelope = envelope.with("summary_updated", summary_updated);

        self.tick_backup();
        envelope
    }

    /// Regenerate the default summary for a memory whose content changed.
    /// An existing default summary keeps its id; re-embedding overwrites.
    async fn regenerate_default_summary(
        &self,
        mut envelope: Envelope,
        updated: &crate::db::relational::MemoryItem,
    ) -> (Envelope, bool) {
        let tier = SummaryTier::for_content_len(
            updated.content.chars().count(),
            self.config.retrieval.tiny_content_threshold,
            self.config.retrieval.small_content_threshold,
        );
        envelope = envelope.with("summary_tier", tier.as_str());

        let text = match tier.strategy() {
            None => Some(updated.content.clone()),
            Some((kind, length)) => {
                match self
                    .summarizer
                    .summarize(&updated.content, kind, length, None)
                    .await
                {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(id = %updated.id, "summary regeneration failed: {e}");
                        envelope = envelope.warn(summarize_error_kind(&e), &e.to_string());
                        None
                    }
                }
            }
        };
        let Some(text) = text else {
            return (envelope, false);
        };

        let existing = match self.relational.get_summary(&updated.id, DEFAULT_SUMMARY_TYPE) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(id = %updated.id, "default summary lookup failed: {e:#}");
                return (
                    envelope.warn(storage_error_kind(&e), "summary row was not updated"),
                    false,
                );
            }
        };

        match existing {
            Some(summary) => {
                if let Err(e) = self.relational.update_summary(&summary.id, &text) {
                    tracing::warn!(id = %summary.id, "summary update failed: {e:#}");
                    return (
                        envelope.warn(storage_error_kind(&e), "summary row was not updated"),
                        false,
                    );
                }
                if let Err(e) = self.vector.add_summary(
                    &summary.id,
                    &text,
                    &updated.id,
                    DEFAULT_SUMMARY_TYPE,
                    &updated.topic_name,
                ) {
                    tracing::warn!(id = %summary.id, "summary re-embed failed: {e:#}");
                    envelope = envelope
                        .warn(ErrorKind::PartialWrite, "summary embedding was not updated");
                }
                (envelope.with("summary_id", &summary.id), true)
            }
            None => {
                tracing::info!(id = %updated.id, "creating default summary after content update");
                let summary_id = create_memory_id();
                if let Err(e) = self.relational.store_summary(
                    &summary_id,
                    &updated.id,
                    DEFAULT_SUMMARY_TYPE,
                    &text,
                ) {
                    tracing::warn!(id = %updated.id, "summary store failed: {e:#}");
                    return (
                        envelope.warn(storage_error_kind(&e), "summary row was not stored"),
                        false,
                    );
                }
                if let Err(e) = self.vector.add_summary(
                    &summary_id,
                    &text,
                    &updated.id,
                    DEFAULT_SUMMARY_TYPE,
                    &updated.topic_name,
                ) {
                    tracing::warn!(id = %summary_id, "summary embedding failed: {e:#}");
                    envelope = envelope
                        .warn(ErrorKind::PartialWrite, "summary embedding was not stored");
                }
                (envelope.with("summary_id", summary_id), true)
            }
        }
    }
}
