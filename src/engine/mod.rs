//! Hybrid memory engine — coordinates the relational store, vector store,
//! summarizer, and backup manager behind the public memory operations.
//!
//! The relational store owns truth; the vector store mirrors embeddings and
//! filter metadata. Writes are best-effort dual writes: a relational failure
//! fails the operation, a vector failure degrades it to a warning in an
//! otherwise-successful envelope. Every operation returns an [`Envelope`],
//! never an error, so the RPC boundary stays total.

pub mod delete;
pub mod doctor;
pub mod retrieve;
pub mod status;
pub mod store;
pub mod summarize;
pub mod update;

use anyhow::Result;
use std::sync::Arc;

use crate::backup::BackupManager;
use crate::config::EngramConfig;
use crate::db::relational::RelationalStore;
use crate::embedding;
use crate::response::{Envelope, ErrorKind};
use crate::summarizer::openrouter::OpenRouterSummarizer;
use crate::summarizer::{SummarizeError, Summarizer};
use crate::vector::VectorStore;

pub use retrieve::ReturnType;

pub struct MemoryEngine {
    relational: RelationalStore,
    vector: VectorStore,
    summarizer: Arc<dyn Summarizer>,
    backup: BackupManager,
    config: Arc<EngramConfig>,
}

impl MemoryEngine {
    /// Assemble an engine from explicit parts. Tests inject their own
    /// summarizer and paths through here.
    pub fn new(
        relational: RelationalStore,
        vector: VectorStore,
        summarizer: Arc<dyn Summarizer>,
        backup: BackupManager,
        config: Arc<EngramConfig>,
    ) -> Self {
        Self {
            relational,
            vector,
            summarizer,
            backup,
            config,
        }
    }

    /// Open both stores under the configured data directory and wire up the
    /// OpenRouter summarizer.
    pub fn open(config: Arc<EngramConfig>) -> Result<Self> {
        let provider = embedding::create_provider(&config.embedding)?;
        let relational = RelationalStore::open(config.sqlite_path())?;
        let vector = VectorStore::open(config.vector_path(), Arc::from(provider))?;
        let summarizer = OpenRouterSummarizer::new(&config.summarizer);
        if !summarizer.is_configured() {
            tracing::warn!(
                "OPENROUTER_API_KEY is not set — memories will store, but automatic \
                 summarization is disabled"
            );
        }
        let backup = BackupManager::new(&config);

        Ok(Self::new(relational, vector, Arc::new(summarizer), backup, config))
    }

    /// Initialize (or with `reset` wipe and recreate) both stores.
    pub fn initialize(&self, reset: bool) -> Envelope {
        let relational = self.relational.initialize(reset);
        let vector = self.vector.initialize(reset);

        match (&relational, &vector) {
            (Ok(()), Ok(())) => {
                Envelope::ok("memory system initialized successfully").with("reset", reset)
            }
            _ => Envelope::error(ErrorKind::StoreIo, "error initializing memory system")
                .with_detail("relational_ok", relational.is_ok())
                .with_detail("vector_ok", vector.is_ok()),
        }
    }

    pub fn relational(&self) -> &RelationalStore {
        &self.relational
    }

    pub fn vector(&self) -> &VectorStore {
        &self.vector
    }

    pub fn config(&self) -> &EngramConfig {
        &self.config
    }

    /// Backup hook for the write paths. Snapshot failures never propagate.
    fn tick_backup(&self) {
        self.backup.tick();
    }
}

/// Validate and normalize a tag list at the boundary: empty tags and the
/// reserved display separator are rejected, duplicates collapse to their
/// first occurrence.
pub(crate) fn normalize_tags(tags: &[String]) -> Result<Vec<String>, String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err("tags must not be empty strings".into());
        }
        if tag.contains(',') {
            return Err(format!("tag '{tag}' contains the reserved separator ','"));
        }
        if !seen.iter().any(|t: &String| t == tag) {
            seen.push(tag.to_string());
        }
    }
    Ok(seen)
}

/// Classify a storage-layer failure: unique-constraint violations are
/// conflicts, everything else is backend I/O.
pub(crate) fn storage_error_kind(err: &anyhow::Error) -> ErrorKind {
    if let Some(rusqlite::Error::SqliteFailure(failure, _)) =
        err.downcast_ref::<rusqlite::Error>()
    {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return ErrorKind::Conflict;
        }
    }
    ErrorKind::StoreIo
}

/// Map a summarizer failure onto its envelope error kind.
pub(crate) fn summarize_error_kind(err: &SummarizeError) -> ErrorKind {
    match err {
        SummarizeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        SummarizeError::Unavailable(_) => ErrorKind::DependencyUnavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tags_deduplicate_preserving_first_occurrence() {
        let normalized = normalize_tags(&tags(&["style", "rust", "style", "tabs"])).unwrap();
        assert_eq!(normalized, tags(&["style", "rust", "tabs"]));
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert!(normalize_tags(&tags(&["ok", ""])).is_err());
        assert!(normalize_tags(&tags(&["ok", "   "])).is_err());
    }

    #[test]
    fn separator_tag_is_rejected() {
        assert!(normalize_tags(&tags(&["a,b"])).is_err());
    }

    #[test]
    fn tags_are_trimmed() {
        let normalized = normalize_tags(&tags(&[" style ", "style"])).unwrap();
        assert_eq!(normalized, tags(&["style"]));
    }
}
