#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

use engram::backup::BackupManager;
use engram::config::EngramConfig;
use engram::db::relational::RelationalStore;
use engram::embedding::hashed::HashedEmbeddingProvider;
use engram::engine::MemoryEngine;
use engram::summarizer::{
    build_system_prompt, SummarizeError, Summarizer, SummaryKind, SummaryLength,
};
use engram::vector::VectorStore;

/// Deterministic summarizer: validates like a real one, then echoes the kind,
/// length, and a prefix of the input.
pub struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(
        &self,
        text: &str,
        kind: SummaryKind,
        length: SummaryLength,
        query: Option<&str>,
    ) -> Result<String, SummarizeError> {
        build_system_prompt(kind, length, query)?;
        let prefix: String = text.chars().take(60).collect();
        Ok(format!("summary[{kind}/{length}]: {prefix}"))
    }
}

/// Summarizer that is always offline, for degraded-path tests.
pub struct OfflineSummarizer;

#[async_trait]
impl Summarizer for OfflineSummarizer {
    async fn summarize(
        &self,
        _text: &str,
        kind: SummaryKind,
        length: SummaryLength,
        query: Option<&str>,
    ) -> Result<String, SummarizeError> {
        build_system_prompt(kind, length, query)?;
        Err(SummarizeError::Unavailable("summarizer offline".into()))
    }
}

/// A fully wired engine on a throwaway data directory.
pub struct TestContext {
    pub engine: Arc<MemoryEngine>,
    pub config: Arc<EngramConfig>,
    _tmp: TempDir,
}

pub fn test_engine() -> TestContext {
    build_engine(Arc::new(StubSummarizer), false, 1)
}

pub fn test_engine_with_backup(interval_hours: u64) -> TestContext {
    build_engine(Arc::new(StubSummarizer), true, interval_hours)
}

pub fn test_engine_with_summarizer(summarizer: Arc<dyn Summarizer>) -> TestContext {
    build_engine(summarizer, false, 1)
}

fn build_engine(
    summarizer: Arc<dyn Summarizer>,
    backup_enabled: bool,
    interval_hours: u64,
) -> TestContext {
    let tmp = TempDir::new().expect("temp dir");

    let mut config = EngramConfig::default();
    config.storage.db_path = tmp.path().join("memory_db").to_string_lossy().into_owned();
    config.backup.backup_path = tmp.path().join("backups").to_string_lossy().into_owned();
    config.backup.enabled = backup_enabled;
    config.backup.interval_hours = interval_hours;
    let config = Arc::new(config);

    let engine = open_engine(&config, summarizer);

    TestContext {
        engine: Arc::new(engine),
        config,
        _tmp: tmp,
    }
}

/// Open a (second) engine over the same configuration, e.g. to model a
/// process restart against on-disk state.
pub fn open_engine(config: &Arc<EngramConfig>, summarizer: Arc<dyn Summarizer>) -> MemoryEngine {
    let relational = RelationalStore::open(config.sqlite_path()).expect("relational store");
    let vector = VectorStore::open(config.vector_path(), Arc::new(HashedEmbeddingProvider))
        .expect("vector store");
    let backup = BackupManager::new(config);
    MemoryEngine::new(relational, vector, summarizer, backup, config.clone())
}

/// Pull a required string field out of an envelope.
pub fn env_str(envelope: &engram::response::Envelope, key: &str) -> String {
    envelope
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("envelope missing string field '{key}'"))
        .to_string()
}

pub fn env_bool(envelope: &engram::response::Envelope, key: &str) -> bool {
    envelope
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or_else(|| panic!("envelope missing bool field '{key}'"))
}
