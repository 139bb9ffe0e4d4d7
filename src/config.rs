use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngramConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub summarizer: SummarizerConfig,
    pub retrieval: RetrievalConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Root data directory. The relational file lives at
    /// `<db_path>/memory.sqlite`, the vector index under `<db_path>/chroma/`.
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SummarizerConfig {
    /// OpenRouter key. Empty means summarization is disabled and the
    /// store/update paths degrade to `summary_generated=false`.
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_max_results: usize,
    pub tiny_content_threshold: usize,
    pub small_content_threshold: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    pub interval_hours: u64,
    pub retention_count: usize,
    pub backup_path: String,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            summarizer: SummarizerConfig::default(),
            retrieval: RetrievalConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "./memory_db".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".into(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://api.openrouter.ai/v1".into(),
            model: "openai/gpt-4o-mini".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_max_results: 5,
            tiny_content_threshold: 500,
            small_content_threshold: 2000,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 24,
            retention_count: 10,
            backup_path: "./backups".into(),
        }
    }
}

/// Returns `~/.engram/`
pub fn default_engram_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".engram")
}

/// Returns the default config file path: `~/.engram/config.toml`
pub fn default_config_path() -> PathBuf {
    default_engram_dir().join("config.toml")
}

impl EngramConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EngramConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. The recognized names are the
    /// documented surface; anything else is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("OPENROUTER_API_KEY") {
            self.summarizer.api_key = val;
        }
        if let Ok(val) = std::env::var("OPENROUTER_ENDPOINT") {
            self.summarizer.endpoint = val;
        }
        if let Ok(val) = std::env::var("DEFAULT_MAX_RESULTS") {
            if let Ok(n) = val.parse() {
                self.retrieval.default_max_results = n;
            }
        }
        if let Ok(val) = std::env::var("TINY_CONTENT_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.retrieval.tiny_content_threshold = n;
            }
        }
        if let Ok(val) = std::env::var("SMALL_CONTENT_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.retrieval.small_content_threshold = n;
            }
        }
        if let Ok(val) = std::env::var("ENABLE_AUTO_BACKUP") {
            self.backup.enabled = matches!(val.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Ok(val) = std::env::var("BACKUP_INTERVAL_HOURS") {
            if let Ok(n) = val.parse() {
                self.backup.interval_hours = n;
            }
        }
        if let Ok(val) = std::env::var("BACKUP_RETENTION_COUNT") {
            if let Ok(n) = val.parse() {
                self.backup.retention_count = n;
            }
        }
        if let Ok(val) = std::env::var("BACKUP_PATH") {
            self.backup.backup_path = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Path to the relational SQLite file: `<db_path>/memory.sqlite`.
    pub fn sqlite_path(&self) -> PathBuf {
        self.resolved_db_path().join("memory.sqlite")
    }

    /// Path to the vector index directory: `<db_path>/chroma`.
    pub fn vector_path(&self) -> PathBuf {
        self.resolved_db_path().join("chroma")
    }

    /// Resolve the backup directory, expanding `~` if needed.
    pub fn resolved_backup_path(&self) -> PathBuf {
        expand_tilde(&self.backup.backup_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
