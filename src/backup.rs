//! Time-gated snapshotting of the data directory with retention pruning.
//!
//! [`BackupManager::tick`] runs after every successful write. It keeps a
//! cached last-snapshot timestamp behind a mutex; the check and the snapshot
//! creation happen under the same lock, so concurrent writers produce at most
//! one snapshot per interval. Snapshot failures are logged and never fail the
//! calling operation.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::config::EngramConfig;

const BACKUP_PREFIX: &str = "memory_backup_";
const BACKUP_EXT: &str = "zip";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// One snapshot file, newest-first in listings.
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub created: String,
}

#[derive(Default)]
struct BackupCache {
    last: Option<NaiveDateTime>,
    initialized: bool,
}

pub struct BackupManager {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    interval: chrono::Duration,
    retention: usize,
    enabled: bool,
    cache: Mutex<BackupCache>,
}

impl BackupManager {
    pub fn new(config: &EngramConfig) -> Self {
        Self::with_paths(
            config.resolved_db_path(),
            config.resolved_backup_path(),
            chrono::Duration::hours(config.backup.interval_hours as i64),
            config.backup.retention_count,
            config.backup.enabled,
        )
    }

    pub fn with_paths(
        data_dir: PathBuf,
        backup_dir: PathBuf,
        interval: chrono::Duration,
        retention: usize,
        enabled: bool,
    ) -> Self {
        Self {
            data_dir,
            backup_dir,
            interval,
            retention,
            enabled,
            cache: Mutex::new(BackupCache::default()),
        }
    }

    /// Called after every successful write. Creates a snapshot iff backups
    /// are enabled and the interval has elapsed (or none exists yet).
    /// Returns the created snapshot path, if any.
    pub fn tick(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(e) => {
                warn!("backup cache lock poisoned: {e}");
                return None;
            }
        };

        if !cache.initialized {
            cache.last = self.scan_last_timestamp();
            cache.initialized = true;
        }

        let now = chrono::Local::now().naive_local();
        let due = match cache.last {
            None => true,
            Some(last) => now - last >= self.interval,
        };
        if !due {
            return None;
        }

        match self.create_snapshot(now) {
            Ok(path) => {
                cache.last = Some(now);
                self.prune();
                info!(snapshot = %path.display(), "automatic backup created");
                Some(path)
            }
            Err(e) => {
                warn!("failed to create backup: {e:#}");
                None
            }
        }
    }

    /// Create a snapshot unconditionally (CLI path). Updates the cache so a
    /// following `tick` does not immediately snapshot again.
    pub fn create(&self) -> Result<PathBuf> {
        let now = chrono::Local::now().naive_local();
        let path = self.create_snapshot(now)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.last = Some(now);
            cache.initialized = true;
        }
        self.prune();
        Ok(path)
    }

    /// All snapshots in the backup directory, newest first.
    pub fn list(&self) -> Vec<BackupInfo> {
        let mut entries: Vec<(NaiveDateTime, BackupInfo)> = self
            .snapshot_files()
            .into_iter()
            .filter_map(|(stamp, path)| {
                let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some((
                    stamp,
                    BackupInfo {
                        name,
                        path: path.display().to_string(),
                        size_bytes,
                        created: stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    },
                ))
            })
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().map(|(_, info)| info).collect()
    }

    /// Timestamp of the most recent snapshot, parsed from filenames rather
    /// than file modification times.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.scan_last_timestamp()
    }

    /// Drop the cached timestamp so the next tick re-reads the filesystem.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.last = None;
            cache.initialized = false;
            info!("backup cache invalidated");
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn scan_last_timestamp(&self) -> Option<NaiveDateTime> {
        self.snapshot_files()
            .into_iter()
            .map(|(stamp, _)| stamp)
            .max()
    }

    fn snapshot_files(&self) -> Vec<(NaiveDateTime, PathBuf)> {
        let entries = match std::fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let stamp = parse_backup_timestamp(&path)?;
                Some((stamp, path))
            })
            .collect()
    }

    fn create_snapshot(&self, now: NaiveDateTime) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.backup_dir).with_context(|| {
            format!("failed to create backup directory {}", self.backup_dir.display())
        })?;

        let name = format!("{BACKUP_PREFIX}{}.{BACKUP_EXT}", now.format(TIMESTAMP_FORMAT));
        let path = self.backup_dir.join(&name);

        archive_directory(&self.data_dir, &path)
            .with_context(|| format!("failed to archive {}", self.data_dir.display()))?;

        Ok(path)
    }

    /// Keep only the newest `retention` snapshots.
    fn prune(&self) {
        let mut snapshots = self.snapshot_files();
        snapshots.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, path) in snapshots.into_iter().skip(self.retention) {
            info!(snapshot = %path.display(), "deleting old backup");
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(snapshot = %path.display(), "failed to delete old backup: {e}");
            }
        }
    }
}

/// Parse a snapshot timestamp out of `memory_backup_YYYY-MM-DD_HH-MM-SS.zip`.
/// Returns `None` for files that do not match the pattern.
pub fn parse_backup_timestamp(path: &Path) -> Option<NaiveDateTime> {
    if path.extension().and_then(|e| e.to_str()) != Some(BACKUP_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let stamp = stem.strip_prefix(BACKUP_PREFIX)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// Zip every file under `src_dir` (relative paths preserved) into `dest`.
pub fn archive_directory(src_dir: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest)
        .with_context(|| format!("failed to create archive {}", dest.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(src_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let relative = match path.strip_prefix(src_dir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut f = File::open(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            io::copy(&mut f, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}

/// Extract a snapshot archive into `dest_dir` (restore path).
pub fn extract_archive(archive: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("failed to open archive {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).context("failed to read archive")?;
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;
    zip.extract(dest_dir).context("failed to extract archive")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_backup_filename() {
        let stamp =
            parse_backup_timestamp(Path::new("/b/memory_backup_2026-01-29_14-30-00.zip")).unwrap();
        assert_eq!(stamp.format(TIMESTAMP_FORMAT).to_string(), "2026-01-29_14-30-00");
    }

    #[test]
    fn rejects_foreign_filenames() {
        assert!(parse_backup_timestamp(Path::new("/b/notes.zip")).is_none());
        assert!(parse_backup_timestamp(Path::new("/b/memory_backup_garbage.zip")).is_none());
        assert!(parse_backup_timestamp(Path::new("/b/memory_backup_2026-01-29_14-30-00.tar")).is_none());
    }

    #[test]
    fn disabled_manager_never_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = BackupManager::with_paths(
            tmp.path().join("data"),
            tmp.path().join("backups"),
            chrono::Duration::hours(1),
            10,
            false,
        );
        assert!(manager.tick().is_none());
        assert!(!tmp.path().join("backups").exists());
    }

    #[test]
    fn first_tick_snapshots_and_second_is_gated() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(data.join("chroma")).unwrap();
        std::fs::write(data.join("memory.sqlite"), b"relational").unwrap();
        std::fs::write(data.join("chroma").join("vectors.sqlite"), b"vector").unwrap();

        let manager = BackupManager::with_paths(
            data,
            tmp.path().join("backups"),
            chrono::Duration::hours(1),
            10,
            true,
        );

        let first = manager.tick();
        assert!(first.is_some());
        assert!(manager.tick().is_none());

        let listed = manager.list();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].name.starts_with(BACKUP_PREFIX));
        assert!(manager.last_timestamp().is_some());
    }

    #[test]
    fn prune_keeps_newest_n() {
        let tmp = tempfile::tempdir().unwrap();
        let backups = tmp.path().join("backups");
        std::fs::create_dir_all(&backups).unwrap();
        for hour in ["08", "09", "10", "11", "12"] {
            std::fs::write(
                backups.join(format!("memory_backup_2026-01-29_{hour}-00-00.zip")),
                b"snap",
            )
            .unwrap();
        }

        let manager = BackupManager::with_paths(
            tmp.path().join("data"),
            backups.clone(),
            chrono::Duration::hours(1),
            2,
            true,
        );
        manager.prune();

        let mut remaining: Vec<String> = std::fs::read_dir(&backups)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "memory_backup_2026-01-29_11-00-00.zip".to_string(),
                "memory_backup_2026-01-29_12-00-00.zip".to_string(),
            ]
        );
    }

    #[test]
    fn archive_roundtrips_directory_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(data.join("chroma")).unwrap();
        std::fs::write(data.join("memory.sqlite"), b"relational bytes").unwrap();
        std::fs::write(data.join("chroma").join("vectors.sqlite"), b"vector bytes").unwrap();

        let archive = tmp.path().join("snap.zip");
        archive_directory(&data, &archive).unwrap();

        let restored = tmp.path().join("restored");
        extract_archive(&archive, &restored).unwrap();

        assert_eq!(
            std::fs::read(restored.join("memory.sqlite")).unwrap(),
            b"relational bytes"
        );
        assert_eq!(
            std::fs::read(restored.join("chroma").join("vectors.sqlite")).unwrap(),
            b"vector bytes"
        );
    }

    #[test]
    fn invalidate_cache_forces_rescan() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("memory.sqlite"), b"x").unwrap();

        let manager = BackupManager::with_paths(
            data,
            tmp.path().join("backups"),
            chrono::Duration::hours(1),
            10,
            true,
        );
        let path = manager.tick().unwrap();

        // Remove the snapshot behind the manager's back; the cache still
        // gates, but an invalidated cache sees the empty directory.
        std::fs::remove_file(path).unwrap();
        assert!(manager.tick().is_none());
        manager.invalidate_cache();
        assert!(manager.tick().is_some());
    }
}
