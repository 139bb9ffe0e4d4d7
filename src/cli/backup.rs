//! `engram backup` — create and list snapshots outside the automatic cycle.

use anyhow::Result;

use crate::backup::BackupManager;
use crate::config::EngramConfig;

/// Create a snapshot now, regardless of the interval gate.
pub fn create(config: &EngramConfig) -> Result<()> {
    let manager = BackupManager::new(config);
    let path = manager.create()?;
    println!("Snapshot created: {}", path.display());
    Ok(())
}

/// List available snapshots, newest first.
pub fn list(config: &EngramConfig) {
    let manager = BackupManager::new(config);
    let backups = manager.list();

    if backups.is_empty() {
        println!("No snapshots found in {}", manager.backup_dir().display());
        return;
    }

    println!("Snapshots in {} ({} found):", manager.backup_dir().display(), backups.len());
    for info in backups {
        let size_mb = info.size_bytes as f64 / (1024.0 * 1024.0);
        println!("  {}  {:.2} MB  {}", info.created, size_mb, info.name);
    }
}
