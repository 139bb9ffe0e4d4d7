//! `engram restore` — replace the data directory with a snapshot's contents.
//!
//! A safety snapshot of the current data directory is taken before anything
//! is removed, so a bad restore can itself be restored.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::backup::extract_archive;
use crate::config::EngramConfig;

pub fn run(config: &EngramConfig, file: &str, yes: bool) -> Result<()> {
    let archive = Path::new(file);
    anyhow::ensure!(archive.exists(), "snapshot not found: {file}");

    let data_dir = config.resolved_db_path();
    println!("This will REPLACE the data directory at {}", data_dir.display());

    if !yes && !confirm()? {
        println!("Restore cancelled.");
        return Ok(());
    }

    if data_dir.exists() {
        let safety = create_safety_snapshot(config)?;
        println!("Safety snapshot created: {}", safety.display());
        std::fs::remove_dir_all(&data_dir)
            .with_context(|| format!("failed to remove {}", data_dir.display()))?;
    }
    extract_archive(archive, &data_dir)?;

    println!("Restore completed. Restart the MCP server to pick up the restored data.");
    Ok(())
}

fn confirm() -> Result<bool> {
    print!("Type 'yes' to proceed with restore: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

/// Archive the current data directory under a `safety_backup_` name before
/// it is replaced.
fn create_safety_snapshot(config: &EngramConfig) -> Result<std::path::PathBuf> {
    let backup_dir = config.resolved_backup_path();
    std::fs::create_dir_all(&backup_dir)
        .with_context(|| format!("failed to create {}", backup_dir.display()))?;

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let dest = backup_dir.join(format!("safety_backup_{stamp}.zip"));
    crate::backup::archive_directory(&config.resolved_db_path(), &dest)?;
    Ok(dest)
}
