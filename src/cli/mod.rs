pub mod backup;
pub mod restore;

use anyhow::Result;
use std::sync::Arc;

use crate::config::EngramConfig;
use crate::engine::MemoryEngine;

/// Initialize both stores; with `reset` they are wiped and recreated.
pub fn init(config: &EngramConfig, reset: bool) -> Result<()> {
    let engine = MemoryEngine::open(Arc::new(config.clone()))?;
    let result = engine.initialize(reset);
    if !result.is_ok() {
        anyhow::bail!("initialization failed: {}", result.message());
    }
    if reset {
        println!("Memory stores wiped and recreated at {}", config.resolved_db_path().display());
    } else {
        println!("Memory stores ready at {}", config.resolved_db_path().display());
    }
    Ok(())
}

/// Print a drift report between the relational and vector stores.
pub fn doctor(config: &EngramConfig) -> Result<()> {
    let engine = MemoryEngine::open(Arc::new(config.clone()))?;
    let report = engine.doctor()?;

    if report.is_clean() {
        println!("No drift detected — both stores agree.");
        return Ok(());
    }

    let sections = [
        ("memories missing in vector store", &report.memories_missing_in_vector),
        ("memories only in vector store", &report.memories_only_in_vector),
        ("summaries missing in vector store", &report.summaries_missing_in_vector),
        ("orphaned summary embeddings", &report.summaries_only_in_vector),
    ];
    for (label, ids) in sections {
        if !ids.is_empty() {
            println!("{label} ({}):", ids.len());
            for id in ids {
                println!("  {id}");
            }
        }
    }
    println!("\nRe-run writes for the ids above, or reset and re-import to rebuild the index.");
    Ok(())
}
