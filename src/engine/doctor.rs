//! Drift reconciliation report between the relational and vector stores.
//!
//! Dual writes are best-effort, so the two stores can disagree after a
//! partial failure. The doctor enumerates ids on both sides and reports the
//! differences; it never mutates anything.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;

use super::MemoryEngine;

#[derive(Debug, Default, Serialize)]
pub struct DriftReport {
    /// Memories with a relational row but no vector document.
    pub memories_missing_in_vector: Vec<String>,
    /// Vector documents whose relational memory row is gone.
    pub memories_only_in_vector: Vec<String>,
    /// Summary rows with no vector document.
    pub summaries_missing_in_vector: Vec<String>,
    /// Summary embeddings whose relational row is gone (orphans).
    pub summaries_only_in_vector: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.memories_missing_in_vector.is_empty()
            && self.memories_only_in_vector.is_empty()
            && self.summaries_missing_in_vector.is_empty()
            && self.summaries_only_in_vector.is_empty()
    }
}

impl MemoryEngine {
    pub fn doctor(&self) -> Result<DriftReport> {
        let relational_memories: HashSet<String> =
            self.relational().memory_ids()?.into_iter().collect();
        let vector_memories: HashSet<String> = self.vector().memory_ids()?.into_iter().collect();
        let relational_summaries: HashSet<String> =
            self.relational().summary_ids()?.into_iter().collect();
        let vector_summaries: HashSet<String> = self.vector().summary_ids()?.into_iter().collect();

        let mut report = DriftReport {
            memories_missing_in_vector: relational_memories
                .difference(&vector_memories)
                .cloned()
                .collect(),
            memories_only_in_vector: vector_memories
                .difference(&relational_memories)
                .cloned()
                .collect(),
            summaries_missing_in_vector: relational_summaries
                .difference(&vector_summaries)
                .cloned()
                .collect(),
            summaries_only_in_vector: vector_summaries
                .difference(&relational_summaries)
                .cloned()
                .collect(),
        };
        report.memories_missing_in_vector.sort();
        report.memories_only_in_vector.sort();
        report.summaries_missing_in_vector.sort();
        report.summaries_only_in_vector.sort();
        Ok(report)
    }
}
