//! Delete path — summary ids are captured before the relational cascade
//! destroys the rows, then both stores are cleaned in order.

use super::{storage_error_kind, MemoryEngine};
use crate::response::{Envelope, ErrorKind};

impl MemoryEngine {
    /// Delete a memory and every trace of it: relational row (cascading to
    /// summary rows and the topic refcount), memory embedding, and all
    /// summary embeddings.
    ///
    /// The summary ids must be read before the relational delete — the
    /// cascade destroys the rows that know which vector entries to remove,
    /// and skipping this step leaves orphaned summary embeddings behind.
    pub fn delete(&self, memory_id: &str) -> Envelope {
        let summaries = match self.relational.list_summaries(memory_id) {
            Ok(summaries) => summaries,
            Err(e) => {
                tracing::error!(id = %memory_id, "summary enumeration failed: {e:#}");
                return Envelope::error(
                    storage_error_kind(&e),
                    format!("error deleting memory item: {e}"),
                );
            }
        };

        match self.relational.delete_memory(memory_id) {
            Ok(true) => {}
            Ok(false) => {
                return Envelope::error(
                    ErrorKind::NotFound,
                    format!("memory item with id {memory_id} not found"),
                )
                .with_detail("memory_id", memory_id);
            }
            Err(e) => {
                tracing::error!(id = %memory_id, "relational delete failed: {e:#}");
                return Envelope::error(
                    storage_error_kind(&e),
                    format!("error deleting memory item: {e}"),
                );
            }
        }

        let mut envelope = Envelope::ok(format!(
            "memory item {memory_id} and its summaries deleted successfully"
        ))
        .with("memory_id", memory_id)
        .with("deleted_summaries", summaries.len());

        if let Err(e) = self.vector.delete_memory(memory_id) {
            tracing::warn!(id = %memory_id, "vector delete failed: {e:#}");
            envelope = envelope.warn(ErrorKind::PartialWrite, "memory embedding was not removed");
        }
        for summary in &summaries {
            if let Err(e) = self.vector.delete_summary(&summary.id) {
                tracing::warn!(id = %summary.id, "summary embedding delete failed: {e:#}");
                envelope =
                    envelope.warn(ErrorKind::PartialWrite, "a summary embedding was not removed");
            }
        }

        self.tick_backup();
        envelope
    }
}
