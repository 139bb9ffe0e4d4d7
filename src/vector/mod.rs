//! Vector index store — three collections over sqlite-vec.
//!
//! Collections `memories`, `summaries`, and `topics` each pair a rowful docs
//! table (document text + filterable metadata) with a vec0 virtual table
//! holding the embedding. Ids are the same UUIDs the relational store uses,
//! so the whole index is reconstructible from relational truth.
//!
//! Nearest-neighbor results come back in increasing-distance order with ties
//! broken by id ascending; a topic filter over-fetches before truncating so a
//! filtered query still fills `k` when matches exist.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::load_sqlite_vec;
use crate::db::relational::topic_document;
use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use crate::response::timestamp;

/// Vector database filename inside the index directory.
const VECTOR_DB_FILE: &str = "vectors.sqlite";

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Topic document mirrored into the vector store.
#[derive(Debug, Clone, Serialize)]
pub struct TopicDoc {
    pub name: String,
    pub document: String,
    pub tags: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Summary document metadata (drift probes and tests).
#[derive(Debug, Clone, Serialize)]
pub struct SummaryDoc {
    pub id: String,
    pub document: String,
    pub memory_id: String,
    pub summary_type: String,
    pub topic: String,
}

/// Vector-side statistics.
#[derive(Debug, Clone, Serialize)]
pub struct VectorStatus {
    pub memory_vectors: i64,
    pub summary_vectors: i64,
    pub topic_vectors: i64,
    pub vector_path: String,
}

/// Handle to the vector store. Cheap to clone; operations acquire the shared
/// connection for their full duration.
#[derive(Clone)]
pub struct VectorStore {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
    path: PathBuf,
}

impl VectorStore {
    /// Open (or create) the vector store under the given index directory.
    pub fn open(dir: impl AsRef<Path>, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;

        load_sqlite_vec();

        let path = dir.join(VECTOR_DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open vector store at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", "5000")?;

        init_collections(&conn)?;
        tracing::info!(path = %path.display(), "vector store ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            path,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        load_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        init_collections(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            path: PathBuf::from(":memory:"),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("vector connection lock poisoned: {e}"))
    }

    /// Re-run collection initialization; with `reset` all collections are
    /// dropped and recreated first.
    pub fn initialize(&self, reset: bool) -> Result<()> {
        let conn = self.lock()?;
        if reset {
            conn.execute_batch(
                r#"
                DROP TABLE IF EXISTS memory_vecs;
                DROP TABLE IF EXISTS memory_docs;
                DROP TABLE IF EXISTS summary_vecs;
                DROP TABLE IF EXISTS summary_docs;
                DROP TABLE IF EXISTS topic_vecs;
                DROP TABLE IF EXISTS topic_docs;
                "#,
            )?;
        }
        init_collections(&conn)
    }

    /// Add (or overwrite) a memory document and its embedding.
    pub fn add_memory(&self, id: &str, text: &str, topic: &str, tags: &[String]) -> Result<()> {
        let embedding = self.embedder.embed(text)?;
        let tags_json = serde_json::to_string(tags)?;
        let now = timestamp();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let created_at: Option<String> = tx
            .query_row(
                "SELECT created_at FROM memory_docs WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute(
            "INSERT OR REPLACE INTO memory_docs (id, document, topic, tags, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, text, topic, tags_json, created_at.unwrap_or_else(|| now.clone()), now],
        )?;
        replace_vec(&tx, "memory_vecs", "id", id, &embedding)?;
        tx.commit()?;
        Ok(())
    }

    /// Read-merge-write update: only provided fields are overwritten, and the
    /// embedding is recomputed only when the text changed. Returns `false`
    /// when the id is not present.
    pub fn update_memory(
        &self,
        id: &str,
        text: Option<&str>,
        topic: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<bool> {
        let embedding = match text {
            Some(t) => Some(self.embedder.embed(t)?),
            None => None,
        };
        let tags_json = match tags {
            Some(t) => Some(serde_json::to_string(t)?),
            None => None,
        };
        let now = timestamp();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current: Option<(String, String, String)> = tx
            .query_row(
                "SELECT document, topic, tags FROM memory_docs WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((cur_text, cur_topic, cur_tags)) = current else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE memory_docs SET document = ?1, topic = ?2, tags = ?3, updated_at = ?4 \
             WHERE id = ?5",
            params![
                text.unwrap_or(&cur_text),
                topic.unwrap_or(&cur_topic),
                tags_json.as_deref().unwrap_or(&cur_tags),
                now,
                id
            ],
        )?;
        if let Some(embedding) = embedding {
            replace_vec(&tx, "memory_vecs", "id", id, &embedding)?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn delete_memory(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows = tx.execute("DELETE FROM memory_docs WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM memory_vecs WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    pub fn search_memories(
        &self,
        query: &str,
        k: usize,
        topic: Option<&str>,
    ) -> Result<Vec<String>> {
        self.knn("memory_vecs", "memory_docs", "id", query, k, topic)
    }

    /// Add (or overwrite) a summary document and its embedding. Re-embedding
    /// under an existing id overwrites in place rather than duplicating.
    pub fn add_summary(
        &self,
        id: &str,
        text: &str,
        memory_id: &str,
        summary_type: &str,
        topic: &str,
    ) -> Result<()> {
        let embedding = self.embedder.embed(text)?;
        let now = timestamp();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let created_at: Option<String> = tx
            .query_row(
                "SELECT created_at FROM summary_docs WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute(
            "INSERT OR REPLACE INTO summary_docs \
             (id, document, memory_id, summary_type, topic, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                text,
                memory_id,
                summary_type,
                topic,
                created_at.unwrap_or_else(|| now.clone()),
                now
            ],
        )?;
        replace_vec(&tx, "summary_vecs", "id", id, &embedding)?;
        tx.commit()?;
        Ok(())
    }

    /// Re-embed an existing summary's text, keeping its metadata. Returns
    /// `false` when the id is not present.
    pub fn update_summary(&self, id: &str, text: &str) -> Result<bool> {
        let embedding = self.embedder.embed(text)?;
        let now = timestamp();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            "UPDATE summary_docs SET document = ?1, updated_at = ?2 WHERE id = ?3",
            params![text, now, id],
        )?;
        if rows == 0 {
            return Ok(false);
        }
        replace_vec(&tx, "summary_vecs", "id", id, &embedding)?;
        tx.commit()?;
        Ok(true)
    }

    /// Point a memory's summary documents at a new topic so topic-filtered
    /// retrieval stays coherent after the memory moves.
    pub fn retag_summaries(&self, memory_id: &str, topic: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE summary_docs SET topic = ?1, updated_at = ?2 WHERE memory_id = ?3",
            params![topic, timestamp(), memory_id],
        )?;
        Ok(())
    }

    pub fn delete_summary(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows = tx.execute("DELETE FROM summary_docs WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM summary_vecs WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    pub fn search_summaries(
        &self,
        query: &str,
        k: usize,
        topic: Option<&str>,
    ) -> Result<Vec<String>> {
        self.knn("summary_vecs", "summary_docs", "id", query, k, topic)
    }

    /// Create or refresh a topic document. The document text is synthesized
    /// from the name and tags and embedded for topic-level search.
    pub fn upsert_topic(&self, name: &str, tags: &[String]) -> Result<()> {
        let document = topic_document(name, tags);
        let embedding = self.embedder.embed(&document)?;
        let tags_json = if tags.is_empty() {
            None
        } else {
            Some(serde_json::to_string(tags)?)
        };
        let now = timestamp();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let created_at: Option<String> = tx
            .query_row(
                "SELECT created_at FROM topic_docs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute(
            "INSERT OR REPLACE INTO topic_docs (name, document, tags, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, document, tags_json, created_at.unwrap_or_else(|| now.clone()), now],
        )?;
        replace_vec(&tx, "topic_vecs", "name", name, &embedding)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_topic(&self, name: &str) -> Result<Option<TopicDoc>> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                "SELECT name, document, tags, created_at, updated_at FROM topic_docs WHERE name = ?1",
                params![name],
                |row| {
                    Ok(TopicDoc {
                        name: row.get(0)?,
                        document: row.get(1)?,
                        tags: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    pub fn get_summary(&self, id: &str) -> Result<Option<SummaryDoc>> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                "SELECT id, document, memory_id, summary_type, topic FROM summary_docs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(SummaryDoc {
                        id: row.get(0)?,
                        document: row.get(1)?,
                        memory_id: row.get(2)?,
                        summary_type: row.get(3)?,
                        topic: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    /// All memory ids in the index (drift reconciliation).
    pub fn memory_ids(&self) -> Result<Vec<String>> {
        self.ids_of("memory_docs", "id")
    }

    /// All summary ids in the index (drift reconciliation).
    pub fn summary_ids(&self) -> Result<Vec<String>> {
        self.ids_of("summary_docs", "id")
    }

    fn ids_of(&self, table: &str, key: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {key} FROM {table} ORDER BY {key}"))?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn status(&self) -> Result<VectorStatus> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok(VectorStatus {
            memory_vectors: count("memory_docs")?,
            summary_vectors: count("summary_docs")?,
            topic_vectors: count("topic_docs")?,
            vector_path: self.path.display().to_string(),
        })
    }

    /// KNN over one collection. With a topic filter the query over-fetches
    /// (4k, at least 32) and filters against the docs table, so filtered
    /// searches still fill `k` when enough matches exist.
    fn knn(
        &self,
        vec_table: &str,
        docs_table: &str,
        key: &str,
        query: &str,
        k: usize,
        topic: Option<&str>,
    ) -> Result<Vec<String>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query)?;
        debug_assert_eq!(embedding.len(), EMBEDDING_DIM);

        let fetch = if topic.is_some() { (k * 4).max(32) } else { k };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {key}, distance FROM {vec_table} \
             WHERE embedding MATCH ?1 ORDER BY distance LIMIT {fetch}"
        ))?;
        let mut candidates: Vec<(String, f64)> = stmt
            .query_map(params![embedding_to_bytes(&embedding)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Deterministic order: distance ascending, then id ascending.
        candidates.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut doc_stmt =
            conn.prepare(&format!("SELECT topic FROM {docs_table} WHERE {key} = ?1"))?;
        let mut results = Vec::with_capacity(k);
        for (id, _distance) in candidates {
            // A vec row without a doc row is mid-write or drifted: skip it so
            // callers never see a dangling id.
            let doc_topic: Option<String> = doc_stmt
                .query_row(params![id], |row| row.get(0))
                .optional()?;
            let Some(doc_topic) = doc_topic else {
                continue;
            };
            if let Some(filter) = topic {
                if doc_topic != filter {
                    continue;
                }
            }
            results.push(id);
            if results.len() == k {
                break;
            }
        }
        Ok(results)
    }
}

/// Create all six collection tables. Idempotent.
fn init_collections(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS memory_docs (
            id TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            topic TEXT NOT NULL,
            tags TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_memory_docs_topic ON memory_docs(topic);

        CREATE TABLE IF NOT EXISTS summary_docs (
            id TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            memory_id TEXT NOT NULL,
            summary_type TEXT NOT NULL,
            topic TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_summary_docs_memory ON summary_docs(memory_id);
        CREATE INDEX IF NOT EXISTS idx_summary_docs_topic ON summary_docs(topic);

        CREATE TABLE IF NOT EXISTS topic_docs (
            name TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            tags TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS memory_vecs USING vec0(
            id TEXT PRIMARY KEY,
            embedding FLOAT[{dim}]
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS summary_vecs USING vec0(
            id TEXT PRIMARY KEY,
            embedding FLOAT[{dim}]
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS topic_vecs USING vec0(
            name TEXT PRIMARY KEY,
            embedding FLOAT[{dim}]
        );
        "#,
        dim = EMBEDDING_DIM
    ))?;
    Ok(())
}

/// vec0 has no INSERT OR REPLACE, so overwrite is delete-then-insert.
fn replace_vec(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    key: &str,
    id: &str,
    embedding: &[f32],
) -> Result<()> {
    tx.execute(&format!("DELETE FROM {table} WHERE {key} = ?1"), params![id])?;
    tx.execute(
        &format!("INSERT INTO {table} ({key}, embedding) VALUES (?1, ?2)"),
        params![id, embedding_to_bytes(embedding)],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashed::HashedEmbeddingProvider;

    fn store() -> VectorStore {
        VectorStore::open_in_memory(Arc::new(HashedEmbeddingProvider)).unwrap()
    }

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_and_search_memories() {
        let vs = store();
        vs.add_memory("m1", "rust borrow checker ownership", "rust", &[]).unwrap();
        vs.add_memory("m2", "gardening tomatoes in spring", "garden", &[]).unwrap();

        let ids = vs.search_memories("rust ownership", 2, None).unwrap();
        assert_eq!(ids.first().map(String::as_str), Some("m1"));
    }

    #[test]
    fn topic_filter_restricts_results() {
        let vs = store();
        vs.add_memory("m1", "weekly planning notes", "work", &[]).unwrap();
        vs.add_memory("m2", "weekly planning notes", "personal", &[]).unwrap();

        let ids = vs.search_memories("planning notes", 5, Some("work")).unwrap();
        assert_eq!(ids, vec!["m1".to_string()]);
    }

    #[test]
    fn ties_break_by_id_ascending() {
        let vs = store();
        // Identical documents produce identical embeddings and distances.
        vs.add_memory("b-id", "same text", "t", &[]).unwrap();
        vs.add_memory("a-id", "same text", "t", &[]).unwrap();

        let ids = vs.search_memories("same text", 2, None).unwrap();
        assert_eq!(ids, vec!["a-id".to_string(), "b-id".to_string()]);
    }

    #[test]
    fn search_with_zero_k_is_empty() {
        let vs = store();
        vs.add_memory("m1", "anything", "t", &[]).unwrap();
        assert!(vs.search_memories("anything", 0, None).unwrap().is_empty());
    }

    #[test]
    fn update_merges_only_changed_fields() {
        let vs = store();
        vs.add_memory("m1", "original text", "old", &tags(&["a"])).unwrap();

        assert!(vs.update_memory("m1", None, Some("new"), None).unwrap());

        let ids = vs.search_memories("original text", 5, Some("new")).unwrap();
        assert_eq!(ids, vec!["m1".to_string()]);
    }

    #[test]
    fn update_missing_memory_returns_false() {
        let vs = store();
        assert!(!vs.update_memory("nope", Some("x"), None, None).unwrap());
    }

    #[test]
    fn delete_memory_removes_doc_and_vector() {
        let vs = store();
        vs.add_memory("m1", "to be deleted", "t", &[]).unwrap();

        assert!(vs.delete_memory("m1").unwrap());
        assert!(!vs.delete_memory("m1").unwrap());
        assert!(vs.search_memories("to be deleted", 5, None).unwrap().is_empty());
        assert!(vs.memory_ids().unwrap().is_empty());
    }

    #[test]
    fn summary_upsert_overwrites_without_duplicating() {
        let vs = store();
        vs.add_summary("s1", "first text", "m1", "abstractive_medium", "t").unwrap();
        vs.add_summary("s1", "second text", "m1", "abstractive_medium", "t").unwrap();

        assert_eq!(vs.summary_ids().unwrap(), vec!["s1".to_string()]);
        let doc = vs.get_summary("s1").unwrap().unwrap();
        assert_eq!(doc.document, "second text");
        assert_eq!(doc.memory_id, "m1");
    }

    #[test]
    fn update_summary_reembeds_existing_text() {
        let vs = store();
        vs.add_summary("s1", "old words here", "m1", "abstractive_medium", "t").unwrap();

        assert!(vs.update_summary("s1", "fresh replacement words").unwrap());
        assert!(!vs.update_summary("missing", "x").unwrap());

        let ids = vs.search_summaries("fresh replacement words", 1, None).unwrap();
        assert_eq!(ids, vec!["s1".to_string()]);
    }

    #[test]
    fn retag_summaries_follows_topic_move() {
        let vs = store();
        vs.add_summary("s1", "summary text", "m1", "abstractive_medium", "old").unwrap();

        vs.retag_summaries("m1", "new").unwrap();

        let ids = vs.search_summaries("summary text", 5, Some("new")).unwrap();
        assert_eq!(ids, vec!["s1".to_string()]);
    }

    #[test]
    fn topic_upsert_roundtrip() {
        let vs = store();
        vs.upsert_topic("rust", &tags(&["memory", "ownership"])).unwrap();
        vs.upsert_topic("rust", &tags(&["lifetimes"])).unwrap();

        let doc = vs.get_topic("rust").unwrap().unwrap();
        assert!(doc.document.contains("lifetimes"));
        assert!(vs.get_topic("missing").unwrap().is_none());
    }

    #[test]
    fn status_counts_collections() {
        let vs = store();
        vs.add_memory("m1", "text", "t", &[]).unwrap();
        vs.add_summary("s1", "sum", "m1", "abstractive_medium", "t").unwrap();
        vs.upsert_topic("t", &[]).unwrap();

        let status = vs.status().unwrap();
        assert_eq!(status.memory_vectors, 1);
        assert_eq!(status.summary_vectors, 1);
        assert_eq!(status.topic_vectors, 1);
    }

    #[test]
    fn reset_wipes_collections() {
        let vs = store();
        vs.add_memory("m1", "text", "t", &[]).unwrap();

        vs.initialize(true).unwrap();

        let status = vs.status().unwrap();
        assert_eq!(status.memory_vectors, 0);
        assert!(vs.search_memories("text", 5, None).unwrap().is_empty());
    }
}
