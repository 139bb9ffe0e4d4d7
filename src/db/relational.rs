//! Authoritative relational store — topics, memory items, tags, summaries.
//!
//! Owns truth for all three entities. Topic refcounting is encapsulated here:
//! every write that touches a memory's topic adjusts `item_count` in the same
//! transaction, and a topic row whose count reaches zero is removed before the
//! transaction commits.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::response::timestamp;

/// A memory row with its hydrated tag list.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryItem {
    pub id: String,
    pub content: String,
    pub topic_name: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

/// A topic row.
#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub name: String,
    pub description: Option<String>,
    pub item_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A summary row.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub id: String,
    pub memory_id: String,
    pub summary_type: String,
    pub summary_text: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Name/count pair for the status report.
#[derive(Debug, Clone, Serialize)]
pub struct TopicCount {
    pub name: String,
    pub count: i64,
}

/// Relational-side statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RelationalStatus {
    pub total_memories: i64,
    pub total_topics: i64,
    pub total_summaries: i64,
    pub top_topics: Vec<TopicCount>,
    pub latest_item_date: Option<String>,
}

/// Outcome of [`RelationalStore::delete_topic_if_empty`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicDeleteOutcome {
    Deleted,
    NotFound,
    NotEmpty(i64),
}

/// Synthesize the human-readable description/document for a topic.
pub fn topic_document(name: &str, tags: &[String]) -> String {
    let about = if tags.is_empty() {
        name.to_string()
    } else {
        tags.join(", ")
    };
    format!("Topic {name} containing information about {about}")
}

/// Handle to the relational store. Cheap to clone; the underlying connection
/// is shared and every operation acquires it for its full duration.
#[derive(Clone)]
pub struct RelationalStore {
    conn: Arc<Mutex<Connection>>,
}

impl RelationalStore {
    /// Open (or create) the store at the given file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = super::open_relational(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = super::open_memory_relational()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("relational connection lock poisoned: {e}"))
    }

    /// Re-run schema initialization; with `reset` the tables are dropped and
    /// recreated first.
    pub fn initialize(&self, reset: bool) -> Result<()> {
        let conn = self.lock()?;
        if reset {
            super::schema::reset_schema(&conn).context("failed to reset relational schema")?;
        } else {
            super::schema::init_schema(&conn).context("failed to initialize relational schema")?;
        }
        Ok(())
    }

    /// Insert a new memory, bumping (or creating) its topic in the same
    /// transaction.
    pub fn insert_memory(
        &self,
        id: &str,
        content: &str,
        topic: &str,
        tags: &[String],
    ) -> Result<()> {
        let now = timestamp();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        add_to_topic(&tx, topic, tags, &now)?;

        tx.execute(
            "INSERT INTO memory_items (id, content, topic_name, created_at, updated_at, version) \
             VALUES (?1, ?2, ?3, ?4, ?4, 1)",
            params![id, content, topic, now],
        )?;
        replace_tags(&tx, id, tags)?;

        tx.commit()?;
        Ok(())
    }

    pub fn get_memory(&self, id: &str) -> Result<Option<MemoryItem>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, content, topic_name, created_at, updated_at, version \
                 FROM memory_items WHERE id = ?1",
                params![id],
                |row| {
                    Ok(MemoryItem {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        topic_name: row.get(2)?,
                        tags: Vec::new(),
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                        version: row.get(5)?,
                    })
                },
            )
            .optional()?;

        let Some(mut item) = row else {
            return Ok(None);
        };
        item.tags = load_tags(&conn, id)?;
        Ok(Some(item))
    }

    /// Update a memory row. Only provided fields change; `version` increments
    /// and, if the topic moves, both refcounts are adjusted in the same
    /// transaction. Returns `false` when the id does not exist.
    pub fn update_memory(
        &self,
        id: &str,
        content: Option<&str>,
        topic: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<bool> {
        let now = timestamp();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current: Option<(String, String)> = tx
            .query_row(
                "SELECT content, topic_name FROM memory_items WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((current_content, current_topic)) = current else {
            return Ok(false);
        };

        let new_content = content.unwrap_or(&current_content);
        let new_topic = topic.unwrap_or(&current_topic);
        let topic_changed = new_topic != current_topic;

        // The new topic row must exist before the memory row points at it.
        if topic_changed {
            let desc_tags = match tags {
                Some(t) => t.to_vec(),
                None => load_tags(&tx, id)?,
            };
            add_to_topic(&tx, new_topic, &desc_tags, &now)?;
        }

        tx.execute(
            "UPDATE memory_items \
             SET content = ?1, topic_name = ?2, updated_at = ?3, version = version + 1 \
             WHERE id = ?4",
            params![new_content, new_topic, now, id],
        )?;

        if topic_changed {
            remove_from_topic(&tx, &current_topic, &now)?;
        }
        if let Some(tags) = tags {
            replace_tags(&tx, id, tags)?;
        }

        tx.commit()?;
        Ok(true)
    }

    /// Delete a memory. The FK cascade removes its summaries and tags; the
    /// topic refcount is decremented (and the topic removed at zero) in the
    /// same transaction. Returns `false` when the id does not exist.
    pub fn delete_memory(&self, id: &str) -> Result<bool> {
        let now = timestamp();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let topic: Option<String> = tx
            .query_row(
                "SELECT topic_name FROM memory_items WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(topic) = topic else {
            return Ok(false);
        };

        tx.execute("DELETE FROM memory_items WHERE id = ?1", params![id])?;
        remove_from_topic(&tx, &topic, &now)?;

        tx.commit()?;
        Ok(true)
    }

    /// All topics, most recently touched first.
    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name, description, item_count, created_at, updated_at \
             FROM topics ORDER BY updated_at DESC",
        )?;
        let topics = stmt
            .query_map([], |row| {
                Ok(Topic {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    item_count: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(topics)
    }

    /// Remove a topic row only if it holds no memories. Zero-count rows
    /// cannot normally linger, so this mostly reconciles externally edited
    /// databases.
    pub fn delete_topic_if_empty(&self, name: &str) -> Result<TopicDeleteOutcome> {
        let conn = self.lock()?;
        let count: Option<i64> = conn
            .query_row(
                "SELECT item_count FROM topics WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match count {
            None => Ok(TopicDeleteOutcome::NotFound),
            Some(0) => {
                conn.execute("DELETE FROM topics WHERE name = ?1", params![name])?;
                Ok(TopicDeleteOutcome::Deleted)
            }
            Some(n) => Ok(TopicDeleteOutcome::NotEmpty(n)),
        }
    }

    pub fn store_summary(
        &self,
        id: &str,
        memory_id: &str,
        summary_type: &str,
        summary_text: &str,
    ) -> Result<()> {
        let now = timestamp();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO summaries (id, memory_id, summary_type, summary_text, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, memory_id, summary_type, summary_text, now],
        )?;
        Ok(())
    }

    /// Overwrite a summary's text in place. Returns `false` when the id does
    /// not exist.
    pub fn update_summary(&self, id: &str, summary_text: &str) -> Result<bool> {
        let now = timestamp();
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE summaries SET summary_text = ?1, updated_at = ?2 WHERE id = ?3",
            params![summary_text, now, id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_summary(&self, memory_id: &str, summary_type: &str) -> Result<Option<Summary>> {
        let conn = self.lock()?;
        let summary = conn
            .query_row(
                "SELECT id, memory_id, summary_type, summary_text, created_at, updated_at \
                 FROM summaries WHERE memory_id = ?1 AND summary_type = ?2",
                params![memory_id, summary_type],
                map_summary_row,
            )
            .optional()?;
        Ok(summary)
    }

    pub fn get_summary_by_id(&self, id: &str) -> Result<Option<Summary>> {
        let conn = self.lock()?;
        let summary = conn
            .query_row(
                "SELECT id, memory_id, summary_type, summary_text, created_at, updated_at \
                 FROM summaries WHERE id = ?1",
                params![id],
                map_summary_row,
            )
            .optional()?;
        Ok(summary)
    }

    /// All summaries for a memory, oldest first. Used by the delete path to
    /// capture vector ids before the cascade destroys the rows.
    pub fn list_summaries(&self, memory_id: &str) -> Result<Vec<Summary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, memory_id, summary_type, summary_text, created_at, updated_at \
             FROM summaries WHERE memory_id = ?1 ORDER BY created_at",
        )?;
        let summaries = stmt
            .query_map(params![memory_id], map_summary_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    pub fn status(&self) -> Result<RelationalStatus> {
        let conn = self.lock()?;

        let total_memories: i64 =
            conn.query_row("SELECT COUNT(*) FROM memory_items", [], |row| row.get(0))?;
        let total_topics: i64 =
            conn.query_row("SELECT COUNT(*) FROM topics", [], |row| row.get(0))?;
        let total_summaries: i64 =
            conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT name, item_count FROM topics ORDER BY item_count DESC, name LIMIT 5",
        )?;
        let top_topics = stmt
            .query_map([], |row| {
                Ok(TopicCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let latest_item_date: Option<String> = conn
            .query_row(
                "SELECT created_at FROM memory_items ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(RelationalStatus {
            total_memories,
            total_topics,
            total_summaries,
            top_topics,
            latest_item_date,
        })
    }

    /// All live memory ids (drift reconciliation).
    pub fn memory_ids(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM memory_items ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// All summary ids (drift reconciliation).
    pub fn summary_ids(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM summaries ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Summary> {
    Ok(Summary {
        id: row.get(0)?,
        memory_id: row.get(1)?,
        summary_type: row.get(2)?,
        summary_text: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn load_tags(conn: &Connection, memory_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT tag FROM memory_tags WHERE memory_id = ?1 ORDER BY position")?;
    let tags = stmt
        .query_map(params![memory_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn replace_tags(tx: &Transaction<'_>, memory_id: &str, tags: &[String]) -> Result<()> {
    tx.execute("DELETE FROM memory_tags WHERE memory_id = ?1", params![memory_id])?;
    let mut stmt =
        tx.prepare("INSERT INTO memory_tags (memory_id, position, tag) VALUES (?1, ?2, ?3)")?;
    for (position, tag) in tags.iter().enumerate() {
        stmt.execute(params![memory_id, position as i64, tag])?;
    }
    Ok(())
}

/// Create-with-1 or increment the topic's refcount.
fn add_to_topic(tx: &Transaction<'_>, name: &str, tags: &[String], now: &str) -> Result<()> {
    let exists: Option<i64> = tx
        .query_row(
            "SELECT item_count FROM topics WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    match exists {
        None => {
            tx.execute(
                "INSERT INTO topics (name, description, item_count, created_at, updated_at) \
                 VALUES (?1, ?2, 1, ?3, ?3)",
                params![name, topic_document(name, tags), now],
            )?;
        }
        Some(_) => {
            tx.execute(
                "UPDATE topics SET item_count = item_count + 1, updated_at = ?2 WHERE name = ?1",
                params![name, now],
            )?;
        }
    }
    Ok(())
}

/// Decrement the topic's refcount, floored at zero, and drop the row when it
/// empties.
fn remove_from_topic(tx: &Transaction<'_>, name: &str, now: &str) -> Result<()> {
    tx.execute(
        "UPDATE topics SET item_count = MAX(item_count - 1, 0), updated_at = ?2 WHERE name = ?1",
        params![name, now],
    )?;
    tx.execute(
        "DELETE FROM topics WHERE name = ?1 AND item_count = 0",
        params![name],
    )?;
    Ok(())
}
