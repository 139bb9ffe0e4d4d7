//! SQL DDL for the authoritative relational store.
//!
//! Defines `topics`, `memory_items`, `memory_tags`, `summaries`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization;
//! [`reset_schema`] drops everything (children first) and recreates it.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const SCHEMA_VERSION: u32 = 1;

/// All schema DDL statements for the relational store.
///
/// Topic rows are reference-counted: `item_count` tracks live memories per
/// topic and rows are removed when the count reaches zero, so a zero-count
/// row never persists past its transaction.
const SCHEMA_SQL: &str = r#"
-- Topic buckets, reference-counted by live memories
CREATE TABLE IF NOT EXISTS topics (
    name TEXT PRIMARY KEY,
    description TEXT,
    item_count INTEGER NOT NULL DEFAULT 0 CHECK(item_count >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Authoritative memory rows
CREATE TABLE IF NOT EXISTS memory_items (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    topic_name TEXT NOT NULL REFERENCES topics(name),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_memory_items_topic ON memory_items(topic_name);
CREATE INDEX IF NOT EXISTS idx_memory_items_created ON memory_items(created_at);

-- Ordered tag list per memory (set semantics with display order)
CREATE TABLE IF NOT EXISTS memory_tags (
    memory_id TEXT NOT NULL REFERENCES memory_items(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (memory_id, position)
);

CREATE INDEX IF NOT EXISTS idx_memory_tags_tag ON memory_tags(tag);

-- Derived summaries, at most one per (memory, type)
CREATE TABLE IF NOT EXISTS summaries (
    id TEXT PRIMARY KEY,
    memory_id TEXT NOT NULL REFERENCES memory_items(id) ON DELETE CASCADE,
    summary_type TEXT NOT NULL,
    summary_text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (memory_id, summary_type)
);

CREATE INDEX IF NOT EXISTS idx_summaries_memory ON summaries(memory_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Drop and recreate all tables. Children are dropped before parents so
/// foreign-key enforcement never blocks the wipe.
pub fn reset_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS summaries;
        DROP TABLE IF EXISTS memory_tags;
        DROP TABLE IF EXISTS memory_items;
        DROP TABLE IF EXISTS topics;
        DROP TABLE IF EXISTS schema_meta;
        "#,
    )?;
    init_schema(conn)
}
