//! Persistent memory for AI agents — hybrid relational + vector storage over MCP.
//!
//! Engram is an [MCP](https://modelcontextprotocol.io/) server that lets an
//! agent with a bounded working context offload durable facts and retrieve
//! them later by semantic similarity, topic, or id. Truth lives in SQLite;
//! dense embeddings for summary-first retrieval live in a
//! [sqlite-vec](https://github.com/asg017/sqlite-vec) index that mirrors the
//! relational rows and is reconstructible from them.
//!
//! # Architecture
//!
//! - **Relational store**: topics, memory items, tags, and summaries with
//!   foreign-key cascades and topic reference counting
//! - **Vector store**: `memories`, `summaries`, and `topics` collections with
//!   topic-filtered nearest-neighbor search
//! - **Summarization**: size-tiered default summaries via OpenRouter; tiny
//!   content is its own summary
//! - **Backups**: interval-gated zip snapshots of the data directory with
//!   retention pruning
//! - **Transport**: MCP over stdio (primary) or streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — configuration from TOML files and environment variables
//! - [`db`] — relational store: schema, pragmas, topic refcounting
//! - [`vector`] — sqlite-vec collections and nearest-neighbor search
//! - [`embedding`] — text-to-vector pipeline behind a provider trait
//! - [`summarizer`] — summarization capability and the size-tier policy
//! - [`backup`] — time-gated snapshotting with retention
//! - [`engine`] — the hybrid coordinator implementing the memory operations
//! - [`tools`] — MCP tool surface and documentation resources

pub mod backup;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod response;
pub mod server;
pub mod summarizer;
pub mod tools;
pub mod vector;
