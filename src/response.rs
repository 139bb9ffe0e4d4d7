//! Uniform response envelope, ids, and timestamps.
//!
//! Every public engine operation returns an [`Envelope`] — `{status, message,
//! ...data}` — so the RPC boundary never sees a raised error. Error envelopes
//! carry a semantic [`ErrorKind`] under `error_details`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Generate a unique ID for a memory or summary row (UUID v4).
pub fn create_memory_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an ISO-8601 / RFC-3339 string (UTC).
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Semantic error categories surfaced in error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing required selector, empty content, reserved tag characters,
    /// unknown enum value.
    InvalidArgument,
    /// Operation references a memory id that does not exist.
    NotFound,
    /// Unique-constraint violation (e.g. second default summary for a memory).
    Conflict,
    /// Summarization API unreachable or unauthenticated.
    DependencyUnavailable,
    /// Relational or vector backend I/O failure.
    StoreIo,
    /// One store accepted the write and its mirror did not.
    PartialWrite,
    /// Unanticipated failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::DependencyUnavailable => "dependency_unavailable",
            Self::StoreIo => "store_io",
            Self::PartialWrite => "partial_write",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform operation result: `{status, message, ...data}` plus
/// `error_details` on failures and an optional `warning` on degraded writes.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    status: &'static str,
    message: String,
    #[serde(flatten)]
    data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_details: Option<Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            data: Map::new(),
            error_details: None,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut details = Map::new();
        details.insert("kind".into(), Value::String(kind.as_str().into()));
        Self {
            status: "error",
            message: message.into(),
            data: Map::new(),
            error_details: Some(Value::Object(details)),
        }
    }

    /// Attach a data field. Serialization failures of caller-supplied values
    /// are programming errors, so this falls back to `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.into(), value);
        self
    }

    /// Attach a detail field under `error_details`.
    pub fn with_detail(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        if let Some(Value::Object(map)) = self.error_details.as_mut() {
            map.insert(key.into(), value);
        } else {
            let mut map = Map::new();
            map.insert(key.into(), value);
            self.error_details = Some(Value::Object(map));
        }
        self
    }

    /// Append a warning to the `warning` field. A degraded-but-successful
    /// write stays `status: ok` and reports what went sideways here.
    pub fn warn(mut self, kind: ErrorKind, note: &str) -> Self {
        let entry = format!("{kind}: {note}");
        let merged = match self.data.get("warning").and_then(Value::as_str) {
            Some(existing) => format!("{existing}; {entry}"),
            None => entry,
        };
        self.data.insert("warning".into(), Value::String(merged));
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Read back a data field (test and tool-layer convenience).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("envelope is always serializable")
    }
}
