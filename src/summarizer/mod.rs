//! Summarization capability and the size-tier policy.
//!
//! [`Summarizer`] is the abstract LLM-backed capability the engine consumes;
//! [`SummaryTier`] decides how the default summary for a memory is produced
//! from its content length. The default summary row is always stored under
//! the type [`DEFAULT_SUMMARY_TYPE`] regardless of tier, so the engine's
//! "find the default" lookup stays deterministic.

pub mod openrouter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type string under which every default summary is stored.
pub const DEFAULT_SUMMARY_TYPE: &str = "abstractive_medium";

/// How the summarizer should compress text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Rephrase and synthesize the information.
    Abstractive,
    /// Select key sentences directly from the text.
    Extractive,
    /// Answer a specific query; requires the query to be present.
    QueryFocused,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abstractive => "abstractive",
            Self::Extractive => "extractive",
            Self::QueryFocused => "query_focused",
        }
    }
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SummaryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abstractive" => Ok(Self::Abstractive),
            "extractive" => Ok(Self::Extractive),
            "query_focused" => Ok(Self::QueryFocused),
            _ => Err(format!("unknown summary type: {s}")),
        }
    }
}

/// Desired summary length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLength {
    Short,
    Medium,
    Detailed,
}

impl SummaryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Detailed => "detailed",
        }
    }
}

impl std::fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "detailed" => Ok(Self::Detailed),
            _ => Err(format!("unknown summary length: {s}")),
        }
    }
}

/// Content-length bucket controlling default-summary generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryTier {
    /// Below the tiny threshold the content is its own summary; the
    /// summarizer is never consulted.
    Tiny,
    Small,
    Large,
}

impl SummaryTier {
    /// Pick the tier for a content length (in characters). Boundaries are
    /// half-open: `[0, tiny)` is tiny, `[tiny, small)` is small, the rest is
    /// large.
    pub fn for_content_len(len: usize, tiny_threshold: usize, small_threshold: usize) -> Self {
        if len < tiny_threshold {
            Self::Tiny
        } else if len < small_threshold {
            Self::Small
        } else {
            Self::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Large => "large",
        }
    }

    /// The summarizer call this tier makes, or `None` when the content is
    /// used directly.
    pub fn strategy(&self) -> Option<(SummaryKind, SummaryLength)> {
        match self {
            Self::Tiny => None,
            Self::Small => Some((SummaryKind::Extractive, SummaryLength::Short)),
            Self::Large => Some((SummaryKind::Abstractive, SummaryLength::Medium)),
        }
    }
}

impl std::fmt::Display for SummaryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a summarization request failed.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("invalid summarization request: {0}")]
    InvalidArgument(String),
    #[error("summarization unavailable: {0}")]
    Unavailable(String),
}

/// Abstract summarization capability.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a summary of `text`. `query` is only meaningful (and then
    /// mandatory) for [`SummaryKind::QueryFocused`].
    async fn summarize(
        &self,
        text: &str,
        kind: SummaryKind,
        length: SummaryLength,
        query: Option<&str>,
    ) -> Result<String, SummarizeError>;
}

/// Build the system prompt for a summarization request. Validates the
/// query-focused/query pairing so every implementation rejects it uniformly.
pub fn build_system_prompt(
    kind: SummaryKind,
    length: SummaryLength,
    query: Option<&str>,
) -> Result<String, SummarizeError> {
    let mut prompt = format!(
        "You are a highly skilled summarization AI. Your task is to provide a {length} summary."
    );

    match kind {
        SummaryKind::Abstractive => {
            prompt.push_str(
                " The summary should be abstractive, meaning you should rephrase and synthesize the information.",
            );
        }
        SummaryKind::Extractive => {
            prompt.push_str(
                " The summary should be extractive, meaning you should select key sentences directly from the text.",
            );
        }
        SummaryKind::QueryFocused => match query {
            Some(q) if !q.trim().is_empty() => {
                prompt.push_str(&format!(
                    " The summary should be focused on answering the following query: '{q}'."
                ));
            }
            _ => {
                return Err(SummarizeError::InvalidArgument(
                    "query must be provided for query_focused summaries".into(),
                ));
            }
        },
    }

    prompt.push_str(" Ensure the summary is concise, accurate, and captures the main points.");

    match length {
        SummaryLength::Short => {
            prompt.push_str(" Keep the summary very brief, around 1-2 sentences.");
        }
        SummaryLength::Medium => {
            prompt.push_str(" Aim for a summary of 3-5 sentences.");
        }
        SummaryLength::Detailed => {
            prompt.push_str(
                " Provide a comprehensive summary, covering all important aspects, around 5-10 sentences.",
            );
        }
    }

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_are_half_open() {
        assert_eq!(SummaryTier::for_content_len(0, 500, 2000), SummaryTier::Tiny);
        assert_eq!(SummaryTier::for_content_len(499, 500, 2000), SummaryTier::Tiny);
        assert_eq!(SummaryTier::for_content_len(500, 500, 2000), SummaryTier::Small);
        assert_eq!(SummaryTier::for_content_len(1999, 500, 2000), SummaryTier::Small);
        assert_eq!(SummaryTier::for_content_len(2000, 500, 2000), SummaryTier::Large);
        assert_eq!(SummaryTier::for_content_len(30_000, 500, 2000), SummaryTier::Large);
    }

    #[test]
    fn tier_strategies_match_policy() {
        assert_eq!(SummaryTier::Tiny.strategy(), None);
        assert_eq!(
            SummaryTier::Small.strategy(),
            Some((SummaryKind::Extractive, SummaryLength::Short))
        );
        assert_eq!(
            SummaryTier::Large.strategy(),
            Some((SummaryKind::Abstractive, SummaryLength::Medium))
        );
    }

    #[test]
    fn kind_and_length_parse_roundtrip() {
        for kind in ["abstractive", "extractive", "query_focused"] {
            let parsed: SummaryKind = kind.parse().unwrap();
            assert_eq!(parsed.as_str(), kind);
        }
        for length in ["short", "medium", "detailed"] {
            let parsed: SummaryLength = length.parse().unwrap();
            assert_eq!(parsed.as_str(), length);
        }
        assert!("lossy".parse::<SummaryKind>().is_err());
        assert!("huge".parse::<SummaryLength>().is_err());
    }

    #[test]
    fn query_focused_requires_query() {
        let err = build_system_prompt(SummaryKind::QueryFocused, SummaryLength::Short, None);
        assert!(matches!(err, Err(SummarizeError::InvalidArgument(_))));

        let err = build_system_prompt(SummaryKind::QueryFocused, SummaryLength::Short, Some("  "));
        assert!(matches!(err, Err(SummarizeError::InvalidArgument(_))));

        let ok = build_system_prompt(
            SummaryKind::QueryFocused,
            SummaryLength::Short,
            Some("what changed?"),
        )
        .unwrap();
        assert!(ok.contains("what changed?"));
    }

    #[test]
    fn prompt_mentions_kind_and_length() {
        let prompt =
            build_system_prompt(SummaryKind::Extractive, SummaryLength::Detailed, None).unwrap();
        assert!(prompt.contains("extractive"));
        assert!(prompt.contains("detailed summary"));
        assert!(prompt.contains("5-10 sentences"));
    }
}
