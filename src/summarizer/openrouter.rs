//! OpenRouter-backed [`Summarizer`] via the chat-completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_system_prompt, SummarizeError, Summarizer, SummaryKind, SummaryLength};
use crate::config::SummarizerConfig;

/// Upstream deadline; summarization is the slowest dependency on the write
/// path and must not hold a store call open indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct OpenRouterSummarizer {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenRouterSummarizer {
    pub fn new(config: &SummarizerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            http,
            api_key: config.api_key.trim().to_string(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl Summarizer for OpenRouterSummarizer {
    async fn summarize(
        &self,
        text: &str,
        kind: SummaryKind,
        length: SummaryLength,
        query: Option<&str>,
    ) -> Result<String, SummarizeError> {
        // Validate before touching the network so a bad request never counts
        // against the API.
        let system_prompt = build_system_prompt(kind, length, query)?;

        if !self.is_configured() {
            return Err(SummarizeError::Unavailable(
                "OPENROUTER_API_KEY is not set".into(),
            ));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: format!("Please summarize the following text:\n\n{text}"),
                },
            ],
        };

        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizeError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SummarizeError::Unavailable(format!(
                "authentication rejected ({status})"
            )));
        }
        if !status.is_success() {
            return Err(SummarizeError::Unavailable(format!(
                "API returned {status}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Unavailable(format!("malformed response: {e}")))?;

        let summary = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if summary.trim().is_empty() {
            return Err(SummarizeError::Unavailable(
                "model returned an empty completion".into(),
            ));
        }

        tracing::debug!(model = %self.model, chars = summary.len(), "summary generated");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarizer(api_key: &str) -> OpenRouterSummarizer {
        OpenRouterSummarizer::new(&SummarizerConfig {
            api_key: api_key.into(),
            endpoint: "https://api.openrouter.ai/v1/".into(),
            model: "openai/gpt-4o-mini".into(),
        })
    }

    #[test]
    fn endpoint_trailing_slash_is_normalized() {
        let s = summarizer("key");
        assert_eq!(s.endpoint, "https://api.openrouter.ai/v1");
    }

    #[test]
    fn blank_api_key_means_unconfigured() {
        assert!(!summarizer("   ").is_configured());
        assert!(summarizer("sk-or-abc").is_configured());
    }

    #[tokio::test]
    async fn unconfigured_summarizer_is_unavailable_without_network() {
        let s = summarizer("");
        let err = s
            .summarize("some text", SummaryKind::Abstractive, SummaryLength::Medium, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Unavailable(_)));
    }

    #[tokio::test]
    async fn query_focused_without_query_fails_before_auth_check() {
        let s = summarizer("");
        let err = s
            .summarize("some text", SummaryKind::QueryFocused, SummaryLength::Short, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::InvalidArgument(_)));
    }
}
