use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::LlmError;

/// Longest input forwarded to the provider, in characters.
pub const MAX_PROMPT_CHARS: usize = 1_000_000;

const SUMMARY_INSTRUCTIONS: &str = "Please provide a concise summary of the following web \
    content, highlighting the key points and main topics (Only output the summarized content, \
    no explanations, no introductions):\n\n";

/// External text transformation applied after extraction.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

/// Summarizer backed by the Gemini `generateContent` REST endpoint.
///
/// Makes one call per link with no deadline of its own; the orchestrator
/// bounds each call with the configured summarize timeout.
pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiSummarizer {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
        }
    }

    /// Returns `None` when no provider credential is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .gemini_api_key
            .as_deref()
            .map(|key| Self::new(key, &config.gemini_base_url, &config.gemini_model))
    }

    async fn generate(&self, prompt: String) -> Result<String, LlmError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let res = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let raw = res.text().await?;
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap_or_default();

        if !status.is_success() {
            let message = json["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or(LlmError::InvalidResponse)?
            .trim()
            .to_string();

        Ok(reply)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, LlmError> {
        let prompt = build_prompt(text);
        debug!(prompt_chars = prompt.len(), "Calling summarization provider");

        self.generate(prompt).await
    }
}

pub fn build_prompt(content: &str) -> String {
    let content = truncate_chars(content, MAX_PROMPT_CHARS);

    let mut result = String::with_capacity(content.len() + 200);
    result.push_str(SUMMARY_INSTRUCTIONS);
    result.push_str(content);
    result
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
