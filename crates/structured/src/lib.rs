//! OpenAI-compatible structured generation.
//!
//! Implements [`hatchery::Generator`] against any service exposing the
//! OpenAI chat completions API (OpenAI, DeepSeek, Ollama, ...). The request
//! carries the JSON schema of [`DescriptorDraft`] as its response format and
//! the reply is parsed straight into a draft.

use anyhow::{Context, Result};
use hatchery::{DescriptorDraft, Generator};
pub use request::{Message, Request, Response};
pub use reqwest::Client;
use reqwest::header::{self, HeaderMap};

mod request;

/// OpenAI-compatible endpoint URLs.
pub mod endpoint {
    /// OpenAI chat completions.
    pub const OPENAI: &str = "https://api.openai.com/v1/chat/completions";
    /// DeepSeek chat completions.
    pub const DEEPSEEK: &str = "https://api.deepseek.com/chat/completions";
    /// Ollama local chat completions.
    pub const OLLAMA: &str = "http://localhost:11434/v1/chat/completions";
}

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// System prompt sent ahead of every factory prompt.
const SYSTEM_PROMPT: &str = "You design worker agents for a multi-agent system. \
                             Reply with a single JSON object and nothing else.";

/// A structured-generation client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAI {
    /// The HTTP client.
    pub client: Client,
    /// Request headers (authorization, content-type).
    headers: HeaderMap,
    /// Chat completions endpoint URL.
    endpoint: String,
    /// Model identifier.
    model: String,
    /// Sampling temperature.
    temperature: f32,
}

impl OpenAI {
    /// Create a client targeting the OpenAI API.
    pub fn api(client: Client, key: &str) -> Result<Self> {
        Self::custom(client, key, endpoint::OPENAI)
    }

    /// Create a client targeting a custom OpenAI-compatible endpoint.
    ///
    /// An empty key sends no authorization header.
    pub fn custom(client: Client, key: &str, endpoint: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse()?);
        headers.insert(header::ACCEPT, "application/json".parse()?);
        if !key.is_empty() {
            headers.insert(header::AUTHORIZATION, format!("Bearer {key}").parse()?);
        }
        Ok(Self {
            client,
            headers,
            endpoint: endpoint.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Set the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the request body for a factory prompt.
    pub fn request(&self, prompt: &str) -> Request {
        Request::new(&self.model, self.temperature)
            .message(Message::system(SYSTEM_PROMPT))
            .message(Message::user(prompt))
    }
}

impl Generator for OpenAI {
    async fn generate(&self, prompt: &str) -> Result<DescriptorDraft> {
        let body = self.request(prompt);
        tracing::debug!("request: {}", serde_json::to_string(&body)?);

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.endpoint))?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("response: {text}");

        if !status.is_success() {
            anyhow::bail!("generation backend returned {status}: {text}");
        }
        parse_draft(&text)
    }
}

/// Parse a chat completions response body into a draft.
pub fn parse_draft(body: &str) -> Result<DescriptorDraft> {
    let response: Response =
        serde_json::from_str(body).context("malformed chat completions response")?;
    let content = response
        .content()
        .context("chat completions response has no content")?;
    serde_json::from_str(strip_fence(content)).context("model output is not a descriptor draft")
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string, e.g. `json`.
    match inner.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('{') => rest.trim(),
        _ => inner.trim(),
    }
}
