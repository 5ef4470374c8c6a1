//! Chat completions request and response bodies.

use hatchery::DescriptorDraft;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Name of the structured output format.
const FORMAT_NAME: &str = "agent_descriptor";

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the author.
    pub role: String,
    /// The message content.
    #[serde(default)]
    pub content: Option<String>,
}

impl Message {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: Some(content.into()),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: Some(content.into()),
        }
    }
}

/// The request body for the chat completions API.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model we are using.
    pub model: String,

    /// The messages to send.
    pub messages: Vec<Message>,

    /// The sampling temperature.
    pub temperature: f32,

    /// Structured output format: the JSON schema of a descriptor draft.
    pub response_format: Value,
}

impl Request {
    /// Create a request with no messages.
    pub fn new(model: &str, temperature: f32) -> Self {
        let schema = schemars::schema_for!(DescriptorDraft);
        Self {
            model: model.to_owned(),
            messages: Vec::new(),
            temperature,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": FORMAT_NAME,
                    "schema": schema,
                    "strict": false
                }
            }),
        }
    }

    /// Append a message.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

/// The subset of a chat completions response we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Completion choices.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: Message,
}

impl Response {
    /// Non-empty content of the first choice.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.trim().is_empty())
    }
}
