//! Protocol handler for `tools/list` and `tools/call`.
//!
//! The handler is stateless between requests; all mutable state lives in the
//! [`Registry`]. Every failure of a call is reported in-band through
//! [`CallResult::is_error`], never as a transport fault.

use crate::{
    AgentDescriptor, AgentFactory, CREATE_AGENT, CreationRequest, Error, Generator, Registry,
    ToolInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A typed content block of a call result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

impl Content {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of a `tools/call` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    /// Ordered content blocks.
    pub content: Vec<Content>,
    /// Whether the call failed.
    pub is_error: bool,
}

impl CallResult {
    /// A successful result with one text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// A failed result with one text block.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|Content::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Dispatches tool requests to the factory and the registry.
pub struct Handler<G> {
    registry: Arc<Registry>,
    factory: AgentFactory<G>,
}

impl<G: Generator> Handler<G> {
    /// Create a handler over a registry and a factory.
    pub fn new(registry: Arc<Registry>, factory: AgentFactory<G>) -> Self {
        Self { registry, factory }
    }

    /// The registry backing this handler.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Answer `tools/list`.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.registry.list()
    }

    /// Answer `tools/call`.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> CallResult {
        if name == CREATE_AGENT {
            return self.create_agent(&arguments).await;
        }

        match self.registry.get(name) {
            Some(agent) => invoke(&agent, arguments),
            None => {
                tracing::warn!("call to unknown tool '{name}'");
                CallResult::error(Error::UnknownTool(name.to_owned()).to_string())
            }
        }
    }

    async fn create_agent(&self, arguments: &Map<String, Value>) -> CallResult {
        let request = match CreationRequest::from_arguments(arguments) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("rejected {CREATE_AGENT} call: {e}");
                return CallResult::error(format!("Invalid arguments for {CREATE_AGENT}: {e}"));
            }
        };

        let descriptor = match self.factory.create(&request).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::error!(
                    specialty = %request.specialty,
                    task = %request.task,
                    "failed to create agent: {e}"
                );
                return CallResult::error("Failed to create agent");
            }
        };

        let name = descriptor.name.clone();
        let description = descriptor.description.clone();
        match self.registry.register(descriptor) {
            Ok(()) => CallResult::text(format!("Created agent '{name}': {description}")),
            Err(e) => {
                tracing::warn!("discarding generated agent: {e}");
                CallResult::error(format!("Failed to create agent: {e}"))
            }
        }
    }
}

/// Placeholder execution: echo the arguments back.
fn invoke(agent: &AgentDescriptor, arguments: Map<String, Value>) -> CallResult {
    tracing::info!("invoking agent '{}'", agent.name);
    CallResult::text(format!(
        "Agent '{}' received: {}",
        agent.name,
        Value::Object(arguments)
    ))
}
