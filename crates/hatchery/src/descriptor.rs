//! Agent descriptors and the reserved creation tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name of the built-in tool that mints new agents.
pub const CREATE_AGENT: &str = "create_agent";

/// Longest accepted descriptor name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Lifecycle status of a registered agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Listed and callable.
    #[default]
    Active,
    /// Retained on disk. Nothing sets this yet.
    Inactive,
}

/// The persisted record describing one dynamically created agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    /// Unique snake_case identifier, also the MCP tool name.
    pub name: String,

    /// What the agent does.
    pub description: String,

    /// JSON schema of the tool arguments.
    pub input_schema: Map<String, Value>,

    /// When the factory created the agent.
    pub registered_at: DateTime<Utc>,

    /// Lifecycle status.
    #[serde(default)]
    pub status: Status,

    /// Specialty from the creation request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,

    /// Goal from the creation request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl AgentDescriptor {
    /// Create an active descriptor registered now.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            registered_at: Utc::now(),
            status: Status::Active,
            specialty: None,
            goal: None,
        }
    }

    /// Whether the descriptor is active.
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// The listing entry for this descriptor.
    pub fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// One entry of a `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON schema of the tool arguments.
    pub input_schema: Map<String, Value>,
}

/// The reserved `create_agent` tool, always listed first.
pub fn create_agent_tool() -> ToolInfo {
    let schema = json!({
        "type": "object",
        "properties": {
            "specialty": {
                "type": "string",
                "description": "Area of expertise of the new agent, e.g. 'Stock Analyst'"
            },
            "goal": {
                "type": "string",
                "description": "What the new agent should achieve"
            },
            "task": {
                "type": "string",
                "description": "The task that no existing agent can handle"
            },
            "agent_type": {
                "type": "string",
                "description": "Kind of agent to create",
                "default": "general"
            }
        },
        "required": ["specialty", "goal", "task"]
    });

    ToolInfo {
        name: CREATE_AGENT.to_owned(),
        description: "Create a new specialized agent and register it as a tool. \
                      Use when no existing tool can handle a task."
            .to_owned(),
        input_schema: match schema {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

/// Whether `name` is a lowercase snake_case token.
///
/// Tokens start with a letter, contain only `a-z`, `0-9`, and `_`, and are at
/// most [`MAX_NAME_LEN`] bytes long.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_NAME_LEN
        && first.is_ascii_lowercase()
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
