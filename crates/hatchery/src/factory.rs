//! Agent factory: turns a creation request into a validated descriptor.
//!
//! The factory builds a prompt from the request, asks a [`Generator`] for a
//! [`DescriptorDraft`], and validates the draft before it can reach the
//! registry. It never touches the registry or the store itself.

use crate::{AgentDescriptor, Error, Result, descriptor};
use heck::ToSnakeCase;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::{future::Future, time::Duration};

/// Default bound on a single generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Agent type used when a request does not name one.
pub const DEFAULT_AGENT_TYPE: &str = "general";

/// Arguments of a `create_agent` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationRequest {
    /// Area of expertise.
    pub specialty: String,
    /// What the agent should achieve.
    pub goal: String,
    /// The task that triggered the creation.
    pub task: String,
    /// Kind of agent, `"general"` when absent.
    #[serde(default, alias = "agentType", skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

impl CreationRequest {
    /// Parse and validate tool-call arguments.
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self> {
        let request: Self = serde_json::from_value(Value::Object(arguments.clone()))
            .map_err(|e| Error::validation(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Check that every required field is non-empty.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("specialty", &self.specialty),
            ("goal", &self.goal),
            ("task", &self.task),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("field `{field}` must not be empty")));
            }
        }
        Ok(())
    }

    /// The requested agent type, defaulting to `"general"`.
    pub fn agent_type(&self) -> &str {
        match self.agent_type.as_deref().map(str::trim) {
            Some(kind) if !kind.is_empty() => kind,
            _ => DEFAULT_AGENT_TYPE,
        }
    }

    /// The prompt sent to the generator.
    pub fn prompt(&self) -> String {
        format!(
            "You are designing a new worker agent for a multi-agent system. \
             No existing agent can handle the task below.\n\n\
             Specialty: {}\n\
             Goal: {}\n\
             Task: {}\n\
             Agent type: {}\n\n\
             Respond with a JSON object with these fields:\n\
             - name: a short lowercase snake_case identifier, e.g. `stock_analyst`\n\
             - description: one or two sentences describing what the agent does\n\
             - inputSchema: a JSON schema of type \"object\" for the agent's arguments; \
             use a single string property named \"input\" unless the task needs more",
            self.specialty.trim(),
            self.goal.trim(),
            self.task.trim(),
            self.agent_type(),
        )
    }
}

/// The structured output requested from the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorDraft {
    /// Short lowercase snake_case identifier, e.g. `stock_analyst`.
    pub name: String,
    /// One or two sentences describing what the agent does.
    pub description: String,
    /// JSON schema of type "object" describing the agent's arguments.
    #[serde(alias = "input_schema")]
    pub input_schema: Value,
}

impl DescriptorDraft {
    /// Validate the draft and turn it into an active descriptor.
    ///
    /// The name is normalised to snake_case first. A missing schema `type` is
    /// filled in, and a schema without `properties` gets a single string
    /// `input` property.
    pub fn into_descriptor(self) -> Result<AgentDescriptor> {
        let name = self.name.trim().to_snake_case();
        if !descriptor::is_valid_name(&name) {
            return Err(Error::generation(format!(
                "generated name '{}' is not a snake_case identifier",
                self.name
            )));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::generation(format!(
                "generated description for '{name}' is empty"
            )));
        }

        let input_schema = normalize_schema(self.input_schema)?;
        Ok(AgentDescriptor::new(name, description, input_schema))
    }
}

/// Structured-generation collaborator.
///
/// Implementations call a language model and return its output parsed as a
/// [`DescriptorDraft`]. Any failure is reported as an error; the factory
/// treats every error alike.
pub trait Generator: Send + Sync {
    /// Generate a draft from a natural-language prompt.
    fn generate(&self, prompt: &str) -> impl Future<Output = anyhow::Result<DescriptorDraft>> + Send;
}

/// Creates agent descriptors through a [`Generator`].
pub struct AgentFactory<G> {
    generator: G,
    timeout: Duration,
}

impl<G: Generator> AgentFactory<G> {
    /// Create a factory with the default timeout.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the generation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The generation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate and validate a descriptor for `request`.
    ///
    /// One attempt only; timeouts, collaborator errors, and invalid drafts all
    /// surface as [`Error::Generation`].
    pub async fn create(&self, request: &CreationRequest) -> Result<AgentDescriptor> {
        let prompt = request.prompt();
        let draft = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await
        {
            Ok(Ok(draft)) => draft,
            Ok(Err(e)) => return Err(Error::generation(format!("{e:#}"))),
            Err(_) => {
                return Err(Error::generation(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f32()
                )));
            }
        };

        let mut descriptor = draft.into_descriptor()?;
        descriptor.specialty = Some(request.specialty.trim().to_owned());
        descriptor.goal = Some(request.goal.trim().to_owned());
        Ok(descriptor)
    }
}

fn normalize_schema(schema: Value) -> Result<Map<String, Value>> {
    // Some models return the schema as an encoded JSON string.
    let schema = match schema {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(|e| {
            Error::generation(format!("inputSchema string is not valid JSON: {e}"))
        })?,
        other => other,
    };
    let Value::Object(mut map) = schema else {
        return Err(Error::generation("inputSchema must be a JSON object"));
    };

    match map.get("type").cloned() {
        None => {
            map.insert("type".into(), json!("object"));
        }
        Some(Value::String(kind)) if kind == "object" => {}
        Some(other) => {
            return Err(Error::generation(format!(
                "inputSchema type must be \"object\", got {other}"
            )));
        }
    }

    match map.get("properties").map(Value::is_object) {
        None => {
            map.insert(
                "properties".into(),
                json!({ "input": { "type": "string", "description": "Input for the agent" } }),
            );
        }
        Some(true) => {}
        Some(false) => return Err(Error::generation("inputSchema properties must be an object")),
    }

    if let Some(required) = map.get("required") {
        let valid = required
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !valid {
            return Err(Error::generation(
                "inputSchema required must be an array of strings",
            ));
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, schema: Value) -> DescriptorDraft {
        DescriptorDraft {
            name: name.into(),
            description: "Analyzes stocks".into(),
            input_schema: schema,
        }
    }

    #[test]
    fn name_normalized_to_snake_case() {
        let descriptor = draft("Stock Analyst", json!({})).into_descriptor().unwrap();
        assert_eq!(descriptor.name, "stock_analyst");

        let descriptor = draft("StockAnalyst", json!({})).into_descriptor().unwrap();
        assert_eq!(descriptor.name, "stock_analyst");
    }

    #[test]
    fn unusable_name_rejected() {
        let err = draft("   ", json!({})).into_descriptor().unwrap_err();
        assert!(matches!(err, Error::Generation(_)));

        let err = draft("42", json!({})).into_descriptor().unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn empty_description_rejected() {
        let mut d = draft("analyst", json!({}));
        d.description = " ".into();
        assert!(matches!(d.into_descriptor(), Err(Error::Generation(_))));
    }

    #[test]
    fn schema_defaults_filled_in() {
        let descriptor = draft("analyst", json!({})).into_descriptor().unwrap();
        assert_eq!(descriptor.input_schema["type"], "object");
        assert_eq!(
            descriptor.input_schema["properties"]["input"]["type"],
            "string"
        );
    }

    #[test]
    fn schema_string_is_decoded() {
        let encoded = json!(r#"{"type":"object","properties":{"ticker":{"type":"string"}}}"#);
        let descriptor = draft("analyst", encoded).into_descriptor().unwrap();
        assert!(descriptor.input_schema["properties"]["ticker"].is_object());
    }

    #[test]
    fn malformed_schema_rejected() {
        for schema in [
            json!([]),
            json!({ "type": "array" }),
            json!({ "properties": [] }),
            json!({ "required": "input" }),
            json!({ "required": [1] }),
            json!("not json"),
        ] {
            let err = draft("analyst", schema.clone()).into_descriptor().unwrap_err();
            assert!(matches!(err, Error::Generation(_)), "accepted {schema}");
        }
    }

    #[test]
    fn request_requires_fields() {
        let err = CreationRequest::from_arguments(&Map::new()).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn request_rejects_blank_fields() {
        let args = json!({ "specialty": "x", "goal": "  ", "task": "y" });
        let err = CreationRequest::from_arguments(args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "field `goal` must not be empty");
    }

    #[test]
    fn request_rejects_non_string_fields() {
        let args = json!({ "specialty": 1, "goal": "g", "task": "t" });
        let err = CreationRequest::from_arguments(args.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn agent_type_defaults_to_general() {
        let args = json!({ "specialty": "s", "goal": "g", "task": "t" });
        let request = CreationRequest::from_arguments(args.as_object().unwrap()).unwrap();
        assert_eq!(request.agent_type(), "general");

        let args = json!({ "specialty": "s", "goal": "g", "task": "t", "agentType": "analyst" });
        let request = CreationRequest::from_arguments(args.as_object().unwrap()).unwrap();
        assert_eq!(request.agent_type(), "analyst");
    }

    #[test]
    fn prompt_embeds_request() {
        let request = CreationRequest {
            specialty: "Stock Analyst".into(),
            goal: "Summarize ticker performance".into(),
            task: "Analyze TSLA".into(),
            agent_type: Some("analyst".into()),
        };
        let prompt = request.prompt();
        for needle in [
            "Stock Analyst",
            "Summarize ticker performance",
            "Analyze TSLA",
            "analyst",
        ] {
            assert!(prompt.contains(needle));
        }
    }

    #[test]
    fn draft_schema_names_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(DescriptorDraft)).unwrap();
        let properties = &schema["properties"];
        assert!(properties["name"].is_object());
        assert!(properties["description"].is_object());
        assert!(!properties["inputSchema"].is_null());
    }
}
