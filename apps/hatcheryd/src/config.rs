//! Daemon configuration loaded from TOML.

use anyhow::{Context, Result, bail};
use hatchery::ListPolicy;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "hatchery.toml";

/// Top-level daemon configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation backend.
    pub llm: LlmConfig,
    /// Transport and access control.
    pub server: ServerConfig,
    /// Descriptor persistence and listing.
    pub registry: RegistryConfig,
}

/// Structured-generation backend configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// API key (supports `${ENV_VAR}` expansion).
    pub api_key: String,
    /// Optional chat completions endpoint override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Bound on a single generation call, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: structured::DEFAULT_MODEL.to_owned(),
            temperature: structured::DEFAULT_TEMPERATURE,
            api_key: "${OPENAI_API_KEY}".to_owned(),
            base_url: None,
            timeout_secs: hatchery::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl LlmConfig {
    /// The generation timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which transport the daemon serves MCP on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Streamable HTTP on `host:port`.
    #[default]
    Http,
    /// Newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
}

/// Server configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport to serve on.
    pub transport: Transport,
    /// Bind host for HTTP.
    pub host: String,
    /// Bind port for HTTP.
    pub port: u16,
    /// Shared secret required as a bearer token. Empty disables the check.
    pub secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            host: "127.0.0.1".to_owned(),
            port: 8000,
            secret: "${HATCHERY_SECRET}".to_owned(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The shared secret, if one is configured.
    pub fn secret(&self) -> Option<&str> {
        let secret = self.secret.trim();
        (!secret.is_empty()).then_some(secret)
    }
}

/// Registry configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Descriptor file, relative to the config file's directory.
    pub path: PathBuf,
    /// Whether inactive agents are listed.
    pub list: ListPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("agents.json"),
            list: ListPolicy::All,
        }
    }
}

impl RegistryConfig {
    /// Resolve the descriptor file against `config_dir`.
    pub fn store_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.path)
    }
}

impl Config {
    /// Parse a TOML string, then expand `${VAR}` references inside its
    /// string values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(toml_str).context("invalid configuration")?;
        table.iter_mut().for_each(|(_, v)| expand_strings(v));
        toml::Value::Table(table)
            .try_into()
            .context("invalid configuration")
    }

    /// Load configuration from `path`, falling back to the defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("{} not found, using defaults", path.display());
            let defaults = toml::to_string(&Self::default())?;
            return Self::from_toml(&defaults);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Reject configurations the daemon cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            bail!("missing generation credential: set llm.api_key or OPENAI_API_KEY");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            );
        }
        if self.llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be positive");
        }
        Ok(())
    }
}

fn expand_strings(value: &mut toml::Value) {
    match value {
        toml::Value::String(text) => *text = expand_env_vars(text),
        toml::Value::Array(items) => items.iter_mut().for_each(expand_strings),
        toml::Value::Table(table) => table.iter_mut().for_each(|(_, v)| expand_strings(v)),
        _ => {}
    }
}

/// Expand `${VAR}` and `${VAR:-fallback}` references.
///
/// Unset variables without a fallback expand to an empty string. An
/// unterminated `${` is kept verbatim.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let reference = &after[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => result.push_str(&value),
            _ => result.push_str(fallback.unwrap_or_default()),
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}
