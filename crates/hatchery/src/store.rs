//! JSON-file persistence for agent descriptors.
//!
//! The store is a passive collaborator of the [`crate::Registry`]: it is read
//! once at startup and rewritten in full after every mutation. Writes go to a
//! temporary sibling file that is renamed over the target, so a crash mid-write
//! leaves the previous contents intact.

use crate::{AgentDescriptor, Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

/// Version written into the descriptor file envelope.
pub const STORE_VERSION: u32 = 1;

/// Durable JSON-file store of agent descriptors.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    path: PathBuf,
}

/// On-disk envelope, as written.
#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    agents: &'a [AgentDescriptor],
}

/// On-disk envelope, as read.
#[derive(Deserialize)]
struct VersionedFile {
    version: u32,
    #[serde(default)]
    agents: Vec<AgentDescriptor>,
}

impl DescriptorStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every descriptor from the backing file.
    ///
    /// A missing file is a cold start and yields an empty list. Both the
    /// versioned envelope and a bare JSON array are accepted.
    pub fn load_all(&self) -> Result<Vec<AgentDescriptor>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.error("failed to read", e)),
        };

        let value: Value =
            serde_json::from_str(&content).map_err(|e| self.error("failed to parse", e))?;
        match value {
            Value::Array(_) => {
                serde_json::from_value(value).map_err(|e| self.error("invalid descriptors in", e))
            }
            Value::Object(_) => {
                let file: VersionedFile = serde_json::from_value(value)
                    .map_err(|e| self.error("invalid descriptors in", e))?;
                if file.version > STORE_VERSION {
                    return Err(Error::persistence(format!(
                        "{} has unsupported version {} (max {STORE_VERSION})",
                        self.path.display(),
                        file.version
                    )));
                }
                Ok(file.agents)
            }
            _ => Err(Error::persistence(format!(
                "{} is neither a descriptor array nor a versioned envelope",
                self.path.display()
            ))),
        }
    }

    /// Replace the backing file with the given descriptors.
    pub fn save_all(&self, agents: &[AgentDescriptor]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.error("failed to create directory for", e))?;

        let body = serde_json::to_vec_pretty(&Envelope {
            version: STORE_VERSION,
            agents,
        })
        .map_err(|e| self.error("failed to serialize", e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| self.error("failed to create temp file for", e))?;
        tmp.write_all(&body)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.error("failed to write", e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.error("failed to replace", e.error))?;
        Ok(())
    }

    /// Move the backing file aside so later saves cannot overwrite it.
    ///
    /// Returns the new path, or `None` when there is nothing at the path to
    /// protect.
    pub fn quarantine(&self) -> Result<Option<PathBuf>> {
        match std::fs::symlink_metadata(&self.path) {
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(None);
            }
            Err(e) => return Err(self.error("failed to inspect", e)),
        }

        let mut aside = self.path.clone().into_os_string();
        aside.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
        let aside = PathBuf::from(aside);
        std::fs::rename(&self.path, &aside).map_err(|e| self.error("failed to move aside", e))?;
        Ok(Some(aside))
    }

    /// Read whatever descriptors still parse from a file `load_all` rejected.
    ///
    /// Entries that fail to deserialize are skipped. Files written by a newer
    /// version yield nothing.
    pub fn salvage(&self) -> Vec<AgentDescriptor> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let entries = match serde_json::from_str(&content) {
            Ok(Value::Array(entries)) => entries,
            Ok(Value::Object(mut file)) => {
                let version = file.get("version").and_then(Value::as_u64);
                if version.is_none_or(|v| v > u64::from(STORE_VERSION)) {
                    return Vec::new();
                }
                match file.remove("agents") {
                    Some(Value::Array(entries)) => entries,
                    _ => return Vec::new(),
                }
            }
            _ => return Vec::new(),
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    tracing::warn!("skipping unreadable descriptor in {}: {e}", self.path.display());
                    None
                }
            })
            .collect()
    }

    fn error(&self, action: &str, e: impl std::fmt::Display) -> Error {
        Error::persistence(format!("{action} {}: {e}", self.path.display()))
    }
}
