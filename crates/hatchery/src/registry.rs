//! In-memory tool registry with background persistence.
//!
//! The registry owns the authoritative list of descriptors for the process
//! lifetime. Reads never touch the disk. Every successful registration marks
//! the registry dirty and returns immediately; a single writer task rewrites
//! the [`DescriptorStore`] from the current state, so the file is eventually
//! consistent with memory but may lag behind it.

use crate::{
    AgentDescriptor, CREATE_AGENT, DescriptorStore, Error, Result, ToolInfo, create_agent_tool,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, watch};

/// Which dynamic descriptors are listed and callable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListPolicy {
    /// Every descriptor regardless of status.
    #[default]
    All,
    /// Only descriptors with [`crate::Status::Active`].
    Active,
}

impl ListPolicy {
    fn admits(self, descriptor: &AgentDescriptor) -> bool {
        match self {
            Self::All => true,
            Self::Active => descriptor.is_active(),
        }
    }
}

/// Registry of dynamically created agents, keyed by name.
pub struct Registry {
    /// Descriptors in registration order.
    agents: RwLock<Vec<AgentDescriptor>>,
    policy: ListPolicy,
    store: Option<DescriptorStore>,
    /// Bumped on every mutation; watched by the writer task.
    dirty: watch::Sender<u64>,
    /// Serializes snapshot-and-write so the newest state always lands last.
    writes: Mutex<()>,
}

impl Registry {
    /// Create a registry without persistence.
    pub fn in_memory(policy: ListPolicy) -> Arc<Self> {
        Arc::new(Self::with_agents(Vec::new(), policy, None))
    }

    /// Load descriptors from `store` and start the background writer.
    ///
    /// A file that fails to load is moved aside before anything can be
    /// written over it, and the entries that still parse are kept. If it
    /// cannot be moved, the registry runs without persistence. Must be called
    /// within a tokio runtime.
    pub async fn open(store: DescriptorStore, policy: ListPolicy) -> Arc<Self> {
        let loader = store.clone();
        let loaded = tokio::task::spawn_blocking(move || recover(&loader))
            .await
            .unwrap_or_else(|e| Err(Error::persistence(format!("loader task failed: {e}"))));

        let (agents, recovered, store) = match loaded {
            Ok((agents, recovered)) => (admit(agents), recovered, Some(store)),
            Err(e) => {
                tracing::error!("{e}; running without persistence");
                (Vec::new(), false, None)
            }
        };
        if let Some(store) = &store {
            tracing::info!(
                "loaded {} agent(s) from {}",
                agents.len(),
                store.path().display()
            );
        }

        let writes = store.is_some();
        let registry = Arc::new(Self::with_agents(agents, policy, store));
        if writes {
            let dirty = registry.dirty.subscribe();
            tokio::spawn(persist_loop(Arc::downgrade(&registry), dirty));
            if recovered {
                registry.mark_dirty();
            }
        }
        registry
    }

    fn with_agents(
        agents: Vec<AgentDescriptor>,
        policy: ListPolicy,
        store: Option<DescriptorStore>,
    ) -> Self {
        Self {
            agents: RwLock::new(agents),
            policy,
            store,
            dirty: watch::Sender::new(0),
            writes: Mutex::new(()),
        }
    }

    /// The listing policy in effect.
    pub fn policy(&self) -> ListPolicy {
        self.policy
    }

    /// List tools: `create_agent` first, then registered agents in order.
    pub fn list(&self) -> Vec<ToolInfo> {
        let agents = self.agents.read();
        std::iter::once(create_agent_tool())
            .chain(
                agents
                    .iter()
                    .filter(|a| self.policy.admits(a))
                    .map(AgentDescriptor::tool_info),
            )
            .collect()
    }

    /// Look up a registered agent visible under the listing policy.
    pub fn get(&self, name: &str) -> Option<AgentDescriptor> {
        self.agents
            .read()
            .iter()
            .find(|a| a.name == name && self.policy.admits(a))
            .cloned()
    }

    /// Snapshot of every descriptor, including hidden ones.
    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents.read().clone()
    }

    /// Number of registered agents, excluding `create_agent`.
    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    /// Whether no agents have been registered.
    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Register a new agent.
    ///
    /// Fails with [`Error::NameCollision`] when the name is reserved or taken,
    /// leaving the registry unchanged. On success the agent is visible to the
    /// next read and a background write is scheduled without waiting for it.
    pub fn register(&self, descriptor: AgentDescriptor) -> Result<()> {
        {
            let mut agents = self.agents.write();
            if descriptor.name == CREATE_AGENT || agents.iter().any(|a| a.name == descriptor.name)
            {
                return Err(Error::NameCollision(descriptor.name));
            }
            tracing::info!("registered agent '{}'", descriptor.name);
            agents.push(descriptor);
        }
        self.mark_dirty();
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Write the current state to the store and wait for completion.
    ///
    /// A no-op for in-memory registries.
    pub async fn flush(&self) -> Result<()> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let _guard = self.writes.lock().await;
        let snapshot = self.descriptors();
        let count = snapshot.len();
        tokio::task::spawn_blocking(move || store.save_all(&snapshot))
            .await
            .map_err(|e| Error::persistence(format!("writer task failed: {e}")))??;
        tracing::debug!("persisted {count} agent(s)");
        Ok(())
    }
}

/// Load the store, moving an unreadable file aside and salvaging what parses.
///
/// The flag is set when the in-memory state differs from the file on disk.
fn recover(store: &DescriptorStore) -> Result<(Vec<AgentDescriptor>, bool)> {
    let err = match store.load_all() {
        Ok(agents) => return Ok((agents, false)),
        Err(e) => e,
    };
    tracing::error!("{err}");

    let Some(aside) = store.quarantine()? else {
        return Ok((Vec::new(), false));
    };
    let salvaged = DescriptorStore::new(&aside).salvage();
    tracing::warn!(
        "moved unreadable descriptor file to {}, recovered {} agent(s)",
        aside.display(),
        salvaged.len()
    );
    Ok((salvaged, true))
}

/// Drop duplicate and reserved names from loaded descriptors, keeping the first.
fn admit(loaded: Vec<AgentDescriptor>) -> Vec<AgentDescriptor> {
    let mut agents: Vec<AgentDescriptor> = Vec::with_capacity(loaded.len());
    for descriptor in loaded {
        if descriptor.name == CREATE_AGENT || agents.iter().any(|a| a.name == descriptor.name) {
            tracing::warn!("skipping duplicate descriptor '{}'", descriptor.name);
            continue;
        }
        agents.push(descriptor);
    }
    agents
}

/// Rewrite the store whenever the registry is marked dirty.
///
/// Exits once the registry is dropped.
async fn persist_loop(registry: Weak<Registry>, mut dirty: watch::Receiver<u64>) {
    while dirty.changed().await.is_ok() {
        let Some(registry) = registry.upgrade() else {
            break;
        };
        if let Err(e) = registry.flush().await {
            tracing::error!("failed to persist agents: {e}");
        }
    }
}
