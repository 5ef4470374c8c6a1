//! Hatchery: a self-expanding tool registry for MCP servers.
//!
//! The [`Handler`] answers the two MCP tool operations. `tools/list` is served
//! from the in-memory [`Registry`]; `tools/call` either mints a new agent
//! through the [`AgentFactory`] (the reserved [`CREATE_AGENT`] tool) or
//! dispatches to a registered descriptor.
//!
//! # Example
//!
//! ```rust,ignore
//! use hatchery::{AgentFactory, DescriptorStore, Handler, ListPolicy, Registry};
//!
//! let store = DescriptorStore::new("data/agents.json");
//! let registry = Registry::open(store, ListPolicy::All).await;
//! let handler = Handler::new(registry.clone(), AgentFactory::new(generator));
//!
//! let result = handler.call_tool("create_agent", arguments).await;
//! registry.flush().await?;
//! ```

pub use {
    descriptor::{AgentDescriptor, CREATE_AGENT, Status, ToolInfo, create_agent_tool},
    error::{Error, Result},
    factory::{AgentFactory, CreationRequest, DEFAULT_TIMEOUT, DescriptorDraft, Generator},
    handler::{CallResult, Content, Handler},
    registry::{ListPolicy, Registry},
    store::{DescriptorStore, STORE_VERSION},
};

pub mod descriptor;
mod error;
pub mod factory;
pub mod handler;
pub mod registry;
pub mod store;

#[cfg(feature = "testing")]
pub mod testing;
