//! Hatchery daemon: serves the self-expanding agent registry over MCP on
//! stdio or streamable HTTP.

pub use {
    auth::SharedSecret,
    cli::Cli,
    config::{Config, Transport},
    mcp::HatcheryServer,
};

pub mod auth;
pub mod cli;
pub mod config;
pub mod mcp;
pub mod serve;
