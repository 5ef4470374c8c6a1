//! Command-line arguments.

use crate::{
    config::{CONFIG_FILE, Config, Transport},
    serve,
};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Self-expanding MCP agent registry.
#[derive(Parser, Debug)]
#[command(name = "hatcheryd", about = "Self-expanding MCP agent registry", version)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, short, env = "HATCHERY_CONFIG", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Serve on stdin/stdout instead of HTTP.
    #[arg(long)]
    pub stdio: bool,

    /// HTTP port override.
    #[arg(long)]
    pub port: Option<u16>,

    /// HTTP host override.
    #[arg(long)]
    pub host: Option<String>,
}

impl Cli {
    /// Apply command-line overrides to a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.stdio {
            config.server.transport = Transport::Stdio;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
    }

    /// Directory relative paths in the configuration resolve against.
    pub fn config_dir(&self) -> &Path {
        self.config
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }

    /// Load the configuration and run the daemon.
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load(&self.config)?;
        self.apply(&mut config);
        tracing::info!("loaded configuration from {}", self.config.display());
        serve::run(config, self.config_dir()).await
    }
}
