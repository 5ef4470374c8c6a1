//! Daemon wiring: builds the registry, factory and handler from config and
//! serves them on the configured transport.

use crate::{
    auth::{SharedSecret, require_secret},
    config::{Config, LlmConfig, Transport},
    mcp::HatcheryServer,
};
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::get,
};
use hatchery::{AgentDescriptor, AgentFactory, DescriptorStore, Generator, Handler, Registry};
use rmcp::{
    ServiceExt,
    transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    },
};
use std::{future::IntoFuture, path::Path, sync::Arc};
use structured::OpenAI;
use tokio::net::TcpListener;

/// Build the structured-generation client from the `[llm]` section.
pub fn build_generator(llm: &LlmConfig) -> Result<OpenAI> {
    let client = structured::Client::new();
    let generator = match llm.base_url.as_deref() {
        Some(url) => OpenAI::custom(client, &llm.api_key, url)?,
        None => OpenAI::api(client, &llm.api_key)?,
    };
    Ok(generator.model(&llm.model).temperature(llm.temperature))
}

/// Build the HTTP router: `/mcp`, `/health` and, when a secret is set,
/// `/admin/agents`. Everything except `/health` sits behind the secret.
pub fn router<G: Generator + 'static>(
    server: HatcheryServer<G>,
    secret: Option<SharedSecret>,
) -> Router {
    let registry = Arc::clone(server.handler().registry());
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let mut protected = Router::new().nest_service("/mcp", mcp);
    if let Some(secret) = secret {
        let admin = Router::new()
            .route("/admin/agents", get(agents))
            .with_state(registry);
        protected = protected
            .merge(admin)
            .layer(middleware::from_fn_with_state(secret, require_secret));
    }

    Router::new().route("/health", get(health)).merge(protected)
}

async fn health() -> &'static str {
    "ok"
}

async fn agents(State(registry): State<Arc<Registry>>) -> Json<Vec<AgentDescriptor>> {
    Json(registry.descriptors())
}

/// Serve MCP over stdin/stdout until the client disconnects or ctrl-c.
pub async fn serve_stdio<G: Generator + 'static>(server: HatcheryServer<G>) -> Result<()> {
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start the stdio transport")?;
    tracing::info!("serving MCP on stdio");

    tokio::select! {
        quit = service.waiting() => {
            let reason = quit?;
            tracing::info!("stdio session ended: {reason:?}");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("received ctrl-c, shutting down");
        }
    }
    Ok(())
}

/// Serve MCP over streamable HTTP on `bind` until ctrl-c.
pub async fn serve_http<G: Generator + 'static>(
    server: HatcheryServer<G>,
    bind: &str,
    secret: Option<SharedSecret>,
) -> Result<()> {
    if secret.is_none() {
        tracing::warn!("no shared secret configured, HTTP transport is unauthenticated");
    }
    let app = router(server, secret);
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("listening on http://{bind}/mcp");

    tokio::select! {
        served = axum::serve(listener, app).into_future() => served?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("received ctrl-c, shutting down");
        }
    }
    Ok(())
}

/// Run the daemon with `config`, resolving relative paths against
/// `config_dir`. Flushes the registry before returning.
pub async fn run(config: Config, config_dir: &Path) -> Result<()> {
    config.validate()?;

    let store = DescriptorStore::new(config.registry.store_path(config_dir));
    tracing::info!("descriptor store at {}", store.path().display());
    let registry = Registry::open(store, config.registry.list).await;

    let generator = build_generator(&config.llm)?;
    tracing::info!(
        "generator ready: model {} at {}",
        config.llm.model,
        generator.endpoint()
    );
    let factory = AgentFactory::new(generator).with_timeout(config.llm.timeout());
    let server = HatcheryServer::new(Handler::new(Arc::clone(&registry), factory));

    let served = match config.server.transport {
        Transport::Stdio => serve_stdio(server).await,
        Transport::Http => {
            let secret = SharedSecret::from_config(&config.server);
            serve_http(server, &config.server.bind_address(), secret).await
        }
    };

    let flushed = registry.flush().await;
    served?;
    flushed.context("failed to persist descriptors on shutdown")?;
    tracing::info!("shut down with {} agents", registry.len());
    Ok(())
}
