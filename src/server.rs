//! MCP server initialization for stdio and streamable-HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up both
//! stores, the summarizer, and the MCP tool handler into a running server.

use crate::config::EngramConfig;
use crate::engine::MemoryEngine;
use crate::tools::MemoryTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Shared setup: open both stores, run a non-destructive initialize, and
/// return the engine ready for a transport.
fn setup_engine(config: EngramConfig) -> Result<Arc<MemoryEngine>> {
    let config = Arc::new(config);
    let engine = Arc::new(MemoryEngine::open(config)?);

    let init = engine.initialize(false);
    if !init.is_ok() {
        anyhow::bail!("memory system initialization failed: {}", init.message());
    }
    tracing::info!("memory engine ready");

    Ok(engine)
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: EngramConfig) -> Result<()> {
    tracing::info!("starting Engram MCP server on stdio");

    let engine = setup_engine(config)?;
    let tools = MemoryTools::new(engine);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over streamable HTTP.
pub async fn serve_http(config: EngramConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Engram MCP server on streamable HTTP");

    let engine = setup_engine(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(MemoryTools::new(engine.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
