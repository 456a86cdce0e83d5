//! Wallet Risk Sentinel MCP Server
//!
//! Model Context Protocol server that decides, per wallet, whether a lending
//! protocol should take no action, keep monitoring, escalate for deeper
//! analysis or enforce protective action.
//!
//! # Pipeline
//!
//! - **Scoring**: fixed-weight risk score over wallet, protocol and market signals
//! - **Decision ladder**: critical conditions first, then score bands
//! - **Escalation**: ambiguous cases go to a reasoning provider, bounded by a
//!   timeout and a non-bypassable safety override

mod assessor;
mod cache;
mod config;
mod error;
mod orchestrator;
mod reasoner;
mod tools;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::orchestrator::Orchestrator;
use crate::tools::{handle_request, JsonRpcRequest, SentinelTools};

fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sentinel_mcp=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Wallet Risk Sentinel MCP Server"
    );

    let rt = Runtime::new()?;

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default configuration");
        AppConfig::default()
    });

    tracing::info!(
        provider_configured = config.escalation.provider_configured(),
        model = %config.escalation.model,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    let orchestrator = Orchestrator::from_config(&config)?;
    let tools = Arc::new(SentinelTools::new(Arc::new(orchestrator)));

    tracing::info!("MCP server ready, listening on stdio");

    // Main loop: read JSON-RPC requests from stdin, write responses to stdout
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "Error reading stdin");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Error parsing request");
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        let tools = Arc::clone(&tools);
        let response = rt.block_on(async move { handle_request(&tools, request).await });

        // Notifications don't get responses
        if let Some(response) = response {
            let response_str = serde_json::to_string(&response)?;
            if let Err(e) = writeln!(stdout, "{}", response_str) {
                tracing::error!(error = %e, "Error writing response");
            }
            if let Err(e) = stdout.flush() {
                tracing::error!(error = %e, "Error flushing stdout");
            }
        }
    }

    tracing::info!("MCP server shutting down");
    Ok(())
}
