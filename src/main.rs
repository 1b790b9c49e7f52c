//! Agent chat gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                     CHAT GATEWAY                      │
//!   POST /api/chat        │  ┌──────────┐   ┌──────────┐   ┌─────────────────┐   │
//!   ──────────────────────┼─▶│ validate │──▶│   auth   │──▶│ admission slot  │   │
//!                         │  └──────────┘   └──────────┘   │ (fail fast 503) │   │
//!                         │                                └────────┬────────┘   │
//!                         │                                         ▼            │
//!                         │                                ┌─────────────────┐   │
//!                         │                                │  session lock   │   │
//!                         │                                │ (wait per key)  │   │
//!                         │                                └────────┬────────┘   │
//!   200 {response, id}    │  ┌──────────┐                  ┌────────▼────────┐   │
//!   ◀─────────────────────┼──│  encode  │◀─────────────────│ process_direct  │───┼──▶ agent loop
//!                         │  └──────────┘                  └─────────────────┘   │    + provider
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use agent_gateway::backend::{create_provider, AgentLoop};
use agent_gateway::config::loader::{load_effective, resolve_config_path, CONFIG_PATH_ENV};
use agent_gateway::gateway::Dispatcher;
use agent_gateway::http::HttpServer;
use agent_gateway::lifecycle::{drain, spawn_signal_listener, Shutdown};
use agent_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "agent-gateway")]
#[command(about = "Synchronous chat front door for the agent", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. `SME_CONFIG_PATH` is read as a fallback.
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = resolve_config_path(args.config, |key| std::env::var(key).ok());
    let config = load_effective(config_path.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("agent-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_concurrent = config.admission.max_concurrent,
        auth_enabled = !config.auth.api_key.is_empty(),
        provider = ?config.backend.provider,
        evict_idle_sessions = config.sessions.evict_idle,
        backend_deadline_secs = ?config.timeouts.backend_deadline_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Backend: provider → agent loop running in the background.
    let provider = create_provider(&config.backend)?;
    let (agent_loop, agent) = AgentLoop::new(provider, config.backend.queue_depth);
    let agent_task = tokio::spawn(agent_loop.run());

    let shutdown = Shutdown::new();
    let dispatcher = Arc::new(Dispatcher::new(&config, Arc::new(agent.clone())));
    let server = HttpServer::new(&config, dispatcher, shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server_task = tokio::spawn(server.run(listener));
    spawn_signal_listener(shutdown.clone());

    shutdown.triggered().await;
    tracing::info!("Shutting down...");

    let grace = Duration::from_secs(config.timeouts.shutdown_secs);
    let report = drain(&shutdown, server_task, agent_task, &agent, grace).await;

    if report.is_clean() {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!(?report, "Shutdown finished with work still pending");
    }
    Ok(())
}
