//! insightflow server binary
//!
//! Serves the analysis workflow over HTTP with one process-wide token budget.

use anyhow::Context;
use clap::Parser;
use insightflow::api::{create_router, AppState};
use insightflow::{AppConfig, Supervisor, TokenBudgetTracker};
use llm::OpenAiClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "insightflow-server")]
#[command(about = "Multi-agent data analysis server", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Path to insightflow.toml
    #[arg(short, long, env = "INSIGHTFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host, overrides the config file and HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides the config file and PORT
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Loading server configuration...");
    let mut config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    config.apply_env_overrides()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        name = %config.server.name,
        daily_limit = config.budget.daily_limit,
        base_url = %config.llm.base_url,
        qa_scoring = ?config.qa.scoring,
        "Configuration loaded"
    );

    let remote = config.llm.remote_config(|key| std::env::var(key).ok())?;
    let client = OpenAiClient::new(remote).context("failed to build model client")?;

    let tracker = TokenBudgetTracker::new(config.budget.daily_limit);
    let supervisor = Arc::new(Supervisor::new(
        Arc::new(client),
        tracker,
        config.supervisor_config(),
    ));

    let app = create_router(AppState::new(supervisor, config.server.name.as_str()));

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address()))?;

    tracing::info!("Starting insightflow server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("insightflow server shut down gracefully");
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL-C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
