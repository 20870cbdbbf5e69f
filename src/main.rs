use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quizlive::config::Config;
use quizlive::finalize::Finalizer;
use quizlive::router::CommandRouter;
use quizlive::server::{AppState, build_app};
use quizlive::session::SessionRegistry;
use quizlive::stores::{
    Identity, MemoryAttemptStore, MemoryContentStore, MemoryProgressionLedger,
    MemoryUserDirectory, Role, StaticCredentialVerifier, UserRecord,
};

// ============================================================================
// CLI Types
// ============================================================================

/// Quizlive - a real-time multiplayer quiz session engine
#[derive(Parser, Debug)]
#[command(version = quizlive::build_info::VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the session server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "quizlive.toml")]
        config: String,

        /// Host to bind to (overrides config file)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => serve(&config, host, port).await,
    }
}

// ============================================================================
// Serve
// ============================================================================

async fn serve(config_path: &str, host: Option<IpAddr>, port: Option<u16>) -> Result<()> {
    let config = Config::load(config_path)
        .await
        .with_context(|| format!("loading {config_path}"))?;

    let host = host
        .map(|h| h.to_string())
        .unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    // In-memory collaborators, seeded from the config file. A deployment
    // with real backends swaps these for its own trait implementations.
    let verifier = Arc::new(StaticCredentialVerifier::new());
    let content = Arc::new(MemoryContentStore::new());
    let users = Arc::new(MemoryUserDirectory::new());
    let attempts = Arc::new(MemoryAttemptStore::new());
    let ledger = Arc::new(MemoryProgressionLedger::new(
        config.seed.levels.iter().map(|l| (l.level, l.xp)).collect(),
    ));

    for user in &config.seed.users {
        verifier.register(
            user.token.clone(),
            Identity {
                id: user.id,
                username: user.username.clone(),
                role: Role::User,
            },
        );
        users.insert(UserRecord {
            id: user.id,
            username: user.username.clone(),
        });
    }
    for quiz in &config.seed.quizzes {
        content.insert(quiz.clone());
    }
    info!(
        users = config.seed.users.len(),
        quizzes = config.seed.quizzes.len(),
        "Seeded in-memory stores"
    );

    let registry = SessionRegistry::new(content.clone());
    let finalizer = Finalizer::new(content, users, attempts, ledger);
    let router = CommandRouter::new(verifier, registry.clone(), finalizer);

    let app = build_app(
        AppState { router },
        config.server.request_timeout_seconds,
    );

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Quizlive server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    registry.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
