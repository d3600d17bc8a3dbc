use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use notes_api::auth::FirebaseVerifier;
use notes_api::config::AppConfig;
use notes_api::credentials::ServiceAccount;
use notes_api::store::FirestoreStore;
use notes_api::{app, AppState};

#[derive(Parser)]
#[command(name = "notes-api")]
#[command(about = "Notes and tags REST API")]
#[command(version)]
struct Cli {
    #[arg(long, env = "HOST", default_value = "0.0.0.0", help = "Address to bind")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 8000, help = "Port to listen on")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any configuration
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.debug)
        .with_line_number(config.debug)
        .init();

    tracing::info!("Starting {} in {:?} mode", config.app_name, config.environment);

    let state = build_state(config)?;
    let app = app(state);

    let bind_addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Construct the store and verifier clients once; handlers share them read-only
fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let account = ServiceAccount::from_config(&config).context("loading Firebase credentials")?;
    let project_id = account
        .resolve_project_id(&config)
        .context("resolving Firebase project id")?;

    let store = FirestoreStore::new(account, &project_id).context("creating Firestore client")?;
    let verifier = FirebaseVerifier::new(&project_id).context("creating token verifier")?;

    tracing::info!(
        "Using Firebase project {} with {:?} note storage",
        project_id,
        config.storage.notes_layout
    );
    Ok(AppState::new(config, Arc::new(store), Arc::new(verifier)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
