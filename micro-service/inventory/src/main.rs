use anyhow::Context;
use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::Notify};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app_authentication::JwtService;
use app_config::{AppConfig, JwtConfig, LoggingConfig, Server, StorageBackend};
use app_database::initialize_db;
use app_error::AppError;
use micro_inventory::{AppState, create_routes};

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn build_state(config: &AppConfig) -> AppState {
    let jwt_service = Arc::new(JwtService::from(&JwtConfig::from(config)));

    match config.database.backend {
        StorageBackend::Surrealdb => match initialize_db(&config.database).await {
            Ok(db) => AppState::persistent(db, jwt_service),
            Err(e) => {
                warn!("SurrealDB unavailable, falling back to in-memory storage: {}", e);
                AppState::in_memory(jwt_service)
            }
        },
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            AppState::in_memory(jwt_service)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    info!("Starting inventory service at {}", chrono::Utc::now());

    let state = build_state(&config).await;
    info!(storage = %state.storage, "Storage backend ready");

    let app = create_routes(state, &config);

    let server = Server::from(&config);
    let address = server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to address: {}", address))?;

    info!("Listening on http://{}", address);

    let stopping = Arc::new(Notify::new());
    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let stopping = Arc::clone(&stopping);
        async move {
            shutdown_signal().await;
            stopping.notify_one();
        }
    })
    .into_future();

    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    tokio::select! {
        result = serve => result.context("Server error")?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => warn!("Connections still open after {:?}, exiting", grace),
    }

    info!("Server stopped");
    Ok(())
}
