use app_config::DatabaseConfig;
use app_error::AppResult;
use std::{sync::Arc, time::Duration};

use crate::{Database, service::DbCredentials};

const MEMORY_NAMESPACE: &str = "inventory";

/// Connect to the configured SurrealDB endpoint and make sure the schema
/// exists.
pub async fn initialize_db(db_config: &DatabaseConfig) -> AppResult<Arc<Database>> {
    tracing::debug!("Connecting to SurrealDB: {}", db_config.endpoint);

    if db_config.endpoint.starts_with("wss://") {
        tracing::info!("Using secure TLS connection to database");
    } else if !db_config.endpoint.starts_with("mem") {
        tracing::warn!("Using non-secure database connection");
    }

    let credentials = DbCredentials::new(db_config.username.clone(), db_config.password.clone());

    let db = Database::initialize(
        &db_config.endpoint,
        &db_config.namespace,
        &db_config.database,
        &credentials,
        Duration::from_secs(db_config.connect_timeout_secs),
    )
    .await?;
    db.define_schema().await?;

    tracing::info!(
        namespace = %db_config.namespace,
        database = %db_config.database,
        "Connected to SurrealDB"
    );

    Ok(Arc::new(db))
}

/// Embedded engine with the schema applied; nothing survives the process.
pub async fn initialize_memory_db() -> AppResult<Arc<Database>> {
    let db = Database::initialize_memory_db(MEMORY_NAMESPACE, MEMORY_NAMESPACE).await?;
    db.define_schema().await?;

    tracing::info!("Connected to in-memory SurrealDB");

    Ok(Arc::new(db))
}
