use crate::Database;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use surrealdb::opt::auth::Root;
use tokio::{sync::MutexGuard, time::timeout};
use tracing::debug;

use app_error::{AppError, AppErrorExt, AppResult};

const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS users SCHEMALESS;
DEFINE INDEX IF NOT EXISTS users_username ON TABLE users FIELDS username UNIQUE;
DEFINE INDEX IF NOT EXISTS users_user_id ON TABLE users FIELDS user_id UNIQUE;
DEFINE TABLE IF NOT EXISTS items SCHEMALESS;
DEFINE INDEX IF NOT EXISTS items_code ON TABLE items FIELDS code UNIQUE;
DEFINE INDEX IF NOT EXISTS items_item_id ON TABLE items FIELDS item_id UNIQUE;
DEFINE INDEX IF NOT EXISTS items_status ON TABLE items FIELDS status;
DEFINE TABLE IF NOT EXISTS sequences SCHEMALESS;
"#;

/// Attempts per statement when the engine reports a retryable transaction
/// conflict.
const MAX_ATTEMPTS: u32 = 8;
const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Optimistic-transaction conflicts leave nothing committed and may be rerun.
pub(crate) fn is_retryable_conflict(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("read or write conflict") || message.contains("can be retried")
}

#[derive(Deserialize)]
struct SequenceRow {
    counter: i64,
}

#[derive(Clone)]
pub struct DbCredentials {
    username: String,
    password: String,
}

impl DbCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_password(&self) -> &str {
        &self.password
    }
}

// Don't accidentally log credentials
impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Database {
    /// Connect to a remote (or embedded) SurrealDB endpoint, sign in as root
    /// and select the namespace/database.
    pub async fn initialize(
        connection_url: &str,
        namespace: &str,
        database: &str,
        credentials: &DbCredentials,
        connect_timeout: Duration,
    ) -> AppResult<Self> {
        if namespace.trim().is_empty() || database.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Database namespace and name cannot be empty"
            )));
        }

        let client = match timeout(connect_timeout, surrealdb::engine::any::connect(connection_url)).await {
            Ok(result) => result.context("Failed to connect to database").db_err()?,
            Err(_) => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Database connection timeout - could not connect to {} within {:?}",
                    connection_url,
                    connect_timeout
                )));
            }
        };

        if !connection_url.starts_with("mem") {
            client
                .signin(Root {
                    username: credentials.get_username(),
                    password: credentials.get_password(),
                })
                .await
                .context("Failed to authenticate with database")
                .db_err()?;
        }

        client
            .use_ns(namespace)
            .use_db(database)
            .await
            .context("Failed to select namespace and database")
            .db_err()?;

        Ok(Self {
            client,
            writes: Default::default(),
        })
    }

    /// Embedded in-process engine, used by tests and local runs.
    pub async fn initialize_memory_db(namespace: &str, database: &str) -> AppResult<Self> {
        let client = surrealdb::engine::any::connect("memory")
            .await
            .context("Failed to start in-memory database")
            .db_err()?;

        client
            .use_ns(namespace)
            .use_db(database)
            .await
            .context("Failed to select namespace and database")
            .db_err()?;

        Ok(Self {
            client,
            writes: Default::default(),
        })
    }

    /// Exclusive access for a multi-statement mutation (id allocation plus
    /// insert, or an update). Keeps writes from this process from conflicting
    /// with each other; conflicts with other processes are retried.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// Idempotently define tables and unique indexes.
    pub async fn define_schema(&self) -> AppResult<()> {
        self.query(SCHEMA).run().await?;
        tracing::debug!("Database schema verified");
        Ok(())
    }

    pub async fn health(&self) -> AppResult<()> {
        self.client
            .health()
            .await
            .context("Database health check failed")
            .db_err()
    }

    /// Next value of a named monotonically increasing sequence, starting at 1.
    pub async fn next_id(&self, sequence: &str) -> AppResult<i64> {
        let mut response = self
            .query("UPSERT type::thing('sequences', $name) SET counter = (counter OR 0) + 1 RETURN AFTER")
            .bind(("name", sequence))
            .run()
            .await?;

        let rows: Vec<SequenceRow> = response.take(0)?;
        rows.into_iter().next().map(|row| row.counter).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Sequence '{}' did not return a value",
                sequence
            ))
        })
    }

    pub fn query(&self, sql: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder {
            db: self,
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }
}

pub struct QueryBuilder<'a> {
    db: &'a Database,
    sql: String,
    bindings: Vec<(String, serde_json::Value)>,
}

impl<'a> QueryBuilder<'a> {
    pub fn bind(mut self, binding: (impl Into<String>, impl Into<serde_json::Value>)) -> Self {
        self.bindings.push((binding.0.into(), binding.1.into()));
        self
    }

    /// Run the statements and surface the first statement error, unwrapped,
    /// so callers can inspect it (e.g. for index violations). Retryable
    /// transaction conflicts are rerun with a short backoff.
    pub async fn execute(self) -> Result<QueryResponse, surrealdb::Error> {
        let mut attempt = 1;

        loop {
            let mut query = self.db.client.query(self.sql.clone());
            for (name, value) in &self.bindings {
                query = query.bind((name.clone(), value.clone()));
            }

            match query.await.and_then(|response| response.check()) {
                Ok(response) => return Ok(QueryResponse(response)),
                Err(e) if attempt < MAX_ATTEMPTS && is_retryable_conflict(&e) => {
                    debug!(attempt, "Transaction conflict, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn run(self) -> AppResult<QueryResponse> {
        self.execute()
            .await
            .context("Failed to execute query")
            .db_err()
    }
}

pub struct QueryResponse(surrealdb::Response);

impl QueryResponse {
    pub fn take<T>(&mut self, index: usize) -> AppResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.0
            .take::<Vec<T>>(index)
            .context("Failed to extract query results")
            .db_err()
    }
}
