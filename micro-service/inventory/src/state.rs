use app_authentication::{AuthService, JwtService};
use app_config::StorageBackend;
use app_database::{
    Database, MemoryItemStore, MemoryUserStore, SurrealItemStore, SurrealUserStore,
};
use std::sync::Arc;

use crate::service::ItemService;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub items: Arc<ItemService>,
    pub storage: StorageBackend,
    /// Present when the persistent backend is in use; checked by `/health`.
    pub database: Option<Arc<Database>>,
}

impl AppState {
    /// Stores backed by SurrealDB.
    pub fn persistent(db: Arc<Database>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            auth: Arc::new(AuthService::new(
                Arc::new(SurrealUserStore::new(Arc::clone(&db))),
                jwt_service,
            )),
            items: Arc::new(ItemService::new(Arc::new(SurrealItemStore::new(
                Arc::clone(&db),
            )))),
            storage: StorageBackend::Surrealdb,
            database: Some(db),
        }
    }

    /// Process-local stores; data is lost on exit.
    pub fn in_memory(jwt_service: Arc<JwtService>) -> Self {
        Self {
            auth: Arc::new(AuthService::new(Arc::new(MemoryUserStore::new()), jwt_service)),
            items: Arc::new(ItemService::new(Arc::new(MemoryItemStore::new()))),
            storage: StorageBackend::Memory,
            database: None,
        }
    }
}
