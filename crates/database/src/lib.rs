pub mod db_connect;
pub mod memory;
pub mod service;
pub mod store;
pub mod surreal;

pub use db_connect::{initialize_db, initialize_memory_db};
pub use memory::{MemoryItemStore, MemoryUserStore};
pub use service::{DbCredentials, QueryBuilder, QueryResponse};
pub use store::{ItemStore, UserStore};
pub use surreal::{SurrealItemStore, SurrealUserStore};

use surrealdb::{Surreal, engine::any::Any};
use tokio::sync::Mutex;

/// Handle to a SurrealDB namespace/database pair. The underlying client
/// multiplexes requests, so one handle is shared by every store.
pub struct Database {
    client: Surreal<Any>,
    // Mutations through this handle run one at a time
    writes: Mutex<()>,
}
