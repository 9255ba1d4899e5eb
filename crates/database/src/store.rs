use app_error::AppResult;
use app_models::{Item, ItemStatus, NewItem, NewUser, User};
use async_trait::async_trait;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user, assigning id and timestamps. Fails with
    /// `DuplicateUsername` when the username is taken, including when the
    /// collision is only detected by the backend at write time.
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_username(&self, username: &str) -> AppResult<User>;

    async fn find_by_id(&self, id: i64) -> AppResult<User>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Persist a validated item, assigning id and timestamps.
    async fn save(&self, item: NewItem) -> AppResult<Item>;

    /// Replace the mutable fields of the item with `item.id` and refresh
    /// `updated_at`. Creation fields are left as stored.
    async fn update(&self, item: &Item) -> AppResult<Item>;

    async fn find_by_id(&self, id: i64) -> AppResult<Item>;

    /// One page of items, most recently updated first, together with the size
    /// of the whole filtered set.
    async fn find_all(
        &self,
        status: Option<ItemStatus>,
        limit: u32,
        offset: u64,
    ) -> AppResult<(Vec<Item>, u64)>;

    async fn delete(&self, id: i64) -> AppResult<()>;

    /// Whether an item other than `exclude_id` already uses `code`.
    async fn exists_by_code(&self, code: &str, exclude_id: i64) -> AppResult<bool>;
}
