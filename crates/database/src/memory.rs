use app_error::{AppError, AppResult};
use app_models::{Item, ItemStatus, NewItem, NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{ItemStore, UserStore};

struct Table<T> {
    last_id: i64,
    rows: HashMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Process-local user store. Every mutation holds the write lock for its
/// whole check-and-insert.
#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<Table<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut table = self.table.write().await;

        if table.rows.values().any(|u| u.username == user.username) {
            return Err(AppError::DuplicateUsername);
        }

        let now = Utc::now();
        let stored = User {
            id: table.next_id(),
            username: user.username,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(stored.id, stored.clone());

        debug!(user_id = stored.id, "User stored in memory");
        Ok(stored)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<User> {
        let table = self.table.read().await;
        table
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<User> {
        let table = self.table.read().await;
        table.rows.get(&id).cloned().ok_or(AppError::UserNotFound)
    }
}

/// Process-local item store. Code uniqueness is re-checked under the write
/// lock, so of several concurrent saves with one code exactly one succeeds.
#[derive(Default)]
pub struct MemoryItemStore {
    table: RwLock<Table<Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn code_taken(rows: &HashMap<i64, Item>, code: &str, exclude_id: i64) -> bool {
    rows.values().any(|i| i.code == code && i.id != exclude_id)
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn save(&self, item: NewItem) -> AppResult<Item> {
        let mut table = self.table.write().await;

        if code_taken(&table.rows, &item.code, 0) {
            return Err(AppError::DuplicateCode);
        }

        let now = Utc::now();
        let stored = Item {
            id: table.next_id(),
            code: item.code,
            title: item.title,
            description: item.description,
            price: item.price,
            stock: item.stock,
            status: item.status,
            created_at: now,
            updated_at: now,
            created_by: item.created_by,
            updated_by: item.updated_by,
        };
        table.rows.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn update(&self, item: &Item) -> AppResult<Item> {
        let mut table = self.table.write().await;

        if code_taken(&table.rows, &item.code, item.id) {
            return Err(AppError::DuplicateCode);
        }

        let existing = table.rows.get_mut(&item.id).ok_or(AppError::ItemNotFound)?;
        existing.code = item.code.clone();
        existing.title = item.title.clone();
        existing.description = item.description.clone();
        existing.price = item.price;
        existing.stock = item.stock;
        existing.status = item.status;
        existing.updated_by = item.updated_by;
        existing.updated_at = Utc::now();

        Ok(existing.clone())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Item> {
        let table = self.table.read().await;
        table.rows.get(&id).cloned().ok_or(AppError::ItemNotFound)
    }

    async fn find_all(
        &self,
        status: Option<ItemStatus>,
        limit: u32,
        offset: u64,
    ) -> AppResult<(Vec<Item>, u64)> {
        let table = self.table.read().await;

        let mut matching: Vec<&Item> = table
            .rows
            .values()
            .filter(|i| status.is_none_or(|s| i.status == s))
            .collect();
        matching.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let page: Vec<Item> = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut table = self.table.write().await;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::ItemNotFound)
    }

    async fn exists_by_code(&self, code: &str, exclude_id: i64) -> AppResult<bool> {
        let table = self.table.read().await;
        Ok(code_taken(&table.rows, code, exclude_id))
    }
}
