use app_error::{AppError, AppErrorExt, AppResult};
use app_models::{Item, ItemStatus, NewItem, NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc, serde::ts_microseconds};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    Database,
    store::{ItemStore, UserStore},
};

const USER_FIELDS: &str = "user_id, username, password_hash, created_at, updated_at";
const ITEM_FIELDS: &str = "item_id, code, title, description, price, stock, status, \
                           created_at, updated_at, created_by, updated_by";

// Stored timestamps keep microsecond precision
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Maps a unique-index rejection on `index` to `duplicate`; anything else is
/// a database failure.
fn on_write_error(err: surrealdb::Error, index: &str, duplicate: AppError) -> AppError {
    let message = err.to_string();
    if message.contains(index) && message.contains("already contains") {
        warn!(index, "Unique index rejected write");
        duplicate
    } else {
        AppError::DatabaseError(anyhow::Error::new(err).context("Failed to write record"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    user_id: i64,
    username: String,
    password_hash: String,
    #[serde(with = "ts_microseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.user_id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ItemRow {
    item_id: i64,
    code: String,
    title: String,
    description: String,
    price: i64,
    stock: i64,
    status: ItemStatus,
    #[serde(with = "ts_microseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    updated_at: DateTime<Utc>,
    created_by: i64,
    updated_by: i64,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.item_id,
            code: row.code,
            title: row.title,
            description: row.description,
            price: row.price,
            stock: row.stock,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

#[derive(Serialize)]
struct ItemChanges<'a> {
    code: &'a str,
    title: &'a str,
    description: &'a str,
    price: i64,
    stock: i64,
    status: ItemStatus,
    #[serde(with = "ts_microseconds")]
    updated_at: DateTime<Utc>,
    updated_by: i64,
}

#[derive(Deserialize)]
struct CountRow {
    total: u64,
}

#[derive(Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    item_id: i64,
}

pub struct SurrealUserStore {
    db: Arc<Database>,
}

impl SurrealUserStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn select_one(&self, field: &str, value: serde_json::Value) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_FIELDS} FROM users WHERE {field} = $value LIMIT 1");
        let mut response = self.db.query(sql).bind(("value", value)).run().await?;
        let rows: Vec<UserRow> = response.take(0)?;
        Ok(rows.into_iter().next().map(User::from))
    }

    async fn insert(&self, row: &UserRow) -> AppResult<()> {
        let content = serde_json::to_value(row).server_err()?;
        self.db
            .query("CREATE users CONTENT $row RETURN NONE")
            .bind(("row", content))
            .execute()
            .await
            .map_err(|e| on_write_error(e, "users_username", AppError::DuplicateUsername))?;
        Ok(())
    }

    // A write that lost a race with another process can surface as a plain
    // database error; the username being taken by now means it was a duplicate
    async fn duplicate_or(&self, username: &str, err: AppError) -> AppError {
        if !matches!(err, AppError::DatabaseError(_)) {
            return err;
        }
        match self.select_one("username", username.into()).await {
            Ok(Some(_)) => AppError::DuplicateUsername,
            _ => err,
        }
    }
}

#[async_trait]
impl UserStore for SurrealUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let _guard = self.db.write_lock().await;

        if self
            .select_one("username", user.username.clone().into())
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateUsername);
        }

        let timestamp = now();
        let row = UserRow {
            user_id: self.db.next_id("users").await?,
            username: user.username,
            password_hash: user.password_hash,
            created_at: timestamp,
            updated_at: timestamp,
        };

        // The index catches a registration that raced past the check above
        if let Err(e) = self.insert(&row).await {
            return Err(self.duplicate_or(&row.username, e).await);
        }

        debug!(user_id = row.user_id, "User stored");
        Ok(row.into())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<User> {
        self.select_one("username", username.into())
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<User> {
        self.select_one("user_id", id.into())
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

pub struct SurrealItemStore {
    db: Arc<Database>,
}

impl SurrealItemStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn duplicate_or(&self, code: &str, own_id: i64, err: AppError) -> AppError {
        if !matches!(err, AppError::DatabaseError(_)) {
            return err;
        }
        match self.exists_by_code(code, own_id).await {
            Ok(true) => AppError::DuplicateCode,
            _ => err,
        }
    }
}

#[async_trait]
impl ItemStore for SurrealItemStore {
    async fn save(&self, item: NewItem) -> AppResult<Item> {
        let _guard = self.db.write_lock().await;

        let timestamp = now();
        let row = ItemRow {
            item_id: self.db.next_id("items").await?,
            code: item.code,
            title: item.title,
            description: item.description,
            price: item.price,
            stock: item.stock,
            status: item.status,
            created_at: timestamp,
            updated_at: timestamp,
            created_by: item.created_by,
            updated_by: item.updated_by,
        };

        let content = serde_json::to_value(&row).server_err()?;
        let written = self
            .db
            .query("CREATE items CONTENT $row RETURN NONE")
            .bind(("row", content))
            .execute()
            .await
            .map_err(|e| on_write_error(e, "items_code", AppError::DuplicateCode));
        if let Err(e) = written {
            return Err(self.duplicate_or(&row.code, row.item_id, e).await);
        }

        Ok(row.into())
    }

    async fn update(&self, item: &Item) -> AppResult<Item> {
        let changes = serde_json::to_value(ItemChanges {
            code: &item.code,
            title: &item.title,
            description: &item.description,
            price: item.price,
            stock: item.stock,
            status: item.status,
            updated_at: now(),
            updated_by: item.updated_by,
        })
        .server_err()?;

        let _guard = self.db.write_lock().await;
        let written = self
            .db
            .query("UPDATE items MERGE $changes WHERE item_id = $id RETURN AFTER")
            .bind(("changes", changes))
            .bind(("id", item.id))
            .execute()
            .await
            .map_err(|e| on_write_error(e, "items_code", AppError::DuplicateCode));
        let mut response = match written {
            Ok(response) => response,
            Err(e) => return Err(self.duplicate_or(&item.code, item.id, e).await),
        };

        let rows: Vec<ItemRow> = response.take(0)?;
        rows.into_iter()
            .next()
            .map(Item::from)
            .ok_or(AppError::ItemNotFound)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Item> {
        let sql = format!("SELECT {ITEM_FIELDS} FROM items WHERE item_id = $id LIMIT 1");
        let mut response = self.db.query(sql).bind(("id", id)).run().await?;
        let rows: Vec<ItemRow> = response.take(0)?;
        rows.into_iter()
            .next()
            .map(Item::from)
            .ok_or(AppError::ItemNotFound)
    }

    async fn find_all(
        &self,
        status: Option<ItemStatus>,
        limit: u32,
        offset: u64,
    ) -> AppResult<(Vec<Item>, u64)> {
        let filter = if status.is_some() {
            " WHERE status = $status"
        } else {
            ""
        };
        let sql = format!(
            "SELECT count() AS total FROM items{filter} GROUP ALL; \
             SELECT {ITEM_FIELDS} FROM items{filter} \
             ORDER BY updated_at DESC, item_id DESC LIMIT $limit START $offset;"
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("limit", limit))
            .bind(("offset", offset));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str()));
        }

        let mut response = query.run().await?;
        let counts: Vec<CountRow> = response.take(0)?;
        let rows: Vec<ItemRow> = response.take(1)?;

        let total = counts.first().map_or(0, |c| c.total);
        Ok((rows.into_iter().map(Item::from).collect(), total))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let _guard = self.db.write_lock().await;
        let mut response = self
            .db
            .query("DELETE items WHERE item_id = $id RETURN BEFORE")
            .bind(("id", id))
            .run()
            .await?;

        let removed: Vec<IdRow> = response.take(0)?;
        if removed.is_empty() {
            return Err(AppError::ItemNotFound);
        }
        Ok(())
    }

    async fn exists_by_code(&self, code: &str, exclude_id: i64) -> AppResult<bool> {
        let mut response = self
            .db
            .query("SELECT item_id FROM items WHERE code = $code AND item_id != $exclude LIMIT 1")
            .bind(("code", code))
            .bind(("exclude", exclude_id))
            .run()
            .await?;

        let rows: Vec<IdRow> = response.take(0)?;
        Ok(!rows.is_empty())
    }
}
