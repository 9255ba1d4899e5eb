use app_error::{AppError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Availability derived from stock; never taken from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Active,
    Inactive,
}

impl ItemStatus {
    pub fn from_stock(stock: i64) -> Self {
        if stock > 0 { Self::Active } else { Self::Inactive }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            _ => Err(AppError::input("status must be 'ACTIVE' or 'INACTIVE'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub status: ItemStatus,
    #[serde(serialize_with = "rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "rfc3339")]
    pub updated_at: DateTime<Utc>,
    pub created_by: i64,
    pub updated_by: i64,
}

fn rfc3339<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

impl Item {
    /// Overwrites the mutable fields and re-derives the status.
    pub fn apply(&mut self, input: ItemInput) {
        self.code = input.code;
        self.title = input.title;
        self.description = input.description;
        self.price = input.price;
        self.stock = input.stock;
        self.status = ItemStatus::from_stock(self.stock);
    }
}

/// A validated item that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub code: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub stock: i64,
    pub status: ItemStatus,
    pub created_by: i64,
    pub updated_by: i64,
}

/// Request body for create and full-replace update. A `status` sent by the
/// client is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    pub code: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub stock: i64,
}

impl ItemInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::CodeRequired);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::DescriptionRequired);
        }
        if self.price <= 0 {
            return Err(ValidationError::InvalidPrice);
        }
        if self.stock < 0 {
            return Err(ValidationError::InvalidStock);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl ItemPage {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
    pub data: Vec<Item>,
}

impl From<ItemPage> for ListResponse {
    fn from(page: ItemPage) -> Self {
        Self {
            total_pages: page.total_pages(),
            data: page.items,
        }
    }
}
