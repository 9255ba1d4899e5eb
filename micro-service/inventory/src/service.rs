use app_database::ItemStore;
use app_error::{AppError, AppResult};
use app_models::{Actor, Item, ItemInput, ItemPage, ItemStatus, NewItem};
use std::sync::Arc;
use tracing::info;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 20;

/// Business rules for inventory items on top of an [`ItemStore`].
pub struct ItemService {
    items: Arc<dyn ItemStore>,
}

impl ItemService {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    pub async fn create(&self, actor: &Actor, input: ItemInput) -> AppResult<Item> {
        input.validate()?;

        if self.items.exists_by_code(&input.code, 0).await? {
            return Err(AppError::DuplicateCode);
        }

        let item = self
            .items
            .save(NewItem {
                status: ItemStatus::from_stock(input.stock),
                code: input.code,
                title: input.title,
                description: input.description,
                price: input.price,
                stock: input.stock,
                created_by: actor.id,
                updated_by: actor.id,
            })
            .await?;

        info!(item_id = item.id, code = %item.code, user_id = actor.id, "Item created");
        Ok(item)
    }

    /// Full replacement of the item's mutable fields. Returns the item as
    /// persisted.
    pub async fn update(&self, actor: &Actor, id: i64, input: ItemInput) -> AppResult<Item> {
        let mut item = self.items.find_by_id(id).await?;

        input.validate()?;
        if self.items.exists_by_code(&input.code, id).await? {
            return Err(AppError::DuplicateCode);
        }

        item.apply(input);
        item.updated_by = actor.id;

        let item = self.items.update(&item).await?;

        info!(item_id = item.id, user_id = actor.id, status = %item.status, "Item updated");
        Ok(item)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Item> {
        self.items.find_by_id(id).await
    }

    /// One page of items. Out-of-range paging falls back to page 1 and the
    /// default page size.
    pub async fn list(
        &self,
        status: Option<ItemStatus>,
        page: u32,
        limit: u32,
    ) -> AppResult<ItemPage> {
        let page = page.max(1);
        let limit = if (1..=MAX_PAGE_SIZE).contains(&limit) {
            limit
        } else {
            DEFAULT_PAGE_SIZE
        };
        let offset = u64::from(page - 1) * u64::from(limit);

        let (items, total) = self.items.find_all(status, limit, offset).await?;

        Ok(ItemPage {
            items,
            total,
            page,
            limit,
        })
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> AppResult<()> {
        self.items.delete(id).await?;
        info!(item_id = id, user_id = actor.id, "Item deleted");
        Ok(())
    }
}
