use app_error::{AppError, AppResult};
use app_models::{Actor, Item, ItemInput, ItemStatus, ListResponse};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::bad_request;
use crate::state::AppState;

const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListParams {
    /// Status filter, page and page size after boundary checks.
    fn resolve(self) -> AppResult<(Option<ItemStatus>, u32, u32)> {
        let status = match self.status.as_str() {
            "" => None,
            other => Some(other.parse::<ItemStatus>()?),
        };

        let limit = self.limit.unwrap_or(10);
        if !(1..=i64::from(MAX_LIMIT)).contains(&limit) {
            return Err(AppError::input("limit must be between 1 and 100"));
        }

        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::input("page must be at least 1"));
        }
        let page = u32::try_from(page).map_err(|_| AppError::input("page is too large"))?;

        Ok((status, page, limit as u32))
    }
}

fn item_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    let Path(id) = path.map_err(|_| AppError::input("item id must be an integer"))?;
    Ok(id)
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let Json(input) = payload.map_err(bad_request)?;

    let item = state.items.create(&actor, input).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Item>> {
    let id = item_id(path)?;
    Ok(Json(state.items.get_by_id(id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ItemInput>, JsonRejection>,
) -> AppResult<Json<Item>> {
    let id = item_id(path)?;
    // A missing item is reported before a bad body
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            state.items.get_by_id(id).await?;
            return Err(bad_request(rejection));
        }
    };

    let item = state.items.update(&actor, id, input).await?;

    Ok(Json(item))
}

pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params.map_err(bad_request)?;
    let (status, page, limit) = params.resolve()?;

    let page = state.items.list(status, page, limit).await?;

    let headers = [
        ("X-Total-Count", page.total.to_string()),
        ("X-Page", page.page.to_string()),
        ("X-Per-Page", page.limit.to_string()),
        ("X-Total-Pages", page.total_pages().to_string()),
    ];

    Ok((headers, Json(ListResponse::from(page))))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let id = item_id(path)?;

    state.items.delete(&actor, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
