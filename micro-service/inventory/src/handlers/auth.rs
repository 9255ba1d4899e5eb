use app_authentication::AuthServiceTrait;
use app_error::AppResult;
use app_models::{LoginInput, RegisterInput, RegisteredUser, TokenResponse};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use super::bad_request;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RegisteredUser>)> {
    let Json(input) = payload.map_err(bad_request)?;

    let user = state.auth.register(input).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(input) = payload.map_err(bad_request)?;

    let token = state.auth.login(input).await?;

    Ok(Json(TokenResponse { token }))
}
