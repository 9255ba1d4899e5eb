use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::error;

use crate::state::AppState;

pub async fn ping() -> impl IntoResponse {
    Json(json!({
        "message": "pong",
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let storage = state.storage.as_str();

    if let Some(db) = &state.database {
        if let Err(e) = db.health().await {
            error!("Health check failed: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "storage": storage })),
            );
        }
    }

    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "storage": storage })),
    )
}
