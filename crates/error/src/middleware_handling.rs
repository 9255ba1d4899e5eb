use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use tracing::error;
use uuid::Uuid;

use crate::ErrorResponse;

/// Rewrites bare responses produced by tower layers (body limit, timeout,
/// unmatched 5xx) into the JSON error shape used by handlers.
pub async fn error_handling_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = next.run(req).await;
    let status = response.status();

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        return response;
    }

    let rewritten = match status {
        StatusCode::PAYLOAD_TOO_LARGE => Some(ErrorResponse::new(
            status,
            "PAYLOAD_TOO_LARGE",
            "request body exceeds the maximum allowed size",
        )),
        StatusCode::REQUEST_TIMEOUT => Some(ErrorResponse::new(
            status,
            "TIMEOUT",
            "request took too long to complete",
        )),
        s if s.is_server_error() => {
            error!(%method, %path, status = s.as_u16(), "Unhandled server error");
            Some(ErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERVER_ERROR",
                "internal server error",
            ))
        }
        _ => None,
    };

    match rewritten {
        Some(body) => (status, Json(body)).into_response(),
        None => response,
    }
}

/// Response factory for `CatchPanicLayer::custom`.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let error_id = Uuid::new_v4().to_string();

    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else {
        "non-string panic payload"
    };

    error!(error_id = %error_id, panic = %detail, "Request handler panicked");

    let body = ErrorResponse::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "SERVER_ERROR",
        "internal server error",
    )
    .with_error_id(error_id);

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
