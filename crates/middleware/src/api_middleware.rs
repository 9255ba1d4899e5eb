use app_authentication::{AuthService, AuthServiceTrait};
use app_error::AppError;
use app_models::Actor;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::IpAddr, str::FromStr, sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

// Client address for logs; never taken from credential headers
pub fn extract_client_id(req: &Request<Body>) -> String {
    get_client_ip(req)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// Get client IP from proxy headers or connection info
pub fn get_client_ip(req: &Request<Body>) -> Option<IpAddr> {
    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|ip| IpAddr::from_str(ip.trim()).ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = req
        .headers()
        .get("X-Real-IP")
        .and_then(|value| value.to_str().ok())
        .and_then(|ip| IpAddr::from_str(ip.trim()).ok());
    if real_ip.is_some() {
        return real_ip;
    }

    req.extensions()
        .get::<axum::extract::connect_info::ConnectInfo<std::net::SocketAddr>>()
        .map(|connect_info| connect_info.ip())
}

/// Token carried by an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::MissingToken)?;

    let mut parts = value.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("Bearer"), Some(token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::MissingToken),
    }
}

// JWT authentication middleware; rejects the request unless a valid bearer
// token is present and hands the caller's identity to the handler
pub async fn jwt_auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = match bearer_token(req.headers()).and_then(|token| auth.validate_token(token)) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    debug!(user_id = claims.user_id, "Request authenticated");
    req.extensions_mut().insert(Actor::from(claims));

    next.run(req).await
}

pub async fn security_headers_middleware(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}

// Logging middleware with performance tracking
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client_id = extract_client_id(&req);

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();

    if status < 400 {
        info!(
            method = %method,
            path = %path,
            client = %client_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    } else if status < 500 {
        warn!(
            method = %method,
            path = %path,
            client = %client_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            client = %client_id,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    }

    response
}
