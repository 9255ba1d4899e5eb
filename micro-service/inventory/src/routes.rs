use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use app_config::{AppConfig, CorsConfig};
use app_error::middleware_handling::{error_handling_middleware, panic_response};
use app_middleware::{jwt_auth_middleware, logging_middleware, security_headers_middleware};

use crate::{
    handlers::{
        auth::{login, register},
        health::{health, ping},
        items::{create_item, delete_item, get_item, list_items, update_item},
    },
    state::AppState,
};

fn cors_layer(cors_config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        // "*" allows any origin, otherwise the exact list
        .allow_origin(if cors_config.allowed_origins.iter().any(|o| o == "*") {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(
                cors_config
                    .allowed_origins
                    .iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect::<Vec<_>>(),
            )
        })
        .allow_methods(
            cors_config
                .allowed_methods
                .iter()
                .filter_map(|method| method.parse().ok())
                .collect::<Vec<_>>(),
        )
        .allow_headers(
            cors_config
                .allowed_headers
                .iter()
                .filter_map(|header| header.parse().ok())
                .collect::<Vec<_>>(),
        )
}

pub fn create_routes(state: AppState, config: &AppConfig) -> Router {
    let auth_service = Arc::clone(&state.auth);

    // Everything under /api/v1 requires a bearer token
    let items = Router::new()
        .route("/items", post(create_item).get(list_items))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route_layer(from_fn_with_state(auth_service, jwt_auth_middleware));

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .nest("/api/v1", items)
        .with_state(state);

    // Innermost first, so the error middleware sees 408 and 413 responses
    let app = app
        .layer(RequestBodyLimitLayer::new(config.server.body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(from_fn(error_handling_middleware))
        .layer(from_fn(logging_middleware))
        .layer(from_fn(security_headers_middleware));

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.security.cors));

    app.layer(middleware_stack)
}
