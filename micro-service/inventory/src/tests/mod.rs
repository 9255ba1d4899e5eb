use app_authentication::{AuthServiceTrait, JwtService};
use app_config::AppConfig;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{AppState, create_routes};

const SECRET: &[u8] = b"route-test-secret";

fn test_state() -> AppState {
    AppState::in_memory(Arc::new(JwtService::new(SECRET)))
}

fn test_app(state: AppState) -> Router {
    create_routes(state, &AppConfig::default())
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn token_for(app: &Router, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "secret123" });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/register", None, credentials.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/login", None, credentials))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

fn item_body(code: &str, stock: i64) -> Value {
    json!({
        "code": code,
        "title": "Notebook",
        "description": "A5 dotted",
        "price": 1200,
        "stock": stock,
    })
}

#[tokio::test]
async fn test_ping_and_health() {
    let app = test_app(test_state());

    let response = app.clone().oneshot(empty_request("GET", "/ping", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "pong");
    assert!(body["time"].is_string());

    let response = app.oneshot(empty_request("GET", "/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_register_responses() {
    let app = test_app(test_state());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            None,
            json!({ "username": "ivy", "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "ivy");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            None,
            json!({ "username": "ivy", "password": "another1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            None,
            json!({ "username": "jay", "password": "12345" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "password must be at least 6 characters");
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = test_app(test_state());

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing field
    let response = app
        .clone()
        .oneshot(json_request("POST", "/login", None, json!({ "username": "kim" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = test_app(test_state());
    token_for(&app, "lee").await;

    let wrong_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({ "username": "lee", "password": "nope-nope" }),
        ))
        .await
        .unwrap();
    let unknown_user = app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({ "username": "max", "password": "nope-nope" }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let first = body_json(wrong_password).await;
    let second = body_json(unknown_user).await;
    assert_eq!(first["error"], second["error"]);
    assert_eq!(first["error"], "invalid username or password");
}

#[tokio::test]
async fn test_items_require_valid_token() {
    let state = test_state();
    let expired = state
        .auth
        .jwt_service()
        .issue_at(1, "old", Utc::now() - Duration::hours(2))
        .unwrap();
    let app = test_app(state);

    for token in [None, Some("garbage-token-value"), Some(expired.as_str())] {
        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/v1/items", token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_item_crud_flow() {
    let app = test_app(test_state());
    let token = token_for(&app, "nia").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/items", Some(&token), item_body("NB-1", 0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "INACTIVE");
    assert_eq!(created["created_by"], 1);
    let id = created["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/v1/items/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["code"], "NB-1");

    // Client-supplied status is ignored
    let mut replacement = item_body("NB-1", 8);
    replacement["status"] = json!("INACTIVE");
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/items/{}", id),
            Some(&token),
            replacement,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "ACTIVE");
    assert_eq!(updated["stock"], 8);
    assert_eq!(updated["id"], id);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/items/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/v1/items/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("DELETE", &format!("/api/v1/items/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_error_statuses() {
    let app = test_app(test_state());
    let token = token_for(&app, "oli").await;

    app.clone()
        .oneshot(json_request("POST", "/api/v1/items", Some(&token), item_body("DUP", 1)))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/items", Some(&token), item_body("DUP", 1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut invalid = item_body("NEW", 1);
    invalid["price"] = json!(0);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/items", Some(&token), invalid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "price must be greater than zero");

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/v1/items/77", Some(&token), item_body("X", 1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("GET", "/api/v1/items/abc", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_pagination_and_headers() {
    let app = test_app(test_state());
    let token = token_for(&app, "pat").await;

    for n in 0..15 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/items",
                Some(&token),
                item_body(&format!("SKU-{}", n), 3),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            "/api/v1/items?status=ACTIVE&page=1&limit=10",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["X-Total-Count"], "15");
    assert_eq!(response.headers()["X-Page"], "1");
    assert_eq!(response.headers()["X-Per-Page"], "10");
    assert_eq!(response.headers()["X-Total-Pages"], "2");
    let body = body_json(response).await;
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/items?page=2&limit=10", Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 5);

    // Accepted at the boundary, then capped by the service
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/items?limit=50", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["X-Per-Page"], "10");

    for query in ["status=SOLD", "limit=101", "limit=0", "page=0", "page=x"] {
        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/v1/items?{}", query), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {}", query);
    }
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = test_app(test_state());
    let response = app.oneshot(empty_request("GET", "/ping", None)).await.unwrap();

    assert_eq!(response.headers()["X-Content-Type-Options"], "nosniff");
    assert_eq!(response.headers()["X-Frame-Options"], "DENY");
    assert!(response.headers().contains_key("Referrer-Policy"));
}

#[tokio::test]
async fn test_update_reports_missing_item_before_bad_body() {
    let app = test_app(test_state());
    let token = token_for(&app, "quinn").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/items", Some(&token), item_body("Q-1", 1)))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_i64().unwrap();

    let bad_body = json!({ "title": "no code or price" });

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/v1/items/999", Some(&token), bad_body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/items/{}", id),
            Some(&token),
            bad_body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_outer_layers_answer_without_request_ids() {
    let app = test_app(test_state());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-request-id"));

    let oversized = vec![b'a'; AppConfig::default().server.body_limit + 1];
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, oversized.len())
                .body(Body::from(oversized))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await["code"], "PAYLOAD_TOO_LARGE");
}
