use app_authentication::JwtService;
use app_config::AppConfig;
use app_database::initialize_memory_db;
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{Method, StatusCode, header},
    response::Response,
};
use micro_inventory::{AppState, create_routes};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &[u8] = b"test_secret_key_for_system_testing_only";

async fn memory_app() -> Router {
    let state = AppState::in_memory(Arc::new(JwtService::new(SECRET)));
    create_routes(state, &AppConfig::default())
}

// SurrealDB-backed stores on the embedded engine
async fn surreal_app() -> Router {
    let db = initialize_memory_db()
        .await
        .expect("in-memory SurrealDB should start");
    let state = AppState::persistent(db, Arc::new(JwtService::new(SECRET)));
    create_routes(state, &AppConfig::default())
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let credentials = json!({ "username": username, "password": password });

    let response = send(app, Method::POST, "/register", None, Some(credentials.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(app, Method::POST, "/login", None, Some(credentials)).await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["token"].as_str().unwrap().to_string()
}

fn item(code: &str, price: i64, stock: i64) -> Value {
    json!({
        "code": code,
        "title": format!("Title {}", code),
        "description": "stocked in aisle 4",
        "price": price,
        "stock": stock,
    })
}

/// Full lifecycle through the router: two users share the catalogue and the
/// audit fields follow whoever acted last.
async fn run_inventory_flow(app: Router) {
    let alice = login(&app, "alice", "alice-password").await;
    let bob = login(&app, "bob", "bob-password").await;

    let response = send(&app, Method::POST, "/api/v1/items", Some(&alice), Some(item("KB-01", 8900, 4))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let keyboard = read_json(response).await;
    assert_eq!(keyboard["status"], "ACTIVE");
    assert_eq!(keyboard["created_by"], 1);
    let id = keyboard["id"].as_i64().unwrap();

    let response = send(&app, Method::POST, "/api/v1/items", Some(&bob), Some(item("KB-01", 100, 1))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Bob sells out
    let response = send(&app, Method::PUT, &format!("/api/v1/items/{}", id), Some(&bob), Some(item("KB-01", 8900, 0))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["status"], "INACTIVE");
    assert_eq!(updated["created_by"], 1);
    assert_eq!(updated["updated_by"], 2);
    assert_eq!(updated["created_at"], keyboard["created_at"]);

    let response = send(&app, Method::POST, "/api/v1/items", Some(&bob), Some(item("MS-01", 2500, 10))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let mouse_id = read_json(response).await["id"].as_i64().unwrap();

    // Renaming onto a code that belongs to another item
    let response = send(&app, Method::PUT, &format!("/api/v1/items/{}", mouse_id), Some(&bob), Some(item("KB-01", 2500, 10))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, Method::GET, "/api/v1/items?status=INACTIVE", Some(&alice), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["X-Total-Count"], "1");
    let listing = read_json(response).await;
    assert_eq!(listing["totalPages"], 1);
    assert_eq!(listing["data"][0]["code"], "KB-01");

    let response = send(&app, Method::GET, "/api/v1/items", Some(&alice), None).await;
    let listing = read_json(response).await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 2);
    // Most recently updated first
    assert_eq!(listing["data"][0]["code"], "MS-01");

    let response = send(&app, Method::DELETE, &format!("/api/v1/items/{}", id), Some(&alice), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, Method::GET, &format!("/api/v1/items/{}", id), Some(&alice), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::GET, "/api/v1/items?page=3&limit=10", Some(&alice), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_json(response).await["data"].as_array().unwrap().is_empty());
}

async fn run_registration_rules(app: Router) {
    let response = send(&app, Method::POST, "/register", None, Some(json!({ "username": "short", "password": "12345" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, Method::POST, "/register", None, Some(json!({ "username": "short", "password": "123456" }))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, Method::POST, "/register", None, Some(json!({ "username": "short", "password": "123456" }))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, Method::POST, "/register", None, Some(json!({ "username": "", "password": "123456" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, Method::POST, "/login", None, Some(json!({ "username": "short", "password": "654321" }))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inventory_flow_in_memory() {
    run_inventory_flow(memory_app().await).await;
}

#[tokio::test]
async fn test_inventory_flow_on_surrealdb() {
    run_inventory_flow(surreal_app().await).await;
}

#[tokio::test]
async fn test_registration_rules_in_memory() {
    run_registration_rules(memory_app().await).await;
}

#[tokio::test]
async fn test_registration_rules_on_surrealdb() {
    run_registration_rules(surreal_app().await).await;
}

#[tokio::test]
async fn test_health_reports_backend() {
    let response = send(&surreal_app().await, Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["storage"], "surrealdb");

    let response = send(&memory_app().await, Method::GET, "/health", None, None).await;
    assert_eq!(read_json(response).await["storage"], "memory");
}

#[tokio::test]
async fn test_token_from_another_secret_is_rejected() {
    let app = memory_app().await;
    let foreign = JwtService::new(b"not-the-server-secret").issue(1, "intruder").unwrap();

    let response = send(&app, Method::GET, "/api/v1/items", Some(&foreign), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["code"], "INVALID_TOKEN");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_through_router() {
    let app = memory_app().await;
    let token = login(&app, "racer", "racer-password").await;

    let requests = (0..12).map(|_| {
        let app = app.clone();
        let token = token.clone();
        tokio::spawn(async move {
            send(&app, Method::POST, "/api/v1/items", Some(&token), Some(item("RACE-1", 100, 1)))
                .await
                .status()
        })
    });
    let statuses: Vec<StatusCode> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(), 11);
}
