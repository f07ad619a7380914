use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use std::sync::Arc;

use crate::config::{AdminConfig, SecurityConfig};
use crate::database::MemoryStore;
use crate::server::route_builder::{build_router, build_state};
use crate::services::init::ensure_admin_account;

pub const ADMIN_EMAIL: &str = "admin@erp.com";
pub const ADMIN_PASSWORD: &str = "Admin@123";

/// Router over an in-memory store seeded with the default admin account.
pub async fn test_state() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    ensure_admin_account(&*store, &AdminConfig::default())
        .await
        .unwrap();

    let state = build_state(
        store.clone(),
        store.clone(),
        "test-secret",
        SecurityConfig::default(),
    );

    (build_router(state), store)
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
