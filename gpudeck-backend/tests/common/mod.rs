// Shared helpers for backend integration tests
#![allow(dead_code)]

use axum::http::HeaderMap;
use axum::Router;
use gpudeck_backend::{HttpBackend, HttpTimeouts};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TEST_TOKEN: &str = "t0ken-for-tests";

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_fake_api(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake API");
    let addr: SocketAddr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake API crashed");
    });
    format!("http://{}", addr)
}

/// Base URL on which nothing listens.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn http_backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(base_url, Some(TEST_TOKEN.to_string()), HttpTimeouts::default())
        .expect("Failed to build backend")
}

pub fn http_backend_with_timeout(base_url: &str, total: Duration) -> HttpBackend {
    HttpBackend::new(
        base_url,
        Some(TEST_TOKEN.to_string()),
        HttpTimeouts {
            connect: Duration::from_secs(1),
            total,
        },
    )
    .expect("Failed to build backend")
}

pub fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TEST_TOKEN))
        .unwrap_or(false)
}
