// Shared helpers for console integration tests
#![allow(dead_code)]

use axum::Router;
use gpudeck_backend::{ConsoleBackend, DemoBackend, HttpBackend, HttpTimeouts};
use gpudeck_console::{PollIntervals, Session};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TEST_TOKEN: &str = "console-test-token";

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

pub fn http_session(base_url: &str) -> Arc<Session> {
    let backend = HttpBackend::new(base_url, Some(TEST_TOKEN.to_string()), HttpTimeouts::default())
        .expect("Failed to build backend");
    Session::with_backend(Arc::new(backend), PollIntervals::default())
}

pub fn demo_session() -> Arc<Session> {
    let backend: Arc<dyn ConsoleBackend> = Arc::new(DemoBackend::new());
    Session::with_backend(backend, PollIntervals::default())
}
