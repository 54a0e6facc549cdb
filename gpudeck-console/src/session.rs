use crate::config::{ConsoleConfig, PollIntervals};
use anyhow::{Context, Result};
use gpudeck_backend::{ConsoleBackend, DemoBackend, HttpBackend, HttpTimeouts};
use std::sync::Arc;

/// Who is signed in and which backend serves them.
///
/// Built once at startup and shared read-only; pages never mutate it.
pub struct Session {
    api_url: String,
    token: Option<String>,
    demo: bool,
    poll: PollIntervals,
    backend: Arc<dyn ConsoleBackend>,
}

impl Session {
    pub fn new(config: &ConsoleConfig) -> Result<Arc<Self>> {
        let demo = config.is_demo();
        let backend: Arc<dyn ConsoleBackend> = if demo {
            tracing::info!("🎭 demo mode: using the scripted in-memory backend");
            Arc::new(DemoBackend::new())
        } else {
            let timeouts = HttpTimeouts {
                connect: config.connect_timeout,
                total: config.request_timeout,
            };
            let http = HttpBackend::new(&config.api_url, config.token.clone(), timeouts)
                .context("building the HTTP backend")?;
            tracing::info!("🔌 console API at {}", http.base_url());
            Arc::new(http)
        };
        Ok(Arc::new(Self {
            api_url: config.api_url.clone(),
            token: config.token.clone(),
            demo,
            poll: config.poll,
            backend,
        }))
    }

    /// Session over an already-built backend.
    pub fn with_backend(backend: Arc<dyn ConsoleBackend>, poll: PollIntervals) -> Arc<Self> {
        Arc::new(Self {
            api_url: String::new(),
            token: None,
            demo: backend.is_demo(),
            poll,
            backend,
        })
    }

    pub fn backend(&self) -> Arc<dyn ConsoleBackend> {
        self.backend.clone()
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn poll(&self) -> PollIntervals {
        self.poll
    }

    pub fn is_signed_in(&self) -> bool {
        self.demo || self.token.is_some()
    }

    /// End the session. Returns the token that was dropped, if any.
    pub fn logout(self) -> Option<String> {
        tracing::info!("👋 session closed");
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_route_builds_demo_backend() {
        let cfg = ConsoleConfig {
            route: Some("/demo-app/machines".into()),
            ..Default::default()
        };
        let session = Session::new(&cfg).unwrap();
        assert!(session.is_demo());
        assert!(session.backend().is_demo());
        assert!(session.is_signed_in());
    }

    #[tokio::test]
    async fn real_mode_without_token_is_signed_out() {
        let session = Session::new(&ConsoleConfig::default()).unwrap();
        assert!(!session.is_demo());
        assert!(!session.is_signed_in());
        assert_eq!(session.api_url(), crate::config::DEFAULT_API_URL);
    }

    #[test]
    fn logout_hands_back_token() {
        let cfg = ConsoleConfig {
            token: Some("abc".into()),
            ..Default::default()
        };
        let session = Session::new(&cfg).unwrap();
        let session = Arc::try_unwrap(session).ok().unwrap();
        assert_eq!(session.logout().as_deref(), Some("abc"));
    }
}
