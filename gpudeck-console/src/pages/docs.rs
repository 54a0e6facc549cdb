use crate::markdown::{render_markdown, RenderedDoc};
use crate::session::Session;
use gpudeck_backend::ConsoleBackend;
use gpudeck_common::DocMenuItem;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_DOC: &str = "quickstart";

const OFFLINE_DOC: &str = "# Documentation unavailable\n\n\
The documentation service could not be reached. The console keeps working;\n\
try again in a moment.\n\n\
- Machines: create, pause, resume and delete GPU machines.\n\
- Jobs: run a Hugging Face repo, a git repository or a shell command.\n\
- Reservations: book GPUs ahead of time at a discount.\n";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DocsState {
    #[default]
    Loading,
    Loaded,
    /// Fallback content is on screen; the message says why.
    Error(String),
}

#[derive(Default)]
struct DocsInner {
    state: DocsState,
    menu: Vec<DocMenuItem>,
    current: Option<String>,
    rendered: RenderedDoc,
}

#[derive(Clone)]
pub struct DocsPage {
    backend: Arc<dyn ConsoleBackend>,
    inner: Arc<RwLock<DocsInner>>,
}

impl DocsPage {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            backend: session.backend(),
            inner: Arc::new(RwLock::new(DocsInner::default())),
        }
    }

    pub async fn load_menu(&self) {
        let menu = match self.backend.docs_menu().await {
            Ok(menu) if !menu.is_empty() => menu,
            Ok(_) => fallback_menu(),
            Err(e) => {
                tracing::warn!("⚠️ docs menu unavailable, using built-in one: {}", e);
                fallback_menu()
            }
        };
        self.inner.write().await.menu = menu;
    }

    /// Fetch and render one document. On failure the canned page is shown instead.
    pub async fn open(&self, id: &str) -> DocsState {
        {
            let mut inner = self.inner.write().await;
            inner.state = DocsState::Loading;
            inner.current = Some(id.to_string());
        }
        let result = self.backend.docs_content(id).await;
        let mut inner = self.inner.write().await;
        if inner.current.as_deref() != Some(id) {
            // another document was opened meanwhile
            return inner.state.clone();
        }
        match result {
            Ok(md) => {
                inner.rendered = render_markdown(&md);
                inner.state = DocsState::Loaded;
            }
            Err(e) => {
                tracing::warn!("⚠️ doc '{}' unavailable: {}", id, e);
                inner.rendered = render_markdown(OFFLINE_DOC);
                inner.state = DocsState::Error(e.user_message());
            }
        }
        inner.state.clone()
    }

    pub async fn state(&self) -> DocsState {
        self.inner.read().await.state.clone()
    }

    pub async fn menu(&self) -> Vec<DocMenuItem> {
        self.inner.read().await.menu.clone()
    }

    pub async fn current(&self) -> Option<String> {
        self.inner.read().await.current.clone()
    }

    pub async fn rendered(&self) -> RenderedDoc {
        self.inner.read().await.rendered.clone()
    }
}

pub fn fallback_menu() -> Vec<DocMenuItem> {
    vec![
        DocMenuItem {
            id: "getting-started".to_string(),
            title: "Getting started".to_string(),
            children: vec![
                DocMenuItem::leaf("quickstart", "Quickstart"),
                DocMenuItem::leaf("ssh-access", "SSH access"),
            ],
        },
        DocMenuItem {
            id: "reliability".to_string(),
            title: "Reliability".to_string(),
            children: vec![DocMenuItem::leaf("failover", "CPU standby & failover")],
        },
    ]
}
