use crate::session::Session;
use crate::store::SliceWriter;
use gpudeck_backend::{ApiError, ApiResult, ConsoleBackend};
use gpudeck_common::Template;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Marketplace templates, fetched on first use and cached in the store.
///
/// A failed load leaves the cell empty so the next call tries again.
#[derive(Clone)]
pub struct TemplatesSlice {
    backend: Arc<dyn ConsoleBackend>,
    writer: Arc<SliceWriter<Vec<Template>>>,
    loaded: Arc<OnceCell<usize>>,
}

impl TemplatesSlice {
    pub fn new(session: Arc<Session>, writer: SliceWriter<Vec<Template>>) -> Self {
        Self {
            backend: session.backend(),
            writer: Arc::new(writer),
            loaded: Arc::new(OnceCell::new()),
        }
    }

    /// Number of templates published. Concurrent callers share one request.
    pub async fn ensure_loaded(&self) -> ApiResult<usize> {
        let count = self
            .loaded
            .get_or_try_init(|| async {
                let templates = self.backend.list_templates().await?;
                let n = templates.len();
                self.writer.publish(templates);
                tracing::debug!("loaded {} marketplace template(s)", n);
                Ok::<_, ApiError>(n)
            })
            .await?;
        Ok(*count)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub fn find(&self, id: &str) -> Option<Template> {
        self.writer
            .reader()
            .with(|all| all.iter().find(|t| t.id == id).cloned())
    }
}
