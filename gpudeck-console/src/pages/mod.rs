//! One module per console screen.
//!
//! A page owns its state behind a `RwLock`, refreshes it through the
//! session's backend, and mutates by calling the backend then re-fetching.

pub mod docs;
pub mod finetune;
pub mod jobs;
pub mod machines;
pub mod nps;
pub mod price_monitor;
pub mod reservations;
pub mod teams;
pub mod templates;

pub use docs::DocsPage;
pub use finetune::FinetunePage;
pub use jobs::JobsPage;
pub use machines::MachinesPage;
pub use nps::NpsPage;
pub use price_monitor::PriceMonitorPage;
pub use reservations::ReservationsPage;
pub use teams::TeamsPage;
pub use templates::TemplatesSlice;

use tokio_util::sync::CancellationToken;

/// Background work owned by a page; cancelled when the last handle goes away.
#[derive(Debug, Default)]
pub(crate) struct TaskScope(CancellationToken);

impl TaskScope {
    pub(crate) fn token(&self) -> CancellationToken {
        self.0.child_token()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
