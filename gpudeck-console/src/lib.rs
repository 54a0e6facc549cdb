//! Console state and behavior for the GPU cloud: pages, forms, polling and
//! the demo-mode simulations. Rendering is left to the caller; the `gpudeck`
//! binary prints plain tables.

pub mod banner;
pub mod config;
pub mod forms;
pub mod markdown;
pub mod pages;
pub mod poller;
pub mod session;
pub mod simulation;
pub mod store;
pub mod sync_state;

pub use banner::ErrorBanner;
pub use config::{ConsoleConfig, PollIntervals};
pub use session::Session;
pub use store::ConsoleStore;
