//! # chatwarden
//!
//! Warning tracker and word filter engine for game server chat
//! moderation. Inbound chat lines are matched against configured filters
//! (literal words or regexes); matches accumulate weighted warnings per
//! player inside a sliding time window, and once the cumulative weight
//! exceeds the configured limit an escalating action fires: warn, kick,
//! mute or ban.
//!
//! The crate is purely in-process. Enforcement, persistence and operator
//! notifications are consumed through the narrow traits in [`actions`]
//! and [`store`], so the surrounding deployment decides how bans reach
//! live servers and where filters live.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use chatwarden::prelude::*;
//! use std::sync::Arc;
//! use tokio::sync::{broadcast, RwLock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let store = Arc::new(MemoryStore::new());
//!     let filters = Arc::new(WordFilters::new(store.clone()));
//!     filters.import().await?;
//!
//!     let handler = EscalationHandler::new(
//!         Arc::new(LogActions),
//!         Arc::new(LogNotifier),
//!         store,
//!         Arc::new(RwLock::new(config.clone())),
//!     );
//!
//!     let (tracker, handle) = WarningTracker::new(
//!         filters.clone(),
//!         config.filters,
//!         Box::new(handler),
//!         Arc::new(NoopMetrics),
//!         WarningTracker::DEFAULT_QUEUE_DEPTH,
//!     );
//!
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!     tokio::spawn(tracker.run(shutdown_rx));
//!
//!     // feed matches from the chat ingestion path via handle.queue(..)
//!     let _ = (handle, shutdown_tx);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod config;
pub mod durations;
pub mod filters;
pub mod handlers;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export commonly used items
pub mod prelude {
    pub use crate::actions::{LogActions, LogNotifier, ModerationActions, Notifier};
    pub use crate::config::{AppConfig, FilterConfig};
    pub use crate::filters::{FilterOpts, WordFilters};
    pub use crate::handlers::EscalationHandler;
    pub use crate::store::{FilterStore, MemoryStore, StoreError};
    pub use crate::tracker::{
        NoopMetrics, TrackerHandle, TrackerMetrics, WarningHandler, WarningTracker,
    };
    pub use crate::types::{
        Filter, FilterAction, NewUserWarning, PlayerMessage, SteamId, UserWarning,
    };
    pub use anyhow::Result;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
