//! Console storefront for the Web-Larek catalog.
//!
//! The session is a single [`StorefrontStore`]: commands become
//! [`StorefrontAction`]s, the [`StorefrontReducer`] updates the
//! [`StorefrontState`] and returns notifications, and views subscribed to the
//! store's event bus render them.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront::views::{mount_all, Sink, StdoutSink};
//! use storefront::{
//!     StorefrontAction, StorefrontEnvironment, StorefrontReducer, StorefrontState,
//!     StorefrontStore,
//! };
//! use storefront_api::{ApiConfig, LarekClient};
//! use storefront_core::environment::SystemClock;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LarekClient::new(&ApiConfig::default())?;
//! let env = StorefrontEnvironment::new(Arc::new(client), Arc::new(SystemClock));
//! let store = StorefrontStore::new(StorefrontState::new(), StorefrontReducer::new(), env);
//!
//! let sink: Arc<dyn Sink> = Arc::new(StdoutSink);
//! mount_all(store.events(), &sink);
//!
//! let mut handle = store.send(StorefrontAction::RequestCatalog).await?;
//! handle.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod console;
pub mod reducer;
pub mod types;
pub mod validation;
pub mod views;

use storefront_runtime::Store;

// Re-export commonly used types
pub use console::{Command, CommandError, Flow, Session};
pub use reducer::{StorefrontEnvironment, StorefrontReducer};
pub use types::{
    EventKind, FormErrors, FormField, OrderDraft, OrderReceipt, Product, ProductId,
    StorefrontAction, StorefrontEvent, StorefrontState,
};

/// Store running the storefront session
pub type StorefrontStore =
    Store<StorefrontState, StorefrontAction, StorefrontEnvironment, StorefrontReducer>;
