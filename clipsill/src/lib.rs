//! Clipsill Core - clipboard history view logic
//!
//! Turns the platform clipboard-history facility into an ordered, favorites-first
//! list of view entries: each raw entry is classified into a semantic type,
//! matched against persisted favorites by content hash, and reconciled against
//! the previously published list so unchanged entries keep their identity.
//!
//! The facility and settings storage are reached through the ports in
//! [`interface`]; [`memory`] provides in-memory implementations of both.

pub mod config;
pub mod content_detection;
pub mod coordinator;
pub mod favorites;
pub mod formats;
pub mod hashing;
pub mod interface;
pub mod memory;
pub mod models;
pub mod reconcile;

pub use config::{HistorySettings, InMemorySettings};
pub use coordinator::{
    PublishedView, RefreshCoordinator, RefreshHandle, RefreshOutcome, RefreshState, RefreshTrigger,
};
pub use favorites::FavoritesStore;
pub use interface::*;
pub use models::{ViewContent, ViewEntry};
