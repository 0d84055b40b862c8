//! Favorites set keyed by content hash
//!
//! The whole set is persisted as one `;`-joined string in the settings
//! provider and rewritten on every toggle.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::interface::{ContentHash, HistoryError, SettingKey, SettingsProvider};

pub const FAVORITES_SEPARATOR: char = ';';

/// Parse the persisted form, ignoring empty segments
pub fn parse_favorites(serialized: &str) -> BTreeSet<ContentHash> {
    serialized
        .split(FAVORITES_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ContentHash::new)
        .collect()
}

pub fn serialize_favorites(favorites: &BTreeSet<ContentHash>) -> String {
    favorites
        .iter()
        .map(ContentHash::as_str)
        .collect::<Vec<_>>()
        .join(&FAVORITES_SEPARATOR.to_string())
}

/// Thread-safe favorites store.
///
/// Membership checks run on the refresh worker while toggles arrive from
/// user commands; both go through the same lock, and a toggle persists while
/// still holding it so the stored string never lags the set.
pub struct FavoritesStore {
    settings: Arc<dyn SettingsProvider>,
    hashes: Mutex<BTreeSet<ContentHash>>,
}

impl FavoritesStore {
    /// Load the persisted favorites once
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        let persisted = settings.get(SettingKey::FavoriteItems).unwrap_or_default();
        let hashes = parse_favorites(&persisted);
        tracing::debug!(count = hashes.len(), "Loaded favorites");
        Self {
            settings,
            hashes: Mutex::new(hashes),
        }
    }

    pub fn is_favorite(&self, hash: Option<&ContentHash>) -> bool {
        match hash {
            Some(hash) if !hash.is_empty() => self.hashes.lock().contains(hash),
            _ => false,
        }
    }

    /// Flip membership of `hash` and persist the full set.
    /// Returns the new membership. Empty hashes are ignored.
    pub fn toggle(&self, hash: &ContentHash) -> Result<bool, HistoryError> {
        if hash.is_empty() {
            return Ok(false);
        }

        let mut hashes = self.hashes.lock();
        let now_favorite = if hashes.remove(hash) {
            false
        } else {
            hashes.insert(hash.clone());
            true
        };

        let serialized = serialize_favorites(&hashes);
        if let Err(err) = self.settings.set(SettingKey::FavoriteItems, serialized) {
            tracing::error!(error = %err, hash = %hash, "Failed to persist favorites");
            return Err(err);
        }
        Ok(now_favorite)
    }

    pub fn len(&self) -> usize {
        self.hashes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.lock().is_empty()
    }
}
