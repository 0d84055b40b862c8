//! Clipsill interface definition
//!
//! Shared types and the ports through which the core talks to its external
//! collaborators: the platform clipboard-history facility and the settings
//! provider. Rendering code consumes the published view built from these.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::formats::FormatSet;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Semantic category of one clipboard entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Unknown,
    Text,
    Html,
    Rtf,
    Uri,
    ApplicationLink,
    Color,
    Image,
    File,
    UserActivity,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Unknown => "unknown",
            SemanticType::Text => "text",
            SemanticType::Html => "html",
            SemanticType::Rtf => "rtf",
            SemanticType::Uri => "uri",
            SemanticType::ApplicationLink => "application_link",
            SemanticType::Color => "color",
            SemanticType::Image => "image",
            SemanticType::File => "file",
            SemanticType::UserActivity => "user_activity",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications raised by the clipboard-history facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardEvent {
    ContentChanged,
    HistoryChanged,
    HistoryEnabledChanged,
}

/// Settings owned by this component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    MaximumHistoryCount,
    HidePasswords,
    FavoriteItems,
}

impl SettingKey {
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::MaximumHistoryCount => "MaximumHistoryCount",
            SettingKey::HidePasswords => "HidePasswords",
            SettingKey::FavoriteItems => "FavoriteItems",
        }
    }
}

/// Result status of a history enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryItemsStatus {
    Success,
    AccessDenied,
    ClipboardHistoryDisabled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity hash of an entry's content, used to match favorites across refreshes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file or folder carried by a storage-items entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageItem {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_folder: bool,
}

/// Snapshot returned by the facility: status plus entries, most recent first
pub struct HistoryItems {
    pub status: HistoryItemsStatus,
    pub items: Vec<Arc<dyn ClipboardEntry>>,
}

impl HistoryItems {
    pub fn success(items: Vec<Arc<dyn ClipboardEntry>>) -> Self {
        Self { status: HistoryItemsStatus::Success, items }
    }

    pub fn failed(status: HistoryItemsStatus) -> Self {
        Self { status, items: Vec::new() }
    }
}

/// Error type for clipsill operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HistoryError {
    #[error("Clipboard history unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read format {format}: {reason}")]
    Format { format: String, reason: String },
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("No entry with id {0} in the published view")]
    EntryNotFound(String),
    #[error("Entry {0} has no content hash")]
    NoContentHash(String),
    #[error("Refresh worker stopped")]
    Stopped,
}

impl HistoryError {
    pub fn format(format: &str, reason: impl fmt::Display) -> Self {
        HistoryError::Format {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One item of the platform clipboard history.
///
/// Content accessors are async because the facility may have to marshal data
/// out of another process. Each accessor fails with [`HistoryError::Format`]
/// when the format is missing or cannot be read.
#[async_trait]
pub trait ClipboardEntry: Send + Sync {
    /// Stable id, unique per logical copy event
    fn id(&self) -> &str;

    fn timestamp(&self) -> DateTime<Utc>;

    fn available_formats(&self) -> FormatSet;

    async fn text(&self) -> Result<String, HistoryError>;

    async fn html(&self) -> Result<String, HistoryError>;

    async fn rtf(&self) -> Result<String, HistoryError>;

    async fn web_link(&self) -> Result<String, HistoryError>;

    async fn application_link(&self) -> Result<String, HistoryError>;

    async fn storage_items(&self) -> Result<Vec<StorageItem>, HistoryError>;

    /// Encoded image bytes (BMP, PNG, ...)
    async fn bitmap(&self) -> Result<Vec<u8>, HistoryError>;

    async fn user_activity(&self) -> Result<String, HistoryError>;
}

/// The platform clipboard-history facility
#[async_trait]
pub trait ClipboardHistory: Send + Sync {
    fn is_history_enabled(&self) -> bool;

    /// Enumerate history, most recent first
    async fn history_items(&self) -> Result<HistoryItems, HistoryError>;

    /// Subscribe to facility events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> UnboundedReceiver<ClipboardEvent>;

    fn set_as_current_content(&self, entry: &dyn ClipboardEntry) -> Result<(), HistoryError>;

    fn delete_from_history(&self, entry: &dyn ClipboardEntry) -> Result<bool, HistoryError>;

    fn clear_history(&self) -> Result<bool, HistoryError>;
}

/// Raw string settings storage
pub trait SettingsProvider: Send + Sync {
    fn get(&self, key: SettingKey) -> Option<String>;

    fn set(&self, key: SettingKey, value: String) -> Result<(), HistoryError>;

    /// Subscribe to setting changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> UnboundedReceiver<SettingKey>;
}
