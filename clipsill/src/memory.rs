//! In-memory clipboard-history facility.
//!
//! Backs the snapshot tool and the test suites. Entries can be built in code
//! or loaded from a JSON fixture, and individual formats can be marked as
//! failing to exercise degraded paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::formats::{self, FormatSet};
use crate::interface::{
    ClipboardEntry, ClipboardEvent, ClipboardHistory, HistoryError, HistoryItems,
    HistoryItemsStatus, StorageItem,
};

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => s.serialize_some(&base64::engine::general_purpose::STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|e| {
                base64::engine::general_purpose::STANDARD
                    .decode(e)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

/// Clipboard entry held entirely in memory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    id: String,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rtf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    web_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage_items: Option<Vec<StorageItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    bitmap: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_activity: Option<String>,
    /// Declared tags with no readable content
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    raw_formats: Vec<String>,
    /// Tags whose reads fail
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    failing: Vec<String>,
}

impl MemoryEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            text: None,
            html: None,
            rtf: None,
            web_link: None,
            application_link: None,
            storage_items: None,
            bitmap: None,
            user_activity: None,
            raw_formats: Vec::new(),
            failing: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_rtf(mut self, rtf: impl Into<String>) -> Self {
        self.rtf = Some(rtf.into());
        self
    }

    pub fn with_web_link(mut self, link: impl Into<String>) -> Self {
        self.web_link = Some(link.into());
        self
    }

    pub fn with_application_link(mut self, link: impl Into<String>) -> Self {
        self.application_link = Some(link.into());
        self
    }

    pub fn with_storage_items(mut self, items: Vec<StorageItem>) -> Self {
        self.storage_items = Some(items);
        self
    }

    pub fn with_bitmap(mut self, data: Vec<u8>) -> Self {
        self.bitmap = Some(data);
        self
    }

    pub fn with_user_activity(mut self, json: impl Into<String>) -> Self {
        self.user_activity = Some(json.into());
        self
    }

    pub fn with_raw_format(mut self, tag: impl Into<String>) -> Self {
        self.raw_formats.push(tag.into());
        self
    }

    /// Make every read of `format` fail
    pub fn failing(mut self, format: impl Into<String>) -> Self {
        self.failing.push(format.into());
        self
    }

    fn read<T: Clone>(&self, format: &str, value: &Option<T>) -> Result<T, HistoryError> {
        if self.failing.iter().any(|f| f == format) {
            return Err(HistoryError::format(format, "read failed"));
        }
        value
            .clone()
            .ok_or_else(|| HistoryError::format(format, "format not available"))
    }
}

#[async_trait]
impl ClipboardEntry for MemoryEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn available_formats(&self) -> FormatSet {
        let present = [
            (formats::TEXT, self.text.is_some()),
            (formats::HTML, self.html.is_some()),
            (formats::RTF, self.rtf.is_some()),
            (formats::WEB_LINK, self.web_link.is_some()),
            (formats::APPLICATION_LINK, self.application_link.is_some()),
            (formats::STORAGE_ITEMS, self.storage_items.is_some()),
            (formats::BITMAP, self.bitmap.is_some()),
            (formats::USER_ACTIVITY, self.user_activity.is_some()),
        ];
        let declared = present
            .into_iter()
            .filter(|(_, is_present)| *is_present)
            .map(|(tag, _)| tag.to_string());
        FormatSet::new(declared.chain(self.raw_formats.iter().cloned()))
    }

    async fn text(&self) -> Result<String, HistoryError> {
        self.read(formats::TEXT, &self.text)
    }

    async fn html(&self) -> Result<String, HistoryError> {
        self.read(formats::HTML, &self.html)
    }

    async fn rtf(&self) -> Result<String, HistoryError> {
        self.read(formats::RTF, &self.rtf)
    }

    async fn web_link(&self) -> Result<String, HistoryError> {
        self.read(formats::WEB_LINK, &self.web_link)
    }

    async fn application_link(&self) -> Result<String, HistoryError> {
        self.read(formats::APPLICATION_LINK, &self.application_link)
    }

    async fn storage_items(&self) -> Result<Vec<StorageItem>, HistoryError> {
        self.read(formats::STORAGE_ITEMS, &self.storage_items)
    }

    async fn bitmap(&self) -> Result<Vec<u8>, HistoryError> {
        self.read(formats::BITMAP, &self.bitmap)
    }

    async fn user_activity(&self) -> Result<String, HistoryError> {
        self.read(formats::USER_ACTIVITY, &self.user_activity)
    }
}

fn default_true() -> bool {
    true
}

/// JSON document accepted by [`MemoryClipboard::from_json`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClipboardFixture {
    #[serde(default = "default_true")]
    history_enabled: bool,
    #[serde(default)]
    access_denied: bool,
    #[serde(default)]
    entries: Vec<MemoryEntry>,
}

struct ClipboardState {
    enabled: bool,
    status: HistoryItemsStatus,
    enumeration_error: Option<String>,
    entries: Vec<Arc<MemoryEntry>>,
    current: Option<String>,
    enumerations: usize,
}

/// Clipboard-history facility over a list of [`MemoryEntry`], most recent first
pub struct MemoryClipboard {
    state: Mutex<ClipboardState>,
    subscribers: Mutex<Vec<UnboundedSender<ClipboardEvent>>>,
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    pub fn with_entries(entries: Vec<MemoryEntry>) -> Self {
        Self {
            state: Mutex::new(ClipboardState {
                enabled: true,
                status: HistoryItemsStatus::Success,
                enumeration_error: None,
                entries: entries.into_iter().map(Arc::new).collect(),
                current: None,
                enumerations: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Load a fixture such as
    /// `{"historyEnabled": true, "entries": [{"id": "1", "text": "hello"}]}`
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        let fixture: ClipboardFixture =
            serde_json::from_str(json).map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        let clipboard = Self::with_entries(fixture.entries);
        {
            let mut state = clipboard.state.lock();
            state.enabled = fixture.history_enabled;
            if fixture.access_denied {
                state.status = HistoryItemsStatus::AccessDenied;
            }
        }
        Ok(clipboard)
    }

    pub fn emit(&self, event: ClipboardEvent) {
        self.subscribers.lock().retain(|tx| tx.send(event).is_ok());
    }

    /// Record a new copy at the front of the history
    pub fn push(&self, entry: MemoryEntry) {
        self.state.lock().entries.insert(0, Arc::new(entry));
        self.emit(ClipboardEvent::ContentChanged);
    }

    /// Replace the whole history without raising an event
    pub fn set_entries(&self, entries: Vec<MemoryEntry>) {
        self.state.lock().entries = entries.into_iter().map(Arc::new).collect();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
        self.emit(ClipboardEvent::HistoryEnabledChanged);
    }

    pub fn set_status(&self, status: HistoryItemsStatus) {
        self.state.lock().status = status;
    }

    /// Make enumeration fail outright until cleared with `None`
    pub fn fail_enumeration(&self, reason: Option<&str>) {
        self.state.lock().enumeration_error = reason.map(str::to_string);
    }

    pub fn ids(&self) -> Vec<String> {
        self.state.lock().entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Id of the entry last set as current content
    pub fn current(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    /// Number of enumerations served so far
    pub fn enumerations(&self) -> usize {
        self.state.lock().enumerations
    }
}

#[async_trait]
impl ClipboardHistory for MemoryClipboard {
    fn is_history_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    async fn history_items(&self) -> Result<HistoryItems, HistoryError> {
        let mut state = self.state.lock();
        state.enumerations += 1;

        if let Some(reason) = &state.enumeration_error {
            return Err(HistoryError::Unavailable(reason.clone()));
        }
        if !state.enabled {
            return Ok(HistoryItems::failed(HistoryItemsStatus::ClipboardHistoryDisabled));
        }
        if state.status != HistoryItemsStatus::Success {
            return Ok(HistoryItems::failed(state.status));
        }

        let items = state
            .entries
            .iter()
            .map(|entry| entry.clone() as Arc<dyn ClipboardEntry>)
            .collect();
        Ok(HistoryItems::success(items))
    }

    fn subscribe(&self) -> UnboundedReceiver<ClipboardEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn set_as_current_content(&self, entry: &dyn ClipboardEntry) -> Result<(), HistoryError> {
        {
            let mut state = self.state.lock();
            if !state.entries.iter().any(|e| e.id == entry.id()) {
                return Err(HistoryError::EntryNotFound(entry.id().to_string()));
            }
            state.current = Some(entry.id().to_string());
        }
        self.emit(ClipboardEvent::ContentChanged);
        Ok(())
    }

    fn delete_from_history(&self, entry: &dyn ClipboardEntry) -> Result<bool, HistoryError> {
        let removed = {
            let mut state = self.state.lock();
            let before = state.entries.len();
            state.entries.retain(|e| e.id != entry.id());
            state.entries.len() != before
        };
        if removed {
            self.emit(ClipboardEvent::HistoryChanged);
        }
        Ok(removed)
    }

    fn clear_history(&self) -> Result<bool, HistoryError> {
        self.state.lock().entries.clear();
        self.emit(ClipboardEvent::HistoryChanged);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_available_formats_follow_content() {
        let entry = MemoryEntry::new("1")
            .with_text("x")
            .with_bitmap(vec![1])
            .with_raw_format("Locale");
        assert_eq!(entry.available_formats().sorted(), &["Bitmap", "Locale", "Text"]);
    }

    #[test]
    fn test_missing_and_failing_reads() {
        let entry = MemoryEntry::new("1").with_text("x").failing(formats::TEXT);
        assert!(block_on(entry.text()).is_err());
        assert!(matches!(block_on(entry.html()), Err(HistoryError::Format { .. })));
    }

    #[test]
    fn test_fixture_loading() {
        let clipboard = MemoryClipboard::from_json(
            r#"{
                "entries": [
                    {"id": "1", "timestamp": "2024-05-01T10:00:00Z", "text": "hello"},
                    {"id": "2", "bitmap": "AAEC", "rawFormats": ["DeviceIndependentBitmap"]},
                    {"id": "3", "storageItems": [{"name": "a.txt", "path": "C:\\a.txt", "size": 3}]}
                ]
            }"#,
        )
        .unwrap();
        assert!(clipboard.is_history_enabled());
        assert_eq!(clipboard.ids(), vec!["1", "2", "3"]);

        let items = block_on(clipboard.history_items()).unwrap();
        assert_eq!(items.status, HistoryItemsStatus::Success);
        assert_eq!(block_on(items.items[1].bitmap()).unwrap(), vec![0, 1, 2]);
        assert_eq!(block_on(items.items[2].storage_items()).unwrap()[0].size, 3);
    }

    #[test]
    fn test_disabled_history_reports_status() {
        let clipboard = MemoryClipboard::from_json(r#"{"historyEnabled": false}"#).unwrap();
        let items = block_on(clipboard.history_items()).unwrap();
        assert_eq!(items.status, HistoryItemsStatus::ClipboardHistoryDisabled);
        assert!(items.items.is_empty());
    }

    #[test]
    fn test_commands_raise_events() {
        let clipboard = MemoryClipboard::with_entries(vec![
            MemoryEntry::new("a").with_text("a"),
            MemoryEntry::new("b").with_text("b"),
        ]);
        let mut rx = clipboard.subscribe();

        let b = MemoryEntry::new("b");
        clipboard.set_as_current_content(&b).unwrap();
        assert_eq!(clipboard.current().as_deref(), Some("b"));
        assert_eq!(rx.try_recv().unwrap(), ClipboardEvent::ContentChanged);

        assert!(clipboard.delete_from_history(&b).unwrap());
        assert!(!clipboard.delete_from_history(&b).unwrap());
        assert_eq!(rx.try_recv().unwrap(), ClipboardEvent::HistoryChanged);
        assert!(rx.try_recv().is_err());

        assert!(clipboard.clear_history().unwrap());
        assert!(clipboard.ids().is_empty());
    }
}
