//! Typed view over the raw settings provider, plus an in-memory provider.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::favorites::FAVORITES_SEPARATOR;
use crate::interface::{HistoryError, SettingKey, SettingsProvider};

pub const DEFAULT_MAXIMUM_HISTORY_COUNT: usize = 25;
pub const MAXIMUM_HISTORY_COUNT_RANGE: RangeInclusive<usize> = 1..=25;
pub const DEFAULT_HIDE_PASSWORDS: bool = true;

/// Settings read at the start of every refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistorySettings {
    pub maximum_history_count: usize,
    pub hide_passwords: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            maximum_history_count: DEFAULT_MAXIMUM_HISTORY_COUNT,
            hide_passwords: DEFAULT_HIDE_PASSWORDS,
        }
    }
}

impl HistorySettings {
    /// Read settings from the provider. Missing values take their defaults,
    /// out-of-range counts are clamped into 1..=25.
    pub fn load(provider: &dyn SettingsProvider) -> Self {
        Self {
            maximum_history_count: parse_maximum_history_count(
                provider.get(SettingKey::MaximumHistoryCount).as_deref(),
            ),
            hide_passwords: parse_hide_passwords(provider.get(SettingKey::HidePasswords).as_deref()),
        }
    }
}

fn parse_maximum_history_count(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_MAXIMUM_HISTORY_COUNT;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) => {
            let min = *MAXIMUM_HISTORY_COUNT_RANGE.start() as i64;
            let max = *MAXIMUM_HISTORY_COUNT_RANGE.end() as i64;
            let clamped = value.clamp(min, max);
            if clamped != value {
                tracing::warn!(value, clamped, "MaximumHistoryCount out of range, clamping");
            }
            clamped as usize
        }
        Err(err) => {
            tracing::warn!(raw, error = %err, "Unparsable MaximumHistoryCount, using default");
            DEFAULT_MAXIMUM_HISTORY_COUNT
        }
    }
}

fn parse_hide_passwords(raw: Option<&str>) -> bool {
    match raw.map(|r| r.trim().to_ascii_lowercase()) {
        None => DEFAULT_HIDE_PASSWORDS,
        Some(value) => match value.as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => {
                tracing::warn!(raw = %value, "Unparsable HidePasswords, using default");
                DEFAULT_HIDE_PASSWORDS
            }
        },
    }
}

/// JSON document accepted by [`InMemorySettings::from_json`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsDocument {
    maximum_history_count: Option<i64>,
    hide_passwords: Option<bool>,
    #[serde(default)]
    favorite_items: Vec<String>,
}

/// Settings provider backed by a map. Change notifications are delivered to
/// every live subscriber when a value actually changes.
#[derive(Default)]
pub struct InMemorySettings {
    values: Mutex<HashMap<SettingKey, String>>,
    subscribers: Mutex<Vec<UnboundedSender<SettingKey>>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (SettingKey, String)>,
    {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Seed from a JSON document such as
    /// `{"maximumHistoryCount": 10, "hidePasswords": false, "favoriteItems": ["..."]}`
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        let doc: SettingsDocument =
            serde_json::from_str(json).map_err(|e| HistoryError::Settings(e.to_string()))?;

        let mut values = HashMap::new();
        if let Some(count) = doc.maximum_history_count {
            values.insert(SettingKey::MaximumHistoryCount, count.to_string());
        }
        if let Some(hide) = doc.hide_passwords {
            values.insert(SettingKey::HidePasswords, hide.to_string());
        }
        if !doc.favorite_items.is_empty() {
            let separator = FAVORITES_SEPARATOR.to_string();
            values.insert(SettingKey::FavoriteItems, doc.favorite_items.join(&separator));
        }
        Ok(Self::with_values(values))
    }

    fn notify(&self, key: SettingKey) {
        self.subscribers.lock().retain(|tx| tx.send(key).is_ok());
    }
}

impl SettingsProvider for InMemorySettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: SettingKey, value: String) -> Result<(), HistoryError> {
        let changed = {
            let mut values = self.values.lock();
            let previous = values.insert(key, value.clone());
            previous.as_deref() != Some(value.as_str())
        };
        if changed {
            self.notify(key);
        }
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<SettingKey> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }
}
