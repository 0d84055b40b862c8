//! Content hashing for favorite matching
//!
//! The hash is built from a canonical string of every available format (in
//! sorted order) with its best-effort content, followed by the copy time in
//! 100 ns ticks since 0001-01-01 UTC. Format names sort by byte order, so
//! the hash is stable across locales and time zones.

use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::formats;
use crate::interface::{ClipboardEntry, ContentHash, HistoryError};

const FIELD_SEPARATOR: char = '|';
const TICKS_PER_SECOND: i64 = 10_000_000;
/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Convert a timestamp to 100 ns ticks since 0001-01-01.
/// None when the instant is outside the representable tick range.
pub fn timestamp_ticks(timestamp: &DateTime<Utc>) -> Option<i64> {
    let ticks = timestamp
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(i64::from(timestamp.timestamp_subsec_nanos() / 100))?
        .checked_add(UNIX_EPOCH_TICKS)?;
    (ticks >= 0).then_some(ticks)
}

async fn extract_hashed_content(
    entry: &dyn ClipboardEntry,
    format: &str,
) -> Result<Option<String>, HistoryError> {
    let content = match format {
        formats::TEXT => entry.text().await?,
        formats::HTML => entry.html().await?,
        formats::RTF => entry.rtf().await?,
        formats::WEB_LINK => entry.web_link().await?,
        formats::APPLICATION_LINK => entry.application_link().await?,
        _ => return Ok(None),
    };
    Ok(Some(content))
}

/// Build the canonical string the hash is computed over.
/// None when the timestamp cannot be expressed in ticks.
pub async fn canonical_string(entry: &dyn ClipboardEntry) -> Option<String> {
    let mut canonical = String::new();

    for format in entry.available_formats().sorted() {
        canonical.push_str(format);
        canonical.push(FIELD_SEPARATOR);

        match extract_hashed_content(entry, format).await {
            Ok(Some(content)) => canonical.push_str(&content),
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(
                    entry_id = %entry.id(),
                    format = %format,
                    error = %err,
                    "Skipping unreadable format while hashing"
                );
            }
        }

        canonical.push(FIELD_SEPARATOR);
    }

    let ticks = timestamp_ticks(&entry.timestamp())?;
    canonical.push_str(&ticks.to_string());
    Some(canonical)
}

/// SHA-256 over the UTF-8 bytes, base64 encoded
pub fn hash_canonical(canonical: &str) -> Option<ContentHash> {
    if canonical.is_empty() {
        return None;
    }
    let digest = Sha256::digest(canonical.as_bytes());
    Some(ContentHash::new(
        base64::engine::general_purpose::STANDARD.encode(digest),
    ))
}

/// Derive the content hash of an entry. None means the entry has no identity
/// for this refresh and is treated as a non-favorite.
pub async fn content_hash(entry: &dyn ClipboardEntry) -> Option<ContentHash> {
    let Some(canonical) = canonical_string(entry).await else {
        tracing::warn!(
            entry_id = %entry.id(),
            timestamp = %entry.timestamp(),
            "Cannot derive content hash, timestamp out of tick range"
        );
        return None;
    };
    hash_canonical(&canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEntry;
    use chrono::TimeZone;
    use futures::executor::block_on;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_ticks_match_platform_epoch() {
        assert_eq!(timestamp_ticks(&at(0)), Some(UNIX_EPOCH_TICKS));
        let with_nanos = Utc.timestamp_opt(1, 250).unwrap();
        assert_eq!(timestamp_ticks(&with_nanos), Some(UNIX_EPOCH_TICKS + TICKS_PER_SECOND + 2));
    }

    #[test]
    fn test_canonical_string_sorts_by_byte_order() {
        let entry = MemoryEntry::new("1")
            .with_timestamp(at(0))
            .with_text("hi")
            .with_raw_format(formats::LEGACY_TEXT)
            .with_raw_format("Locale");
        let canonical = block_on(canonical_string(&entry)).unwrap();
        assert_eq!(canonical, format!("Locale||TEXT||Text|hi|{}", UNIX_EPOCH_TICKS));
    }

    #[test]
    fn test_canonical_string_sorted_formats() {
        let entry = MemoryEntry::new("1")
            .with_timestamp(at(0))
            .with_text("hello")
            .with_html("<b>hello</b>")
            .with_bitmap(vec![1, 2, 3]);
        let canonical = block_on(canonical_string(&entry)).unwrap();
        assert_eq!(
            canonical,
            format!("Bitmap||HTML Format|<b>hello</b>|Text|hello|{}", UNIX_EPOCH_TICKS)
        );
    }

    #[test]
    fn test_failed_format_contributes_empty_content() {
        let entry = MemoryEntry::new("1")
            .with_timestamp(at(0))
            .with_text("hello")
            .failing(formats::TEXT);
        let canonical = block_on(canonical_string(&entry)).unwrap();
        assert_eq!(canonical, format!("Text||{}", UNIX_EPOCH_TICKS));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let make = || {
            MemoryEntry::new("1")
                .with_timestamp(at(1_700_000_000))
                .with_text("same")
                .with_rtf("{\\rtf1 same}")
        };
        let first = block_on(content_hash(&make())).unwrap();
        let second = block_on(content_hash(&make())).unwrap();
        assert_eq!(first, second);
        // base64 of 32 bytes
        assert_eq!(first.as_str().len(), 44);
    }

    #[test]
    fn test_hash_ignores_entry_id() {
        let a = MemoryEntry::new("a").with_timestamp(at(5)).with_text("x");
        let b = MemoryEntry::new("b").with_timestamp(at(5)).with_text("x");
        assert_eq!(block_on(content_hash(&a)), block_on(content_hash(&b)));
    }

    #[test]
    fn test_timestamp_changes_hash() {
        let earlier = MemoryEntry::new("1").with_timestamp(at(100)).with_text("x");
        let later = MemoryEntry::new("1").with_timestamp(at(101)).with_text("x");
        assert_ne!(block_on(content_hash(&earlier)), block_on(content_hash(&later)));
    }

    #[test]
    fn test_content_changes_hash() {
        let a = MemoryEntry::new("1").with_timestamp(at(100)).with_text("x");
        let b = MemoryEntry::new("1").with_timestamp(at(100)).with_text("y");
        assert_ne!(block_on(content_hash(&a)), block_on(content_hash(&b)));
    }

    #[test]
    fn test_pre_epoch_timestamp_has_no_hash() {
        let ancient = Utc.with_ymd_and_hms(-5, 1, 1, 0, 0, 0).unwrap();
        let entry = MemoryEntry::new("1").with_timestamp(ancient).with_text("x");
        assert_eq!(block_on(content_hash(&entry)), None);
    }

    #[test]
    fn test_hash_canonical_empty() {
        assert_eq!(hash_canonical(""), None);
        assert!(hash_canonical("Text|x|0").is_some());
    }
}
