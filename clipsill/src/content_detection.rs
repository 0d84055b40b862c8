//! Content type detection for clipboard history entries
//!
//! Classification walks an ordered rule list over the entry's declared format
//! tags; only the plain-text and HTML rules read any content.

use crate::formats::{self, FormatSet};
use crate::interface::{ClipboardEntry, HistoryError, SemanticType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Optional `#` followed by exactly 3, 6 or 8 hex digits
static HEX_COLOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([A-Fa-f0-9]{8}|[A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap()
});

/// Schemes accepted when sniffing text for a link. Anything else
/// (javascript:, file:, data:, custom-app://) stays plain text.
const URI_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto"];

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?\\|`~";

/// Check if a string is a hex color (`#abc`, `AABBCC`, `#aabbccdd`)
pub fn is_hex_color(text: &str) -> bool {
    HEX_COLOR_REGEX.is_match(text)
}

/// Check if a string is an absolute URI with an allowed scheme
pub fn is_allowed_uri(text: &str) -> bool {
    if text.is_empty() || text.contains(char::is_whitespace) {
        return false;
    }
    match url::Url::parse(text) {
        Ok(parsed) => URI_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

/// Heuristic used to redact copied passwords: 8 to 128 characters drawn only
/// from upper, lower, digit and special classes, with at least one of each.
pub fn looks_like_password(text: &str) -> bool {
    let len = text.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return false;
    }

    let (mut upper, mut lower, mut digit, mut special) = (false, false, false, false);
    for c in text.chars() {
        if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else if PASSWORD_SPECIAL_CHARS.contains(c) {
            special = true;
        } else {
            return false;
        }
    }
    upper && lower && digit && special
}

/// Parse a hex color string to RGBA u32 (0xRRGGBBAA format).
/// The leading `#` is optional. Returns None if the string is not a hex color.
pub fn parse_color_to_rgba(text: &str) -> Option<u32> {
    if !is_hex_color(text) {
        return None;
    }
    let normalized = if text.starts_with('#') {
        text.to_string()
    } else {
        format!("#{}", text)
    };
    let color = csscolorparser::parse(&normalized).ok()?;
    let [r, g, b, a] = color.to_rgba8();
    Some(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
}

/// Classify text read from the plain-text format
pub fn classify_text(text: &str) -> SemanticType {
    if is_hex_color(text) {
        SemanticType::Color
    } else if is_allowed_uri(text) {
        SemanticType::Uri
    } else {
        SemanticType::Text
    }
}

/// Classification that needs no content reads. Returns None when the
/// decision depends on the entry's text.
fn classify_by_formats(formats: &FormatSet) -> Option<SemanticType> {
    if formats.contains(formats::STORAGE_ITEMS) {
        Some(SemanticType::File)
    } else if formats.contains(formats::BITMAP) || formats.contains_any(formats::LEGACY_IMAGE_FORMATS) {
        Some(SemanticType::Image)
    } else if formats.contains(formats::RTF) {
        Some(SemanticType::Rtf)
    } else if formats.contains(formats::APPLICATION_LINK) {
        Some(SemanticType::ApplicationLink)
    } else if formats.contains(formats::USER_ACTIVITY) {
        Some(SemanticType::UserActivity)
    } else if formats.contains(formats::WEB_LINK) || formats.contains(formats::URI) {
        Some(SemanticType::Uri)
    } else {
        None
    }
}

/// Detect the semantic type of a clipboard entry.
///
/// Errors only when reading the entry's text fails; callers degrade the
/// entry to [`SemanticType::Unknown`].
pub async fn classify(entry: &dyn ClipboardEntry) -> Result<SemanticType, HistoryError> {
    let formats = entry.available_formats();

    if let Some(kind) = classify_by_formats(&formats) {
        return Ok(kind);
    }

    if formats.contains(formats::HTML) {
        if formats.contains(formats::TEXT) && is_allowed_uri(&entry.text().await?) {
            return Ok(SemanticType::Uri);
        }
        return Ok(SemanticType::Html);
    }

    if formats.contains(formats::TEXT) {
        let text = entry.text().await?;
        return Ok(classify_text(&text));
    }

    if formats.contains_any(formats::LEGACY_TEXT_FORMATS) {
        return Ok(SemanticType::Text);
    }

    if !formats.is_empty() {
        tracing::warn!(
            entry_id = %entry.id(),
            formats = %formats.joined(", "),
            "Unknown clipboard data formats detected"
        );
    }
    Ok(SemanticType::Unknown)
}
