//! View models for the published clipboard history list
//!
//! One builder per [`SemanticType`] turns a raw entry into a [`ViewEntry`]:
//! a bounded summary line, the full preview payload, and the identity data
//! needed by the entry's commands.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::content_detection::{looks_like_password, parse_color_to_rgba};
use crate::formats;
use crate::interface::{ClipboardEntry, ContentHash, HistoryError, SemanticType, StorageItem};
use crate::reconcile::Keyed;

/// Summary length for text-like content
pub const SUMMARY_MAX_CHARS: usize = 256;
pub const LINE_BREAK_GLYPH: char = '⏎';
pub const REDACTED_TEXT: &str = "••••••••";
pub const UNSUPPORTED_SUMMARY: &str = "Unsupported format";
pub const APPLICATION_LINK_FALLBACK: &str = "Application Link";
pub const USER_ACTIVITY_FALLBACK: &str = "User Activity Data";

const USER_ACTIVITY_PREVIEW_CHARS: usize = 100;
const USER_ACTIVITY_DISPLAY_CHARS: usize = 50;
const FILE_LIST_LIMIT: usize = 10;
const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

static ANCHOR_TEXT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a[^>]*>(.*?)</a>").unwrap());
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// PREVIEW TEXT
// ─────────────────────────────────────────────────────────────────────────────

/// Replace every line break (`\r\n`, `\n\r`, `\r`, `\n`) with `replacement`
pub fn replace_line_breaks(text: &str, replacement: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push(replacement);
            }
            '\n' => {
                chars.next_if_eq(&'\r');
                out.push(replacement);
            }
            other => out.push(other),
        }
    }
    out
}

/// Summary line: first 256 chars, trimmed, line breaks shown as `⏎`
pub fn summarize(text: &str) -> String {
    let head: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    replace_line_breaks(head.trim(), LINE_BREAK_GLYPH)
}

/// Visible text of a clipboard HTML payload: the marked fragment when the
/// payload carries fragment markers, with tags removed.
pub fn html_visible_text(html: &str) -> String {
    const START: &str = "<!--StartFragment-->";
    const END: &str = "<!--EndFragment-->";

    let fragment = match (html.find(START), html.rfind(END)) {
        (Some(start), Some(end)) if start + START.len() <= end => &html[start + START.len()..end],
        _ => html,
    };
    TAG_REGEX.replace_all(fragment, "").into_owned()
}

/// Text inside the first `<a>` element
pub fn anchor_text(html: &str) -> Option<String> {
    ANCHOR_TEXT_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Favicon service URL for a link
pub fn favicon_url(link: &str, size: u32) -> Option<String> {
    url::Url::parse_with_params(FAVICON_SERVICE, &[("domain", link), ("sz", &size.to_string())])
        .ok()
        .map(String::from)
}

/// Human-readable byte size (`0 B`, `1.5 KB`, `2 MB`)
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Whether dark text reads better than light text on this background
pub fn prefers_dark_foreground(rgba: u32) -> bool {
    let r = ((rgba >> 24) & 0xFF) as f64;
    let g = ((rgba >> 16) & 0xFF) as f64;
    let b = ((rgba >> 8) & 0xFF) as f64;
    let brightness = (r * r * 0.241 + g * g * 0.691 + b * b * 0.068).sqrt();
    brightness as u32 > 130
}

fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn user_activity_display(json: &str) -> String {
    if json.trim().is_empty() {
        return USER_ACTIVITY_FALLBACK.to_string();
    }
    let head: String = json.chars().take(USER_ACTIVITY_PREVIEW_CHARS).collect();
    let display = replace_line_breaks(head.trim(), ' ').replace("  ", " ");
    let display = display.trim();
    if display.chars().count() > USER_ACTIVITY_DISPLAY_CHARS {
        let cut: String = display.chars().take(USER_ACTIVITY_DISPLAY_CHARS).collect();
        format!("{}...", cut)
    } else {
        display.to_string()
    }
}

fn file_texts(files: &[StorageItem]) -> (String, String, String) {
    if let [file] = files {
        let count_text = if file.is_folder {
            "1 folder".to_string()
        } else {
            format!("{} ({})", file.name, format_file_size(file.size))
        };
        return (file.name.clone(), count_text, file.name.clone());
    }

    let folder_count = files.iter().filter(|f| f.is_folder).count();
    let file_count = files.len() - folder_count;
    let count_text = match (file_count, folder_count) {
        (0, folders) => format!("{} folders", folders),
        (files, 0) => format!("{} files", files),
        (files, folders) => format!("{} files, {} folders", files, folders),
    };

    let mut list_text = files
        .iter()
        .take(FILE_LIST_LIMIT)
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if files.len() > FILE_LIST_LIMIT {
        list_text.push_str(&format!("\n... and {} more", files.len() - FILE_LIST_LIMIT));
    }

    (format!("{} items", files.len()), count_text, list_text)
}

// ─────────────────────────────────────────────────────────────────────────────
// VIEW ENTRY
// ─────────────────────────────────────────────────────────────────────────────

/// Full preview payload, one variant per semantic type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewContent {
    Unknown {
        formats: Vec<String>,
    },
    Text {
        text: String,
        redacted: bool,
    },
    Html {
        html: String,
    },
    Rtf {
        text: String,
    },
    Uri {
        url: String,
        page_title: Option<String>,
        favicon_url: Option<String>,
        large_favicon_url: Option<String>,
    },
    ApplicationLink {
        link: String,
        display_text: String,
    },
    Color {
        value: String,
        rgba: Option<u32>,
        dark_foreground: bool,
    },
    Image {
        #[serde(skip)]
        data: Vec<u8>,
        byte_len: usize,
        dimensions: Option<(u32, u32)>,
    },
    File {
        files: Vec<StorageItem>,
        count_text: String,
        list_text: String,
    },
    UserActivity {
        json: String,
        display_text: String,
    },
}

impl ViewContent {
    pub fn kind(&self) -> SemanticType {
        match self {
            ViewContent::Unknown { .. } => SemanticType::Unknown,
            ViewContent::Text { .. } => SemanticType::Text,
            ViewContent::Html { .. } => SemanticType::Html,
            ViewContent::Rtf { .. } => SemanticType::Rtf,
            ViewContent::Uri { .. } => SemanticType::Uri,
            ViewContent::ApplicationLink { .. } => SemanticType::ApplicationLink,
            ViewContent::Color { .. } => SemanticType::Color,
            ViewContent::Image { .. } => SemanticType::Image,
            ViewContent::File { .. } => SemanticType::File,
            ViewContent::UserActivity { .. } => SemanticType::UserActivity,
        }
    }
}

/// Identity data computed once per refresh, before the entry is built
#[derive(Debug, Clone, Default)]
pub struct EntryIdentity {
    pub content_hash: Option<ContentHash>,
    pub is_favorite: bool,
}

/// One row of the published history list.
///
/// Retained across refreshes as the same `Arc` while its id stays in the
/// history; only the favorite flag changes in place.
pub struct ViewEntry {
    id: String,
    content: ViewContent,
    summary: String,
    content_hash: Option<ContentHash>,
    favorite: AtomicBool,
    source: Arc<dyn ClipboardEntry>,
}

impl ViewEntry {
    pub fn new(
        source: Arc<dyn ClipboardEntry>,
        content: ViewContent,
        summary: String,
        identity: EntryIdentity,
    ) -> Self {
        Self {
            id: source.id().to_string(),
            content,
            summary,
            content_hash: identity.content_hash,
            favorite: AtomicBool::new(identity.is_favorite),
            source,
        }
    }

    /// Generic, content-free view for entries that could not be classified or built
    pub fn unknown(source: Arc<dyn ClipboardEntry>, identity: EntryIdentity) -> Self {
        let formats = source.available_formats().sorted().to_vec();
        Self::new(
            source,
            ViewContent::Unknown { formats },
            UNSUPPORTED_SUMMARY.to_string(),
            identity,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> SemanticType {
        self.content.kind()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn content(&self) -> &ViewContent {
        &self.content
    }

    pub fn content_hash(&self) -> Option<&ContentHash> {
        self.content_hash.as_ref()
    }

    pub fn is_favorite(&self) -> bool {
        self.favorite.load(Ordering::Acquire)
    }

    pub fn set_favorite(&self, favorite: bool) {
        self.favorite.store(favorite, Ordering::Release);
    }

    /// The raw entry this row was built from
    pub fn source(&self) -> &dyn ClipboardEntry {
        self.source.as_ref()
    }

    pub fn snapshot(&self) -> ViewEntrySnapshot<'_> {
        ViewEntrySnapshot {
            id: &self.id,
            kind: self.kind(),
            summary: &self.summary,
            content: &self.content,
            content_hash: self.content_hash.as_ref(),
            is_favorite: self.is_favorite(),
        }
    }
}

impl fmt::Debug for ViewEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewEntry")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("summary", &self.summary)
            .field("content_hash", &self.content_hash)
            .field("is_favorite", &self.is_favorite())
            .finish()
    }
}

impl Keyed for Arc<ViewEntry> {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Serializable view of a [`ViewEntry`]
#[derive(Debug, Serialize)]
pub struct ViewEntrySnapshot<'a> {
    pub id: &'a str,
    pub kind: SemanticType,
    pub summary: &'a str,
    pub content: &'a ViewContent,
    pub content_hash: Option<&'a ContentHash>,
    pub is_favorite: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// BUILDERS
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub hide_passwords: bool,
}

type Built = (ViewContent, String);

async fn build_text(entry: &dyn ClipboardEntry, options: BuildOptions) -> Result<Built, HistoryError> {
    let text = entry.text().await?;
    if options.hide_passwords && looks_like_password(text.trim()) {
        let content = ViewContent::Text {
            text: REDACTED_TEXT.to_string(),
            redacted: true,
        };
        return Ok((content, REDACTED_TEXT.to_string()));
    }
    let summary = summarize(&text);
    Ok((ViewContent::Text { text, redacted: false }, summary))
}

async fn build_html(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    let html = entry.html().await?;
    let summary = summarize(&html_visible_text(&html));
    Ok((ViewContent::Html { html }, summary))
}

async fn build_rtf(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    // plain text reads better than RTF markup when both exist
    let text = if entry.available_formats().contains(formats::TEXT) {
        entry.text().await?
    } else {
        entry.rtf().await?
    };
    let summary = summarize(&text);
    Ok((ViewContent::Rtf { text }, summary))
}

async fn build_uri(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    let available = entry.available_formats();
    let url = if available.contains(formats::TEXT) {
        entry.text().await?
    } else {
        entry.web_link().await?
    };
    let url = url.trim().to_string();

    let page_title = if available.contains(formats::HTML) {
        match entry.html().await {
            Ok(html) => anchor_text(&html),
            Err(err) => {
                tracing::debug!(entry_id = %entry.id(), error = %err, "No page title for link");
                None
            }
        }
    } else {
        None
    };

    let summary = summarize(&url);
    let content = ViewContent::Uri {
        favicon_url: favicon_url(&url, 16),
        large_favicon_url: favicon_url(&url, 24),
        url,
        page_title,
    };
    Ok((content, summary))
}

async fn build_application_link(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    let link = entry.application_link().await?;

    let mut display_text = link.clone();
    if entry.available_formats().contains(formats::TEXT) {
        if let Ok(text) = entry.text().await {
            if !text.is_empty() && text != link {
                display_text = text;
            }
        }
    }
    if display_text.is_empty() {
        display_text = APPLICATION_LINK_FALLBACK.to_string();
    }

    let summary = summarize(&display_text);
    Ok((ViewContent::ApplicationLink { link, display_text }, summary))
}

async fn build_color(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    let value = entry.text().await?;
    let rgba = parse_color_to_rgba(&value);
    let dark_foreground = rgba.map(prefers_dark_foreground).unwrap_or(true);
    let summary = value.clone();
    Ok((ViewContent::Color { value, rgba, dark_foreground }, summary))
}

async fn build_image(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    // Legacy-only images (DIB, TIFF, EMF) often have no readable bitmap
    let data = match entry.bitmap().await {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(
                entry_id = %entry.id(),
                format = formats::BITMAP,
                error = %err,
                "Failed to read clipboard bitmap"
            );
            Vec::new()
        }
    };
    let dimensions = image_dimensions(&data);
    let summary = match dimensions {
        Some((width, height)) => format!("Image ({} × {})", width, height),
        None => "Image".to_string(),
    };
    let content = ViewContent::Image {
        byte_len: data.len(),
        data,
        dimensions,
    };
    Ok((content, summary))
}

async fn build_file(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    let files = entry.storage_items().await?;
    let (summary, count_text, list_text) = file_texts(&files);
    Ok((ViewContent::File { files, count_text, list_text }, summary))
}

async fn build_user_activity(entry: &dyn ClipboardEntry) -> Result<Built, HistoryError> {
    let json = match entry.user_activity().await {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(
                entry_id = %entry.id(),
                format = formats::USER_ACTIVITY,
                error = %err,
                "Failed to read user activity"
            );
            String::new()
        }
    };
    let display_text = user_activity_display(&json);
    let summary = display_text.clone();
    Ok((ViewContent::UserActivity { json, display_text }, summary))
}

/// Build the view entry for an already classified raw entry
pub async fn build_view_entry(
    entry: Arc<dyn ClipboardEntry>,
    kind: SemanticType,
    identity: EntryIdentity,
    options: BuildOptions,
) -> Result<ViewEntry, HistoryError> {
    let raw = entry.as_ref();
    let built = match kind {
        SemanticType::Text => build_text(raw, options).await?,
        SemanticType::Html => build_html(raw).await?,
        SemanticType::Rtf => build_rtf(raw).await?,
        SemanticType::Uri => build_uri(raw).await?,
        SemanticType::ApplicationLink => build_application_link(raw).await?,
        SemanticType::Color => build_color(raw).await?,
        SemanticType::Image => build_image(raw).await?,
        SemanticType::File => build_file(raw).await?,
        SemanticType::UserActivity => build_user_activity(raw).await?,
        SemanticType::Unknown => return Ok(ViewEntry::unknown(entry, identity)),
    };
    let (content, summary) = built;
    Ok(ViewEntry::new(entry, content, summary, identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEntry;
    use futures::executor::block_on;

    fn build(entry: MemoryEntry, kind: SemanticType, options: BuildOptions) -> ViewEntry {
        block_on(build_view_entry(Arc::new(entry), kind, EntryIdentity::default(), options)).unwrap()
    }

    #[test]
    fn test_line_break_normalization() {
        assert_eq!(replace_line_breaks("a\r\nb\n\rc\rd\ne", '⏎'), "a⏎b⏎c⏎d⏎e");
        assert_eq!(replace_line_breaks("a\r\n\rb", '⏎'), "a⏎⏎b");
        assert_eq!(replace_line_breaks("a\n\nb", '⏎'), "a⏎⏎b");
    }

    #[test]
    fn test_summary_truncated_then_trimmed() {
        let long = format!("  {}", "x".repeat(400));
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 254);

        assert_eq!(summarize("  hello\nworld  "), "hello⏎world");
    }

    #[test]
    fn test_summary_counts_chars_not_bytes() {
        let text = "é".repeat(300);
        assert_eq!(summarize(&text).chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn test_text_entry() {
        let view = build(MemoryEntry::new("1").with_text("line one\nline two"), SemanticType::Text, BuildOptions::default());
        assert_eq!(view.kind(), SemanticType::Text);
        assert_eq!(view.summary(), "line one⏎line two");
        assert_eq!(
            view.content(),
            &ViewContent::Text { text: "line one\nline two".into(), redacted: false }
        );
    }

    #[test]
    fn test_password_redacted_when_hidden() {
        let options = BuildOptions { hide_passwords: true };
        let view = build(MemoryEntry::new("1").with_text("Hunter2!pass"), SemanticType::Text, options);
        assert_eq!(view.summary(), REDACTED_TEXT);
        assert!(matches!(view.content(), ViewContent::Text { redacted: true, text } if text == REDACTED_TEXT));

        let view = build(MemoryEntry::new("2").with_text("Hunter2!pass"), SemanticType::Text, BuildOptions::default());
        assert_eq!(view.summary(), "Hunter2!pass");
    }

    #[test]
    fn test_plain_sentence_not_redacted() {
        let options = BuildOptions { hide_passwords: true };
        let view = build(MemoryEntry::new("1").with_text("Meet me at 5!"), SemanticType::Text, options);
        assert_eq!(view.summary(), "Meet me at 5!");
    }

    #[test]
    fn test_html_summary_uses_fragment_text() {
        let html = "Version:0.9\r\nStartHTML:0\r\n<html><body><!--StartFragment--><b>Bold</b> move<!--EndFragment--></body></html>";
        let view = build(MemoryEntry::new("1").with_html(html), SemanticType::Html, BuildOptions::default());
        assert_eq!(view.summary(), "Bold move");
        assert_eq!(view.content(), &ViewContent::Html { html: html.to_string() });
    }

    #[test]
    fn test_rtf_prefers_plain_text() {
        let view = build(
            MemoryEntry::new("1").with_rtf("{\\rtf1 Hello}").with_text("Hello"),
            SemanticType::Rtf,
            BuildOptions::default(),
        );
        assert_eq!(view.summary(), "Hello");

        let view = build(MemoryEntry::new("2").with_rtf("{\\rtf1 Hello}"), SemanticType::Rtf, BuildOptions::default());
        assert_eq!(view.summary(), "{\\rtf1 Hello}");
    }

    #[test]
    fn test_uri_entry_with_page_title() {
        let entry = MemoryEntry::new("1")
            .with_text("https://example.com")
            .with_html("<html><body><a href=\"https://example.com\">Example Domain</a></body></html>");
        let view = build(entry, SemanticType::Uri, BuildOptions::default());
        match view.content() {
            ViewContent::Uri { url, page_title, favicon_url, .. } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(page_title.as_deref(), Some("Example Domain"));
                let favicon = favicon_url.as_deref().unwrap();
                assert!(favicon.starts_with("https://www.google.com/s2/favicons?domain=https"));
                assert!(favicon.ends_with("sz=16"));
            }
            other => panic!("Expected Uri content, got {:?}", other),
        }
    }

    #[test]
    fn test_uri_from_web_link_format() {
        let view = build(MemoryEntry::new("1").with_web_link("https://rust-lang.org"), SemanticType::Uri, BuildOptions::default());
        assert_eq!(view.summary(), "https://rust-lang.org");
    }

    #[test]
    fn test_application_link_display_text() {
        let entry = MemoryEntry::new("1")
            .with_application_link("ms-settings:display")
            .with_text("Display settings");
        let view = build(entry, SemanticType::ApplicationLink, BuildOptions::default());
        assert_eq!(view.summary(), "Display settings");

        let view = build(MemoryEntry::new("2").with_application_link(""), SemanticType::ApplicationLink, BuildOptions::default());
        assert_eq!(view.summary(), APPLICATION_LINK_FALLBACK);
    }

    #[test]
    fn test_color_entry() {
        let view = build(MemoryEntry::new("1").with_text("#FFFFFF"), SemanticType::Color, BuildOptions::default());
        assert_eq!(
            view.content(),
            &ViewContent::Color { value: "#FFFFFF".into(), rgba: Some(0xFFFFFFFF), dark_foreground: true }
        );

        let view = build(MemoryEntry::new("2").with_text("000"), SemanticType::Color, BuildOptions::default());
        assert!(matches!(view.content(), ViewContent::Color { dark_foreground: false, .. }));
    }

    #[test]
    fn test_image_entry_dimensions() {
        let mut png = Vec::new();
        image::DynamicImage::new_rgba8(3, 2)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let view = build(MemoryEntry::new("1").with_bitmap(png.clone()), SemanticType::Image, BuildOptions::default());
        assert_eq!(view.summary(), "Image (3 × 2)");
        assert!(matches!(view.content(), ViewContent::Image { dimensions: Some((3, 2)), byte_len, .. } if *byte_len == png.len()));
    }

    #[test]
    fn test_image_entry_undecodable() {
        let view = build(MemoryEntry::new("1").with_bitmap(vec![0, 1, 2]), SemanticType::Image, BuildOptions::default());
        assert_eq!(view.summary(), "Image");
    }

    #[test]
    fn test_image_entry_without_bitmap() {
        let entry = MemoryEntry::new("1").with_raw_format(formats::DEVICE_INDEPENDENT_BITMAP);
        let view = build(entry, SemanticType::Image, BuildOptions::default());
        assert_eq!(view.summary(), "Image");
        assert_eq!(
            view.content(),
            &ViewContent::Image { data: vec![], byte_len: 0, dimensions: None }
        );
    }

    #[test]
    fn test_file_texts() {
        let file = |name: &str, size: u64, is_folder: bool| StorageItem {
            name: name.into(),
            path: format!("C:\\{}", name),
            size,
            is_folder,
        };

        let (summary, count, list) = file_texts(&[file("a.txt", 1536, false)]);
        assert_eq!((summary.as_str(), count.as_str(), list.as_str()), ("a.txt", "a.txt (1.5 KB)", "a.txt"));

        let (_, count, _) = file_texts(&[file("docs", 0, true)]);
        assert_eq!(count, "1 folder");

        let (summary, count, _) = file_texts(&[file("a", 1, false), file("b", 1, true)]);
        assert_eq!(summary, "2 items");
        assert_eq!(count, "1 files, 1 folders");

        let many: Vec<_> = (0..12).map(|i| file(&format!("f{}", i), 1, false)).collect();
        let (_, count, list) = file_texts(&many);
        assert_eq!(count, "12 files");
        assert_eq!(list.lines().count(), 11);
        assert!(list.ends_with("... and 2 more"));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn test_user_activity_display() {
        assert_eq!(user_activity_display(""), USER_ACTIVITY_FALLBACK);
        assert_eq!(user_activity_display("[{\"a\":\n1}]"), "[{\"a\": 1}]");
        let long = format!("[{}]", "x".repeat(80));
        let display = user_activity_display(&long);
        assert_eq!(display.chars().count(), 53);
        assert!(display.ends_with("..."));
    }

    #[test]
    fn test_user_activity_read_failure_uses_fallback() {
        let entry = MemoryEntry::new("1").with_user_activity("[]").failing(formats::USER_ACTIVITY);
        let view = build(entry, SemanticType::UserActivity, BuildOptions::default());
        assert_eq!(view.summary(), USER_ACTIVITY_FALLBACK);
        assert!(matches!(view.content(), ViewContent::UserActivity { json, .. } if json.is_empty()));
    }

    #[test]
    fn test_unknown_view_lists_formats() {
        let view = build(MemoryEntry::new("1").with_raw_format("Locale"), SemanticType::Unknown, BuildOptions::default());
        assert_eq!(view.summary(), UNSUPPORTED_SUMMARY);
        assert_eq!(view.content(), &ViewContent::Unknown { formats: vec!["Locale".into()] });
    }

    #[test]
    fn test_builder_failure_is_an_error() {
        let entry = MemoryEntry::new("1").with_text("x").failing(formats::TEXT);
        let result = block_on(build_view_entry(
            Arc::new(entry),
            SemanticType::Text,
            EntryIdentity::default(),
            BuildOptions::default(),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_favorite_flag_is_mutable_in_place() {
        let view = build(MemoryEntry::new("1").with_text("x"), SemanticType::Text, BuildOptions::default());
        assert!(!view.is_favorite());
        view.set_favorite(true);
        assert!(view.is_favorite());
        assert!(view.snapshot().is_favorite);
    }
}
