//! Clipboard format tags as reported by the platform clipboard-history facility.
//!
//! Tags are compared case-sensitively: `Text` (the standard Unicode text
//! format) and `TEXT` (the legacy generic text tag) are different formats.

pub const STORAGE_ITEMS: &str = "Shell IDList Array";
pub const BITMAP: &str = "Bitmap";
pub const DEVICE_INDEPENDENT_BITMAP: &str = "DeviceIndependentBitmap";
pub const DEVICE_INDEPENDENT_BITMAP_V5: &str = "DeviceIndependentBitmapV5";
pub const TAGGED_IMAGE_FILE_FORMAT: &str = "TaggedImageFileFormat";
pub const ENHANCED_METAFILE: &str = "EnhancedMetafile";
pub const RTF: &str = "Rich Text Format";
pub const APPLICATION_LINK: &str = "ApplicationLink";
pub const USER_ACTIVITY: &str = "UserActivityJsonArray";
pub const WEB_LINK: &str = "UniformResourceLocatorW";
pub const URI: &str = "UniformResourceLocator";
pub const TEXT: &str = "Text";
pub const HTML: &str = "HTML Format";
pub const ANSI_TEXT: &str = "AnsiText";
pub const OEM_TEXT: &str = "OEMText";
pub const LEGACY_TEXT: &str = "TEXT";

/// Bitmap-like formats that are not the standard bitmap tag
pub const LEGACY_IMAGE_FORMATS: &[&str] = &[
    DEVICE_INDEPENDENT_BITMAP,
    DEVICE_INDEPENDENT_BITMAP_V5,
    TAGGED_IMAGE_FILE_FORMAT,
    ENHANCED_METAFILE,
];

pub const LEGACY_TEXT_FORMATS: &[&str] = &[ANSI_TEXT, OEM_TEXT, LEGACY_TEXT];

/// Formats whose content participates in the content hash
pub const HASHED_FORMATS: &[&str] = &[TEXT, HTML, RTF, WEB_LINK, APPLICATION_LINK];

/// Set of format tags declared by one entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSet {
    tags: Vec<String>,
}

impl FormatSet {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        tags.sort();
        tags.dedup();
        Self { tags }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|t| t.as_str().cmp(tag)).is_ok()
    }

    pub fn contains_any(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.contains(t))
    }

    /// Tags in ascending byte order
    pub fn sorted(&self) -> &[String] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn joined(&self, separator: &str) -> String {
        self.tags.join(separator)
    }
}
