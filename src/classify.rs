//! Resource classification.
//!
//! Pure mapping from `(url, content_type)` to a semantic category.
//! Precedence is fixed: html > css > js > media > font > other, with
//! favicons special-cased to media regardless of their served type.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// ResourceType
// ============================================================================

/// Semantic category of a fetched resource.
///
/// Ordered by classification precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// HTML documents.
    Html,
    /// Stylesheets.
    Css,
    /// Scripts.
    Js,
    /// Images, video, audio.
    Media,
    /// Web fonts.
    Font,
    /// Everything else.
    Other,
}

impl ResourceType {
    /// All categories, in precedence order.
    pub const ALL: [Self; 6] = [
        Self::Html,
        Self::Css,
        Self::Js,
        Self::Media,
        Self::Font,
        Self::Other,
    ];

    /// Returns the category's canonical name.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Media => "media",
            Self::Font => "font",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Extension Tables
// ============================================================================

const MEDIA_EXTENSIONS: [&str; 16] = [
    "png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp", "mp4", "webm", "ogg", "mp3",
    "wav", "m4a", "mov",
];

const FONT_EXTENSIONS: [&str; 5] = ["woff", "woff2", "ttf", "otf", "eot"];

// ============================================================================
// classify
// ============================================================================

/// Classifies a resource by URL and content type.
///
/// Pure: identical inputs always yield the identical category. The
/// content type wins where it is specific; the URL extension covers
/// servers that mislabel or omit it.
#[must_use]
pub fn classify(url: &str, content_type: &str) -> ResourceType {
    let mime = normalized_mime(content_type);
    let path = url_path(url);
    let ext = path_extension(&path);

    // Favicons are routinely served as image/x-icon, text/plain, or
    // nothing at all; they count as media either way.
    if path
        .rsplit('/')
        .next()
        .is_some_and(|name| name.starts_with("favicon"))
    {
        return ResourceType::Media;
    }

    if mime.contains("html") || matches!(ext.as_str(), "html" | "htm") {
        return ResourceType::Html;
    }

    if mime.contains("css") || ext == "css" {
        return ResourceType::Css;
    }

    if mime.contains("javascript") || mime.contains("ecmascript") || matches!(ext.as_str(), "js" | "mjs" | "cjs") {
        return ResourceType::Js;
    }

    if mime.starts_with("image/")
        || mime.starts_with("video/")
        || mime.starts_with("audio/")
        || MEDIA_EXTENSIONS.contains(&ext.as_str())
    {
        return ResourceType::Media;
    }

    if mime.contains("font") || FONT_EXTENSIONS.contains(&ext.as_str()) {
        return ResourceType::Font;
    }

    ResourceType::Other
}

/// Lowercased MIME type with parameters stripped.
fn normalized_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// URL path component, lowercased; falls back to the raw string for
/// unparseable URLs so extension matching still has a chance.
fn url_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase())
}

/// File extension of the path's last segment, if any.
fn path_extension(path: &str) -> String {
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_favicon_is_media() {
        assert_eq!(
            classify("https://x.com/favicon.ico", "image/x-icon"),
            ResourceType::Media
        );
        // Even when served as html-ish junk
        assert_eq!(
            classify("https://x.com/favicon.ico", "text/html"),
            ResourceType::Media
        );
    }

    #[test]
    fn test_js_by_content_type() {
        assert_eq!(
            classify("https://x.com/app.js", "application/javascript"),
            ResourceType::Js
        );
        assert_eq!(
            classify("https://x.com/legacy", "text/ecmascript"),
            ResourceType::Js
        );
    }

    #[test]
    fn test_html_beats_js_extension() {
        // html takes precedence over everything the content type hints at
        assert_eq!(
            classify("https://x.com/page.js", "text/html"),
            ResourceType::Html
        );
    }

    #[test]
    fn test_css_by_extension_without_type() {
        assert_eq!(classify("https://x.com/style.css", ""), ResourceType::Css);
    }

    #[test]
    fn test_media_by_mime_prefix() {
        assert_eq!(
            classify("https://x.com/track", "audio/mpeg"),
            ResourceType::Media
        );
        assert_eq!(
            classify("https://x.com/clip", "video/mp4"),
            ResourceType::Media
        );
    }

    #[test]
    fn test_font_by_extension() {
        assert_eq!(
            classify("https://x.com/fonts/inter.woff2", "application/octet-stream"),
            ResourceType::Font
        );
    }

    #[test]
    fn test_mime_parameters_stripped() {
        assert_eq!(
            classify("https://x.com/", "text/html; charset=utf-8"),
            ResourceType::Html
        );
    }

    #[test]
    fn test_query_string_ignored() {
        assert_eq!(
            classify("https://x.com/bundle.js?v=123", "application/octet-stream"),
            ResourceType::Js
        );
    }

    #[test]
    fn test_unknown_is_other() {
        assert_eq!(
            classify("https://x.com/api/data", "application/json"),
            ResourceType::Other
        );
    }

    #[test]
    fn test_unparseable_url_falls_back() {
        assert_eq!(classify("not a url.css", ""), ResourceType::Css);
    }

    proptest! {
        // Purity: same inputs, same output, across repeated calls
        #[test]
        fn prop_classify_is_pure(url in ".{0,64}", mime in "[a-z/;= -]{0,32}") {
            let a = classify(&url, &mime);
            let b = classify(&url, &mime);
            prop_assert_eq!(a, b);
        }

        // Totality: never panics, always lands in a known category
        #[test]
        fn prop_classify_total(url in ".{0,128}", mime in ".{0,64}") {
            let t = classify(&url, &mime);
            prop_assert!(ResourceType::ALL.contains(&t));
        }
    }
}
