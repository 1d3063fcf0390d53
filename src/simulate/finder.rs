//! Interactive element discovery.
//!
//! Discovery runs entirely in the page context and returns plain data.
//! Live DOM references cannot cross the automation boundary, so each
//! element is described by a selector that re-resolves it on use, and
//! descriptors are recomputed per call; nothing survives a navigation.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::page::Page;

// ============================================================================
// Discovery Script
// ============================================================================

/// Page-context helper combining semantic-heuristic and generic
/// interactive-element discovery.
///
/// Builds a stable-enough selector per element (id if present,
/// otherwise an nth-of-type path) and reports geometry plus the
/// interactive/disabled verdicts used for filtering.
const DISCOVERY_SCRIPT: &str = r#"
const SEMANTIC = [
    'button',
    'a[href]',
    '[role="button"]',
    '[role="link"]',
    '[role="tab"]',
    '[onclick]',
    'input[type="submit"]',
    'input[type="button"]',
    'summary',
];
const GENERIC = ['input', 'select', 'textarea', '[tabindex]'];

function selectorFor(el) {
    if (el.id) { return '#' + CSS.escape(el.id); }
    const parts = [];
    let node = el;
    while (node && node.nodeType === 1 && parts.length < 6) {
        const tag = node.tagName.toLowerCase();
        let index = 1;
        let sibling = node;
        while ((sibling = sibling.previousElementSibling)) {
            if (sibling.tagName === node.tagName) { index += 1; }
        }
        parts.unshift(tag + ':nth-of-type(' + index + ')');
        node = node.parentElement;
    }
    return parts.join(' > ');
}

function describe(el, interactive) {
    const rect = el.getBoundingClientRect();
    return {
        selector: selectorFor(el),
        text: (el.innerText || el.value || '').trim().slice(0, 80),
        x: rect.x + window.scrollX,
        y: rect.y + window.scrollY,
        width: rect.width,
        height: rect.height,
        interactive: interactive,
        disabled: !!el.disabled || el.getAttribute('aria-disabled') === 'true',
    };
}

const out = [];
for (const el of document.querySelectorAll(SEMANTIC.join(','))) {
    out.push(describe(el, true));
}
for (const el of document.querySelectorAll(GENERIC.join(','))) {
    out.push(describe(el, false));
}
return out;
"#;

// ============================================================================
// ElementInfo
// ============================================================================

/// Plain-data descriptor of one page element.
///
/// A value type; holds no handle into the page. Coordinates are
/// document-relative CSS pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementInfo {
    /// Selector that re-resolves the element in page context.
    pub selector: String,
    /// Visible text or value, truncated.
    #[serde(default)]
    pub text: String,
    /// Left edge.
    #[serde(default)]
    pub x: f64,
    /// Top edge.
    #[serde(default)]
    pub y: f64,
    /// Width.
    #[serde(default)]
    pub width: f64,
    /// Height.
    #[serde(default)]
    pub height: f64,
    /// Matched a semantic interactive heuristic.
    #[serde(rename = "interactive", default)]
    pub is_interactive: bool,
    /// Disabled via property or ARIA.
    #[serde(rename = "disabled", default)]
    pub is_disabled: bool,
}

impl ElementInfo {
    /// Center point of the element.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns `true` if the element occupies no space.
    #[must_use]
    pub fn is_invisible(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

// ============================================================================
// ElementFinder
// ============================================================================

/// Discovers interactive elements on the live page.
pub struct ElementFinder {
    page: Page,
}

impl ElementFinder {
    /// Creates a finder for a page.
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    /// Discovers click candidates, deduplicated and capped.
    ///
    /// Combines the semantic and generic discovery passes, dedupes by
    /// `(selector, text)`, drops disabled and zero-area elements, and
    /// returns at most `cap` descriptors in document order.
    pub async fn discover_interactive(&self, cap: usize) -> Result<Vec<ElementInfo>> {
        let raw = self.page.execute_script(DISCOVERY_SCRIPT).await?;
        let elements = Self::parse_elements(raw);

        let mut seen = std::collections::HashSet::new();
        let filtered: Vec<ElementInfo> = elements
            .into_iter()
            .filter(|el| !el.is_disabled && !el.is_invisible())
            .filter(|el| seen.insert((el.selector.clone(), el.text.clone())))
            .take(cap)
            .collect();

        debug!(
            page_id = %self.page.page_id(),
            found = filtered.len(),
            cap,
            "Interactive elements discovered"
        );
        Ok(filtered)
    }

    /// Parses the raw script value, skipping malformed entries.
    fn parse_elements(raw: Value) -> Vec<ElementInfo> {
        let Value::Array(entries) = raw else {
            return Vec::new();
        };

        entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .filter(|el: &ElementInfo| !el.selector.is_empty())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;

    use crate::identifiers::PageId;
    use crate::testing::FakeTransport;

    fn entry(selector: &str, text: &str, disabled: bool) -> Value {
        json!({
            "selector": selector,
            "text": text,
            "x": 10.0, "y": 20.0, "width": 100.0, "height": 30.0,
            "interactive": true,
            "disabled": disabled,
        })
    }

    #[tokio::test]
    async fn test_discovery_dedupes_and_caps() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!([
            entry("#buy", "Buy", false),
            entry("#buy", "Buy", false),
            entry("#menu", "Menu", false),
            entry("#later", "Later", false),
        ]));
        let page = Page::new(PageId::primary(), transport);

        let elements = ElementFinder::new(&page).discover_interactive(2).await.unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].selector, "#buy");
        assert_eq!(elements[1].selector, "#menu");
    }

    #[tokio::test]
    async fn test_discovery_drops_disabled_and_invisible() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!([
            entry("#ok", "Ok", false),
            entry("#off", "Off", true),
            {
                "selector": "#ghost", "text": "", "x": 0.0, "y": 0.0,
                "width": 0.0, "height": 0.0, "interactive": true, "disabled": false
            },
        ]));
        let page = Page::new(PageId::primary(), transport);

        let elements = ElementFinder::new(&page).discover_interactive(10).await.unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].selector, "#ok");
    }

    #[tokio::test]
    async fn test_discovery_tolerates_junk() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!([
            42,
            { "nonsense": true },
            entry("#real", "Real", false),
        ]));
        let page = Page::new(PageId::primary(), transport);

        let elements = ElementFinder::new(&page).discover_interactive(10).await.unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_empty_page() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!([]));
        let page = Page::new(PageId::primary(), transport);

        let elements = ElementFinder::new(&page).discover_interactive(10).await.unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn test_center() {
        let el = ElementInfo {
            selector: "#x".into(),
            text: String::new(),
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
            is_interactive: true,
            is_disabled: false,
        };
        assert_eq!(el.center(), (60.0, 40.0));
    }
}
