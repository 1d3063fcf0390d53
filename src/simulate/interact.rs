//! Per-element interaction with fallback techniques.
//!
//! No single click technique is reliable across arbitrary third-party
//! markup: some widgets only honor in-page dispatch, others only
//! trusted pointer events. Each target gets both, cheapest first,
//! under one per-element timeout. The outcome is a value, never an
//! error, so the orchestrator tallies without per-element handling.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::Result;
use crate::page::Page;

use super::finder::ElementInfo;

// ============================================================================
// Constants
// ============================================================================

/// Default ceiling for one element's interaction, both techniques
/// included.
const DEFAULT_ELEMENT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Technique
// ============================================================================

/// Which technique landed the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technique {
    /// In-page `element.click()` dispatch after scroll-into-view.
    ScriptClick,
    /// Trusted pointer events at the element center.
    PointerEvents,
}

// ============================================================================
// InteractionOutcome
// ============================================================================

/// Result of one interaction attempt.
#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    /// Whether any technique succeeded.
    pub success: bool,
    /// The technique that landed, if any.
    pub technique: Option<Technique>,
    /// Failure description, if none did.
    pub error: Option<String>,
}

impl InteractionOutcome {
    fn landed(technique: Technique) -> Self {
        Self {
            success: true,
            technique: Some(technique),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            technique: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Interactor
// ============================================================================

/// Executes click-style interactions against element descriptors.
pub struct Interactor {
    page: Page,
    element_timeout: Duration,
}

impl Interactor {
    /// Creates an interactor with the default per-element timeout.
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            page: page.clone(),
            element_timeout: DEFAULT_ELEMENT_TIMEOUT,
        }
    }

    /// Overrides the per-element timeout.
    #[must_use]
    pub fn with_timeout(mut self, element_timeout: Duration) -> Self {
        self.element_timeout = element_timeout;
        self
    }

    /// Attempts one click-style interaction.
    ///
    /// Interactions are never retried beyond the built-in technique
    /// fallback; a failure simply counts as unsuccessful.
    pub async fn click(&self, element: &ElementInfo) -> InteractionOutcome {
        let outcome = match timeout(self.element_timeout, self.try_click(element)).await {
            Ok(Ok(technique)) => InteractionOutcome::landed(technique),
            Ok(Err(e)) => InteractionOutcome::failed(e.to_string()),
            Err(_) => InteractionOutcome::failed(format!(
                "interaction timed out after {}ms",
                self.element_timeout.as_millis()
            )),
        };

        debug!(
            selector = %element.selector,
            success = outcome.success,
            technique = ?outcome.technique,
            "Interaction attempted"
        );
        outcome
    }

    async fn try_click(&self, element: &ElementInfo) -> Result<Technique> {
        match self.script_click(element).await {
            Ok(true) => return Ok(Technique::ScriptClick),
            Ok(false) => trace!(selector = %element.selector, "Selector did not re-resolve"),
            Err(e) => trace!(selector = %element.selector, error = %e, "Script click failed"),
        }

        self.pointer_click(element).await?;
        Ok(Technique::PointerEvents)
    }

    /// Re-resolves the element by selector and clicks it in page
    /// context. Returns `false` if the selector no longer matches.
    async fn script_click(&self, element: &ElementInfo) -> Result<bool> {
        let selector = js_string(&element.selector);
        let script = format!(
            r#"
            const el = document.querySelector({selector});
            if (!el) {{ return false; }}
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
            "#
        );

        let value = self.page.execute_script(&script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Dispatches trusted pointer events at the element center.
    async fn pointer_click(&self, element: &ElementInfo) -> Result<()> {
        let (x, y) = element.center();
        self.page.click_at(x, y).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Escapes a string for safe embedding in JavaScript source.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
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

    fn element() -> ElementInfo {
        ElementInfo {
            selector: "#cta".into(),
            text: "Go".into(),
            x: 10.0,
            y: 10.0,
            width: 80.0,
            height: 20.0,
            is_interactive: true,
            is_disabled: false,
        }
    }

    #[tokio::test]
    async fn test_script_click_lands_first() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!(true));
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        let outcome = Interactor::new(&page).click(&element()).await;
        assert!(outcome.success);
        assert_eq!(outcome.technique, Some(Technique::ScriptClick));
        // Pointer fallback never fired
        assert_eq!(transport.call_count("input.dispatchMouse"), 0);
    }

    #[tokio::test]
    async fn test_pointer_fallback_on_stale_selector() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!(false));
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        let outcome = Interactor::new(&page).click(&element()).await;
        assert!(outcome.success);
        assert_eq!(outcome.technique, Some(Technique::PointerEvents));
        assert_eq!(transport.call_count("input.dispatchMouse"), 3);
    }

    #[tokio::test]
    async fn test_failure_is_a_value_not_an_error() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail_method("script.evaluate");
        transport.fail_method("input.dispatchMouse");
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        let outcome = Interactor::new(&page).click(&element()).await;
        assert!(!outcome.success);
        assert!(outcome.technique.is_none());
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_js_string_escaping() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
