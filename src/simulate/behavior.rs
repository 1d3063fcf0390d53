//! Compound behavior patterns.
//!
//! Reading scroll, hover passes, form filling, and viewport sweeps,
//! paced with randomized pauses so lazy-load observers and scroll
//! handlers get realistic time to fire.

// ============================================================================
// Imports
// ============================================================================

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::error::Result;
use crate::page::Page;

use super::finder::ElementInfo;

// ============================================================================
// Constants
// ============================================================================

/// Pause range between reading-scroll steps, in milliseconds.
const READ_PAUSE_MS: RangeInclusive<u64> = 800..=1400;

/// Pause range after a hover, in milliseconds.
const HOVER_PAUSE_MS: RangeInclusive<u64> = 200..=500;

/// Pause after a viewport change, letting media queries re-resolve.
const VIEWPORT_PAUSE: Duration = Duration::from_millis(600);

/// A scroll step never exceeds this fraction of the viewport, so no
/// content strip is skipped entirely.
const MAX_STEP_VIEWPORT_FRACTION: f64 = 0.8;

// ============================================================================
// BehaviorSimulator
// ============================================================================

/// Executes compound interaction patterns against a page.
pub struct BehaviorSimulator {
    page: Page,
}

impl BehaviorSimulator {
    /// Creates a simulator for a page.
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    /// Scrolls through the page the way a reader would.
    ///
    /// Step size is `min((scroll_height − viewport) / steps,
    /// 0.8 · viewport)`, with a randomized pause per step. Returns the
    /// number of steps actually taken.
    pub async fn reading_scroll(&self, max_steps: u32, return_to_top: bool) -> Result<u32> {
        if max_steps == 0 {
            return Ok(0);
        }

        let metrics = self.page.scroll_metrics().await?;
        let scrollable = metrics.scroll_height - metrics.viewport_height;
        if scrollable <= 0.0 {
            trace!(page_id = %self.page.page_id(), "Nothing to scroll");
            return Ok(0);
        }

        let step = (scrollable / f64::from(max_steps))
            .min(metrics.viewport_height * MAX_STEP_VIEWPORT_FRACTION);
        if step < 1.0 {
            return Ok(0);
        }

        debug!(
            page_id = %self.page.page_id(),
            steps = max_steps,
            step_px = step as i64,
            "Reading scroll"
        );

        for _ in 0..max_steps {
            self.page.scroll_by(0, step as i64).await?;
            pause(READ_PAUSE_MS).await;
        }

        if return_to_top {
            self.page.scroll_to_top().await?;
        }

        Ok(max_steps)
    }

    /// Hovers over up to `cap` interactive elements.
    pub async fn hover_pass(&self, elements: &[ElementInfo], cap: usize) -> Result<u32> {
        let mut hovered = 0;
        for element in elements.iter().filter(|e| e.is_interactive).take(cap) {
            let (x, y) = element.center();
            self.page.move_mouse(x, y).await?;
            pause(HOVER_PAUSE_MS).await;
            hovered += 1;
        }

        debug!(page_id = %self.page.page_id(), hovered, "Hover pass complete");
        Ok(hovered)
    }

    /// Fills visible text inputs with sample values, without
    /// submitting anything.
    ///
    /// Returns the number of fields touched.
    pub async fn fill_forms(&self) -> Result<u64> {
        let value = self
            .page
            .execute_script(
                r#"
                let filled = 0;
                const sample = {
                    email: 'sample@example.com',
                    tel: '5550100',
                    search: 'sample query',
                    text: 'sample',
                };
                for (const input of document.querySelectorAll('input, textarea')) {
                    if (input.disabled || input.type === 'hidden' || input.value) { continue; }
                    const kind = input.type in sample ? input.type : 'text';
                    if (!(input.type in sample) && input.tagName !== 'TEXTAREA'
                        && input.type !== 'text') { continue; }
                    input.value = sample[kind];
                    input.dispatchEvent(new Event('input', { bubbles: true }));
                    input.dispatchEvent(new Event('change', { bubbles: true }));
                    filled += 1;
                }
                return filled;
                "#,
            )
            .await?;

        let filled = value.as_u64().unwrap_or(0);
        debug!(page_id = %self.page.page_id(), filled, "Form fill complete");
        Ok(filled)
    }

    /// Cycles the viewport through alternate widths, then restores.
    ///
    /// Width changes re-trigger responsive image selection and media
    /// queries, surfacing variants the initial viewport never loaded.
    pub async fn viewport_sweep(&self, base: (u32, u32), widths: &[u32]) -> Result<()> {
        for &width in widths {
            self.page.set_viewport(width, base.1, false).await?;
            sleep(VIEWPORT_PAUSE).await;
        }

        self.page.set_viewport(base.0, base.1, false).await?;
        debug!(page_id = %self.page.page_id(), sweeps = widths.len(), "Viewport sweep complete");
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Sleeps a uniformly random duration from the range.
async fn pause(range_ms: RangeInclusive<u64>) {
    let ms = rand::thread_rng().gen_range(range_ms);
    sleep(Duration::from_millis(ms)).await;
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

    #[tokio::test(start_paused = true)]
    async fn test_reading_scroll_steps() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!({
            "scrollHeight": 4000.0,
            "viewportHeight": 800.0,
            "scrollY": 0.0
        }));
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        let steps = BehaviorSimulator::new(&page)
            .reading_scroll(4, true)
            .await
            .unwrap();

        assert_eq!(steps, 4);
        // metrics + 4 scroll steps + return to top
        assert_eq!(transport.call_count("script.evaluate"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_scroll_short_page() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!({
            "scrollHeight": 600.0,
            "viewportHeight": 800.0,
            "scrollY": 0.0
        }));
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        let steps = BehaviorSimulator::new(&page)
            .reading_scroll(5, false)
            .await
            .unwrap();

        assert_eq!(steps, 0);
        assert_eq!(transport.call_count("script.evaluate"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_pass_skips_non_interactive() {
        let transport = Arc::new(FakeTransport::new());
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        let elements = vec![
            ElementInfo {
                selector: "#a".into(),
                text: String::new(),
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                is_interactive: true,
                is_disabled: false,
            },
            ElementInfo {
                selector: "#b".into(),
                text: String::new(),
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                is_interactive: false,
                is_disabled: false,
            },
        ];

        let hovered = BehaviorSimulator::new(&page)
            .hover_pass(&elements, 5)
            .await
            .unwrap();

        assert_eq!(hovered, 1);
        assert_eq!(transport.call_count("input.dispatchMouse"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_sweep_restores_base() {
        let transport = Arc::new(FakeTransport::new());
        let page = Page::new(PageId::primary(), Arc::clone(&transport) as _);

        BehaviorSimulator::new(&page)
            .viewport_sweep((1280, 720), &[480, 768])
            .await
            .unwrap();

        // Two sweeps plus the restore
        assert_eq!(transport.call_count("page.setViewport"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_forms_counts() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_script_result(json!(3));
        let page = Page::new(PageId::primary(), transport);

        let filled = BehaviorSimulator::new(&page).fill_forms().await.unwrap();
        assert_eq!(filled, 3);
    }
}
