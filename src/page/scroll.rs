//! Scroll control and page geometry.

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

use super::Page;

// ============================================================================
// ScrollMetrics
// ============================================================================

/// Scroll-relevant geometry captured in one page round-trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Total scrollable document height in pixels.
    pub scroll_height: f64,
    /// Viewport height in pixels.
    pub viewport_height: f64,
    /// Current vertical scroll offset in pixels.
    pub scroll_y: f64,
}

// ============================================================================
// Page - Scroll
// ============================================================================

impl Page {
    /// Scrolls the page by the specified amount.
    pub async fn scroll_by(&self, x: i64, y: i64) -> Result<()> {
        debug!(page_id = %self.page_id(), x, y, "Scrolling by");
        self.execute_script(&format!("window.scrollBy({x}, {y});"))
            .await?;
        Ok(())
    }

    /// Scrolls the page to the specified position.
    pub async fn scroll_to(&self, x: i64, y: i64) -> Result<()> {
        debug!(page_id = %self.page_id(), x, y, "Scrolling to");
        self.execute_script(&format!("window.scrollTo({x}, {y});"))
            .await?;
        Ok(())
    }

    /// Scrolls to the top of the page.
    pub async fn scroll_to_top(&self) -> Result<()> {
        self.scroll_to(0, 0).await
    }

    /// Captures scroll geometry in a single round-trip.
    pub async fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        let result = self
            .execute_script(
                r#"
                const html = document.documentElement;
                return {
                    scrollHeight: Math.max(document.body ? document.body.scrollHeight : 0, html.scrollHeight),
                    viewportHeight: window.innerHeight,
                    scrollY: window.scrollY
                };
                "#,
            )
            .await?;

        Ok(ScrollMetrics {
            scroll_height: result
                .get("scrollHeight")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            viewport_height: result
                .get("viewportHeight")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            scroll_y: result.get("scrollY").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    /// Gets the viewport dimensions as (width, height).
    pub async fn get_viewport_size(&self) -> Result<(i64, i64)> {
        let result = self
            .execute_script("return { width: window.innerWidth, height: window.innerHeight };")
            .await?;

        let width = result.get("width").and_then(Value::as_i64).unwrap_or(0);
        let height = result.get("height").and_then(Value::as_i64).unwrap_or(0);
        Ok((width, height))
    }

    /// Gets the full scrollable page dimensions as (width, height).
    pub async fn get_page_size(&self) -> Result<(i64, i64)> {
        let result = self
            .execute_script(
                r#"
                const body = document.body;
                const html = document.documentElement;
                return {
                    width: Math.max(body.scrollWidth, html.clientWidth, html.scrollWidth),
                    height: Math.max(body.scrollHeight, html.clientHeight, html.scrollHeight)
                };
                "#,
            )
            .await?;

        let width = result.get("width").and_then(Value::as_i64).unwrap_or(0);
        let height = result.get("height").and_then(Value::as_i64).unwrap_or(0);
        Ok((width, height))
    }
}

// ============================================================================
// Tests
// ============================================================================
