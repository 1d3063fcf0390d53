//! Core Page struct and accessors.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::PageId;
use crate::protocol::{Command, Event, PageCommand};
use crate::session::Transport;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a page.
pub(crate) struct PageInner {
    /// Page ID within the session.
    pub page_id: PageId,
    /// Shared protocol transport.
    pub transport: Arc<dyn Transport>,
}

// ============================================================================
// Page
// ============================================================================

/// A handle to a driven browser page.
///
/// Pages provide navigation, scripting, input, and geometry access.
/// The handle is cheap to clone; all clones target the same page.
#[derive(Clone)]
pub struct Page {
    pub(crate) inner: Arc<PageInner>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.inner.page_id)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates a new page handle over a transport.
    #[must_use]
    pub fn new(page_id: PageId, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(PageInner { page_id, transport }),
        }
    }
}

// ============================================================================
// Page - Accessors
// ============================================================================

impl Page {
    /// Returns the page ID.
    #[inline]
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    /// Returns the shared transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    /// Subscribes to the session event stream.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.inner.transport.events()
    }
}

// ============================================================================
// Page - Internal
// ============================================================================

impl Page {
    /// Executes a command against this page.
    pub(crate) async fn send_command(&self, command: Command) -> Result<Value> {
        self.inner
            .transport
            .execute(self.inner.page_id, command)
            .await
    }
}

// ============================================================================
// Page - Lifecycle & Metadata
// ============================================================================

impl Page {
    /// Gets the current page title.
    pub async fn get_title(&self) -> Result<String> {
        let result = self
            .send_command(Command::Page(PageCommand::GetTitle))
            .await?;

        Ok(result
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Gets the current URL.
    pub async fn get_url(&self) -> Result<String> {
        let result = self
            .send_command(Command::Page(PageCommand::GetUrl))
            .await?;

        Ok(result
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Gets the number of frames in the page.
    pub async fn get_frame_count(&self) -> Result<u64> {
        let result = self
            .send_command(Command::Page(PageCommand::GetFrameCount))
            .await?;

        Ok(result
            .get("frameCount")
            .and_then(Value::as_u64)
            .unwrap_or(1))
    }

    /// Overrides the viewport dimensions.
    pub async fn set_viewport(&self, width: u32, height: u32, mobile: bool) -> Result<()> {
        debug!(page_id = %self.inner.page_id, width, height, mobile, "Setting viewport");
        self.send_command(Command::Page(PageCommand::SetViewport {
            width,
            height,
            mobile,
        }))
        .await?;
        Ok(())
    }

    /// Overrides the user agent string.
    pub async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        debug!(page_id = %self.inner.page_id, "Setting user agent");
        self.send_command(Command::Page(PageCommand::SetUserAgent {
            user_agent: user_agent.to_string(),
        }))
        .await?;
        Ok(())
    }

    /// Closes this page.
    pub async fn close(&self) -> Result<()> {
        debug!(page_id = %self.inner.page_id, "Closing page");
        self.send_command(Command::Page(PageCommand::Close)).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
