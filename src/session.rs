//! Protocol session boundary.
//!
//! The measurement engine does not own a browser process; it consumes a
//! pre-configured protocol session supplied by the caller. [`Transport`]
//! is that seam: any automation surface exposing command execution plus
//! the four network lifecycle events satisfies it. [`Session`] wraps a
//! transport and hands out [`Page`] handles, including the disposable
//! pages the cross-origin fetcher needs.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::PageId;
use crate::page::Page;
use crate::protocol::{Command, Event, PageCommand};

// ============================================================================
// Transport
// ============================================================================

/// Command execution and event delivery over an automation surface.
///
/// Implemented by [`Connection`](crate::transport::Connection) for the
/// WebSocket wire; tests implement it in memory.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a command against a page and returns its result value.
    async fn execute(&self, page_id: PageId, command: Command) -> Result<Value>;

    /// Subscribes to the session's event stream.
    ///
    /// Every subscriber sees every event; filtering by page is the
    /// subscriber's job.
    fn events(&self) -> broadcast::Receiver<Event>;
}

// ============================================================================
// PageOpener
// ============================================================================

/// Creates additional pages within a session.
///
/// The cross-origin fetcher opens a disposable page per unresolved URL;
/// this trait is the only capability it needs from the session.
#[async_trait]
pub trait PageOpener: Send + Sync {
    /// Opens a fresh page and returns its handle.
    async fn open_page(&self) -> Result<Page>;
}

// ============================================================================
// Session
// ============================================================================

/// A protocol session over a shared transport.
///
/// Cloning is cheap; all clones share the underlying transport.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
}

impl Session {
    /// Wraps an existing transport.
    #[must_use]
    pub fn over(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns the shared transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Returns a handle to the session's primary page.
    #[must_use]
    pub fn primary_page(&self) -> Page {
        Page::new(PageId::primary(), Arc::clone(&self.transport))
    }

    /// Returns a handle to an existing page by id.
    #[must_use]
    pub fn page(&self, page_id: PageId) -> Page {
        Page::new(page_id, Arc::clone(&self.transport))
    }
}

#[async_trait]
impl PageOpener for Session {
    async fn open_page(&self) -> Result<Page> {
        let result = self
            .transport
            .execute(PageId::primary(), Command::Page(PageCommand::Create))
            .await?;

        let page_id = result
            .get("pageId")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::protocol("No pageId in page.create reply"))?;

        debug!(page_id, "Opened page");
        Ok(Page::new(
            PageId::new(page_id as u32),
            Arc::clone(&self.transport),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
