//! Navigation with retry, backoff, and wait-condition strategies.
//!
//! A single navigation attempt can fail for many transient reasons, so
//! [`Page::navigate_with_retry`] walks a fixed strategy ladder: wait
//! conditions cheapest-first with shrinking per-attempt timeouts and
//! increasing, capped backoff between attempts. Only an exhausted
//! ladder surfaces as an error.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand, ParsedEvent, WaitUntil};

use super::Page;

// ============================================================================
// Constants
// ============================================================================

/// Per-attempt (wait condition, timeout) ladder, cheapest wait first.
const NAVIGATION_ATTEMPTS: [(WaitUntil, Duration); 3] = [
    (WaitUntil::DomContentLoaded, Duration::from_secs(30)),
    (WaitUntil::Load, Duration::from_secs(20)),
    (WaitUntil::NetworkSettled, Duration::from_secs(10)),
];

/// Base backoff between attempts; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Backoff ceiling.
const BACKOFF_CAP: Duration = Duration::from_secs(2);

// ============================================================================
// Page - Navigation
// ============================================================================

impl Page {
    /// Navigates to a URL and waits for the load lifecycle event.
    ///
    /// Single attempt with a 30 second ceiling; use
    /// [`navigate_with_retry`](Self::navigate_with_retry) for the
    /// full retry ladder.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.goto_with(url, WaitUntil::Load, Duration::from_secs(30))
            .await
    }

    /// Navigates to a URL with an explicit wait condition and timeout.
    ///
    /// Subscribes to lifecycle events before issuing the navigation so
    /// a fast-firing milestone cannot be missed, then waits until the
    /// matching event arrives for this page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the condition is not reached in
    /// time, or a transport error if the command itself fails.
    pub async fn goto_with(
        &self,
        url: &str,
        wait_until: WaitUntil,
        nav_timeout: Duration,
    ) -> Result<()> {
        debug!(
            page_id = %self.page_id(),
            url = %url,
            wait = wait_until.event_name(),
            timeout_ms = nav_timeout.as_millis() as u64,
            "Navigating"
        );

        let mut events = self.subscribe_events();
        let deadline = Instant::now() + nav_timeout;

        self.send_command(Command::Page(PageCommand::Navigate {
            url: url.to_string(),
            wait_until,
        }))
        .await?;

        let expected = wait_until.event_name();

        loop {
            let received = timeout_at(deadline, events.recv()).await.map_err(|_| {
                Error::timeout(
                    format!("navigate({url}, {expected})"),
                    nav_timeout.as_millis() as u64,
                )
            })?;

            match received {
                Ok(event) if event.page_id == self.page_id() => {
                    if let ParsedEvent::PageLifecycle { name } = event.parse()
                        && name == expected
                    {
                        debug!(page_id = %self.page_id(), url = %url, "Navigation complete");
                        return Ok(());
                    }
                }
                // Other pages' events are not ours to act on
                Ok(_) => {}
                // A lagged subscriber may have dropped the milestone;
                // keep draining, the deadline still bounds us
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Lifecycle subscriber lagged");
                }
                Err(RecvError::Closed) => return Err(Error::ConnectionClosed),
            }
        }
    }

    /// Navigates with the full retry ladder.
    ///
    /// Up to three attempts, wait conditions cheapest-first with
    /// shrinking timeouts, capped exponential backoff in between.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Navigation`] wrapping the attempt count and the
    /// last attempt's error once the ladder is exhausted.
    pub async fn navigate_with_retry(&self, url: &str) -> Result<()> {
        let mut last_error: Option<Error> = None;

        for (attempt, (wait_until, nav_timeout)) in NAVIGATION_ATTEMPTS.iter().enumerate() {
            if attempt > 0 {
                let backoff = BACKOFF_CAP.min(BACKOFF_BASE * 2u32.pow(attempt as u32 - 1));
                debug!(
                    url = %url,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    "Backing off before retry"
                );
                sleep(backoff).await;
            }

            match self.goto_with(url, *wait_until, *nav_timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        wait = wait_until.event_name(),
                        error = %e,
                        "Navigation attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Err(Error::navigation(
            url,
            NAVIGATION_ATTEMPTS.len() as u32,
            last,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
