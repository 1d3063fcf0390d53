//! Disposable-page substitute fetches.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::Result;
use crate::monitor::{NetworkMonitor, resolve_transfer_size};
use crate::page::Page;
use crate::protocol::WaitUntil;
use crate::resource::Resource;
use crate::session::PageOpener;

// ============================================================================
// Constants
// ============================================================================

/// Navigation ceiling for one substitute fetch.
const FETCH_NAV_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed window after navigation for trailing lifecycle events.
const SETTLE_WINDOW: Duration = Duration::from_secs(2);

// ============================================================================
// CrossOriginFetcher
// ============================================================================

/// Re-fetches one URL on a disposable page and harvests its monitor's
/// capture as a substitute measurement.
pub struct CrossOriginFetcher {
    opener: Arc<dyn PageOpener>,
    /// URLs already measured anywhere in the session; gates the
    /// incidental sub-resource capture.
    known_urls: Mutex<FxHashSet<String>>,
    sub_resources: Mutex<Vec<Resource>>,
}

impl CrossOriginFetcher {
    /// Creates a fetcher that dedupes incidental finds against
    /// `existing_urls`.
    #[must_use]
    pub fn new(opener: Arc<dyn PageOpener>, existing_urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            opener,
            known_urls: Mutex::new(existing_urls.into_iter().collect()),
            sub_resources: Mutex::new(Vec::new()),
        }
    }

    /// Fetches one URL on a disposable page.
    ///
    /// Navigates with a bounded timeout and a network-settled wait,
    /// waits one fixed settle window for trailing events, and closes
    /// the page on every exit path. Returns the resource synthesized
    /// for the exact URL, or `None` if nothing usable was captured.
    ///
    /// # Errors
    ///
    /// Only page-open and monitor-enable failures surface; navigation
    /// trouble degrades to a partial or empty harvest.
    pub async fn fetch_resource(&self, url: &str) -> Result<Option<Resource>> {
        debug!(url = %url, "Substitute fetch starting");

        let page = self.opener.open_page().await?;
        let outcome = self.fetch_on_page(&page, url).await;

        // The disposable page is released no matter how the fetch went
        if let Err(e) = page.close().await {
            warn!(url = %url, error = %e, "Failed to close disposable page");
        }

        outcome
    }

    /// Incidental sub-resources discovered across all fetches so far.
    ///
    /// Drains the internal buffer; already deduplicated against the
    /// session's known URLs.
    #[must_use]
    pub fn take_sub_resources(&self) -> Vec<Resource> {
        std::mem::take(&mut self.sub_resources.lock())
    }

    async fn fetch_on_page(&self, page: &Page, url: &str) -> Result<Option<Resource>> {
        let monitor = NetworkMonitor::new(page);
        monitor.set_primary_url(url);
        monitor.setup_listeners().await?;

        // A navigation that never settles can still have produced the
        // bytes we care about; harvest whatever arrived
        if let Err(e) = page
            .goto_with(url, WaitUntil::NetworkSettled, FETCH_NAV_TIMEOUT)
            .await
        {
            debug!(url = %url, error = %e, "Substitute navigation did not settle");
        }

        sleep(SETTLE_WINDOW).await;

        let captured = monitor.get_resources();
        let open_response = monitor.open_response_for_url(url);
        monitor.detach();

        let mut primary = None;
        {
            let mut known = self.known_urls.lock();
            let mut subs = self.sub_resources.lock();

            for resource in captured {
                if primary.is_none() && resource.url == url {
                    known.insert(resource.url.clone());
                    primary = Some(resource);
                } else if known.insert(resource.url.clone()) {
                    subs.push(resource);
                }
            }
        }

        // Completion never arrived but headers did: estimate from them
        if primary.is_none()
            && let Some(meta) = open_response
        {
            let transfer_size = resolve_transfer_size(0, Some(&meta));
            debug!(url = %url, transfer_size, "Synthesizing resource from open response");
            self.known_urls.lock().insert(url.to_string());
            primary = Some(Resource::new(
                url,
                meta.content_type.clone(),
                transfer_size,
                meta.status,
                classify(url, &meta.content_type),
            ));
        }

        match &primary {
            Some(resource) => debug!(
                url = %url,
                transfer_size = resource.transfer_size,
                "Substitute fetch captured"
            ),
            None => debug!(url = %url, "Substitute fetch found nothing"),
        }

        Ok(primary)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::Error;
    use crate::identifiers::PageId;
    use crate::protocol::Event;
    use crate::session::{Session, Transport};
    use crate::testing::FakeTransport;

    /// Opener whose pages are driven by a scripted transport.
    struct ScriptedOpener {
        transport: Arc<FakeTransport>,
        session: Session,
    }

    impl ScriptedOpener {
        fn new() -> Self {
            let transport = Arc::new(FakeTransport::new());
            let session = Session::over(Arc::clone(&transport) as Arc<dyn Transport>);
            Self { transport, session }
        }
    }

    #[async_trait]
    impl PageOpener for ScriptedOpener {
        async fn open_page(&self) -> Result<Page> {
            self.session.open_page().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_harvests_exact_url() {
        let opener = Arc::new(ScriptedOpener::new());
        let transport = Arc::clone(&opener.transport);
        let fetcher = CrossOriginFetcher::new(opener, Vec::new());

        let url = "https://cdn.example.net/hero.png";
        let feeder = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                // The disposable page gets id 1 from the fake transport
                tokio::time::sleep(Duration::from_millis(100)).await;
                let page = PageId::new(1);
                transport.emit(Event::request_will_be_sent(page, "1", url, "GET"));
                transport.emit(Event::response_received(page, "1", 200, "image/png", json!({})));
                transport.emit(Event::loading_finished(page, "1", 2048));
            }
        });

        let resource = fetcher.fetch_resource(url).await.unwrap().unwrap();
        feeder.await.unwrap();

        assert_eq!(resource.url, url);
        assert_eq!(resource.transfer_size, 2048);
        assert_eq!(transport.call_count("page.close"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_closes_page_when_nothing_arrives() {
        let opener = Arc::new(ScriptedOpener::new());
        let transport = Arc::clone(&opener.transport);
        let fetcher = CrossOriginFetcher::new(opener, Vec::new());

        let resource = fetcher
            .fetch_resource("https://cdn.example.net/void.js")
            .await
            .unwrap();

        assert!(resource.is_none());
        assert_eq!(transport.call_count("page.close"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_closes_page_on_monitor_failure() {
        let opener = Arc::new(ScriptedOpener::new());
        let transport = Arc::clone(&opener.transport);
        transport.fail_method("network.enable");
        let fetcher = CrossOriginFetcher::new(opener, Vec::new());

        let err = fetcher
            .fetch_resource("https://cdn.example.net/x.js")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(transport.call_count("page.close"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_resources_deduped_against_existing() {
        let opener = Arc::new(ScriptedOpener::new());
        let transport = Arc::clone(&opener.transport);
        let fetcher = CrossOriginFetcher::new(
            opener,
            vec!["https://cdn.example.net/already-known.css".to_string()],
        );

        let url = "https://cdn.example.net/widget.js";
        let feeder = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let page = PageId::new(1);
                for (id, sub_url, mime) in [
                    ("1", url, "application/javascript"),
                    ("2", "https://cdn.example.net/already-known.css", "text/css"),
                    ("3", "https://cdn.example.net/incidental.woff2", "font/woff2"),
                ] {
                    transport.emit(Event::request_will_be_sent(page, id, sub_url, "GET"));
                    transport.emit(Event::response_received(page, id, 200, mime, json!({})));
                    transport.emit(Event::loading_finished(page, id, 100));
                }
            }
        });

        let resource = fetcher.fetch_resource(url).await.unwrap();
        feeder.await.unwrap();
        assert!(resource.is_some());

        let subs = fetcher.take_sub_resources();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].url, "https://cdn.example.net/incidental.woff2");

        // Drained
        assert!(fetcher.take_sub_resources().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_synthesizes_from_open_response() {
        let opener = Arc::new(ScriptedOpener::new());
        let transport = Arc::clone(&opener.transport);
        let fetcher = CrossOriginFetcher::new(opener, Vec::new());

        let url = "https://cdn.example.net/stalled.png";
        let feeder = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let page = PageId::new(1);
                // Headers arrive, completion never does
                transport.emit(Event::request_will_be_sent(page, "1", url, "GET"));
                transport.emit(Event::response_received(
                    page,
                    "1",
                    200,
                    "image/png",
                    json!({ "content-length": "777" }),
                ));
            }
        });

        let resource = fetcher.fetch_resource(url).await.unwrap().unwrap();
        feeder.await.unwrap();

        assert_eq!(resource.transfer_size, 777);
        assert_eq!(resource.http_status, 200);
    }
}
