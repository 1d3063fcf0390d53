//! End-of-session reconciliation of unresolved requests.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::identifiers::RequestId;
use crate::monitor::{OriginRelation, PendingRequest};
use crate::resource::Resource;
use crate::session::PageOpener;

use super::CrossOriginFetcher;

// ============================================================================
// Constants
// ============================================================================

/// Hard ceiling for one substitute fetch, navigation and settle
/// included. A hung fetch must not hold the batch open.
const FETCH_CEILING: Duration = Duration::from_secs(15);

// ============================================================================
// CrossOriginHandler
// ============================================================================

/// Reconciles the primary monitor's still-open requests at session end.
pub struct CrossOriginHandler {
    fetcher: CrossOriginFetcher,
}

impl CrossOriginHandler {
    /// Creates a handler whose fetches dedupe against `existing_urls`.
    #[must_use]
    pub fn new(opener: Arc<dyn PageOpener>, existing_urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            fetcher: CrossOriginFetcher::new(opener, existing_urls),
        }
    }

    /// Resolves every cross-origin entry of the still-open map via a
    /// substitute fetch.
    ///
    /// Fetches are mutually independent and run concurrently, each
    /// under its own ceiling; a single failure or hang never affects
    /// siblings. Returns the substitute resources plus any incidental
    /// sub-resources the fetches surfaced, deduplicated by URL.
    pub async fn process_pending_requests(
        &self,
        pending: FxHashMap<RequestId, PendingRequest>,
    ) -> Vec<Resource> {
        let mut seen = FxHashSet::default();
        let targets: Vec<String> = pending
            .values()
            .filter(|request| request.origin_relation == OriginRelation::CrossOrigin)
            .filter(|request| seen.insert(request.url.clone()))
            .map(|request| request.url.clone())
            .collect();

        if targets.is_empty() {
            debug!("No cross-origin gaps to reconcile");
            return Vec::new();
        }

        debug!(count = targets.len(), "Reconciling cross-origin gaps");

        let fetches = targets.iter().map(|url| async move {
            match timeout(FETCH_CEILING, self.fetcher.fetch_resource(url)).await {
                Ok(Ok(resource)) => resource,
                Ok(Err(e)) => {
                    warn!(url = %url, error = %e, "Substitute fetch failed");
                    None
                }
                Err(_) => {
                    warn!(
                        url = %url,
                        ceiling_ms = FETCH_CEILING.as_millis() as u64,
                        "Substitute fetch hit its ceiling"
                    );
                    None
                }
            }
        });

        let mut resolved: Vec<Resource> = join_all(fetches).await.into_iter().flatten().collect();

        let incidental = self.fetcher.take_sub_resources();
        debug!(
            resolved = resolved.len(),
            incidental = incidental.len(),
            "Reconciliation complete"
        );
        resolved.extend(incidental);
        resolved
    }
}

// ============================================================================
// Tests
// ============================================================================
