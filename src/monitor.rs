//! Network lifecycle monitoring.
//!
//! Turns the unordered, id-correlated network event stream into an
//! ordered [`Resource`] list plus idle detection. One monitor observes
//! one page for the whole session, concurrently with whatever drives
//! the page; capture never pauses during interaction.
//!
//! # Per-request state machine
//!
//! ```text
//! Started ──► ResponseReceived ──► Finished
//!    │                               │
//!    └───────────► Failed ◄──────────┘
//! ```
//!
//! `Started` on an id already present evicts the stale entry (ids are
//! reused by the remote end only after a terminal event). `Finished`
//! needs both the request and response halves or the record is dropped
//! silently. `Failed` discards any partial record unconditionally.
//! Every terminal event purges both maps, bounding memory to in-flight
//! requests.

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use url::{Origin, Url};

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::identifiers::{ListenerId, RequestId};
use crate::page::Page;
use crate::protocol::{Command, NetworkCommand, ParsedEvent};
use crate::resource::Resource;

// ============================================================================
// Constants
// ============================================================================

/// Poll interval for idle detection.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// OriginRelation
// ============================================================================

/// Relation of a request's origin to the session's primary page origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginRelation {
    /// Same origin as the primary page.
    SameOrigin,
    /// Different origin than the primary page.
    CrossOrigin,
    /// Primary origin not yet known, or the URL is opaque.
    Unknown,
}

impl OriginRelation {
    /// Computes the relation of `url` to a primary origin.
    #[must_use]
    pub fn of(primary: Option<&Origin>, url: &str) -> Self {
        let Some(primary) = primary else {
            return Self::Unknown;
        };

        match Url::parse(url) {
            Ok(parsed) => {
                if &parsed.origin() == primary {
                    Self::SameOrigin
                } else {
                    Self::CrossOrigin
                }
            }
            Err(_) => Self::Unknown,
        }
    }
}

// ============================================================================
// PendingRequest
// ============================================================================

/// A request observed as started but not yet terminal.
///
/// Lives from the start notification until completion, failure, or
/// teardown reconciliation; never persisted.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Opaque request id.
    pub request_id: RequestId,
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// When the start notification arrived.
    pub started_at: Instant,
    /// Relation to the primary page origin.
    pub origin_relation: OriginRelation,
}

// ============================================================================
// ResponseMeta
// ============================================================================

/// Response metadata for an in-flight request; may never arrive.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// Opaque request id.
    pub request_id: RequestId,
    /// HTTP status code.
    pub status: u16,
    /// Response headers, keys lowercased.
    pub headers: HashMap<String, String>,
    /// Served content type.
    pub content_type: String,
}

impl ResponseMeta {
    /// Content-Length header as a byte count, if present and numeric.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// Activity
// ============================================================================

/// Kind of network activity surfaced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// A request started.
    RequestStarted,
    /// Response metadata arrived.
    ResponseReceived,
    /// A request finished loading.
    LoadingFinished,
    /// A request failed.
    LoadingFailed,
}

/// Activity observer callback.
pub type ActivityListener = Arc<dyn Fn(ActivityKind) + Send + Sync>;

// ============================================================================
// IdleOutcome
// ============================================================================

/// How [`NetworkMonitor::wait_for_network_idle`] returned.
///
/// `GaveUp` cannot distinguish a genuinely busy network from one that
/// merely trickles; callers treat both outcomes as acceptable
/// completion and the status exists so they can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The quiet window elapsed with no new activity.
    Idle,
    /// The maximum wait elapsed first.
    GaveUp,
}

impl IdleOutcome {
    /// Returns `true` for a confident idle.
    #[inline]
    #[must_use]
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

// ============================================================================
// MonitorState
// ============================================================================

/// Mutable monitor state.
///
/// Only the event pump task writes the maps and the resource list;
/// everything else reads through the monitor's public methods.
struct MonitorState {
    pending: FxHashMap<RequestId, PendingRequest>,
    responses: FxHashMap<RequestId, ResponseMeta>,
    resources: Vec<Resource>,
    last_activity: Instant,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            pending: FxHashMap::default(),
            responses: FxHashMap::default(),
            resources: Vec::new(),
            last_activity: Instant::now(),
        }
    }
}

// ============================================================================
// NetworkMonitor
// ============================================================================

/// Observes one page's network lifecycle events.
pub struct NetworkMonitor {
    page: Page,
    state: Arc<Mutex<MonitorState>>,
    listeners: Arc<Mutex<Vec<(ListenerId, ActivityListener)>>>,
    primary_origin: Arc<Mutex<Option<Origin>>>,
    next_listener_id: Mutex<u64>,
    pump: Mutex<Option<JoinHandle<()>>>,
    attached: AtomicBool,
}

impl NetworkMonitor {
    /// Creates a monitor for a page. No events flow until
    /// [`setup_listeners`](Self::setup_listeners) is called.
    #[must_use]
    pub fn new(page: &Page) -> Self {
        Self {
            page: page.clone(),
            state: Arc::new(Mutex::new(MonitorState::new())),
            listeners: Arc::new(Mutex::new(Vec::new())),
            primary_origin: Arc::new(Mutex::new(None)),
            next_listener_id: Mutex::new(0),
            pump: Mutex::new(None),
            attached: AtomicBool::new(false),
        }
    }

    /// Records the primary page URL used for origin classification.
    ///
    /// Call before navigation so every observed request gets a correct
    /// [`OriginRelation`].
    pub fn set_primary_url(&self, url: &str) {
        let origin = Url::parse(url).map(|u| u.origin()).ok();
        if origin.is_none() {
            warn!(url = %url, "Primary URL did not parse; origin relations will be unknown");
        }
        *self.primary_origin.lock() = origin;
    }

    /// Enables the network event channel and starts the event pump.
    ///
    /// Not safe to call twice on the same instance.
    ///
    /// # Errors
    ///
    /// - [`Error::MonitorAlreadyAttached`] on a second call
    /// - The channel-enable failure, verbatim; this is the one fatal
    ///   setup condition and the session cannot proceed without it
    pub async fn setup_listeners(&self) -> Result<()> {
        if self.attached.swap(true, Ordering::SeqCst) {
            return Err(Error::MonitorAlreadyAttached);
        }

        // Subscribe before enabling so the first burst cannot be missed
        let mut events = self.page.subscribe_events();

        if let Err(e) = self
            .page
            .send_command(Command::Network(NetworkCommand::Enable))
            .await
        {
            self.attached.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let page_id = self.page.page_id();
        let state = Arc::clone(&self.state);
        let listeners = Arc::clone(&self.listeners);
        let primary_origin = Arc::clone(&self.primary_origin);

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.page_id == page_id => {
                        Self::handle_event(&state, &listeners, &primary_origin, event.parse());
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Network event pump lagged; some requests may be lost");
                    }
                    Err(RecvError::Closed) => {
                        debug!(%page_id, "Event stream closed; pump exiting");
                        break;
                    }
                }
            }
        });

        *self.pump.lock() = Some(handle);
        debug!(page_id = %self.page.page_id(), "Network monitor attached");
        Ok(())
    }

    /// Stops the event pump. Captured data remains readable.
    pub fn detach(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
            debug!(page_id = %self.page.page_id(), "Network monitor detached");
        }
    }

    /// Clears all maps and the resource list for reuse.
    ///
    /// Listener registrations and the event pump survive.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.responses.clear();
        state.resources.clear();
        state.last_activity = Instant::now();
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}

// ============================================================================
// NetworkMonitor - Reads
// ============================================================================

impl NetworkMonitor {
    /// Returns a defensive copy of the captured resources.
    ///
    /// Non-blocking; callable at any time during capture.
    #[must_use]
    pub fn get_resources(&self) -> Vec<Resource> {
        self.state.lock().resources.clone()
    }

    /// Sum of captured transfer sizes, recomputed on every call.
    #[must_use]
    pub fn get_total_transfer_size(&self) -> u64 {
        self.state
            .lock()
            .resources
            .iter()
            .map(|r| r.transfer_size)
            .sum()
    }

    /// Snapshot of the still-open request map.
    #[must_use]
    pub fn get_pending_requests(&self) -> FxHashMap<RequestId, PendingRequest> {
        self.state.lock().pending.clone()
    }

    /// Number of in-flight requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Response metadata of a still-open request for `url`, if any.
    ///
    /// Lets the substitute fetcher estimate a resource whose completion
    /// event never arrived but whose headers did.
    #[must_use]
    pub fn open_response_for_url(&self, url: &str) -> Option<ResponseMeta> {
        let state = self.state.lock();
        state
            .pending
            .values()
            .find(|pending| pending.url == url)
            .and_then(|pending| state.responses.get(&pending.request_id).cloned())
    }
}

// ============================================================================
// NetworkMonitor - Idle Detection
// ============================================================================

impl NetworkMonitor {
    /// Waits until the network has been quiet for `idle_time`, or
    /// until `max_wait` elapses.
    ///
    /// Polls at a fixed short interval; the idle clock resets on every
    /// request, response, and finished notification. Both outcomes
    /// return normally so the pipeline always progresses.
    pub async fn wait_for_network_idle(
        &self,
        idle_time: Duration,
        max_wait: Duration,
    ) -> IdleOutcome {
        let started = Instant::now();

        loop {
            let quiet_for = self.state.lock().last_activity.elapsed();
            if quiet_for >= idle_time {
                trace!(quiet_ms = quiet_for.as_millis() as u64, "Network idle");
                return IdleOutcome::Idle;
            }

            if started.elapsed() >= max_wait {
                debug!(
                    max_wait_ms = max_wait.as_millis() as u64,
                    "Gave up waiting for network idle"
                );
                return IdleOutcome::GaveUp;
            }

            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

// ============================================================================
// NetworkMonitor - Activity Pub-Sub
// ============================================================================

impl NetworkMonitor {
    /// Registers an activity observer.
    pub fn on_activity(&self, listener: impl Fn(ActivityKind) + Send + Sync + 'static) -> ListenerId {
        let mut next = self.next_listener_id.lock();
        let id = ListenerId::new(*next);
        *next += 1;
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Removes an activity observer.
    ///
    /// Returns `true` if the listener was registered.
    pub fn remove_activity_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Invokes listeners outside any state lock; a panicking listener
    /// is logged and never propagates into the pump.
    fn notify(listeners: &Arc<Mutex<Vec<(ListenerId, ActivityListener)>>>, kind: ActivityKind) {
        let snapshot: Vec<ActivityListener> = listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(kind))).is_err() {
                warn!(?kind, "Activity listener panicked");
            }
        }
    }
}

// ============================================================================
// NetworkMonitor - Event Handlers
// ============================================================================

impl NetworkMonitor {
    fn handle_event(
        state: &Arc<Mutex<MonitorState>>,
        listeners: &Arc<Mutex<Vec<(ListenerId, ActivityListener)>>>,
        primary_origin: &Arc<Mutex<Option<Origin>>>,
        parsed: ParsedEvent,
    ) {
        match parsed {
            ParsedEvent::RequestWillBeSent {
                request_id,
                url,
                method,
            } => {
                let relation = OriginRelation::of(primary_origin.lock().as_ref(), &url);
                Self::handle_request_started(state, request_id, url, method, relation);
                Self::notify(listeners, ActivityKind::RequestStarted);
            }

            ParsedEvent::ResponseReceived {
                request_id,
                status,
                mime_type,
                headers,
            } => {
                Self::handle_response_received(state, request_id, status, mime_type, headers);
                Self::notify(listeners, ActivityKind::ResponseReceived);
            }

            ParsedEvent::LoadingFinished {
                request_id,
                encoded_data_length,
            } => {
                Self::handle_loading_finished(state, request_id, encoded_data_length);
                Self::notify(listeners, ActivityKind::LoadingFinished);
            }

            ParsedEvent::LoadingFailed {
                request_id,
                error_text,
            } => {
                Self::handle_loading_failed(state, request_id, &error_text);
                Self::notify(listeners, ActivityKind::LoadingFailed);
            }

            ParsedEvent::PageLifecycle { .. } | ParsedEvent::Unknown => {}
        }
    }

    fn handle_request_started(
        state: &Arc<Mutex<MonitorState>>,
        request_id: RequestId,
        url: String,
        method: String,
        origin_relation: OriginRelation,
    ) {
        let mut state = state.lock();

        // Id reuse happens only after a terminal event, so anything
        // still here under this id is stale
        if state.pending.remove(&request_id).is_some() {
            trace!(%request_id, "Evicted stale pending entry");
            state.responses.remove(&request_id);
        }

        trace!(%request_id, url = %url, "Request started");
        state.pending.insert(
            request_id.clone(),
            PendingRequest {
                request_id,
                url,
                method,
                started_at: Instant::now(),
                origin_relation,
            },
        );
        state.last_activity = Instant::now();
    }

    fn handle_response_received(
        state: &Arc<Mutex<MonitorState>>,
        request_id: RequestId,
        status: u16,
        content_type: String,
        headers: HashMap<String, String>,
    ) {
        let mut state = state.lock();
        state.last_activity = Instant::now();

        // An orphan response cannot become a Resource; don't let it linger
        if !state.pending.contains_key(&request_id) {
            trace!(%request_id, "Response for unknown request dropped");
            return;
        }

        state.responses.insert(
            request_id.clone(),
            ResponseMeta {
                request_id,
                status,
                headers,
                content_type,
            },
        );
    }

    fn handle_loading_finished(
        state: &Arc<Mutex<MonitorState>>,
        request_id: RequestId,
        encoded_data_length: u64,
    ) {
        let mut state = state.lock();
        let pending = state.pending.remove(&request_id);
        let response = state.responses.remove(&request_id);
        state.last_activity = Instant::now();

        // A half record cannot be measured honestly; drop it
        let (Some(pending), Some(response)) = (pending, response) else {
            trace!(%request_id, "Finished without full record; dropped");
            return;
        };

        let transfer_size = resolve_transfer_size(encoded_data_length, Some(&response));
        let resource_type = classify(&pending.url, &response.content_type);

        trace!(
            %request_id,
            url = %pending.url,
            transfer_size,
            kind = %resource_type,
            "Resource captured"
        );

        state.resources.push(Resource::new(
            pending.url,
            response.content_type,
            transfer_size,
            response.status,
            resource_type,
        ));
    }

    fn handle_loading_failed(
        state: &Arc<Mutex<MonitorState>>,
        request_id: RequestId,
        error_text: &str,
    ) {
        let mut state = state.lock();
        state.pending.remove(&request_id);
        state.responses.remove(&request_id);
        trace!(%request_id, error = %error_text, "Request failed; record discarded");
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves the transfer size for a completed request.
///
/// The explicit wire measurement wins; a Content-Length header is the
/// fallback estimate; the floor is one byte.
#[must_use]
pub(crate) fn resolve_transfer_size(encoded_data_length: u64, response: Option<&ResponseMeta>) -> u64 {
    if encoded_data_length > 0 {
        return encoded_data_length;
    }

    response
        .and_then(ResponseMeta::content_length)
        .unwrap_or(0)
        .max(1)
}

// ============================================================================
// Tests
// ============================================================================
