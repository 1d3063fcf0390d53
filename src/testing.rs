//! In-memory transport for unit tests.
//!
//! Stands in for a live automation surface: canned replies per command
//! method, recorded calls for assertions, and an injectable event
//! stream so tests can replay arbitrary network lifecycles.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::identifiers::PageId;
use crate::protocol::{Command, Event};
use crate::session::Transport;

// ============================================================================
// FakeTransport
// ============================================================================

/// Scriptable in-memory [`Transport`].
pub struct FakeTransport {
    events_tx: broadcast::Sender<Event>,
    calls: Mutex<Vec<(PageId, Value)>>,
    replies: Mutex<FxHashMap<String, Value>>,
    script_results: Mutex<VecDeque<Value>>,
    failing: Mutex<FxHashSet<String>>,
    next_page_id: AtomicU32,
    auto_lifecycle: bool,
}

impl FakeTransport {
    /// Creates a transport that answers every command successfully and
    /// emits all lifecycle milestones on navigation.
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            events_tx,
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(FxHashMap::default()),
            script_results: Mutex::new(VecDeque::new()),
            failing: Mutex::new(FxHashSet::default()),
            next_page_id: AtomicU32::new(1),
            auto_lifecycle: true,
        }
    }

    /// Creates a transport that never emits lifecycle events on its own.
    pub fn silent() -> Self {
        Self {
            auto_lifecycle: false,
            ..Self::new()
        }
    }

    /// Sets a canned reply value for a command method.
    pub fn set_reply(&self, method: &str, value: Value) {
        self.replies.lock().insert(method.to_string(), value);
    }

    /// Makes a command method fail with a protocol error.
    pub fn fail_method(&self, method: &str) {
        self.failing.lock().insert(method.to_string());
    }

    /// Queues a result for the next `script.evaluate` call.
    pub fn push_script_result(&self, value: Value) {
        self.script_results.lock().push_back(value);
    }

    /// Returns a sender for injecting events into subscribers.
    pub fn events_sender(&self) -> broadcast::Sender<Event> {
        self.events_tx.clone()
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: Event) {
        let _ = self.events_tx.send(event);
    }

    /// Snapshot of executed `(page, method)` pairs.
    pub fn calls(&self) -> Vec<(PageId, String)> {
        self.calls
            .lock()
            .iter()
            .map(|(page_id, command)| (*page_id, method_of_value(command)))
            .collect()
    }

    /// Number of times a method was executed.
    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|(_, m)| m == method).count()
    }

    /// `(page, url)` pairs of every navigation issued so far.
    pub fn navigations(&self) -> Vec<(PageId, String)> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, command)| method_of_value(command) == "page.navigate")
            .map(|(page_id, command)| {
                let url = command
                    .get("params")
                    .and_then(|p| p.get("url"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (*page_id, url)
            })
            .collect()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, page_id: PageId, command: Command) -> Result<Value> {
        let raw = serde_json::to_value(&command).unwrap_or_default();
        let method = method_of_value(&raw);
        self.calls.lock().push((page_id, raw));

        if self.failing.lock().contains(&method) {
            return Err(Error::protocol(format!("{method} refused")));
        }

        if let Some(value) = self.replies.lock().get(&method) {
            return Ok(value.clone());
        }

        match method.as_str() {
            "page.create" => {
                let id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "pageId": id }))
            }
            "page.navigate" => {
                if self.auto_lifecycle {
                    for name in ["domContentLoaded", "load", "networkSettled"] {
                        let _ = self.events_tx.send(Event::lifecycle(page_id, name));
                    }
                }
                Ok(Value::Null)
            }
            "script.evaluate" => {
                let value = self.script_results.lock().pop_front().unwrap_or(Value::Null);
                Ok(json!({ "value": value }))
            }
            "page.getTitle" => Ok(json!({ "title": "Fake Page" })),
            "page.getUrl" => Ok(json!({ "url": "https://fake.test/" })),
            "page.getFrameCount" => Ok(json!({ "frameCount": 1 })),
            _ => Ok(Value::Null),
        }
    }

    fn events(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn method_of_value(command: &Value) -> String {
    command
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
