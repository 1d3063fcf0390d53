//! Event message types.
//!
//! Events are notifications pushed from the remote end when browser
//! activity occurs. They are unordered and correlated only by the
//! opaque request id carried in their params.
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `network` | `requestWillBeSent`, `responseReceived`, `loadingFinished`, `loadingFailed` |
//! | `page` | `lifecycle` (`domContentLoaded`, `load`, `networkSettled`) |

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::identifiers::{PageId, RequestId};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the remote end.
///
/// # Format
///
/// ```json
/// {
///   "method": "network.requestWillBeSent",
///   "pageId": 0,
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event name in `module.eventName` format.
    pub method: String,

    /// Page the event originated from.
    #[serde(rename = "pageId")]
    pub page_id: PageId,

    /// Event-specific data.
    pub params: Value,
}

impl Event {
    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "network.requestWillBeSent" => ParsedEvent::RequestWillBeSent {
                request_id: self.request_id(),
                url: self.param_str("url"),
                method: self.param_str("method"),
            },
            "network.responseReceived" => ParsedEvent::ResponseReceived {
                request_id: self.request_id(),
                status: self
                    .params
                    .get("status")
                    .and_then(Value::as_u64)
                    .unwrap_or_default() as u16,
                mime_type: self.param_str("mimeType"),
                headers: self.headers(),
            },
            "network.loadingFinished" => ParsedEvent::LoadingFinished {
                request_id: self.request_id(),
                encoded_data_length: self
                    .params
                    .get("encodedDataLength")
                    .and_then(Value::as_u64)
                    .unwrap_or_default(),
            },
            "network.loadingFailed" => ParsedEvent::LoadingFailed {
                request_id: self.request_id(),
                error_text: self.param_str("errorText"),
            },
            "page.lifecycle" => ParsedEvent::PageLifecycle {
                name: self.param_str("name"),
            },
            _ => ParsedEvent::Unknown,
        }
    }

    fn request_id(&self) -> RequestId {
        RequestId::new(
            self.params
                .get("requestId")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        )
    }

    fn param_str(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn headers(&self) -> HashMap<String, String> {
        self.params
            .get("headers")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.to_ascii_lowercase(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Event - Constructors
// ============================================================================

impl Event {
    /// Creates a `network.requestWillBeSent` event.
    #[must_use]
    pub fn request_will_be_sent(
        page_id: PageId,
        request_id: impl Into<String>,
        url: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            method: "network.requestWillBeSent".to_string(),
            page_id,
            params: json!({
                "requestId": request_id.into(),
                "url": url.into(),
                "method": method.into(),
            }),
        }
    }

    /// Creates a `network.responseReceived` event.
    #[must_use]
    pub fn response_received(
        page_id: PageId,
        request_id: impl Into<String>,
        status: u16,
        mime_type: impl Into<String>,
        headers: Value,
    ) -> Self {
        Self {
            method: "network.responseReceived".to_string(),
            page_id,
            params: json!({
                "requestId": request_id.into(),
                "status": status,
                "mimeType": mime_type.into(),
                "headers": headers,
            }),
        }
    }

    /// Creates a `network.loadingFinished` event.
    #[must_use]
    pub fn loading_finished(
        page_id: PageId,
        request_id: impl Into<String>,
        encoded_data_length: u64,
    ) -> Self {
        Self {
            method: "network.loadingFinished".to_string(),
            page_id,
            params: json!({
                "requestId": request_id.into(),
                "encodedDataLength": encoded_data_length,
            }),
        }
    }

    /// Creates a `network.loadingFailed` event.
    #[must_use]
    pub fn loading_failed(
        page_id: PageId,
        request_id: impl Into<String>,
        error_text: impl Into<String>,
    ) -> Self {
        Self {
            method: "network.loadingFailed".to_string(),
            page_id,
            params: json!({
                "requestId": request_id.into(),
                "errorText": error_text.into(),
            }),
        }
    }

    /// Creates a `page.lifecycle` event.
    #[must_use]
    pub fn lifecycle(page_id: PageId, name: impl Into<String>) -> Self {
        Self {
            method: "page.lifecycle".to_string(),
            page_id,
            params: json!({ "name": name.into() }),
        }
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// A network request started.
    RequestWillBeSent {
        /// Opaque request id.
        request_id: RequestId,
        /// Request URL.
        url: String,
        /// HTTP method.
        method: String,
    },

    /// Response metadata arrived for a request.
    ResponseReceived {
        /// Opaque request id.
        request_id: RequestId,
        /// HTTP status code.
        status: u16,
        /// Response MIME type.
        mime_type: String,
        /// Response headers, keys lowercased.
        headers: HashMap<String, String>,
    },

    /// A request finished loading.
    LoadingFinished {
        /// Opaque request id.
        request_id: RequestId,
        /// Encoded (wire) bytes transferred.
        encoded_data_length: u64,
    },

    /// A request failed.
    LoadingFailed {
        /// Opaque request id.
        request_id: RequestId,
        /// Remote error description.
        error_text: String,
    },

    /// Page reached a lifecycle milestone.
    PageLifecycle {
        /// Milestone name (`domContentLoaded`, `load`, `networkSettled`).
        name: String,
    },

    /// Unrecognized event method.
    Unknown,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_and_event_name() {
        let event = Event::lifecycle(PageId::primary(), "load");
        assert_eq!(event.module(), "page");
        assert_eq!(event.event_name(), "lifecycle");
    }

    #[test]
    fn test_parse_request_will_be_sent() {
        let event = Event::request_will_be_sent(
            PageId::primary(),
            "77.1",
            "https://example.com/app.js",
            "GET",
        );

        match event.parse() {
            ParsedEvent::RequestWillBeSent {
                request_id,
                url,
                method,
            } => {
                assert_eq!(request_id.as_str(), "77.1");
                assert_eq!(url, "https://example.com/app.js");
                assert_eq!(method, "GET");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_lowercases_headers() {
        let event = Event::response_received(
            PageId::primary(),
            "77.1",
            200,
            "text/css",
            json!({ "Content-Length": "12000" }),
        );

        match event.parse() {
            ParsedEvent::ResponseReceived {
                status, headers, ..
            } => {
                assert_eq!(status, 200);
                assert_eq!(headers.get("content-length").map(String::as_str), Some("12000"));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_loading_finished() {
        let event = Event::loading_finished(PageId::new(2), "9", 4096);

        match event.parse() {
            ParsedEvent::LoadingFinished {
                request_id,
                encoded_data_length,
            } => {
                assert_eq!(request_id.as_str(), "9");
                assert_eq!(encoded_data_length, 4096);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_method() {
        let event = Event {
            method: "gremlin.appeared".to_string(),
            page_id: PageId::primary(),
            params: Value::Null,
        };
        assert!(matches!(event.parse(), ParsedEvent::Unknown));
    }
}
