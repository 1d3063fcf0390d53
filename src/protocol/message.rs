//! Call and Reply wire messages.
//!
//! Defines the message format for command calls and their replies
//! between the local end (this crate) and the remote end (the
//! automation surface driving the browser).

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CallId, PageId};

use super::Command;

// ============================================================================
// Call
// ============================================================================

/// A command call from the local end to the remote end.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "pageId": 0,
///   "method": "page.navigate",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Call {
    /// Unique identifier for call/reply correlation.
    pub id: CallId,

    /// Target page ID.
    #[serde(rename = "pageId")]
    pub page_id: PageId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Call {
    /// Creates a new call with an auto-generated correlation id.
    #[inline]
    #[must_use]
    pub fn new(page_id: PageId, command: Command) -> Self {
        Self {
            id: CallId::generate(),
            page_id,
            command,
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Reply type marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyType {
    /// Command succeeded.
    Success,
    /// Command failed.
    Error,
}

/// A reply from the remote end to the local end.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": "uuid", "type": "error", "error": "code", "message": "..." }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    /// Matches the call `id`.
    pub id: CallId,

    /// Reply type.
    #[serde(rename = "type")]
    pub reply_type: ReplyType,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default)]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default)]
    pub message: Option<String>,
}

impl Reply {
    /// Converts the reply into its result value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the remote end reported an error.
    pub fn into_result(self) -> Result<Value> {
        match self.reply_type {
            ReplyType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ReplyType::Error => {
                let code = self.error.unwrap_or_else(|| "unknown".to_string());
                let message = self.message.unwrap_or_default();
                Err(Error::protocol(format!("{code}: {message}")))
            }
        }
    }

    /// Extracts a string field from the result, empty if absent.
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Extracts an unsigned integer field from the result, 0 if absent.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{NetworkCommand, PageCommand, WaitUntil};

    #[test]
    fn test_call_serialization() {
        let call = Call::new(
            PageId::new(3),
            Command::Page(PageCommand::Navigate {
                url: "https://example.com".to_string(),
                wait_until: WaitUntil::DomContentLoaded,
            }),
        );

        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["pageId"], 3);
        assert_eq!(json["method"], "page.navigate");
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_call_ids_unique() {
        let a = Call::new(PageId::primary(), Command::Network(NetworkCommand::Enable));
        let b = Call::new(PageId::primary(), Command::Network(NetworkCommand::Enable));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_success_reply() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success",
            "result": { "title": "Example", "frameCount": 2 }
        }"#;

        let reply: Reply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.reply_type, ReplyType::Success);
        assert_eq!(reply.get_str("title"), "Example");
        assert_eq!(reply.get_u64("frameCount"), 2);

        let value = reply.into_result().unwrap();
        assert_eq!(value["title"], "Example");
    }

    #[test]
    fn test_error_reply() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "error",
            "error": "no such page",
            "message": "page 9 is gone"
        }"#;

        let reply: Reply = serde_json::from_str(json).unwrap();
        let err = reply.into_result().unwrap_err();
        assert!(err.to_string().contains("no such page"));
    }

    #[test]
    fn test_reply_missing_fields() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success"
        }"#;

        let reply: Reply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.get_str("absent"), "");
        assert_eq!(reply.get_u64("absent"), 0);
        assert_eq!(reply.into_result().unwrap(), Value::Null);
    }
}
