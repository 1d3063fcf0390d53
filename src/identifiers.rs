//! Type-safe identifiers for protocol and measurement entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time:
//! a command-correlation [`CallId`] can never be handed to code that
//! expects a network [`RequestId`], and vice versa.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CallId
// ============================================================================

/// Identifier correlating a protocol command with its reply.
///
/// Generated locally, one per [`Call`](crate::protocol::Call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    /// Generates a fresh correlation id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// PageId
// ============================================================================

/// Identifier of a driven page within a protocol session.
///
/// Assigned by the remote end; `0` is the primary page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(u32);

impl PageId {
    /// Wraps a raw page id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The primary page of a session.
    #[inline]
    #[must_use]
    pub const fn primary() -> Self {
        Self(0)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Opaque, session-scoped identifier of one network request.
///
/// Assigned by the remote end and only meaningful for correlating the
/// lifecycle events of a single fetch. An id may be reused by the
/// remote end after the request reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wraps a raw request id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Handle for an activity listener registration.
///
/// Returned by [`NetworkMonitor::on_activity`](crate::monitor::NetworkMonitor::on_activity)
/// and consumed by `remove_activity_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw listener id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_id_unique() {
        assert_ne!(CallId::generate(), CallId::generate());
    }

    #[test]
    fn test_page_id_primary() {
        assert_eq!(PageId::primary().as_u32(), 0);
        assert_eq!(PageId::new(7).as_u32(), 7);
    }

    #[test]
    fn test_request_id_roundtrip() {
        let id = RequestId::new("1000.42");
        assert_eq!(id.as_str(), "1000.42");
        assert_eq!(id.to_string(), "1000.42");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""1000.42""#);
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_listener_id_eq() {
        assert_eq!(ListenerId::new(3), ListenerId::new(3));
        assert_ne!(ListenerId::new(3), ListenerId::new(4));
    }
}
