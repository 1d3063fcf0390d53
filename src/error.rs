//! Error types for the measurement engine.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::MonitorAlreadyAttached`] |
//! | Execution | [`Error::ScriptError`], [`Error::Timeout`], [`Error::CallTimeout`] |
//! | Pipeline | [`Error::Navigation`], [`Error::Analysis`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::InvalidUrl`] |
//!
//! The split matters for recovery: per-request network anomalies and
//! interaction failures are handled locally and never surface here, so
//! every variant below represents either a fatal session condition or
//! an exhausted retry policy.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::analyzer::Phase;
use crate::identifiers::CallId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport connection failed.
    ///
    /// Returned when the protocol connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the remote end.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Transport connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected reply.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Network monitor listeners were attached twice on one instance.
    ///
    /// A monitor subscribes its lifecycle handlers exactly once; create
    /// a new monitor (or call `reset`) instead of re-attaching.
    #[error("Network monitor listeners already attached")]
    MonitorAlreadyAttached,

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// JavaScript execution error in the page context.
    #[error("Script error: {message}")]
    ScriptError {
        /// Error message from script execution.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Protocol command timed out waiting for its reply.
    #[error("Call {call_id} timed out after {timeout_ms}ms")]
    CallTimeout {
        /// The correlation id that timed out.
        call_id: CallId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// Navigation failed after exhausting the retry policy.
    #[error("Navigation to {url} failed after {attempts} attempts: {last_error}")]
    Navigation {
        /// URL that could not be reached.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last attempt's error, stringified.
        last_error: String,
    },

    /// The analysis pipeline failed fatally.
    ///
    /// The single structured error surfaced to callers; names the
    /// target URL and the phase that was active when it fired.
    #[error("Analysis of {url} failed during {phase}: {message}")]
    Analysis {
        /// Target page URL.
        url: String,
        /// Pipeline phase active at failure.
        phase: Phase,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a call timeout error.
    #[inline]
    pub fn call_timeout(call_id: CallId, timeout_ms: u64) -> Self {
        Self::CallTimeout {
            call_id,
            timeout_ms,
        }
    }

    /// Creates a navigation error.
    #[inline]
    pub fn navigation(
        url: impl Into<String>,
        attempts: u32,
        last_error: impl Into<String>,
    ) -> Self {
        Self::Navigation {
            url: url.into(),
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Creates an analysis error.
    #[inline]
    pub fn analysis(url: impl Into<String>, phase: Phase, message: impl Into<String>) -> Self {
        Self::Analysis {
            url: url.into(),
            phase,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::CallTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::CallTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
