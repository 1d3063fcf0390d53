//! Page Meter - Browser-driven page resource measurement engine.
//!
//! This library drives an already-running browser page through
//! realistic user behavior, captures every network resource the page
//! causes to load, and returns a classified, aggregated inventory for
//! downstream impact estimation.
//!
//! # Architecture
//!
//! The engine consumes a pre-configured protocol session; the caller
//! owns the browser process and page creation:
//!
//! - **Network Monitor**: correlates the four lifecycle events into an
//!   ordered resource list with idle detection
//! - **User Simulator**: scrolls, hovers, and clicks so lazily-loaded
//!   and interaction-gated resources are fetched while capture runs
//! - **Cross-origin reconciliation**: re-measures sub-requests the
//!   protocol reported started but never finished, on disposable pages
//!
//! Key design principles:
//!
//! - Protocol uses `module.methodName` format over a [`Transport`] seam
//! - Element descriptors are plain values, re-resolved by selector
//! - Every bounded operation returns rather than hangs; partial data
//!   degrades the measurement instead of failing it
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use page_meter::{AnalysisOptions, Analyzer, Connection, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Connect to an automation endpoint the caller has launched
//!     let connection = Connection::connect("ws://127.0.0.1:9222/session").await?;
//!     let session = Session::over(Arc::new(connection));
//!
//!     let page = session.primary_page();
//!     let analyzer = Analyzer::new(Arc::new(session));
//!
//!     let report = analyzer
//!         .run(&page, "https://example.com", &AnalysisOptions::default())
//!         .await?;
//!
//!     println!(
//!         "{} resources, {} bytes",
//!         report.resources.count(),
//!         report.resources.total_transfer_size()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`analyzer`] | Top-level pipeline and [`AnalysisReport`] |
//! | [`classify`] | Pure resource classification |
//! | [`crossorigin`] | Cross-origin gap reconciliation |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`monitor`] | Network lifecycle monitoring |
//! | [`options`] | Analysis configuration |
//! | [`page`] | The driven page handle |
//! | [`protocol`] | Protocol message types (internal) |
//! | [`resource`] | Resources and aggregation |
//! | [`session`] | Transport seam and session handle |
//! | [`simulate`] | Synthetic user behavior |
//! | [`transport`] | WebSocket transport adapter |

// ============================================================================
// Modules
// ============================================================================

/// Top-level analysis pipeline.
pub mod analyzer;

/// Pure resource classification.
pub mod classify;

/// Cross-origin gap reconciliation.
pub mod crossorigin;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol and measurement entities.
pub mod identifiers;

/// Network lifecycle monitoring.
pub mod monitor;

/// Analysis configuration.
pub mod options;

/// The driven page handle.
pub mod page;

/// Protocol message types.
///
/// Internal module defining command/reply/event structures.
pub mod protocol;

/// Measured resources and their aggregation.
pub mod resource;

/// Protocol session boundary.
pub mod session;

/// Synthetic user behavior.
pub mod simulate;

/// WebSocket transport layer.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Pipeline types
pub use analyzer::{AnalysisReport, Analyzer, Phase};

// Classification types
pub use classify::{ResourceType, classify};

// Cross-origin types
pub use crossorigin::{CrossOriginFetcher, CrossOriginHandler};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CallId, ListenerId, PageId, RequestId};

// Monitor types
pub use monitor::{
    ActivityKind, IdleOutcome, NetworkMonitor, OriginRelation, PendingRequest, ResponseMeta,
};

// Option types
pub use options::{AnalysisOptions, DeviceProfile, InteractionLevel, SimulationOptions};

// Page types
pub use page::{Page, ScrollMetrics};

// Resource types
pub use resource::{Resource, ResourceCollection};

// Session types
pub use session::{PageOpener, Session, Transport};

// Simulation types
pub use simulate::{
    BehaviorSimulator, ElementFinder, ElementInfo, InteractionOutcome, Interactor,
    SimulationResult, Technique, UserSimulator,
};

// Transport types
pub use transport::Connection;
