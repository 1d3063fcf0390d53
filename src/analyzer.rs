//! Top-level analysis pipeline.
//!
//! Wires the pieces together for one session: device emulation,
//! monitor attachment, navigation with retry, user simulation running
//! concurrently with capture, then cross-origin reconciliation. The
//! whole pipeline runs under the caller-supplied deadline; partial
//! data is returned best-effort, and the only fatal surface is one
//! structured error naming the URL and the phase that was active.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::crossorigin::CrossOriginHandler;
use crate::error::{Error, Result};
use crate::monitor::NetworkMonitor;
use crate::options::AnalysisOptions;
use crate::page::Page;
use crate::resource::ResourceCollection;
use crate::session::PageOpener;
use crate::simulate::{SimulationResult, UserSimulator};

// ============================================================================
// Phase
// ============================================================================

/// Pipeline phase, carried in fatal errors for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Device emulation and monitor attachment.
    Setup,
    /// Navigation retry ladder.
    Navigation,
    /// User simulation with concurrent capture.
    Simulation,
    /// Cross-origin gap reconciliation.
    Reconciliation,
}

impl Phase {
    /// Returns the phase's canonical name.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Navigation => "navigation",
            Self::Simulation => "simulation",
            Self::Reconciliation => "reconciliation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AnalysisReport
// ============================================================================

/// The caller-facing result of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Analyzed page URL.
    pub url: String,
    /// Captured and reconciled resources.
    pub resources: ResourceCollection,
    /// Simulation tally.
    pub simulation: SimulationResult,
}

// ============================================================================
// Analyzer
// ============================================================================

/// Runs the measurement pipeline against a caller-supplied page.
///
/// The caller owns the browser process and the primary page; the
/// analyzer only needs the page handle plus a [`PageOpener`] for the
/// disposable pages cross-origin reconciliation opens.
pub struct Analyzer {
    opener: Arc<dyn PageOpener>,
}

impl Analyzer {
    /// Creates an analyzer using `opener` for disposable pages.
    #[must_use]
    pub fn new(opener: Arc<dyn PageOpener>) -> Self {
        Self { opener }
    }

    /// Measures every resource `url` causes the page to load.
    ///
    /// # Errors
    ///
    /// - The monitor's channel-enable failure, verbatim (setup is the
    ///   one non-recoverable stage)
    /// - [`Error::Navigation`] once the retry ladder is exhausted
    /// - [`Error::Analysis`] when the overall deadline fires, naming
    ///   the URL and the phase that was active
    ///
    /// Everything else degrades: the returned collection is
    /// best-effort and may contain substitute measurements.
    pub async fn run(
        &self,
        page: &Page,
        url: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport> {
        info!(url = %url, device = %options.device.name, "Analysis starting");

        let monitor = Arc::new(NetworkMonitor::new(page));
        let phase = Arc::new(Mutex::new(Phase::Setup));

        let work = self.run_phases(page, url, options, Arc::clone(&monitor), Arc::clone(&phase));

        let outcome = match timeout(options.overall_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                let at = *phase.lock();
                warn!(url = %url, phase = %at, "Overall deadline fired");
                Err(Error::analysis(
                    url,
                    at,
                    format!(
                        "overall deadline of {}ms exceeded",
                        options.overall_timeout.as_millis()
                    ),
                ))
            }
        };

        // Listeners are torn down regardless of which phase was active
        monitor.detach();
        outcome
    }

    async fn run_phases(
        &self,
        page: &Page,
        url: &str,
        options: &AnalysisOptions,
        monitor: Arc<NetworkMonitor>,
        phase: Arc<Mutex<Phase>>,
    ) -> Result<AnalysisReport> {
        *phase.lock() = Phase::Setup;

        // Device emulation is best-effort; a page that rejects it is
        // still measurable
        let device = &options.device;
        if let Err(e) = page
            .set_viewport(device.viewport_width, device.viewport_height, device.mobile)
            .await
        {
            warn!(error = %e, "Viewport override failed");
        }
        if let Err(e) = page.set_user_agent(&device.user_agent).await {
            warn!(error = %e, "User agent override failed");
        }

        monitor.set_primary_url(url);
        monitor.setup_listeners().await?;

        *phase.lock() = Phase::Navigation;
        page.navigate_with_retry(url).await?;

        *phase.lock() = Phase::Simulation;
        let simulator = UserSimulator::new(
            page,
            Arc::clone(&monitor),
            options.interaction_level.simulation_options(),
        );
        let simulation = simulator.run().await;

        *phase.lock() = Phase::Reconciliation;
        let mut resources = ResourceCollection::from_resources(monitor.get_resources());
        let existing: Vec<String> = resources
            .resources()
            .iter()
            .map(|r| r.url.clone())
            .collect();

        let handler = CrossOriginHandler::new(Arc::clone(&self.opener), existing);
        let substitutes = handler
            .process_pending_requests(monitor.get_pending_requests())
            .await;
        let merged = resources.merge(substitutes);
        debug!(merged, "Substitute measurements merged");

        info!(
            url = %url,
            resources = resources.count(),
            total_bytes = resources.total_transfer_size(),
            "Analysis complete"
        );

        Ok(AnalysisReport {
            url: url.to_string(),
            resources,
            simulation,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
