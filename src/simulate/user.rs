//! User simulation orchestration.
//!
//! Runs the behavior phases in strict order against the live page
//! while the network monitor captures concurrently. Every phase is
//! best-effort: a failure is logged and later phases still run, so a
//! hostile page degrades the measurement instead of aborting it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::monitor::NetworkMonitor;
use crate::options::SimulationOptions;
use crate::page::Page;

use super::behavior::BehaviorSimulator;
use super::finder::{ElementFinder, ElementInfo};
use super::interact::Interactor;

// ============================================================================
// Constants
// ============================================================================

/// Pause after a successful interaction, letting triggered loads start
/// before the next element is worked.
const INTERACTION_SETTLE: Duration = Duration::from_secs(1);

/// Quiet window for the final settlement wait.
const FINAL_IDLE_TIME: Duration = Duration::from_secs(5);

/// Ceiling for the final settlement wait.
const FINAL_MAX_WAIT: Duration = Duration::from_secs(30);

/// Alternate widths for the viewport sweep phase.
const SWEEP_WIDTHS: [u32; 2] = [480, 1024];

// ============================================================================
// SimulationResult
// ============================================================================

/// Tally of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Interactions attempted.
    #[serde(rename = "totalInteractions")]
    pub total_interactions: u32,
    /// Interactions that landed.
    #[serde(rename = "successfulInteractions")]
    pub successful_interactions: u32,
    /// Pages driven during the session.
    #[serde(rename = "pagesExplored")]
    pub pages_explored: u32,
    /// Whether any network activity was observed while simulating.
    #[serde(rename = "networkActivity")]
    pub network_activity: bool,
}

// ============================================================================
// UserSimulator
// ============================================================================

/// Drives the page through the simulation phases.
pub struct UserSimulator {
    page: Page,
    monitor: Arc<NetworkMonitor>,
    options: SimulationOptions,
}

impl UserSimulator {
    /// Creates a simulator bound to a page and its monitor.
    #[must_use]
    pub fn new(page: &Page, monitor: Arc<NetworkMonitor>, options: SimulationOptions) -> Self {
        Self {
            page: page.clone(),
            monitor,
            options,
        }
    }

    /// Runs all phases and returns the tally.
    ///
    /// Infallible by design: phase errors are logged and absorbed, and
    /// the final settlement accepts both idle outcomes.
    pub async fn run(&self) -> SimulationResult {
        let mut result = SimulationResult {
            pages_explored: 1,
            ..SimulationResult::default()
        };

        // Observed activity is the honest signal; resource counts miss
        // requests that never finish
        let saw_activity = Arc::new(AtomicBool::new(false));
        let listener_id = self.monitor.on_activity({
            let saw_activity = Arc::clone(&saw_activity);
            move |_| saw_activity.store(true, Ordering::Relaxed)
        });

        let behavior = BehaviorSimulator::new(&self.page);

        // Phase 1: structure exploration, diagnostics only
        if let Err(e) = self.explore_structure().await {
            warn!(error = %e, "Structure exploration failed");
        }

        // Phase 2: reading scroll
        match behavior
            .reading_scroll(self.options.max_scroll_steps, self.options.return_to_top)
            .await
        {
            Ok(steps) => debug!(steps, "Reading pass complete"),
            Err(e) => warn!(error = %e, "Reading pass failed"),
        }

        // Phase 3: discovery plus sequential interaction
        let elements = self.discover_elements().await;
        self.interact_with(&elements, &mut result).await;

        // Phase 4: optional passes
        if self.options.hover
            && let Err(e) = behavior
                .hover_pass(&elements, self.options.max_interactions)
                .await
        {
            warn!(error = %e, "Hover pass failed");
        }

        if self.options.fill_forms
            && let Err(e) = behavior.fill_forms().await
        {
            warn!(error = %e, "Form fill failed");
        }

        if self.options.viewport_sweep {
            if let Err(e) = self.viewport_sweep(&behavior).await {
                warn!(error = %e, "Viewport sweep failed");
            }
        }

        // Phase 5: final settlement; interaction-triggered loads can
        // lag the interaction that caused them
        let outcome = self
            .monitor
            .wait_for_network_idle(FINAL_IDLE_TIME, FINAL_MAX_WAIT)
            .await;
        debug!(?outcome, "Final settlement");

        self.monitor.remove_activity_listener(listener_id);
        result.network_activity = saw_activity.load(Ordering::Relaxed);

        info!(
            total = result.total_interactions,
            successful = result.successful_interactions,
            network_activity = result.network_activity,
            "Simulation complete"
        );
        result
    }

    /// Phase 1: title, frame count, viewport and page size.
    async fn explore_structure(&self) -> crate::error::Result<()> {
        let title = self.page.get_title().await?;
        let frames = self.page.get_frame_count().await?;
        let viewport = self.page.get_viewport_size().await?;
        let page_size = self.page.get_page_size().await?;

        debug!(
            title = %title,
            frames,
            viewport_w = viewport.0,
            viewport_h = viewport.1,
            page_w = page_size.0,
            page_h = page_size.1,
            "Page structure"
        );
        Ok(())
    }

    /// Phase 3a: discovery, absorbed on failure.
    async fn discover_elements(&self) -> Vec<ElementInfo> {
        match ElementFinder::new(&self.page)
            .discover_interactive(self.options.max_interactions)
            .await
        {
            Ok(elements) => elements,
            Err(e) => {
                warn!(error = %e, "Element discovery failed");
                Vec::new()
            }
        }
    }

    /// Phase 3b: sequential interaction with settle pauses.
    ///
    /// Element N+1 does not start before element N's interaction and
    /// settle window complete, preserving causal attribution of the
    /// traffic each one triggers.
    async fn interact_with(&self, elements: &[ElementInfo], result: &mut SimulationResult) {
        let interactor = Interactor::new(&self.page);

        for element in elements {
            let outcome = interactor.click(element).await;
            result.total_interactions += 1;

            if outcome.success {
                result.successful_interactions += 1;
                sleep(INTERACTION_SETTLE).await;
            }
        }
    }

    async fn viewport_sweep(&self, behavior: &BehaviorSimulator) -> crate::error::Result<()> {
        let (width, height) = self.page.get_viewport_size().await?;
        let base = (width.max(1) as u32, height.max(1) as u32);
        behavior.viewport_sweep(base, &SWEEP_WIDTHS).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::PageId;
    use crate::options::InteractionLevel;
    use crate::testing::FakeTransport;

    fn scripted_page(transport: &Arc<FakeTransport>) -> Page {
        Page::new(PageId::primary(), Arc::clone(transport) as _)
    }

    async fn attached(page: &Page) -> Arc<NetworkMonitor> {
        let monitor = Arc::new(NetworkMonitor::new(page));
        monitor.setup_listeners().await.unwrap();
        monitor
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_elements_completes_cleanly() {
        let transport = Arc::new(FakeTransport::new());
        let page = scripted_page(&transport);
        let monitor = attached(&page).await;

        // Viewport, page size, scroll metrics, discovery: all empty-ish
        transport.push_script_result(json!({ "width": 1280, "height": 720 }));
        transport.push_script_result(json!({ "width": 1280, "height": 720 }));
        transport.push_script_result(json!({
            "scrollHeight": 700.0, "viewportHeight": 720.0, "scrollY": 0.0
        }));
        transport.push_script_result(json!([]));

        let simulator = UserSimulator::new(
            &page,
            monitor,
            InteractionLevel::Quick.simulation_options(),
        );
        let result = simulator.run().await;

        assert_eq!(result.total_interactions, 0);
        assert_eq!(result.successful_interactions, 0);
        assert_eq!(result.pages_explored, 1);
        assert!(!result.network_activity);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactions_tallied() {
        let transport = Arc::new(FakeTransport::new());
        let page = scripted_page(&transport);
        let monitor = attached(&page).await;

        transport.push_script_result(json!({ "width": 1280, "height": 720 }));
        transport.push_script_result(json!({ "width": 1280, "height": 720 }));
        transport.push_script_result(json!({
            "scrollHeight": 700.0, "viewportHeight": 720.0, "scrollY": 0.0
        }));
        // Two discovered elements; first script click lands, second
        // misses and falls back to pointer events
        transport.push_script_result(json!([
            { "selector": "#a", "text": "A", "x": 0.0, "y": 0.0, "width": 10.0,
              "height": 10.0, "interactive": true, "disabled": false },
            { "selector": "#b", "text": "B", "x": 0.0, "y": 0.0, "width": 10.0,
              "height": 10.0, "interactive": true, "disabled": false },
        ]));
        transport.push_script_result(json!(true));
        transport.push_script_result(json!(false));

        let simulator = UserSimulator::new(
            &page,
            monitor,
            InteractionLevel::Quick.simulation_options(),
        );
        let result = simulator.run().await;

        assert_eq!(result.total_interactions, 2);
        assert_eq!(result.successful_interactions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_failure_does_not_abort_later_phases() {
        let transport = Arc::new(FakeTransport::new());
        let page = scripted_page(&transport);
        let monitor = attached(&page).await;

        // Every script call fails: structure, scroll, discovery all
        // degrade, but the run still completes with a tally
        transport.fail_method("script.evaluate");

        let simulator = UserSimulator::new(
            &page,
            monitor,
            InteractionLevel::Quick.simulation_options(),
        );
        let result = simulator.run().await;

        assert_eq!(result.total_interactions, 0);
        assert_eq!(result.pages_explored, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_activity_flag_reflects_observation() {
        let transport = Arc::new(FakeTransport::new());
        let page = scripted_page(&transport);
        let monitor = attached(&page).await;

        transport.fail_method("script.evaluate");

        // Inject traffic while the simulation runs
        let feeder = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                transport.emit(crate::protocol::Event::request_will_be_sent(
                    PageId::primary(),
                    "1",
                    "https://example.com/lazy.png",
                    "GET",
                ));
            }
        });

        let simulator = UserSimulator::new(
            &page,
            monitor,
            InteractionLevel::Quick.simulation_options(),
        );
        let result = simulator.run().await;
        feeder.await.unwrap();

        assert!(result.network_activity);
    }
}
