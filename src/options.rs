//! Analysis configuration.
//!
//! Callers choose an interaction level and device profile; the
//! concrete simulation knobs derive from those presets.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// InteractionLevel
// ============================================================================

/// How aggressively the simulator works the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionLevel {
    /// A few scroll steps and clicks; fastest.
    Quick,
    /// Balanced coverage; the default.
    Standard,
    /// Everything on: hover, forms, viewport sweep.
    Thorough,
}

impl InteractionLevel {
    /// Expands the level into concrete simulation knobs.
    #[must_use]
    pub fn simulation_options(self) -> SimulationOptions {
        match self {
            Self::Quick => SimulationOptions {
                max_interactions: 3,
                max_scroll_steps: 3,
                hover: false,
                fill_forms: false,
                viewport_sweep: false,
                return_to_top: false,
            },
            Self::Standard => SimulationOptions {
                max_interactions: 8,
                max_scroll_steps: 6,
                hover: true,
                fill_forms: false,
                viewport_sweep: false,
                return_to_top: true,
            },
            Self::Thorough => SimulationOptions {
                max_interactions: 15,
                max_scroll_steps: 10,
                hover: true,
                fill_forms: true,
                viewport_sweep: true,
                return_to_top: true,
            },
        }
    }
}

// ============================================================================
// SimulationOptions
// ============================================================================

/// Concrete simulation knobs, usually derived from an
/// [`InteractionLevel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Cap on click-style interactions.
    pub max_interactions: usize,
    /// Cap on reading-scroll steps.
    pub max_scroll_steps: u32,
    /// Run the hover pass.
    pub hover: bool,
    /// Fill form fields.
    pub fill_forms: bool,
    /// Cycle the viewport through alternate widths.
    pub viewport_sweep: bool,
    /// Scroll back to the top after the reading pass.
    pub return_to_top: bool,
}

// ============================================================================
// DeviceProfile
// ============================================================================

/// Emulated device applied to the page before navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Profile name for logs and reports.
    pub name: String,
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
    /// Viewport height in CSS pixels.
    pub viewport_height: u32,
    /// User agent string.
    pub user_agent: String,
    /// Emulate a mobile device.
    pub mobile: bool,
}

impl DeviceProfile {
    /// A common desktop profile.
    #[must_use]
    pub fn desktop() -> Self {
        Self {
            name: "desktop".to_string(),
            viewport_width: 1366,
            viewport_height: 768,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0"
                .to_string(),
            mobile: false,
        }
    }

    /// A common phone profile.
    #[must_use]
    pub fn phone() -> Self {
        Self {
            name: "phone".to_string(),
            viewport_width: 390,
            viewport_height: 844,
            user_agent: "Mozilla/5.0 (Android 14; Mobile; rv:133.0) Gecko/133.0 Firefox/133.0"
                .to_string(),
            mobile: true,
        }
    }
}

// ============================================================================
// AnalysisOptions
// ============================================================================

/// Caller-facing analysis configuration.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Interaction aggressiveness.
    pub interaction_level: InteractionLevel,
    /// Emulated device.
    pub device: DeviceProfile,
    /// Ceiling for the whole pipeline, navigation through
    /// reconciliation.
    pub overall_timeout: Duration,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            interaction_level: InteractionLevel::Standard,
            device: DeviceProfile::desktop(),
            overall_timeout: Duration::from_secs(120),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
