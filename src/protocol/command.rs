//! Command definitions organized by module.
//!
//! Commands follow the `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `page` | Navigation, lifecycle, geometry, emulation |
//! | `script` | JavaScript execution |
//! | `input` | Synthetic pointer and text input |
//! | `network` | Lifecycle event channel enable/disable |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page module commands.
    Page(PageCommand),
    /// Script module commands.
    Script(ScriptCommand),
    /// Input module commands.
    Input(InputCommand),
    /// Network module commands.
    Network(NetworkCommand),
}

// ============================================================================
// WaitUntil
// ============================================================================

/// Navigation wait condition, ordered cheapest to most demanding.
///
/// Cheaper conditions fire earlier in the load; [`WaitUntil::NetworkSettled`]
/// additionally requires the remote end's network-quiet heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitUntil {
    /// DOM parsed, subresources may still be loading.
    DomContentLoaded,
    /// Load event fired.
    Load,
    /// Network quiet for the remote end's settle window.
    NetworkSettled,
}

impl WaitUntil {
    /// The lifecycle event name this condition waits for.
    #[inline]
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::DomContentLoaded => "domContentLoaded",
            Self::Load => "load",
            Self::NetworkSettled => "networkSettled",
        }
    }
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page module commands for navigation and page management.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Navigate to URL.
    #[serde(rename = "page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
        /// Wait condition the remote end reports via lifecycle events.
        #[serde(rename = "waitUntil")]
        wait_until: WaitUntil,
    },

    /// Create a new page in the session.
    #[serde(rename = "page.create")]
    Create,

    /// Close this page.
    #[serde(rename = "page.close")]
    Close,

    /// Get page title.
    #[serde(rename = "page.getTitle")]
    GetTitle,

    /// Get current URL.
    #[serde(rename = "page.getUrl")]
    GetUrl,

    /// Get the number of frames in the page.
    #[serde(rename = "page.getFrameCount")]
    GetFrameCount,

    /// Override the viewport dimensions.
    #[serde(rename = "page.setViewport")]
    SetViewport {
        /// Viewport width in CSS pixels.
        width: u32,
        /// Viewport height in CSS pixels.
        height: u32,
        /// Emulate a mobile device (touch, meta viewport).
        mobile: bool,
    },

    /// Override the user agent string.
    #[serde(rename = "page.setUserAgent")]
    SetUserAgent {
        /// User agent string.
        #[serde(rename = "userAgent")]
        user_agent: String,
    },
}

// ============================================================================
// Script Commands
// ============================================================================

/// Script module commands for JavaScript execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptCommand {
    /// Evaluate a script in the page context.
    ///
    /// The script should use `return` to return a value.
    #[serde(rename = "script.evaluate")]
    Evaluate {
        /// Script source.
        script: String,
    },
}

// ============================================================================
// Input Commands
// ============================================================================

/// Synthetic pointer event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    /// Pointer moved.
    Moved,
    /// Button pressed.
    Pressed,
    /// Button released.
    Released,
}

/// Mouse button for synthetic pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle button.
    Middle,
    /// No button (for moves).
    None,
}

/// Input module commands for keyboard and mouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch a trusted pointer event at page coordinates.
    #[serde(rename = "input.dispatchMouse")]
    DispatchMouse {
        /// Event type.
        #[serde(rename = "type")]
        event_type: MouseEventType,
        /// X coordinate in CSS pixels.
        x: f64,
        /// Y coordinate in CSS pixels.
        y: f64,
        /// Button involved.
        button: MouseButton,
    },

    /// Insert text into the focused element.
    #[serde(rename = "input.insertText")]
    InsertText {
        /// Text to insert.
        text: String,
    },
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network module commands controlling the lifecycle event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Enable network lifecycle event delivery for this page.
    #[serde(rename = "network.enable")]
    Enable,

    /// Disable network lifecycle event delivery for this page.
    #[serde(rename = "network.disable")]
    Disable,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_serialization() {
        let command = Command::Page(PageCommand::Navigate {
            url: "https://example.com".to_string(),
            wait_until: WaitUntil::Load,
        });

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["method"], "page.navigate");
        assert_eq!(json["params"]["url"], "https://example.com");
        assert_eq!(json["params"]["waitUntil"], "load");
    }

    #[test]
    fn test_network_enable_serialization() {
        let command = Command::Network(NetworkCommand::Enable);
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["method"], "network.enable");
    }

    #[test]
    fn test_dispatch_mouse_serialization() {
        let command = Command::Input(InputCommand::DispatchMouse {
            event_type: MouseEventType::Pressed,
            x: 10.5,
            y: 20.0,
            button: MouseButton::Left,
        });

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["method"], "input.dispatchMouse");
        assert_eq!(json["params"]["type"], "pressed");
        assert_eq!(json["params"]["button"], "left");
    }

    #[test]
    fn test_wait_until_event_names() {
        assert_eq!(WaitUntil::DomContentLoaded.event_name(), "domContentLoaded");
        assert_eq!(WaitUntil::Load.event_name(), "load");
        assert_eq!(WaitUntil::NetworkSettled.event_name(), "networkSettled");
    }
}
