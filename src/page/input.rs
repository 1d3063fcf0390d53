//! Synthetic pointer and text input.
//!
//! Trusted input events dispatched through the protocol, as opposed to
//! in-page script dispatch. Some third-party widgets honor only one of
//! the two, which is why the interaction strategies try both.

use tracing::debug;

use crate::error::Result;
use crate::protocol::{Command, InputCommand, MouseButton, MouseEventType};

use super::Page;

// ============================================================================
// Page - Input
// ============================================================================

impl Page {
    /// Moves the pointer to page coordinates.
    pub async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        self.send_command(Command::Input(InputCommand::DispatchMouse {
            event_type: MouseEventType::Moved,
            x,
            y,
            button: MouseButton::None,
        }))
        .await?;
        Ok(())
    }

    /// Clicks at page coordinates with the primary button.
    ///
    /// Dispatches the full move, press, release sequence.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        debug!(page_id = %self.page_id(), x, y, "Clicking at");

        self.move_mouse(x, y).await?;

        self.send_command(Command::Input(InputCommand::DispatchMouse {
            event_type: MouseEventType::Pressed,
            x,
            y,
            button: MouseButton::Left,
        }))
        .await?;

        self.send_command(Command::Input(InputCommand::DispatchMouse {
            event_type: MouseEventType::Released,
            x,
            y,
            button: MouseButton::Left,
        }))
        .await?;

        Ok(())
    }

    /// Inserts text into the focused element.
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        debug!(page_id = %self.page_id(), text_len = text.len(), "Inserting text");
        self.send_command(Command::Input(InputCommand::InsertText {
            text: text.to_string(),
        }))
        .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
