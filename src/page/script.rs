//! JavaScript execution methods.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, ScriptCommand};

use super::Page;

// ============================================================================
// Page - Script Execution
// ============================================================================

impl Page {
    /// Executes JavaScript in the page context.
    ///
    /// The script should use `return` to return a value.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let title = page.execute_script("return document.title").await?;
    /// ```
    pub async fn execute_script(&self, script: &str) -> Result<Value> {
        debug!(page_id = %self.page_id(), script_len = script.len(), "Executing script");

        let result = self
            .send_command(Command::Script(ScriptCommand::Evaluate {
                script: script.to_string(),
            }))
            .await?;

        if let Some(exception) = result.get("exception").and_then(Value::as_str) {
            return Err(Error::script_error(exception));
        }

        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }
}

// ============================================================================
// Tests
// ============================================================================
