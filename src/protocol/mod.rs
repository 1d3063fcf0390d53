//! Protocol message types.
//!
//! Defines the command, reply, and event structures exchanged with the
//! automation surface driving the browser. Commands follow the
//! `module.methodName` format; the four network lifecycle events are
//! the contract the measurement engine is built on.

// ============================================================================
// Submodules
// ============================================================================

pub mod command;
pub mod event;
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    Command, InputCommand, MouseButton, MouseEventType, NetworkCommand, PageCommand,
    ScriptCommand, WaitUntil,
};
pub use event::{Event, ParsedEvent};
pub use message::{Call, Reply, ReplyType};
