//! WebSocket transport layer.
//!
//! Adapts a WebSocket endpoint exposing the automation protocol into
//! the [`Transport`](crate::session::Transport) seam the engine
//! consumes. The caller owns endpoint discovery and the browser
//! process; this layer only speaks the wire.

mod connection;

pub use connection::Connection;
