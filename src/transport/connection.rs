//! WebSocket connection and event loop.
//!
//! Handles call/reply correlation and event fan-out for one protocol
//! session. The connection spawns a tokio task that owns the socket:
//!
//! - Outgoing calls from the Rust API, correlated by [`CallId`]
//! - Incoming replies, routed to the waiting caller
//! - Incoming events, broadcast to every subscriber

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CallId, PageId};
use crate::protocol::{Call, Command, Event, Reply};
use crate::session::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum in-flight calls before rejecting new ones.
const MAX_PENDING_CALLS: usize = 100;

/// Capacity of the event broadcast channel.
///
/// A full session load can burst hundreds of lifecycle events; slow
/// subscribers that lag past this window miss events rather than
/// blocking the socket.
const EVENT_CHANNEL_CAPACITY: usize = 2048;

// ============================================================================
// Types
// ============================================================================

/// Socket type after the TLS-or-plain handshake.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Map of call IDs to reply channels.
type CorrelationMap = FxHashMap<CallId, oneshot::Sender<Result<Reply>>>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a call and wait for its reply.
    Send {
        call: Call,
        reply_tx: oneshot::Sender<Result<Reply>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(CallId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the automation surface.
///
/// Handles call/reply correlation and event broadcasting. The
/// connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and can be shared across tasks.
/// All operations are non-blocking.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Event broadcast sender (shared with event loop).
    events_tx: broadcast::Sender<Event>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            events_tx: self.events_tx.clone(),
        }
    }
}

impl Connection {
    /// Connects to a protocol WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the handshake fails.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        debug!(endpoint = %endpoint, "Connecting");
        let (ws_stream, _) = connect_async(endpoint).await?;
        Ok(Self::new(ws_stream))
    }

    /// Creates a connection from an established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    #[must_use]
    pub fn new(ws_stream: WsStream) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            events_tx.clone(),
        ));

        Self {
            command_tx,
            correlation,
            events_tx,
        }
    }

    /// Sends a call and waits for its reply with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::CallTimeout`] if the reply does not arrive in time
    /// - [`Error::Protocol`] if too many calls are in flight
    pub async fn send(&self, call: Call) -> Result<Reply> {
        self.send_with_timeout(call, DEFAULT_CALL_TIMEOUT).await
    }

    /// Sends a call and waits for its reply with a custom timeout.
    pub async fn send_with_timeout(&self, call: Call, call_timeout: Duration) -> Result<Reply> {
        let call_id = call.id;

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_CALLS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_CALLS,
                    "Too many pending calls"
                );
                return Err(Error::protocol(format!(
                    "Too many pending calls: {}/{}",
                    correlation.len(),
                    MAX_PENDING_CALLS
                )));
            }
        }

        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send { call, reply_tx })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(call_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                // Timeout - clean up correlation entry
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(call_id));

                Err(Error::call_timeout(call_id, call_timeout.as_millis() as u64))
            }
        }
    }

    /// Returns the number of in-flight calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Shuts down the connection gracefully.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        events_tx: broadcast::Sender<Event>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming messages from the remote end
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &events_tx);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { call, reply_tx }) => {
                            Self::handle_send_command(
                                call,
                                reply_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(call_id)) => {
                            correlation.lock().remove(&call_id);
                            debug!(%call_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Fail all in-flight calls on shutdown
        Self::fail_pending_calls(&correlation);

        debug!("Event loop terminated");
    }

    /// Handles an incoming text message from the remote end.
    fn handle_incoming_message(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        events_tx: &broadcast::Sender<Event>,
    ) {
        // Try to parse as Reply first
        if let Ok(reply) = from_str::<Reply>(text) {
            let tx = correlation.lock().remove(&reply.id);

            if let Some(tx) = tx {
                let _ = tx.send(Ok(reply));
            } else {
                warn!(id = %reply.id, "Reply for unknown call");
            }

            return;
        }

        // Then as Event
        if let Ok(event) = from_str::<Event>(text) {
            trace!(method = %event.method, page_id = %event.page_id, "Event received");
            // No subscribers is fine; the send error carries nothing useful.
            let _ = events_tx.send(event);
            return;
        }

        warn!(text = %text, "Failed to parse incoming message");
    }

    /// Handles a send command from the Rust API.
    async fn handle_send_command(
        call: Call,
        reply_tx: oneshot::Sender<Result<Reply>>,
        ws_write: &mut SplitSink<WsStream, Message>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) {
        let call_id = call.id;

        let json = match to_string(&call) {
            Ok(j) => j,
            Err(e) => {
                let _ = reply_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(call_id, reply_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            // Remove correlation and notify caller
            if let Some(tx) = correlation.lock().remove(&call_id) {
                let _ = tx.send(Err(Error::connection(e.to_string())));
            }
        }

        trace!(%call_id, "Call sent");
    }

    /// Fails all in-flight calls with ConnectionClosed.
    fn fail_pending_calls(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed in-flight calls on shutdown");
        }
    }
}

// ============================================================================
// Connection - Transport
// ============================================================================

#[async_trait]
impl Transport for Connection {
    async fn execute(&self, page_id: PageId, command: Command) -> Result<Value> {
        let reply = self.send(Call::new(page_id, command)).await?;
        reply.into_result()
    }

    fn events(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
