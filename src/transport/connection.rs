//! WebSocket connection to the companion extension.
//!
//! One background task owns the socket. Callers hand it serialized frames
//! and wait on a oneshot slot keyed by request id; the task fills the slot
//! when the matching response arrives.
//!
//! ```text
//! request() ──register──► PendingRequests ◄──resolve── pump ◄── socket
//!     │                                                  ▲
//!     └──────────────── Outgoing::Frame ─────────────────┘──► socket
//! ```
//!
//! The READY handshake uses the nil request id. When the socket ends, every
//! waiting slot fails with [`Error::ConnectionClosed`] and later requests
//! fail immediately.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Requests allowed in flight at once.
const MAX_IN_FLIGHT: usize = 64;

// ============================================================================
// Types
// ============================================================================

type Slot = oneshot::Sender<Result<Response>>;
type Socket = WebSocketStream<TcpStream>;

/// Data received in the READY handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyData {
    /// Version string reported by the extension.
    pub version: String,
}

enum Outgoing {
    Frame { id: RequestId, text: String },
    Close,
}

// ============================================================================
// PendingRequests
// ============================================================================

/// Response slots of requests still waiting for an answer.
struct PendingRequests {
    slots: Mutex<FxHashMap<RequestId, Slot>>,
    capacity: usize,
}

impl PendingRequests {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
            capacity,
        }
    }

    fn register(&self, id: RequestId) -> Result<oneshot::Receiver<Result<Response>>> {
        let mut slots = self.slots.lock();
        if slots.len() >= self.capacity {
            return Err(Error::protocol(format!(
                "{} requests already in flight",
                slots.len()
            )));
        }

        let (tx, rx) = oneshot::channel();
        slots.insert(id, tx);
        Ok(rx)
    }

    /// Delivers `response` to its slot. Returns false if nobody was waiting.
    fn resolve(&self, response: Response) -> bool {
        let Some(slot) = self.slots.lock().remove(&response.id) else {
            return false;
        };
        let _ = slot.send(Ok(response));
        true
    }

    fn reject(&self, id: RequestId, error: Error) {
        if let Some(slot) = self.slots.lock().remove(&id) {
            let _ = slot.send(Err(error));
        }
    }

    fn forget(&self, id: RequestId) {
        self.slots.lock().remove(&id);
    }

    fn fail_all(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        let count = slots.len();
        for slot in slots {
            let _ = slot.send(Err(Error::ConnectionClosed));
        }
        count
    }

    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to the extension's WebSocket.
///
/// Cloning is cheap; all clones share the same socket task.
#[derive(Clone)]
pub struct Connection {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    pending: Arc<PendingRequests>,
    closed: watch::Receiver<bool>,
}

impl Connection {
    /// Takes ownership of `socket`, starts its task and waits for the READY
    /// message the extension sends after connecting.
    ///
    /// The READY slot is registered before the task starts reading.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if READY does not arrive within `ready_within`
    /// - [`Error::ConnectionClosed`] if the socket ends first
    pub(crate) async fn open(socket: Socket, ready_within: Duration) -> Result<(Self, ReadyData)> {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed) = watch::channel(false);
        let pending = Arc::new(PendingRequests::new(MAX_IN_FLIGHT));
        let ready = pending.register(RequestId::ready())?;

        tokio::spawn(pump(socket, outgoing_rx, Arc::clone(&pending), closed_tx));

        let connection = Self {
            outgoing,
            pending,
            closed,
        };

        let response = match timeout(ready_within, ready).await {
            Ok(delivered) => delivered??,
            Err(_) => {
                connection.close();
                return Err(Error::connection_timeout(ready_within.as_millis() as u64));
            }
        };

        let version = response.get_string("version");
        debug!(version = %version, "READY handshake completed");
        Ok((connection, ReadyData { version }))
    }

    /// Sends `request` and waits up to `within` for its response.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the socket is gone
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if too many requests are in flight
    pub async fn request(&self, request: Request, within: Duration) -> Result<Response> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let id = request.id;
        let text = serde_json::to_string(&request)?;
        let rx = self.pending.register(id)?;

        if self.outgoing.send(Outgoing::Frame { id, text }).is_err() {
            self.pending.forget(id);
            return Err(Error::ConnectionClosed);
        }

        match timeout(within, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                self.pending.forget(id);
                Err(Error::request_timeout(id, within.as_millis() as u64))
            }
        }
    }

    /// Requests still waiting for a response.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Returns true once the socket task has ended.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Closes the socket. Waiting requests fail with [`Error::ConnectionClosed`].
    ///
    /// Not called on drop: clones share the socket.
    pub fn close(&self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Socket Task
// ============================================================================

async fn pump(
    socket: Socket,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    pending: Arc<PendingRequests>,
    closed: watch::Sender<bool>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch(&text, &pending),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Extension closed the socket");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },

            command = outgoing.recv() => match command {
                Some(Outgoing::Frame { id, text }) => write(&mut sink, id, text, &pending).await,
                Some(Outgoing::Close) | None => {
                    let _ = sink.close().await;
                    break;
                }
            },
        }
    }

    let _ = closed.send(true);
    let failed = pending.fail_all();
    debug!(failed, "Socket task ended");
}

fn dispatch(text: &str, pending: &PendingRequests) {
    match serde_json::from_str::<Response>(text) {
        Ok(response) => {
            let id = response.id;
            if !pending.resolve(response) {
                warn!(id = %id, "Response for unknown request");
            }
        }
        Err(e) => warn!(error = %e, "Unparseable frame from extension"),
    }
}

async fn write(
    sink: &mut SplitSink<Socket, Message>,
    id: RequestId,
    text: String,
    pending: &PendingRequests,
) {
    match sink.send(Message::Text(text.into())).await {
        Ok(()) => trace!(id = %id, "Request sent"),
        Err(e) => pending.reject(id, Error::connection(e.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
