//! Per-tab listener tasks and message delivery.
//!
//! Each installed tab gets one listener task owning a [`ScrollController`].
//! Requests are queued to it over an mpsc channel and answered through a
//! oneshot, so calls to one tab are handled strictly in order.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ScrollTimings;
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::protocol::{ScrollRequest, ScrollResponse};

use super::controller::ScrollController;
use super::viewport::Viewport;

// ============================================================================
// Types
// ============================================================================

/// A queued request and the channel for its reply.
struct Envelope {
    request: ScrollRequest,
    reply: oneshot::Sender<Result<ScrollResponse>>,
}

type ListenerMap = FxHashMap<TabId, mpsc::UnboundedSender<Envelope>>;

// ============================================================================
// ContentHost
// ============================================================================

/// Registry of scroll controllers keyed by tab.
///
/// Installing is idempotent: a tab with a live listener keeps it, so a
/// redundant injection never registers a second handler.
pub struct ContentHost {
    listeners: Mutex<ListenerMap>,
    timings: ScrollTimings,
    call_timeout: Duration,
}

impl ContentHost {
    /// Creates an empty host.
    ///
    /// `call_timeout` bounds every [`send`](Self::send) round-trip.
    #[must_use]
    pub fn new(timings: ScrollTimings, call_timeout: Duration) -> Self {
        Self {
            listeners: Mutex::new(ListenerMap::default()),
            timings,
            call_timeout,
        }
    }

    /// Returns `true` if a live listener is registered for the tab.
    #[must_use]
    pub fn is_installed(&self, tab_id: TabId) -> bool {
        self.listeners
            .lock()
            .get(&tab_id)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Starts a listener for the tab unless one is already live.
    ///
    /// Returns `true` if a new listener was started.
    pub fn install(&self, tab_id: TabId, viewport: Box<dyn Viewport>) -> bool {
        let mut listeners = self.listeners.lock();

        if let Some(tx) = listeners.get(&tab_id)
            && !tx.is_closed()
        {
            debug!(tab_id = %tab_id, "Scroll controller already installed");
            return false;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let controller = ScrollController::new(viewport, self.timings);
        tokio::spawn(Self::run_listener(tab_id, controller, rx));
        listeners.insert(tab_id, tx);

        debug!(tab_id = %tab_id, "Scroll controller installed");
        true
    }

    /// Drops the tab's listener, for example after the tab navigated away.
    ///
    /// Requests already queued are still answered.
    pub fn uninstall(&self, tab_id: TabId) -> bool {
        let removed = self.listeners.lock().remove(&tab_id).is_some();
        if removed {
            debug!(tab_id = %tab_id, "Scroll controller uninstalled");
        }
        removed
    }

    /// Delivers a request to the tab's controller and waits for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::NoReceiver`] if no controller listens in the tab
    /// - [`Error::Timeout`] if the reply does not arrive within the call timeout
    /// - Any error raised by the controller itself
    pub async fn send(&self, tab_id: TabId, request: ScrollRequest) -> Result<ScrollResponse> {
        let tx = self
            .listeners
            .lock()
            .get(&tab_id)
            .cloned()
            .ok_or_else(|| Error::no_receiver(tab_id))?;

        let (reply_tx, reply_rx) = oneshot::channel();

        if tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .is_err()
        {
            self.listeners.lock().remove(&tab_id);
            return Err(Error::no_receiver(tab_id));
        }

        match timeout(self.call_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::no_receiver(tab_id)),
            Err(_) => Err(Error::timeout(
                format!("{} in tab {}", request.action(), tab_id),
                self.call_timeout.as_millis() as u64,
            )),
        }
    }

    /// Listener loop: handles queued requests one at a time.
    async fn run_listener(
        tab_id: TabId,
        controller: ScrollController,
        mut rx: mpsc::UnboundedReceiver<Envelope>,
    ) {
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let result = controller.handle(request).await;

            if let Err(e) = &result {
                warn!(tab_id = %tab_id, action = request.action(), error = %e, "Scroll request failed");
            }

            let _ = reply.send(result);
        }

        debug!(tab_id = %tab_id, "Scroll controller stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================
