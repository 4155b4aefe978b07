//! Listener the companion extension connects to.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::connection::{Connection, ReadyData};

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the extension to dial in.
const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the extension has to send READY once connected.
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// PendingServer
// ============================================================================

/// A bound listener waiting for the extension.
///
/// # Example
///
/// ```ignore
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("point the extension at {}", server.ws_url());
///
/// let (connection, ready) = server.accept().await?;
/// ```
pub struct PendingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    accept_timeout: Duration,
    ready_timeout: Duration,
}

impl PendingServer {
    /// Binds to `ip:port`. Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(addr = %local_addr, "Extension listener bound");

        Ok(Self {
            listener,
            local_addr,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        })
    }

    /// Sets how long [`accept`](Self::accept) waits for the extension.
    #[inline]
    #[must_use]
    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Sets how long the extension has to send READY.
    #[inline]
    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// The bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL the extension should dial, e.g. `ws://127.0.0.1:41733`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Waits for the extension and completes the READY handshake.
    ///
    /// Peers that connect but fail the WebSocket upgrade are dropped and
    /// the wait continues until the accept deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no extension connects in time
    /// - [`Error::ConnectionTimeout`] if READY does not follow in time
    /// - [`Error::ConnectionClosed`] if the socket ends before READY
    pub async fn accept(self) -> Result<(Connection, ReadyData)> {
        let deadline = Instant::now() + self.accept_timeout;
        let expired = || Error::connection_timeout(self.accept_timeout.as_millis() as u64);

        let socket = loop {
            let (stream, peer) = timeout_at(deadline, self.listener.accept())
                .await
                .map_err(|_| expired())??;

            match timeout_at(deadline, tokio_tungstenite::accept_async(stream)).await {
                Ok(Ok(socket)) => {
                    debug!(peer = %peer, "WebSocket upgrade complete");
                    break socket;
                }
                Ok(Err(e)) => warn!(peer = %peer, error = %e, "Dropped non-WebSocket peer"),
                Err(_) => return Err(expired()),
            }
        };

        let (connection, ready) = Connection::open(socket, self.ready_timeout).await?;
        info!(addr = %self.local_addr, version = %ready.version, "Extension connected");

        Ok((connection, ready))
    }
}

// ============================================================================
// Tests
// ============================================================================
