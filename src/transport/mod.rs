//! WebSocket link to the companion extension.
//!
//! The saver listens on localhost; the extension dials in, announces itself
//! with a READY message and then answers one response per request.
//!
//! ```text
//! PendingServer::bind ──► ws://127.0.0.1:PORT ◄── extension dials in
//!         │
//!   accept (skips peers that fail the upgrade)
//!         │
//!         ▼
//!   Connection::open ── READY ──► request / response ──► close
//! ```
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket task and request correlation |
//! | `server` | Listener and handshake |

mod connection;
mod server;

pub use connection::{Connection, ReadyData};
pub use server::PendingServer;
