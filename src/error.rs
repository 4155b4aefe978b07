//! Error types for the tab saver.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use tab_saver::{CaptureRequest, Error, Result, TabSaver};
//!
//! async fn example(saver: &TabSaver) -> Result<()> {
//!     match saver.capture(CaptureRequest::new()).await {
//!         Ok(record) => println!("saved {}", record.title),
//!         Err(Error::RestrictedPage { url }) => println!("cannot capture {url}"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Capture session | [`Error::RestrictedPage`], [`Error::ScriptInjection`], [`Error::NoReceiver`], [`Error::Capture`], [`Error::SessionBusy`] |
//! | Imaging | [`Error::Decode`], [`Error::Encode`] |
//! | Persistence | [`Error::WriteInterrupted`], [`Error::WriteTimeout`], [`Error::DownloadNotFound`] |
//! | Records | [`Error::RecordNotFound`], [`Error::Storage`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Timeout`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{DownloadId, RequestId, TabId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when saver configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    ///
    /// Returned when a caller-supplied value is rejected.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Capture Session Errors
    // ========================================================================
    /// The tab shows a browser-internal or extension page.
    #[error("Cannot capture restricted browser pages ({url}). Please try a normal website.")]
    RestrictedPage {
        /// URL of the rejected tab.
        url: String,
    },

    /// The scroll controller could not be loaded into the page.
    #[error("Failed to inject scroll controller into tab {tab_id}: {message}")]
    ScriptInjection {
        /// Target tab.
        tab_id: TabId,
        /// Underlying failure.
        message: String,
    },

    /// No scroll controller is listening in the tab.
    #[error("No scroll controller listening in tab {tab_id}")]
    NoReceiver {
        /// Target tab.
        tab_id: TabId,
    },

    /// A viewport snapshot could not be taken.
    #[error("Capture failed: {message}")]
    Capture {
        /// Underlying failure.
        message: String,
    },

    /// Another capture session is still running.
    #[error("A capture is already in progress")]
    SessionBusy,

    // ========================================================================
    // Imaging Errors
    // ========================================================================
    /// A snapshot could not be decoded.
    #[error("Failed to decode snapshot {index}: {message}")]
    Decode {
        /// Position of the snapshot in capture order.
        index: usize,
        /// Decoder message.
        message: String,
    },

    /// The composite could not be encoded.
    #[error("Failed to encode image: {message}")]
    Encode {
        /// Encoder message.
        message: String,
    },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The write reached the interrupted terminal state.
    #[error("Download interrupted: {filename} ({reason})")]
    WriteInterrupted {
        /// Requested file name.
        filename: String,
        /// Reason reported by the downloads area.
        reason: String,
    },

    /// The write never reached a terminal state.
    #[error("Download {download_id} did not finish within {timeout_ms}ms")]
    WriteTimeout {
        /// Download being polled.
        download_id: DownloadId,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// The downloads area has no record of the write.
    #[error("Download not found: {download_id}")]
    DownloadNotFound {
        /// The missing download.
        download_id: DownloadId,
    },

    // ========================================================================
    // Record Errors
    // ========================================================================
    /// No record at the given position.
    #[error("Record not found at index {index}")]
    RecordNotFound {
        /// Positional index into the record list.
        index: usize,
    },

    /// Key-value store failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when WebSocket connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for extension.
    ///
    /// Returned when extension does not connect within timeout period.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a restricted page error.
    #[inline]
    pub fn restricted_page(url: impl Into<String>) -> Self {
        Self::RestrictedPage { url: url.into() }
    }

    /// Creates a script injection error.
    #[inline]
    pub fn script_injection(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::ScriptInjection {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates a no receiver error.
    #[inline]
    pub fn no_receiver(tab_id: TabId) -> Self {
        Self::NoReceiver { tab_id }
    }

    /// Creates a capture error.
    #[inline]
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Creates a decode error for the snapshot at `index`.
    #[inline]
    pub fn decode(index: usize, message: impl Into<String>) -> Self {
        Self::Decode {
            index,
            message: message.into(),
        }
    }

    /// Creates an encode error.
    #[inline]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates a write interrupted error.
    #[inline]
    pub fn write_interrupted(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteInterrupted {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write timeout error.
    #[inline]
    pub fn write_timeout(download_id: DownloadId, timeout_ms: u64) -> Self {
        Self::WriteTimeout {
            download_id,
            timeout_ms,
        }
    }

    /// Creates a download not found error.
    #[inline]
    pub fn download_not_found(download_id: DownloadId) -> Self {
        Self::DownloadNotFound { download_id }
    }

    /// Creates a record not found error.
    #[inline]
    pub fn record_not_found(index: usize) -> Self {
        Self::RecordNotFound { index }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::WriteTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` for the failure kinds that end a capture session.
    #[inline]
    #[must_use]
    pub fn aborts_session(&self) -> bool {
        matches!(
            self,
            Self::RestrictedPage { .. }
                | Self::ScriptInjection { .. }
                | Self::Capture { .. }
                | Self::Decode { .. }
                | Self::WriteInterrupted { .. }
                | Self::WriteTimeout { .. }
                | Self::DownloadNotFound { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed if the caller tries again later.
    /// Nothing in this crate retries automatically.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::SessionBusy
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
