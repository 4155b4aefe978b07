//! Tab Saver - Full-page tab capture with a local record archive.
//!
//! This library captures the active browser tab as one tall JPEG, stores it
//! in the downloads area and keeps a record of every capture, mirrored to a
//! CSV file next to the images.
//!
//! # Architecture
//!
//! The saver sits between a browser and a key-value store:
//!
//! - **Browser side**: [`Tabs`] and [`Downloads`] capabilities, served by the
//!   companion extension over WebSocket ([`RemoteBrowser`]) or by the local
//!   filesystem ([`LocalDownloads`])
//! - **Page side**: a scroll controller answering `ping`, `scrollToTop` and
//!   `scrollByViewport` messages inside each tab
//! - **Store side**: records, known categories and recent tags under fixed
//!   keys of a [`KeyValueStore`]
//!
//! Key design principles:
//!
//! - One capture session at a time; a second trigger fails fast
//! - A record exists only once its image is confirmed on disk
//! - Every change to the record list rewrites the CSV mirror once
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! use tab_saver::{
//!     CaptureRequest, JsonFileStore, PendingServer, RemoteBrowser, Result, SaverConfig,
//!     TabSaver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SaverConfig::new();
//!
//!     // Wait for the companion extension to connect
//!     let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//!     println!("Extension endpoint: {}", server.ws_url());
//!     let browser = Arc::new(RemoteBrowser::connect(server, &config).await?);
//!
//!     let store = Arc::new(JsonFileStore::open("saved-tabs.json").await?);
//!     let saver = TabSaver::from_browser(browser, store, config)?;
//!
//!     let request = CaptureRequest::new()
//!         .with_page_count(3)
//!         .with_category("Research")
//!         .with_tags("rust, async");
//!     println!("{}", saver.start_capture(request).await);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | [`Tabs`] / [`Downloads`] capabilities and their backends |
//! | [`capture`] | Capture session, compositor, file naming |
//! | [`config`] | [`SaverConfig`] and scroll timings |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`page`] | Scroll controller and its per-tab host |
//! | [`persist`] | Downloads-area writes and completion polling |
//! | [`protocol`] | Scroll messages and remote commands |
//! | [`store`] | Records, categories, recent tags, CSV |
//! | [`transport`] | WebSocket transport layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Browser capabilities and their implementations.
pub mod browser;

/// Capture session orchestration and image composition.
pub mod capture;

/// Saver configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for tabs, downloads and requests.
pub mod identifiers;

/// Scroll controller living in each captured tab.
pub mod page;

/// Persistence gateway over the downloads area.
pub mod persist;

/// Message types for the scroll controller and the companion extension.
pub mod protocol;

/// Record store and its caches.
pub mod store;

/// WebSocket transport layer.
///
/// Internal module handling the extension connection.
pub mod transport;

mod saver;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Facade
pub use saver::TabSaver;

// Browser types
pub use browser::{
    DownloadItem, DownloadRequest, DownloadState, Downloads, JpegFormat, LocalDownloads,
    RemoteBrowser, TabInfo, Tabs,
};

// Capture types
pub use capture::{CaptureOrchestrator, CaptureRequest, CaptureStatus, CompositeImage, stitch};

// Configuration
pub use config::{SaverConfig, ScrollTimings};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{DownloadId, RequestId, TabId};

// Page types
pub use page::{ContentHost, ScrollController, Viewport};

// Persistence types
pub use persist::{CsvExport, PersistenceGateway, SavedImage};

// Protocol types
pub use protocol::{ScrollRequest, ScrollResponse};

// Store types
pub use store::{
    JsonFileStore, KeyValueStore, MemoryStore, RecordEdit, RecordFilter, RecordStore, SortDirection,
    SortKey, SortOrder, TabRecord,
};

// Transport types
pub use transport::PendingServer;
