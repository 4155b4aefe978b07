//! Browser capabilities the capture pipeline depends on.
//!
//! The pipeline never talks to a browser directly. It goes through two
//! traits:
//!
//! - [`Tabs`] - Active tab, page messaging, controller injection, capture
//! - [`Downloads`] - Writes into the downloads area and their status
//!
//! # Implementations
//!
//! | Type | Tabs | Downloads | Backing |
//! |------|------|-----------|---------|
//! | [`RemoteBrowser`] | yes | yes | Companion extension over WebSocket |
//! | [`LocalDownloads`] | | yes | Local filesystem |

// ============================================================================
// Submodules
// ============================================================================

mod capability;
mod local;
mod remote;

// ============================================================================
// Re-exports
// ============================================================================

pub use capability::{
    DownloadItem, DownloadRequest, DownloadState, Downloads, JpegFormat, TabInfo, Tabs,
};
pub use local::LocalDownloads;
pub use remote::{RemoteBrowser, RemoteViewport};
