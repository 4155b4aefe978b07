//! Capability traits and the types they exchange.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::{DownloadId, TabId};
use crate::protocol::{ConflictAction, ScrollRequest, ScrollResponse};

// ============================================================================
// TabInfo
// ============================================================================

/// The tab a capture targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    /// Tab ID.
    #[serde(rename = "tabId")]
    pub id: TabId,
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Current URL.
    #[serde(default)]
    pub url: String,
}

// ============================================================================
// JpegFormat
// ============================================================================

/// JPEG settings for viewport captures and the stitched composite.
///
/// Both ends of the pipeline are JPEG: the browser encodes each viewport
/// and the compositor re-encodes the stack. Only the quality differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFormat {
    quality: u8,
}

impl JpegFormat {
    /// MIME type written with every saved image.
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// File extension of saved images, without the dot.
    pub const EXTENSION: &'static str = "jpg";

    /// Format name the browser's capture call expects.
    pub const WIRE_NAME: &'static str = "jpeg";

    /// Quality is clamped to 1-100.
    #[inline]
    #[must_use]
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Encoder quality, 1-100.
    #[inline]
    #[must_use]
    pub fn quality(self) -> u8 {
        self.quality
    }
}

// ============================================================================
// Downloads Types
// ============================================================================

/// A write into the downloads area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Path relative to the downloads area, `/`-separated.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type of the contents.
    pub mime_type: String,
    /// Let the user pick the destination.
    pub save_as: bool,
    /// Behaviour when the file exists.
    pub conflict_action: ConflictAction,
}

impl DownloadRequest {
    /// Creates a request that uniquifies on conflict and does not prompt.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            mime_type: mime_type.into(),
            save_as: false,
            conflict_action: ConflictAction::Uniquify,
        }
    }

    /// Sets the conflict behaviour.
    #[inline]
    #[must_use]
    pub fn with_conflict_action(mut self, action: ConflictAction) -> Self {
        self.conflict_action = action;
        self
    }

    /// Asks the user for the destination.
    #[inline]
    #[must_use]
    pub fn with_save_as(mut self, save_as: bool) -> Self {
        self.save_as = save_as;
        self
    }
}

/// Lifecycle state of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Still being written.
    InProgress,
    /// Failed. Terminal.
    Interrupted,
    /// Written. Terminal.
    Complete,
}

impl DownloadState {
    /// Returns `true` for the states no download ever leaves.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Interrupted | Self::Complete)
    }
}

/// Status of a download as reported by the downloads area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Download ID.
    pub id: DownloadId,
    /// Absolute path of the file on disk.
    #[serde(rename = "filename")]
    pub path: PathBuf,
    /// Current state.
    pub state: DownloadState,
    /// Failure reason when interrupted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tabs
// ============================================================================

/// Tab access needed by the capture orchestrator.
#[async_trait]
pub trait Tabs: Send + Sync {
    /// Returns the tab the user is looking at.
    async fn active_tab(&self) -> Result<TabInfo>;

    /// Sends a request to the scroll controller in the tab.
    ///
    /// Fails if no controller is loaded in the tab.
    async fn send_message(&self, tab_id: TabId, request: ScrollRequest) -> Result<ScrollResponse>;

    /// Loads the scroll controller into the tab.
    ///
    /// Loading into a tab that already has one must be harmless.
    async fn inject_controller(&self, tab_id: TabId) -> Result<()>;

    /// Captures the visible area of the tab as encoded image bytes.
    async fn capture_visible_tab(&self, tab_id: TabId, format: JpegFormat) -> Result<Vec<u8>>;
}

// ============================================================================
// Downloads
// ============================================================================

/// Access to the platform-managed downloads area.
#[async_trait]
pub trait Downloads: Send + Sync {
    /// Starts a write and returns its handle without waiting for it.
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId>;

    /// Looks up a write by handle. `None` if the area does not know it.
    async fn search(&self, id: DownloadId) -> Result<Option<DownloadItem>>;
}

// ============================================================================
// Tests
// ============================================================================
