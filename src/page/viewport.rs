//! Page scroll primitives.

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::Dimensions;

// ============================================================================
// Types
// ============================================================================

/// Scroll position and sizes of a page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Vertical scroll offset.
    pub scroll_y: f64,
    /// Viewport width.
    pub width: f64,
    /// Viewport height.
    pub height: f64,
    /// Scrollable document height.
    pub document_height: f64,
    /// Device pixels per CSS pixel.
    pub device_pixel_ratio: f64,
}

impl ViewportMetrics {
    /// Largest reachable scroll offset.
    #[inline]
    #[must_use]
    pub fn max_scroll_y(&self) -> f64 {
        (self.document_height - self.height).max(0.0)
    }
}

impl From<ViewportMetrics> for Dimensions {
    fn from(metrics: ViewportMetrics) -> Self {
        Self {
            width: metrics.width,
            height: metrics.height,
            device_pixel_ratio: metrics.device_pixel_ratio,
            full_height: metrics.document_height,
        }
    }
}

/// Title and URL of the loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Document title.
    pub title: String,
    /// Current URL.
    pub url: String,
}

// ============================================================================
// Viewport
// ============================================================================

/// Scroll access to one page.
///
/// Implementations talk to a real document (see
/// [`RemoteBrowser`](crate::browser::RemoteBrowser)) or simulate one in tests.
#[async_trait]
pub trait Viewport: Send + Sync {
    /// Reads the current scroll position and sizes.
    async fn metrics(&self) -> Result<ViewportMetrics>;

    /// Scrolls to an absolute vertical offset.
    async fn scroll_to(&self, y: f64) -> Result<()>;

    /// Scrolls by a vertical delta.
    async fn scroll_by(&self, dy: f64) -> Result<()>;

    /// Reads the document title and URL.
    async fn location(&self) -> Result<PageLocation>;
}

// ============================================================================
// Tests
// ============================================================================
