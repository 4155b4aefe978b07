//! Scroll controller that runs against a page.
//!
//! The controller only moves the page; it never captures anything itself.
//! The orchestrator drives it through [`ScrollRequest`](crate::protocol::ScrollRequest)
//! messages delivered by a [`ContentHost`].
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `viewport` | [`Viewport`] trait: page scroll primitives |
//! | `controller` | [`ScrollController`]: smooth and single-step scrolling |
//! | `host` | [`ContentHost`]: per-tab listener tasks and message delivery |
//!
//! # Example
//!
//! ```ignore
//! let host = ContentHost::new(timings, Duration::from_secs(10));
//! host.install(tab_id, Box::new(viewport));
//!
//! host.send(tab_id, ScrollRequest::ScrollToTop).await?;
//! host.send(tab_id, ScrollRequest::ScrollByViewport).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod controller;
mod host;
mod viewport;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::ScrollController;
pub use host::ContentHost;
pub use viewport::{PageLocation, Viewport, ViewportMetrics};
