//! Capture pipeline.
//!
//! # Session flow
//!
//! ```text
//! active tab ─► restricted? ─► ping / inject ─► scrollToTop ─► capture 1
//!                                                  ┌──────────────┘
//!                                                  ▼
//!                            (scrollByViewport ─► capture k) for k in 2..=N
//!                                                  │
//!                   stitch ─► save image (poll) ─► normalise category
//!                                                  │
//!                                append record ─► touch recent tags
//! ```
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `orchestrator` | [`CaptureOrchestrator`]: one session at a time |
//! | `compositor` | [`stitch`]: vertical concatenation, JPEG re-encode |
//! | `naming` | Restricted-page check, title sanitising, image file names |

// ============================================================================
// Submodules
// ============================================================================

mod compositor;
mod naming;
mod orchestrator;

// ============================================================================
// Re-exports
// ============================================================================

pub use compositor::{CompositeImage, stitch};
pub use naming::{
    RESTRICTED_SCHEMES, ensure_capturable, image_filename, sanitize_title, timestamp_slug,
};
pub use orchestrator::{CaptureOrchestrator, CaptureRequest, CaptureStatus, StatusHandler};
