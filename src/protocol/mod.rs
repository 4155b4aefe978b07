//! Message types.
//!
//! Two protocols share this module:
//!
//! | Protocol | Between | Types |
//! |----------|---------|-------|
//! | Scroll controller | Capture orchestrator ↔ page | [`ScrollRequest`], [`ScrollResponse`] |
//! | Remote browser | Rust ↔ companion extension (WebSocket) | [`Request`], [`Response`], [`Command`] |
//!
//! # Command Naming
//!
//! Remote commands follow `module.methodName` format:
//!
//! - `tabs.captureVisibleTab`
//! - `scripting.evaluate`
//! - `downloads.search`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Remote command definitions by domain |
//! | `message` | Scroll controller requests and replies |
//! | `request` | Request and Response envelopes |

// ============================================================================
// Submodules
// ============================================================================

/// Remote command definitions organized by module.
pub mod command;

/// Scroll controller message types.
pub mod message;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, ConflictAction, DownloadsCommand, ScriptingCommand, TabsCommand};
pub use message::{Dimensions, ScrollRequest, ScrollResponse};
pub use request::{Outcome, Request, Response};
