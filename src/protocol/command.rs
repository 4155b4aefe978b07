//! Remote command definitions organized by module.
//!
//! Commands follow `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `tabs` | Active tab lookup, visible-area capture |
//! | `scripting` | JavaScript evaluation in a tab |
//! | `downloads` | Start a download, query its state |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::DownloadId;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All remote commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Tabs module commands.
    Tabs(TabsCommand),
    /// Scripting module commands.
    Scripting(ScriptingCommand),
    /// Downloads module commands.
    Downloads(DownloadsCommand),
}

// ============================================================================
// Tabs Commands
// ============================================================================

/// Tabs module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum TabsCommand {
    /// Get the active tab of the current window.
    #[serde(rename = "tabs.queryActive")]
    QueryActive,

    /// Capture the visible area of the tab.
    #[serde(rename = "tabs.captureVisibleTab")]
    CaptureVisibleTab {
        /// Image format (`png` or `jpeg`).
        format: String,
        /// JPEG quality (0-100).
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },
}

// ============================================================================
// Scripting Commands
// ============================================================================

/// Scripting module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ScriptingCommand {
    /// Evaluate a script in the tab and return its value.
    #[serde(rename = "scripting.evaluate")]
    Evaluate {
        /// Script source. Use `return` to produce a value.
        script: String,
    },
}

// ============================================================================
// Downloads Commands
// ============================================================================

/// Downloads module commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DownloadsCommand {
    /// Start a download.
    #[serde(rename = "downloads.download")]
    Download {
        /// Source URL (a `data:` URL for generated content).
        url: String,
        /// Path relative to the downloads area.
        filename: String,
        /// Ask the user where to save.
        #[serde(rename = "saveAs")]
        save_as: bool,
        /// What to do if the file exists.
        #[serde(rename = "conflictAction")]
        conflict_action: ConflictAction,
    },

    /// Look up a download by ID.
    #[serde(rename = "downloads.search")]
    Search {
        /// Download to look up.
        id: DownloadId,
    },
}

// ============================================================================
// ConflictAction
// ============================================================================

/// Behaviour when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    /// Pick a new name such as `name (1).jpg`.
    #[default]
    Uniquify,
    /// Replace the existing file.
    Overwrite,
}

// ============================================================================
// Tests
// ============================================================================
