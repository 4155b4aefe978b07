//! Envelopes for commands sent to the companion extension and its replies.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, TabId};

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command for the extension.
///
/// ```json
/// {
///   "id": "uuid",
///   "method": "module.methodName",
///   "tabId": 1,
///   "params": { ... }
/// }
/// ```
///
/// `tabId` is omitted for commands that are not tab-scoped.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlates the reply.
    pub id: RequestId,

    /// Tab the command acts on.
    #[serde(rename = "tabId", skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a request that is not scoped to a tab.
    #[inline]
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            tab_id: None,
            command,
        }
    }

    /// Creates a request targeting a tab.
    #[inline]
    #[must_use]
    pub fn for_tab(tab_id: TabId, command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            tab_id: Some(tab_id),
            command,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the extension.
///
/// ```json
/// { "id": "uuid", "type": "success", "result": { ... } }
/// { "id": "uuid", "type": "error", "error": "code", "message": "text" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Success payload or failure details.
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// What the extension reported for one request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    /// The command ran; `result` is command-specific.
    Success {
        #[serde(default)]
        result: Value,
    },
    /// The command failed.
    Error {
        /// Short machine-readable code.
        #[serde(default)]
        error: Option<String>,
        /// Human-readable description.
        #[serde(default)]
        message: Option<String>,
    },
}

impl Response {
    /// Returns `true` if the command ran.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// The success payload, or [`Error::Protocol`] carrying the failure text.
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Success { result } => Ok(result),
            Outcome::Error { error, message } => Err(Error::protocol(
                message
                    .or(error)
                    .unwrap_or_else(|| "extension reported an error".to_string()),
            )),
        }
    }

    /// A string field of a success payload, empty if absent.
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        match &self.outcome {
            Outcome::Success { result } => result
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Outcome::Error { .. } => String::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
