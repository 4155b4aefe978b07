//! Type-safe identifier wrappers.
//!
//! Newtypes keep tab, download and request identifiers from being mixed up
//! at compile time.
//!
//! | Type | Inner | Source |
//! |------|-------|--------|
//! | [`TabId`] | `NonZeroU32` | Browser tab |
//! | [`DownloadId`] | `u32` | Downloads area |
//! | [`RequestId`] | `Uuid` | Request/response correlation |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TabId
// ============================================================================

/// Identifier of a browser tab.
///
/// Browsers never hand out tab id 0, so the inner value is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(NonZeroU32);

impl TabId {
    /// Creates a tab ID, returning `None` for 0.
    #[inline]
    #[must_use]
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// DownloadId
// ============================================================================

/// Handle of a write started in the downloads area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(u32);

impl DownloadId {
    /// Creates a download ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Correlation ID for a request and its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random request ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil UUID reserved for the READY handshake.
    #[inline]
    #[must_use]
    pub const fn ready() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the READY handshake ID.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_rejects_zero() {
        assert!(TabId::new(0).is_none());
        assert_eq!(TabId::new(7).map(|id| id.as_u32()), Some(7));
    }

    #[test]
    fn test_tab_id_serializes_as_number() {
        let id = TabId::new(12).expect("valid tab id");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "12");

        let parsed: TabId = serde_json::from_str("12").expect("parse");
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<TabId>("0").is_err());
    }

    #[test]
    fn test_request_id_ready() {
        assert!(RequestId::ready().is_ready());
        assert!(!RequestId::generate().is_ready());
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn test_download_id_display() {
        assert_eq!(DownloadId::new(42).to_string(), "42");
    }
}
