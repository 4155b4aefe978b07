//! Scroll controller requests and replies.
//!
//! The orchestrator never touches the page directly: it sends one of these
//! requests to the controller loaded in the tab and waits for the reply.
//!
//! # Format
//!
//! ```json
//! { "action": "scrollAndCapture", "pageCount": 3 }
//! { "action": "scrollToTop" }
//! { "status": "scrolledTop" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// ScrollRequest
// ============================================================================

/// A request handled by the scroll controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ScrollRequest {
    /// Liveness probe.
    Ping,

    /// Smoothly scroll down by `page_count` viewport heights.
    ScrollAndCapture {
        /// Viewport heights to scroll (2 when absent or 0).
        #[serde(rename = "pageCount", default, skip_serializing_if = "Option::is_none")]
        page_count: Option<u32>,
    },

    /// Jump to the top of the document.
    ScrollToTop,

    /// Advance by exactly one viewport height.
    ScrollByViewport,

    /// Report viewport and document dimensions.
    GetDimensions,
}

impl ScrollRequest {
    /// Returns the wire name of the action.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ScrollAndCapture { .. } => "scrollAndCapture",
            Self::ScrollToTop => "scrollToTop",
            Self::ScrollByViewport => "scrollByViewport",
            Self::GetDimensions => "getDimensions",
        }
    }
}

// ============================================================================
// ScrollResponse
// ============================================================================

/// Reply from the scroll controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScrollResponse {
    /// Reply to [`ScrollRequest::Ping`].
    Pong,

    /// Scrolling finished.
    Scrolled {
        /// Document title, reported after a smooth scroll.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Page URL, reported after a smooth scroll.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// The document is at the top.
    ScrolledTop,

    /// Reply to [`ScrollRequest::GetDimensions`].
    Dimensions(Dimensions),
}

impl ScrollResponse {
    /// Returns the dimensions if this is a dimensions reply.
    #[must_use]
    pub fn into_dimensions(self) -> Option<Dimensions> {
        match self {
            Self::Dimensions(dimensions) => Some(dimensions),
            _ => None,
        }
    }
}

// ============================================================================
// Dimensions
// ============================================================================

/// Viewport size plus full document height, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    /// Viewport width.
    pub width: f64,
    /// Viewport height.
    pub height: f64,
    /// Device pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    /// Scrollable document height.
    pub full_height: f64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_value(ScrollRequest::ScrollAndCapture { page_count: Some(3) })
            .expect("serialize");
        assert_eq!(json, json!({ "action": "scrollAndCapture", "pageCount": 3 }));

        let json = serde_json::to_value(ScrollRequest::ScrollByViewport).expect("serialize");
        assert_eq!(json, json!({ "action": "scrollByViewport" }));
    }

    #[test]
    fn test_request_page_count_optional() {
        let request: ScrollRequest =
            serde_json::from_value(json!({ "action": "scrollAndCapture" })).expect("parse");
        assert_eq!(request, ScrollRequest::ScrollAndCapture { page_count: None });
    }

    #[test]
    fn test_request_action_names_match_wire() {
        for request in [
            ScrollRequest::Ping,
            ScrollRequest::ScrollAndCapture { page_count: None },
            ScrollRequest::ScrollToTop,
            ScrollRequest::ScrollByViewport,
            ScrollRequest::GetDimensions,
        ] {
            let json = serde_json::to_value(request).expect("serialize");
            assert_eq!(json["action"], request.action());
        }
    }

    #[test]
    fn test_response_wire_format() {
        let json = serde_json::to_value(ScrollResponse::ScrolledTop).expect("serialize");
        assert_eq!(json, json!({ "status": "scrolledTop" }));

        let response: ScrollResponse = serde_json::from_value(json!({
            "status": "scrolled",
            "title": "Example",
            "url": "https://example.com/"
        }))
        .expect("parse");
        assert_eq!(
            response,
            ScrollResponse::Scrolled {
                title: Some("Example".into()),
                url: Some("https://example.com/".into()),
            }
        );
    }

    #[test]
    fn test_dimensions_reply() {
        let response: ScrollResponse = serde_json::from_value(json!({
            "status": "dimensions",
            "width": 1280.0,
            "height": 720.0,
            "devicePixelRatio": 2.0,
            "fullHeight": 4000.0
        }))
        .expect("parse");

        let dimensions = response.into_dimensions().expect("dimensions");
        assert_eq!(dimensions.full_height, 4000.0);
        assert_eq!(dimensions.device_pixel_ratio, 2.0);
    }
}
