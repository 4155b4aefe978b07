//! Smooth and single-step scrolling.

use std::time::Duration;

use tracing::{debug, trace};

use crate::config::ScrollTimings;
use crate::error::Result;
use crate::protocol::{Dimensions, ScrollRequest, ScrollResponse};

use super::viewport::{PageLocation, Viewport};

// ============================================================================
// Constants
// ============================================================================

/// Viewport heights scrolled when a request does not say.
const DEFAULT_SCROLL_PAGES: u32 = 2;

// ============================================================================
// ScrollController
// ============================================================================

/// Scrolls one page on request.
///
/// Every operation waits out its settle delay before returning, so the
/// caller can capture the viewport as soon as the reply arrives.
pub struct ScrollController {
    viewport: Box<dyn Viewport>,
    timings: ScrollTimings,
}

impl ScrollController {
    /// Creates a controller over a page.
    #[must_use]
    pub fn new(viewport: Box<dyn Viewport>, timings: ScrollTimings) -> Self {
        Self { viewport, timings }
    }

    /// Dispatches a request to the matching operation.
    pub async fn handle(&self, request: ScrollRequest) -> Result<ScrollResponse> {
        match request {
            ScrollRequest::Ping => Ok(ScrollResponse::Pong),
            ScrollRequest::ScrollAndCapture { page_count } => {
                let location = self
                    .scroll_pages(page_count.unwrap_or(DEFAULT_SCROLL_PAGES))
                    .await?;
                Ok(ScrollResponse::Scrolled {
                    title: Some(location.title),
                    url: Some(location.url),
                })
            }
            ScrollRequest::ScrollToTop => {
                self.scroll_to_top().await?;
                Ok(ScrollResponse::ScrolledTop)
            }
            ScrollRequest::ScrollByViewport => {
                self.scroll_by_viewport().await?;
                Ok(ScrollResponse::Scrolled {
                    title: None,
                    url: None,
                })
            }
            ScrollRequest::GetDimensions => Ok(ScrollResponse::Dimensions(self.dimensions().await?)),
        }
    }

    /// Smoothly scrolls down by `pages` viewport heights.
    ///
    /// The target is clamped to the bottom of the document. The distance is
    /// covered in `steps_per_page * pages` equal sub-steps with a pause after
    /// each, then the page snaps to the exact target and settles.
    /// A `pages` of 0 scrolls the default two pages.
    pub async fn scroll_pages(&self, pages: u32) -> Result<PageLocation> {
        let pages = if pages == 0 { DEFAULT_SCROLL_PAGES } else { pages };
        let metrics = self.viewport.metrics().await?;

        let start = metrics.scroll_y;
        let target = metrics
            .max_scroll_y()
            .min(start + metrics.height * f64::from(pages));
        let total_steps = self.timings.steps_per_page.saturating_mul(pages).max(1);
        let step = (target - start) / f64::from(total_steps);

        debug!(pages, start, target, total_steps, "Smooth scrolling");

        for index in 0..total_steps {
            self.viewport.scroll_by(step).await?;
            trace!(index, "Scroll step");
            pause(self.timings.step_delay).await;
        }

        self.viewport.scroll_to(target).await?;
        pause(self.timings.settle_delay).await;

        self.viewport.location().await
    }

    /// Jumps to the top of the document.
    pub async fn scroll_to_top(&self) -> Result<()> {
        debug!("Scrolling to top");
        self.viewport.scroll_to(0.0).await?;
        pause(self.timings.top_settle).await;
        Ok(())
    }

    /// Advances by exactly one viewport height.
    pub async fn scroll_by_viewport(&self) -> Result<()> {
        let metrics = self.viewport.metrics().await?;
        debug!(height = metrics.height, from = metrics.scroll_y, "Scrolling by viewport");

        self.viewport.scroll_by(metrics.height).await?;
        pause(self.timings.viewport_settle).await;
        Ok(())
    }

    /// Reports viewport size and full document height.
    pub async fn dimensions(&self) -> Result<Dimensions> {
        Ok(self.viewport.metrics().await?.into())
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{PageOp, SimulatedPage};

    fn controller(page: &SimulatedPage) -> ScrollController {
        ScrollController::new(Box::new(page.clone()), ScrollTimings::instant())
    }

    #[tokio::test]
    async fn test_scroll_pages_uses_twenty_steps_per_page() {
        let page = SimulatedPage::new(800.0, 10_000.0);
        let location = controller(&page).scroll_pages(2).await.expect("scroll");

        let ops = page.ops();
        let steps = ops
            .iter()
            .filter(|op| matches!(op, PageOp::ScrollBy(_)))
            .count();
        assert_eq!(steps, 40);
        assert_eq!(ops.last(), Some(&PageOp::ScrollTo(1600.0)));
        assert_eq!(page.scroll_y(), 1600.0);
        assert_eq!(location.url, "https://example.com/article");
    }

    #[tokio::test]
    async fn test_scroll_pages_clamps_to_document_end() {
        let page = SimulatedPage::new(800.0, 1_000.0);
        controller(&page).scroll_pages(3).await.expect("scroll");

        assert_eq!(page.scroll_y(), 200.0);
        assert_eq!(page.ops().last(), Some(&PageOp::ScrollTo(200.0)));
    }

    #[tokio::test]
    async fn test_scroll_pages_zero_means_two() {
        let page = SimulatedPage::new(500.0, 10_000.0);
        controller(&page).scroll_pages(0).await.expect("scroll");
        assert_eq!(page.scroll_y(), 1000.0);
    }

    #[tokio::test]
    async fn test_scroll_to_top_then_by_viewport() {
        let page = SimulatedPage::new(600.0, 3_000.0);
        page.set_scroll_y(900.0);
        let controller = controller(&page);

        controller.scroll_to_top().await.expect("top");
        assert_eq!(page.scroll_y(), 0.0);

        controller.scroll_by_viewport().await.expect("advance");
        controller.scroll_by_viewport().await.expect("advance");
        assert_eq!(page.scroll_y(), 1200.0);
    }

    #[tokio::test]
    async fn test_handle_replies() {
        let page = SimulatedPage::new(600.0, 3_000.0);
        let controller = controller(&page);

        assert_eq!(
            controller.handle(ScrollRequest::Ping).await.expect("ping"),
            ScrollResponse::Pong
        );
        assert_eq!(
            controller
                .handle(ScrollRequest::ScrollToTop)
                .await
                .expect("top"),
            ScrollResponse::ScrolledTop
        );

        let dimensions = controller
            .handle(ScrollRequest::GetDimensions)
            .await
            .expect("dimensions")
            .into_dimensions()
            .expect("dimensions reply");
        assert_eq!(dimensions.height, 600.0);
        assert_eq!(dimensions.full_height, 3_000.0);

        let reply = controller
            .handle(ScrollRequest::ScrollAndCapture { page_count: Some(1) })
            .await
            .expect("scroll");
        assert!(matches!(reply, ScrollResponse::Scrolled { title: Some(_), .. }));
    }
}
