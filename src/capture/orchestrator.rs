//! End-to-end capture of the active tab.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::browser::{JpegFormat, TabInfo, Tabs};
use crate::config::SaverConfig;
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::persist::{PersistenceGateway, SavedImage};
use crate::protocol::ScrollRequest;
use crate::store::{RecordStore, TabRecord};

use super::compositor::stitch;
use super::naming::{ensure_capturable, image_filename};

// ============================================================================
// Types
// ============================================================================

/// Receives progress updates during a capture.
pub type StatusHandler = Box<dyn Fn(&CaptureStatus) + Send + Sync>;

/// What to capture and how to file it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Viewports to capture. 0 uses the configured default; more than the
    /// configured maximum is rejected.
    pub page_count: u32,
    /// Save a screenshot with the record.
    pub capture_screenshot: bool,
    /// Category as entered, normalised on save.
    pub category: String,
    /// Comma-separated tags as entered.
    pub tags: String,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            page_count: 0,
            capture_screenshot: true,
            category: String::new(),
            tags: String::new(),
        }
    }
}

impl CaptureRequest {
    /// Creates a screenshot request with the default page count.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of viewports.
    #[inline]
    #[must_use]
    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = page_count;
        self
    }

    /// Enables or disables the screenshot.
    #[inline]
    #[must_use]
    pub fn with_screenshot(mut self, capture_screenshot: bool) -> Self {
        self.capture_screenshot = capture_screenshot;
        self
    }

    /// Sets the category.
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the tags.
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }
}

/// Progress of a capture, in order of occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Session accepted.
    Starting,
    /// The scroll controller was missing and is being loaded.
    Injecting,
    /// Resetting to the top of the page.
    ScrollingToTop,
    /// Capturing the viewport with this 1-based index.
    Capturing(u32),
    /// Advancing before capture `step + 1` of `total`.
    Scrolling {
        /// Scrolls done so far, plus this one.
        step: u32,
        /// Requested viewports.
        total: u32,
    },
    /// Stitching.
    Processing,
    /// Writing the composite.
    SavingImage,
    /// Writing the record.
    SavingRecord,
    /// Done.
    Saved,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("Starting process..."),
            Self::Injecting => f.write_str("Injecting script..."),
            Self::ScrollingToTop => f.write_str("Scrolling to top..."),
            Self::Capturing(index) => write!(f, "Capturing viewport {index}..."),
            Self::Scrolling { step, total } => write!(f, "Scrolling ({step}/{total})..."),
            Self::Processing => f.write_str("Processing image..."),
            Self::SavingImage => f.write_str("Saving image file..."),
            Self::SavingRecord => f.write_str("Saving record..."),
            Self::Saved => f.write_str("Saved!"),
        }
    }
}

/// Snapshots collected for one capture, top of the page first.
struct CaptureSession {
    tab_id: TabId,
    page_count: u32,
    snapshots: Vec<Vec<u8>>,
}

// ============================================================================
// CaptureOrchestrator
// ============================================================================

/// Runs capture sessions, one at a time.
///
/// A session validates the tab, makes sure the scroll controller answers,
/// captures `page_count` viewports top to bottom, stitches them, saves the
/// composite and finally appends the record. Any failure ends the session
/// before the record is written.
pub struct CaptureOrchestrator {
    tabs: Arc<dyn Tabs>,
    gateway: Arc<PersistenceGateway>,
    records: Arc<RecordStore>,
    capture_format: JpegFormat,
    composite_format: JpegFormat,
    default_page_count: u32,
    max_page_count: u32,
    inject_settle: Duration,
    status_handler: Option<StatusHandler>,
    session: tokio::sync::Mutex<()>,
}

impl CaptureOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        tabs: Arc<dyn Tabs>,
        gateway: Arc<PersistenceGateway>,
        records: Arc<RecordStore>,
        config: &SaverConfig,
    ) -> Self {
        Self {
            tabs,
            gateway,
            records,
            capture_format: JpegFormat::new(config.capture_quality),
            composite_format: JpegFormat::new(config.composite_quality),
            default_page_count: config.default_page_count,
            max_page_count: config.max_page_count,
            inject_settle: config.inject_settle,
            status_handler: None,
            session: tokio::sync::Mutex::new(()),
        }
    }

    /// Sets a handler that receives every progress update.
    #[must_use]
    pub fn with_status_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CaptureStatus) + Send + Sync + 'static,
    {
        self.status_handler = Some(Box::new(handler));
        self
    }

    /// Captures the active tab and saves its record.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionBusy`] if another capture is running
    /// - [`Error::InvalidArgument`] if more pages are requested than allowed
    /// - [`Error::RestrictedPage`] for browser-internal pages
    /// - [`Error::ScriptInjection`] if the scroll controller cannot be loaded
    /// - [`Error::Capture`] if a viewport capture fails
    /// - [`Error::Decode`] if a capture cannot be decoded
    /// - [`Error::WriteInterrupted`], [`Error::WriteTimeout`] or
    ///   [`Error::DownloadNotFound`] if the composite cannot be saved
    pub async fn capture(&self, request: CaptureRequest) -> Result<TabRecord> {
        let _session = self.session.try_lock().map_err(|_| Error::SessionBusy)?;

        let page_count = match request.page_count {
            0 => self.default_page_count,
            n if n > self.max_page_count => {
                return Err(Error::invalid_argument(format!(
                    "pageCount {n} exceeds the limit of {}",
                    self.max_page_count
                )));
            }
            n => n,
        };

        self.report(CaptureStatus::Starting);
        let tab = self.tabs.active_tab().await?;
        ensure_capturable(&tab.url)?;

        info!(
            tab_id = %tab.id,
            url = %tab.url,
            page_count,
            screenshot = request.capture_screenshot,
            "Capture started"
        );

        let (image_filename, image_path) = if request.capture_screenshot {
            let saved = self.capture_screenshot(&tab, page_count).await?;
            (saved.filename, saved.file_url)
        } else {
            (String::new(), String::new())
        };

        let category = self.records.normalize_category(&request.category).await?;
        let record = TabRecord {
            date: Utc::now(),
            category,
            tags: request.tags,
            title: tab.title,
            url: tab.url,
            image_filename,
            image_path,
        };

        self.report(CaptureStatus::SavingRecord);
        let index = self.records.append(record.clone()).await?;

        // The record is stored; a failed tag update must not fail the session.
        if let Err(e) = self.records.touch_tags(&record.tags).await {
            warn!(error = %e, tags = %record.tags, "Recent tags update failed");
        }

        info!(index, title = %record.title, "Capture saved");
        self.report(CaptureStatus::Saved);
        Ok(record)
    }

    async fn capture_screenshot(&self, tab: &TabInfo, page_count: u32) -> Result<SavedImage> {
        let mut session = CaptureSession {
            tab_id: tab.id,
            page_count,
            snapshots: Vec::with_capacity(page_count as usize),
        };

        self.ensure_controller(session.tab_id).await?;

        self.report(CaptureStatus::ScrollingToTop);
        self.tabs
            .send_message(session.tab_id, ScrollRequest::ScrollToTop)
            .await?;

        self.report(CaptureStatus::Capturing(1));
        session.snapshots.push(self.capture_viewport(session.tab_id).await?);

        for step in 1..session.page_count {
            self.report(CaptureStatus::Scrolling {
                step,
                total: session.page_count,
            });
            self.tabs
                .send_message(session.tab_id, ScrollRequest::ScrollByViewport)
                .await?;

            self.report(CaptureStatus::Capturing(step + 1));
            session.snapshots.push(self.capture_viewport(session.tab_id).await?);
        }

        self.report(CaptureStatus::Processing);
        let snapshots = session.snapshots;
        let quality = self.composite_format.quality();
        let composite = tokio::task::spawn_blocking(move || stitch(&snapshots, quality))
            .await
            .map_err(|e| Error::encode(format!("compositor task failed: {e}")))??;

        debug!(
            width = composite.width,
            height = composite.height,
            "Viewports stitched"
        );

        let filename = image_filename(&tab.title, Utc::now());
        self.report(CaptureStatus::SavingImage);
        self.gateway.save_image(composite.bytes, &filename).await
    }

    /// Probes the controller and loads it if the probe fails.
    async fn ensure_controller(&self, tab_id: TabId) -> Result<()> {
        match self.tabs.send_message(tab_id, ScrollRequest::Ping).await {
            Ok(_) => {
                debug!(tab_id = %tab_id, "Scroll controller answering");
                return Ok(());
            }
            Err(e) => debug!(tab_id = %tab_id, error = %e, "Scroll controller probe failed"),
        }

        self.report(CaptureStatus::Injecting);
        self.tabs
            .inject_controller(tab_id)
            .await
            .map_err(|e| match e {
                Error::ScriptInjection { .. } => e,
                other => Error::script_injection(tab_id, other.to_string()),
            })?;

        if !self.inject_settle.is_zero() {
            tokio::time::sleep(self.inject_settle).await;
        }
        Ok(())
    }

    async fn capture_viewport(&self, tab_id: TabId) -> Result<Vec<u8>> {
        self.tabs
            .capture_visible_tab(tab_id, self.capture_format)
            .await
            .map_err(|e| match e {
                Error::Capture { .. } => e,
                other => Error::capture(other.to_string()),
            })
    }

    fn report(&self, status: CaptureStatus) {
        if let Some(handler) = &self.status_handler {
            handler(&status);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;

    use crate::browser::Downloads;
    use crate::store::{KeyValueStore, MemoryStore, RECENT_TAGS_KEY};
    use crate::testing::{FakeDownloads, FakeTabs, TabCall, WriteOutcome, capture_color};

    struct Fixture {
        tabs: Arc<FakeTabs>,
        downloads: Arc<FakeDownloads>,
        records: Arc<RecordStore>,
    }

    impl Fixture {
        fn new(tabs: FakeTabs) -> Self {
            Self::with_downloads(tabs, FakeDownloads::completing())
        }

        fn with_downloads(tabs: FakeTabs, downloads: FakeDownloads) -> Self {
            Self::with_parts(tabs, downloads, Arc::new(MemoryStore::new()))
        }

        fn with_parts(tabs: FakeTabs, downloads: FakeDownloads, kv: Arc<dyn KeyValueStore>) -> Self {
            let config = SaverConfig::new().without_delays();
            Self {
                tabs: Arc::new(tabs),
                downloads: Arc::new(downloads),
                records: Arc::new(RecordStore::new(kv, &config)),
            }
        }

        fn orchestrator(&self) -> CaptureOrchestrator {
            let config = SaverConfig::new().without_delays();
            let downloads: Arc<dyn Downloads> = self.downloads.clone();
            let gateway = Arc::new(PersistenceGateway::new(downloads, &config));
            CaptureOrchestrator::new(self.tabs.clone(), gateway, self.records.clone(), &config)
        }

        async fn record_count(&self) -> usize {
            self.records.list().await.expect("list").len()
        }
    }

    /// Memory store that refuses writes to the recent-tags key.
    #[derive(Default)]
    struct TagsReadOnly {
        inner: MemoryStore,
    }

    #[async_trait]
    impl KeyValueStore for TagsReadOnly {
        async fn get(&self, key: &str) -> Result<Option<Value>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<()> {
            if key == RECENT_TAGS_KEY {
                return Err(Error::storage("quota exceeded"));
            }
            self.inner.set(key, value).await
        }
    }

    fn expected_calls(page_count: u32) -> Vec<TabCall> {
        let mut calls = vec![
            TabCall::Message(ScrollRequest::Ping),
            TabCall::Message(ScrollRequest::ScrollToTop),
            TabCall::Capture,
        ];
        for _ in 1..page_count {
            calls.push(TabCall::Message(ScrollRequest::ScrollByViewport));
            calls.push(TabCall::Capture);
        }
        calls
    }

    #[tokio::test]
    async fn test_n_captures_and_n_minus_one_scrolls() {
        for page_count in 1..=4 {
            let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
            fixture
                .orchestrator()
                .capture(CaptureRequest::new().with_page_count(page_count))
                .await
                .expect("capture");

            assert_eq!(fixture.tabs.calls(), expected_calls(page_count), "{page_count}");
            assert_eq!(fixture.tabs.count(&TabCall::Capture), page_count as usize);
            assert_eq!(
                fixture
                    .tabs
                    .count(&TabCall::Message(ScrollRequest::ScrollByViewport)),
                page_count as usize - 1
            );
        }
    }

    #[tokio::test]
    async fn test_composite_stacks_captures_in_order() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
        fixture
            .orchestrator()
            .capture(CaptureRequest::new().with_page_count(3))
            .await
            .expect("capture");

        let images = fixture.downloads.requests_ending_with(".jpg");
        assert_eq!(images.len(), 1);

        let composite = image::load_from_memory(&images[0].bytes)
            .expect("decode")
            .to_rgb8();
        let (width, height) = fixture.tabs.capture_size();
        assert_eq!(composite.dimensions(), (width, height * 3));

        for k in 0..3u32 {
            let pixel = composite.get_pixel(width / 2, k * height + height / 2).0;
            let expected = capture_color(k as usize);
            let close = pixel.iter().zip(expected).all(|(a, e)| a.abs_diff(e) < 64);
            assert!(close, "viewport {k}: {pixel:?} vs {expected:?}");
        }
    }

    #[tokio::test]
    async fn test_record_fields() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
        let record = fixture
            .orchestrator()
            .capture(
                CaptureRequest::new()
                    .with_category("research")
                    .with_tags("ai, news"),
            )
            .await
            .expect("capture");

        assert_eq!(record.title, "Example: Article #1");
        assert_eq!(record.category, "research");
        assert!(record.image_filename.starts_with("Example__Article__1_"));
        assert!(record.image_filename.ends_with(".jpg"));
        assert!(record.image_path.starts_with("file:///downloads/SavedTabs/"));
        assert_eq!(fixture.records.list().await.expect("list"), vec![record]);
    }

    #[tokio::test]
    async fn test_missing_controller_is_injected() {
        let fixture = Fixture::new(FakeTabs::new("https://example.com/"));
        fixture
            .orchestrator()
            .capture(CaptureRequest::new().with_page_count(2))
            .await
            .expect("capture");

        let calls = fixture.tabs.calls();
        assert_eq!(
            &calls[..3],
            &[
                TabCall::Message(ScrollRequest::Ping),
                TabCall::Inject,
                TabCall::Message(ScrollRequest::ScrollToTop),
            ]
        );
        assert_eq!(fixture.tabs.page().scroll_y(), 600.0);
    }

    #[tokio::test]
    async fn test_restricted_page_has_no_side_effects() {
        let fixture = Fixture::new(FakeTabs::preloaded("chrome://settings"));
        let err = fixture
            .orchestrator()
            .capture(CaptureRequest::new().with_category("Brand new"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RestrictedPage { .. }));
        assert!(fixture.tabs.calls().is_empty());
        assert!(fixture.downloads.requests().is_empty());
        assert_eq!(fixture.record_count().await, 0);
        assert_eq!(fixture.records.categories().await.expect("categories"), vec!["General"]);
    }

    #[tokio::test]
    async fn test_injection_failure_aborts() {
        let fixture = Fixture::new(FakeTabs::new("https://example.com/").failing_injection());
        let err = fixture
            .orchestrator()
            .capture(CaptureRequest::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ScriptInjection { .. }));
        assert_eq!(fixture.tabs.count(&TabCall::Capture), 0);
        assert_eq!(fixture.record_count().await, 0);
    }

    #[tokio::test]
    async fn test_capture_failure_leaves_no_record() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/").failing_capture_at(1));
        let err = fixture
            .orchestrator()
            .capture(CaptureRequest::new().with_page_count(3).with_tags("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Capture { .. }));
        assert_eq!(fixture.tabs.count(&TabCall::Capture), 2);
        assert!(fixture.downloads.requests().is_empty());
        assert_eq!(fixture.record_count().await, 0);
        assert!(fixture.records.recent_tags().await.expect("tags").is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_leaves_no_record() {
        let fixture = Fixture::with_downloads(
            FakeTabs::preloaded("https://example.com/"),
            FakeDownloads::new(WriteOutcome::Interrupted("disk full".to_string())),
        );
        let err = fixture
            .orchestrator()
            .capture(CaptureRequest::new().with_category("Fresh"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::WriteInterrupted { .. }));
        assert_eq!(fixture.record_count().await, 0);
        assert_eq!(fixture.records.categories().await.expect("categories"), vec!["General"]);
    }

    #[tokio::test]
    async fn test_without_screenshot() {
        let fixture = Fixture::new(FakeTabs::new("https://example.com/"));
        let record = fixture
            .orchestrator()
            .capture(CaptureRequest::new().with_screenshot(false))
            .await
            .expect("capture");

        assert!(fixture.tabs.calls().is_empty());
        assert_eq!(record.image_filename, "");
        assert_eq!(record.image_path, "");
        assert_eq!(record.category, "General");
        assert_eq!(fixture.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_status_sequence() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        fixture
            .orchestrator()
            .with_status_handler(move |status| sink.lock().push(status.to_string()))
            .capture(CaptureRequest::new().with_page_count(2))
            .await
            .expect("capture");

        assert_eq!(
            *seen.lock(),
            vec![
                "Starting process...",
                "Scrolling to top...",
                "Capturing viewport 1...",
                "Scrolling (1/2)...",
                "Capturing viewport 2...",
                "Processing image...",
                "Saving image file...",
                "Saving record...",
                "Saved!",
            ]
        );
    }

    #[tokio::test]
    async fn test_tag_update_failure_keeps_saved_record() {
        let fixture = Fixture::with_parts(
            FakeTabs::preloaded("https://example.com/"),
            FakeDownloads::completing(),
            Arc::new(TagsReadOnly::default()),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let record = fixture
            .orchestrator()
            .with_status_handler(move |status| sink.lock().push(*status))
            .capture(CaptureRequest::new().with_tags("rust, async"))
            .await
            .expect("capture");

        assert_eq!(fixture.records.list().await.expect("list"), vec![record]);
        assert!(fixture.records.recent_tags().await.expect("tags").is_empty());
        assert_eq!(seen.lock().last(), Some(&CaptureStatus::Saved));
    }

    #[tokio::test]
    async fn test_page_count_above_limit_is_rejected() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
        let orchestrator = fixture.orchestrator();

        let err = orchestrator
            .capture(CaptureRequest::new().with_page_count(u32::MAX))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(fixture.tabs.calls().is_empty());
        assert!(fixture.downloads.requests().is_empty());
        assert_eq!(fixture.record_count().await, 0);

        let limit = SaverConfig::new().max_page_count;
        orchestrator
            .capture(CaptureRequest::new().with_page_count(limit).with_screenshot(false))
            .await
            .expect("capture at the limit");
        assert_eq!(fixture.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_image_is_written_as_jpeg() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
        let record = fixture
            .orchestrator()
            .capture(CaptureRequest::new())
            .await
            .expect("capture");

        let images = fixture.downloads.requests_ending_with(JpegFormat::EXTENSION);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime_type, JpegFormat::MIME_TYPE);
        assert!(record.image_filename.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_concurrent_session_is_rejected() {
        let fixture = Fixture::new(FakeTabs::preloaded("https://example.com/"));
        let orchestrator = fixture.orchestrator();

        let (first, second) = tokio::join!(
            orchestrator.capture(CaptureRequest::new()),
            orchestrator.capture(CaptureRequest::new()),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::SessionBusy)));
        assert!(second.unwrap_err().is_recoverable());
        assert_eq!(fixture.record_count().await, 1);
    }
}
