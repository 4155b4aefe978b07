//! In-process fakes for unit tests.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;

use crate::browser::{DownloadItem, DownloadRequest, DownloadState, Downloads, JpegFormat, TabInfo, Tabs};
use crate::config::ScrollTimings;
use crate::error::{Error, Result};
use crate::identifiers::{DownloadId, TabId};
use crate::page::{ContentHost, PageLocation, Viewport, ViewportMetrics};
use crate::protocol::{ScrollRequest, ScrollResponse};

// ============================================================================
// Helpers
// ============================================================================

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn tab(n: u32) -> TabId {
    TabId::new(n).expect("non-zero tab id")
}

pub(crate) fn solid_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 100)
        .encode_image(&image)
        .expect("encode jpeg");
    bytes
}

pub(crate) fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

/// Colour of the k-th capture taken by [`FakeTabs`].
pub(crate) fn capture_color(k: usize) -> [u8; 3] {
    const PALETTE: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]];
    PALETTE[k % PALETTE.len()]
}

// ============================================================================
// SimulatedPage
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PageOp {
    ScrollBy(f64),
    ScrollTo(f64),
}

struct PageState {
    scroll_y: f64,
    ops: Vec<PageOp>,
}

/// A document of fixed height that records every scroll.
#[derive(Clone)]
pub(crate) struct SimulatedPage {
    viewport_height: f64,
    document_height: f64,
    detached: bool,
    state: Arc<Mutex<PageState>>,
}

impl SimulatedPage {
    pub(crate) fn new(viewport_height: f64, document_height: f64) -> Self {
        Self {
            viewport_height,
            document_height,
            detached: false,
            state: Arc::new(Mutex::new(PageState {
                scroll_y: 0.0,
                ops: Vec::new(),
            })),
        }
    }

    /// A page whose context is gone: every call fails.
    pub(crate) fn detached() -> Self {
        Self {
            detached: true,
            ..Self::new(600.0, 600.0)
        }
    }

    pub(crate) fn ops(&self) -> Vec<PageOp> {
        self.state.lock().ops.clone()
    }

    pub(crate) fn scroll_y(&self) -> f64 {
        self.state.lock().scroll_y
    }

    pub(crate) fn set_scroll_y(&self, y: f64) {
        self.state.lock().scroll_y = y;
    }

    fn clamp(&self, y: f64) -> f64 {
        y.clamp(0.0, (self.document_height - self.viewport_height).max(0.0))
    }

    fn check_attached(&self) -> Result<()> {
        if self.detached {
            return Err(Error::protocol("page context destroyed"));
        }
        Ok(())
    }
}

#[async_trait]
impl Viewport for SimulatedPage {
    async fn metrics(&self) -> Result<ViewportMetrics> {
        self.check_attached()?;
        Ok(ViewportMetrics {
            scroll_y: self.scroll_y(),
            width: 1280.0,
            height: self.viewport_height,
            document_height: self.document_height,
            device_pixel_ratio: 1.0,
        })
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        self.check_attached()?;
        let clamped = self.clamp(y);
        let mut state = self.state.lock();
        state.scroll_y = clamped;
        state.ops.push(PageOp::ScrollTo(y));
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<()> {
        self.check_attached()?;
        let mut state = self.state.lock();
        state.scroll_y = self.clamp(state.scroll_y + dy);
        state.ops.push(PageOp::ScrollBy(dy));
        Ok(())
    }

    async fn location(&self) -> Result<PageLocation> {
        self.check_attached()?;
        Ok(PageLocation {
            title: "Example article".to_string(),
            url: "https://example.com/article".to_string(),
        })
    }
}

// ============================================================================
// FakeTabs
// ============================================================================

/// One call observed by [`FakeTabs`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TabCall {
    Message(ScrollRequest),
    Inject,
    Capture,
}

/// A single tab backed by a [`SimulatedPage`] and a real [`ContentHost`].
pub(crate) struct FakeTabs {
    info: TabInfo,
    page: SimulatedPage,
    host: ContentHost,
    calls: Mutex<Vec<TabCall>>,
    captures: AtomicUsize,
    fail_inject: AtomicBool,
    fail_capture_at: Mutex<Option<usize>>,
    capture_size: (u32, u32),
}

impl FakeTabs {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            info: TabInfo {
                id: tab(7),
                title: "Example: Article #1".to_string(),
                url: url.to_string(),
            },
            page: SimulatedPage::new(600.0, 10_000.0),
            host: ContentHost::new(ScrollTimings::instant(), Duration::from_secs(5)),
            calls: Mutex::new(Vec::new()),
            captures: AtomicUsize::new(0),
            fail_inject: AtomicBool::new(false),
            fail_capture_at: Mutex::new(None),
            capture_size: (64, 48),
        }
    }

    /// Starts with the controller already loaded.
    pub(crate) fn preloaded(url: &str) -> Self {
        let tabs = Self::new(url);
        tabs.host.install(tabs.info.id, Box::new(tabs.page.clone()));
        tabs
    }

    pub(crate) fn failing_injection(self) -> Self {
        self.fail_inject.store(true, Ordering::SeqCst);
        self
    }

    /// Makes the k-th capture (0-based) fail.
    pub(crate) fn failing_capture_at(self, k: usize) -> Self {
        *self.fail_capture_at.lock() = Some(k);
        self
    }

    pub(crate) fn calls(&self) -> Vec<TabCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn page(&self) -> &SimulatedPage {
        &self.page
    }

    pub(crate) fn capture_size(&self) -> (u32, u32) {
        self.capture_size
    }

    pub(crate) fn count(&self, wanted: &TabCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == wanted).count()
    }
}

#[async_trait]
impl Tabs for FakeTabs {
    async fn active_tab(&self) -> Result<TabInfo> {
        Ok(self.info.clone())
    }

    async fn send_message(&self, tab_id: TabId, request: ScrollRequest) -> Result<ScrollResponse> {
        self.calls.lock().push(TabCall::Message(request));
        self.host.send(tab_id, request).await
    }

    async fn inject_controller(&self, tab_id: TabId) -> Result<()> {
        self.calls.lock().push(TabCall::Inject);
        if self.fail_inject.load(Ordering::SeqCst) {
            return Err(Error::script_injection(tab_id, "Missing host permission"));
        }
        self.host.install(tab_id, Box::new(self.page.clone()));
        Ok(())
    }

    async fn capture_visible_tab(&self, _tab_id: TabId, _format: JpegFormat) -> Result<Vec<u8>> {
        self.calls.lock().push(TabCall::Capture);
        let k = self.captures.fetch_add(1, Ordering::SeqCst);

        if *self.fail_capture_at.lock() == Some(k) {
            return Err(Error::capture("Tab is not visible"));
        }

        let (width, height) = self.capture_size;
        Ok(solid_jpeg(width, height, capture_color(k)))
    }
}

// ============================================================================
// FakeDownloads
// ============================================================================

/// How [`FakeDownloads`] reports a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    /// In progress for the given number of polls, then complete.
    CompleteAfter(u32),
    Interrupted(String),
    /// Never leaves the in-progress state.
    Stuck,
    /// The area forgets the id.
    Vanishes,
    /// `download` itself fails.
    Rejected,
}

struct FakeWrite {
    request: DownloadRequest,
    polls: u32,
}

/// Downloads area with scripted outcomes, keyed by file name suffix.
pub(crate) struct FakeDownloads {
    default_outcome: WriteOutcome,
    overrides: Mutex<Vec<(String, WriteOutcome)>>,
    writes: Mutex<Vec<FakeWrite>>,
    next_id: AtomicU32,
}

impl FakeDownloads {
    pub(crate) fn new(default_outcome: WriteOutcome) -> Self {
        Self {
            default_outcome,
            overrides: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
        }
    }

    pub(crate) fn completing() -> Self {
        Self::new(WriteOutcome::CompleteAfter(0))
    }

    /// Uses `outcome` for files whose name ends with `suffix`.
    pub(crate) fn with_outcome(self, suffix: &str, outcome: WriteOutcome) -> Self {
        self.overrides.lock().push((suffix.to_string(), outcome));
        self
    }

    /// Every request started so far, in order.
    pub(crate) fn requests(&self) -> Vec<DownloadRequest> {
        self.writes.lock().iter().map(|w| w.request.clone()).collect()
    }

    pub(crate) fn requests_ending_with(&self, suffix: &str) -> Vec<DownloadRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.filename.ends_with(suffix))
            .collect()
    }

    pub(crate) fn polls(&self, id: DownloadId) -> u32 {
        self.writes
            .lock()
            .get(id.as_u32() as usize - 1)
            .map_or(0, |w| w.polls)
    }

    fn outcome_for(&self, filename: &str) -> WriteOutcome {
        self.overrides
            .lock()
            .iter()
            .find(|(suffix, _)| filename.ends_with(suffix.as_str()))
            .map_or_else(|| self.default_outcome.clone(), |(_, o)| o.clone())
    }
}

#[async_trait]
impl Downloads for FakeDownloads {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId> {
        if self.outcome_for(&request.filename) == WriteOutcome::Rejected {
            return Err(Error::protocol("Download rejected"));
        }

        let id = DownloadId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.writes.lock().push(FakeWrite { request, polls: 0 });
        Ok(id)
    }

    async fn search(&self, id: DownloadId) -> Result<Option<DownloadItem>> {
        let mut writes = self.writes.lock();
        let Some(write) = writes.get_mut(id.as_u32() as usize - 1) else {
            return Ok(None);
        };
        write.polls += 1;

        let filename = write.request.filename.clone();
        let path = PathBuf::from("/downloads").join(&filename);
        let polls = write.polls;
        drop(writes);

        let (state, error) = match self.outcome_for(&filename) {
            WriteOutcome::CompleteAfter(n) if polls > n => (DownloadState::Complete, None),
            WriteOutcome::CompleteAfter(_) | WriteOutcome::Stuck => {
                (DownloadState::InProgress, None)
            }
            WriteOutcome::Interrupted(reason) => (DownloadState::Interrupted, Some(reason)),
            WriteOutcome::Vanishes | WriteOutcome::Rejected => return Ok(None),
        };

        Ok(Some(DownloadItem {
            id,
            path,
            state,
            error,
        }))
    }
}
