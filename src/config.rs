//! Saver configuration.
//!
//! Every delay, quality and cap used by the capture pipeline lives here so
//! callers (and tests) can tune them without touching the pipeline.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tab_saver::SaverConfig;
//!
//! let config = SaverConfig::new()
//!     .with_downloads_root("/tmp/downloads")
//!     .with_folder("Archive")
//!     .with_write_timeout(Some(Duration::from_secs(30)));
//! config.validate()?;
//! ```
//!
//! Durations are stored in JSON as integer milliseconds:
//!
//! ```json
//! { "folder": "SavedTabs", "pollInterval": 100, "writeTimeout": 60000 }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sub-folder of the downloads area that receives images and the CSV mirror.
pub const DEFAULT_FOLDER: &str = "SavedTabs";

/// File name of the CSV mirror inside [`DEFAULT_FOLDER`].
pub const DEFAULT_MIRROR_FILENAME: &str = "data.csv";

/// Category used when the caller leaves it blank.
pub const DEFAULT_CATEGORY: &str = "General";

/// Capacity of the recent-tags list.
pub const DEFAULT_RECENT_TAGS_CAP: usize = 50;

/// Most viewports a single capture may request.
pub const DEFAULT_MAX_PAGE_COUNT: u32 = 50;

// ============================================================================
// ScrollTimings
// ============================================================================

/// Delays used by the scroll controller.
///
/// The per-step and settle delays give lazy-loaded content time to render
/// before a viewport is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollTimings {
    /// Sub-steps per viewport height in a smooth scroll.
    pub steps_per_page: u32,

    /// Pause after each smooth-scroll sub-step.
    #[serde(with = "duration_ms")]
    pub step_delay: Duration,

    /// Pause after snapping to the smooth-scroll target.
    #[serde(with = "duration_ms")]
    pub settle_delay: Duration,

    /// Pause after resetting to the top.
    #[serde(with = "duration_ms")]
    pub top_settle: Duration,

    /// Pause after advancing one viewport.
    #[serde(with = "duration_ms")]
    pub viewport_settle: Duration,
}

impl Default for ScrollTimings {
    fn default() -> Self {
        Self {
            steps_per_page: 20,
            step_delay: Duration::from_millis(50),
            settle_delay: Duration::from_millis(500),
            top_settle: Duration::from_millis(200),
            viewport_settle: Duration::from_millis(500),
        }
    }
}

impl ScrollTimings {
    /// Timings with every delay set to zero.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            top_settle: Duration::ZERO,
            viewport_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

// ============================================================================
// SaverConfig
// ============================================================================

/// Configuration for a [`TabSaver`](crate::TabSaver) and its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaverConfig {
    /// Root of the downloads area (the platform downloads directory by default).
    pub downloads_root: PathBuf,

    /// Sub-folder of the downloads area for images and the CSV mirror.
    pub folder: String,

    /// File name of the CSV mirror.
    pub mirror_filename: String,

    /// JPEG quality requested from the browser for each viewport.
    pub capture_quality: u8,

    /// JPEG quality of the stitched composite.
    pub composite_quality: u8,

    /// Viewports captured when the caller does not say.
    pub default_page_count: u32,

    /// Most viewports a capture may request. Larger requests are rejected.
    pub max_page_count: u32,

    /// Category applied when the caller leaves it blank.
    pub default_category: String,

    /// Capacity of the recent-tags list.
    pub recent_tags_cap: usize,

    /// Interval between download status polls.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,

    /// Upper bound on waiting for a download to finish (`None` waits forever).
    #[serde(with = "option_duration_ms")]
    pub write_timeout: Option<Duration>,

    /// Timeout for one scroll controller round-trip.
    #[serde(with = "duration_ms")]
    pub message_timeout: Duration,

    /// Pause after injecting the scroll controller.
    #[serde(with = "duration_ms")]
    pub inject_settle: Duration,

    /// Scroll controller delays.
    pub scroll: ScrollTimings,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            downloads_root: default_downloads_root(),
            folder: DEFAULT_FOLDER.to_string(),
            mirror_filename: DEFAULT_MIRROR_FILENAME.to_string(),
            capture_quality: 100,
            composite_quality: 60,
            default_page_count: 2,
            max_page_count: DEFAULT_MAX_PAGE_COUNT,
            default_category: DEFAULT_CATEGORY.to_string(),
            recent_tags_cap: DEFAULT_RECENT_TAGS_CAP,
            poll_interval: Duration::from_millis(100),
            write_timeout: Some(Duration::from_secs(60)),
            message_timeout: Duration::from_secs(10),
            inject_settle: Duration::from_millis(100),
            scroll: ScrollTimings::default(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SaverConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SaverConfig {
    /// Sets the downloads area root.
    #[inline]
    #[must_use]
    pub fn with_downloads_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.downloads_root = root.into();
        self
    }

    /// Sets the sub-folder for images and the CSV mirror.
    #[inline]
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Sets the composite JPEG quality (clamped to 1-100).
    #[inline]
    #[must_use]
    pub fn with_composite_quality(mut self, quality: u8) -> Self {
        self.composite_quality = quality.clamp(1, 100);
        self
    }

    /// Sets the largest page count a capture may request.
    #[inline]
    #[must_use]
    pub fn with_max_page_count(mut self, max: u32) -> Self {
        self.max_page_count = max;
        self
    }

    /// Sets the download poll interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the download wait bound.
    #[inline]
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the scroll controller round-trip timeout.
    #[inline]
    #[must_use]
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    /// Sets the pause after injecting the scroll controller.
    #[inline]
    #[must_use]
    pub fn with_inject_settle(mut self, settle: Duration) -> Self {
        self.inject_settle = settle;
        self
    }

    /// Sets the scroll controller delays.
    #[inline]
    #[must_use]
    pub fn with_scroll_timings(mut self, timings: ScrollTimings) -> Self {
        self.scroll = timings;
        self
    }

    /// Sets the recent-tags capacity.
    #[inline]
    #[must_use]
    pub fn with_recent_tags_cap(mut self, cap: usize) -> Self {
        self.recent_tags_cap = cap;
        self
    }

    /// Zeroes every delay while keeping bounds, for tests and tooling.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.poll_interval = Duration::from_millis(1);
        self.inject_settle = Duration::ZERO;
        self.scroll = ScrollTimings::instant();
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SaverConfig {
    /// Checks the configuration for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_file_component("folder", &self.folder)?;
        validate_file_component("mirrorFilename", &self.mirror_filename)?;

        if !(1..=100).contains(&self.capture_quality) {
            return Err(Error::config("captureQuality must be within 1-100"));
        }
        if !(1..=100).contains(&self.composite_quality) {
            return Err(Error::config("compositeQuality must be within 1-100"));
        }
        if self.default_page_count == 0 {
            return Err(Error::config("defaultPageCount must be at least 1"));
        }
        if self.default_page_count > self.max_page_count {
            return Err(Error::config(format!(
                "defaultPageCount {} exceeds maxPageCount {}",
                self.default_page_count, self.max_page_count
            )));
        }
        if self.default_category.trim().is_empty() {
            return Err(Error::config("defaultCategory must not be blank"));
        }
        if self.recent_tags_cap == 0 {
            return Err(Error::config("recentTagsCap must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::config("pollInterval must be greater than zero"));
        }
        if self.message_timeout.is_zero() {
            return Err(Error::config("messageTimeout must be greater than zero"));
        }
        if self.scroll.steps_per_page == 0 {
            return Err(Error::config("scroll.stepsPerPage must be at least 1"));
        }

        Ok(())
    }

    /// Absolute directory that receives images and the CSV mirror.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.downloads_root.join(&self.folder)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn default_downloads_root() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn validate_file_component(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(Error::config(format!(
            "{field} must be a single path component, got {value:?}"
        )));
    }
    Ok(())
}

/// Serde adapter storing a [`Duration`] as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Serde adapter storing an optional [`Duration`] as milliseconds or `null`.
mod option_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

// ============================================================================
// Tests
// ============================================================================
