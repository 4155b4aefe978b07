//! Trigger and management surface.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::browser::{Downloads, LocalDownloads, Tabs};
use crate::capture::{CaptureOrchestrator, CaptureRequest, CaptureStatus};
use crate::config::SaverConfig;
use crate::error::Result;
use crate::persist::{CsvExport, PersistenceGateway};
use crate::store::{
    KeyValueStore, RecordEdit, RecordFilter, RecordStore, SortOrder, TabRecord, select,
};

// ============================================================================
// TabSaver
// ============================================================================

/// Saves the active tab and manages the saved records.
///
/// # Example
///
/// ```ignore
/// let browser = Arc::new(RemoteBrowser::connect(server, &config).await?);
/// let store = Arc::new(JsonFileStore::open("tabs.json").await?);
/// let saver = TabSaver::from_browser(browser, store, config)?;
///
/// let status = saver
///     .start_capture(CaptureRequest::new().with_page_count(3).with_tags("rust"))
///     .await;
/// assert_eq!(status, "Saved!");
/// ```
pub struct TabSaver {
    orchestrator: CaptureOrchestrator,
    records: Arc<RecordStore>,
    gateway: Arc<PersistenceGateway>,
}

impl TabSaver {
    /// Wires the pipeline over the given capabilities and store.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) if `config` does not validate.
    pub fn new(
        tabs: Arc<dyn Tabs>,
        downloads: Arc<dyn Downloads>,
        kv: Arc<dyn KeyValueStore>,
        config: SaverConfig,
    ) -> Result<Self> {
        config.validate()?;

        let gateway = Arc::new(PersistenceGateway::new(downloads, &config));
        let records = Arc::new(RecordStore::new(kv, &config).with_mirror(gateway.clone()));
        let orchestrator =
            CaptureOrchestrator::new(tabs, Arc::clone(&gateway), Arc::clone(&records), &config);

        Ok(Self {
            orchestrator,
            records,
            gateway,
        })
    }

    /// Uses one browser for both tabs and downloads.
    pub fn from_browser<B>(
        browser: Arc<B>,
        kv: Arc<dyn KeyValueStore>,
        config: SaverConfig,
    ) -> Result<Self>
    where
        B: Tabs + Downloads + 'static,
    {
        let tabs: Arc<dyn Tabs> = browser.clone();
        Self::new(tabs, browser, kv, config)
    }

    /// Writes images and the CSV mirror under `config.downloads_root`
    /// instead of through the browser.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) if `config` does not validate.
    pub fn local(
        tabs: Arc<dyn Tabs>,
        kv: Arc<dyn KeyValueStore>,
        config: SaverConfig,
    ) -> Result<Self> {
        let downloads = Arc::new(LocalDownloads::from_config(&config));
        let saver = Self::new(tabs, downloads, kv, config.clone())?;

        info!(dir = %config.output_dir().display(), "Saving to local directory");
        Ok(saver)
    }

    /// Sets a handler that receives capture progress.
    #[must_use]
    pub fn with_status_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CaptureStatus) + Send + Sync + 'static,
    {
        self.orchestrator = self.orchestrator.with_status_handler(handler);
        self
    }

    // ========================================================================
    // Trigger
    // ========================================================================

    /// Captures the active tab and reports the outcome as a status line:
    /// `Saved!` or `Error: <reason>`.
    pub async fn start_capture(&self, request: CaptureRequest) -> String {
        match self.orchestrator.capture(request).await {
            Ok(_) => CaptureStatus::Saved.to_string(),
            Err(e) => {
                warn!(error = %e, "Capture failed");
                format!("Error: {e}")
            }
        }
    }

    /// Captures the active tab and returns the saved record.
    pub async fn capture(&self, request: CaptureRequest) -> Result<TabRecord> {
        self.orchestrator.capture(request).await
    }

    // ========================================================================
    // Management
    // ========================================================================

    /// Every record in stored order.
    pub async fn records(&self) -> Result<Vec<TabRecord>> {
        self.records.list().await
    }

    /// Reloads the records and rebuilds the category and tag caches from them.
    pub async fn reload(&self) -> Result<Vec<TabRecord>> {
        self.records.resync().await
    }

    /// Records passing `filter`, in `order`, with their positions.
    pub async fn query(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> Result<Vec<(usize, TabRecord)>> {
        let records = self.records.list().await?;
        Ok(select(&records, filter, order)
            .into_iter()
            .map(|(index, record)| (index, record.clone()))
            .collect())
    }

    /// Edits the record at `index`.
    pub async fn edit(&self, index: usize, edit: RecordEdit) -> Result<TabRecord> {
        self.records.edit(index, edit).await
    }

    /// Deletes the records at `indices` and returns how many were removed.
    pub async fn delete(&self, indices: &[usize]) -> Result<usize> {
        Ok(self.records.delete(indices).await?.len())
    }

    /// Starts a CSV export of every record.
    pub async fn export_csv(&self) -> Result<CsvExport> {
        let records = self.records.list().await?;
        self.gateway.export_csv(&records, Utc::now()).await
    }

    /// Known categories.
    pub async fn categories(&self) -> Result<Vec<String>> {
        self.records.categories().await
    }

    /// Recently used tags, most recent last.
    pub async fn recent_tags(&self) -> Result<Vec<String>> {
        self.records.recent_tags().await
    }
}

// ============================================================================
// Tests
// ============================================================================
