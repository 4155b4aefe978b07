//! Writes into the downloads area.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::browser::{DownloadItem, DownloadRequest, DownloadState, Downloads, JpegFormat};
use crate::config::SaverConfig;
use crate::error::{Error, Result};
use crate::identifiers::DownloadId;
use crate::protocol::ConflictAction;
use crate::store::{RecordMirror, TabRecord, csv};

// ============================================================================
// Types
// ============================================================================

/// A screenshot that reached the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    /// File name as written.
    pub filename: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// `file://` URL of the file.
    pub file_url: String,
}

/// A started user export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Suggested file name.
    pub filename: String,
    /// Download handle.
    pub download_id: DownloadId,
}

// ============================================================================
// PersistenceGateway
// ============================================================================

/// Saves screenshots and CSV files through a [`Downloads`] area.
pub struct PersistenceGateway {
    downloads: Arc<dyn Downloads>,
    folder: String,
    mirror_filename: String,
    poll_interval: Duration,
    write_timeout: Option<Duration>,
}

impl PersistenceGateway {
    /// Creates a gateway writing into `config.folder`.
    #[must_use]
    pub fn new(downloads: Arc<dyn Downloads>, config: &SaverConfig) -> Self {
        Self {
            downloads,
            folder: config.folder.clone(),
            mirror_filename: config.mirror_filename.clone(),
            poll_interval: config.poll_interval,
            write_timeout: config.write_timeout,
        }
    }

    /// Writes a JPEG into the folder and waits until the write finishes.
    ///
    /// # Errors
    ///
    /// - [`Error::WriteInterrupted`] if the write failed
    /// - [`Error::DownloadNotFound`] if the area lost track of the write
    /// - [`Error::WriteTimeout`] if the write did not finish in time
    /// - Any error starting the write
    pub async fn save_image(&self, bytes: Vec<u8>, filename: &str) -> Result<SavedImage> {
        let relative = format!("{}/{}", self.folder, filename);
        debug!(filename = %relative, bytes = bytes.len(), "Saving image");

        let id = self
            .downloads
            .download(DownloadRequest::new(relative, bytes, JpegFormat::MIME_TYPE))
            .await?;

        let item = self.wait_for_completion(id, filename).await?;
        let file_url = file_url(&item.path);
        let filename = item
            .path
            .file_name()
            .map_or_else(|| filename.to_string(), |n| n.to_string_lossy().into_owned());

        info!(path = %item.path.display(), "Image saved");

        Ok(SavedImage {
            filename,
            path: item.path,
            file_url,
        })
    }

    /// Polls the write until it reaches a terminal state.
    pub async fn wait_for_completion(&self, id: DownloadId, filename: &str) -> Result<DownloadItem> {
        match self.write_timeout {
            None => self.poll(id, filename).await,
            Some(limit) => tokio::time::timeout(limit, self.poll(id, filename))
                .await
                .map_err(|_| Error::write_timeout(id, limit.as_millis() as u64))?,
        }
    }

    async fn poll(&self, id: DownloadId, filename: &str) -> Result<DownloadItem> {
        let mut attempt = 0u32;

        loop {
            let item = self
                .downloads
                .search(id)
                .await?
                .ok_or_else(|| Error::download_not_found(id))?;

            match item.state {
                DownloadState::Complete => return Ok(item),
                DownloadState::Interrupted => {
                    let reason = item
                        .error
                        .unwrap_or_else(|| "Download interrupted".to_string());
                    return Err(Error::write_interrupted(filename, reason));
                }
                DownloadState::InProgress => {
                    attempt += 1;
                    trace!(id = %id, attempt, "Download in progress");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Rewrites the CSV mirror in the folder. Failures are logged, not returned.
    pub async fn write_csv_mirror(&self, records: &[TabRecord]) {
        let relative = format!("{}/{}", self.folder, self.mirror_filename);
        let request = DownloadRequest::new(relative, csv::encode(records).into_bytes(), "text/csv")
            .with_conflict_action(ConflictAction::Overwrite);

        match self.downloads.download(request).await {
            Ok(id) => debug!(id = %id, records = records.len(), "CSV mirror written"),
            Err(e) => warn!(error = %e, "CSV mirror write failed"),
        }
    }

    /// Starts a user export of `records`, letting the user choose where.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if there is nothing to export, or any error
    /// starting the download.
    pub async fn export_csv(&self, records: &[TabRecord], now: DateTime<Utc>) -> Result<CsvExport> {
        if records.is_empty() {
            return Err(Error::invalid_argument("No records to download."));
        }

        let filename = export_filename(now);
        let request = DownloadRequest::new(&filename, csv::encode(records).into_bytes(), "text/csv")
            .with_save_as(true);

        let download_id = self.downloads.download(request).await?;
        info!(filename = %filename, records = records.len(), "CSV export started");

        Ok(CsvExport {
            filename,
            download_id,
        })
    }
}

#[async_trait]
impl RecordMirror for PersistenceGateway {
    async fn mirror(&self, records: &[TabRecord]) {
        self.write_csv_mirror(records).await;
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `saved-tabs-export-YYYY-MM-DD.csv` for the UTC date of `now`.
#[must_use]
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("saved-tabs-export-{}.csv", now.format("%Y-%m-%d"))
}

fn file_url(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .unwrap_or_else(|()| format!("file:///{}", path.display()))
}

// ============================================================================
// Tests
// ============================================================================
