//! Filesystem-backed downloads area.
//!
//! Writes run on background tasks; callers poll [`Downloads::search`] for
//! the terminal state, exactly as with a browser's downloads API.
//!
//! A finished write is reported once: the search that sees it complete or
//! interrupted also forgets it. Writes nobody polls (the CSV mirror) are
//! dropped once more than 64 items are held.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::SaverConfig;
use crate::error::{Error, Result};
use crate::identifiers::DownloadId;
use crate::protocol::ConflictAction;

use super::capability::{DownloadItem, DownloadRequest, DownloadState, Downloads};

// ============================================================================
// Constants
// ============================================================================

/// Items held before finished, unpolled writes are dropped.
const MAX_TRACKED: usize = 64;

// ============================================================================
// LocalDownloads
// ============================================================================

/// Downloads area rooted at a local directory.
pub struct LocalDownloads {
    root: PathBuf,
    next_id: AtomicU32,
    items: Arc<Mutex<FxHashMap<DownloadId, DownloadItem>>>,
}

impl LocalDownloads {
    /// Creates a downloads area rooted at `root`.
    ///
    /// The directory is created on the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_id: AtomicU32::new(1),
            items: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Creates a downloads area rooted at `config.downloads_root`.
    #[must_use]
    pub fn from_config(config: &SaverConfig) -> Self {
        Self::new(config.downloads_root.clone())
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a relative download name onto the root, rejecting escapes.
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let relative = Path::new(filename);
        let mut target = self.root.clone();
        let mut parts = 0;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    target.push(part);
                    parts += 1;
                }
                Component::CurDir => {}
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "download filename must stay inside the downloads area: {filename}"
                    )));
                }
            }
        }

        if parts == 0 {
            return Err(Error::invalid_argument("download filename is empty"));
        }

        Ok(target)
    }
}

#[async_trait]
impl Downloads for LocalDownloads {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId> {
        let target = self.resolve(&request.filename)?;
        let id = DownloadId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        if request.save_as {
            debug!(id = %id, "Save-as prompt not available, writing to downloads area");
        }

        {
            let mut items = self.items.lock();
            items.insert(
                id,
                DownloadItem {
                    id,
                    path: target.clone(),
                    state: DownloadState::InProgress,
                    error: None,
                },
            );
            if items.len() > MAX_TRACKED {
                items.retain(|_, item| !item.state.is_terminal());
            }
        }

        let items = Arc::clone(&self.items);
        let DownloadRequest {
            bytes,
            conflict_action,
            ..
        } = request;

        tokio::spawn(async move {
            let outcome = write_file(&target, &bytes, conflict_action).await;

            let mut items = items.lock();
            let Some(item) = items.get_mut(&id) else {
                return;
            };

            match outcome {
                Ok(path) => {
                    debug!(id = %id, path = %path.display(), bytes = bytes.len(), "Download complete");
                    item.path = path;
                    item.state = DownloadState::Complete;
                }
                Err(e) => {
                    warn!(id = %id, path = %target.display(), error = %e, "Download interrupted");
                    item.state = DownloadState::Interrupted;
                    item.error = Some(e.to_string());
                }
            }
        });

        Ok(id)
    }

    async fn search(&self, id: DownloadId) -> Result<Option<DownloadItem>> {
        let mut items = self.items.lock();
        let finished = match items.get(&id) {
            None => return Ok(None),
            Some(item) => item.state.is_terminal(),
        };

        if finished {
            Ok(items.remove(&id))
        } else {
            Ok(items.get(&id).cloned())
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Writes `bytes` to `target` or, when uniquifying, to the first free
/// `name (n).ext` sibling. Returns the path actually written.
async fn write_file(
    target: &Path,
    bytes: &[u8],
    conflict_action: ConflictAction,
) -> std::io::Result<PathBuf> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    match conflict_action {
        ConflictAction::Overwrite => {
            fs::write(target, bytes).await?;
            Ok(target.to_path_buf())
        }
        ConflictAction::Uniquify => {
            let mut attempt = 0u32;
            loop {
                let candidate = numbered_path(target, attempt);
                match OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&candidate)
                    .await
                {
                    Ok(mut file) => {
                        file.write_all(bytes).await?;
                        file.flush().await?;
                        return Ok(candidate);
                    }
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                    Err(e) => return Err(e),
                }
            }
        }
    }
}

/// `dir/name.ext` for 0, `dir/name (n).ext` otherwise.
fn numbered_path(target: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return target.to_path_buf();
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    };
    target.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================
