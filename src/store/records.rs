//! The record collection and its caches.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::config::SaverConfig;
use crate::error::{Error, Result};

use super::catalog;
use super::kv::{self, KeyValueStore};
use super::record::TabRecord;

// ============================================================================
// Constants
// ============================================================================

/// Key of the record list.
pub const RECORDS_KEY: &str = "savedTabs";

/// Key of the known-category list.
pub const CATEGORIES_KEY: &str = "categories";

/// Key of the recent-tags list.
pub const RECENT_TAGS_KEY: &str = "recentTags";

// ============================================================================
// RecordMirror
// ============================================================================

/// Receives the full record list after every change.
///
/// Implementations must not fail: a mirror is a copy, and losing an update
/// to it must never block the primary save.
#[async_trait]
pub trait RecordMirror: Send + Sync {
    /// Rewrites the mirror from `records`.
    async fn mirror(&self, records: &[TabRecord]);
}

// ============================================================================
// RecordEdit
// ============================================================================

/// User-editable fields of a record. Values are trimmed when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordEdit {
    /// New title. Must not be blank.
    pub title: String,
    /// New category, stored as entered.
    pub category: String,
    /// New comma-separated tags.
    pub tags: String,
}

impl RecordEdit {
    /// Creates an edit.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        tags: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            tags: tags.into(),
        }
    }
}

// ============================================================================
// RecordStore
// ============================================================================

/// Ordered list of [`TabRecord`]s plus the category and recent-tag caches.
///
/// Every change to the list rewrites the whole list and then the mirror,
/// once.
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
    mirror: Option<Arc<dyn RecordMirror>>,
    default_category: String,
    recent_tags_cap: usize,
}

impl RecordStore {
    /// Creates a store over `kv` using the category and cap from `config`.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, config: &SaverConfig) -> Self {
        Self {
            kv,
            mirror: None,
            default_category: config.default_category.clone(),
            recent_tags_cap: config.recent_tags_cap,
        }
    }

    /// Attaches a mirror that receives the list after every change.
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn RecordMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Reads every record in stored order.
    pub async fn list(&self) -> Result<Vec<TabRecord>> {
        Ok(kv::load(self.kv.as_ref(), RECORDS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Appends a record and returns its position.
    pub async fn append(&self, record: TabRecord) -> Result<usize> {
        let mut records = self.list().await?;
        records.push(record);
        self.replace_all(&records).await?;

        debug!(total = records.len(), "Record appended");
        Ok(records.len() - 1)
    }

    /// Replaces the whole list.
    pub async fn replace_all(&self, records: &[TabRecord]) -> Result<()> {
        kv::save(self.kv.as_ref(), RECORDS_KEY, records).await?;

        if let Some(mirror) = &self.mirror {
            mirror.mirror(records).await;
        }
        Ok(())
    }

    /// Applies an edit to the record at `index` and returns the result.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the trimmed title is empty
    /// - [`Error::RecordNotFound`] if `index` is out of range
    pub async fn edit(&self, index: usize, edit: RecordEdit) -> Result<TabRecord> {
        let title = edit.title.trim();
        if title.is_empty() {
            return Err(Error::invalid_argument("Title is required."));
        }

        let mut records = self.list().await?;
        let record = records
            .get_mut(index)
            .ok_or_else(|| Error::record_not_found(index))?;

        record.title = title.to_string();
        record.category = edit.category.trim().to_string();
        record.tags = edit.tags.trim().to_string();
        let updated = record.clone();

        self.replace_all(&records).await?;
        debug!(index, "Record edited");
        Ok(updated)
    }

    /// Removes the records at `indices` and returns them.
    ///
    /// Repeated indices count once. Screenshot files are left on disk.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] for the first out-of-range index; nothing is
    /// removed in that case.
    pub async fn delete(&self, indices: &[usize]) -> Result<Vec<TabRecord>> {
        let records = self.list().await?;

        if let Some(&bad) = indices.iter().find(|&&i| i >= records.len()) {
            return Err(Error::record_not_found(bad));
        }

        let doomed: FxHashSet<usize> = indices.iter().copied().collect();
        let (removed, kept): (Vec<_>, Vec<_>) = records
            .into_iter()
            .enumerate()
            .partition(|(i, _)| doomed.contains(i));

        let removed: Vec<TabRecord> = removed.into_iter().map(|(_, r)| r).collect();
        let kept: Vec<TabRecord> = kept.into_iter().map(|(_, r)| r).collect();

        self.replace_all(&kept).await?;

        let images = removed.iter().filter(|r| r.has_image()).count();
        info!(
            removed = removed.len(),
            remaining = kept.len(),
            images,
            "Records deleted, image files remain in the downloads folder"
        );
        Ok(removed)
    }

    // ========================================================================
    // Caches
    // ========================================================================

    /// Reads the known categories, `[default]` if none were stored.
    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(kv::load(self.kv.as_ref(), CATEGORIES_KEY)
            .await?
            .unwrap_or_else(|| vec![self.default_category.clone()]))
    }

    /// Maps `raw` onto its canonical category, registering a new one.
    pub async fn normalize_category(&self, raw: &str) -> Result<String> {
        let mut known = self.categories().await?;
        let before = known.len();

        let category = catalog::normalize_category(&mut known, raw, &self.default_category);

        if known.len() != before {
            kv::save(self.kv.as_ref(), CATEGORIES_KEY, &known).await?;
            debug!(category = %category, "New category registered");
        }
        Ok(category)
    }

    /// Reads the recent tags, most recent last.
    pub async fn recent_tags(&self) -> Result<Vec<String>> {
        Ok(kv::load(self.kv.as_ref(), RECENT_TAGS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Moves the tags in a comma-separated string to the recent end.
    pub async fn touch_tags(&self, tags: &str) -> Result<()> {
        if tags.trim().is_empty() {
            return Ok(());
        }

        let mut recent = self.recent_tags().await?;
        catalog::touch_tags(&mut recent, tags, self.recent_tags_cap);
        kv::save(self.kv.as_ref(), RECENT_TAGS_KEY, &recent).await
    }

    /// Rebuilds both caches from the records and returns the records.
    pub async fn resync(&self) -> Result<Vec<TabRecord>> {
        let records = self.list().await?;

        let categories = catalog::rebuild_categories(&records);
        let recent = catalog::rebuild_recent_tags(&records, self.recent_tags_cap);

        kv::save(self.kv.as_ref(), CATEGORIES_KEY, &categories).await?;
        kv::save(self.kv.as_ref(), RECENT_TAGS_KEY, &recent).await?;

        debug!(
            records = records.len(),
            categories = categories.len(),
            tags = recent.len(),
            "Caches rebuilt"
        );
        Ok(records)
    }
}

// ============================================================================
// Tests
// ============================================================================
