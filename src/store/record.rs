//! Saved tab record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TabRecord
// ============================================================================

/// One saved tab.
///
/// Records have no identifier of their own; they are addressed by position
/// in the stored list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    /// When the tab was saved.
    pub date: DateTime<Utc>,

    /// Category, in its canonical casing.
    #[serde(default)]
    pub category: String,

    /// Comma-separated tags as entered.
    #[serde(default)]
    pub tags: String,

    /// Page title.
    #[serde(default)]
    pub title: String,

    /// Page URL.
    #[serde(default)]
    pub url: String,

    /// File name of the screenshot, empty without one.
    #[serde(default)]
    pub image_filename: String,

    /// `file://` URL of the screenshot, empty without one.
    #[serde(default)]
    pub image_path: String,
}

impl TabRecord {
    /// Iterates the non-empty, trimmed tags in entry order.
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        split_tags(&self.tags)
    }

    /// Returns `true` if a screenshot was saved with the record.
    #[inline]
    #[must_use]
    pub fn has_image(&self) -> bool {
        !self.image_path.is_empty()
    }

    /// The date in the form written to CSV, e.g. `2024-05-01T09:30:00.000Z`.
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Splits a comma-separated tag string, trimming and dropping empties.
pub fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(',').map(str::trim).filter(|t| !t.is_empty())
}

// ============================================================================
// Tests
// ============================================================================
