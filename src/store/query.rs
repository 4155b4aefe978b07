//! Filtering and sorting for the management view.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::record::TabRecord;

// ============================================================================
// RecordFilter
// ============================================================================

/// Category and free-text filter. Empty parts match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Category, compared case-insensitively after trimming.
    pub category: String,
    /// Search text matched against title, tags and URL.
    pub search: String,
}

impl RecordFilter {
    /// Creates a filter that matches every record.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one category.
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Restricts to records containing `search`. `#` characters are ignored,
    /// so `#ai` finds the tag `ai`.
    #[inline]
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Returns `true` if the record passes both parts of the filter.
    #[must_use]
    pub fn matches(&self, record: &TabRecord) -> bool {
        let category = self.category.trim().to_lowercase();
        let category_ok = category.is_empty() || record.category.trim().to_lowercase() == category;

        let search = self.search.to_lowercase().replace('#', "");
        let search_ok = search.is_empty()
            || [&record.title, &record.tags, &record.url]
                .iter()
                .any(|field| field.to_lowercase().contains(&search));

        category_ok && search_ok
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Column to sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Save time.
    #[default]
    Date,
    /// Category.
    Category,
    /// Tag string.
    Tags,
    /// Page title.
    Title,
    /// Page URL.
    Url,
    /// Screenshot file name.
    ImageFilename,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[inline]
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Column plus direction. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Column.
    pub key: SortKey,
    /// Direction.
    pub direction: SortDirection,
}

impl SortOrder {
    /// Creates an order.
    #[inline]
    #[must_use]
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Order after the user clicks the header of `key`: the same column flips
    /// direction, a new column starts ascending.
    #[must_use]
    pub fn clicked(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }

    fn compare(&self, a: &TabRecord, b: &TabRecord) -> Ordering {
        let ordering = match self.key {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Category => compare_text(&a.category, &b.category),
            SortKey::Tags => compare_text(&a.tags, &b.tags),
            SortKey::Title => compare_text(&a.title, &b.title),
            SortKey::Url => compare_text(&a.url, &b.url),
            SortKey::ImageFilename => compare_text(&a.image_filename, &b.image_filename),
        };

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Filters and sorts records, keeping each one's position in `records`.
///
/// The sort is stable. The positions are what edit and delete take.
#[must_use]
pub fn select<'a>(
    records: &'a [TabRecord],
    filter: &RecordFilter,
    order: SortOrder,
) -> Vec<(usize, &'a TabRecord)> {
    let mut selected: Vec<(usize, &TabRecord)> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| filter.matches(record))
        .collect();

    selected.sort_by(|(_, a), (_, b)| order.compare(a, b));
    selected
}

// ============================================================================
// Tests
// ============================================================================
