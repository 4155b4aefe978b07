//! Record store.
//!
//! Saved tabs live as one ordered list in a [`KeyValueStore`], next to two
//! small caches: the known categories and the recently used tags.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `kv` | [`KeyValueStore`] trait, [`MemoryStore`], [`JsonFileStore`] |
//! | `record` | [`TabRecord`] |
//! | `records` | [`RecordStore`]: append, replace, edit, delete, caches |
//! | `catalog` | Category normalisation and the recent-tags MRU list |
//! | `csv` | CSV rendering of the record list |
//! | `query` | Filtering and sorting for the management view |
//!
//! # Stored keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `savedTabs` | Array of [`TabRecord`] |
//! | `categories` | Array of category strings |
//! | `recentTags` | Array of tag strings, most recent last |

// ============================================================================
// Submodules
// ============================================================================

pub mod catalog;
pub mod csv;
mod kv;
mod query;
mod record;
mod records;

// ============================================================================
// Re-exports
// ============================================================================

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, load, save};
pub use query::{RecordFilter, SortDirection, SortKey, SortOrder, select};
pub use record::{TabRecord, split_tags};
pub use records::{
    CATEGORIES_KEY, RECENT_TAGS_KEY, RECORDS_KEY, RecordEdit, RecordMirror, RecordStore,
};
