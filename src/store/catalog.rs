//! Known categories and recently used tags.
//!
//! Both lists are small and kept whole under their own keys. The functions
//! here operate on the in-memory lists; [`RecordStore`](super::RecordStore)
//! loads and saves them.

use rustc_hash::FxHashSet;

use super::record::{TabRecord, split_tags};

/// Maps `raw` onto its canonical category, registering it if new.
///
/// The trimmed input is matched case-insensitively against `known`. A match
/// returns the stored casing; otherwise the trimmed input is appended and
/// returned. Blank input yields `default` without touching `known`.
pub fn normalize_category(known: &mut Vec<String>, raw: &str, default: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default.to_string();
    }

    let key = trimmed.to_lowercase();
    if let Some(existing) = known.iter().find(|c| c.to_lowercase() == key) {
        return existing.clone();
    }

    known.push(trimmed.to_string());
    trimmed.to_string()
}

/// Moves each tag in the comma-separated `tags` to the most-recent end.
///
/// Matching is case-sensitive. Only the `cap` most recent tags are kept.
pub fn touch_tags(recent: &mut Vec<String>, tags: &str, cap: usize) {
    for tag in split_tags(tags) {
        recent.retain(|t| t != tag);
        recent.push(tag.to_string());
    }

    if recent.len() > cap {
        recent.drain(..recent.len() - cap);
    }
}

/// Rebuilds the known-category list from the categories records actually use.
///
/// Case variants collapse to one entry, preferring a capitalised spelling.
/// The result is sorted.
#[must_use]
pub fn rebuild_categories(records: &[TabRecord]) -> Vec<String> {
    let mut by_key: Vec<(String, String)> = Vec::new();

    for record in records {
        let category = record.category.trim();
        if category.is_empty() {
            continue;
        }

        let key = category.to_lowercase();
        match by_key.iter_mut().find(|(k, _)| *k == key) {
            None => by_key.push((key, category.to_string())),
            Some((_, existing)) => {
                if starts_uppercase(category) && !starts_uppercase(existing) {
                    *existing = category.to_string();
                }
            }
        }
    }

    let mut categories: Vec<String> = by_key.into_iter().map(|(_, c)| c).collect();
    categories.sort();
    categories
}

/// Rebuilds the recent-tags list from records, newest record first.
///
/// The returned list uses the same order as [`touch_tags`]: the tag of the
/// newest record is last.
#[must_use]
pub fn rebuild_recent_tags(records: &[TabRecord], cap: usize) -> Vec<String> {
    let mut newest_first: Vec<&TabRecord> = records.iter().collect();
    newest_first.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = FxHashSet::default();
    let mut tags: Vec<String> = newest_first
        .iter()
        .flat_map(|r| r.tag_list())
        .filter(|tag| seen.insert(*tag))
        .take(cap)
        .map(str::to_string)
        .collect();

    tags.reverse();
    tags
}

fn starts_uppercase(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.to_uppercase().eq(std::iter::once(c)))
}

// ============================================================================
// Tests
// ============================================================================
