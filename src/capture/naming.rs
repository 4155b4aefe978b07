//! Target checks and output file names.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use url::Url;

use crate::browser::JpegFormat;
use crate::error::{Error, Result};

/// URL schemes of browser-internal and extension pages.
pub const RESTRICTED_SCHEMES: &[&str] = &["chrome", "edge", "about", "chrome-extension", "moz-extension"];

/// Longest title prefix used in a file name.
const MAX_TITLE_CHARS: usize = 50;

static UNSAFE_TITLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^A-Za-z0-9]").expect("valid title pattern"));

/// Fails with [`Error::RestrictedPage`] unless `url` is a capturable page.
pub fn ensure_capturable(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|_| Error::restricted_page(url))?;

    if RESTRICTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(Error::restricted_page(url));
    }
    Ok(())
}

/// Replaces every character outside `[A-Za-z0-9]` with `_` and keeps the
/// first 50 characters.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    UNSAFE_TITLE_CHARS
        .replace_all(title, "_")
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// `2024-05-01T09:30:00.000Z` becomes `2024-05-01T09-30-00-000Z`.
#[must_use]
pub fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// `{sanitized title}_{timestamp slug}.jpg`
#[must_use]
pub fn image_filename(title: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        sanitize_title(title),
        timestamp_slug(at),
        JpegFormat::EXTENSION
    )
}
