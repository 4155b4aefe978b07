//! Vertical stitching of viewport captures.

use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, imageops};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// CompositeImage
// ============================================================================

/// An encoded JPEG and its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

// ============================================================================
// stitch
// ============================================================================

/// Decodes `snapshots` and stacks them top to bottom, first on top.
///
/// The composite is as wide as the first snapshot and as tall as all of them
/// together. Snapshots are assumed to share a width; a narrower one leaves
/// black on its right, a wider one is cut off.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if `snapshots` is empty
/// - [`Error::Decode`] naming the first snapshot that cannot be decoded
/// - [`Error::Encode`] if the composite is too large or cannot be encoded
pub fn stitch(snapshots: &[Vec<u8>], quality: u8) -> Result<CompositeImage> {
    if snapshots.is_empty() {
        return Err(Error::invalid_argument("no snapshots to stitch"));
    }

    let decoded = snapshots
        .iter()
        .enumerate()
        .map(|(index, bytes)| {
            image::load_from_memory(bytes)
                .map(|image| image.to_rgb8())
                .map_err(|e| Error::decode(index, e.to_string()))
        })
        .collect::<Result<Vec<RgbImage>>>()?;

    let width = decoded[0].width();
    let height = decoded
        .iter()
        .try_fold(0u32, |total, image| total.checked_add(image.height()))
        .ok_or_else(|| Error::encode("composite height overflows"))?;

    let mut canvas = RgbImage::new(width, height);
    let mut offset = 0i64;

    for (index, image) in decoded.iter().enumerate() {
        if image.width() != width {
            warn!(index, width = image.width(), expected = width, "Snapshot width differs");
        }
        imageops::replace(&mut canvas, image, 0, offset);
        offset += i64::from(image.height());
    }

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&canvas)
        .map_err(|e| Error::encode(e.to_string()))?;

    debug!(
        snapshots = snapshots.len(),
        width,
        height,
        bytes = bytes.len(),
        "Composite encoded"
    );

    Ok(CompositeImage {
        bytes,
        width,
        height,
    })
}

// ============================================================================
// Tests
// ============================================================================
