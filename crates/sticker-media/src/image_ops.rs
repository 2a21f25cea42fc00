//! Still-image operations: centered square crop, size clamp and PNG encoding.
//!
//! Images are never enlarged. Downscaling uses Lanczos3.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Operation applied to a still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillOp {
    /// Center crop to `min(w, h)` and bound the side by the limit.
    Square,
    /// Fit inside a `limit x limit` box, keeping the aspect ratio.
    Clamp,
}

/// PNG produced by [`process_still`].
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Dimensions that fit `width x height` inside `max x max` without enlarging.
///
/// Rounds to the nearest pixel and never returns a zero side.
pub fn fit_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = (max as f64 / width as f64).min(max as f64 / height as f64);
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (fit(width), fit(height))
}

/// Decode an image, rejecting zero-sized input.
pub fn decode(bytes: &[u8]) -> MediaResult<DynamicImage> {
    let img = image::load_from_memory(bytes).map_err(|e| MediaError::image_decode(e.to_string()))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidImageDimensions { width, height });
    }
    Ok(img)
}

/// Centered square crop bounded by `max`.
pub fn square(img: &DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let side = width.min(height);
    let cropped = if width == height {
        img.clone()
    } else {
        img.crop_imm((width - side) / 2, (height - side) / 2, side, side)
    };
    if side > max {
        cropped.resize_exact(max, max, FilterType::Lanczos3)
    } else {
        cropped
    }
}

/// Fit inside `max x max` preserving aspect ratio.
pub fn clamp(img: &DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (w, h) = fit_dimensions(width, height, max);
    if (w, h) == (width, height) {
        img.clone()
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

/// Encode as PNG.
pub fn encode_png(img: &DynamicImage) -> MediaResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .map_err(|e| MediaError::ImageEncode(e.to_string()))?;
    Ok(buf)
}

/// Decode, apply `op` with the given side limit, and re-encode as PNG.
///
/// CPU bound; async callers should run it on a blocking thread.
pub fn process_still(bytes: &[u8], op: StillOp, max: u32) -> MediaResult<ProcessedImage> {
    let img = decode(bytes)?;
    let (src_w, src_h) = img.dimensions();

    let out = match op {
        StillOp::Square => square(&img, max),
        StillOp::Clamp => clamp(&img, max),
    };
    let (width, height) = out.dimensions();
    debug!(?op, src_w, src_h, width, height, "Processed still image");

    Ok(ProcessedImage {
        bytes: encode_png(&out)?,
        width,
        height,
    })
}
