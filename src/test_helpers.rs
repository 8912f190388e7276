//! Shared test utilities for the bgfix test suite.
//!
//! Provides synthetic images and encoders so tests never depend on fixture
//! files.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let img = framed_subject(500, 500, [255, 255, 255], [200, 30, 30], 100);
//! let png = encode_png_bytes(&img);
//! ```

use crate::types::ProcessedResult;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

// =========================================================================
// Synthetic images
// =========================================================================

/// Opaque single-color RGB image.
pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Opaque RGB image: `background` everywhere except a centered `subject`
/// rectangle inset by `margin` pixels on every side.
pub fn framed_subject(
    width: u32,
    height: u32,
    background: [u8; 3],
    subject: [u8; 3],
    margin: u32,
) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let inside = x >= margin && x < width - margin && y >= margin && y < height - margin;
        if inside { Rgb(subject) } else { Rgb(background) }
    });
    DynamicImage::ImageRgb8(img)
}

// =========================================================================
// Encoders (panic on failure, tests only)
// =========================================================================

pub fn encode_png_bytes(img: &DynamicImage) -> Vec<u8> {
    crate::imaging::encode_png(img).unwrap()
}

pub fn encode_jpeg(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 90))
        .unwrap();
    buf
}

/// Result for `original` and `processed`, with the download encoded from
/// `processed` and no source bytes.
pub fn processed_result(original: DynamicImage, processed: DynamicImage) -> ProcessedResult {
    ProcessedResult {
        fixed_png: encode_png_bytes(&processed),
        original,
        processed,
        source: Vec::new(),
    }
}

// =========================================================================
// Assertion helpers
// =========================================================================

/// Number of fully transparent pixels.
pub fn transparent_count(img: &RgbaImage) -> usize {
    img.pixels().filter(|p| p.0[3] == 0).count()
}
