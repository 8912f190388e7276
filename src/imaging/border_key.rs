//! Built-in background removal engine: border color keying.
//!
//! Works well for product shots and illustrations on a roughly uniform
//! backdrop. The engine:
//!
//! 1. Estimates the background color as the per-channel median of the
//!    opaque pixels along the image border.
//! 2. Flood-fills (4-connected) inward from every border pixel, crossing
//!    only pixels within `tolerance` of that color (Euclidean RGB distance,
//!    0–441). Pixels that are already transparent are crossed too.
//! 3. Sets alpha to 0 on every filled pixel; everything else keeps its
//!    color and alpha.
//!
//! Because the fill only grows from the border, background-colored regions
//! enclosed by the subject (e.g. a white logo on a shirt) are kept.

use super::remover::{BackgroundRemover, RemovalError};
use image::{DynamicImage, Rgba, RgbaImage};

/// Default color distance treated as background.
pub const DEFAULT_TOLERANCE: u32 = 48;

/// Maximum meaningful tolerance: the RGB cube diagonal, `sqrt(3 * 255²)`.
pub const MAX_TOLERANCE: u32 = 441;

#[derive(Debug, Clone)]
pub struct BorderKeyRemover {
    tolerance: u32,
}

impl BorderKeyRemover {
    pub fn new(tolerance: u32) -> Self {
        Self {
            tolerance: tolerance.min(MAX_TOLERANCE),
        }
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }
}

impl Default for BorderKeyRemover {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl BackgroundRemover for BorderKeyRemover {
    fn name(&self) -> &str {
        "border-key"
    }

    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage, RemovalError> {
        let mut rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(RemovalError::EmptyImage);
        }

        let Some(background) = estimate_background(&rgba) else {
            // Border is fully transparent already: nothing to key against.
            return Ok(DynamicImage::ImageRgba8(rgba));
        };

        let mask = flood_background(&rgba, background, self.tolerance);
        for (pixel, is_background) in rgba.pixels_mut().zip(mask) {
            if is_background {
                pixel.0[3] = 0;
            }
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

/// Coordinates of every pixel on the image border, each listed once.
fn border_coords(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top_bottom = (0..width).flat_map(move |x| {
        let bottom = (height > 1).then_some((x, height - 1));
        std::iter::once((x, 0)).chain(bottom)
    });
    let sides = (1..height.saturating_sub(1)).flat_map(move |y| {
        let right = (width > 1).then_some((width - 1, y));
        std::iter::once((0, y)).chain(right)
    });
    top_bottom.chain(sides)
}

/// Per-channel median of the opaque border pixels, or `None` if every
/// border pixel is fully transparent.
fn estimate_background(img: &RgbaImage) -> Option<[u8; 3]> {
    let (width, height) = img.dimensions();
    let mut channels: [Vec<u8>; 3] = Default::default();
    for (x, y) in border_coords(width, height) {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        if a > 0 {
            channels[0].push(r);
            channels[1].push(g);
            channels[2].push(b);
        }
    }
    if channels[0].is_empty() {
        return None;
    }
    Some(channels.map(|mut values| {
        values.sort_unstable();
        values[values.len() / 2]
    }))
}

fn within_tolerance(pixel: &Rgba<u8>, background: [u8; 3], tolerance: u32) -> bool {
    if pixel.0[3] == 0 {
        return true;
    }
    let dist_sq: u32 = pixel.0[..3]
        .iter()
        .zip(background)
        .map(|(&c, b)| {
            let d = u32::from(c.abs_diff(b));
            d * d
        })
        .sum();
    dist_sq <= tolerance * tolerance
}

/// Row-major mask of pixels reachable from the border through
/// background-colored pixels.
fn flood_background(img: &RgbaImage, background: [u8; 3], tolerance: u32) -> Vec<bool> {
    let (width, height) = img.dimensions();
    let index = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;
    let mut mask = vec![false; width as usize * height as usize];
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for (x, y) in border_coords(width, height) {
        if !mask[index(x, y)] && within_tolerance(img.get_pixel(x, y), background, tolerance) {
            mask[index(x, y)] = true;
            stack.push((x, y));
        }
    }

    while let Some((x, y)) = stack.pop() {
        let neighbors = [
            x.checked_sub(1).map(|nx| (nx, y)),
            (x + 1 < width).then_some((x + 1, y)),
            y.checked_sub(1).map(|ny| (x, ny)),
            (y + 1 < height).then_some((x, y + 1)),
        ];
        for (nx, ny) in neighbors.into_iter().flatten() {
            let i = index(nx, ny);
            if !mask[i] && within_tolerance(img.get_pixel(nx, ny), background, tolerance) {
                mask[i] = true;
                stack.push((nx, ny));
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{framed_subject, transparent_count};
    use image::GenericImageView;

    #[test]
    fn border_coords_cover_each_edge_pixel_once() {
        let coords: Vec<_> = border_coords(4, 3).collect();
        // 4 + 4 (top/bottom) + 2 (left/right of the middle row)
        assert_eq!(coords.len(), 10);
        let mut dedup = coords.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), coords.len());
    }

    #[test]
    fn border_coords_single_pixel_and_single_row() {
        assert_eq!(border_coords(1, 1).collect::<Vec<_>>(), vec![(0, 0)]);
        assert_eq!(border_coords(3, 1).count(), 3);
        assert_eq!(border_coords(1, 3).count(), 3);
    }

    #[test]
    fn removes_uniform_background_keeps_subject() {
        let img = framed_subject(100, 80, [255, 255, 255], [200, 30, 30], 20);
        let out = BorderKeyRemover::default().remove(&img).unwrap();
        let rgba = out.to_rgba8();

        assert_eq!(out.dimensions(), (100, 80));
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
        assert_eq!(rgba.get_pixel(99, 79).0[3], 0);
        assert_eq!(rgba.get_pixel(50, 40).0, [200, 30, 30, 255]);
        // Subject: 60x40 block
        assert_eq!(transparent_count(&rgba), 100 * 80 - 60 * 40);
    }

    #[test]
    fn color_channels_are_untouched() {
        let img = framed_subject(30, 30, [10, 200, 10], [0, 0, 0], 5);
        let out = BorderKeyRemover::default().remove(&img).unwrap().to_rgba8();
        assert_eq!(&out.get_pixel(0, 0).0[..3], &[10, 200, 10]);
    }

    #[test]
    fn enclosed_background_colored_region_is_kept() {
        // White frame, red ring, white hole in the middle
        let mut rgba = RgbaImage::from_pixel(30, 30, Rgba([255, 255, 255, 255]));
        for y in 5..25 {
            for x in 5..25 {
                let hole = (12..18).contains(&x) && (12..18).contains(&y);
                if !hole {
                    rgba.put_pixel(x, y, Rgba([220, 0, 0, 255]));
                }
            }
        }
        let out = BorderKeyRemover::default()
            .remove(&DynamicImage::ImageRgba8(rgba))
            .unwrap()
            .to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(15, 15).0[3], 255);
    }

    #[test]
    fn zero_tolerance_only_exact_matches() {
        let mut rgba = RgbaImage::from_pixel(10, 10, Rgba([100, 100, 100, 255]));
        rgba.put_pixel(0, 5, Rgba([101, 100, 100, 255]));
        let out = BorderKeyRemover::new(0)
            .remove(&DynamicImage::ImageRgba8(rgba))
            .unwrap()
            .to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(0, 5).0[3], 255);
    }

    #[test]
    fn tolerance_is_clamped() {
        assert_eq!(BorderKeyRemover::new(10_000).tolerance(), MAX_TOLERANCE);
    }

    #[test]
    fn transparent_border_is_left_alone() {
        let rgba = RgbaImage::from_pixel(6, 6, Rgba([9, 9, 9, 0]));
        let out = BorderKeyRemover::default()
            .remove(&DynamicImage::ImageRgba8(rgba.clone()))
            .unwrap();
        assert_eq!(out.to_rgba8(), rgba);
    }

    #[test]
    fn empty_image_is_error() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(matches!(
            BorderKeyRemover::default().remove(&img),
            Err(RemovalError::EmptyImage)
        ));
    }

    #[test]
    fn median_ignores_a_few_outliers() {
        let mut rgba = RgbaImage::from_pixel(20, 20, Rgba([240, 240, 240, 255]));
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        rgba.put_pixel(19, 0, Rgba([0, 0, 0, 255]));
        assert_eq!(estimate_background(&rgba), Some([240, 240, 240]));
    }
}
