//! High-level image operations.
//!
//! These functions combine calculations with the codec and the removal
//! engine. The pipeline calls them; they know nothing about caching,
//! progress or the UI.

use super::calculations::{calculate_fit_dimensions, needs_fit};
use super::remover::{BackgroundRemover, RemovalError, verify_removal_output};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::borrow::Cow;
use tracing::debug;

/// Scale `image` down to fit within `max_dimension`, preserving aspect ratio.
///
/// Images that already fit are borrowed as-is (no copy). Larger images are
/// resampled with Lanczos3. Never scales up.
pub fn fit(image: &DynamicImage, max_dimension: u32) -> Cow<'_, DynamicImage> {
    let source = image.dimensions();
    if !needs_fit(source, max_dimension) {
        return Cow::Borrowed(image);
    }
    let (width, height) = calculate_fit_dimensions(source, max_dimension);
    debug!(
        from = ?source,
        to = ?(width, height),
        "resizing oversized image"
    );
    Cow::Owned(image.resize_exact(width, height, FilterType::Lanczos3))
}

/// Run a removal engine and enforce its output contract.
pub fn remove_background(
    remover: &dyn BackgroundRemover,
    image: &DynamicImage,
) -> Result<DynamicImage, RemovalError> {
    debug!(engine = remover.name(), dims = ?image.dimensions(), "removing background");
    let output = remover.remove(image)?;
    verify_removal_output(image, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::remover::tests::MockRemover;
    use crate::test_helpers::solid_rgb;
    use image::{Rgba, RgbaImage};

    #[test]
    fn fit_leaves_small_image_untouched() {
        let img = solid_rgb(500, 500, [1, 2, 3]);
        let out = fit(&img, 2000);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out.dimensions(), (500, 500));
    }

    #[test]
    fn fit_downscales_landscape() {
        let img = solid_rgb(4000, 1000, [9, 9, 9]);
        let out = fit(&img, 2000);
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(out.dimensions(), (2000, 500));
    }

    #[test]
    fn fit_downscales_portrait() {
        let img = solid_rgb(300, 900, [9, 9, 9]);
        let out = fit(&img, 600);
        assert_eq!(out.dimensions(), (200, 600));
    }

    #[test]
    fn fit_keeps_alpha_channel() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([5, 5, 5, 0])));
        let out = fit(&img, 10);
        assert_eq!(out.dimensions(), (10, 5));
        assert!(out.color().has_alpha());
    }

    #[test]
    fn remove_background_delegates_to_engine() {
        let remover = MockRemover::new();
        let out = remove_background(&remover, &solid_rgb(10, 10, [0, 0, 0])).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(remover.call_count(), 1);
    }

    struct ShrinkingRemover;

    impl BackgroundRemover for ShrinkingRemover {
        fn name(&self) -> &str {
            "shrinking"
        }

        fn remove(&self, image: &DynamicImage) -> Result<DynamicImage, RemovalError> {
            Ok(image.thumbnail_exact(1, 1))
        }
    }

    #[test]
    fn remove_background_rejects_contract_violation() {
        let result = remove_background(&ShrinkingRemover, &solid_rgb(10, 10, [0, 0, 0]));
        assert!(matches!(
            result,
            Err(RemovalError::DimensionMismatch { .. })
        ));
    }
}
