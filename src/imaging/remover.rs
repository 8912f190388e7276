//! Background removal engine trait and shared types.
//!
//! The [`BackgroundRemover`] trait is the seam between the pipeline and
//! whatever segmentation engine does the actual work. The pipeline only
//! relies on the contract below, so engines (or test mocks) can be swapped
//! without touching pipeline logic.
//!
//! ## Contract
//!
//! - Output has the same width and height as the input.
//! - Color channels are unchanged; background pixels get alpha 0.
//! - Failures are reported as [`RemovalError`] and are never retried.
//!
//! The built-in engine is [`BorderKeyRemover`](super::border_key::BorderKeyRemover).

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemovalError {
    #[error("cannot remove the background of an empty image")]
    EmptyImage,
    #[error("engine returned {actual:?} for a {expected:?} input")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("{engine} failed: {message}")]
    Engine { engine: String, message: String },
}

/// Trait for background removal engines.
///
/// `Send + Sync` so a single engine can be shared by concurrent requests.
pub trait BackgroundRemover: Send + Sync {
    /// Short engine name used in logs.
    fn name(&self) -> &str;

    /// Return a copy of `image` with background pixels made transparent.
    fn remove(&self, image: &DynamicImage) -> Result<DynamicImage, RemovalError>;
}

/// Reject engine output that breaks the same-dimensions contract.
pub fn verify_removal_output(
    input: &DynamicImage,
    output: DynamicImage,
) -> Result<DynamicImage, RemovalError> {
    let expected = input.dimensions();
    let actual = output.dimensions();
    if expected != actual {
        return Err(RemovalError::DimensionMismatch { expected, actual });
    }
    Ok(output)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock engine that records the dimensions it was handed and clears the
    /// alpha of the top-left quadrant. Uses Mutex (not RefCell) so it is
    /// Sync and can be shared across threads like a real engine.
    #[derive(Default)]
    pub struct MockRemover {
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<(u32, u32)>>,
        pub fail_with: Option<String>,
    }

    impl MockRemover {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn seen_dimensions(&self) -> Vec<(u32, u32)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl BackgroundRemover for MockRemover {
        fn name(&self) -> &str {
            "mock"
        }

        fn remove(&self, image: &DynamicImage) -> Result<DynamicImage, RemovalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(image.dimensions());
            if let Some(message) = &self.fail_with {
                return Err(RemovalError::Engine {
                    engine: self.name().to_string(),
                    message: message.clone(),
                });
            }
            let mut rgba = image.to_rgba8();
            let (w, h) = rgba.dimensions();
            for y in 0..h / 2 {
                for x in 0..w / 2 {
                    rgba.get_pixel_mut(x, y).0[3] = 0;
                }
            }
            Ok(DynamicImage::ImageRgba8(rgba))
        }
    }

    #[test]
    fn mock_records_calls_and_dimensions() {
        let remover = MockRemover::new();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 255])));

        let out = remover.remove(&img).unwrap();
        assert_eq!(out.dimensions(), (8, 6));
        assert_eq!(remover.call_count(), 1);
        assert_eq!(remover.seen_dimensions(), vec![(8, 6)]);
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0[3], 0);
        assert_eq!(out.to_rgba8().get_pixel(7, 5).0[3], 255);
    }

    #[test]
    fn mock_failure_is_engine_error() {
        let remover = MockRemover::failing("model crashed");
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        let err = remover.remove(&img).unwrap_err();
        assert_eq!(err.to_string(), "mock failed: model crashed");
    }

    #[test]
    fn verify_accepts_same_dimensions() {
        let input = DynamicImage::ImageRgba8(RgbaImage::new(5, 4));
        let output = DynamicImage::ImageRgba8(RgbaImage::new(5, 4));
        assert!(verify_removal_output(&input, output).is_ok());
    }

    #[test]
    fn verify_rejects_resized_output() {
        let input = DynamicImage::ImageRgba8(RgbaImage::new(5, 4));
        let output = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        assert!(matches!(
            verify_removal_output(&input, output),
            Err(RemovalError::DimensionMismatch {
                expected: (5, 4),
                actual: (4, 4)
            })
        ));
    }
}
