//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions of an image scaled down to fit a bounding box.
///
/// If both sides are already within `max_dimension` the source dimensions
/// are returned unchanged. Otherwise the longer side becomes exactly
/// `max_dimension` and the shorter side is scaled proportionally, rounded
/// down to a whole pixel (never below 1). Images are never scaled up.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `max_dimension` - Bounding dimension for the longer side
///
/// # Returns
/// * `(width, height)` - Dimensions to resize to
///
/// # Examples
/// ```
/// # use bgfix::imaging::calculate_fit_dimensions;
/// // 4000x1000 landscape capped at 2000 → 2000x500
/// assert_eq!(calculate_fit_dimensions((4000, 1000), 2000), (2000, 500));
///
/// // Already small enough → unchanged
/// assert_eq!(calculate_fit_dimensions((640, 480), 2000), (640, 480));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w <= max_dimension && src_h <= max_dimension {
        return source;
    }

    // Integer math keeps the floor exact for large dimensions
    let scale_side = |side: u32, longer: u32| -> u32 {
        let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(longer);
        (scaled as u32).max(1)
    };

    if src_w > src_h {
        (max_dimension, scale_side(src_h, src_w))
    } else {
        (scale_side(src_w, src_h), max_dimension)
    }
}

/// Whether an image of the given dimensions needs resizing to fit.
pub fn needs_fit(source: (u32, u32), max_dimension: u32) -> bool {
    source.0 > max_dimension || source.1 > max_dimension
}
