//! Image-quality scoring.

use sheetscan_core::{gray_stddev, laplacian_stddev, GrayImageView};

/// Sharpness saturation point (Laplacian stddev).
const SHARPNESS_SCALE: f64 = 100.0;
/// Contrast saturation point (intensity stddev).
const CONTRAST_SCALE: f64 = 60.0;
/// Penalty applied when marker detection failed.
const MISSING_BOUNDS_PENALTY: f64 = 0.8;

/// Blend of focus and contrast evidence in 0..=1.
pub fn image_quality(gray: &GrayImageView<'_>, bounds_found: bool) -> f32 {
    let sharpness = laplacian_stddev(gray);
    let contrast = gray_stddev(gray);

    let mut q = 0.6 * (sharpness / SHARPNESS_SCALE).min(1.0)
        + 0.4 * (contrast / CONTRAST_SCALE).min(1.0);
    if !bounds_found {
        q *= MISSING_BOUNDS_PENALTY;
    }
    q.clamp(0.0, 1.0) as f32
}
