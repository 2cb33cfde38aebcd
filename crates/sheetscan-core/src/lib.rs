//! Core raster types and geometry for answer-sheet scanning.
//!
//! This crate is intentionally free of any concrete detector or template
//! knowledge: it provides typed gray/binary images, the raster operations
//! the preprocessor needs, connected-region analysis, and planar homography
//! estimation with perspective warping.

mod filter;
mod homography;
mod image;
mod morphology;
mod rect;
mod regions;
mod threshold;

pub use filter::{
    gaussian_blur, gaussian_blur_f32, gray_stddev, laplacian_stddev, sobel_gradients, Gradients,
};
pub use homography::{
    estimate_homography, homography_from_4pt, max_reprojection_error, warp_perspective_gray,
    Homography,
};
pub use image::{
    downscale_to_max, get_gray_replicate, sample_bilinear, sample_bilinear_u8, BinaryImage,
    GrayImage, GrayImageView,
};
pub use morphology::{close, dilate, ellipse_kernel, erode, open};
pub use rect::Rect;
pub use regions::{
    approx_polygon, find_regions, find_regions_in, perimeter, trace_boundary, Region, RegionMap,
};
pub use threshold::{adaptive_threshold_gaussian, otsu_threshold_from_samples};
