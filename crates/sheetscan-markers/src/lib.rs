//! Fiducial marker location and page rectification.

mod locator;
mod rectify;

pub use locator::{locate_markers, MarkerLocatorParams, SheetCorners};
pub use rectify::{marker_destinations_px, page_homography, rectify_page, scale_to_canonical};
