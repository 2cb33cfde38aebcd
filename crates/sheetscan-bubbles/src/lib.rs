//! Bubble detection and answer arbitration.
//!
//! Three detectors share one sampling vocabulary: the template-locked
//! detector re-anchors the printed grid and samples fill where bubbles are
//! expected, the circle detector works from anonymous Hough circles claimed
//! exclusively per question, and a contour fallback stands in when neither
//! clears the confidence floor. The arbiter is pure and operates on the
//! produced fills and results only.

mod arbiter;
mod assign;
mod circle_detector;
mod contour_detector;
mod hough;
mod result;
mod sample;
mod shift;
mod template_detector;
mod thresholds;

pub use arbiter::{
    aggregate_confidence, choose_primary, overall_confidence, pick_option, result_from_fills,
    OptionPick,
};
pub use assign::assign_circles;
pub use circle_detector::{detect_circle, detect_with_circles};
pub use contour_detector::{bubble_regions_as_circles, detect_contour};
pub use hough::{hough_circles, HoughParams};
pub use result::{BubbleResult, DetectedCircle, DetectorKind, DetectorOutput};
pub use sample::{
    disk_ink_ratio, fill_at, fill_single, jittered_fill, patch_otsu_threshold, ring_darkness,
    PageView,
};
pub use template_detector::detect_template;
pub use thresholds::DetectorThresholds;
