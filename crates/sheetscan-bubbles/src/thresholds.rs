use serde::{Deserialize, Serialize};

/// Detector tuning shared by both bubble detectors, the fallback detector
/// and the arbiter. Distances are millimetres unless suffixed otherwise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorThresholds {
    /// Fill above which an option counts as answered.
    pub fill_answer: f32,
    /// Relaxation factor applied to `fill_answer` when the pick is distinct.
    pub fill_answer_relax: f32,
    /// Minimum margin over the runner-up to call a pick distinct.
    pub distinct_margin: f32,
    /// Fill at which confidence saturates to 1.
    pub confidence_scale: f32,
    /// Per-question confidence considered low by the aggregate formula.
    pub low_confidence: f32,
    pub low_confidence_penalty: f32,
    /// Aggregate confidence a detector must reach to be eligible as primary.
    pub detector_floor: f32,
    /// Factor applied to confidences when no sheet bounds were found.
    pub missing_bounds_penalty: f32,

    /// Row-level shift sweep extents and step.
    pub row_shift_x_mm: f32,
    pub row_shift_y_mm: f32,
    /// Acceptance ceiling for a row shift.
    pub max_row_shift_x_mm: f32,
    pub max_row_shift_y_mm: f32,
    /// Per-question local shift sweep extents.
    pub local_shift_x_mm: f32,
    pub local_shift_y_mm: f32,
    pub shift_step_mm: f32,

    /// Jitter grid for fill sampling.
    pub jitter_mm: f32,
    pub jitter_step_mm: f32,

    /// Scanline refinement: step and horizontal margin around the bubbles.
    pub scanline_step_mm: f32,
    pub scanline_margin_mm: f32,
    /// Peak-to-center match radius, in bubble radii.
    pub peak_match_radii: f32,
    /// Hough-window acceptance distance, in bubble radii.
    pub hough_match_radii: f32,

    /// Circle-proximity shift scoring threshold.
    pub proximity_threshold_mm: f32,
    /// Per-pair cap for circle-to-question assignment.
    pub assign_cap_mm: f32,
    /// Search-box margins for circle assignment.
    pub search_margin_x_mm: f32,
    pub search_margin_y_mm: f32,

    /// Annulus and disk factors for ring darkness and fill, in bubble radii.
    pub ring_inner: f32,
    pub ring_outer: f32,
    pub disk_factor: f32,
    /// Damping applied to the grayscale ring-contrast fill signal.
    pub ring_damping: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            fill_answer: 0.08,
            fill_answer_relax: 0.95,
            distinct_margin: 0.02,
            confidence_scale: 0.2,
            low_confidence: 0.3,
            low_confidence_penalty: 0.1,
            detector_floor: 0.5,
            missing_bounds_penalty: 0.8,

            row_shift_x_mm: 10.0,
            row_shift_y_mm: 6.0,
            max_row_shift_x_mm: 15.0,
            max_row_shift_y_mm: 8.0,
            local_shift_x_mm: 6.0,
            local_shift_y_mm: 8.0,
            shift_step_mm: 2.0,

            jitter_mm: 1.2,
            jitter_step_mm: 0.6,

            scanline_step_mm: 0.5,
            scanline_margin_mm: 5.0,
            peak_match_radii: 5.0,
            hough_match_radii: 1.5,

            proximity_threshold_mm: 6.0,
            assign_cap_mm: 12.0,
            search_margin_x_mm: 5.0,
            search_margin_y_mm: 2.0,

            ring_inner: 1.1,
            ring_outer: 1.6,
            disk_factor: 0.85,
            ring_damping: 0.5,
        }
    }
}
