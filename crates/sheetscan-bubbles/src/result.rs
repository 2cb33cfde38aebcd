use nalgebra::Point2;
use serde::Serialize;
use sheetscan_core::Rect;

/// A circular feature found on the canonical page. Carries no identity
/// until the assignment stage claims it for a question.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct DetectedCircle {
    pub center: Point2<f32>,
    pub radius: f32,
}

/// Per-question outcome of one detector.
#[derive(Clone, Debug, Serialize)]
pub struct BubbleResult {
    pub question_number: u32,
    /// `A`..`D` for multiple choice, `T`/`F` for true-false, `None` when
    /// unanswered.
    pub answer: Option<char>,
    pub confidence: f32,
    /// Whether the winning fill cleared the runner-up by the distinctness
    /// margin.
    pub distinct: bool,
    /// Question box on the canonical page, pixels.
    pub bounding_box: Rect,
}

/// Which detector produced the primary sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Template,
    Circle,
    Contour,
}

/// One detector's full output: per-question results plus the raw fills
/// they were derived from (index-aligned with the question's options).
///
/// Circle-based detectors also expose their claimed circles: `circles` is
/// the anonymous pool, `assignments[q][opt]` the claimed index. A circle
/// index never appears under two questions. Both stay empty for the
/// template detector.
#[derive(Clone, Debug)]
pub struct DetectorOutput {
    pub kind: DetectorKind,
    pub results: Vec<BubbleResult>,
    pub fills: Vec<Vec<f32>>,
    pub circles: Vec<DetectedCircle>,
    pub assignments: Vec<Vec<Option<usize>>>,
}
