use serde::Serialize;
use sheetscan_bubbles::{BubbleResult, DetectorKind};
use sheetscan_digits::DigitRecognition;
use sheetscan_markers::SheetCorners;

/// Everything one grading call produces.
///
/// `bubbles_primary` is the arbitrated per-question sequence; the two
/// detector sequences are retained verbatim for inspection and caller-side
/// tie-breaking, as are both digit readings.
#[derive(Clone, Debug, Serialize)]
pub struct OcrResult {
    pub bubbles_primary: Vec<BubbleResult>,
    pub bubbles_template: Vec<BubbleResult>,
    pub bubbles_circle: Vec<BubbleResult>,
    /// Which detector the primary sequence came from.
    pub primary_detector: DetectorKind,

    pub digits_primary: Vec<DigitRecognition>,
    pub digits_segments: Vec<DigitRecognition>,
    pub digits_template: Vec<DigitRecognition>,

    /// Located marker corners in raw-image pixels, absent when marker
    /// detection failed and the page was graded unrectified.
    pub sheet_bounds: Option<SheetCorners>,
    pub image_quality: f32,
    pub overall_confidence: f32,
    pub processing_ms: u64,
}

impl OcrResult {
    /// Primary student-ID reading as a string, unreadable cells as `?`.
    pub fn student_id(&self) -> String {
        self.digits_primary
            .iter()
            .map(|d| match d.digit {
                Some(v) => char::from(b'0' + v),
                None => '?',
            })
            .collect()
    }

    /// Answer letters in question order, unanswered as `None`.
    pub fn answers(&self) -> Vec<Option<char>> {
        self.bubbles_primary.iter().map(|b| b.answer).collect()
    }
}
