//! Pure answer arbitration.
//!
//! Everything here is a function of already-produced fills and results, so
//! the selection rules are testable without touching an image.

use sheetscan_core::Rect;
use sheetscan_layout::BubbleExpectation;

use crate::result::{BubbleResult, DetectorOutput};
use crate::thresholds::DetectorThresholds;

/// Outcome of the per-question fill comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptionPick {
    pub index: Option<usize>,
    pub max_fill: f32,
    pub confidence: f32,
    pub distinct: bool,
}

/// Apply the fill-threshold and distinctness rules to one question's fills.
pub fn pick_option(fills: &[f32], th: &DetectorThresholds) -> OptionPick {
    if fills.is_empty() {
        return OptionPick {
            index: None,
            max_fill: 0.0,
            confidence: 0.0,
            distinct: false,
        };
    }

    let mut best = 0usize;
    for (i, &f) in fills.iter().enumerate() {
        if f > fills[best] {
            best = i;
        }
    }
    let max_fill = fills[best];
    let second = fills
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != best)
        .map(|(_, &f)| f)
        .fold(0.0f32, f32::max);

    let distinct = max_fill - second >= th.distinct_margin;
    let answered =
        max_fill >= th.fill_answer || (max_fill >= th.fill_answer_relax * th.fill_answer && distinct);

    OptionPick {
        index: answered.then_some(best),
        max_fill,
        confidence: (max_fill / th.confidence_scale).clamp(0.0, 1.0),
        distinct,
    }
}

/// Build a `BubbleResult` for one question from its fills.
pub fn result_from_fills(
    exp: &BubbleExpectation,
    box_px: Rect,
    fills: &[f32],
    th: &DetectorThresholds,
) -> BubbleResult {
    let pick = pick_option(fills, th);
    BubbleResult {
        question_number: exp.question_number,
        answer: pick.index.and_then(|i| exp.kind.letter(i)),
        confidence: pick.confidence,
        distinct: pick.distinct,
        bounding_box: box_px,
    }
}

/// Mean per-question confidence of one detector run.
pub fn aggregate_confidence(results: &[BubbleResult]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.confidence).sum::<f32>() / results.len() as f32
}

/// Choose the primary detector between the template and circle runs.
///
/// Eligible runs cover every question and clear the aggregate floor; the
/// higher aggregate wins, the template detector on a tie. `None` sends the
/// caller to the contour fallback.
pub fn choose_primary<'a>(
    template: &'a DetectorOutput,
    circle: &'a DetectorOutput,
    question_count: usize,
    th: &DetectorThresholds,
) -> Option<&'a DetectorOutput> {
    let eligible = |o: &DetectorOutput| {
        o.results.len() == question_count && aggregate_confidence(&o.results) >= th.detector_floor
    };

    match (eligible(template), eligible(circle)) {
        (true, true) => {
            if aggregate_confidence(&circle.results) > aggregate_confidence(&template.results) {
                Some(circle)
            } else {
                Some(template)
            }
        }
        (true, false) => Some(template),
        (false, true) => Some(circle),
        (false, false) => None,
    }
}

/// Aggregate confidence for the whole sheet.
pub fn overall_confidence(
    results: &[BubbleResult],
    th: &DetectorThresholds,
    bounds_found: bool,
) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    let mean = aggregate_confidence(results);
    let low = results
        .iter()
        .filter(|r| r.confidence < th.low_confidence)
        .count() as f32
        / results.len() as f32;

    let mut overall = (mean - th.low_confidence_penalty * low).clamp(0.0, 1.0);
    if !bounds_found {
        overall *= th.missing_bounds_penalty;
    }
    overall
}
