//! Segment-contrast digit recognition, the primary method.
//!
//! Each cell is normalized, the seven segment regions are compared against
//! flanking background strips, and the digit whose lit-segment set best
//! explains the contrasts wins.

use sheetscan_core::{GrayImageView, Rect};
use sheetscan_layout::segments::{DIGIT_SEGMENTS, SEGMENT_COUNT, SEGMENT_RECTS};
use sheetscan_layout::DigitCell;

use crate::params::{DigitParams, DigitRecognition};

/// Grayscale cell patch normalized to the full intensity range.
pub(crate) struct CellPatch {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl CellPatch {
    /// Cut the cell out of the page and stretch its intensities to 0..255.
    ///
    /// Returns `None` for degenerate or flat (blank) cells.
    pub(crate) fn extract(gray: &GrayImageView<'_>, rect_px: Rect) -> Option<CellPatch> {
        let x0 = rect_px.x.round().max(0.0) as usize;
        let y0 = rect_px.y.round().max(0.0) as usize;
        let x1 = (rect_px.right().round() as usize).min(gray.width);
        let y1 = (rect_px.bottom().round() as usize).min(gray.height);
        if x1 <= x0 + 2 || y1 <= y0 + 2 {
            return None;
        }

        let (w, h) = (x1 - x0, y1 - y0);
        let mut data = Vec::with_capacity(w * h);
        let mut min = 255u8;
        let mut max = 0u8;
        for y in y0..y1 {
            for x in x0..x1 {
                let v = gray.data[y * gray.width + x];
                min = min.min(v);
                max = max.max(v);
                data.push(v);
            }
        }
        if max <= min {
            return None;
        }

        let range = (max - min) as f32;
        for v in &mut data {
            *v = (((*v - min) as f32 / range) * 255.0).round() as u8;
        }

        Some(CellPatch {
            width: w,
            height: h,
            data,
        })
    }

    fn mean_in(&self, r: Rect) -> Option<f32> {
        let x0 = r.x.round().max(0.0) as usize;
        let y0 = r.y.round().max(0.0) as usize;
        let x1 = (r.right().round() as usize).min(self.width);
        let y1 = (r.bottom().round() as usize).min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let mut sum = 0.0f64;
        for y in y0..y1 {
            for x in x0..x1 {
                sum += self.data[y * self.width + x] as f64;
            }
        }
        Some((sum / ((x1 - x0) * (y1 - y0)) as f64) as f32)
    }
}

/// Background-minus-segment contrast for each of the seven segments.
pub(crate) fn segment_contrasts(patch: &CellPatch, params: &DigitParams) -> [f32; SEGMENT_COUNT] {
    let (w, h) = (patch.width as f32, patch.height as f32);
    let mut out = [0.0f32; SEGMENT_COUNT];

    for (i, seg) in SEGMENT_RECTS.iter().enumerate() {
        let rect = seg.to_rect(w, h);
        let Some(seg_mean) = patch.mean_in(rect) else {
            continue;
        };

        // Flanking strips along the long axis, padded away from the
        // segment by a multiple of its thickness.
        let thickness = if seg.is_horizontal() { rect.height } else { rect.width };
        let offset = thickness * (1.0 + params.strip_pad_factor);
        let (a, b) = if seg.is_horizontal() {
            (
                Rect::new(rect.x, rect.y - offset, rect.width, rect.height),
                Rect::new(rect.x, rect.y + offset, rect.width, rect.height),
            )
        } else {
            (
                Rect::new(rect.x - offset, rect.y, rect.width, rect.height),
                Rect::new(rect.x + offset, rect.y, rect.width, rect.height),
            )
        };

        let strips: Vec<f32> = [a, b]
            .into_iter()
            .filter_map(|r| patch.mean_in(r))
            .collect();
        if strips.is_empty() {
            continue;
        }
        let background = strips.iter().sum::<f32>() / strips.len() as f32;
        out[i] = background - seg_mean;
    }

    out
}

/// Score every digit against the contrasts and apply the acceptance rules.
pub(crate) fn classify(contrasts: &[f32; SEGMENT_COUNT], params: &DigitParams) -> (Option<u8>, f32) {
    let capped: Vec<f32> = contrasts.iter().map(|&c| c.min(params.contrast_cap)).collect();

    let mut best_digit = 0u8;
    let mut best_score = f32::NEG_INFINITY;
    for d in 0..10u8 {
        let lit = &DIGIT_SEGMENTS[d as usize];
        let on: Vec<f32> = (0..SEGMENT_COUNT).filter(|&i| lit[i]).map(|i| capped[i]).collect();
        let off: Vec<f32> = (0..SEGMENT_COUNT).filter(|&i| !lit[i]).map(|i| capped[i]).collect();
        let on_mean = on.iter().sum::<f32>() / on.len() as f32;
        let off_mean = if off.is_empty() {
            0.0
        } else {
            off.iter().sum::<f32>() / off.len() as f32
        };
        let score = on_mean - off_mean;
        if score > best_score {
            best_score = score;
            best_digit = d;
        }
    }

    let lit = &DIGIT_SEGMENTS[best_digit as usize];
    let strong_on = (0..SEGMENT_COUNT)
        .filter(|&i| lit[i] && contrasts[i] >= params.strong_contrast)
        .count();
    let strong_off = (0..SEGMENT_COUNT)
        .filter(|&i| !lit[i] && contrasts[i] >= params.strong_contrast)
        .count();
    let off_max = (0..SEGMENT_COUNT)
        .filter(|&i| !lit[i])
        .map(|i| contrasts[i])
        .fold(0.0f32, f32::max);

    let accepted = (best_score >= params.accept_score && strong_on >= 1)
        || (strong_on == 1
            && strong_off == 0
            && best_score >= params.escape_score
            && off_max < params.off_veto_contrast);

    if !accepted {
        return (None, 0.0);
    }

    let confidence = if strong_on >= 2 {
        (best_score / params.confidence_scale).min(1.0)
    } else {
        params.weak_confidence
    };
    (Some(best_digit), confidence)
}

fn recognize_cell(
    gray: &GrayImageView<'_>,
    cell: &DigitCell,
    px_per_mm: f32,
    params: &DigitParams,
) -> DigitRecognition {
    let rect_px = cell.rect_mm.scaled(px_per_mm);
    let Some(patch) = CellPatch::extract(gray, rect_px) else {
        return DigitRecognition {
            cell_index: cell.cell_index,
            digit: None,
            confidence: 0.0,
        };
    };

    let contrasts = segment_contrasts(&patch, params);
    let (digit, confidence) = classify(&contrasts, params);
    DigitRecognition {
        cell_index: cell.cell_index,
        digit,
        confidence,
    }
}

/// Recognize all cells with the segment-contrast method, in cell order.
pub fn recognize_segments(
    gray: &GrayImageView<'_>,
    cells: &[DigitCell],
    px_per_mm: f32,
    params: &DigitParams,
) -> Vec<DigitRecognition> {
    cells
        .iter()
        .map(|cell| recognize_cell(gray, cell, px_per_mm, params))
        .collect()
}
