//! Template-match digit recognition, the secondary method.
//!
//! Ten synthetic seven-segment glyphs are rendered from the shared segment
//! table; each normalized cell is resampled to the glyph size and matched
//! by normalized cross-correlation.

use sheetscan_core::{GrayImageView, Rect};
use sheetscan_layout::segments::{segments_for, SEGMENT_RECTS};
use sheetscan_layout::DigitCell;

use crate::params::{DigitParams, DigitRecognition};
use crate::recognizer::CellPatch;

/// Render one digit glyph, black on white, `size` x `size`.
pub fn glyph(digit: u8, size: usize) -> Vec<u8> {
    let mut out = vec![255u8; size * size];
    let lit = segments_for(digit);
    for (seg, &on) in SEGMENT_RECTS.iter().zip(lit.iter()) {
        if !on {
            continue;
        }
        let r = seg.to_rect(size as f32, size as f32);
        let x0 = r.x.floor().max(0.0) as usize;
        let y0 = r.y.floor().max(0.0) as usize;
        let x1 = (r.right().ceil() as usize).min(size);
        let y1 = (r.bottom().ceil() as usize).min(size);
        for y in y0..y1 {
            for x in x0..x1 {
                out[y * size + x] = 0;
            }
        }
    }
    out
}

/// Area-ignorant bilinear resample of the patch onto `size` x `size`.
fn resample(patch: &CellPatch, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size * size];
    for y in 0..size {
        for x in 0..size {
            let sx = (x as f32 + 0.5) / size as f32 * patch.width as f32 - 0.5;
            let sy = (y as f32 + 0.5) / size as f32 * patch.height as f32 - 0.5;
            let x0 = (sx.floor().max(0.0) as usize).min(patch.width - 1);
            let y0 = (sy.floor().max(0.0) as usize).min(patch.height - 1);
            let x1 = (x0 + 1).min(patch.width - 1);
            let y1 = (y0 + 1).min(patch.height - 1);
            let fx = (sx - x0 as f32).clamp(0.0, 1.0);
            let fy = (sy - y0 as f32).clamp(0.0, 1.0);

            let p00 = patch.data[y0 * patch.width + x0] as f32;
            let p10 = patch.data[y0 * patch.width + x1] as f32;
            let p01 = patch.data[y1 * patch.width + x0] as f32;
            let p11 = patch.data[y1 * patch.width + x1] as f32;
            let a = p00 + fx * (p10 - p00);
            let b = p01 + fx * (p11 - p01);
            out[y * size + x] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Pearson correlation of two equal-length images, in -1..=1.
fn normalized_cross_correlation(a: &[u8], b: &[u8]) -> f32 {
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&va, &vb) in a.iter().zip(b) {
        let da = va as f64 - mean_a;
        let db = vb as f64 - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 1e-9 || var_b <= 1e-9 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())) as f32
}

fn recognize_cell(
    gray: &GrayImageView<'_>,
    cell: &DigitCell,
    px_per_mm: f32,
    glyphs: &[Vec<u8>; 10],
    size: usize,
) -> DigitRecognition {
    let rect_px = cell.rect_mm.scaled(px_per_mm);
    let Some(patch) = CellPatch::extract(gray, rect_px) else {
        return DigitRecognition {
            cell_index: cell.cell_index,
            digit: None,
            confidence: 0.0,
        };
    };
    let resampled = resample(&patch, size);

    let mut best_digit = 0u8;
    let mut best_corr = f32::NEG_INFINITY;
    for (d, g) in glyphs.iter().enumerate() {
        let corr = normalized_cross_correlation(&resampled, g);
        if corr > best_corr {
            best_corr = corr;
            best_digit = d as u8;
        }
    }

    DigitRecognition {
        cell_index: cell.cell_index,
        digit: Some(best_digit),
        confidence: (best_corr + 1.0) * 0.5,
    }
}

/// Recognize all cells by glyph correlation, in cell order.
pub fn recognize_template(
    gray: &GrayImageView<'_>,
    cells: &[DigitCell],
    px_per_mm: f32,
    params: &DigitParams,
) -> Vec<DigitRecognition> {
    let size = params.glyph_size.max(7);
    let glyphs: [Vec<u8>; 10] = std::array::from_fn(|d| glyph(d as u8, size));

    cells
        .iter()
        .map(|cell| recognize_cell(gray, cell, px_per_mm, &glyphs, size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetscan_core::GrayImage;

    fn cell_image(digit: u8) -> GrayImage {
        let mut img = GrayImage::new(70, 100, 240);
        let lit = segments_for(digit);
        for (seg, &on) in SEGMENT_RECTS.iter().zip(lit.iter()) {
            if !on {
                continue;
            }
            let r = seg.to_rect(70.0, 100.0);
            for y in r.y as usize..r.bottom() as usize {
                for x in r.x as usize..r.right() as usize {
                    img.set(x, y, 15);
                }
            }
        }
        img
    }

    fn cell() -> DigitCell {
        DigitCell {
            cell_index: 0,
            rect_mm: Rect::new(0.0, 0.0, 7.0, 10.0),
        }
    }

    #[test]
    fn glyphs_differ_per_digit() {
        let g1 = glyph(1, 21);
        let g8 = glyph(8, 21);
        assert_ne!(g1, g8);
        assert!(g8.iter().filter(|&&v| v == 0).count() > g1.iter().filter(|&&v| v == 0).count());
    }

    #[test]
    fn matches_every_rendered_digit() {
        let params = DigitParams::default();
        for digit in 0..10u8 {
            let img = cell_image(digit);
            let out = recognize_template(&img.view(), &[cell()], 10.0, &params);
            assert_eq!(out[0].digit, Some(digit), "digit {digit}");
            assert!(out[0].confidence > 0.5, "digit {digit}: {}", out[0].confidence);
        }
    }

    #[test]
    fn correlation_is_symmetric_bounded() {
        let a = glyph(3, 21);
        let b = glyph(3, 21);
        let c = normalized_cross_correlation(&a, &b);
        assert!((c - 1.0).abs() < 1e-5);
    }
}
