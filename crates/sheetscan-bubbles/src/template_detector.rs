//! Detector A: template-locked bubble sampling.
//!
//! Rows are re-anchored with a coarse shift sweep scored by ring darkness,
//! each question gets a local correction, centers are refined from Hough
//! circles or scanline fill peaks when those agree with the template, and
//! the final fill is the jitter-grid maximum.

use nalgebra::Point2;
use sheetscan_core::Rect;
use sheetscan_layout::{BubbleExpectation, SheetGrid};

use crate::arbiter::result_from_fills;
use crate::hough::{hough_circles, HoughParams};
use crate::result::{DetectorKind, DetectorOutput};
use crate::sample::{disk_ink_ratio, jittered_fill, ring_darkness, PageView};
use crate::shift::{best_shift, sweep_steps};
use crate::thresholds::DetectorThresholds;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Minimum scanline fill ratio for a peak to count.
const MIN_PEAK_SCORE: f32 = 0.05;

fn centers_px(exp: &BubbleExpectation, ppm: f32) -> Vec<Point2<f32>> {
    exp.centers_mm
        .iter()
        .map(|c| Point2::new(c.x * ppm, c.y * ppm))
        .collect()
}

fn shifted(points: &[Point2<f32>], dx: f32, dy: f32) -> Vec<Point2<f32>> {
    points.iter().map(|p| Point2::new(p.x + dx, p.y + dy)).collect()
}

/// Indices of `grid.bubbles` grouped by global row, in row order.
pub(crate) fn rows_of(grid: &SheetGrid) -> Vec<Vec<usize>> {
    let max_row = grid.bubbles.iter().map(|b| b.row_index).max().unwrap_or(0);
    let mut rows = vec![Vec::new(); max_row + 1];
    for (i, b) in grid.bubbles.iter().enumerate() {
        rows[b.row_index].push(i);
    }
    rows.retain(|r| !r.is_empty());
    rows
}

/// Row-level shift, clamped to the acceptance window.
fn row_shift(
    page: &PageView<'_>,
    grid: &SheetGrid,
    row: &[usize],
    radius_px: f32,
    th: &DetectorThresholds,
) -> (f32, f32) {
    let xs = sweep_steps(page.px(th.row_shift_x_mm), page.px(th.shift_step_mm));
    let ys = sweep_steps(page.px(th.row_shift_y_mm), page.px(th.shift_step_mm));

    let (dx, dy, _) = best_shift(&xs, &ys, |dx, dy| {
        let mut score = 0.0f32;
        for &qi in row {
            for c in centers_px(&grid.bubbles[qi], page.px_per_mm) {
                score += ring_darkness(
                    &page.gray,
                    Point2::new(c.x + dx, c.y + dy),
                    radius_px,
                    th,
                );
            }
        }
        score
    });

    if dx.abs() <= page.px(th.max_row_shift_x_mm) && dy.abs() <= page.px(th.max_row_shift_y_mm) {
        (dx, dy)
    } else {
        (0.0, 0.0)
    }
}

/// Per-question correction on top of the row shift.
fn question_shift(
    page: &PageView<'_>,
    exp: &BubbleExpectation,
    row_shift: (f32, f32),
    radius_px: f32,
    th: &DetectorThresholds,
) -> (f32, f32) {
    let xs = sweep_steps(page.px(th.local_shift_x_mm), page.px(th.shift_step_mm));
    let ys = sweep_steps(page.px(th.local_shift_y_mm), page.px(th.shift_step_mm));
    let centers = centers_px(exp, page.px_per_mm);

    let (dx, dy, _) = best_shift(&xs, &ys, |dx, dy| {
        centers
            .iter()
            .map(|c| {
                ring_darkness(
                    &page.gray,
                    Point2::new(c.x + row_shift.0 + dx, c.y + row_shift.1 + dy),
                    radius_px,
                    th,
                )
            })
            .sum()
    });

    (row_shift.0 + dx, row_shift.1 + dy)
}

/// Hough refinement: the best window of x-sorted circles, accepted when its
/// mean distance to the expected centers is small enough.
fn refine_with_hough(
    page: &PageView<'_>,
    expected: &[Point2<f32>],
    box_px: Rect,
    radius_px: f32,
    th: &DetectorThresholds,
) -> Option<Vec<Point2<f32>>> {
    let mut circles = hough_circles(
        &page.blurred,
        Some(box_px),
        &HoughParams::for_bubble_radius(radius_px),
    );
    let n = expected.len();
    if circles.len() < n {
        return None;
    }
    circles.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));

    let mut best: Option<(f32, usize)> = None;
    for start in 0..=(circles.len() - n) {
        let mean: f32 = (0..n)
            .map(|i| {
                let c = circles[start + i].center;
                ((c.x - expected[i].x).powi(2) + (c.y - expected[i].y).powi(2)).sqrt()
            })
            .sum::<f32>()
            / n as f32;
        if best.map(|(m, _)| mean < m).unwrap_or(true) {
            best = Some((mean, start));
        }
    }

    let (mean, start) = best?;
    if mean > th.hough_match_radii * radius_px {
        return None;
    }
    Some((0..n).map(|i| circles[start + i].center).collect())
}

/// Scanline refinement: fill peaks along the bubble row, matched to the
/// nearest unused expected center.
fn refine_with_scanline(
    page: &PageView<'_>,
    expected: &[Point2<f32>],
    radius_px: f32,
    th: &DetectorThresholds,
) -> Vec<Point2<f32>> {
    let y = expected[0].y;
    let margin = page.px(th.scanline_margin_mm);
    let step = page.px(th.scanline_step_mm);
    let x_lo = expected.iter().map(|c| c.x).fold(f32::INFINITY, f32::min) - margin;
    let x_hi = expected.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max) + margin;
    let disk = th.disk_factor * radius_px;

    let mut scores = Vec::new();
    let mut x = x_lo;
    while x <= x_hi {
        scores.push((x, disk_ink_ratio(page.binary, Point2::new(x, y), disk)));
        x += step;
    }

    // Interior local maxima above the floor, strongest first.
    let mut peaks: Vec<(f32, f32)> = Vec::new();
    for i in 1..scores.len().saturating_sub(1) {
        let (xp, s) = scores[i];
        if s >= MIN_PEAK_SCORE && s > scores[i - 1].1 && s >= scores[i + 1].1 {
            peaks.push((xp, s));
        }
    }
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.total_cmp(&b.0)));
    peaks.truncate(expected.len());

    let match_radius = th.peak_match_radii * radius_px;
    let mut used = vec![false; peaks.len()];
    expected
        .iter()
        .map(|c| {
            let mut pick: Option<(usize, f32)> = None;
            for (i, &(px, _)) in peaks.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let d = (px - c.x).abs();
                if d <= match_radius && pick.map(|(_, pd)| d < pd).unwrap_or(true) {
                    pick = Some((i, d));
                }
            }
            match pick {
                Some((i, _)) => {
                    used[i] = true;
                    Point2::new(peaks[i].0, y)
                }
                None => *c,
            }
        })
        .collect()
}

/// Run detector A over the whole grid.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(page, grid, th), fields(questions = grid.bubbles.len()))
)]
pub fn detect_template(
    page: &PageView<'_>,
    grid: &SheetGrid,
    th: &DetectorThresholds,
) -> DetectorOutput {
    let ppm = page.px_per_mm;
    let radius_px = grid.bubble_radius_mm * ppm;

    let mut results = Vec::with_capacity(grid.bubbles.len());
    let mut fills = Vec::with_capacity(grid.bubbles.len());

    for row in rows_of(grid) {
        let rshift = row_shift(page, grid, &row, radius_px, th);

        for qi in row {
            let exp = &grid.bubbles[qi];
            let (dx, dy) = question_shift(page, exp, rshift, radius_px, th);
            let expected = shifted(&centers_px(exp, ppm), dx, dy);

            let mut box_px = exp.box_mm.scaled(ppm);
            box_px.x += dx;
            box_px.y += dy;

            let centers = match refine_with_hough(page, &expected, box_px, radius_px, th) {
                Some(c) => c,
                None => refine_with_scanline(page, &expected, radius_px, th),
            };

            let q_fills: Vec<f32> = centers
                .iter()
                .map(|c| jittered_fill(page, *c, radius_px, th))
                .collect();

            results.push(result_from_fills(exp, box_px, &q_fills, th));
            fills.push(q_fills);
        }
    }

    DetectorOutput {
        kind: DetectorKind::Template,
        results,
        fills,
        circles: Vec::new(),
        assignments: Vec::new(),
    }
}
