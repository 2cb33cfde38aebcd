//! Detector B: circle-based bubble sampling.
//!
//! One Hough pass over the whole rectified page produces anonymous
//! circles; rows and questions are re-anchored by circle proximity, and
//! each question claims its circles exclusively before fill sampling.

use nalgebra::Point2;
use sheetscan_core::Rect;
use sheetscan_layout::{BubbleExpectation, SheetGrid};

use crate::arbiter::result_from_fills;
use crate::assign::assign_circles;
use crate::hough::{hough_circles, HoughParams};
use crate::result::{DetectedCircle, DetectorKind, DetectorOutput};
use crate::sample::{fill_single, PageView};
use crate::shift::{best_shift, sweep_steps};
use crate::template_detector::rows_of;
use crate::thresholds::DetectorThresholds;

#[cfg(feature = "tracing")]
use tracing::instrument;

fn centers_px(exp: &BubbleExpectation, ppm: f32) -> Vec<Point2<f32>> {
    exp.centers_mm
        .iter()
        .map(|c| Point2::new(c.x * ppm, c.y * ppm))
        .collect()
}

/// Proximity evidence for one shifted center: 1 at a circle, fading to 0
/// at the threshold distance.
fn proximity(circles: &[DetectedCircle], p: Point2<f32>, threshold_px: f32) -> f32 {
    let mut nearest = f32::INFINITY;
    for c in circles {
        let d = ((c.center.x - p.x).powi(2) + (c.center.y - p.y).powi(2)).sqrt();
        nearest = nearest.min(d);
    }
    if nearest.is_finite() {
        (1.0 - nearest / threshold_px).max(0.0)
    } else {
        0.0
    }
}

fn proximity_of(
    circles: &[DetectedCircle],
    centers: &[Point2<f32>],
    dx: f32,
    dy: f32,
    threshold_px: f32,
) -> f32 {
    centers
        .iter()
        .map(|c| proximity(circles, Point2::new(c.x + dx, c.y + dy), threshold_px))
        .sum()
}

/// Run detector B with circles from the shared Hough pass.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(page, grid, th), fields(questions = grid.bubbles.len()))
)]
pub fn detect_circle(page: &PageView<'_>, grid: &SheetGrid, th: &DetectorThresholds) -> DetectorOutput {
    let radius_px = grid.bubble_radius_mm * page.px_per_mm;
    let circles = hough_circles(
        &page.blurred,
        None,
        &HoughParams::for_bubble_radius(radius_px),
    );
    log::debug!("page-wide hough found {} circles", circles.len());
    detect_with_circles(page, grid, th, &circles, DetectorKind::Circle)
}

/// The circle-proximity detector body, shared with the contour fallback
/// (which feeds region-derived circles instead of Hough output).
pub fn detect_with_circles(
    page: &PageView<'_>,
    grid: &SheetGrid,
    th: &DetectorThresholds,
    circles: &[DetectedCircle],
    kind: DetectorKind,
) -> DetectorOutput {
    let ppm = page.px_per_mm;
    let radius_px = grid.bubble_radius_mm * ppm;
    let threshold_px = page.px(th.proximity_threshold_mm);
    let cap_px = page.px(th.assign_cap_mm);

    let mut claimed = vec![false; circles.len()];
    let mut results = Vec::with_capacity(grid.bubbles.len());
    let mut fills = Vec::with_capacity(grid.bubbles.len());
    let mut assignments = Vec::with_capacity(grid.bubbles.len());

    for row in rows_of(grid) {
        // Row anchor by circle proximity.
        let xs = sweep_steps(page.px(th.row_shift_x_mm), page.px(th.shift_step_mm));
        let ys = sweep_steps(page.px(th.row_shift_y_mm), page.px(th.shift_step_mm));
        let (rdx, rdy, _) = best_shift(&xs, &ys, |dx, dy| {
            row.iter()
                .map(|&qi| {
                    proximity_of(circles, &centers_px(&grid.bubbles[qi], ppm), dx, dy, threshold_px)
                })
                .sum()
        });

        for qi in row {
            let exp = &grid.bubbles[qi];
            let centers = centers_px(exp, ppm);

            // Local anchor.
            let lxs = sweep_steps(page.px(th.local_shift_x_mm), page.px(th.shift_step_mm));
            let lys = sweep_steps(page.px(th.local_shift_y_mm), page.px(th.shift_step_mm));
            let (ldx, ldy, _) = best_shift(&lxs, &lys, |dx, dy| {
                proximity_of(circles, &centers, rdx + dx, rdy + dy, threshold_px)
            });
            let (dx, dy) = (rdx + ldx, rdy + ldy);

            let expected: Vec<Point2<f32>> = centers
                .iter()
                .map(|c| Point2::new(c.x + dx, c.y + dy))
                .collect();

            let mut box_px = exp.box_mm.scaled(ppm);
            box_px.x += dx;
            box_px.y += dy;

            // Tight search band around the bubble row.
            let x_lo = expected.iter().map(|c| c.x).fold(f32::INFINITY, f32::min)
                - page.px(th.search_margin_x_mm);
            let x_hi = expected.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max)
                + page.px(th.search_margin_x_mm);
            let y_margin = page.px(th.search_margin_y_mm);
            let band = Rect::new(
                x_lo,
                expected[0].y - y_margin,
                x_hi - x_lo,
                2.0 * y_margin,
            );
            let search = band.intersect(&box_px);

            let mut candidates: Vec<usize> = (0..circles.len())
                .filter(|&i| {
                    !claimed[i] && search.contains(circles[i].center.x, circles[i].center.y)
                })
                .collect();
            candidates.sort_by(|&a, &b| circles[a].center.x.total_cmp(&circles[b].center.x));

            let assignment = assign_circles(&expected, circles, &candidates, cap_px);
            for idx in assignment.iter().flatten() {
                claimed[*idx] = true;
            }

            let q_fills: Vec<f32> = assignment
                .iter()
                .zip(&expected)
                .map(|(slot, fallback)| match slot {
                    Some(i) => fill_single(page, circles[*i].center, circles[*i].radius, th),
                    None => fill_single(page, *fallback, radius_px, th),
                })
                .collect();

            results.push(result_from_fills(exp, box_px, &q_fills, th));
            fills.push(q_fills);
            assignments.push(assignment);
        }
    }

    DetectorOutput {
        kind,
        results,
        fills,
        circles: circles.to_vec(),
        assignments,
    }
}
