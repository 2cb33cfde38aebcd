//! Gradient Hough circle transform.
//!
//! Classic two-stage HOUGH_GRADIENT: edge pixels vote along their gradient
//! line into a 2-D center accumulator, surviving peaks get a radius from
//! the mode of their edge-distance histogram.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use sheetscan_core::{sobel_gradients, GrayImageView, Rect};

use crate::result::DetectedCircle;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HoughParams {
    pub min_radius: f32,
    pub max_radius: f32,
    /// Minimum center separation.
    pub min_dist: f32,
    /// Gradient magnitude floor for a pixel to count as an edge.
    pub mag_threshold: f32,
    /// Accumulator floor for a center candidate.
    pub min_votes: u32,
}

impl HoughParams {
    /// Radii and spacing scaled from the expected bubble radius.
    pub fn for_bubble_radius(radius_px: f32) -> Self {
        Self {
            min_radius: 0.5 * radius_px,
            max_radius: 1.8 * radius_px,
            min_dist: 1.5 * radius_px,
            mag_threshold: 40.0,
            min_votes: 40,
        }
    }
}

/// Detect circles in `roi` (whole image when `None`).
///
/// `blurred` should already be smoothed; the detectors pass the shared 5x5
/// Gaussian blur of the rectified page. Centers are returned in full-image
/// pixels, strongest vote first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(blurred, roi, params), fields(width = blurred.width, height = blurred.height))
)]
pub fn hough_circles(
    blurred: &GrayImageView<'_>,
    roi: Option<Rect>,
    params: &HoughParams,
) -> Vec<DetectedCircle> {
    let full = Rect::new(0.0, 0.0, blurred.width as f32, blurred.height as f32);
    let roi = roi.map(|r| r.intersect(&full)).unwrap_or(full);
    let x0 = roi.x.floor().max(0.0) as usize;
    let y0 = roi.y.floor().max(0.0) as usize;
    let x1 = (roi.right().ceil() as usize).min(blurred.width);
    let y1 = (roi.bottom().ceil() as usize).min(blurred.height);
    if x1 <= x0 + 2 || y1 <= y0 + 2 {
        return Vec::new();
    }

    let (w, h) = (x1 - x0, y1 - y0);
    let grads = sobel_gradients(blurred);

    // Edge pixels, window coordinates.
    let mut edges: Vec<(u32, u32)> = Vec::new();
    for y in y0..y1 {
        for x in x0..x1 {
            if grads.magnitude(x, y) >= params.mag_threshold {
                edges.push(((x - x0) as u32, (y - y0) as u32));
            }
        }
    }
    if edges.is_empty() {
        return Vec::new();
    }

    // Vote along the gradient in both directions.
    let mut acc = vec![0u32; w * h];
    let r_lo = params.min_radius.max(1.0);
    let r_hi = params.max_radius.max(r_lo);
    for &(ex, ey) in &edges {
        let gi = (ey as usize + y0) * grads.width + (ex as usize + x0);
        let (gx, gy) = (grads.gx[gi], grads.gy[gi]);
        let mag = (gx * gx + gy * gy).sqrt();
        if mag < 1e-6 {
            continue;
        }
        let (ux, uy) = (gx / mag, gy / mag);

        for sign in [-1.0f32, 1.0] {
            let mut r = r_lo;
            while r <= r_hi {
                let cx = ex as f32 + sign * ux * r;
                let cy = ey as f32 + sign * uy * r;
                if cx >= 0.0 && cy >= 0.0 && (cx as usize) < w && (cy as usize) < h {
                    acc[cy as usize * w + cx as usize] += 1;
                }
                r += 1.0;
            }
        }
    }

    // Local maxima over the accumulator, strongest first, then greedy
    // min-dist suppression.
    let mut peaks: Vec<(u32, usize, usize)> = Vec::new();
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let v = acc[y * w + x];
            if v < params.min_votes {
                continue;
            }
            let mut is_max = true;
            'scan: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = acc[(y as i32 + dy) as usize * w + (x as i32 + dx) as usize];
                    // Strict comparison against later scan positions keeps
                    // plateau handling deterministic.
                    let later = dy > 0 || (dy == 0 && dx > 0);
                    if n > v || (!later && n == v) {
                        is_max = false;
                        break 'scan;
                    }
                }
            }
            if is_max {
                peaks.push((v, y, x));
            }
        }
    }
    peaks.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let min_dist_sq = params.min_dist * params.min_dist;
    let mut centers: Vec<(f32, f32)> = Vec::new();
    for &(_, py, px) in &peaks {
        let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
        let clear = centers
            .iter()
            .all(|&(ox, oy)| (cx - ox).powi(2) + (cy - oy).powi(2) >= min_dist_sq);
        if clear {
            centers.push((cx, cy));
        }
    }

    // Radius from the mode of edge distances.
    let bins = (r_hi - r_lo).ceil() as usize + 1;
    let mut out = Vec::with_capacity(centers.len());
    for &(cx, cy) in &centers {
        let mut hist = vec![0u32; bins];
        for &(ex, ey) in &edges {
            let d = ((ex as f32 - cx).powi(2) + (ey as f32 - cy).powi(2)).sqrt();
            if d >= r_lo && d <= r_hi {
                hist[(d - r_lo) as usize] += 1;
            }
        }
        let best_bin = hist
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let radius = r_lo + best_bin as f32 + 0.5;
        out.push(DetectedCircle {
            center: Point2::new(cx + x0 as f32, cy + y0 as f32),
            radius,
        });
    }

    out
}
