//! Synthetic sheet renderer: the print side of the layout contract.
//!
//! Draws fiducial markers, bubble outlines, marked bubbles, student-ID
//! cells and seven-segment glyphs on a blank page, all from the same
//! `LayoutConstants` and grid geometry the detectors consume. Round-trip
//! tests grade these pages.

use sheetscan_core::{GrayImage, Rect};

use crate::constants::LayoutConstants;
use crate::grid::{build_grid, SheetGrid};
use crate::segments::{segments_for, SEGMENT_RECTS};
use crate::template::ExamTemplate;

/// Ink to apply to a rendered sheet.
#[derive(Clone, Debug, Default)]
pub struct SheetMarks {
    /// `(question index, option index, fill fraction in 0..=1)`.
    pub bubbles: Vec<(usize, usize, f32)>,
    /// `(cell index, digit)` for darkened student-ID cells.
    pub digits: Vec<(usize, u8)>,
}

impl SheetMarks {
    /// Fully darken one option per question.
    pub fn from_answer_key(key: &[usize]) -> Self {
        Self {
            bubbles: key
                .iter()
                .enumerate()
                .map(|(q, &opt)| (q, opt, 1.0))
                .collect(),
            digits: Vec::new(),
        }
    }

    pub fn with_digits(mut self, digits: &[u8]) -> Self {
        self.digits = digits.iter().enumerate().map(|(i, &d)| (i, d)).collect();
        self
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub px_per_mm: f32,
    pub ink: u8,
    pub paper: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            px_per_mm: 10.0,
            ink: 0,
            paper: 255,
        }
    }
}

fn fill_rect(img: &mut GrayImage, r: Rect, value: u8) {
    let x0 = r.x.floor().max(0.0) as usize;
    let y0 = r.y.floor().max(0.0) as usize;
    let x1 = (r.right().ceil() as usize).min(img.width);
    let y1 = (r.bottom().ceil() as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            if r.contains(px, py) {
                img.set(x, y, value);
            }
        }
    }
}

fn stroke_rect(img: &mut GrayImage, r: Rect, thickness: f32, value: u8) {
    fill_rect(img, Rect::new(r.x, r.y, r.width, thickness), value);
    fill_rect(
        img,
        Rect::new(r.x, r.bottom() - thickness, r.width, thickness),
        value,
    );
    fill_rect(img, Rect::new(r.x, r.y, thickness, r.height), value);
    fill_rect(
        img,
        Rect::new(r.right() - thickness, r.y, thickness, r.height),
        value,
    );
}

fn fill_disk(img: &mut GrayImage, cx: f32, cy: f32, radius: f32, value: u8) {
    let x0 = (cx - radius).floor().max(0.0) as usize;
    let y0 = (cy - radius).floor().max(0.0) as usize;
    let x1 = ((cx + radius).ceil() as usize + 1).min(img.width);
    let y1 = ((cy + radius).ceil() as usize + 1).min(img.height);
    let r_sq = radius * radius;
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r_sq {
                img.set(x, y, value);
            }
        }
    }
}

fn stroke_circle(img: &mut GrayImage, cx: f32, cy: f32, radius: f32, thickness: f32, value: u8) {
    let outer = radius + 0.5 * thickness;
    let inner = radius - 0.5 * thickness;
    let x0 = (cx - outer).floor().max(0.0) as usize;
    let y0 = (cy - outer).floor().max(0.0) as usize;
    let x1 = ((cx + outer).ceil() as usize + 1).min(img.width);
    let y1 = ((cy + outer).ceil() as usize + 1).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d >= inner && d <= outer {
                img.set(x, y, value);
            }
        }
    }
}

fn draw_fiducial(img: &mut GrayImage, layout: &LayoutConstants, x_mm: f32, y_mm: f32, opts: &RenderOptions) {
    let ppm = opts.px_per_mm;
    let size = layout.marker_size_mm;
    let white = layout.marker_inner_white_mm;
    let black = layout.marker_inner_black_mm;

    let center = (x_mm + 0.5 * size, y_mm + 0.5 * size);
    let square = |side: f32| {
        Rect::new(
            (center.0 - 0.5 * side) * ppm,
            (center.1 - 0.5 * side) * ppm,
            side * ppm,
            side * ppm,
        )
    };

    fill_rect(img, square(size), opts.ink);
    fill_rect(img, square(white), opts.paper);
    fill_rect(img, square(black), opts.ink);
}

/// Darken a bubble to the given fill fraction.
///
/// A full mark covers the whole bubble. Partial marks shrink the inked disk
/// so that the measured inked ratio inside the 0.85-radius sampling disk
/// lands on the requested fraction.
fn mark_bubble(img: &mut GrayImage, cx: f32, cy: f32, radius_px: f32, fraction: f32, ink: u8) {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction <= 0.0 {
        return;
    }
    let r = if fraction >= 0.999 {
        radius_px
    } else {
        0.85 * radius_px * fraction.sqrt()
    };
    fill_disk(img, cx, cy, r, ink);
}

/// Render a sheet for `template` with the given marks.
pub fn render_sheet(
    template: &ExamTemplate,
    layout: &LayoutConstants,
    marks: &SheetMarks,
    opts: &RenderOptions,
) -> GrayImage {
    let grid = build_grid(template, layout);
    render_sheet_with_grid(&grid, layout, marks, opts)
}

/// Render from a pre-built grid (lets callers reuse the geometry).
pub fn render_sheet_with_grid(
    grid: &SheetGrid,
    layout: &LayoutConstants,
    marks: &SheetMarks,
    opts: &RenderOptions,
) -> GrayImage {
    let ppm = opts.px_per_mm;
    let width = (layout.page_width_mm * ppm).round() as usize;
    let height = (layout.page_height_mm * ppm).round() as usize;
    let mut img = GrayImage::new(width, height, opts.paper);

    // Fiducials: outer edge sits marker_margin from each page edge.
    let m = layout.marker_margin_mm;
    let s = layout.marker_size_mm;
    let right = layout.page_width_mm - m - s;
    let bottom = layout.page_height_mm - m - s;
    draw_fiducial(&mut img, layout, m, m, opts);
    draw_fiducial(&mut img, layout, right, m, opts);
    draw_fiducial(&mut img, layout, right, bottom, opts);
    draw_fiducial(&mut img, layout, m, bottom, opts);

    // Bubble outlines.
    let radius_px = layout.bubble_radius_mm * ppm;
    for b in &grid.bubbles {
        for c in &b.centers_mm {
            stroke_circle(
                &mut img,
                c.x * ppm,
                c.y * ppm,
                radius_px,
                0.2 * ppm,
                opts.ink,
            );
        }
    }

    // Marks.
    for &(q, opt, fraction) in &marks.bubbles {
        let Some(b) = grid.bubbles.get(q) else {
            continue;
        };
        let Some(c) = b.centers_mm.get(opt) else {
            continue;
        };
        mark_bubble(&mut img, c.x * ppm, c.y * ppm, radius_px, fraction, opts.ink);
    }

    // Student-ID cells.
    for cell in &grid.digit_cells {
        stroke_rect(&mut img, cell.rect_mm.scaled(ppm), 0.2 * ppm, opts.ink);
    }
    for &(idx, digit) in &marks.digits {
        let Some(cell) = grid.digit_cells.get(idx) else {
            continue;
        };
        if digit > 9 {
            continue;
        }
        let r = cell.rect_mm.scaled(ppm);
        let lit = segments_for(digit);
        for (seg, &on) in SEGMENT_RECTS.iter().zip(lit.iter()) {
            if !on {
                continue;
            }
            let mut seg_rect = seg.to_rect(r.width, r.height);
            seg_rect.x += r.x;
            seg_rect.y += r.y;
            fill_rect(&mut img, seg_rect, opts.ink);
        }
    }

    img
}
