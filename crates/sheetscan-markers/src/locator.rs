//! Fiducial corner-marker location.
//!
//! Each page corner carries a nested-square fiducial: a black square with a
//! concentric white square holding a smaller black square. On the binarized
//! image that prints as an outer ink region enclosing a separate inner ink
//! region, both of which approximate to quadrilaterals.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use sheetscan_core::{
    approx_polygon, find_regions_in, perimeter, trace_boundary, BinaryImage, Region, RegionMap,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Candidate-acceptance thresholds for the nested-square test.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerLocatorParams {
    /// Corner zone side as a fraction of the shorter image edge.
    pub zone_frac: f32,
    /// Minimum inked area of the outer region, px.
    pub min_area_px: usize,
    /// Polygon-approximation tolerance as a fraction of the perimeter.
    pub approx_epsilon_frac: f32,
    pub parent_aspect: (f32, f32),
    pub child_aspect: (f32, f32),
    /// Child-to-parent bounding-area ratio window.
    pub child_area_ratio: (f32, f32),
}

impl Default for MarkerLocatorParams {
    fn default() -> Self {
        Self {
            zone_frac: 0.22,
            min_area_px: 80,
            approx_epsilon_frac: 0.05,
            parent_aspect: (0.75, 1.3),
            child_aspect: (0.7, 1.4),
            child_area_ratio: (0.1, 0.7),
        }
    }
}

/// The four page-facing marker corners, raw-image pixels.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SheetCorners {
    pub tl: Point2<f32>,
    pub tr: Point2<f32>,
    pub br: Point2<f32>,
    pub bl: Point2<f32>,
}

impl SheetCorners {
    pub fn as_array(&self) -> [Point2<f32>; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Zone {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Zone {
    /// Scan window `[x0, y0, x1, y1)` for this zone.
    fn window(self, width: usize, height: usize, side: usize) -> (usize, usize, usize, usize) {
        match self {
            Zone::TopLeft => (0, 0, side, side),
            Zone::TopRight => (width - side, 0, width, side),
            Zone::BottomRight => (width - side, height - side, width, height),
            Zone::BottomLeft => (0, height - side, side, height),
        }
    }

    /// Outer page-facing corner of a bounding box in this zone.
    ///
    /// Right and bottom edges use the exclusive pixel boundary so the corner
    /// lands on the printed square's true outline.
    fn facing_corner(self, r: &Region, map: &RegionMap) -> Point2<f32> {
        let (ox, oy) = (map.origin.0 as f32, map.origin.1 as f32);
        let left = ox + r.min_x as f32;
        let top = oy + r.min_y as f32;
        let right = ox + r.max_x as f32 + 1.0;
        let bottom = oy + r.max_y as f32 + 1.0;
        match self {
            Zone::TopLeft => Point2::new(left, top),
            Zone::TopRight => Point2::new(right, top),
            Zone::BottomRight => Point2::new(right, bottom),
            Zone::BottomLeft => Point2::new(left, bottom),
        }
    }
}

fn aspect_in(aspect: f32, window: (f32, f32)) -> bool {
    aspect >= window.0 && aspect <= window.1
}

/// 4-vertex polygonal approximation test.
fn is_quad(map: &RegionMap, region: &Region, epsilon_frac: f32) -> bool {
    let contour = trace_boundary(map, region);
    if contour.len() < 4 {
        return false;
    }
    let eps = epsilon_frac * perimeter(&contour);
    approx_polygon(&contour, eps).len() == 4
}

/// Find the strongest nested-square candidate in one zone.
fn best_candidate(map: &RegionMap, params: &MarkerLocatorParams) -> Option<Region> {
    let mut best: Option<Region> = None;

    for parent in &map.regions {
        if parent.area < params.min_area_px {
            continue;
        }
        if !aspect_in(parent.aspect(), params.parent_aspect) {
            continue;
        }
        if !is_quad(map, parent, params.approx_epsilon_frac) {
            continue;
        }

        let has_child = map.regions.iter().any(|child| {
            if child.label == parent.label || !parent.contains_bbox(child) {
                return false;
            }
            let ratio = child.bbox_area() as f32 / parent.bbox_area() as f32;
            ratio >= params.child_area_ratio.0
                && ratio <= params.child_area_ratio.1
                && aspect_in(child.aspect(), params.child_aspect)
                && is_quad(map, child, params.approx_epsilon_frac)
        });
        if !has_child {
            continue;
        }

        if best.map(|b| parent.area > b.area).unwrap_or(true) {
            best = Some(*parent);
        }
    }

    best
}

/// Largest region in the zone, the no-fiducial fallback.
fn largest_region(map: &RegionMap) -> Option<Region> {
    map.regions.iter().copied().max_by_key(|r| r.area)
}

/// Locate the four fiducial corners on a binarized image.
///
/// Returns `None` when some zone holds no ink at all, in which case the
/// pipeline continues without rectification.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(binary, params), fields(width = binary.width, height = binary.height))
)]
pub fn locate_markers(binary: &BinaryImage, params: &MarkerLocatorParams) -> Option<SheetCorners> {
    let side = ((binary.width.min(binary.height)) as f32 * params.zone_frac) as usize;
    if side == 0 {
        return None;
    }

    let zones = [
        Zone::TopLeft,
        Zone::TopRight,
        Zone::BottomRight,
        Zone::BottomLeft,
    ];
    let mut corners = [Point2::new(0.0f32, 0.0f32); 4];

    for (i, zone) in zones.into_iter().enumerate() {
        let (x0, y0, x1, y1) = zone.window(binary.width, binary.height, side);
        let map = find_regions_in(binary, x0, y0, x1, y1);

        let picked = match best_candidate(&map, params) {
            Some(r) => Some(r),
            None => {
                log::debug!("no nested-square fiducial in {:?} zone, trying largest region", zone);
                largest_region(&map)
            }
        };

        match picked {
            Some(r) => corners[i] = zone.facing_corner(&r, &map),
            None => {
                log::warn!("{:?} corner zone is empty, sheet bounds unavailable", zone);
                return None;
            }
        }
    }

    Some(SheetCorners {
        tl: corners[0],
        tr: corners[1],
        br: corners[2],
        bl: corners[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetscan_core::{adaptive_threshold_gaussian, GrayImage};
    use sheetscan_layout::{
        render_sheet, ExamTemplate, LayoutConstants, Question, QuestionKind, RenderOptions,
        SheetMarks,
    };

    fn rendered_binary() -> BinaryImage {
        let template = ExamTemplate {
            questions: vec![Question {
                number: 1,
                kind: QuestionKind::multiple_choice(),
            }],
            ..Default::default()
        };
        let img = render_sheet(
            &template,
            &LayoutConstants::default(),
            &SheetMarks::default(),
            &RenderOptions::default(),
        );
        adaptive_threshold_gaussian(&img.view(), 11, 2.0, true)
    }

    #[test]
    fn finds_all_four_fiducials_on_a_rendered_sheet() {
        let binary = rendered_binary();
        let corners =
            locate_markers(&binary, &MarkerLocatorParams::default()).expect("corners found");

        let close = |p: Point2<f32>, x: f32, y: f32| (p.x - x).abs() < 3.0 && (p.y - y).abs() < 3.0;
        assert!(close(corners.tl, 50.0, 50.0), "tl = {:?}", corners.tl);
        assert!(close(corners.tr, 2050.0, 50.0), "tr = {:?}", corners.tr);
        assert!(close(corners.br, 2050.0, 2920.0), "br = {:?}", corners.br);
        assert!(close(corners.bl, 50.0, 2920.0), "bl = {:?}", corners.bl);
    }

    #[test]
    fn falls_back_to_largest_region_without_nesting() {
        // Plain filled squares: no white/black nesting, so the quad-child
        // test fails and the largest-region fallback must kick in.
        let mut img = GrayImage::new(600, 800, 255);
        for (cx, cy) in [(80usize, 80usize), (520, 80), (520, 720), (80, 720)] {
            for y in cy - 40..cy + 40 {
                for x in cx - 40..cx + 40 {
                    img.set(x, y, 0);
                }
            }
        }
        let binary = adaptive_threshold_gaussian(&img.view(), 11, 2.0, true);
        let corners =
            locate_markers(&binary, &MarkerLocatorParams::default()).expect("fallback corners");
        assert!((corners.tl.x - 40.0).abs() < 3.0);
        assert!((corners.tl.y - 40.0).abs() < 3.0);
        assert!((corners.br.x - 560.0).abs() < 3.0);
    }

    #[test]
    fn empty_zone_reports_no_bounds() {
        let mut img = GrayImage::new(600, 800, 255);
        // Only three corners carry ink.
        for (cx, cy) in [(80usize, 80usize), (520, 80), (520, 720)] {
            for y in cy - 40..cy + 40 {
                for x in cx - 40..cx + 40 {
                    img.set(x, y, 0);
                }
            }
        }
        let binary = adaptive_threshold_gaussian(&img.view(), 11, 2.0, true);
        assert!(locate_markers(&binary, &MarkerLocatorParams::default()).is_none());
    }
}
