//! Fallback detector: bubble-shaped ink regions instead of Hough circles.
//!
//! Used when neither primary detector clears the confidence floor. Regions
//! on the adaptive binary that look bubble-sized become anonymous circles
//! and run through the same row-anchoring and exclusive assignment as the
//! circle detector.

use nalgebra::Point2;
use sheetscan_core::find_regions;
use sheetscan_layout::SheetGrid;

use crate::circle_detector::detect_with_circles;
use crate::result::{DetectedCircle, DetectorKind, DetectorOutput};
use crate::sample::PageView;
use crate::thresholds::DetectorThresholds;

/// Region-size windows relative to the bubble radius.
const MIN_HALF_EXTENT: f32 = 0.5;
const MAX_HALF_EXTENT: f32 = 1.8;
const ASPECT_WINDOW: (f32, f32) = (0.6, 1.6);
const MIN_REGION_AREA: usize = 15;

/// Bubble-shaped connected regions as anonymous circles.
pub fn bubble_regions_as_circles(page: &PageView<'_>, radius_px: f32) -> Vec<DetectedCircle> {
    let map = find_regions(page.binary);
    let mut out = Vec::new();

    for r in &map.regions {
        if r.area < MIN_REGION_AREA {
            continue;
        }
        let half_w = r.width() as f32 * 0.5;
        let half_h = r.height() as f32 * 0.5;
        let lo = MIN_HALF_EXTENT * radius_px;
        let hi = MAX_HALF_EXTENT * radius_px;
        if half_w < lo || half_w > hi || half_h < lo || half_h > hi {
            continue;
        }
        let aspect = r.aspect();
        if aspect < ASPECT_WINDOW.0 || aspect > ASPECT_WINDOW.1 {
            continue;
        }
        let (cx, cy) = r.center();
        out.push(DetectedCircle {
            center: Point2::new(cx + 0.5, cy + 0.5),
            radius: 0.5 * (half_w + half_h),
        });
    }

    out
}

/// Run the contour fallback over the whole grid.
pub fn detect_contour(page: &PageView<'_>, grid: &SheetGrid, th: &DetectorThresholds) -> DetectorOutput {
    let radius_px = grid.bubble_radius_mm * page.px_per_mm;
    let circles = bubble_regions_as_circles(page, radius_px);
    log::debug!("contour fallback found {} bubble-shaped regions", circles.len());
    detect_with_circles(page, grid, th, &circles, DetectorKind::Contour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetscan_core::{adaptive_threshold_gaussian, gaussian_blur, BinaryImage, GrayImage};

    fn page_with_disks() -> (GrayImage, GrayImage, BinaryImage) {
        let mut img = GrayImage::new(400, 200, 255);
        for (cx, cy) in [(100.0f32, 100.0f32), (300.0, 100.0)] {
            for y in 0..200 {
                for x in 0..400 {
                    let dx = x as f32 + 0.5 - cx;
                    let dy = y as f32 + 0.5 - cy;
                    if dx * dx + dy * dy <= 25.0 * 25.0 {
                        img.set(x, y, 0);
                    }
                }
            }
        }
        let blurred = gaussian_blur(&img.view(), 5);
        let binary = adaptive_threshold_gaussian(&img.view(), 11, 2.0, true);
        (img, blurred, binary)
    }

    #[test]
    fn disks_become_circles() {
        let (gray, blurred, binary) = page_with_disks();
        let page = PageView {
            gray: gray.view(),
            blurred: blurred.view(),
            binary: &binary,
            px_per_mm: 10.0,
        };
        let circles = bubble_regions_as_circles(&page, 25.0);
        assert_eq!(circles.len(), 2);
        let mut xs: Vec<f32> = circles.iter().map(|c| c.center.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 100.0).abs() < 2.0);
        assert!((xs[1] - 300.0).abs() < 2.0);
    }

    #[test]
    fn oversized_regions_are_rejected() {
        let mut img = GrayImage::new(400, 200, 255);
        for y in 20..180 {
            for x in 20..380 {
                img.set(x, y, 0);
            }
        }
        let blurred = gaussian_blur(&img.view(), 5);
        let binary = adaptive_threshold_gaussian(&img.view(), 11, 2.0, true);
        let page = PageView {
            gray: img.view(),
            blurred: blurred.view(),
            binary: &binary,
            px_per_mm: 10.0,
        };
        assert!(bubble_regions_as_circles(&page, 25.0).is_empty());
    }
}
