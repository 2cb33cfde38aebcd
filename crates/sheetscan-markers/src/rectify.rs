//! Page rectification onto the canonical canvas.
//!
//! The located corners are the page-facing corners of markers whose outer
//! edges sit `marker_margin_mm` from the page edge, so they map to the
//! margin positions on the canonical page. Mapping them to the canvas
//! corners instead would shrink the whole grid by the margin (about 5%)
//! and shift every bubble by several millimetres.

use nalgebra::Point2;
use sheetscan_core::{
    estimate_homography, homography_from_4pt, max_reprojection_error, warp_perspective_gray,
    GrayImage, GrayImageView, Homography,
};
use sheetscan_layout::LayoutConstants;

use crate::locator::SheetCorners;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Reprojection ceiling for accepting the least-squares estimate, px.
const MAX_REPROJECTION_PX: f32 = 5.0;

/// Canonical destinations of the four marker corners, px: `tl, tr, br, bl`.
pub fn marker_destinations_px(layout: &LayoutConstants) -> [Point2<f32>; 4] {
    let m = layout.marker_margin_mm;
    let w = layout.page_width_mm;
    let h = layout.page_height_mm;
    let ppm = layout.px_per_mm;
    [
        Point2::new(m * ppm, m * ppm),
        Point2::new((w - m) * ppm, m * ppm),
        Point2::new((w - m) * ppm, (h - m) * ppm),
        Point2::new(m * ppm, (h - m) * ppm),
    ]
}

/// Homography mapping canonical-page pixels into the raw image.
///
/// Tries the normalized least-squares estimate first and keeps it when all
/// four corners reproject within [`MAX_REPROJECTION_PX`]; otherwise falls
/// back to the direct 4-point solve.
pub fn page_homography(corners: &SheetCorners, layout: &LayoutConstants) -> Option<Homography> {
    let dst = marker_destinations_px(layout);
    let src = corners.as_array();

    if let Some(h) = estimate_homography(&dst, &src) {
        if max_reprojection_error(&h, &dst, &src) <= MAX_REPROJECTION_PX {
            return Some(h);
        }
        log::debug!("least-squares page homography exceeded the reprojection ceiling");
    }

    homography_from_4pt(&dst, &src)
}

/// Warp the raw grayscale onto the canonical page.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(gray, corners, layout), fields(width = gray.width, height = gray.height))
)]
pub fn rectify_page(
    gray: &GrayImageView<'_>,
    corners: &SheetCorners,
    layout: &LayoutConstants,
) -> Option<GrayImage> {
    let h = page_homography(corners, layout)?;
    Some(warp_perspective_gray(
        gray,
        &h,
        layout.canonical_width_px(),
        layout.canonical_height_px(),
    ))
}

/// Plain scale onto the canonical canvas, used when no corners were found.
pub fn scale_to_canonical(gray: &GrayImageView<'_>, layout: &LayoutConstants) -> GrayImage {
    let out_w = layout.canonical_width_px();
    let out_h = layout.canonical_height_px();
    let sx = gray.width as f64 / out_w as f64;
    let sy = gray.height as f64 / out_h as f64;
    let h = Homography::new(nalgebra::Matrix3::new(
        sx, 0.0, 0.0, //
        0.0, sy, 0.0, //
        0.0, 0.0, 1.0,
    ));
    warp_perspective_gray(gray, &h, out_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sheetscan_core::GrayImage;

    fn canonical_corners() -> SheetCorners {
        SheetCorners {
            tl: Point2::new(50.0, 50.0),
            tr: Point2::new(2050.0, 50.0),
            br: Point2::new(2050.0, 2920.0),
            bl: Point2::new(50.0, 2920.0),
        }
    }

    #[test]
    fn destinations_follow_the_margin_contract() {
        let layout = LayoutConstants::default();
        let dst = marker_destinations_px(&layout);
        assert_relative_eq!(dst[0].x, 50.0);
        assert_relative_eq!(dst[1].x, 2050.0);
        assert_relative_eq!(dst[2].y, 2920.0);
        assert_relative_eq!(dst[3].y, 2920.0);
    }

    #[test]
    fn canonical_corners_give_an_identity_mapping() {
        let layout = LayoutConstants::default();
        let h = page_homography(&canonical_corners(), &layout).expect("homography");
        for p in [
            Point2::new(100.0_f32, 100.0),
            Point2::new(1000.0, 1500.0),
            Point2::new(2000.0, 2900.0),
        ] {
            let q = h.apply(p);
            assert!((q.x - p.x).abs() < 0.5 && (q.y - p.y).abs() < 0.5);
        }
    }

    #[test]
    fn rotated_corners_are_straightened() {
        let layout = LayoutConstants::default();
        // Rotate the true corner positions by a few degrees around the
        // page center and require the homography to undo it.
        let angle = 3.0f32.to_radians();
        let (s, c) = angle.sin_cos();
        let center = Point2::new(1050.0f32, 1485.0);
        let rot = |p: Point2<f32>| {
            let dx = p.x - center.x;
            let dy = p.y - center.y;
            Point2::new(center.x + c * dx - s * dy, center.y + s * dx + c * dy)
        };

        let truth = canonical_corners();
        let corners = SheetCorners {
            tl: rot(truth.tl),
            tr: rot(truth.tr),
            br: rot(truth.br),
            bl: rot(truth.bl),
        };

        let h = page_homography(&corners, &layout).expect("homography");
        let mapped = h.apply(Point2::new(50.0, 50.0));
        assert!((mapped.x - corners.tl.x).abs() < 1.0);
        assert!((mapped.y - corners.tl.y).abs() < 1.0);
    }

    #[test]
    fn scale_fallback_fills_the_canonical_canvas() {
        let layout = LayoutConstants::default();
        let img = GrayImage::new(1050, 1485, 190);
        let out = scale_to_canonical(&img.view(), &layout);
        assert_eq!(out.width, 2100);
        assert_eq!(out.height, 2970);
        assert_eq!(out.get(1000, 1000), 190);
    }
}
