//! Fill and ring-darkness sampling on the canonical page.

use nalgebra::Point2;
use sheetscan_core::{otsu_threshold_from_samples, sample_bilinear, BinaryImage, GrayImageView};

use crate::thresholds::DetectorThresholds;

/// Read-only views of the rectified page shared by every detector.
#[derive(Clone, Copy)]
pub struct PageView<'a> {
    pub gray: GrayImageView<'a>,
    /// 5x5 Gaussian blur of `gray`, the Hough input.
    pub blurred: GrayImageView<'a>,
    /// Adaptive-threshold ink mask of `gray`.
    pub binary: &'a BinaryImage,
    pub px_per_mm: f32,
}

impl<'a> PageView<'a> {
    #[inline]
    pub fn px(&self, mm: f32) -> f32 {
        mm * self.px_per_mm
    }
}

/// Minimum intensity spread before a patch is considered bimodal enough for
/// Otsu separation.
const MIN_PATCH_RANGE: u8 = 30;

/// Mean intensity on a sampled circle of radius `rad`.
fn circle_mean(gray: &GrayImageView<'_>, center: Point2<f32>, rad: f32, samples: usize) -> f32 {
    let mut sum = 0.0f32;
    for k in 0..samples {
        let t = (k as f32) * (std::f32::consts::TAU / samples as f32);
        sum += sample_bilinear(gray, center.x + rad * t.cos(), center.y + rad * t.sin());
    }
    sum / samples as f32
}

/// Mean intensity over an annulus, sampled on three concentric circles.
fn annulus_mean(gray: &GrayImageView<'_>, center: Point2<f32>, r0: f32, r1: f32) -> f32 {
    let mid = 0.5 * (r0 + r1);
    let m0 = circle_mean(gray, center, r0, 32);
    let m1 = circle_mean(gray, center, mid, 32);
    let m2 = circle_mean(gray, center, r1, 32);
    (m0 + m1 + m2) / 3.0
}

/// How much darker than white the printed outline annulus is, in 0..1.
pub fn ring_darkness(
    gray: &GrayImageView<'_>,
    center: Point2<f32>,
    radius: f32,
    th: &DetectorThresholds,
) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let mean = annulus_mean(gray, center, th.ring_inner * radius, th.ring_outer * radius);
    1.0 - mean / 255.0
}

/// Mean intensity over the inner disk, by pixel iteration.
fn disk_mean(gray: &GrayImageView<'_>, center: Point2<f32>, radius: f32) -> Option<f32> {
    let x0 = (center.x - radius).floor() as i32;
    let y0 = (center.y - radius).floor() as i32;
    let x1 = (center.x + radius).ceil() as i32;
    let y1 = (center.y + radius).ceil() as i32;
    let r_sq = radius * radius;

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for y in y0.max(0)..=y1.min(gray.height as i32 - 1) {
        for x in x0.max(0)..=x1.min(gray.width as i32 - 1) {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= r_sq {
                sum += gray.data[y as usize * gray.width + x as usize] as f64;
                count += 1;
            }
        }
    }
    if count == 0 {
        return None;
    }
    Some((sum / count as f64) as f32)
}

/// Fraction of disk pixels darker than `threshold`.
fn disk_dark_ratio(gray: &GrayImageView<'_>, center: Point2<f32>, radius: f32, threshold: u8) -> f32 {
    let x0 = (center.x - radius).floor() as i32;
    let y0 = (center.y - radius).floor() as i32;
    let x1 = (center.x + radius).ceil() as i32;
    let y1 = (center.y + radius).ceil() as i32;
    let r_sq = radius * radius;

    let mut dark = 0usize;
    let mut count = 0usize;
    for y in y0.max(0)..=y1.min(gray.height as i32 - 1) {
        for x in x0.max(0)..=x1.min(gray.width as i32 - 1) {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= r_sq {
                count += 1;
                if gray.data[y as usize * gray.width + x as usize] < threshold {
                    dark += 1;
                }
            }
        }
    }
    if count == 0 {
        return 0.0;
    }
    dark as f32 / count as f32
}

/// Fraction of disk pixels marked as ink on the binary mask.
pub fn disk_ink_ratio(binary: &BinaryImage, center: Point2<f32>, radius: f32) -> f32 {
    let x0 = (center.x - radius).floor() as i32;
    let y0 = (center.y - radius).floor() as i32;
    let x1 = (center.x + radius).ceil() as i32;
    let y1 = (center.y + radius).ceil() as i32;
    let r_sq = radius * radius;

    let mut ink = 0usize;
    let mut count = 0usize;
    for y in y0.max(0)..=y1.min(binary.height as i32 - 1) {
        for x in x0.max(0)..=x1.min(binary.width as i32 - 1) {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= r_sq {
                count += 1;
                if binary.data[y as usize * binary.width + x as usize] {
                    ink += 1;
                }
            }
        }
    }
    if count == 0 {
        return 0.0;
    }
    ink as f32 / count as f32
}

/// Otsu threshold of the square patch enclosing the bubble and its ring.
///
/// Returns `None` on a degenerate patch or one without enough intensity
/// spread to separate ink from paper.
pub fn patch_otsu_threshold(
    gray: &GrayImageView<'_>,
    center: Point2<f32>,
    half: f32,
) -> Option<u8> {
    let x0 = ((center.x - half).floor() as i32).max(0);
    let y0 = ((center.y - half).floor() as i32).max(0);
    let x1 = ((center.x + half).ceil() as i32).min(gray.width as i32);
    let y1 = ((center.y + half).ceil() as i32).min(gray.height as i32);
    if x1 - x0 <= 2 || y1 - y0 <= 2 {
        return None;
    }

    let mut samples = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            samples.push(gray.data[y as usize * gray.width + x as usize]);
        }
    }

    let min = samples.iter().copied().min().unwrap_or(0);
    let max = samples.iter().copied().max().unwrap_or(0);
    if max - min < MIN_PATCH_RANGE {
        return None;
    }
    Some(otsu_threshold_from_samples(&samples))
}

/// Fill at one position: the maximum of the Otsu-patch ink ratio, the
/// adaptive-mask ink ratio, and the damped grayscale ring contrast.
pub fn fill_at(
    page: &PageView<'_>,
    center: Point2<f32>,
    radius: f32,
    otsu: Option<u8>,
    th: &DetectorThresholds,
) -> f32 {
    let inner = th.disk_factor * radius;
    if inner <= 1.0 {
        return 0.0; // degenerate geometry reads as blank
    }

    let otsu_ratio = otsu
        .map(|t| disk_dark_ratio(&page.gray, center, inner, t))
        .unwrap_or(0.0);
    let adaptive_ratio = disk_ink_ratio(page.binary, center, inner);

    let ring = annulus_mean(&page.gray, center, th.ring_inner * radius, th.ring_outer * radius);
    let contrast = if ring > 0.0 {
        let inner_mean = disk_mean(&page.gray, center, inner).unwrap_or(ring);
        th.ring_damping * ((ring - inner_mean) / ring).max(0.0)
    } else {
        0.0
    };

    otsu_ratio.max(adaptive_ratio).max(contrast)
}

/// Fill with the patch threshold computed at the given center.
pub fn fill_single(
    page: &PageView<'_>,
    center: Point2<f32>,
    radius: f32,
    th: &DetectorThresholds,
) -> f32 {
    let otsu = patch_otsu_threshold(&page.gray, center, th.ring_outer * radius);
    fill_at(page, center, radius, otsu, th)
}

/// Maximum fill over the jitter grid around `center`.
///
/// The patch threshold is taken once at the unjittered center; the jitter
/// only moves the sampling disk.
pub fn jittered_fill(
    page: &PageView<'_>,
    center: Point2<f32>,
    radius: f32,
    th: &DetectorThresholds,
) -> f32 {
    let otsu = patch_otsu_threshold(&page.gray, center, th.ring_outer * radius);
    let jitter = page.px(th.jitter_mm);
    let step = page.px(th.jitter_step_mm);
    if step <= 0.0 {
        return fill_at(page, center, radius, otsu, th);
    }

    let mut best = 0.0f32;
    let steps = (jitter / step).round() as i32;
    for iy in -steps..=steps {
        for ix in -steps..=steps {
            let c = Point2::new(center.x + ix as f32 * step, center.y + iy as f32 * step);
            best = best.max(fill_at(page, c, radius, otsu, th));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetscan_core::{adaptive_threshold_gaussian, gaussian_blur, GrayImage};

    fn bubble_image(filled: bool) -> GrayImage {
        let mut img = GrayImage::new(120, 120, 255);
        let (cx, cy) = (60.0f32, 60.0f32);
        for y in 0..120 {
            for x in 0..120 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let in_ring = d >= 23.0 && d <= 27.0;
                let in_disk = d <= 25.0;
                if (filled && in_disk) || (!filled && in_ring) {
                    img.set(x, y, 0);
                }
            }
        }
        img
    }

    fn page_of<'a>(
        gray: &'a GrayImage,
        blurred: &'a GrayImage,
        binary: &'a BinaryImage,
    ) -> PageView<'a> {
        PageView {
            gray: gray.view(),
            blurred: blurred.view(),
            binary,
            px_per_mm: 10.0,
        }
    }

    #[test]
    fn filled_bubble_scores_high() {
        let gray = bubble_image(true);
        let blurred = gaussian_blur(&gray.view(), 5);
        let binary = adaptive_threshold_gaussian(&gray.view(), 11, 2.0, true);
        let page = page_of(&gray, &blurred, &binary);

        let fill = fill_single(&page, Point2::new(60.0, 60.0), 25.0, &DetectorThresholds::default());
        assert!(fill > 0.9, "fill = {fill}");
    }

    #[test]
    fn outline_only_bubble_scores_low() {
        let gray = bubble_image(false);
        let blurred = gaussian_blur(&gray.view(), 5);
        let binary = adaptive_threshold_gaussian(&gray.view(), 11, 2.0, true);
        let page = page_of(&gray, &blurred, &binary);

        let fill = fill_single(&page, Point2::new(60.0, 60.0), 25.0, &DetectorThresholds::default());
        assert!(fill < 0.08, "fill = {fill}");
    }

    #[test]
    fn blank_paper_scores_zero() {
        let gray = GrayImage::new(120, 120, 255);
        let blurred = gaussian_blur(&gray.view(), 5);
        let binary = adaptive_threshold_gaussian(&gray.view(), 11, 2.0, true);
        let page = page_of(&gray, &blurred, &binary);

        let fill = fill_single(&page, Point2::new(60.0, 60.0), 25.0, &DetectorThresholds::default());
        assert!(fill < 1e-3, "fill = {fill}");
    }

    #[test]
    fn degenerate_radius_reads_blank() {
        let gray = bubble_image(true);
        let blurred = gaussian_blur(&gray.view(), 5);
        let binary = adaptive_threshold_gaussian(&gray.view(), 11, 2.0, true);
        let page = page_of(&gray, &blurred, &binary);

        let fill = fill_single(&page, Point2::new(60.0, 60.0), 1.0, &DetectorThresholds::default());
        assert_eq!(fill, 0.0);
    }

    #[test]
    fn ring_darkness_sees_the_outline() {
        let gray = bubble_image(false);
        let th = DetectorThresholds::default();
        // The outline at radius 25 sits inside the 1.1..1.6 annulus of a
        // slightly smaller nominal radius.
        let dark = ring_darkness(&gray.view(), Point2::new(60.0, 60.0), 20.0, &th);
        let blank = ring_darkness(&gray.view(), Point2::new(20.0, 20.0), 20.0, &th);
        assert!(dark > blank + 0.1, "dark = {dark}, blank = {blank}");
    }

    #[test]
    fn jitter_recovers_a_small_offset() {
        let gray = bubble_image(true);
        let blurred = gaussian_blur(&gray.view(), 5);
        let binary = adaptive_threshold_gaussian(&gray.view(), 11, 2.0, true);
        let page = page_of(&gray, &blurred, &binary);
        let th = DetectorThresholds::default();

        // 1 mm off-center: the jitter grid still reaches the true center.
        let off = Point2::new(70.0, 60.0);
        let with_jitter = jittered_fill(&page, off, 25.0, &th);
        assert!(with_jitter > 0.85, "fill = {with_jitter}");
    }
}
