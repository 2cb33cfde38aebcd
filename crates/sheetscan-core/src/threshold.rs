//! Global and local binarization.

use crate::filter::gaussian_blur_f32;
use crate::image::{BinaryImage, GrayImageView};

/// 256-bin intensity histogram with the aggregate statistics the Otsu
/// scan needs.
struct Histogram {
    bins: [u32; 256],
    total: u64,
    weighted_sum: u64,
}

impl Histogram {
    fn collect(samples: &[u8]) -> Self {
        let mut bins = [0u32; 256];
        for &v in samples {
            bins[v as usize] += 1;
        }
        let weighted_sum = bins
            .iter()
            .enumerate()
            .map(|(v, &c)| v as u64 * c as u64)
            .sum();
        Self {
            bins,
            total: samples.len() as u64,
            weighted_sum,
        }
    }

    fn occupied(&self) -> usize {
        self.bins.iter().filter(|&&c| c > 0).count()
    }

    fn darkest(&self) -> Option<u8> {
        self.bins.iter().position(|&c| c > 0).map(|v| v as u8)
    }

    fn brightest(&self) -> Option<u8> {
        self.bins.iter().rposition(|&c| c > 0).map(|v| v as u8)
    }
}

/// Otsu threshold over a set of sample intensities.
///
/// Returns the first intensity of the bright class, so callers mark ink
/// with `value < threshold`. Degenerate histograms short-circuit: no
/// samples give 127, one occupied level gives that level, two give their
/// midpoint.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let hist = Histogram::collect(samples);
    let (Some(lo), Some(hi)) = (hist.darkest(), hist.brightest()) else {
        return 127;
    };
    if lo == hi {
        return lo;
    }
    if hist.occupied() <= 2 {
        return ((lo as u16 + hi as u16) / 2) as u8;
    }

    // Single pass over the candidate splits; the prefix sums give both
    // class means directly, and the split maximizing the between-class
    // separation wins.
    let mut below_count = 0u64;
    let mut below_sum = 0u64;
    let mut best_split = lo;
    let mut best_separation = -1.0f64;

    for t in lo..hi {
        below_count += hist.bins[t as usize] as u64;
        below_sum += t as u64 * hist.bins[t as usize] as u64;
        let above_count = hist.total - below_count;
        if below_count == 0 || above_count == 0 {
            continue;
        }

        let mean_below = below_sum as f64 / below_count as f64;
        let mean_above = (hist.weighted_sum - below_sum) as f64 / above_count as f64;
        let gap = mean_above - mean_below;
        let separation = below_count as f64 * above_count as f64 * gap * gap;
        if separation > best_separation {
            best_separation = separation;
            best_split = t;
        }
    }

    best_split.saturating_add(1)
}

/// Adaptive Gaussian threshold.
///
/// The threshold surface is the Gaussian-weighted neighborhood mean (window
/// `block` x `block`) minus `c`. With `invert` set, pixels darker than the
/// surface become ink, which is the polarity every downstream stage expects.
pub fn adaptive_threshold_gaussian(
    src: &GrayImageView<'_>,
    block: usize,
    c: f32,
    invert: bool,
) -> BinaryImage {
    let block = if block % 2 == 0 { block + 1 } else { block };
    let surface = gaussian_blur_f32(src, block);

    let mut out = BinaryImage::new(src.width, src.height);
    for (i, &v) in src.data.iter().enumerate() {
        let above = v as f32 > surface[i] - c;
        out.data[i] = if invert { !above } else { above };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GrayImage;

    #[test]
    fn otsu_separates_bimodal_samples() {
        let mut samples = vec![20u8; 50];
        samples.extend(vec![220u8; 50]);
        let t = otsu_threshold_from_samples(&samples);
        assert!(t > 20 && t <= 220);
    }

    #[test]
    fn otsu_splits_spread_classes_between_them() {
        // Two noisy clusters around 30 and 200.
        let mut samples = Vec::new();
        for v in [25u8, 28, 30, 32, 35] {
            samples.extend(std::iter::repeat(v).take(20));
        }
        for v in [195u8, 198, 200, 202, 205] {
            samples.extend(std::iter::repeat(v).take(20));
        }
        let t = otsu_threshold_from_samples(&samples);
        assert!(t > 35 && t <= 195, "t = {t}");
    }

    #[test]
    fn otsu_flat_samples_return_value() {
        assert_eq!(otsu_threshold_from_samples(&[42u8; 16]), 42);
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
    }

    #[test]
    fn adaptive_marks_dark_blob_as_ink() {
        let mut img = GrayImage::new(32, 32, 230);
        for y in 12..20 {
            for x in 12..20 {
                img.set(x, y, 20);
            }
        }
        let bin = adaptive_threshold_gaussian(&img.view(), 11, 2.0, true);
        assert!(bin.get(15, 15));
        assert!(!bin.get(2, 2));
    }

    #[test]
    fn adaptive_flat_field_is_clean() {
        let img = GrayImage::new(16, 16, 180);
        let bin = adaptive_threshold_gaussian(&img.view(), 11, 2.0, true);
        assert_eq!(bin.count_ink(), 0);
    }
}
