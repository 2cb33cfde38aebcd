//! Owned and borrowed raster types.
//!
//! The pipeline distinguishes grayscale intensity data from binarized ink
//! masks at the type level: functions that query intensity take a
//! [`GrayImageView`], functions that count ink take a [`BinaryImage`].

/// Borrowed single-channel 8-bit image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // len = width * height
}

/// Owned single-channel 8-bit image.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    /// Wrap a raw row-major buffer. Returns `None` on a length mismatch.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }
}

/// Owned binary ink mask. `true` marks an inked pixel.
#[derive(Clone, Debug)]
pub struct BinaryImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl BinaryImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    /// Bounds-checked read; pixels outside the image are not ink.
    #[inline]
    pub fn get_checked(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.width + x] = v;
    }

    pub fn count_ink(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// Border-replicated read: coordinates outside the image clamp to the edge.
#[inline]
pub fn get_gray_replicate(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    let xc = x.clamp(0, src.width as i32 - 1) as usize;
    let yc = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[yc * src.width + xc]
}

/// Bilinear sample with border replication.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray_replicate(src, x0, y0) as f32;
    let p10 = get_gray_replicate(src, x0 + 1, y0) as f32;
    let p01 = get_gray_replicate(src, x0, y0 + 1) as f32;
    let p11 = get_gray_replicate(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

/// Area-averaging downscale so that the longest edge is at most `max_dim`.
///
/// Returns `None` when the image already fits; images are never upscaled.
pub fn downscale_to_max(src: &GrayImageView<'_>, max_dim: usize) -> Option<GrayImage> {
    let longest = src.width.max(src.height);
    if longest <= max_dim || max_dim == 0 {
        return None;
    }

    let scale = max_dim as f64 / longest as f64;
    let out_w = ((src.width as f64 * scale).round() as usize).max(1);
    let out_h = ((src.height as f64 * scale).round() as usize).max(1);

    // Forward bin accumulation: every source pixel lands in exactly one
    // destination bin, which averages all contributors.
    let mut sums = vec![0u64; out_w * out_h];
    let mut counts = vec![0u32; out_w * out_h];

    for y in 0..src.height {
        let oy = (y * out_h / src.height).min(out_h - 1);
        for x in 0..src.width {
            let ox = (x * out_w / src.width).min(out_w - 1);
            let idx = oy * out_w + ox;
            sums[idx] += src.data[y * src.width + x] as u64;
            counts[idx] += 1;
        }
    }

    let data = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c == 0 { 0 } else { (s / c as u64) as u8 })
        .collect();

    Some(GrayImage {
        width: out_w,
        height: out_h,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_replicates_borders() {
        let img = GrayImage::from_raw(2, 2, vec![10, 20, 30, 40]).unwrap();
        let v = img.view();
        assert_eq!(sample_bilinear_u8(&v, -5.0, -5.0), 10);
        assert_eq!(sample_bilinear_u8(&v, 10.0, 10.0), 40);
    }

    #[test]
    fn bilinear_interpolates_midpoint() {
        let img = GrayImage::from_raw(2, 1, vec![0, 100]).unwrap();
        let v = img.view();
        let mid = sample_bilinear(&v, 0.5, 0.0);
        assert!((mid - 50.0).abs() < 1e-3);
    }

    #[test]
    fn downscale_keeps_small_images() {
        let img = GrayImage::new(100, 50, 128);
        assert!(downscale_to_max(&img.view(), 3500).is_none());
    }

    #[test]
    fn downscale_bounds_longest_edge() {
        let img = GrayImage::new(7000, 3500, 77);
        let out = downscale_to_max(&img.view(), 3500).expect("resampled");
        assert_eq!(out.width, 3500);
        assert_eq!(out.height, 1750);
        assert!(out.data.iter().all(|&v| v == 77));
    }
}
