//! Separable convolution filters and image statistics.

use crate::image::{get_gray_replicate, GrayImage, GrayImageView};

/// Gaussian kernel for an odd `ksize`, sigma derived the same way OpenCV
/// derives it from the kernel size.
fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    debug_assert!(ksize % 2 == 1);
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as i32;
    let mut k = Vec::with_capacity(ksize);
    let mut sum = 0.0f32;
    for i in -half..=half {
        let v = (-(i * i) as f32 / (2.0 * sigma * sigma)).exp();
        k.push(v);
        sum += v;
    }
    for v in &mut k {
        *v /= sum;
    }
    k
}

/// Separable Gaussian blur with border replication.
pub fn gaussian_blur(src: &GrayImageView<'_>, ksize: usize) -> GrayImage {
    let kernel = gaussian_kernel(ksize);
    let half = (ksize / 2) as i32;
    let (w, h) = (src.width, src.height);

    let mut horiz = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = x as i32 + ki as i32 - half;
                acc += kv * get_gray_replicate(src, sx, y as i32) as f32;
            }
            horiz[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as i32 + ki as i32 - half).clamp(0, h as i32 - 1);
                acc += kv * horiz[sy as usize * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Blurred image kept at float precision, for threshold surfaces.
pub fn gaussian_blur_f32(src: &GrayImageView<'_>, ksize: usize) -> Vec<f32> {
    let kernel = gaussian_kernel(ksize);
    let half = (ksize / 2) as i32;
    let (w, h) = (src.width, src.height);

    let mut horiz = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = x as i32 + ki as i32 - half;
                acc += kv * get_gray_replicate(src, sx, y as i32) as f32;
            }
            horiz[y * w + x] = acc;
        }
    }

    let mut out = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as i32 + ki as i32 - half).clamp(0, h as i32 - 1);
                acc += kv * horiz[sy as usize * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// Sobel gradient field.
pub struct Gradients {
    pub width: usize,
    pub height: usize,
    pub gx: Vec<f32>,
    pub gy: Vec<f32>,
}

impl Gradients {
    #[inline]
    pub fn magnitude(&self, x: usize, y: usize) -> f32 {
        let i = y * self.width + x;
        (self.gx[i] * self.gx[i] + self.gy[i] * self.gy[i]).sqrt()
    }
}

/// 3x3 Sobel gradients with border replication.
pub fn sobel_gradients(src: &GrayImageView<'_>) -> Gradients {
    let (w, h) = (src.width, src.height);
    let mut gx = vec![0f32; w * h];
    let mut gy = vec![0f32; w * h];

    for y in 0..h {
        for x in 0..w {
            let p = |dx: i32, dy: i32| get_gray_replicate(src, x as i32 + dx, y as i32 + dy) as f32;
            gx[y * w + x] = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            gy[y * w + x] = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
        }
    }

    Gradients {
        width: w,
        height: h,
        gx,
        gy,
    }
}

/// Standard deviation of the 3x3 Laplacian response, the sharpness proxy.
pub fn laplacian_stddev(src: &GrayImageView<'_>) -> f64 {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let n = (w * h) as f64;

    for y in 0..h {
        for x in 0..w {
            let p = |dx: i32, dy: i32| get_gray_replicate(src, x as i32 + dx, y as i32 + dy) as f64;
            let lap = p(1, 0) + p(-1, 0) + p(0, 1) + p(0, -1) - 4.0 * p(0, 0);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

/// Standard deviation of pixel intensities, the contrast proxy.
pub fn gray_stddev(src: &GrayImageView<'_>) -> f64 {
    let n = (src.width * src.height) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for &v in src.data {
        sum += v as f64;
        sum_sq += v as f64 * v as f64;
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}
