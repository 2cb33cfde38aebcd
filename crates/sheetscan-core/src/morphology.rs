//! Binary morphology with elliptical structuring elements.

use crate::image::BinaryImage;

/// Offsets of an elliptical structuring element, anchored at its center.
///
/// Matches the OpenCV element shapes used by the preprocessor: sizes of 2 or
/// less degenerate to a full rectangle, a 3x3 ellipse is the 4-connected
/// cross.
pub fn ellipse_kernel(width: usize, height: usize) -> Vec<(i32, i32)> {
    let mut offsets = Vec::new();

    if width <= 2 || height <= 2 {
        for dy in 0..height as i32 {
            for dx in 0..width as i32 {
                offsets.push((dx - (width as i32 - 1) / 2, dy - (height as i32 - 1) / 2));
            }
        }
        return offsets;
    }

    let rx = (width as f32 - 1.0) / 2.0;
    let ry = (height as f32 - 1.0) / 2.0;
    for dy in -(ry as i32)..=(ry as i32) {
        // Inscribed-ellipse row span.
        let t = 1.0 - (dy as f32 / ry) * (dy as f32 / ry);
        let span = (rx * t.max(0.0).sqrt()).round() as i32;
        for dx in -span..=span {
            offsets.push((dx, dy));
        }
    }
    offsets
}

pub fn erode(src: &BinaryImage, kernel: &[(i32, i32)]) -> BinaryImage {
    let mut out = BinaryImage::new(src.width, src.height);
    for y in 0..src.height as i32 {
        for x in 0..src.width as i32 {
            let keep = kernel
                .iter()
                .all(|&(dx, dy)| src.get_checked(x + dx, y + dy));
            if keep {
                out.set(x as usize, y as usize, true);
            }
        }
    }
    out
}

pub fn dilate(src: &BinaryImage, kernel: &[(i32, i32)]) -> BinaryImage {
    let mut out = BinaryImage::new(src.width, src.height);
    for y in 0..src.height as i32 {
        for x in 0..src.width as i32 {
            let hit = kernel
                .iter()
                .any(|&(dx, dy)| src.get_checked(x + dx, y + dy));
            if hit {
                out.set(x as usize, y as usize, true);
            }
        }
    }
    out
}

/// Opening: erosion then dilation. Removes specks smaller than the element.
pub fn open(src: &BinaryImage, kernel: &[(i32, i32)]) -> BinaryImage {
    dilate(&erode(src, kernel), kernel)
}

/// Closing: dilation then erosion. Fills pinholes smaller than the element.
pub fn close(src: &BinaryImage, kernel: &[(i32, i32)]) -> BinaryImage {
    erode(&dilate(src, kernel), kernel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipse_3x3_is_a_cross() {
        let mut k = ellipse_kernel(3, 3);
        k.sort_unstable();
        assert_eq!(k, vec![(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn ellipse_2x2_is_full() {
        assert_eq!(ellipse_kernel(2, 2).len(), 4);
    }

    #[test]
    fn open_removes_single_pixel_speck() {
        let mut img = BinaryImage::new(9, 9);
        img.set(4, 4, true);
        let out = open(&img, &ellipse_kernel(2, 2));
        assert_eq!(out.count_ink(), 0);
    }

    #[test]
    fn close_fills_a_pinhole() {
        let mut img = BinaryImage::new(11, 11);
        for y in 2..9 {
            for x in 2..9 {
                img.set(x, y, true);
            }
        }
        img.set(5, 5, false);
        let out = close(&img, &ellipse_kernel(3, 3));
        assert!(out.get(5, 5));
    }
}
