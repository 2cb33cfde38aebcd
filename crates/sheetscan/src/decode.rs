//! Image decoding helpers, available with the default `image` feature.

use sheetscan_core::GrayImage;

use crate::error::GradeError;

/// Decode encoded bytes into the pipeline's grayscale type.
pub fn decode_gray(bytes: &[u8]) -> Result<GrayImage, GradeError> {
    let decoded = image::load_from_memory(bytes).map_err(GradeError::Decode)?;
    Ok(from_luma(&decoded.to_luma8()))
}

/// Convert an `image` crate grayscale buffer.
pub fn from_luma(img: &image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Convert back into an `image` crate buffer, for writing debug output.
pub fn to_luma(img: &GrayImage) -> Option<image::GrayImage> {
    image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_gray(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, GradeError::Decode(_)));
    }

    #[test]
    fn png_round_trips() {
        let mut img = image::GrayImage::new(4, 3);
        img.put_pixel(1, 1, image::Luma([77]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let gray = decode_gray(&bytes).unwrap();
        assert_eq!(gray.width, 4);
        assert_eq!(gray.height, 3);
        assert_eq!(gray.get(1, 1), 77);
    }
}
