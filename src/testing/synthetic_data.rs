//! Synthetic template images
//!
//! Encoded test images for exercising the uploader without fixture files.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// RGB gradient so resizing has real content to work on
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Gradient encoded as PNG bytes
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    // Writing into memory cannot fail for a valid RGB buffer
    let _ = gradient_image(width, height).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png);
    bytes
}

/// Header of a little-endian TIFF, a format this build cannot decode
pub fn unsupported_image_bytes() -> Vec<u8> {
    let mut bytes = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_png_decodes_to_requested_size() {
        let bytes = synthetic_png(64, 32);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn tiff_header_is_recognised_but_not_decodable() {
        let bytes = unsupported_image_bytes();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Tiff);
        assert!(image::load_from_memory(&bytes).is_err());
    }
}
