//! Downsampling and JPEG re-encoding of template images

use crate::errors::PushError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageError, ImageReader};
use std::io::Cursor;

pub const COMPRESSED_CONTENT_TYPE: &str = "image/jpeg";

/// Largest size fitting `max_dimension` on the longer edge. Never upscales.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_dimension || max_dimension == 0 {
        return (width, height);
    }

    let scale = max_dimension as f64 / longer as f64;
    let fit = |edge: u32| ((edge as f64 * scale).round() as u32).clamp(1, max_dimension);
    (fit(width), fit(height))
}

/// Replace the extension with `.jpg`, or append it.
pub fn jpeg_filename(filename: &str) -> String {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.jpg", &filename[..dot]),
        _ => format!("{}.jpg", filename),
    }
}

/// Decode, downsample and encode as JPEG. CPU-bound; call from a blocking task.
pub fn compress_image(bytes: &[u8], max_dimension: u32, quality: f32) -> Result<Vec<u8>, PushError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PushError::Upload(format!("Failed to read image: {}", e)))?;
    if reader.format().is_none() {
        return Err(PushError::Upload("Not a recognisable image".to_string()));
    }

    let image = reader.decode().map_err(map_image_error)?;

    let (width, height) = scaled_dimensions(image.width(), image.height(), max_dimension);
    crate::assert_invariant!(
        max_dimension == 0 || width.max(height) <= max_dimension,
        "Compressed template fits max dimension",
        "upload::compress_image"
    );
    let rgb = image.to_rgb8();
    let resized = if (width, height) == rgb.dimensions() {
        rgb
    } else {
        image::imageops::resize(&rgb, width, height, FilterType::Triangle)
    };

    log::debug!(
        "Compressed template {}x{} -> {}x{}",
        image.width(),
        image.height(),
        width,
        height
    );

    let quality = (quality.clamp(0.01, 1.0) * 100.0).round() as u8;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&resized)
        .map_err(map_image_error)?;
    Ok(out)
}

fn map_image_error(error: ImageError) -> PushError {
    match error {
        ImageError::Unsupported(e) => PushError::CanvasUnsupported(e.to_string()),
        other => PushError::Upload(format!("Failed to process image: {}", other)),
    }
}
