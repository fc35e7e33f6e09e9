//! JPEG encoding with optional downscale.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::error::CardsmithError;

/// Output size after fitting `(width, height)` inside `max_dim`, keeping the
/// aspect ratio. Images already inside the limit are left alone.
pub fn downscale_dimensions(width: u32, height: u32, max_dim: Option<u32>) -> (u32, u32) {
    match max_dim {
        Some(max_dim) if max_dim > 0 && (width > max_dim || height > max_dim) => {
            let scale = max_dim as f32 / width.max(height) as f32;
            let new_width = ((width as f32 * scale).round() as u32).max(1);
            let new_height = ((height as f32 * scale).round() as u32).max(1);
            (new_width, new_height)
        }
        _ => (width, height),
    }
}

/// Encode as baseline JPEG. Alpha is dropped (the surface is opaque).
pub fn encode_jpeg(image: &RgbaImage, quality: u8, max_dim: Option<u32>) -> Result<Vec<u8>, CardsmithError> {
    let (width, height) = downscale_dimensions(image.width(), image.height(), max_dim);
    let rgb = if (width, height) == image.dimensions() {
        DynamicImage::ImageRgba8(image.clone()).to_rgb8()
    } else {
        DynamicImage::ImageRgba8(image.clone())
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8()
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| CardsmithError::Image(format!("JPEG encoding failed: {}", e)))?;
    Ok(out)
}

/// Encode as PNG, for previews.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CardsmithError> {
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| CardsmithError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(out.into_inner())
}
