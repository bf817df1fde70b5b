use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, RgbImage, RgbaImage};

use crate::config::OutputFormat;
use crate::error::FitError;

/// Decode input bytes into a `DynamicImage`, rejecting empty images.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, FitError> {
    let image = image::load_from_memory(input).map_err(|e| FitError::DecodeError(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(FitError::ZeroDimensions);
    }
    Ok(image)
}

/// Flatten alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    let rgba: RgbaImage = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let out_r = (r as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_g = (g as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_b = (b as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        rgb.put_pixel(x, y, image::Rgb([out_r, out_g, out_b]));
    }

    rgb
}

/// Encode a cropped region in the configured format.
pub(crate) fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, FitError> {
    let mut buffer = Vec::new();

    match format {
        OutputFormat::Png => {
            let rgba = image.to_rgba8();
            PngEncoder::new(&mut buffer)
                .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
                .map_err(|e| FitError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Jpeg => {
            let rgb = flatten_alpha(image);
            let quality_percent = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            JpegEncoder::new_with_quality(&mut buffer, quality_percent)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| FitError::EncodeError(e.to_string()))?;
        }
    }

    Ok(buffer)
}

/// Encode a fitting mask as single-channel PNG.
pub(crate) fn encode_mask(mask: &GrayImage) -> Result<Vec<u8>, FitError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(mask.as_raw(), mask.width(), mask.height(), ExtendedColorType::L8)
        .map_err(|e| FitError::EncodeError(e.to_string()))?;
    Ok(buffer)
}
