//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! grayscale raster used for ink thresholding and the RGB raster used
//! for marking removal.

use image::{DynamicImage, GrayImage, RgbImage};

use crate::types::EngineError;

/// Decode raw image bytes into a [`DynamicImage`].
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Decode raw image bytes and convert to grayscale.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, EngineError> {
    decode(bytes).map(|img| img.to_luma8())
}

/// Decode raw image bytes into 8-bit RGB, dropping any alpha channel.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, EngineError> {
    decode(bytes).map(|img| img.to_rgb8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .ok();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_and_grayscale(&[]), Err(EngineError::EmptyInput)));
        assert!(matches!(decode_rgb(&[]), Err(EngineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_and_grayscale(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(EngineError::ImageDecode(_))));
    }

    #[test]
    fn white_png_decodes_to_white() {
        let img = image::RgbaImage::from_fn(2, 2, |_, _| image::Rgba([255, 255, 255, 255]));
        let gray = decode_and_grayscale(&encode_png(&img)).unwrap();
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn rgb_decode_keeps_channels_and_dimensions() {
        let img = image::RgbaImage::from_fn(17, 31, |_, _| image::Rgba([200, 10, 30, 255]));
        let rgb = decode_rgb(&encode_png(&img)).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (17, 31));
        assert_eq!(rgb.get_pixel(3, 4).0, [200, 10, 30]);
    }
}
