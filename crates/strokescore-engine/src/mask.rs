//! Ink mask extraction.
//!
//! Dark pixels become ink via an inverted binary threshold. When a color
//! raster is available, pixels matching the configured marking color
//! (printed guide lines, red-ink corrections) are removed from the ink
//! so they are never mistaken for strokes.

use image::{GrayImage, RgbImage};

use crate::config::{MarkingColor, MaskConfig};
use crate::grayscale;
use crate::types::{BinaryMask, EngineError};

/// Inverted binary threshold: pixels with luminance `<= threshold` are
/// ink.
#[must_use = "returns the ink mask"]
pub fn threshold_ink(gray: &GrayImage, threshold: u8) -> BinaryMask {
    BinaryMask::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).0[0] <= threshold
    })
}

/// Convert an 8-bit RGB triple to `(hue°, saturation, value)`.
///
/// Hue is in degrees `[0, 360)`; saturation and value are on the 0-255
/// scale. Achromatic pixels report hue 0.
#[must_use]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return (0.0, 0, max);
    }
    let delta = f32::from(max - min);

    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let hue = if max == r {
        60.0 * ((gf - bf) / delta)
    } else if max == g {
        60.0f32.mul_add((bf - rf) / delta, 120.0)
    } else {
        60.0f32.mul_add((rf - gf) / delta, 240.0)
    };
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let saturation = (delta * 255.0 / f32::from(max)).round() as u8;
    (hue, saturation, max)
}

/// Mask of pixels whose color matches `marking`.
#[must_use = "returns the marking mask"]
pub fn marking_mask(rgb: &RgbImage, marking: &MarkingColor) -> BinaryMask {
    BinaryMask::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let (hue, saturation, value) = rgb_to_hsv(r, g, b);
        saturation >= marking.min_saturation
            && value >= marking.min_value
            && marking.hue_ranges.iter().any(|range| range.contains(hue))
    })
}

/// Build the ink mask from a grayscale raster and an optional color
/// raster of the same image.
///
/// Marking removal runs only when both a color raster and
/// [`MaskConfig::marking`] are present.
#[must_use = "returns the ink mask"]
pub fn extract_ink(gray: &GrayImage, rgb: Option<&RgbImage>, config: &MaskConfig) -> BinaryMask {
    let ink = threshold_ink(gray, config.threshold);
    match (rgb, &config.marking) {
        (Some(rgb), Some(marking)) => ink.subtract(&marking_mask(rgb, marking)),
        _ => ink,
    }
}

/// Decode image bytes straight into an ink mask.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] or [`EngineError::ImageDecode`]
/// when the bytes cannot be decoded. A decodable image with no dark
/// pixels is not an error; it yields a blank mask.
pub fn decode_mask(bytes: &[u8], config: &MaskConfig) -> Result<BinaryMask, EngineError> {
    let decoded = grayscale::decode(bytes)?;
    let gray = decoded.to_luma8();
    let rgb = config.marking.as_ref().map(|_| decoded.to_rgb8());
    Ok(extract_ink(&gray, rgb.as_ref(), config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_rgb_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .ok();
        buf
    }

    #[test]
    fn threshold_is_inclusive_and_inverted() {
        let gray = GrayImage::from_fn(3, 1, |x, _| image::Luma([[0, 127, 128][x as usize]]));
        let mask = threshold_ink(&gray, 127);
        assert!(mask.is_ink(0, 0));
        assert!(mask.is_ink(1, 0), "value equal to threshold is ink");
        assert!(!mask.is_ink(2, 0));
    }

    #[test]
    fn hsv_of_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert!(h.abs() < 1e-3);
        assert_eq!((s, v), (255, 255));

        let (h, _, _) = rgb_to_hsv(0, 255, 0);
        assert!((h - 120.0).abs() < 1e-3, "green hue {h}");

        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 240.0).abs() < 1e-3, "blue hue {h}");

        let (h, _, _) = rgb_to_hsv(255, 0, 40);
        assert!(h > 340.0, "magenta-red hue {h} should wrap near 360");
    }

    #[test]
    fn gray_pixels_have_zero_saturation() {
        assert_eq!(rgb_to_hsv(90, 90, 90), (0.0, 0, 90));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0.0, 0, 0));
    }

    #[test]
    fn red_marking_detected_on_both_sides_of_wraparound() {
        let rgb = RgbImage::from_fn(4, 1, |x, _| {
            image::Rgb(match x {
                0 => [220, 20, 20],
                1 => [220, 20, 60],
                2 => [20, 20, 20],
                _ => [20, 200, 20],
            })
        });
        let mask = marking_mask(&rgb, &MarkingColor::red());
        assert!(mask.is_ink(0, 0));
        assert!(mask.is_ink(1, 0));
        assert!(!mask.is_ink(2, 0), "black ink is not a marking");
        assert!(!mask.is_ink(3, 0), "green is not red");
    }

    #[test]
    fn decode_mask_removes_red_guides_but_keeps_black_ink() {
        // White page, black vertical bar at x 4..8, red horizontal guide at y 10.
        let rgb = RgbImage::from_fn(20, 20, |x, y| {
            if (4..8).contains(&x) {
                image::Rgb([0, 0, 0])
            } else if y == 10 {
                image::Rgb([230, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let bytes = encode_rgb_png(&rgb);

        let mask = decode_mask(&bytes, &MaskConfig::default()).unwrap();
        assert_eq!(mask.ink_count(), 4 * 20);
        assert!(!mask.is_ink(12, 10), "red guide must be removed");

        let raw = decode_mask(
            &bytes,
            &MaskConfig {
                marking: None,
                ..MaskConfig::default()
            },
        )
        .unwrap();
        assert!(raw.is_ink(12, 10), "without marking removal red is dark enough to be ink");
    }

    #[test]
    fn decode_mask_propagates_decode_errors() {
        assert!(matches!(
            decode_mask(&[], &MaskConfig::default()),
            Err(EngineError::EmptyInput)
        ));
        assert!(matches!(
            decode_mask(b"not an image", &MaskConfig::default()),
            Err(EngineError::ImageDecode(_))
        ));
    }

    #[test]
    fn extract_ink_without_color_raster_is_plain_threshold() {
        let gray = GrayImage::from_fn(5, 5, |x, _| image::Luma([if x < 2 { 10 } else { 250 }]));
        let mask = extract_ink(&gray, None, &MaskConfig::default());
        assert_eq!(mask.ink_count(), 10);
    }
}
