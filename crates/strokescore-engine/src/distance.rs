//! Euclidean distance field.
//!
//! For every ink pixel, the distance to the nearest background pixel.
//! Doubled, this is the local stroke diameter, the engine's proxy for
//! brush pressure.
//!
//! Built on [`imageproc::distance_transform::euclidean_squared_distance_transform`],
//! which measures distance *to* nonzero pixels, so the mask is inverted
//! first. A one-pixel background border is added around the raster so
//! that ink touching the image edge still has a finite distance.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::types::{BinaryMask, Dimensions, PixelPoint, Point};

/// Per-pixel distance to the nearest background pixel.
///
/// Invariant: the value is `0.0` exactly on background pixels and at
/// least `1.0` on ink pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceField {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl DistanceField {
    /// Compute the exact Euclidean distance field of `mask`.
    #[must_use = "returns the distance field"]
    pub fn from_mask(mask: &BinaryMask) -> Self {
        let (width, height) = (mask.width(), mask.height());

        // Nonzero marks the pixels distances are measured *to*: every
        // background pixel plus the padding ring.
        let padded = GrayImage::from_fn(width + 2, height + 2, |x, y| {
            let inside = x >= 1 && y >= 1 && x <= width && y <= height;
            if inside && mask.is_ink(x - 1, y - 1) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let squared = imageproc::distance_transform::euclidean_squared_distance_transform(&padded);

        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(squared.get_pixel(x + 1, y + 1).0[0].sqrt());
            }
        }

        Self {
            width,
            height,
            values,
        }
    }

    /// Raster dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Distance at `(x, y)`; `0.0` outside the raster.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        if x < self.width && y < self.height {
            self.values[y as usize * self.width as usize + x as usize]
        } else {
            0.0
        }
    }

    /// Signed-coordinate lookup; `0.0` outside the raster.
    #[must_use]
    pub fn get_signed(&self, x: i64, y: i64) -> f64 {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.get(x, y),
            _ => 0.0,
        }
    }

    /// Distance at the pixel nearest to a sub-pixel point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(&self, p: Point) -> f64 {
        self.get_signed(p.x.round() as i64, p.y.round() as i64)
    }

    /// Local stroke diameter (twice the distance) at a pixel.
    #[must_use]
    pub fn thickness_at(&self, p: PixelPoint) -> f64 {
        2.0 * self.get(p.x, p.y)
    }

    /// Largest distance in the field, `0.0` for a blank mask.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Raw row-major values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
