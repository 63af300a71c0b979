//! Shared types for the stroke analysis engine.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can build masks from
/// rasters without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` for callers that supply a color raster for
/// marking removal.
pub use image::RgbImage;

/// A 2D point in image coordinates (x to the right, y downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl From<PixelPoint> for Point {
    fn from(p: PixelPoint) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// An integer pixel coordinate.
///
/// Ordering is raster order: by row (`y`) first, then column (`x`).
/// Skeleton traversal relies on this to pick canonical start pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl PixelPoint {
    /// Create a new pixel coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl Ord for PixelPoint {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for PixelPoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Offsets of the 8-connected neighborhood, clockwise from north.
pub(crate) const NEIGHBORS_8: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// A binary ink mask: foreground (ink) pixels are stored as 255,
/// background (paper) as 0.
///
/// Every downstream analysis consumes the mask read-only. Coordinates
/// outside the raster are treated as background.
///
/// Serialized as a `(width, height, raw_bytes)` tuple since
/// `image::ImageBuffer` does not implement serde traits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Pixel value stored for ink.
    pub const INK: u8 = 255;

    /// Create an all-background mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Build a mask by evaluating `is_ink` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut is_ink: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if is_ink(x, y) { Self::INK } else { 0 }])
        }))
    }

    /// Wrap a grayscale image, treating every nonzero pixel as ink.
    #[must_use]
    pub fn from_nonzero(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y).0[0] != 0
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Raster dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Whether the pixel at `(x, y)` is ink. Out-of-range coordinates
    /// are background.
    #[must_use]
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel_checked(x, y).is_some_and(|p| p.0[0] != 0)
    }

    /// Signed-coordinate variant of [`is_ink`](Self::is_ink) for
    /// neighborhood probing.
    #[must_use]
    pub fn is_ink_signed(&self, x: i64, y: i64) -> bool {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.is_ink(x, y),
            _ => false,
        }
    }

    /// Set or clear a pixel. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        if x < self.width() && y < self.height() {
            self.0.put_pixel(x, y, image::Luma([if ink { Self::INK } else { 0 }]));
        }
    }

    /// Number of ink pixels.
    #[must_use]
    pub fn ink_count(&self) -> usize {
        self.0.pixels().filter(|p| p.0[0] != 0).count()
    }

    /// Returns `true` if the mask contains no ink at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.pixels().all(|p| p.0[0] == 0)
    }

    /// Ink pixel coordinates in raster order.
    pub fn ink_pixels(&self) -> impl Iterator<Item = PixelPoint> + '_ {
        self.0
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] != 0)
            .map(|(x, y, _)| PixelPoint::new(x, y))
    }

    /// Pixels that are ink in `self` but not in `other`.
    ///
    /// Masks of different size are compared over the overlapping area;
    /// the result has the dimensions of `self`.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        Self::from_fn(self.width(), self.height(), |x, y| {
            self.is_ink(x, y) && !other.is_ink(x, y)
        })
    }

    /// Borrow the underlying 0/255 raster.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the mask and return the underlying 0/255 raster.
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.0
    }
}

impl Serialize for BinaryMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.width(), self.height(), self.0.as_raw()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BinaryMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (width, height, raw) = <(u32, u32, Vec<u8>)>::deserialize(deserializer)?;
        let image = GrayImage::from_raw(width, height, raw)
            .ok_or_else(|| serde::de::Error::custom("invalid mask dimensions"))?;
        Ok(Self::from_nonzero(&image))
    }
}

/// Errors the engine escalates to the caller.
///
/// Geometric degeneracies (blank masks, empty skeletons, tiny strokes)
/// are never errors; they produce empty or neutral results instead.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Reference and user masks must share a coordinate frame.
    #[error("mask dimensions differ: reference {reference}, user {user}")]
    DimensionMismatch {
        /// Dimensions of the reference mask.
        reference: Dimensions,
        /// Dimensions of the user mask.
        user: Dimensions,
    },

    /// Analysis configuration is invalid.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

/// Serde-compatible proxy for `EngineError`.
///
/// A deserialized `ImageDecode` cannot reconstruct the typed
/// `image::ImageError`, so it comes back as `InvalidConfig` carrying
/// the original message.
#[derive(Serialize, Deserialize)]
enum EngineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    DimensionMismatch {
        reference: Dimensions,
        user: Dimensions,
    },
    InvalidConfig(String),
}

impl Serialize for EngineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => EngineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => EngineErrorProxy::EmptyInput,
            Self::DimensionMismatch { reference, user } => EngineErrorProxy::DimensionMismatch {
                reference: *reference,
                user: *user,
            },
            Self::InvalidConfig(s) => EngineErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EngineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = EngineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            EngineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            EngineErrorProxy::EmptyInput => Self::EmptyInput,
            EngineErrorProxy::DimensionMismatch { reference, user } => {
                Self::DimensionMismatch { reference, user }
            }
            EngineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
