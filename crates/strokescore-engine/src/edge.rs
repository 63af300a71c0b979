//! Canny edge detection on ink masks.
//!
//! Wraps [`imageproc::edges::canny`]. Applied to a 0/255 mask, the
//! result traces the stroke outline; the center-tip analyzer and the
//! stroke-match shape metric both consume it.

use image::GrayImage;

use crate::types::{BinaryMask, Point};

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero turns every pixel with any gradient into a
/// candidate edge.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge. Both
/// thresholds are clamped to at least [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Outline of the ink in `mask` as a mask of edge pixels.
#[must_use = "returns the edge mask"]
pub fn mask_edges(mask: &BinaryMask, low_threshold: f32, high_threshold: f32) -> BinaryMask {
    BinaryMask::from_nonzero(&canny(mask.as_image(), low_threshold, high_threshold))
}

/// Edge pixels inside the half-open window `[cx − r, cx + r) × [cy − r, cy + r)`,
/// clipped to the raster, in raster order.
#[must_use]
pub fn edge_points_near(edges: &BinaryMask, cx: u32, cy: u32, radius: u32) -> Vec<Point> {
    let x0 = cx.saturating_sub(radius);
    let y0 = cy.saturating_sub(radius);
    let x1 = cx.saturating_add(radius).min(edges.width());
    let y1 = cy.saturating_add(radius).min(edges.height());

    let mut points = Vec::new();
    for y in y0..y1 {
        for x in x0..x1 {
            if edges.is_ink(x, y) {
                points.push(Point::new(f64::from(x), f64::from(y)));
            }
        }
    }
    points
}
