//! Whole-character shape similarity between two aligned masks.
//!
//! All metrics are percentages in `[0, 100]` and treat the first mask
//! as the reference. When both masks lack the feature a metric looks at
//! (no ink, no outline), the metric reports full agreement.

use rstar::RTree;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ComparisonConfig;
use crate::edge;
use crate::skeleton::Skeleton;
use crate::types::{BinaryMask, Point};

/// Distances between two skeletons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkeletonProximity {
    /// Largest distance from a pixel of either skeleton to the nearest
    /// pixel of the other.
    pub hausdorff_distance: f64,
    /// Mean of the two directed average nearest-pixel distances.
    pub average_distance: f64,
    /// `max(0, 100 · (1 − hausdorff / diagonal))`.
    pub similarity: f64,
}

/// Shape agreement between a reference and a user mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeSimilarity {
    /// Intersection over union of ink, percent.
    pub overlap: f64,
    /// Smaller ink area over larger, percent.
    pub size_match: f64,
    /// Ink centroid agreement relative to the raster diagonal, percent.
    pub position_accuracy: f64,
    /// Share of reference outline pixels also on the user outline, percent.
    pub stroke_match: f64,
    /// Quadrant-by-quadrant ink agreement, percent.
    pub balance: f64,
    /// Skeleton distances; `None` when either skeleton is empty.
    pub skeleton: Option<SkeletonProximity>,
}

fn diagonal(mask: &BinaryMask) -> f64 {
    f64::from(mask.width()).hypot(f64::from(mask.height()))
}

/// Mean position of the ink, `None` for a blank mask.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ink_centroid(mask: &BinaryMask) -> Option<Point> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0_usize);
    for p in mask.ink_pixels() {
        sx += f64::from(p.x);
        sy += f64::from(p.y);
        n += 1;
    }
    (n > 0).then(|| Point::new(sx / n as f64, sy / n as f64))
}

/// Intersection over union of the ink, percent.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overlap(reference: &BinaryMask, user: &BinaryMask) -> f64 {
    let (mut intersection, mut union) = (0_usize, 0_usize);
    for y in 0..reference.height().max(user.height()) {
        for x in 0..reference.width().max(user.width()) {
            let (r, u) = (reference.is_ink(x, y), user.is_ink(x, y));
            intersection += usize::from(r && u);
            union += usize::from(r || u);
        }
    }
    if union == 0 {
        100.0
    } else {
        100.0 * intersection as f64 / union as f64
    }
}

/// Smaller ink area over larger, percent.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn size_match(reference: &BinaryMask, user: &BinaryMask) -> f64 {
    let (a, b) = (reference.ink_count(), user.ink_count());
    match a.max(b) {
        0 => 100.0,
        larger => 100.0 * a.min(b) as f64 / larger as f64,
    }
}

/// `100 · (1 − centroid distance / diagonal)`, percent.
#[must_use]
pub fn position_accuracy(reference: &BinaryMask, user: &BinaryMask) -> f64 {
    match (ink_centroid(reference), ink_centroid(user)) {
        (None, None) => 100.0,
        (Some(a), Some(b)) => (100.0 * (1.0 - a.distance(b) / diagonal(reference))).max(0.0),
        _ => 0.0,
    }
}

/// Share of the reference outline also present in the user outline.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn stroke_match(reference: &BinaryMask, user: &BinaryMask, config: &ComparisonConfig) -> f64 {
    let ref_edges = edge::mask_edges(reference, config.canny_low, config.canny_high);
    let user_edges = edge::mask_edges(user, config.canny_low, config.canny_high);
    let total = ref_edges.ink_count();
    if total == 0 {
        return if user_edges.is_blank() { 100.0 } else { 0.0 };
    }
    let matched = ref_edges
        .ink_pixels()
        .filter(|p| user_edges.is_ink(p.x, p.y))
        .count();
    100.0 * matched as f64 / total as f64
}

fn quadrant_counts(mask: &BinaryMask) -> [usize; 4] {
    let (mid_x, mid_y) = (mask.width() / 2, mask.height() / 2);
    let mut counts = [0; 4];
    for p in mask.ink_pixels() {
        let q = usize::from(p.x >= mid_x) + 2 * usize::from(p.y >= mid_y);
        counts[q] += 1;
    }
    counts
}

/// Quadrant ink agreement, percent.
///
/// The raster is split at half its width and height. For each quadrant
/// the relative difference `|u − r| / r` is taken (a quadrant empty in
/// the reference contributes 0 if also empty in the user, else 1) and
/// the score is `max(0, 100 · (1 − mean difference))`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn quadrant_balance(reference: &BinaryMask, user: &BinaryMask) -> f64 {
    let (r, u) = (quadrant_counts(reference), quadrant_counts(user));
    let total: f64 = r
        .iter()
        .zip(&u)
        .map(|(&r, &u)| match (r, u) {
            (0, 0) => 0.0,
            (0, _) => 1.0,
            _ => r.abs_diff(u) as f64 / r as f64,
        })
        .sum();
    (100.0 * (1.0 - total / 4.0)).max(0.0)
}

fn directed_distances(from: &[[f64; 2]], to: &RTree<[f64; 2]>) -> Vec<f64> {
    from.iter()
        .filter_map(|p| {
            to.nearest_neighbor(p)
                .map(|q| (p[0] - q[0]).hypot(p[1] - q[1]))
        })
        .collect()
}

/// Hausdorff-based skeleton proximity, normalized by the diagonal of a
/// `width × height` raster. `None` when either skeleton is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn skeleton_proximity(
    reference: &Skeleton,
    user: &Skeleton,
    width: u32,
    height: u32,
) -> Option<SkeletonProximity> {
    let to_coords = |s: &Skeleton| -> Vec<[f64; 2]> {
        s.ordered_points()
            .map(|p| [f64::from(p.x), f64::from(p.y)])
            .collect()
    };
    let (a, b) = (to_coords(reference), to_coords(user));
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let forward = directed_distances(&a, &RTree::bulk_load(b.clone()));
    let backward = directed_distances(&b, &RTree::bulk_load(a));

    let max = |d: &[f64]| d.iter().copied().fold(0.0, f64::max);
    let mean = |d: &[f64]| d.iter().sum::<f64>() / d.len() as f64;

    let hausdorff = max(&forward).max(max(&backward));
    let diagonal = f64::from(width).hypot(f64::from(height));
    Some(SkeletonProximity {
        hausdorff_distance: hausdorff,
        average_distance: f64::midpoint(mean(&forward), mean(&backward)),
        similarity: if diagonal > 0.0 {
            (100.0 * (1.0 - hausdorff / diagonal)).max(0.0)
        } else {
            0.0
        },
    })
}

/// Compute every shape metric.
#[must_use = "returns the shape similarity"]
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn shape_similarity(
    reference: &BinaryMask,
    user: &BinaryMask,
    reference_skeleton: &Skeleton,
    user_skeleton: &Skeleton,
    config: &ComparisonConfig,
) -> ShapeSimilarity {
    ShapeSimilarity {
        overlap: overlap(reference, user),
        size_match: size_match(reference, user),
        position_accuracy: position_accuracy(reference, user),
        stroke_match: stroke_match(reference, user, config),
        balance: quadrant_balance(reference, user),
        skeleton: skeleton_proximity(
            reference_skeleton,
            user_skeleton,
            reference.width(),
            reference.height(),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SkeletonConfig;

    fn square(x0: u32, y0: u32, side: u32) -> BinaryMask {
        BinaryMask::from_fn(100, 100, |x, y| {
            (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y)
        })
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_masks_agree_fully() {
        let mask = square(20, 30, 40);
        let skeleton = Skeleton::from_mask(&mask, &SkeletonConfig::default());
        let shape = shape_similarity(&mask, &mask, &skeleton, &skeleton, &ComparisonConfig::default());
        assert!(close(shape.overlap, 100.0));
        assert!(close(shape.size_match, 100.0));
        assert!(close(shape.position_accuracy, 100.0));
        assert!(close(shape.stroke_match, 100.0));
        assert!(close(shape.balance, 100.0));
        let skel = shape.skeleton.unwrap();
        assert!(close(skel.hausdorff_distance, 0.0));
        assert!(close(skel.similarity, 100.0));
    }

    #[test]
    fn half_overlapping_squares() {
        let a = square(10, 10, 20);
        let b = square(20, 10, 20);
        // Intersection 10×20, union 30×20.
        assert!(close(overlap(&a, &b), 100.0 / 3.0));
        assert!(close(size_match(&a, &b), 100.0));
        let expected = 100.0 * (1.0 - 10.0 / 100.0_f64.hypot(100.0));
        assert!(close(position_accuracy(&a, &b), expected));
    }

    #[test]
    fn size_match_is_area_ratio() {
        assert!(close(size_match(&square(0, 0, 10), &square(0, 0, 20)), 25.0));
    }

    #[test]
    fn blank_masks_agree_and_one_blank_does_not() {
        let blank = BinaryMask::new(100, 100);
        let ink = square(0, 0, 10);
        assert!(close(overlap(&blank, &blank), 100.0));
        assert!(close(position_accuracy(&blank, &blank), 100.0));
        assert!(close(position_accuracy(&blank, &ink), 0.0));
        assert!(close(overlap(&blank, &ink), 0.0));
        assert!(close(size_match(&blank, &ink), 0.0));
    }

    #[test]
    fn ink_in_the_wrong_quadrant_loses_balance() {
        let reference = square(10, 10, 20);
        let user = square(60, 60, 20);
        // Reference quadrant 0 is empty in the user (diff 1); user's
        // quadrant 3 is empty in the reference (diff 1).
        assert!(close(quadrant_balance(&reference, &user), 50.0));
        assert!(close(quadrant_balance(&reference, &reference), 100.0));
    }

    #[test]
    fn shifted_skeleton_hausdorff_is_the_shift() {
        let line = |x: u32| {
            Skeleton::from_grid(BinaryMask::from_fn(100, 100, move |px, py| {
                px == x && (10..90).contains(&py)
            }))
        };
        let prox = skeleton_proximity(&line(20), &line(26), 100, 100).unwrap();
        assert!(close(prox.hausdorff_distance, 6.0));
        assert!(close(prox.average_distance, 6.0));
        assert!(prox.similarity < 100.0 && prox.similarity > 90.0);
    }

    #[test]
    fn empty_skeleton_has_no_proximity() {
        let empty = Skeleton::from_grid(BinaryMask::new(10, 10));
        let dot = Skeleton::from_grid(BinaryMask::from_fn(10, 10, |x, y| x == 5 && y == 5));
        assert!(skeleton_proximity(&empty, &dot, 10, 10).is_none());
    }

    #[test]
    fn symmetric_metrics_ignore_argument_order() {
        let a = square(10, 10, 30);
        let b = square(25, 40, 20);
        assert!(close(overlap(&a, &b), overlap(&b, &a)));
        assert!(close(size_match(&a, &b), size_match(&b, &a)));
        assert!(close(position_accuracy(&a, &b), position_accuracy(&b, &a)));
    }
}
