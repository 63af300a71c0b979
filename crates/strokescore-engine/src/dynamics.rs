//! Brush motion reconstructed from the skeleton.
//!
//! A static raster carries no timing, so motion is approximated along
//! each canonical path: the chord from sample `i` to sample `i + window`
//! gives a direction and a length, the length standing in for brush
//! speed. Strict local extrema of thickness mark where the brush pressed
//! down or lifted, and path start points give a conventional
//! stroke-order estimate (top to bottom, left to right, horizontal
//! before vertical).

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::DynamicsConfig;
use crate::distance::DistanceField;
use crate::skeleton::{Skeleton, SkeletonPath};
use crate::types::{PixelPoint, Point};

/// Weight of the start row in the stroke-order key.
const ORDER_ROW_WEIGHT: i64 = 100;
/// Weight of the start column in the stroke-order key.
const ORDER_COLUMN_WEIGHT: i64 = 10;
/// Key bonus that moves horizontal strokes ahead of vertical ones.
const ORDER_HORIZONTAL_BONUS: i64 = 50;

/// Direction and speed of the brush at one path sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Chord start.
    pub position: PixelPoint,
    /// Index into [`Skeleton::paths`].
    pub path_index: usize,
    /// Index of `position` within the path.
    pub index: usize,
    /// `atan2(dy, dx)` of the chord in degrees, `(-180, 180]`, y down.
    pub direction_degrees: f64,
    /// Chord length in pixels.
    pub speed: f64,
}

/// Start, end and pressure extrema of one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFeatures {
    /// Index into [`Skeleton::paths`].
    pub path_index: usize,
    /// First pixel in traversal order.
    pub start: PixelPoint,
    /// Last pixel in traversal order.
    pub end: PixelPoint,
    /// Arc length in pixels.
    pub length: f64,
    /// Pixels thicker than both neighbors along the path.
    pub pressure_peaks: Vec<PixelPoint>,
    /// Pixels thinner than both neighbors along the path.
    pub pressure_valleys: Vec<PixelPoint>,
}

/// Motion, features and stroke order of a whole skeleton.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrushDynamics {
    /// Motion samples, path by path in traversal order.
    pub motion: Vec<MotionSample>,
    /// One entry per non-empty path.
    pub features: Vec<PathFeatures>,
    /// Path indices in estimated writing order.
    pub stroke_order: Vec<usize>,
}

/// Motion samples along one path.
///
/// A path with `window` or fewer pixels has no complete chord and
/// yields nothing.
#[must_use]
pub fn motion_along(path: &SkeletonPath, path_index: usize, window: usize) -> Vec<MotionSample> {
    if window == 0 || path.len() <= window {
        return Vec::new();
    }
    path.points
        .iter()
        .zip(&path.points[window..])
        .enumerate()
        .map(|(index, (&from, &to))| {
            let (a, b) = (Point::from(from), Point::from(to));
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            MotionSample {
                position: from,
                path_index,
                index,
                direction_degrees: dy.atan2(dx).to_degrees(),
                speed: dx.hypot(dy),
            }
        })
        .collect()
}

/// Indices of strict interior maxima and minima.
fn extrema(values: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut peaks = Vec::new();
    let mut valleys = Vec::new();
    for (i, w) in values.windows(3).enumerate() {
        if w[1] > w[0] && w[1] > w[2] {
            peaks.push(i + 1);
        } else if w[1] < w[0] && w[1] < w[2] {
            valleys.push(i + 1);
        }
    }
    (peaks, valleys)
}

/// Start, end, length and thickness extrema of one path; `None` for an
/// empty path.
#[must_use]
pub fn path_features(path: &SkeletonPath, path_index: usize, field: &DistanceField) -> Option<PathFeatures> {
    let (&start, &end) = (path.points.first()?, path.points.last()?);
    let thickness: Vec<f64> = path.points.iter().map(|&p| field.thickness_at(p)).collect();
    let (peaks, valleys) = extrema(&thickness);
    Some(PathFeatures {
        path_index,
        start,
        end,
        length: path.arc_length(),
        pressure_peaks: peaks.into_iter().map(|i| path.points[i]).collect(),
        pressure_valleys: valleys.into_iter().map(|i| path.points[i]).collect(),
    })
}

/// Estimate writing order from path geometry.
///
/// Each path gets the key `100·start_y + 10·start_x`, minus 50 when it
/// runs more across than down; paths are listed by ascending key, ties
/// in traversal order.
#[must_use]
pub fn estimate_stroke_order(paths: &[SkeletonPath]) -> Vec<usize> {
    let mut keyed: Vec<(i64, usize)> = paths
        .iter()
        .enumerate()
        .filter_map(|(i, path)| {
            let (start, end) = (path.points.first()?, path.points.last()?);
            let horizontal = start.x.abs_diff(end.x) > start.y.abs_diff(end.y);
            let key = i64::from(start.y) * ORDER_ROW_WEIGHT + i64::from(start.x) * ORDER_COLUMN_WEIGHT
                - if horizontal { ORDER_HORIZONTAL_BONUS } else { 0 };
            Some((key, i))
        })
        .collect();
    keyed.sort_by_key(|&(key, _)| key);
    keyed.into_iter().map(|(_, i)| i).collect()
}

/// Motion, features and stroke order for every skeleton path.
#[must_use = "returns the brush dynamics"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(paths = skeleton.paths().len()))
)]
pub fn analyze_dynamics(
    skeleton: &Skeleton,
    field: &DistanceField,
    config: &DynamicsConfig,
) -> BrushDynamics {
    let paths = skeleton.paths();
    let motion = paths
        .iter()
        .enumerate()
        .flat_map(|(i, path)| motion_along(path, i, config.window))
        .collect();
    let features = paths
        .iter()
        .enumerate()
        .filter_map(|(i, path)| path_features(path, i, field))
        .collect();

    BrushDynamics {
        motion,
        features,
        stroke_order: estimate_stroke_order(paths),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::BinaryMask;

    fn path(points: &[(u32, u32)]) -> SkeletonPath {
        SkeletonPath {
            component: 0,
            points: points.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect(),
        }
    }

    fn column(x: u32, ys: std::ops::Range<u32>) -> SkeletonPath {
        path(&ys.map(|y| (x, y)).collect::<Vec<_>>())
    }

    #[test]
    fn straight_path_moves_at_constant_speed() {
        let samples = motion_along(&column(4, 0..20), 0, 5);
        assert_eq!(samples.len(), 15);
        for s in &samples {
            assert!((s.direction_degrees - 90.0).abs() < 1e-9);
            assert!((s.speed - 5.0).abs() < 1e-9);
        }
        assert_eq!(samples[3].position, PixelPoint::new(4, 3));
        assert_eq!(samples[3].index, 3);
    }

    #[test]
    fn diagonal_chords_are_longer() {
        let diagonal = path(&(0..10).map(|i| (i, i)).collect::<Vec<_>>());
        let samples = motion_along(&diagonal, 2, 5);
        assert_eq!(samples.len(), 5);
        assert!((samples[0].speed - 5.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!((samples[0].direction_degrees - 45.0).abs() < 1e-9);
        assert_eq!(samples[0].path_index, 2);
    }

    #[test]
    fn leftward_motion_points_backward() {
        let leftward = path(&(0..8).rev().map(|x| (x, 3)).collect::<Vec<_>>());
        let samples = motion_along(&leftward, 0, 5);
        assert!((samples[0].direction_degrees - 180.0).abs() < 1e-9);
    }

    #[test]
    fn short_paths_have_no_motion() {
        assert!(motion_along(&column(0, 0..5), 0, 5).is_empty());
        assert!(motion_along(&column(0, 0..6), 0, 5).len() == 1);
    }

    #[test]
    fn extrema_are_strict() {
        let (peaks, valleys) = extrema(&[1.0, 3.0, 2.0, 2.0, 0.5, 4.0, 4.0]);
        assert_eq!(peaks, vec![1]);
        assert_eq!(valleys, vec![4]);
        assert_eq!(extrema(&[1.0, 2.0]), (vec![], vec![]));
    }

    #[test]
    fn features_of_a_uniform_bar() {
        let mask =
            BinaryMask::from_fn(40, 80, |x, y| (15..25).contains(&x) && (10..70).contains(&y));
        let field = DistanceField::from_mask(&mask);
        let features = path_features(&column(19, 20..60), 0, &field).unwrap();
        assert_eq!(features.start, PixelPoint::new(19, 20));
        assert_eq!(features.end, PixelPoint::new(19, 59));
        assert!((features.length - 39.0).abs() < 1e-9);
        assert!(features.pressure_peaks.is_empty());
        assert!(features.pressure_valleys.is_empty());
    }

    #[test]
    fn empty_path_has_no_features() {
        let field = DistanceField::from_mask(&BinaryMask::new(4, 4));
        assert!(path_features(&path(&[]), 0, &field).is_none());
    }

    #[test]
    fn horizontal_strokes_come_first_on_the_same_row() {
        let vertical = column(10, 10..40);
        let horizontal = path(&(12..40).map(|x| (x, 10)).collect::<Vec<_>>());
        let lower = path(&(5..40).map(|x| (x, 30)).collect::<Vec<_>>());
        // Keys: vertical 1100, horizontal 1070, lower 3000.
        assert_eq!(estimate_stroke_order(&[vertical, lower, horizontal]), vec![2, 0, 1]);
    }

    #[test]
    fn upper_strokes_come_before_lower_ones() {
        let order = estimate_stroke_order(&[column(5, 50..90), column(30, 5..40)]);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn dynamics_of_an_l_skeleton() {
        let grid = BinaryMask::from_fn(40, 40, |x, y| {
            (x == 5 && (5..30).contains(&y)) || (y == 29 && (5..30).contains(&x))
        });
        let skeleton = Skeleton::from_grid(grid.clone());
        let field = DistanceField::from_mask(&grid);
        let dynamics = analyze_dynamics(&skeleton, &field, &DynamicsConfig::default());
        assert_eq!(dynamics.features.len(), skeleton.paths().len());
        assert_eq!(dynamics.stroke_order.len(), skeleton.paths().len());
        assert!(!dynamics.motion.is_empty());
        let longest_chord = 5.0 * 2f64.sqrt();
        assert!(dynamics.motion.iter().all(|s| s.speed > 0.0 && s.speed <= longest_chord));
    }

    #[test]
    fn blank_skeleton_has_no_dynamics() {
        let grid = BinaryMask::new(10, 10);
        let dynamics = analyze_dynamics(
            &Skeleton::from_grid(grid.clone()),
            &DistanceField::from_mask(&grid),
            &DynamicsConfig::default(),
        );
        assert_eq!(dynamics, BrushDynamics::default());
    }
}
