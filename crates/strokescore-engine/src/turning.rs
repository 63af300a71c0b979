//! Turning-point detection.
//!
//! At each index `i` of an ordered path, the incoming chord
//! `P[i] − P[i−W]` and the outgoing chord `P[i+W] − P[i]` are compared;
//! the angle between them is the deflection. A single sharp bend raises
//! the deflection above the threshold at every index within `W` samples
//! of the bend, so consecutive above-threshold indices are grouped into a
//! run and only the run's peak is reported.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::TurningConfig;
use crate::distance::DistanceField;
use crate::skeleton::Skeleton;
use crate::types::{PixelPoint, Point};

/// Guards the cosine denominator against zero-length chords.
const EPSILON: f64 = 1e-6;

/// Deflection measured at one path index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deflection {
    /// Index along the path.
    pub index: usize,
    /// Angle between incoming and outgoing chords, degrees in `[0, 180]`.
    pub angle_degrees: f64,
    /// Direction of the incoming chord, `atan2(dy, dx)` in degrees
    /// (image coordinates, y down).
    pub incoming_direction_degrees: f64,
    /// Direction of the outgoing chord.
    pub outgoing_direction_degrees: f64,
}

/// A sharp change of direction along a skeleton path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurningPoint {
    /// Skeleton pixel at the peak of the bend.
    pub position: PixelPoint,
    /// Index into [`Skeleton::paths`].
    pub path_index: usize,
    /// Index along that path.
    pub index: usize,
    /// Deflection angle in degrees.
    pub angle_degrees: f64,
    /// Local stroke thickness at the turn, used as a pressure proxy.
    pub estimated_pressure: f64,
    /// Direction of travel into the turn, degrees.
    pub incoming_direction_degrees: f64,
    /// Direction of travel out of the turn, degrees.
    pub outgoing_direction_degrees: f64,
}

/// Deflection at index `i`, or `None` when the window does not fit.
#[must_use]
pub fn deflection_at(points: &[Point], i: usize, window: usize) -> Option<Deflection> {
    if window == 0 || i < window || i + window >= points.len() {
        return None;
    }
    let (prev, here, next) = (points[i - window], points[i], points[i + window]);
    let (v1x, v1y) = (here.x - prev.x, here.y - prev.y);
    let (v2x, v2y) = (next.x - here.x, next.y - here.y);

    let norms = v1x.hypot(v1y) * v2x.hypot(v2y) + EPSILON;
    let cosine = (v1x.mul_add(v2x, v1y * v2y) / norms).clamp(-1.0, 1.0);

    Some(Deflection {
        index: i,
        angle_degrees: cosine.acos().to_degrees(),
        incoming_direction_degrees: v1y.atan2(v1x).to_degrees(),
        outgoing_direction_degrees: v2y.atan2(v2x).to_degrees(),
    })
}

/// Peak deflections above `threshold_degrees` along one path.
///
/// Runs of consecutive above-threshold indices collapse to their
/// maximum (the earliest index wins ties). Paths with `2 · window` or
/// fewer points have no interior index and yield nothing.
#[must_use]
pub fn detect_deflections(points: &[Point], window: usize, threshold_degrees: f64) -> Vec<Deflection> {
    let mut peaks = Vec::new();
    let mut run: Option<Deflection> = None;

    for i in 0..points.len() {
        match deflection_at(points, i, window) {
            Some(d) if d.angle_degrees > threshold_degrees => {
                run = Some(match run {
                    Some(best) if best.angle_degrees >= d.angle_degrees => best,
                    _ => d,
                });
            }
            _ => {
                if let Some(best) = run.take() {
                    peaks.push(best);
                }
            }
        }
    }
    if let Some(best) = run {
        peaks.push(best);
    }
    peaks
}

/// Detect turning points on every skeleton path.
#[must_use = "returns the detected turning points"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(paths = skeleton.paths().len()))
)]
pub fn detect_turning_points(
    skeleton: &Skeleton,
    field: &DistanceField,
    config: &TurningConfig,
) -> Vec<TurningPoint> {
    skeleton
        .paths()
        .iter()
        .enumerate()
        .flat_map(|(path_index, path)| {
            detect_deflections(&path.to_points(), config.window, config.threshold_degrees)
                .into_iter()
                .map(move |d| {
                    let position = path.points[d.index];
                    TurningPoint {
                        position,
                        path_index,
                        index: d.index,
                        angle_degrees: d.angle_degrees,
                        estimated_pressure: field.thickness_at(position),
                        incoming_direction_degrees: d.incoming_direction_degrees,
                        outgoing_direction_degrees: d.outgoing_direction_degrees,
                    }
                })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SkeletonConfig;
    use crate::types::BinaryMask;

    /// Straight run along +x to index 10, then ten unit steps at
    /// `degrees` from the x axis.
    fn bent_path(degrees: f64) -> Vec<Point> {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut pts: Vec<Point> = (0..=10).map(|i| Point::new(f64::from(i), 0.0)).collect();
        for k in 1..=10 {
            let k = f64::from(k);
            pts.push(Point::new(10.0 + k * cos, k * sin));
        }
        pts
    }

    #[test]
    fn just_above_threshold_is_a_turn_at_the_bend() {
        let turns = detect_deflections(&bent_path(30.001), 5, 30.0);
        assert_eq!(turns.len(), 1, "{turns:?}");
        assert_eq!(turns[0].index, 10);
        assert!((turns[0].angle_degrees - 30.001).abs() < 1e-4);
    }

    #[test]
    fn just_below_threshold_is_not_a_turn() {
        assert!(detect_deflections(&bent_path(29.999), 5, 30.0).is_empty());
    }

    #[test]
    fn straight_line_has_no_turns() {
        let pts: Vec<Point> = (0..50).map(|i| Point::new(3.0, f64::from(i))).collect();
        assert!(detect_deflections(&pts, 5, 30.0).is_empty());
    }

    #[test]
    fn short_paths_have_no_interior_index() {
        let pts: Vec<Point> = (0..10).map(|i| Point::new(f64::from(i), 0.0)).collect();
        assert!(deflection_at(&pts, 5, 5).is_none());
        assert!(detect_deflections(&pts, 5, 0.0).is_empty());
    }

    #[test]
    fn directions_follow_image_coordinates() {
        // Right along +x, then straight down (+y).
        let mut pts: Vec<Point> = (0..=5).map(|i| Point::new(f64::from(i), 0.0)).collect();
        pts.extend((1..=5).map(|k| Point::new(5.0, f64::from(k))));
        let d = deflection_at(&pts, 5, 5).unwrap();
        assert!((d.angle_degrees - 90.0).abs() < 1e-4);
        assert!(d.incoming_direction_degrees.abs() < 1e-9);
        assert!((d.outgoing_direction_degrees - 90.0).abs() < 1e-9);
    }

    #[test]
    fn reversal_is_one_eighty() {
        let mut pts: Vec<Point> = (0..=5).map(|i| Point::new(f64::from(i), 0.0)).collect();
        pts.extend((1..=5).map(|k| Point::new(5.0 - f64::from(k), 0.0)));
        let d = deflection_at(&pts, 5, 5).unwrap();
        assert!((d.angle_degrees - 180.0).abs() < 0.05, "{}", d.angle_degrees);
    }

    #[test]
    fn two_separate_bends_give_two_turns() {
        // Zigzag: right 15, down 15, right 15.
        let mut pts: Vec<Point> = (0..=15).map(|i| Point::new(f64::from(i), 0.0)).collect();
        pts.extend((1..=15).map(|k| Point::new(15.0, f64::from(k))));
        pts.extend((1..=15).map(|k| Point::new(15.0 + f64::from(k), 15.0)));
        let turns = detect_deflections(&pts, 5, 30.0);
        assert_eq!(turns.iter().map(|t| t.index).collect::<Vec<_>>(), vec![15, 30]);
    }

    #[test]
    fn l_shaped_stroke_has_one_right_angle_turn() {
        let mask = BinaryMask::from_fn(60, 60, |x, y| {
            ((10..20).contains(&x) && (10..50).contains(&y))
                || ((10..50).contains(&x) && (40..50).contains(&y))
        });
        let skeleton = Skeleton::from_mask(&mask, &SkeletonConfig::default());
        let field = DistanceField::from_mask(&mask);
        let turns = detect_turning_points(&skeleton, &field, &TurningConfig::default());

        assert_eq!(turns.len(), 1, "{turns:?}");
        let turn = turns[0];
        assert!((70.0..=110.0).contains(&turn.angle_degrees), "{}", turn.angle_degrees);
        assert!(turn.position.x.abs_diff(14) <= 3 && turn.position.y.abs_diff(44) <= 3);
        assert!(turn.estimated_pressure > 0.0);
        assert_eq!(turn.path_index, 0);
    }
}
