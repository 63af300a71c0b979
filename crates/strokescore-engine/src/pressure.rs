//! Point-by-point brush pressure and speed comparison.
//!
//! Stroke thickness at a skeleton pixel stands in for brush pressure and
//! the chord length of a [`MotionSample`] for brush speed. Every user
//! sample is matched to the nearest reference sample (within a radius)
//! and the relative difference is classified. Non-good samples of both
//! kinds are merged into a severity-ranked problem-area list.

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ComparisonConfig;
use crate::distance::DistanceField;
use crate::dynamics::MotionSample;
use crate::skeleton::Skeleton;
use crate::types::PixelPoint;

/// How the user's pressure compares with the reference at one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureStatus {
    /// Within the good band.
    Good,
    /// Heavier than the good band but not strongly.
    SlightlyHeavy,
    /// Lighter than the good band but not strongly.
    SlightlyLight,
    /// Much heavier than the reference.
    TooHeavy,
    /// Much lighter than the reference.
    TooLight,
}

/// Position of a signed percentage difference relative to two bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Good,
    SlightlyAbove,
    SlightlyBelow,
    StronglyAbove,
    StronglyBelow,
}

impl Band {
    fn of(diff_percent: f64, good: f64, strong: f64) -> Self {
        if diff_percent.abs() < good {
            Self::Good
        } else if diff_percent > strong {
            Self::StronglyAbove
        } else if diff_percent < -strong {
            Self::StronglyBelow
        } else if diff_percent > good {
            Self::SlightlyAbove
        } else {
            Self::SlightlyBelow
        }
    }
}

/// `(user − reference) / reference · 100`; 0 when the reference is not
/// positive.
fn relative_diff_percent(user: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        (user - reference) / reference * 100.0
    } else {
        0.0
    }
}

impl PressureStatus {
    /// Classify a signed percentage difference (`user − reference`).
    #[must_use]
    pub fn classify(diff_percent: f64, config: &ComparisonConfig) -> Self {
        match Band::of(
            diff_percent,
            config.pressure_good_percent,
            config.pressure_strong_percent,
        ) {
            Band::Good => Self::Good,
            Band::SlightlyAbove => Self::SlightlyHeavy,
            Band::SlightlyBelow => Self::SlightlyLight,
            Band::StronglyAbove => Self::TooHeavy,
            Band::StronglyBelow => Self::TooLight,
        }
    }
}

impl std::fmt::Display for PressureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Good => "good",
            Self::SlightlyHeavy => "slightly heavy",
            Self::SlightlyLight => "slightly light",
            Self::TooHeavy => "too heavy",
            Self::TooLight => "too light",
        })
    }
}

/// One matched user/reference skeleton pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureSample {
    /// User skeleton pixel.
    pub position: PixelPoint,
    /// Matched reference skeleton pixel.
    pub reference_position: PixelPoint,
    /// User thickness at `position`.
    pub user_pressure: f64,
    /// Reference thickness at `reference_position`.
    pub reference_pressure: f64,
    /// `(user − reference) / reference · 100`; 0 when the reference is 0.
    pub diff_percent: f64,
    /// Banded verdict.
    pub status: PressureStatus,
}

/// Counts of samples per [`PressureStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PressureTally {
    /// Good samples.
    pub good: usize,
    /// Slightly heavy samples.
    pub slightly_heavy: usize,
    /// Slightly light samples.
    pub slightly_light: usize,
    /// Too heavy samples.
    pub too_heavy: usize,
    /// Too light samples.
    pub too_light: usize,
}

impl PressureTally {
    fn record(&mut self, status: PressureStatus) {
        let slot = match status {
            PressureStatus::Good => &mut self.good,
            PressureStatus::SlightlyHeavy => &mut self.slightly_heavy,
            PressureStatus::SlightlyLight => &mut self.slightly_light,
            PressureStatus::TooHeavy => &mut self.too_heavy,
            PressureStatus::TooLight => &mut self.too_light,
        };
        *slot += 1;
    }

    /// Total number of samples.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.good + self.slightly_heavy + self.slightly_light + self.too_heavy + self.too_light
    }
}

/// Result of a pressure comparison.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PressureComparison {
    /// Matched samples in user traversal order.
    pub samples: Vec<PressureSample>,
    /// Per-status counts.
    pub tally: PressureTally,
}

type IndexedPoint = GeomWithData<[f64; 2], PixelPoint>;

fn coords(p: PixelPoint) -> [f64; 2] {
    [f64::from(p.x), f64::from(p.y)]
}

/// Nearest entry strictly closer than `radius` to `p`.
fn nearest_within<T>(
    tree: &RTree<GeomWithData<[f64; 2], T>>,
    p: PixelPoint,
    radius: f64,
) -> Option<&GeomWithData<[f64; 2], T>> {
    let query = coords(p);
    let nearest = tree.nearest_neighbor(&query)?;
    let [x, y] = *nearest.geom();
    ((query[0] - x).hypot(query[1] - y) < radius).then_some(nearest)
}

/// Compare brush pressure along the user skeleton with the reference.
#[must_use = "returns the pressure comparison"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(user_points = user.point_count()))
)]
pub fn compare_pressure(
    reference: &Skeleton,
    reference_field: &DistanceField,
    user: &Skeleton,
    user_field: &DistanceField,
    config: &ComparisonConfig,
) -> PressureComparison {
    let tree: RTree<IndexedPoint> = RTree::bulk_load(
        reference
            .ordered_points()
            .map(|p| GeomWithData::new(coords(p), p))
            .collect(),
    );

    let mut comparison = PressureComparison::default();
    if tree.size() == 0 {
        return comparison;
    }
    for position in user.ordered_points() {
        let Some(nearest) = nearest_within(&tree, position, config.match_radius) else {
            continue;
        };
        let reference_position = nearest.data;
        let user_pressure = user_field.thickness_at(position);
        let reference_pressure = reference_field.thickness_at(reference_position);
        let diff_percent = relative_diff_percent(user_pressure, reference_pressure);
        let status = PressureStatus::classify(diff_percent, config);
        comparison.tally.record(status);
        comparison.samples.push(PressureSample {
            position,
            reference_position,
            user_pressure,
            reference_pressure,
            diff_percent,
            status,
        });
    }
    comparison
}

/// How the user's brush speed compares with the reference at one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedStatus {
    /// Within the good band.
    Good,
    /// Faster than the good band but not strongly.
    SlightlyFast,
    /// Slower than the good band but not strongly.
    SlightlySlow,
    /// Much faster than the reference.
    TooFast,
    /// Much slower than the reference.
    TooSlow,
}

impl SpeedStatus {
    /// Classify a signed percentage difference (`user − reference`).
    #[must_use]
    pub fn classify(diff_percent: f64, config: &ComparisonConfig) -> Self {
        match Band::of(
            diff_percent,
            config.speed_good_percent,
            config.speed_strong_percent,
        ) {
            Band::Good => Self::Good,
            Band::SlightlyAbove => Self::SlightlyFast,
            Band::SlightlyBelow => Self::SlightlySlow,
            Band::StronglyAbove => Self::TooFast,
            Band::StronglyBelow => Self::TooSlow,
        }
    }
}

impl std::fmt::Display for SpeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Good => "good",
            Self::SlightlyFast => "slightly fast",
            Self::SlightlySlow => "slightly slow",
            Self::TooFast => "too fast",
            Self::TooSlow => "too slow",
        })
    }
}

/// One matched user/reference motion sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub position: PixelPoint,
    pub reference_position: PixelPoint,
    pub user_speed: f64,
    pub reference_speed: f64,
    /// `(user − reference) / reference · 100`; 0 when the reference is 0.
    pub diff_percent: f64,
    pub status: SpeedStatus,
}

/// Counts of samples per [`SpeedStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeedTally {
    pub good: usize,
    pub slightly_fast: usize,
    pub slightly_slow: usize,
    pub too_fast: usize,
    pub too_slow: usize,
}

impl SpeedTally {
    fn record(&mut self, status: SpeedStatus) {
        let slot = match status {
            SpeedStatus::Good => &mut self.good,
            SpeedStatus::SlightlyFast => &mut self.slightly_fast,
            SpeedStatus::SlightlySlow => &mut self.slightly_slow,
            SpeedStatus::TooFast => &mut self.too_fast,
            SpeedStatus::TooSlow => &mut self.too_slow,
        };
        *slot += 1;
    }

    /// Total number of samples.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.good + self.slightly_fast + self.slightly_slow + self.too_fast + self.too_slow
    }
}

/// Result of a speed comparison.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedComparison {
    /// Matched samples in user order.
    pub samples: Vec<SpeedSample>,
    /// Per-status counts.
    pub tally: SpeedTally,
}

/// Compare brush speed along the user's motion samples with the
/// reference's, matching each user sample to the nearest reference
/// sample position within `config.match_radius`.
#[must_use = "returns the speed comparison"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(user_samples = user.len()))
)]
pub fn compare_speed(
    reference: &[MotionSample],
    user: &[MotionSample],
    config: &ComparisonConfig,
) -> SpeedComparison {
    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        reference
            .iter()
            .enumerate()
            .map(|(i, s)| GeomWithData::new(coords(s.position), i))
            .collect(),
    );

    let mut comparison = SpeedComparison::default();
    if tree.size() == 0 {
        return comparison;
    }
    for sample in user {
        let Some(nearest) = nearest_within(&tree, sample.position, config.match_radius) else {
            continue;
        };
        let matched = &reference[nearest.data];
        let diff_percent = relative_diff_percent(sample.speed, matched.speed);
        let status = SpeedStatus::classify(diff_percent, config);
        comparison.tally.record(status);
        comparison.samples.push(SpeedSample {
            position: sample.position,
            reference_position: matched.position,
            user_speed: sample.speed,
            reference_speed: matched.speed,
            diff_percent,
            status,
        });
    }
    comparison
}

/// What went wrong at a problem area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum Problem {
    Pressure(PressureStatus),
    Speed(SpeedStatus),
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pressure(status) => write!(f, "pressure {status}"),
            Self::Speed(status) => write!(f, "speed {status}"),
        }
    }
}

/// A user sample whose pressure or speed is outside the good band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProblemArea {
    pub position: PixelPoint,
    pub problem: Problem,
    /// `|diff_percent|` of the sample.
    pub severity: f64,
}

/// Every non-good pressure and speed sample, most severe first.
///
/// Pressure samples precede speed samples before sorting and the sort is
/// stable, so equal severities keep that order.
#[must_use]
pub fn identify_problem_areas(pressure: &PressureComparison, speed: &SpeedComparison) -> Vec<ProblemArea> {
    let pressure_problems = pressure
        .samples
        .iter()
        .filter(|s| s.status != PressureStatus::Good)
        .map(|s| ProblemArea {
            position: s.position,
            problem: Problem::Pressure(s.status),
            severity: s.diff_percent.abs(),
        });
    let speed_problems = speed
        .samples
        .iter()
        .filter(|s| s.status != SpeedStatus::Good)
        .map(|s| ProblemArea {
            position: s.position,
            problem: Problem::Speed(s.status),
            severity: s.diff_percent.abs(),
        });

    let mut areas: Vec<ProblemArea> = pressure_problems.chain(speed_problems).collect();
    areas.sort_by(|a, b| b.severity.total_cmp(&a.severity));
    areas
}
