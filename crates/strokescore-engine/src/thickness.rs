//! Thickness profiling along the skeleton.
//!
//! Each skeleton pixel's thickness is twice its distance to the
//! background. Along each path the sequence is smoothed with a Gaussian
//! and differentiated; the spread of that derivative measures how
//! unevenly the brush pressure changed along the stroke. Smoothing and
//! differentiation never cross from one path into the next.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ThicknessConfig;
use crate::distance::DistanceField;
use crate::skeleton::Skeleton;
use crate::smooth;
use crate::types::PixelPoint;

/// Entries in [`ThicknessProfile::normalized`]: one per percent of
/// progress, 0 through 100 inclusive.
pub const NORMALIZED_SAMPLES: usize = 101;

/// Thickness at one skeleton pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThicknessSample {
    /// Skeleton pixel.
    pub position: PixelPoint,
    /// Position along the sequence, 0 to 100 percent.
    pub progress: f64,
    /// Local stroke diameter in pixels.
    pub thickness: f64,
}

/// Scalar summary of a thickness profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThicknessSummary {
    /// Mean raw thickness.
    pub mean: f64,
    /// Largest raw thickness.
    pub max: f64,
    /// Smallest raw thickness.
    pub min: f64,
    /// Population standard deviation of the raw thickness.
    pub std: f64,
    /// `1 − std / mean`, floored at zero; 1 means perfectly even width.
    pub uniformity: f64,
    /// Standard deviation of the gradient of the smoothed thickness.
    pub std_of_variation: f64,
}

/// Thickness sampled along an ordered run of skeleton pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThicknessProfile {
    /// Raw samples in order.
    pub samples: Vec<ThicknessSample>,
    /// Gaussian-smoothed thickness, parallel to `samples`.
    pub smoothed: Vec<f64>,
    /// Gradient of `smoothed`.
    pub variation: Vec<f64>,
    /// Smoothed thickness resampled at 0, 1, ..., 100 percent progress.
    pub normalized: Vec<f64>,
    /// Summary statistics.
    pub summary: ThicknessSummary,
}

/// Thickness profile of one skeleton path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathThickness {
    /// Index into [`Skeleton::paths`].
    pub path_index: usize,
    /// The path's profile.
    pub profile: ThicknessProfile,
}

/// Thickness of a whole skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThicknessAnalysis {
    /// Profile over every skeleton pixel, paths concatenated in
    /// traversal order. Each path is smoothed and differentiated on its
    /// own before concatenation. `None` when the skeleton has fewer than
    /// two pixels.
    pub overall: Option<ThicknessProfile>,
    /// One profile per path with at least two pixels.
    pub per_path: Vec<PathThickness>,
}

/// Raw, smoothed and differentiated thickness of one run of pixels.
fn signals(points: &[PixelPoint], field: &DistanceField, sigma: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let raw: Vec<f64> = points.iter().map(|&p| field.thickness_at(p)).collect();
    let smoothed = smooth::gaussian_smooth(&raw, sigma);
    let variation = smooth::gradient(&smoothed);
    (raw, smoothed, variation)
}

#[allow(clippy::cast_precision_loss)]
fn assemble(
    points: &[PixelPoint],
    raw: &[f64],
    smoothed: Vec<f64>,
    variation: Vec<f64>,
) -> Option<ThicknessProfile> {
    if points.len() < 2 {
        return None;
    }

    let last = (points.len() - 1) as f64;
    let samples: Vec<ThicknessSample> = points
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(i, (&position, &thickness))| ThicknessSample {
            position,
            progress: i as f64 / last * 100.0,
            thickness,
        })
        .collect();

    let mean = smooth::mean(raw)?;
    let std = smooth::std_dev(raw)?;
    let summary = ThicknessSummary {
        mean,
        max: raw.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: raw.iter().copied().fold(f64::INFINITY, f64::min),
        std,
        uniformity: if mean > 0.0 {
            (1.0 - std / mean).max(0.0)
        } else {
            0.0
        },
        std_of_variation: smooth::std_dev(&variation)?,
    };

    Some(ThicknessProfile {
        normalized: smooth::resample(&smoothed, NORMALIZED_SAMPLES),
        samples,
        smoothed,
        variation,
        summary,
    })
}

/// Build a profile from one ordered run of skeleton pixels.
///
/// Returns `None` for fewer than two pixels: a single sample has no
/// variation to measure.
#[must_use]
pub fn profile_along(
    points: &[PixelPoint],
    field: &DistanceField,
    config: &ThicknessConfig,
) -> Option<ThicknessProfile> {
    if points.len() < 2 {
        return None;
    }
    let (raw, smoothed, variation) = signals(points, field, config.smoothing_sigma);
    assemble(points, &raw, smoothed, variation)
}

/// Profile the whole skeleton and each of its paths.
///
/// The overall profile pools every path's raw samples, smoothed values
/// and variation. A single-pixel path contributes its thickness and a
/// variation of zero.
#[must_use = "returns the thickness analysis"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(points = skeleton.point_count()))
)]
pub fn analyze_thickness(
    skeleton: &Skeleton,
    field: &DistanceField,
    config: &ThicknessConfig,
) -> ThicknessAnalysis {
    let mut points = Vec::with_capacity(skeleton.point_count());
    let mut raw = Vec::with_capacity(skeleton.point_count());
    let mut smoothed = Vec::with_capacity(skeleton.point_count());
    let mut variation = Vec::with_capacity(skeleton.point_count());
    let mut per_path = Vec::new();

    for (path_index, path) in skeleton.paths().iter().enumerate() {
        let (path_raw, path_smoothed, path_variation) =
            signals(&path.points, field, config.smoothing_sigma);
        points.extend_from_slice(&path.points);
        raw.extend_from_slice(&path_raw);
        smoothed.extend_from_slice(&path_smoothed);
        variation.extend_from_slice(&path_variation);

        if let Some(profile) = assemble(&path.points, &path_raw, path_smoothed, path_variation) {
            per_path.push(PathThickness {
                path_index,
                profile,
            });
        }
    }

    ThicknessAnalysis {
        overall: assemble(&points, &raw, smoothed, variation),
        per_path,
    }
}
