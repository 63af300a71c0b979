//! Center-tip (中锋) analysis.
//!
//! A brush held upright leaves a stroke whose ink is symmetric about the
//! medial line, whose outline runs parallel to the stroke direction, and
//! whose ink is densest at the center. Three independent measurements
//! capture those properties and are folded into one 0-100 total:
//!
//! - **symmetry**: a square patch around each skeleton pixel is split at
//!   the pixel's column and the two halves are mirrored and compared;
//! - **edge angles**: the principal axis of the Canny edge pixels near
//!   every few skeleton pixels, with the eigenvalue ratio as a measure of
//!   how line-like the outline is;
//! - **ink profile**: the distance field sampled across the stroke,
//!   perpendicular to the local tangent.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::{CenterTipConfig, CenterTipWeights};
use crate::distance::DistanceField;
use crate::edge;
use crate::skeleton::Skeleton;
use crate::smooth;
use crate::types::{BinaryMask, PixelPoint, Point};

/// Guards eigenvalue and ink ratios against division by zero.
const EPSILON: f64 = 1e-6;

/// Cross-section symmetry at one skeleton pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetrySample {
    /// Skeleton pixel at the patch center.
    pub position: PixelPoint,
    /// 1 for a perfectly mirrored patch, 0 for no agreement.
    pub symmetry: f64,
}

/// Dominant orientation of a point cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalAxis {
    /// Orientation of the major axis in degrees, `[0, 180)`.
    pub angle_degrees: f64,
    /// Larger eigenvalue of the sample covariance.
    pub major: f64,
    /// Smaller eigenvalue of the sample covariance.
    pub minor: f64,
}

/// Outline direction near one skeleton pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeAngleSample {
    /// Skeleton pixel at the window center.
    pub position: PixelPoint,
    /// Principal direction of the nearby edge pixels, degrees in `[0, 180)`.
    pub angle_degrees: f64,
    /// `sqrt(major / (minor + ε))`; large when the edges form a clean line.
    pub spread: f64,
    /// `minor / (major + ε)`; near 0 for a clean line, near 1 for a blob.
    pub confidence: f64,
    /// Edge pixels found in the window.
    pub edge_pixels: usize,
}

/// Distance-field cross-section at one skeleton pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkProfileSample {
    /// Skeleton pixel at the center of the cross-section.
    pub position: PixelPoint,
    /// Center value over the mean of the two end values.
    pub concentration: f64,
    /// Absolute difference between the mean of each half.
    pub asymmetry: f64,
    /// The sampled values, from one side of the stroke to the other.
    pub profile: Vec<f64>,
}

/// Verdict derived from the center-tip total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipClassification {
    /// The brush tip stayed on the medial line.
    WellCentered,
    /// Partly centered.
    Borderline,
    /// The brush was held at a slant (side tip).
    OffCenter,
}

impl std::fmt::Display for TipClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::WellCentered => "well centered",
            Self::Borderline => "borderline",
            Self::OffCenter => "off center",
        })
    }
}

/// Aggregate center-tip score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterTipScore {
    /// Weighted total, 0-100.
    pub total: f64,
    /// Symmetry sub-score, 0-100.
    pub symmetry: f64,
    /// Edge-angle consistency sub-score, 0-100.
    pub angle_consistency: f64,
    /// Ink distribution sub-score, 0-100.
    pub ink_distribution: f64,
    /// Banded verdict.
    pub classification: TipClassification,
}

/// All center-tip measurements of one mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterTipAnalysis {
    /// Per-pixel symmetry samples.
    pub symmetry: Vec<SymmetrySample>,
    /// Edge-angle samples.
    pub edge_angles: Vec<EdgeAngleSample>,
    /// Ink cross-sections.
    pub ink_profiles: Vec<InkProfileSample>,
    /// Aggregate score.
    pub score: CenterTipScore,
}

/// Mirror symmetry of the patch `[cy − r, cy + r) × [cx − r, cx + r)`.
///
/// The patch is clipped to the raster and split at half its width; the
/// columns adjacent to the split are compared pairwise outward for as
/// many columns as the narrower half has. Returns `None` when either
/// half is empty.
#[must_use]
pub fn local_symmetry(mask: &BinaryMask, center: PixelPoint, radius: u32) -> Option<f64> {
    let x0 = center.x.saturating_sub(radius);
    let y0 = center.y.saturating_sub(radius);
    let x1 = center.x.saturating_add(radius).min(mask.width());
    let y1 = center.y.saturating_add(radius).min(mask.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let split = (x1 - x0) / 2;
    let compared = split.min(x1 - x0 - split);
    if compared == 0 {
        return None;
    }

    let mid = x0 + split;
    let mut mismatched = 0_u32;
    for y in y0..y1 {
        for k in 0..compared {
            if mask.is_ink(mid - 1 - k, y) != mask.is_ink(mid + k, y) {
                mismatched += 1;
            }
        }
    }
    let area = compared * (y1 - y0);
    Some((1.0 - f64::from(mismatched) / f64::from(area)).clamp(0.0, 1.0))
}

/// Symmetry at every skeleton pixel far enough from the boundary.
#[must_use]
pub fn cross_section_symmetry(
    mask: &BinaryMask,
    skeleton: &Skeleton,
    field: &DistanceField,
    config: &CenterTipConfig,
) -> Vec<SymmetrySample> {
    skeleton
        .ordered_points()
        .filter(|p| field.get(p.x, p.y) >= config.min_radius)
        .filter_map(|position| {
            local_symmetry(mask, position, config.patch_radius)
                .map(|symmetry| SymmetrySample { position, symmetry })
        })
        .collect()
}

/// Principal axis of `points` from the sample covariance (`n − 1`
/// denominator). `None` for fewer than two points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn principal_axis(points: &[Point]) -> Option<PrincipalAxis> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let (dx, dy) = (p.x - mx, p.y - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let (cxx, cyy, cxy) = (sxx / (n - 1.0), syy / (n - 1.0), sxy / (n - 1.0));

    let half_trace = (cxx + cyy) / 2.0;
    let root = ((cxx - cyy) / 2.0).hypot(cxy);
    let angle = 0.5 * (2.0 * cxy).atan2(cxx - cyy);

    Some(PrincipalAxis {
        angle_degrees: angle.to_degrees().rem_euclid(180.0),
        major: half_trace + root,
        minor: (half_trace - root).max(0.0),
    })
}

/// Edge-angle samples at every `edge_stride`-th skeleton pixel.
#[must_use]
pub fn edge_angles(
    mask: &BinaryMask,
    skeleton: &Skeleton,
    config: &CenterTipConfig,
) -> Vec<EdgeAngleSample> {
    let edges = edge::mask_edges(mask, config.canny_low, config.canny_high);
    skeleton
        .ordered_points()
        .step_by(config.edge_stride.max(1))
        .filter_map(|position| {
            let pts = edge::edge_points_near(&edges, position.x, position.y, config.edge_window);
            if pts.len() < config.min_edge_pixels {
                return None;
            }
            let axis = principal_axis(&pts)?;
            Some(EdgeAngleSample {
                position,
                angle_degrees: axis.angle_degrees,
                spread: (axis.major / (axis.minor + EPSILON)).sqrt(),
                confidence: axis.minor / (axis.major + EPSILON),
                edge_pixels: pts.len(),
            })
        })
        .collect()
}

/// Distance-field cross-sections at every `ink_stride`-th skeleton pixel.
///
/// Samples run along the normal to the path tangent; a pixel whose
/// tangent is undefined (single-pixel path) is sampled horizontally.
#[must_use]
pub fn ink_profiles(
    skeleton: &Skeleton,
    field: &DistanceField,
    config: &CenterTipConfig,
) -> Vec<InkProfileSample> {
    let half = config.ink_half_width;
    skeleton
        .indexed_points()
        .step_by(config.ink_stride.max(1))
        .map(|(path, index)| {
            let position = path.points[index];
            let (nx, ny) = path
                .tangent_degrees(index, config.tangent_window)
                .map_or((1.0, 0.0), |t| {
                    let (sin, cos) = t.to_radians().sin_cos();
                    (-sin, cos)
                });

            let center = Point::from(position);
            let profile: Vec<f64> = (-i64::from(half)..=i64::from(half))
                .map(|t| {
                    #[allow(clippy::cast_precision_loss)]
                    let t = t as f64;
                    field.sample(Point::new(t.mul_add(nx, center.x), t.mul_add(ny, center.y)))
                })
                .collect();
            profile_stats(position, profile)
        })
        .collect()
}

fn profile_stats(position: PixelPoint, profile: Vec<f64>) -> InkProfileSample {
    let mid = profile.len() / 2;
    let ends = (profile[0] + profile[profile.len() - 1]) / 2.0;
    let left = smooth::mean(&profile[..mid]).unwrap_or(0.0);
    let right = smooth::mean(&profile[mid + 1..]).unwrap_or(0.0);
    InkProfileSample {
        position,
        concentration: profile[mid] / (ends + EPSILON),
        asymmetry: (left - right).abs(),
        profile,
    }
}

/// Fold the three measurements into a [`CenterTipScore`].
///
/// A measurement with fewer than two samples contributes a zero
/// sub-score.
#[must_use]
pub fn score_center_tip(
    symmetry: &[SymmetrySample],
    edge_angles: &[EdgeAngleSample],
    ink_profiles: &[InkProfileSample],
    weights: &CenterTipWeights,
) -> CenterTipScore {
    let enough = |values: Vec<f64>| {
        if values.len() < 2 {
            None
        } else {
            smooth::mean(&values)
        }
    };

    let symmetry_score = enough(symmetry.iter().map(|s| s.symmetry).collect())
        .map_or(0.0, |m| 100.0 * m);

    let angle_score = enough(edge_angles.iter().map(|s| s.spread).collect())
        .map_or(0.0, |m| weights.spread_penalty.mul_add(-m, 100.0).max(0.0));

    let ink_score = match (
        enough(ink_profiles.iter().map(|s| s.concentration).collect()),
        enough(ink_profiles.iter().map(|s| s.asymmetry).collect()),
    ) {
        (Some(conc), Some(asym)) => {
            let cap = weights.concentration_cap;
            let concentration = if cap > 0.0 { 50.0 * conc.min(cap) / cap } else { 50.0 };
            concentration + weights.asymmetry_penalty.mul_add(-asym, 50.0).max(0.0)
        }
        _ => 0.0,
    };

    let total = weights.ink.mul_add(
        ink_score,
        weights
            .symmetry
            .mul_add(symmetry_score, weights.angle * angle_score),
    );

    let classification = if total >= weights.well_centered_cutoff {
        TipClassification::WellCentered
    } else if total >= weights.borderline_cutoff {
        TipClassification::Borderline
    } else {
        TipClassification::OffCenter
    };

    CenterTipScore {
        total,
        symmetry: symmetry_score,
        angle_consistency: angle_score,
        ink_distribution: ink_score,
        classification,
    }
}

/// Run all three measurements and score them.
#[must_use = "returns the center-tip analysis"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(points = skeleton.point_count()))
)]
pub fn analyze_center_tip(
    mask: &BinaryMask,
    skeleton: &Skeleton,
    field: &DistanceField,
    config: &CenterTipConfig,
) -> CenterTipAnalysis {
    let symmetry = cross_section_symmetry(mask, skeleton, field, config);
    let edge_angles = edge_angles(mask, skeleton, config);
    let ink_profiles = ink_profiles(skeleton, field, config);
    let score = score_center_tip(&symmetry, &edge_angles, &ink_profiles, &config.weights);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        total = score.total,
        symmetry_samples = symmetry.len(),
        edge_samples = edge_angles.len(),
        ink_samples = ink_profiles.len(),
        "center-tip scored"
    );

    CenterTipAnalysis {
        symmetry,
        edge_angles,
        ink_profiles,
        score,
    }
}
