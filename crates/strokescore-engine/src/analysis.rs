//! Per-mask analysis and reference-versus-user comparison.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::center_tip::{self, CenterTipAnalysis};
use crate::config::AnalysisConfig;
use crate::distance::DistanceField;
use crate::dynamics::{self, BrushDynamics};
use crate::mask;
use crate::pressure::{self, PressureComparison, ProblemArea, SpeedComparison};
use crate::scoring::{self, ScoreBreakdown};
use crate::shape::{self, ShapeSimilarity};
use crate::skeleton::Skeleton;
use crate::strokes::{self, StrokeLayout};
use crate::thickness::{self, ThicknessAnalysis};
use crate::turning::{self, TurningPoint};
use crate::types::{BinaryMask, Dimensions, EngineError};

/// Everything measured on one mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskAnalysis {
    /// Raster size of the analyzed mask.
    pub dimensions: Dimensions,
    /// Medial line and its canonical paths.
    pub skeleton: Skeleton,
    /// Distance to background for every pixel.
    pub distance_field: DistanceField,
    /// Thickness profiles along the skeleton.
    pub thickness: ThicknessAnalysis,
    /// Sharp bends, path by path in traversal order.
    pub turning_points: Vec<TurningPoint>,
    /// Connected strokes and their spacing.
    pub strokes: StrokeLayout,
    /// Brush-centering measurements.
    pub center_tip: CenterTipAnalysis,
    /// Motion, pressure extrema and stroke order along the skeleton.
    pub dynamics: BrushDynamics,
}

/// A user mask scored against a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Analysis of the reference mask.
    pub reference: MaskAnalysis,
    /// Analysis of the user mask.
    pub user: MaskAnalysis,
    /// Whole-character shape agreement.
    pub shape: ShapeSimilarity,
    /// Point-by-point pressure agreement.
    pub pressure: PressureComparison,
    /// Point-by-point speed agreement.
    pub speed: SpeedComparison,
    /// Non-good pressure and speed samples, most severe first.
    pub problem_areas: Vec<ProblemArea>,
    /// Category scores, composite and grade.
    pub scores: ScoreBreakdown,
}

/// Analyze a single binary mask.
///
/// Never fails: a blank mask yields an empty skeleton, no thickness
/// profile, no turning points and no strokes.
///
/// # Steps
///
/// 1. Distance field
/// 2. Skeleton (thin, prune spurs, trace paths)
/// 3. Thickness profile
/// 4. Turning points
/// 5. Stroke separation
/// 6. Center-tip measurements
/// 7. Brush dynamics
#[must_use = "returns the mask analysis"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(w = mask.width(), h = mask.height()))
)]
pub fn analyze_mask(mask: &BinaryMask, config: &AnalysisConfig) -> MaskAnalysis {
    let distance_field = DistanceField::from_mask(mask);
    let skeleton = Skeleton::from_mask(mask, &config.skeleton);
    let thickness = thickness::analyze_thickness(&skeleton, &distance_field, &config.thickness);
    let turning_points = turning::detect_turning_points(&skeleton, &distance_field, &config.turning);
    let strokes = strokes::separate_strokes(mask, &config.strokes);
    let center_tip =
        center_tip::analyze_center_tip(mask, &skeleton, &distance_field, &config.center_tip);
    let dynamics = dynamics::analyze_dynamics(&skeleton, &distance_field, &config.dynamics);

    #[cfg(feature = "tracing")]
    tracing::info!(
        skeleton_points = skeleton.point_count(),
        paths = skeleton.paths().len(),
        turning_points = turning_points.len(),
        strokes = strokes.strokes.len(),
        "mask analyzed"
    );

    MaskAnalysis {
        dimensions: mask.dimensions(),
        skeleton,
        distance_field,
        thickness,
        turning_points,
        strokes,
        center_tip,
        dynamics,
    }
}

/// Score a user mask against a reference mask.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConfig`] if `config` fails
/// [`AnalysisConfig::validate`], and [`EngineError::DimensionMismatch`]
/// if the masks differ in size.
pub fn compare(
    reference: &BinaryMask,
    user: &BinaryMask,
    config: &AnalysisConfig,
) -> Result<Comparison, EngineError> {
    config.validate()?;
    if reference.dimensions() != user.dimensions() {
        return Err(EngineError::DimensionMismatch {
            reference: reference.dimensions(),
            user: user.dimensions(),
        });
    }

    let reference_analysis = analyze_mask(reference, config);
    let user_analysis = analyze_mask(user, config);
    Ok(compare_analyses(
        reference,
        user,
        reference_analysis,
        user_analysis,
        config,
    ))
}

/// Score two already-analyzed masks.
///
/// Lets callers run [`analyze_mask`] on separate threads. The masks must
/// be the ones the analyses were computed from; dimensions are not
/// re-checked here.
#[must_use = "returns the comparison"]
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn compare_analyses(
    reference_mask: &BinaryMask,
    user_mask: &BinaryMask,
    reference: MaskAnalysis,
    user: MaskAnalysis,
    config: &AnalysisConfig,
) -> Comparison {
    let shape = shape::shape_similarity(
        reference_mask,
        user_mask,
        &reference.skeleton,
        &user.skeleton,
        &config.comparison,
    );
    let pressure = pressure::compare_pressure(
        &reference.skeleton,
        &reference.distance_field,
        &user.skeleton,
        &user.distance_field,
        &config.comparison,
    );
    let speed = pressure::compare_speed(
        &reference.dynamics.motion,
        &user.dynamics.motion,
        &config.comparison,
    );
    let problem_areas = pressure::identify_problem_areas(&pressure, &speed);
    let scores = scoring::score(&reference, &user, &shape, &config.scoring);

    #[cfg(feature = "tracing")]
    tracing::info!(
        composite = scores.composite,
        grade = %scores.grade,
        problem_areas = problem_areas.len(),
        "comparison scored"
    );

    Comparison {
        reference,
        user,
        shape,
        pressure,
        speed,
        problem_areas,
        scores,
    }
}

/// Decode two images, extract their ink masks, and compare them.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] or [`EngineError::ImageDecode`]
/// for unusable image bytes, plus everything [`compare`] returns.
pub fn compare_images(
    reference_bytes: &[u8],
    user_bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<Comparison, EngineError> {
    let reference = mask::decode_mask(reference_bytes, &config.mask)?;
    let user = mask::decode_mask(user_bytes, &config.mask)?;
    compare(&reference, &user, config)
}
