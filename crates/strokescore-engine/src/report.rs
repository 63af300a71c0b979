//! Human-readable and compact machine-readable views of a [`Comparison`].
//!
//! Presentation settings travel in an explicit [`ReportConfig`]; nothing
//! here reads global state.

use serde::{Deserialize, Serialize};

use crate::analysis::{Comparison, MaskAnalysis};
use crate::center_tip::CenterTipScore;
use crate::pressure::{PressureTally, ProblemArea, SpeedTally};
use crate::scoring::ScoreBreakdown;
use crate::shape::ShapeSimilarity;
use crate::strokes::{StrokeAngles, StrokePair};
use crate::thickness::ThicknessSummary;
use crate::turning::TurningPoint;
use crate::types::Dimensions;

/// Presentation settings for [`render_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Heading printed at the top of the report.
    pub title: String,
    /// Digits after the decimal point for scores and measurements.
    pub precision: usize,
    /// List every stroke pair with its spacing.
    pub include_strokes: bool,
    /// List every turning point of the user mask.
    pub include_turning_points: bool,
    /// Include the pressure and speed tallies and the worst problem
    /// areas.
    pub include_pressure: bool,
    /// How many problem areas to list.
    pub max_problem_areas: usize,
    /// Include improvement suggestions.
    pub include_suggestions: bool,
}

impl ReportConfig {
    /// Default number of decimals.
    pub const DEFAULT_PRECISION: usize = 1;

    /// Default number of listed problem areas.
    pub const DEFAULT_MAX_PROBLEM_AREAS: usize = 10;
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Stroke Analysis Report".to_owned(),
            precision: Self::DEFAULT_PRECISION,
            include_strokes: true,
            include_turning_points: true,
            include_pressure: true,
            max_problem_areas: Self::DEFAULT_MAX_PROBLEM_AREAS,
            include_suggestions: true,
        }
    }
}

/// Scalar summary of one [`MaskAnalysis`], without rasters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskSummary {
    /// Raster size.
    pub dimensions: Dimensions,
    /// Skeleton pixel count.
    pub skeleton_points: usize,
    /// Skeleton path count.
    pub paths: usize,
    /// Stroke end count.
    pub endpoints: usize,
    /// Branch point count.
    pub junctions: usize,
    /// Whole-skeleton thickness statistics.
    pub thickness: Option<ThicknessSummary>,
    /// Detected turning points.
    pub turning_points: Vec<TurningPoint>,
    /// Connected stroke count.
    pub strokes: usize,
    /// Pairwise stroke spacing.
    pub stroke_pairs: Vec<StrokePair>,
    /// Mean pairwise spacing.
    pub mean_spacing: Option<f64>,
    /// Center-tip score.
    pub center_tip: CenterTipScore,
    /// Axis deviations of the strokes.
    pub stroke_angles: StrokeAngles,
    /// Skeleton path indices in estimated writing order.
    pub stroke_order: Vec<usize>,
}

impl From<&MaskAnalysis> for MaskSummary {
    fn from(analysis: &MaskAnalysis) -> Self {
        Self {
            dimensions: analysis.dimensions,
            skeleton_points: analysis.skeleton.point_count(),
            paths: analysis.skeleton.paths().len(),
            endpoints: analysis.skeleton.endpoints().len(),
            junctions: analysis.skeleton.junctions().len(),
            thickness: analysis.thickness.overall.as_ref().map(|p| p.summary),
            turning_points: analysis.turning_points.clone(),
            strokes: analysis.strokes.strokes.len(),
            stroke_pairs: analysis.strokes.pairs.clone(),
            mean_spacing: analysis.strokes.mean_distance(),
            center_tip: analysis.center_tip.score,
            stroke_angles: analysis.strokes.angles(),
            stroke_order: analysis.dynamics.stroke_order.clone(),
        }
    }
}

/// Compact serializable view of a [`Comparison`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Category scores, composite and grade.
    pub scores: ScoreBreakdown,
    /// Shape metrics.
    pub shape: ShapeSimilarity,
    /// Pressure verdict counts.
    pub pressure: PressureTally,
    /// Speed verdict counts.
    pub speed: SpeedTally,
    /// Non-good pressure and speed samples, most severe first.
    pub problem_areas: Vec<ProblemArea>,
    /// Improvement suggestions, most important first.
    pub suggestions: Vec<String>,
    /// Reference mask summary.
    pub reference: MaskSummary,
    /// User mask summary.
    pub user: MaskSummary,
}

impl From<&Comparison> for ComparisonSummary {
    fn from(comparison: &Comparison) -> Self {
        Self {
            scores: comparison.scores,
            shape: comparison.shape,
            pressure: comparison.pressure.tally,
            speed: comparison.speed.tally,
            problem_areas: comparison.problem_areas.clone(),
            suggestions: improvement_suggestions(comparison),
            reference: MaskSummary::from(&comparison.reference),
            user: MaskSummary::from(&comparison.user),
        }
    }
}

fn category_label(name: &str) -> &str {
    match name {
        "thickness" => "Thickness consistency",
        "turning" => "Turning accuracy",
        "spacing" => "Spacing uniformity",
        "overlap" => "Overlap (IoU)",
        "size_match" => "Size match",
        "position_accuracy" => "Position accuracy",
        "stroke_match" => "Stroke match",
        "balance" => "Quadrant balance",
        "skeleton_similarity" => "Skeleton similarity",
        "center_tip" => "Center tip",
        "angle_accuracy" => "Angle accuracy",
        other => other,
    }
}

/// Category scores below this trigger a suggestion.
const WEAK_SCORE: f64 = 80.0;
/// Axis deviation in degrees above which axis strokes need straightening.
const AXIS_DEVIATION_LIMIT: f64 = 5.0;
/// Thickness uniformity below which strokes look uneven.
const UNIFORMITY_LIMIT: f64 = 0.7;

/// Practical advice derived from the weakest categories.
///
/// Sub-items are indented by two spaces under their heading. An
/// otherwise empty list gets a single word of encouragement.
#[must_use]
pub fn improvement_suggestions(comparison: &Comparison) -> Vec<String> {
    let scores = &comparison.scores;
    let mut suggestions = Vec::new();

    if scores.angle_accuracy < WEAK_SCORE {
        suggestions.push("Correct the stroke angles".to_owned());
        let angles = comparison.user.strokes.angles();
        if angles.vertical_deviation > AXIS_DEVIATION_LIMIT {
            suggestions.push("  - keep vertical strokes upright".to_owned());
        }
        if angles.horizontal_deviation > AXIS_DEVIATION_LIMIT {
            suggestions.push("  - keep horizontal strokes level".to_owned());
        }
    }

    let thickness = |analysis: &MaskAnalysis| analysis.thickness.overall.as_ref().map(|p| p.summary);
    if let (Some(reference), Some(user)) = (thickness(&comparison.reference), thickness(&comparison.user)) {
        if scores.thickness < WEAK_SCORE {
            suggestions.push(if user.mean < reference.mean {
                "Press harder for thicker strokes".to_owned()
            } else {
                "Ease off for thinner strokes".to_owned()
            });
        }
        if user.uniformity < UNIFORMITY_LIMIT {
            suggestions.push("  - keep the stroke width more even".to_owned());
        }
    }

    if scores.skeleton_similarity < WEAK_SCORE {
        suggestions.push("Rework the overall structure".to_owned());
        suggestions.push("  - check where each stroke starts and ends".to_owned());
        suggestions.push("  - adjust the proportions between strokes".to_owned());
    }

    if suggestions.is_empty() {
        suggestions.push("Excellent! Keep practicing.".to_owned());
    }
    suggestions
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_owned(), |v| format!("{v:.precision$}"))
}

/// Render a plain-text report.
#[must_use]
pub fn render_text(comparison: &Comparison, config: &ReportConfig) -> String {
    let p = config.precision;
    let scores = &comparison.scores;
    let mut lines = Vec::new();

    lines.push(format!("{}\n{}", config.title, "=".repeat(60)));
    lines.push(format!(
        "Image: {}  |  Composite: {:.p$}  |  Grade: {}",
        comparison.user.dimensions, scores.composite, scores.grade,
    ));
    lines.push(String::new());

    lines.push(format!("{:<24} {:>10}", "Category", "Score"));
    lines.push("-".repeat(36));
    for (name, score) in scores.categories() {
        lines.push(format!("{:<24} {score:>10.p$}", category_label(name)));
    }
    lines.push(String::new());

    let reference = MaskSummary::from(&comparison.reference);
    let user = MaskSummary::from(&comparison.user);
    lines.push(format!("{:<24} {:>12} {:>12}", "Measurement", "Reference", "User"));
    lines.push("-".repeat(50));
    let rows: [(&str, String, String); 8] = [
        (
            "Skeleton points",
            reference.skeleton_points.to_string(),
            user.skeleton_points.to_string(),
        ),
        ("Endpoints", reference.endpoints.to_string(), user.endpoints.to_string()),
        ("Junctions", reference.junctions.to_string(), user.junctions.to_string()),
        (
            "Mean thickness",
            optional(reference.thickness.map(|t| t.mean), p),
            optional(user.thickness.map(|t| t.mean), p),
        ),
        (
            "Thickness variation",
            optional(reference.thickness.map(|t| t.std_of_variation), p),
            optional(user.thickness.map(|t| t.std_of_variation), p),
        ),
        (
            "Turning points",
            reference.turning_points.len().to_string(),
            user.turning_points.len().to_string(),
        ),
        ("Strokes", reference.strokes.to_string(), user.strokes.to_string()),
        (
            "Mean spacing",
            optional(reference.mean_spacing, p),
            optional(user.mean_spacing, p),
        ),
    ];
    for (name, r, u) in rows {
        lines.push(format!("{name:<24} {r:>12} {u:>12}"));
    }
    lines.push(String::new());

    let tip = user.center_tip;
    lines.push(format!(
        "Center tip: {:.p$} ({})  symmetry {:.p$}  angle {:.p$}  ink {:.p$}",
        tip.total, tip.classification, tip.symmetry, tip.angle_consistency, tip.ink_distribution,
    ));

    if let Some(skeleton) = comparison.shape.skeleton {
        lines.push(format!(
            "Skeleton distance: hausdorff {:.p$}px  average {:.p$}px",
            skeleton.hausdorff_distance, skeleton.average_distance,
        ));
    }

    if config.include_turning_points && !user.turning_points.is_empty() {
        lines.push(String::new());
        lines.push("Turning points (user)".to_owned());
        lines.push("-".repeat(36));
        for turn in &user.turning_points {
            lines.push(format!(
                "  ({:>4}, {:>4})  {:>6.p$} deg  pressure {:.p$}",
                turn.position.x, turn.position.y, turn.angle_degrees, turn.estimated_pressure,
            ));
        }
    }

    if config.include_strokes && !user.stroke_pairs.is_empty() {
        lines.push(String::new());
        lines.push("Stroke spacing (user)".to_owned());
        lines.push("-".repeat(36));
        for pair in &user.stroke_pairs {
            lines.push(format!(
                "  {} -> {}  {:>8.p$}px  {}",
                pair.first, pair.second, pair.distance, pair.relative_position,
            ));
        }
    }

    if config.include_pressure && comparison.pressure.tally.total() > 0 {
        let t = comparison.pressure.tally;
        lines.push(String::new());
        lines.push(format!(
            "Pressure: good {}  slightly heavy {}  slightly light {}  too heavy {}  too light {}",
            t.good, t.slightly_heavy, t.slightly_light, t.too_heavy, t.too_light,
        ));
    }

    if config.include_pressure && comparison.speed.tally.total() > 0 {
        let t = comparison.speed.tally;
        lines.push(format!(
            "Speed: good {}  slightly fast {}  slightly slow {}  too fast {}  too slow {}",
            t.good, t.slightly_fast, t.slightly_slow, t.too_fast, t.too_slow,
        ));
    }

    if config.include_pressure && config.max_problem_areas > 0 && !comparison.problem_areas.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Problem areas ({} total)",
            comparison.problem_areas.len()
        ));
        lines.push("-".repeat(36));
        for area in comparison.problem_areas.iter().take(config.max_problem_areas) {
            lines.push(format!(
                "  ({:>4}, {:>4})  {:<22} {:>7.p$}%",
                area.position.x,
                area.position.y,
                area.problem.to_string(),
                area.severity,
            ));
        }
    }

    if config.include_suggestions {
        lines.push(String::new());
        lines.push("Suggestions".to_owned());
        lines.push("-".repeat(36));
        lines.extend(improvement_suggestions(comparison));
    }

    lines.join("\n")
}
