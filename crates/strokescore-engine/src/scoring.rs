//! Category scores, composite and letter grade.
//!
//! Every category is a number in `[0, 100]`. Categories built from an
//! absolute difference (thickness, turning) are symmetric in reference
//! and user; spacing is relative to the reference.

use serde::{Deserialize, Serialize};

use crate::analysis::MaskAnalysis;
use crate::config::{CompositeWeights, GradeCutoffs, ScoringConfig};
use crate::shape::ShapeSimilarity;
use crate::strokes::StrokeLayout;
use crate::thickness::ThicknessSummary;

/// Letter grade of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Excellent.
    A,
    /// Good.
    B,
    /// Fair.
    C,
    /// Needs work.
    D,
    /// Failing.
    F,
}

impl Grade {
    /// Grade for `score` under `cutoffs` (each cutoff is inclusive).
    #[must_use]
    pub fn for_score(score: f64, cutoffs: &GradeCutoffs) -> Self {
        if score >= cutoffs.a {
            Self::A
        } else if score >= cutoffs.b {
            Self::B
        } else if score >= cutoffs.c {
            Self::C
        } else if score >= cutoffs.d {
            Self::D
        } else {
            Self::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

/// Per-category scores of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Thickness consistency.
    pub thickness: f64,
    /// Turning accuracy.
    pub turning: f64,
    /// Spacing uniformity.
    pub spacing: f64,
    /// Ink intersection over union.
    pub overlap: f64,
    /// Ink area ratio.
    pub size_match: f64,
    /// Ink centroid agreement.
    pub position_accuracy: f64,
    /// Outline agreement.
    pub stroke_match: f64,
    /// Quadrant balance agreement.
    pub balance: f64,
    /// Skeleton proximity.
    pub skeleton_similarity: f64,
    /// The user's center-tip total.
    pub center_tip: f64,
    /// Stroke orientation agreement.
    pub angle_accuracy: f64,
    /// Weighted mean of the categories.
    pub composite: f64,
    /// Letter grade of `composite`.
    pub grade: Grade,
}

impl ScoreBreakdown {
    /// `(name, score)` pairs in the same order as
    /// [`CompositeWeights::named`].
    #[must_use]
    pub const fn categories(&self) -> [(&'static str, f64); 11] {
        [
            ("thickness", self.thickness),
            ("turning", self.turning),
            ("spacing", self.spacing),
            ("overlap", self.overlap),
            ("size_match", self.size_match),
            ("position_accuracy", self.position_accuracy),
            ("stroke_match", self.stroke_match),
            ("balance", self.balance),
            ("skeleton_similarity", self.skeleton_similarity),
            ("center_tip", self.center_tip),
            ("angle_accuracy", self.angle_accuracy),
        ]
    }
}

/// Thickness consistency:
/// `100 − mean_penalty·|Δmean| − variation_penalty·|Δstd_of_variation|`,
/// clamped to `[0, 100]`.
///
/// Both profiles missing scores 100; exactly one missing scores 0.
#[must_use]
pub fn thickness_score(
    reference: Option<&ThicknessSummary>,
    user: Option<&ThicknessSummary>,
    config: &ScoringConfig,
) -> f64 {
    match (reference, user) {
        (None, None) => 100.0,
        (Some(r), Some(u)) => {
            let mean_diff = (r.mean - u.mean).abs();
            let variation_diff = (r.std_of_variation - u.std_of_variation).abs();
            config
                .thickness_variation_penalty
                .mul_add(-variation_diff, config.thickness_mean_penalty.mul_add(-mean_diff, 100.0))
                .clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Turning accuracy: `100 − count_penalty·|Δcount|`, clamped.
///
/// Neither side turning scores 100; exactly one side turning scores
/// [`ScoringConfig::one_sided_turning_score`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn turning_score(reference_count: usize, user_count: usize, config: &ScoringConfig) -> f64 {
    match (reference_count, user_count) {
        (0, 0) => 100.0,
        (0, _) | (_, 0) => config.one_sided_turning_score,
        (r, u) => config
            .turning_count_penalty
            .mul_add(-(r.abs_diff(u) as f64), 100.0)
            .clamp(0.0, 100.0),
    }
}

/// Spacing uniformity: `100 − 100·|Δmean| / reference_mean`, clamped.
///
/// `None` means the mask has fewer than two strokes. Neither side
/// having pairs scores 100; exactly one side, or a zero reference
/// mean, scores [`ScoringConfig::neutral_spacing_score`].
#[must_use]
pub fn spacing_score(reference_mean: Option<f64>, user_mean: Option<f64>, config: &ScoringConfig) -> f64 {
    match (reference_mean, user_mean) {
        (None, None) => 100.0,
        (Some(r), Some(u)) if r > 0.0 => (100.0 - 100.0 * (r - u).abs() / r).clamp(0.0, 100.0),
        _ => config.neutral_spacing_score,
    }
}

/// Stroke orientation agreement over strokes paired by id.
///
/// Each pair scores `max(0, 100 − angle_penalty·Δ)` where `Δ` is the
/// axial difference of the orientations (at most 90°); the result is the
/// mean over `min(reference, user)` pairs. Neither side having oriented
/// strokes scores 100; exactly one side scores 0.
#[must_use]
pub fn angle_accuracy_score(reference: &StrokeLayout, user: &StrokeLayout, config: &ScoringConfig) -> f64 {
    let orientations = |layout: &StrokeLayout| -> Vec<f64> {
        layout
            .strokes
            .iter()
            .filter_map(|s| s.orientation_degrees)
            .collect()
    };
    let (reference, user) = (orientations(reference), orientations(user));
    match (reference.is_empty(), user.is_empty()) {
        (true, true) => 100.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let scores: Vec<f64> = reference
                .iter()
                .zip(&user)
                .map(|(r, u)| {
                    let diff = (r - u).abs() % 180.0;
                    let axial = diff.min(180.0 - diff);
                    config.angle_penalty.mul_add(-axial, 100.0).max(0.0)
                })
                .collect();
            crate::smooth::mean(&scores).unwrap_or(0.0)
        }
    }
}

/// Weighted mean `Σ wᵢ·sᵢ / Σ wᵢ`; 0 when every weight is zero.
#[must_use]
pub fn composite_score(categories: &[(&'static str, f64); 11], weights: &CompositeWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    categories
        .iter()
        .zip(weights.named())
        .map(|((_, score), (_, weight))| score * weight)
        .sum::<f64>()
        / total
}

/// Score a user analysis against a reference analysis.
#[must_use = "returns the score breakdown"]
pub fn score(
    reference: &MaskAnalysis,
    user: &MaskAnalysis,
    shape: &ShapeSimilarity,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    let skeleton_similarity = match (&shape.skeleton, reference.skeleton.is_empty(), user.skeleton.is_empty()) {
        (Some(proximity), _, _) => proximity.similarity,
        (None, true, true) => 100.0,
        (None, _, _) => 0.0,
    };

    let mut breakdown = ScoreBreakdown {
        thickness: thickness_score(
            reference.thickness.overall.as_ref().map(|p| &p.summary),
            user.thickness.overall.as_ref().map(|p| &p.summary),
            config,
        ),
        turning: turning_score(reference.turning_points.len(), user.turning_points.len(), config),
        spacing: spacing_score(
            reference.strokes.mean_distance(),
            user.strokes.mean_distance(),
            config,
        ),
        overlap: shape.overlap,
        size_match: shape.size_match,
        position_accuracy: shape.position_accuracy,
        stroke_match: shape.stroke_match,
        balance: shape.balance,
        skeleton_similarity,
        center_tip: user.center_tip.score.total,
        angle_accuracy: angle_accuracy_score(&reference.strokes, &user.strokes, config),
        composite: 0.0,
        grade: Grade::F,
    };
    breakdown.composite = composite_score(&breakdown.categories(), &config.composite);
    breakdown.grade = Grade::for_score(breakdown.composite, &config.grades);
    breakdown
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary(mean: f64, std_of_variation: f64) -> ThicknessSummary {
        ThicknessSummary {
            mean,
            max: mean,
            min: mean,
            std: 0.0,
            uniformity: 1.0,
            std_of_variation,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn thickness_penalizes_mean_and_variation_differences() {
        let config = ScoringConfig::default();
        let s = thickness_score(Some(&summary(10.0, 0.2)), Some(&summary(12.0, 0.5)), &config);
        // 100 - 5·2 - 10·0.3
        assert!(close(s, 87.0));
    }

    #[test]
    fn thickness_is_symmetric() {
        let config = ScoringConfig::default();
        let (a, b) = (summary(8.0, 0.1), summary(13.0, 0.9));
        assert!(close(
            thickness_score(Some(&a), Some(&b), &config),
            thickness_score(Some(&b), Some(&a), &config)
        ));
    }

    #[test]
    fn thickness_degenerate_cases() {
        let config = ScoringConfig::default();
        assert!(close(thickness_score(None, None, &config), 100.0));
        assert!(close(thickness_score(Some(&summary(5.0, 0.0)), None, &config), 0.0));
        assert!(close(
            thickness_score(Some(&summary(1.0, 0.0)), Some(&summary(100.0, 0.0)), &config),
            0.0
        ));
    }

    #[test]
    fn turning_cases() {
        let config = ScoringConfig::default();
        assert!(close(turning_score(0, 0, &config), 100.0));
        assert!(close(turning_score(0, 3, &config), 50.0));
        assert!(close(turning_score(3, 0, &config), 50.0));
        assert!(close(turning_score(2, 3, &config), 80.0));
        assert!(close(turning_score(1, 9, &config), 0.0));
        assert!(close(turning_score(4, 2, &config), turning_score(2, 4, &config)));
    }

    #[test]
    fn spacing_cases() {
        let config = ScoringConfig::default();
        assert!(close(spacing_score(None, None, &config), 100.0));
        assert!(close(spacing_score(Some(50.0), None, &config), 50.0));
        assert!(close(spacing_score(None, Some(50.0), &config), 50.0));
        assert!(close(spacing_score(Some(0.0), Some(10.0), &config), 50.0));
        assert!(close(spacing_score(Some(50.0), Some(40.0), &config), 80.0));
        assert!(close(spacing_score(Some(50.0), Some(200.0), &config), 0.0));
    }

    #[test]
    fn grade_cutoffs_are_inclusive() {
        let cutoffs = GradeCutoffs::default();
        assert_eq!(Grade::for_score(90.0, &cutoffs), Grade::A);
        assert_eq!(Grade::for_score(89.99, &cutoffs), Grade::B);
        assert_eq!(Grade::for_score(70.0, &cutoffs), Grade::C);
        assert_eq!(Grade::for_score(60.0, &cutoffs), Grade::D);
        assert_eq!(Grade::for_score(59.9, &cutoffs), Grade::F);
        assert_eq!(Grade::D.to_string(), "D");
    }

    #[test]
    fn default_composite_is_mean_of_four() {
        let categories = [
            ("thickness", 80.0),
            ("turning", 60.0),
            ("spacing", 100.0),
            ("overlap", 40.0),
            ("size_match", 0.0),
            ("position_accuracy", 0.0),
            ("stroke_match", 0.0),
            ("balance", 0.0),
            ("skeleton_similarity", 0.0),
            ("center_tip", 0.0),
            ("angle_accuracy", 0.0),
        ];
        assert!(close(composite_score(&categories, &CompositeWeights::default()), 70.0));
    }

    #[test]
    fn composite_with_custom_weights() {
        let mut categories = [("", 0.0); 11];
        categories[0] = ("thickness", 100.0);
        categories[9] = ("center_tip", 40.0);
        let weights = CompositeWeights {
            thickness: 1.0,
            turning: 0.0,
            spacing: 0.0,
            overlap: 0.0,
            center_tip: 3.0,
            ..CompositeWeights::default()
        };
        assert!(close(composite_score(&categories, &weights), 55.0));
    }

    #[test]
    fn category_names_match_weight_names() {
        let breakdown = ScoreBreakdown {
            thickness: 0.0,
            turning: 0.0,
            spacing: 0.0,
            overlap: 0.0,
            size_match: 0.0,
            position_accuracy: 0.0,
            stroke_match: 0.0,
            balance: 0.0,
            skeleton_similarity: 0.0,
            center_tip: 0.0,
            angle_accuracy: 0.0,
            composite: 0.0,
            grade: Grade::F,
        };
        let names: Vec<&str> = breakdown.categories().iter().map(|(n, _)| *n).collect();
        let weight_names: Vec<&str> = CompositeWeights::default()
            .named()
            .iter()
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(names, weight_names);
    }

    fn layout(orientations: &[Option<f64>]) -> StrokeLayout {
        use crate::strokes::{BoundingBox, StrokeComponent};
        StrokeLayout {
            strokes: orientations
                .iter()
                .enumerate()
                .map(|(id, &orientation_degrees)| StrokeComponent {
                    id,
                    area: 100,
                    centroid: crate::types::Point::new(0.0, 0.0),
                    bounding_box: BoundingBox {
                        min_x: 0,
                        min_y: 0,
                        max_x: 9,
                        max_y: 9,
                    },
                    orientation_degrees,
                })
                .collect(),
            pairs: Vec::new(),
        }
    }

    #[test]
    fn angle_accuracy_pairs_strokes_by_id() {
        let config = ScoringConfig::default();
        let reference = layout(&[Some(90.0), Some(0.0), Some(45.0)]);
        let user = layout(&[Some(80.0), Some(175.0)]);
        // Pairs: |90-80| = 10 -> 80; 0 vs 175 is 5 apart -> 90.
        assert!(close(angle_accuracy_score(&reference, &user, &config), 85.0));
        assert!(close(
            angle_accuracy_score(&user, &reference, &config),
            angle_accuracy_score(&reference, &user, &config)
        ));
    }

    #[test]
    fn perpendicular_strokes_score_zero() {
        let config = ScoringConfig::default();
        assert!(close(
            angle_accuracy_score(&layout(&[Some(0.0)]), &layout(&[Some(90.0)]), &config),
            0.0
        ));
    }

    #[test]
    fn angle_accuracy_degenerate_cases() {
        let config = ScoringConfig::default();
        let none = layout(&[None]);
        assert!(close(angle_accuracy_score(&none, &StrokeLayout::default(), &config), 100.0));
        assert!(close(angle_accuracy_score(&layout(&[Some(10.0)]), &none, &config), 0.0));
    }
}
