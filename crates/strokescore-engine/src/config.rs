//! Analysis and scoring configuration.
//!
//! Every tunable constant of the engine lives in one of these records.
//! Scoring variants are expressed as different field values, never as
//! separate code paths. All records deserialize with `#[serde(default)]`
//! so a partial JSON document overrides only the fields it names.

use serde::{Deserialize, Serialize};

use crate::types::EngineError;

/// Top-level configuration passed to [`analyze_mask`](crate::analyze_mask)
/// and [`compare`](crate::compare).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Binarization and marking removal.
    pub mask: MaskConfig,
    /// Skeleton cleanup.
    pub skeleton: SkeletonConfig,
    /// Thickness profile smoothing.
    pub thickness: ThicknessConfig,
    /// Turning-point detection.
    pub turning: TurningConfig,
    /// Direction and speed sampling along skeleton paths.
    pub dynamics: DynamicsConfig,
    /// Center-tip sampling windows and aggregate weights.
    pub center_tip: CenterTipConfig,
    /// Stroke separation.
    pub strokes: StrokeConfig,
    /// Reference-versus-user shape and pressure comparison.
    pub comparison: ComparisonConfig,
    /// Category scoring coefficients.
    pub scoring: ScoringConfig,
}

impl AnalysisConfig {
    /// Check every numeric parameter for values that would make the
    /// analysis meaningless (zero windows, negative or non-finite
    /// thresholds).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), EngineError> {
        fn finite_non_negative(name: &str, value: f64) -> Result<(), EngineError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(EngineError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )))
            }
        }
        fn non_zero(name: &str, value: usize) -> Result<(), EngineError> {
            if value == 0 {
                Err(EngineError::InvalidConfig(format!("{name} must be at least 1")))
            } else {
                Ok(())
            }
        }

        non_zero("turning.window", self.turning.window)?;
        finite_non_negative("turning.threshold_degrees", self.turning.threshold_degrees)?;
        if !(self.thickness.smoothing_sigma.is_finite() && self.thickness.smoothing_sigma > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "thickness.smoothing_sigma must be positive, got {}",
                self.thickness.smoothing_sigma
            )));
        }
        non_zero("dynamics.window", self.dynamics.window)?;
        non_zero("center_tip.edge_stride", self.center_tip.edge_stride)?;
        non_zero("center_tip.ink_stride", self.center_tip.ink_stride)?;
        non_zero("center_tip.tangent_window", self.center_tip.tangent_window)?;
        finite_non_negative("center_tip.min_radius", self.center_tip.min_radius)?;
        finite_non_negative("comparison.match_radius", self.comparison.match_radius)?;
        let comparison = &self.comparison;
        for (kind, good, strong) in [
            ("pressure", comparison.pressure_good_percent, comparison.pressure_strong_percent),
            ("speed", comparison.speed_good_percent, comparison.speed_strong_percent),
        ] {
            finite_non_negative(&format!("comparison.{kind}_good_percent"), good)?;
            finite_non_negative(&format!("comparison.{kind}_strong_percent"), strong)?;
            if good > strong {
                return Err(EngineError::InvalidConfig(format!(
                    "comparison.{kind}_good_percent ({good}) exceeds {kind}_strong_percent ({strong})"
                )));
            }
        }
        if let Some(marking) = &self.mask.marking {
            for range in &marking.hue_ranges {
                let valid = (0.0..=360.0).contains(&range.start_degrees)
                    && (0.0..=360.0).contains(&range.end_degrees)
                    && range.start_degrees <= range.end_degrees;
                if !valid {
                    return Err(EngineError::InvalidConfig(format!(
                        "hue range {}..={} must lie within 0..=360 and be ascending",
                        range.start_degrees, range.end_degrees
                    )));
                }
            }
        }

        finite_non_negative("scoring.angle_penalty", self.scoring.angle_penalty)?;

        let weights = &self.scoring.composite;
        for (name, w) in weights.named() {
            finite_non_negative(&format!("scoring.composite.{name}"), w)?;
        }
        if weights.total() <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "scoring.composite must give at least one category a positive weight".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Binarization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Pixels with luminance at or below this value are ink.
    pub threshold: u8,
    /// Colored guide markings to remove from the ink. `None` disables
    /// marking removal.
    pub marking: Option<MarkingColor>,
}

impl MaskConfig {
    /// Default ink threshold (inverted binary threshold at mid-gray).
    pub const DEFAULT_THRESHOLD: u8 = 127;
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            marking: Some(MarkingColor::red()),
        }
    }
}

/// An inclusive hue interval in degrees (0..=360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueRange {
    /// Lower bound in degrees.
    pub start_degrees: f32,
    /// Upper bound in degrees.
    pub end_degrees: f32,
}

impl HueRange {
    /// Whether `hue` (degrees) falls inside the interval.
    #[must_use]
    pub fn contains(self, hue: f32) -> bool {
        (self.start_degrees..=self.end_degrees).contains(&hue)
    }
}

/// A marking color described in HSV space.
///
/// Several hue ranges are allowed so colors that straddle the 0°/360°
/// wraparound (red) can be described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingColor {
    /// Hue intervals that count as the marking color.
    pub hue_ranges: Vec<HueRange>,
    /// Minimum saturation (0-255 scale).
    pub min_saturation: u8,
    /// Minimum value/brightness (0-255 scale).
    pub min_value: u8,
}

impl MarkingColor {
    /// Red guide lines: hue within 20° of 0°, moderately saturated and
    /// not too dark.
    #[must_use]
    pub fn red() -> Self {
        Self {
            hue_ranges: vec![
                HueRange {
                    start_degrees: 0.0,
                    end_degrees: 20.0,
                },
                HueRange {
                    start_degrees: 340.0,
                    end_degrees: 360.0,
                },
            ],
            min_saturation: 50,
            min_value: 50,
        }
    }
}

/// Skeleton cleanup settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    /// Endpoint-to-junction branches with fewer pixels than this are
    /// pruned. Zero disables pruning.
    pub spur_length: usize,
}

impl SkeletonConfig {
    /// Default spur length in pixels.
    pub const DEFAULT_SPUR_LENGTH: usize = 5;
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            spur_length: Self::DEFAULT_SPUR_LENGTH,
        }
    }
}

/// Thickness profile settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThicknessConfig {
    /// Standard deviation of the 1-D Gaussian applied to the thickness
    /// sequence before differentiation.
    pub smoothing_sigma: f64,
}

impl ThicknessConfig {
    /// Default smoothing sigma in samples.
    pub const DEFAULT_SMOOTHING_SIGMA: f64 = 2.0;
}

impl Default for ThicknessConfig {
    fn default() -> Self {
        Self {
            smoothing_sigma: Self::DEFAULT_SMOOTHING_SIGMA,
        }
    }
}

/// Turning-point detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurningConfig {
    /// Number of skeleton samples on each side of the candidate point.
    pub window: usize,
    /// Deflections strictly greater than this (degrees) are turns.
    pub threshold_degrees: f64,
}

impl TurningConfig {
    /// Default half-window in samples.
    pub const DEFAULT_WINDOW: usize = 5;
    /// Default deflection threshold in degrees.
    pub const DEFAULT_THRESHOLD_DEGREES: f64 = 30.0;
}

impl Default for TurningConfig {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW,
            threshold_degrees: Self::DEFAULT_THRESHOLD_DEGREES,
        }
    }
}

/// Direction and speed sampling along skeleton paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Step, in path samples, between the two ends of each motion chord.
    pub window: usize,
}

impl DynamicsConfig {
    /// Default chord step.
    pub const DEFAULT_WINDOW: usize = 5;
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW,
        }
    }
}

/// Center-tip (symmetry) sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterTipConfig {
    /// Half-size of the square patch used for cross-section symmetry.
    pub patch_radius: u32,
    /// Skeleton points closer than this to the boundary are too thin to
    /// judge symmetry and are skipped.
    pub min_radius: f64,
    /// Half-size of the window searched for edge pixels.
    pub edge_window: u32,
    /// Edge-angle analysis runs on every n-th skeleton point.
    pub edge_stride: usize,
    /// Minimum edge pixels required for a principal-axis estimate.
    pub min_edge_pixels: usize,
    /// Canny low threshold for the edge map.
    pub canny_low: f32,
    /// Canny high threshold for the edge map.
    pub canny_high: f32,
    /// Ink cross-section extends this many pixels each side of the axis.
    pub ink_half_width: u32,
    /// Ink profile runs on every n-th skeleton point.
    pub ink_stride: usize,
    /// Half-window (samples) used to estimate the local tangent.
    pub tangent_window: usize,
    /// Aggregate weights and classification bands.
    pub weights: CenterTipWeights,
}

impl CenterTipConfig {
    /// Default symmetry patch half-size.
    pub const DEFAULT_PATCH_RADIUS: u32 = 5;
    /// Default edge window half-size.
    pub const DEFAULT_EDGE_WINDOW: u32 = 15;
    /// Default ink cross-section half-width.
    pub const DEFAULT_INK_HALF_WIDTH: u32 = 10;
}

impl Default for CenterTipConfig {
    fn default() -> Self {
        Self {
            patch_radius: Self::DEFAULT_PATCH_RADIUS,
            min_radius: 2.0,
            edge_window: Self::DEFAULT_EDGE_WINDOW,
            edge_stride: 5,
            min_edge_pixels: 4,
            canny_low: 50.0,
            canny_high: 150.0,
            ink_half_width: Self::DEFAULT_INK_HALF_WIDTH,
            ink_stride: 3,
            tangent_window: TurningConfig::DEFAULT_WINDOW,
            weights: CenterTipWeights::default(),
        }
    }
}

/// Coefficients of the center-tip aggregate score.
///
/// `total = symmetry·S + angle·A + ink·I` where
/// `S = 100·mean(symmetry)`,
/// `A = max(0, 100 − spread_penalty·mean(spread))` and
/// `I = 50·min(mean(concentration), concentration_cap)/concentration_cap
///      + max(0, 50 − asymmetry_penalty·mean(asymmetry))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterTipWeights {
    /// Weight of the symmetry sub-score.
    pub symmetry: f64,
    /// Weight of the edge-angle consistency sub-score.
    pub angle: f64,
    /// Weight of the ink distribution sub-score.
    pub ink: f64,
    /// Points deducted per unit of mean spread.
    pub spread_penalty: f64,
    /// Concentration ratios above this earn no extra credit.
    pub concentration_cap: f64,
    /// Points deducted per unit of mean asymmetry.
    pub asymmetry_penalty: f64,
    /// Totals at or above this are "well centered".
    pub well_centered_cutoff: f64,
    /// Totals at or above this (and below the well-centered cutoff) are
    /// "borderline".
    pub borderline_cutoff: f64,
}

impl Default for CenterTipWeights {
    fn default() -> Self {
        Self {
            symmetry: 0.4,
            angle: 0.3,
            ink: 0.3,
            spread_penalty: 10.0,
            concentration_cap: 2.0,
            asymmetry_penalty: 10.0,
            well_centered_cutoff: 80.0,
            borderline_cutoff: 60.0,
        }
    }
}

/// Stroke separation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Components with fewer ink pixels than this are noise.
    pub min_area: usize,
}

impl StrokeConfig {
    /// Default minimum stroke area in pixels.
    pub const DEFAULT_MIN_AREA: usize = 10;
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            min_area: Self::DEFAULT_MIN_AREA,
        }
    }
}

/// Settings for comparing a user mask against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Canny low threshold for the outline used by stroke matching.
    pub canny_low: f32,
    /// Canny high threshold for the outline used by stroke matching.
    pub canny_high: f32,
    /// User samples farther than this from every reference sample are
    /// left out of the pressure and speed comparisons.
    pub match_radius: f64,
    /// Pressure differences within this percentage are "good".
    pub pressure_good_percent: f64,
    /// Pressure differences beyond this percentage are "too heavy" or
    /// "too light".
    pub pressure_strong_percent: f64,
    /// Speed differences within this percentage are "good".
    pub speed_good_percent: f64,
    /// Speed differences beyond this percentage are "too fast" or
    /// "too slow".
    pub speed_strong_percent: f64,
}

impl ComparisonConfig {
    /// Default matching radius in pixels.
    pub const DEFAULT_MATCH_RADIUS: f64 = 50.0;
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            match_radius: Self::DEFAULT_MATCH_RADIUS,
            pressure_good_percent: 10.0,
            pressure_strong_percent: 30.0,
            speed_good_percent: 15.0,
            speed_strong_percent: 40.0,
        }
    }
}

/// Coefficients of the per-category comparison scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points deducted per pixel of mean thickness difference.
    pub thickness_mean_penalty: f64,
    /// Points deducted per unit of variation-std difference.
    pub thickness_variation_penalty: f64,
    /// Points deducted per turning point of count difference.
    pub turning_count_penalty: f64,
    /// Turning score when exactly one side has turning points.
    pub one_sided_turning_score: f64,
    /// Spacing score when it cannot be computed meaningfully.
    pub neutral_spacing_score: f64,
    /// Points deducted per degree of stroke orientation difference.
    pub angle_penalty: f64,
    /// Weights of each category in the composite.
    pub composite: CompositeWeights,
    /// Letter grade cutoffs.
    pub grades: GradeCutoffs,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            thickness_mean_penalty: 5.0,
            thickness_variation_penalty: 10.0,
            turning_count_penalty: 20.0,
            one_sided_turning_score: 50.0,
            neutral_spacing_score: 50.0,
            angle_penalty: 2.0,
            composite: CompositeWeights::default(),
            grades: GradeCutoffs::default(),
        }
    }
}

/// Per-category weights of the composite score.
///
/// The composite is `Σ wᵢ·sᵢ / Σ wᵢ`. The defaults weight thickness,
/// turning, spacing and overlap equally and leave the rest out, which
/// is an unweighted arithmetic mean of those four.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    /// Thickness consistency.
    pub thickness: f64,
    /// Turning accuracy.
    pub turning: f64,
    /// Spacing uniformity.
    pub spacing: f64,
    /// Mask intersection over union.
    pub overlap: f64,
    /// Ink area ratio.
    pub size_match: f64,
    /// Ink centroid agreement.
    pub position_accuracy: f64,
    /// Fraction of reference outline covered by the user outline.
    pub stroke_match: f64,
    /// Quadrant ink balance agreement.
    pub balance: f64,
    /// Skeleton proximity.
    pub skeleton_similarity: f64,
    /// The user's center-tip total.
    pub center_tip: f64,
    /// Stroke orientation agreement.
    pub angle_accuracy: f64,
}

impl CompositeWeights {
    /// `(name, weight)` pairs in report order.
    #[must_use]
    pub const fn named(&self) -> [(&'static str, f64); 11] {
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

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.named().iter().map(|(_, w)| w).sum()
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            thickness: 1.0,
            turning: 1.0,
            spacing: 1.0,
            overlap: 1.0,
            size_match: 0.0,
            position_accuracy: 0.0,
            stroke_match: 0.0,
            balance: 0.0,
            skeleton_similarity: 0.0,
            center_tip: 0.0,
            angle_accuracy: 0.0,
        }
    }
}

/// Minimum composite score for each letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeCutoffs {
    /// Minimum for an A.
    pub a: f64,
    /// Minimum for a B.
    pub b: f64,
    /// Minimum for a C.
    pub c: f64,
    /// Minimum for a D.
    pub d: f64,
}

impl Default for GradeCutoffs {
    fn default() -> Self {
        Self {
            a: 90.0,
            b: 80.0,
            c: 70.0,
            d: 60.0,
        }
    }
}
