//! Stroke separation and inter-stroke spacing.
//!
//! Each 8-connected ink component is treated as one stroke. Components
//! smaller than [`StrokeConfig::min_area`] are discarded as noise; the
//! survivors are numbered in raster order of their first pixel.

use std::collections::HashMap;

use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::center_tip::principal_axis;
use crate::config::StrokeConfig;
use crate::smooth;
use crate::types::{BinaryMask, Point};

/// Inclusive pixel bounds of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column.
    pub max_x: u32,
    /// Bottom row.
    pub max_y: u32,
}

impl BoundingBox {
    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// One connected ink component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeComponent {
    /// Position in raster order of first pixel, after noise filtering.
    pub id: usize,
    /// Ink pixel count.
    pub area: usize,
    /// Mean pixel position.
    pub centroid: Point,
    /// Pixel bounds.
    pub bounding_box: BoundingBox,
    /// Major-axis direction in degrees `[0, 180)`; `None` for a
    /// single-pixel component.
    pub orientation_degrees: Option<f64>,
}

/// Where the second stroke of a pair lies relative to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativePosition {
    /// Mostly to the right.
    Horizontal,
    /// Mostly to the left.
    HorizontalReversed,
    /// Mostly below.
    Vertical,
    /// Mostly above.
    VerticalReversed,
}

impl RelativePosition {
    /// Classify the displacement `(dx, dy)` from one centroid to another.
    ///
    /// Horizontal wins only when `|dx|` strictly exceeds `|dy|`.
    #[must_use]
    pub fn from_offset(dx: f64, dy: f64) -> Self {
        if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Self::Horizontal
            } else {
                Self::HorizontalReversed
            }
        } else if dy > 0.0 {
            Self::Vertical
        } else {
            Self::VerticalReversed
        }
    }
}

impl std::fmt::Display for RelativePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Horizontal => "horizontal",
            Self::HorizontalReversed => "horizontal_reversed",
            Self::Vertical => "vertical",
            Self::VerticalReversed => "vertical_reversed",
        })
    }
}

/// Spacing between two strokes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePair {
    /// Id of the earlier stroke.
    pub first: usize,
    /// Id of the later stroke.
    pub second: usize,
    /// Euclidean distance between centroids.
    pub distance: f64,
    /// Direction from `first` to `second`.
    pub relative_position: RelativePosition,
}

/// All strokes of a mask and every pairwise spacing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrokeLayout {
    /// Strokes ordered by id.
    pub strokes: Vec<StrokeComponent>,
    /// Every unordered pair `(a, b)` with `a < b`, ordered by `(a, b)`.
    pub pairs: Vec<StrokePair>,
}

impl StrokeLayout {
    /// Mean centroid distance over all pairs; `None` with fewer than two
    /// strokes.
    #[must_use]
    pub fn mean_distance(&self) -> Option<f64> {
        let distances: Vec<f64> = self.pairs.iter().map(|p| p.distance).collect();
        smooth::mean(&distances)
    }

    /// Axis deviations and diagonal consistency over every oriented
    /// stroke.
    #[must_use]
    pub fn angles(&self) -> StrokeAngles {
        let orientations: Vec<f64> = self
            .strokes
            .iter()
            .filter_map(|s| s.orientation_degrees)
            .collect();
        StrokeAngles::from_orientations(&orientations)
    }
}

/// Strokes within this many degrees of an axis count as axis-aligned.
const AXIS_TOLERANCE_DEGREES: f64 = 20.0;

/// How closely strokes follow the horizontal and vertical axes, and how
/// consistent the slanted ones are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeAngles {
    /// Mean `|90 − a|` over strokes within 20° of vertical; 0 if none.
    pub vertical_deviation: f64,
    /// Mean deviation from horizontal over strokes within 20° of it; 0
    /// if none.
    pub horizontal_deviation: f64,
    /// `max(0, 100 − std)` of the slant of strokes strictly between 20°
    /// and 70° from horizontal; 100 with fewer than two such strokes.
    pub diagonal_consistency: f64,
}

impl StrokeAngles {
    /// Summarize orientations in degrees `[0, 180)`.
    #[must_use]
    pub fn from_orientations(orientations: &[f64]) -> Self {
        let mut vertical = Vec::new();
        let mut horizontal = Vec::new();
        let mut diagonal = Vec::new();
        for &a in orientations {
            let from_horizontal = a.min(180.0 - a);
            if from_horizontal < AXIS_TOLERANCE_DEGREES {
                horizontal.push(from_horizontal);
            } else if from_horizontal > 90.0 - AXIS_TOLERANCE_DEGREES {
                vertical.push(90.0 - from_horizontal);
            } else if from_horizontal > AXIS_TOLERANCE_DEGREES {
                diagonal.push(from_horizontal);
            }
        }

        let diagonal_consistency = if diagonal.len() > 1 {
            smooth::std_dev(&diagonal).map_or(100.0, |std| (100.0 - std).max(0.0))
        } else {
            100.0
        };
        Self {
            vertical_deviation: smooth::mean(&vertical).unwrap_or(0.0),
            horizontal_deviation: smooth::mean(&horizontal).unwrap_or(0.0),
            diagonal_consistency,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    first_seen: usize,
    area: usize,
    sum_x: f64,
    sum_y: f64,
    bounds: Option<BoundingBox>,
    points: Vec<Point>,
}

impl Accumulator {
    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.sum_x += f64::from(x);
        self.sum_y += f64::from(y);
        self.points.push(Point::new(f64::from(x), f64::from(y)));
        self.bounds = Some(self.bounds.map_or(
            BoundingBox {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            },
            |b| BoundingBox {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        ));
    }
}

/// Separate `mask` into strokes and measure pairwise spacing.
#[must_use = "returns the stroke layout"]
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(ink = mask.ink_count()))
)]
#[allow(clippy::cast_precision_loss)]
pub fn separate_strokes(mask: &BinaryMask, config: &StrokeConfig) -> StrokeLayout {
    let labels = connected_components(mask.as_image(), Connectivity::Eight, image::Luma([0u8]));

    let mut components: HashMap<u32, Accumulator> = HashMap::new();
    let mut order = 0;
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        components
            .entry(label)
            .or_insert_with(|| {
                order += 1;
                Accumulator {
                    first_seen: order,
                    ..Accumulator::default()
                }
            })
            .add(x, y);
    }

    let mut kept: Vec<Accumulator> = components
        .into_values()
        .filter(|c| c.area >= config.min_area)
        .collect();
    kept.sort_by_key(|c| c.first_seen);

    let strokes: Vec<StrokeComponent> = kept
        .into_iter()
        .enumerate()
        .filter_map(|(id, c)| {
            let area = c.area as f64;
            Some(StrokeComponent {
                id,
                area: c.area,
                centroid: Point::new(c.sum_x / area, c.sum_y / area),
                bounding_box: c.bounds?,
                orientation_degrees: principal_axis(&c.points).map(|a| a.angle_degrees),
            })
        })
        .collect();

    let mut pairs = Vec::new();
    for (i, a) in strokes.iter().enumerate() {
        for b in &strokes[i + 1..] {
            let (dx, dy) = (b.centroid.x - a.centroid.x, b.centroid.y - a.centroid.y);
            pairs.push(StrokePair {
                first: a.id,
                second: b.id,
                distance: dx.hypot(dy),
                relative_position: RelativePosition::from_offset(dx, dy),
            });
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(strokes = strokes.len(), pairs = pairs.len(), "strokes separated");

    StrokeLayout { strokes, pairs }
}
