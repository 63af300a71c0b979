//! Skeleton extraction and canonical path traversal.
//!
//! Ink is thinned to a one-pixel-wide, connectivity-preserving medial
//! line with the Zhang-Suen algorithm. Short spurs left by thinning at
//! stroke ends are pruned, and the remaining pixels are decomposed into
//! ordered paths so that every along-the-stroke measurement (thickness
//! profile, turning angles) sees the same sequence on every run.
//!
//! # Traversal order
//!
//! 1. Skeleton components (8-connected) are visited in raster order of
//!    their first pixel.
//! 2. Within a component, a breadth-first search from the first
//!    remaining pixel finds the farthest pixel `A`; a second search from
//!    `A` finds the farthest pixel `B`. Ties go to the pixel that comes
//!    first in raster order. The shortest path `A → B` is the main path,
//!    oriented to start at whichever end comes first in raster order.
//! 3. The pixels left over (branches, corner pixels) are decomposed the
//!    same way, repeatedly, until the component is exhausted.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::SkeletonConfig;
use crate::types::{BinaryMask, NEIGHBORS_8, PixelPoint, Point};

/// Search order for path tracing: 4-connected steps before diagonals.
const STEP_ORDER: [(i64, i64); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// One ordered run of skeleton pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonPath {
    /// Index of the skeleton component this path belongs to.
    pub component: usize,
    /// Pixels in traversal order; consecutive pixels are 8-adjacent.
    pub points: Vec<PixelPoint>,
}

impl SkeletonPath {
    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the path has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The pixels as sub-pixel points.
    #[must_use]
    pub fn to_points(&self) -> Vec<Point> {
        self.points.iter().copied().map(Point::from).collect()
    }

    /// Arc length in pixels (diagonal steps count √2).
    #[must_use]
    pub fn arc_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| Point::from(w[0]).distance(Point::from(w[1])))
            .sum()
    }

    /// Local direction at `index`, in degrees within `[0, 180)`.
    ///
    /// Estimated from the chord between the samples `window` steps
    /// before and after, clamped to the path ends. `None` when the path
    /// is a single pixel or `index` is out of range.
    #[must_use]
    pub fn tangent_degrees(&self, index: usize, window: usize) -> Option<f64> {
        if index >= self.points.len() {
            return None;
        }
        let before = self.points[index.saturating_sub(window)];
        let after = self.points[(index + window).min(self.points.len() - 1)];
        if before == after {
            return None;
        }
        let (before, after) = (Point::from(before), Point::from(after));
        let (dx, dy) = (after.x - before.x, after.y - before.y);
        Some(dy.atan2(dx).to_degrees().rem_euclid(180.0))
    }
}

/// A one-pixel-wide skeleton with its canonical path decomposition.
///
/// Derived once per mask and immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    grid: BinaryMask,
    paths: Vec<SkeletonPath>,
    endpoints: Vec<PixelPoint>,
    junctions: Vec<PixelPoint>,
}

impl Skeleton {
    /// Thin `mask`, prune spurs, and trace paths.
    ///
    /// Masks too small to thin meaningfully yield an empty or tiny
    /// skeleton; this never fails.
    #[must_use = "returns the skeleton"]
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(w = mask.width(), h = mask.height()))
    )]
    pub fn from_mask(mask: &BinaryMask, config: &SkeletonConfig) -> Self {
        let thinned = thin(mask);
        let grid = prune_spurs(&thinned, config.spur_length);
        Self::from_grid(grid)
    }

    /// Wrap an already one-pixel-wide grid, computing paths and key
    /// points.
    #[must_use = "returns the skeleton"]
    pub fn from_grid(grid: BinaryMask) -> Self {
        let paths = trace_paths(&grid);
        let (endpoints, junctions) = key_points(&grid);
        Self {
            grid,
            paths,
            endpoints,
            junctions,
        }
    }

    /// The skeleton as a raster.
    #[must_use]
    pub const fn grid(&self) -> &BinaryMask {
        &self.grid
    }

    /// Paths in canonical traversal order.
    #[must_use]
    pub fn paths(&self) -> &[SkeletonPath] {
        &self.paths
    }

    /// Pixels where a stroke ends.
    #[must_use]
    pub fn endpoints(&self) -> &[PixelPoint] {
        &self.endpoints
    }

    /// Pixels where three or more branches meet.
    #[must_use]
    pub fn junctions(&self) -> &[PixelPoint] {
        &self.junctions
    }

    /// Total number of skeleton pixels.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.paths.iter().map(SkeletonPath::len).sum()
    }

    /// Returns `true` if the skeleton has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Every skeleton pixel, path by path, in traversal order.
    pub fn ordered_points(&self) -> impl Iterator<Item = PixelPoint> + '_ {
        self.paths.iter().flat_map(|p| p.points.iter().copied())
    }

    /// Every skeleton pixel paired with the path it belongs to and its
    /// index along that path, in traversal order.
    pub fn indexed_points(&self) -> impl Iterator<Item = (&SkeletonPath, usize)> + '_ {
        self.paths
            .iter()
            .flat_map(|path| (0..path.len()).map(move |i| (path, i)))
    }
}

/// Row-major boolean raster used while thinning.
struct Grid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Grid {
    fn from_mask(mask: &BinaryMask) -> Self {
        let (width, height) = (mask.width() as usize, mask.height() as usize);
        let cells = mask.as_image().pixels().map(|p| p.0[0] != 0).collect();
        Self {
            width,
            height,
            cells,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn at(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.cells[y as usize * self.width + x as usize]
    }

    /// Neighbors `P2..P9` clockwise from north.
    fn ring(&self, x: i64, y: i64) -> [bool; 8] {
        NEIGHBORS_8.map(|(dx, dy)| self.at(x + dx, y + dy))
    }
}

/// Number of background-to-ink transitions walking once around the ring.
fn crossings(ring: &[bool; 8]) -> usize {
    (0..8).filter(|&i| !ring[i] && ring[(i + 1) % 8]).count()
}

/// Zhang-Suen thinning.
///
/// Each pass runs two sub-iterations that delete boundary pixels whose
/// removal keeps the shape connected; the loop ends when a full pass
/// deletes nothing. Pixels outside the raster count as background.
#[must_use = "returns the thinned mask"]
#[allow(clippy::cast_possible_wrap)]
pub fn thin(mask: &BinaryMask) -> BinaryMask {
    let mut grid = Grid::from_mask(mask);

    loop {
        let mut changed = false;
        for first_step in [true, false] {
            let mut removals = Vec::new();
            for y in 0..grid.height {
                for x in 0..grid.width {
                    if !grid.cells[y * grid.width + x] {
                        continue;
                    }
                    let p = grid.ring(x as i64, y as i64);
                    let count = p.iter().filter(|&&b| b).count();
                    if !(2..=6).contains(&count) || crossings(&p) != 1 {
                        continue;
                    }
                    let [p2, _, p4, _, p6, _, p8, _] = p;
                    let keep = if first_step {
                        (p2 && p4 && p6) || (p4 && p6 && p8)
                    } else {
                        (p2 && p4 && p8) || (p2 && p6 && p8)
                    };
                    if !keep {
                        removals.push(y * grid.width + x);
                    }
                }
            }
            changed |= !removals.is_empty();
            for i in removals {
                grid.cells[i] = false;
            }
        }
        if !changed {
            break;
        }
    }

    let width = grid.width;
    BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
        grid.cells[y as usize * width + x as usize]
    })
}

fn crossing_number(grid: &BinaryMask, p: PixelPoint) -> usize {
    let (x, y) = (i64::from(p.x), i64::from(p.y));
    let ring = NEIGHBORS_8.map(|(dx, dy)| grid.is_ink_signed(x + dx, y + dy));
    crossings(&ring)
}

/// Endpoints (a single run of neighbors) and junctions (three or more
/// separate runs), each in raster order.
///
/// Using runs rather than raw neighbor counts keeps staircase corners,
/// where a pixel touches both a 4-neighbor and the diagonal beyond it,
/// from being reported as junctions.
#[must_use]
pub fn key_points(grid: &BinaryMask) -> (Vec<PixelPoint>, Vec<PixelPoint>) {
    let mut endpoints = Vec::new();
    let mut junctions = Vec::new();
    for p in grid.ink_pixels() {
        match crossing_number(grid, p) {
            1 => endpoints.push(p),
            n if n >= 3 => junctions.push(p),
            _ => {}
        }
    }
    (endpoints, junctions)
}

/// Ink 8-neighbors of `p`, in [`STEP_ORDER`].
fn steps(p: PixelPoint) -> impl Iterator<Item = PixelPoint> {
    let (x, y) = (i64::from(p.x), i64::from(p.y));
    STEP_ORDER.into_iter().filter_map(move |(dx, dy)| {
        let nx = u32::try_from(x + dx).ok()?;
        let ny = u32::try_from(y + dy).ok()?;
        Some(PixelPoint::new(nx, ny))
    })
}

/// Walk from an endpoint toward the first junction. Returns the
/// junction and the walked pixels (junction excluded) if a junction is
/// reached in fewer than `limit` steps.
fn spur_from(
    grid: &BinaryMask,
    start: PixelPoint,
    limit: usize,
) -> Option<(PixelPoint, Vec<PixelPoint>)> {
    let mut branch = vec![start];
    let mut current = start;
    loop {
        let next = steps(current)
            .find(|&n| grid.is_ink(n.x, n.y) && !branch.contains(&n))?;
        if crossing_number(grid, next) >= 3 {
            return Some((next, branch));
        }
        if branch.len() + 1 >= limit {
            return None;
        }
        branch.push(next);
        current = next;
    }
}

/// Remove endpoint-to-junction branches shorter than `spur_length`
/// pixels.
///
/// Lines with no junction (isolated strokes) are never pruned, however
/// short. When every branch at a junction is short, the longest one
/// (first endpoint in raster order on ties) is kept so a small fork or
/// cross does not collapse to its junction pixel. A `spur_length` of
/// zero returns the grid unchanged.
#[must_use = "returns the pruned skeleton grid"]
pub fn prune_spurs(grid: &BinaryMask, spur_length: usize) -> BinaryMask {
    let mut pruned = grid.clone();
    if spur_length == 0 {
        return pruned;
    }

    let (endpoints, _) = key_points(grid);
    let mut by_junction: BTreeMap<PixelPoint, Vec<Vec<PixelPoint>>> = BTreeMap::new();
    for end in endpoints {
        if let Some((junction, spur)) = spur_from(grid, end, spur_length) {
            by_junction.entry(junction).or_default().push(spur);
        }
    }

    for (junction, mut spurs) in by_junction {
        if spurs.len() >= crossing_number(grid, junction) {
            let longest = spurs
                .iter()
                .enumerate()
                .max_by_key(|(i, spur)| (spur.len(), Reverse(*i)))
                .map(|(i, _)| i);
            if let Some(i) = longest {
                spurs.swap_remove(i);
            }
        }
        for p in spurs.into_iter().flatten() {
            pruned.set(p.x, p.y, false);
        }
    }
    pruned
}

/// Breadth-first search within `allowed` from `source`. Returns the
/// farthest pixel (ties to the first in raster order) and the parent map.
fn farthest(
    source: PixelPoint,
    allowed: &BTreeSet<PixelPoint>,
) -> (PixelPoint, HashMap<PixelPoint, PixelPoint>) {
    let mut depth: HashMap<PixelPoint, usize> = HashMap::from([(source, 0)]);
    let mut parents = HashMap::new();
    let mut queue = VecDeque::from([source]);
    let mut best = (0, source);

    while let Some(current) = queue.pop_front() {
        let d = depth[&current];
        if d > best.0 || (d == best.0 && current < best.1) {
            best = (d, current);
        }
        for next in steps(current) {
            if allowed.contains(&next) && !depth.contains_key(&next) {
                depth.insert(next, d + 1);
                parents.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    (best.1, parents)
}

/// Pixels 8-connected to `seed` within `pool`.
fn flood(seed: PixelPoint, pool: &BTreeSet<PixelPoint>) -> BTreeSet<PixelPoint> {
    let mut members = BTreeSet::from([seed]);
    let mut stack = vec![seed];
    while let Some(current) = stack.pop() {
        for next in steps(current) {
            if pool.contains(&next) && members.insert(next) {
                stack.push(next);
            }
        }
    }
    members
}

/// Decompose a skeleton grid into ordered paths. See the module docs for
/// the traversal contract.
#[must_use = "returns the traced paths"]
pub fn trace_paths(grid: &BinaryMask) -> Vec<SkeletonPath> {
    let mut unvisited: BTreeSet<PixelPoint> = grid.ink_pixels().collect();
    let mut paths = Vec::new();
    let mut component = 0;

    while let Some(&seed) = unvisited.first() {
        let mut left = flood(seed, &unvisited);
        for p in &left {
            unvisited.remove(p);
        }

        while let Some(&start) = left.first() {
            let (a, _) = farthest(start, &left);
            let (b, parents) = farthest(a, &left);

            let mut points = vec![b];
            let mut current = b;
            while let Some(&parent) = parents.get(&current) {
                points.push(parent);
                current = parent;
            }
            // `points` runs b -> a; start at the raster-first end.
            if points.last() < points.first() {
                points.reverse();
            }

            for p in &points {
                left.remove(p);
            }
            paths.push(SkeletonPath { component, points });
        }
        component += 1;
    }
    paths
}
