//! Pure radial layout computation.
//!
//! Turns a [`Tree`] into 3D positions: leaves are spread evenly around the
//! circle, internal nodes sit at the circular mean of their children, and
//! each level gets a ring radius large enough to keep same-level nodes
//! apart. Angles and radii are computed independently: angles need the
//! whole tree, radii only depend on the level.
//!
//! No hidden state. Every function here is re-entrant and calling it twice
//! on the same input produces bit-identical output.

use crate::{NodeKey, Tree};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Gaps below this (radians) are treated as coincident angles.
pub const COINCIDENT_ANGLE_EPSILON: f32 = 1e-3;

/// Multiplier applied to the outer bound used for grid packing.
pub const OUTER_RADIUS_SAFETY: f32 = 1.1;

/// Tunable spacing parameters for the radial layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Minimum chord between same-level nodes, in node diameters.
    pub spacing_factor: f32,
    /// Extra radial margin per level, in node diameters.
    pub level_margin_factor: f32,
    /// Visual radius of a root sphere.
    pub root_radius: f32,
    /// Visual radius of a non-root sphere.
    pub node_radius: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            spacing_factor: 1.2,
            level_margin_factor: 0.15,
            root_radius: 200.0,
            node_radius: 135.0,
        }
    }
}

impl LayoutParams {
    pub fn node_diameter(&self) -> f32 {
        self.node_radius * 2.0
    }

    /// Minimum radial gap between consecutive rings.
    pub fn level_separation(&self) -> f32 {
        self.root_radius + self.node_radius
    }
}

/// Ring radius for each level of one tree. `radius(0)` is always 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelRadii(Vec<f32>);

impl Default for LevelRadii {
    fn default() -> Self {
        Self(vec![0.0])
    }
}

impl LevelRadii {
    pub fn get(&self, level: usize) -> Option<f32> {
        self.0.get(level).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of levels, including the root level.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Radius of the outermost ring.
    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0, f32::max)
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Shortest distance between two angles on the circle.
pub fn angular_distance(a: f32, b: f32) -> f32 {
    let diff = (a - b).rem_euclid(TAU);
    diff.min(TAU - diff)
}

/// Circular mean of a set of angles, normalized to `[0, 2π)`.
///
/// Unlike the arithmetic mean this handles sets straddling the 0/2π seam:
/// `{0.1, 2π - 0.1}` averages to 0, not π.
pub fn circular_mean(angles: impl IntoIterator<Item = f32>) -> f32 {
    let (sin_sum, cos_sum) = angles
        .into_iter()
        .fold((0.0_f32, 0.0_f32), |(s, c), a| (s + a.sin(), c + a.cos()));
    normalize_angle(sin_sum.atan2(cos_sum))
}

/// Assigns an angle to every node of the tree.
///
/// Leaves are spread evenly in left-to-right order at
/// `2π (i + 0.5) / leaf_count`; internal nodes take the circular mean of
/// their children.
pub fn assign_angles(tree: &mut Tree) {
    let order = tree.preorder();
    let leaves: Vec<NodeKey> = order
        .iter()
        .copied()
        .filter(|key| tree.get(*key).is_some_and(|n| n.is_leaf()))
        .collect();
    let leaf_count = leaves.len().max(1) as f32;

    for (i, key) in leaves.iter().enumerate() {
        if let Some(node) = tree.get_mut(*key) {
            node.angle = normalize_angle(TAU * (i as f32 + 0.5) / leaf_count);
        }
    }

    // Reverse pre-order visits every child before its parent.
    for key in order.iter().rev() {
        let child_angles: Vec<f32> = match tree.get(*key) {
            Some(node) if !node.is_leaf() => node
                .children
                .iter()
                .filter_map(|child| tree.get(*child).map(|c| c.angle))
                .collect(),
            _ => continue,
        };
        if let Some(node) = tree.get_mut(*key) {
            node.angle = circular_mean(child_angles);
        }
    }
}

/// Smallest gap between neighbouring angles, wrapping at 2π.
///
/// Returns `None` when fewer than two angles exist.
fn min_angular_gap(angles: &mut [f32]) -> Option<f32> {
    if angles.len() < 2 {
        return None;
    }
    angles.sort_by(f32::total_cmp);
    let wrap = TAU - angles[angles.len() - 1] + angles[0];
    let gap = angles
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold(wrap, f32::min);
    Some(gap)
}

/// Computes the ring radius of every level from the current node angles.
///
/// Expects angles to be assigned already (see [`assign_angles`]).
pub fn calculate_level_radii(tree: &Tree, params: &LayoutParams) -> LevelRadii {
    let max_level = tree.max_level();
    let mut angles_by_level: Vec<Vec<f32>> = vec![Vec::new(); max_level + 1];
    for node in tree.nodes() {
        angles_by_level[node.level].push(node.angle);
    }

    let diameter = params.node_diameter();
    let separation = params.level_separation();
    let chord = params.spacing_factor * diameter;
    let margin_factor = params.level_margin_factor.max(0.0);

    let mut radii = Vec::with_capacity(max_level + 1);
    radii.push(0.0);

    for level in 1..=max_level {
        let previous = radii[level - 1];
        let spacing_radius = match min_angular_gap(&mut angles_by_level[level]) {
            None => 0.0,
            Some(gap) if gap < COINCIDENT_ANGLE_EPSILON => {
                log::debug!("coincident angles at level {level}, using fallback radius");
                previous + 2.0 * separation
            }
            Some(gap) => chord / (2.0 * (gap / 2.0).sin()),
        };
        let margin = level as f32 * margin_factor * diameter;
        radii.push(spacing_radius.max(previous + separation) + margin);
    }

    LevelRadii(radii)
}

/// Lays out the whole tree around `offset`.
///
/// Assigns angles, solves the level radii, then places every non-root node
/// on its ring. Roots sit exactly at `offset`. Returns the radius table.
pub fn calculate_positions(tree: &mut Tree, params: &LayoutParams, offset: Vec3) -> LevelRadii {
    assign_angles(tree);
    let radii = calculate_level_radii(tree, params);

    for key in tree.preorder() {
        if let Some(node) = tree.get_mut(key) {
            node.position = if node.level == 0 {
                offset
            } else {
                let radius = radii.get(node.level).unwrap_or(0.0);
                Vec3::new(
                    offset.x + radius * node.angle.cos(),
                    offset.y,
                    offset.z + radius * node.angle.sin(),
                )
            };
        }
    }

    radii
}

/// Outer bound of a laid-out tree, including the outer node and a safety
/// margin.
pub fn outer_radius(radii: &LevelRadii, params: &LayoutParams) -> f32 {
    let bound = if radii.len() <= 1 {
        params.root_radius
    } else {
        radii.max() + params.node_radius
    };
    bound * OUTER_RADIUS_SAFETY
}

/// Outer bound of the tree as [`calculate_positions`] would lay it out.
///
/// Runs the same angle and radius passes so both call sites agree.
pub fn calculate_max_tree_radius(tree: &mut Tree, params: &LayoutParams) -> f32 {
    assign_angles(tree);
    let radii = calculate_level_radii(tree, params);
    outer_radius(&radii, params)
}

/// Centers of a near-square grid of trees on the XZ plane.
///
/// Cells are uniform: twice the largest outer radius plus `gap`, so no two
/// trees overlap. The grid is centered on the origin.
pub fn grid_offsets(outer_radii: &[f32], gap: f32) -> Vec<Vec3> {
    let count = outer_radii.len();
    if count == 0 {
        return Vec::new();
    }
    let columns = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(columns);
    let cell = 2.0 * outer_radii.iter().copied().fold(0.0, f32::max) + gap.max(0.0);

    let half_columns = (columns as f32 - 1.0) / 2.0;
    let half_rows = (rows as f32 - 1.0) / 2.0;

    (0..count)
        .map(|i| {
            let column = (i % columns) as f32;
            let row = (i / columns) as f32;
            Vec3::new((column - half_columns) * cell, 0.0, (row - half_rows) * cell)
        })
        .collect()
}
