//! Hierarchical tree model and radial layout.
//!
//! Builds forests from flat parent-pointer records and lays each tree out
//! as concentric rings around its root. Designed for testability: no
//! rendering or camera types leak in here.

pub mod builder;
pub mod layout;
mod record;
mod tree;

pub use builder::{
    build_forest, filter_by_level_limits, layout_forest, BuildOptions, LaidOutTree, LevelLimits,
    TreeBuilder,
};
pub use layout::{
    angular_distance, assign_angles, calculate_level_radii, calculate_max_tree_radius,
    calculate_positions, circular_mean, grid_offsets, normalize_angle, LayoutParams, LevelRadii,
};
pub use record::{NodeId, Record};
pub use tree::{NodeKey, Tree, TreeNode};
