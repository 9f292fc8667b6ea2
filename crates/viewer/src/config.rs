//! Viewer configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! wants to change.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tree::{BuildOptions, LayoutParams, LevelLimits};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    // Layout
    /// Sibling separation, in node diameters.
    pub spacing_factor: f32,
    /// Extra radial margin per level, in node diameters.
    pub level_margin_factor: f32,
    /// Deepest level built; negative builds nothing.
    pub max_depth: i32,
    /// Per-level node caps.
    pub level_limits: LevelLimits,
    pub root_radius: f32,
    pub node_radius: f32,
    /// Spacing between trees of the forest grid.
    pub tree_gap: f32,

    // Camera
    /// Ascending discrete zoom factors.
    pub zoom_steps: Vec<f32>,
    pub initial_zoom: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Camera distance at zoom 1.
    pub base_distance: f32,
    /// Direction from the target to the camera.
    pub camera_direction: Vec3,
    pub viewport_width: f32,
    pub viewport_height: f32,

    // Selection
    pub selected_scale: f32,
    /// Zoom multiplier applied while a node is selected.
    pub selection_zoom_multiplier: f32,
    /// Fraction of the remaining distance covered per 60 Hz frame.
    pub motion_rate: f32,

    // Detail mode
    /// Share of the viewport width the focused node should fill.
    pub detail_mode_screen_size_percent: f32,
    /// Seconds.
    pub detail_mode_animation_time: f32,
    /// Reference distance for the detail-mode scale.
    pub standard_distance: f32,
    pub detail_zoom: f32,

    // Decorations
    pub fireflies_per_node: usize,
    pub firefly_seed: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let layout = LayoutParams::default();
        Self {
            spacing_factor: layout.spacing_factor,
            level_margin_factor: layout.level_margin_factor,
            max_depth: 3,
            level_limits: LevelLimits::default(),
            root_radius: layout.root_radius,
            node_radius: layout.node_radius,
            tree_gap: 400.0,

            zoom_steps: vec![0.015, 0.05, 0.2, 0.5, 1.0, 2.0, 3.0],
            initial_zoom: 0.2,
            fov: 55.0,
            base_distance: 1280.6,
            camera_direction: Vec3::new(0.0, 0.8, 0.6),
            viewport_width: 1920.0,
            viewport_height: 1080.0,

            selected_scale: 1.5,
            selection_zoom_multiplier: 2.0,
            motion_rate: 0.15,

            detail_mode_screen_size_percent: 22.0,
            detail_mode_animation_time: 1.2,
            standard_distance: 1280.6,
            detail_zoom: 1.0,

            fireflies_per_node: 3,
            firefly_seed: 7,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            spacing_factor: self.spacing_factor,
            level_margin_factor: self.level_margin_factor,
            root_radius: self.root_radius,
            node_radius: self.node_radius,
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            max_depth: self.max_depth,
            level_limits: self.level_limits.clone(),
            layout: self.layout_params(),
            tree_gap: self.tree_gap,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.viewport_height > 0.0 {
            self.viewport_width / self.viewport_height
        } else {
            1.0
        }
    }
}
