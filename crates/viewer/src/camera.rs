//! Camera state: discrete zoom steps, panning and temporary overrides.
//!
//! The camera always sits at `target + direction * distance`, where the
//! distance is `base_distance / zoom`. Selection and detail mode steer it
//! through a zoom override and a look-at override instead of touching the
//! step table.

use crate::config::ViewerConfig;
use glam::{Vec2, Vec3};
use scene_graph::Ray;
use serde::{Deserialize, Serialize};

/// Width of the view frustum at `distance`.
pub fn visible_width(fov_degrees: f32, aspect: f32, distance: f32) -> f32 {
    2.0 * (fov_degrees.to_radians() / 2.0).tan() * distance * aspect
}

/// Index of the step nearest to `value`. Ties go to the lower step.
fn nearest_step(steps: &[f32], value: f32) -> usize {
    let mut best = 0;
    for (index, step) in steps.iter().enumerate() {
        if (step - value).abs() < (steps[best] - value).abs() {
            best = index;
        }
    }
    best
}

/// Everything a renderer needs to place the camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
}

/// Camera state captured before detail mode takes over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSnapshot {
    pub target: Vec3,
    pub zoom_index: usize,
    pub zoom: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Glide {
    target: Vec3,
    /// `None` glides back to the current step and clears the override.
    zoom: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct CameraManager {
    configured_steps: Vec<f32>,
    steps: Vec<f32>,
    zoom_index: usize,
    zoom_override: Option<f32>,
    look_override: Option<Vec3>,
    target: Vec3,
    direction: Vec3,
    base_distance: f32,
    fov: f32,
    viewport: Vec2,
    controls_enabled: bool,
    glide: Option<Glide>,
}

impl CameraManager {
    pub fn new(config: &ViewerConfig) -> Self {
        let mut steps: Vec<f32> = config
            .zoom_steps
            .iter()
            .copied()
            .filter(|s| s.is_finite() && *s > 0.0)
            .collect();
        steps.sort_by(f32::total_cmp);
        steps.dedup();
        if steps.is_empty() {
            log::warn!("no usable zoom steps configured, falling back to 1.0");
            steps.push(1.0);
        }

        let zoom_index = nearest_step(&steps, config.initial_zoom);
        let direction = config.camera_direction.try_normalize().unwrap_or(Vec3::Y);

        Self {
            configured_steps: steps.clone(),
            steps,
            zoom_index,
            zoom_override: None,
            look_override: None,
            target: Vec3::ZERO,
            direction,
            base_distance: config.base_distance.max(f32::EPSILON),
            fov: config.fov,
            viewport: Vec2::new(
                config.viewport_width.max(1.0),
                config.viewport_height.max(1.0),
            ),
            controls_enabled: true,
            glide: None,
        }
    }

    // Zoom

    pub fn zoom_steps(&self) -> &[f32] {
        &self.steps
    }

    pub fn zoom_index(&self) -> usize {
        self.zoom_index
    }

    /// Value of the current zoom step.
    pub fn step_zoom(&self) -> f32 {
        self.steps[self.zoom_index]
    }

    /// Effective zoom, honouring any override.
    pub fn zoom(&self) -> f32 {
        self.zoom_override.unwrap_or_else(|| self.step_zoom())
    }

    pub fn min_zoom(&self) -> f32 {
        self.steps[0]
    }

    /// Lowest step of the configured table, before any minimum override.
    pub fn configured_min_zoom(&self) -> f32 {
        self.configured_steps[0]
    }

    pub fn zoom_in(&mut self) -> bool {
        if !self.controls_enabled || self.zoom_index + 1 >= self.steps.len() {
            return false;
        }
        self.zoom_index += 1;
        self.zoom_override = None;
        self.glide = None;
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if !self.controls_enabled || self.zoom_index == 0 {
            return false;
        }
        self.zoom_index -= 1;
        self.zoom_override = None;
        self.glide = None;
        true
    }

    /// Snaps an arbitrary zoom value to the nearest step.
    pub fn set_zoom(&mut self, value: f32) -> bool {
        if !self.controls_enabled || !value.is_finite() {
            return false;
        }
        self.zoom_index = nearest_step(&self.steps, value);
        self.zoom_override = None;
        self.glide = None;
        true
    }

    /// Replaces the lowest zoom step.
    ///
    /// The table becomes `new_min` followed by the configured steps above
    /// it. A lower minimum means the scene grew, so the camera snaps to it.
    /// Otherwise the current zoom value is kept, clamped to the new minimum.
    /// Returns whether the camera snapped.
    pub fn set_min_zoom(&mut self, new_min: f32) -> bool {
        if !new_min.is_finite() || new_min <= 0.0 {
            log::warn!("ignoring invalid minimum zoom {new_min}");
            return false;
        }

        let previous_min = self.steps[0];
        let current = self.step_zoom();
        self.steps = std::iter::once(new_min)
            .chain(self.configured_steps.iter().copied().filter(|s| *s > new_min))
            .collect();

        if new_min < previous_min {
            log::debug!("minimum zoom lowered {previous_min} -> {new_min}, snapping");
            self.zoom_index = 0;
            self.zoom_override = None;
            self.glide = None;
            true
        } else {
            self.zoom_index = nearest_step(&self.steps, current.max(new_min));
            false
        }
    }

    /// Restores a zoom step captured earlier and drops any override.
    pub fn restore_zoom_index(&mut self, index: usize) {
        self.zoom_index = index.min(self.steps.len() - 1);
        self.zoom_override = None;
    }

    pub fn zoom_override(&self) -> Option<f32> {
        self.zoom_override
    }

    pub fn set_zoom_override(&mut self, zoom: Option<f32>) {
        self.zoom_override = zoom.filter(|z| z.is_finite() && *z > 0.0);
        self.glide = None;
    }

    // Position

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.glide = None;
    }

    pub fn look_override(&self) -> Option<Vec3> {
        self.look_override
    }

    pub fn set_look_override(&mut self, look_at: Option<Vec3>) {
        self.look_override = look_at;
    }

    pub fn distance(&self) -> f32 {
        self.base_distance / self.zoom()
    }

    pub fn position(&self) -> Vec3 {
        self.target + self.direction * self.distance()
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_override.unwrap_or(self.target)
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position(),
            target: self.look_at(),
            fov: self.fov,
            aspect: self.aspect(),
        }
    }

    // Smooth moves

    /// Starts moving the target and zoom toward new values.
    ///
    /// A zoom of `None` returns to the current step and clears the override.
    pub fn glide_to(&mut self, target: Vec3, zoom: Option<f32>) {
        self.glide = Some(Glide { target, zoom });
    }

    /// Jumps to the end of a running glide.
    pub fn finish_glide(&mut self) {
        if let Some(glide) = self.glide.take() {
            self.target = glide.target;
            self.zoom_override = glide.zoom;
        }
    }

    pub fn is_gliding(&self) -> bool {
        self.glide.is_some()
    }

    /// Advances a glide by `factor` of the remaining distance.
    pub fn step_glide(&mut self, factor: f32) {
        let Some(glide) = self.glide else {
            return;
        };
        let factor = factor.clamp(0.0, 1.0);

        self.target = self.target.lerp(glide.target, factor);
        let goal_zoom = glide.zoom.unwrap_or_else(|| self.step_zoom());
        let zoom = self.zoom();
        let next_zoom = zoom + (goal_zoom - zoom) * factor;
        self.zoom_override = Some(next_zoom);

        let arrived = self.target.distance(glide.target) < scene_graph::MOTION_EPSILON
            && (next_zoom - goal_zoom).abs() < 1e-4;
        if arrived {
            self.target = glide.target;
            self.zoom_override = glide.zoom;
            self.glide = None;
        }
    }

    // Panning

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    /// World units moved per screen pixel at the current distance.
    pub fn pan_speed(&self) -> f32 {
        visible_width(self.fov, self.aspect(), self.distance()) / self.viewport.x
    }

    /// Pans so the scene follows a pointer moved by `delta` pixels.
    pub fn pan_target(&mut self, delta: Vec2) -> bool {
        if !self.controls_enabled {
            return false;
        }
        let (right, forward) = self.ground_axes();
        let speed = self.pan_speed();
        self.target += (-right * delta.x + forward * delta.y) * speed;
        self.glide = None;
        true
    }

    /// Screen-right and screen-up directions projected onto the ground.
    fn ground_axes(&self) -> (Vec3, Vec3) {
        let forward = -self.direction;
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let ground_forward = Vec3::new(forward.x, 0.0, forward.z)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        (right, ground_forward)
    }

    // Viewport

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.viewport = Vec2::new(width, height);
        }
    }

    /// Picking ray through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let position = self.position();
        let forward = (self.look_at() - position)
            .try_normalize()
            .unwrap_or(-self.direction);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        let half_height = (self.fov.to_radians() / 2.0).tan();
        let direction = forward
            + right * ndc.x * half_height * self.aspect()
            + up * ndc.y * half_height;
        Ray::new(position, direction)
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            target: self.target,
            zoom_index: self.zoom_index,
            zoom: self.zoom(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraManager {
        CameraManager::new(&ViewerConfig::default())
    }

    #[test]
    fn test_set_zoom_snaps_to_nearest_step() {
        let mut camera = camera();
        assert!(camera.set_zoom(0.37));
        assert_eq!(camera.step_zoom(), 0.5);

        camera.set_zoom(100.0);
        assert_eq!(camera.step_zoom(), 3.0);
    }

    #[test]
    fn test_set_zoom_tie_goes_to_lower_step() {
        let mut config = ViewerConfig::default();
        config.zoom_steps = vec![1.0, 2.0, 3.0];
        let mut camera = CameraManager::new(&config);

        camera.set_zoom(1.5);
        assert_eq!(camera.step_zoom(), 1.0);
    }

    #[test]
    fn test_zoom_in_out_clamps_at_ends() {
        let mut camera = camera();
        while camera.zoom_in() {}
        assert_eq!(camera.step_zoom(), 3.0);
        assert!(!camera.zoom_in());

        while camera.zoom_out() {}
        assert_eq!(camera.step_zoom(), 0.015);
        assert!(!camera.zoom_out());
    }

    #[test]
    fn test_lower_min_zoom_snaps() {
        let mut camera = camera();
        camera.set_zoom(2.0);

        assert!(camera.set_min_zoom(0.01));
        assert_eq!(
            camera.zoom_steps(),
            &[0.01, 0.015, 0.05, 0.2, 0.5, 1.0, 2.0, 3.0]
        );
        assert_eq!(camera.step_zoom(), 0.01);
    }

    #[test]
    fn test_higher_min_zoom_keeps_current() {
        let mut camera = camera();
        camera.set_zoom(1.0);

        assert!(!camera.set_min_zoom(0.3));
        assert_eq!(camera.zoom_steps(), &[0.3, 0.5, 1.0, 2.0, 3.0]);
        assert_eq!(camera.step_zoom(), 1.0);
    }

    #[test]
    fn test_higher_min_zoom_clamps_current() {
        let mut camera = camera();
        camera.set_zoom(0.05);

        assert!(!camera.set_min_zoom(0.3));
        assert_eq!(camera.step_zoom(), 0.3);
    }

    #[test]
    fn test_equal_min_zoom_does_not_snap() {
        let mut camera = camera();
        camera.set_zoom(1.0);
        assert!(!camera.set_min_zoom(0.015));
        assert_eq!(camera.step_zoom(), 1.0);
    }

    #[test]
    fn test_invalid_min_zoom_ignored() {
        let mut camera = camera();
        assert!(!camera.set_min_zoom(0.0));
        assert!(!camera.set_min_zoom(f32::NAN));
        assert_eq!(camera.min_zoom(), 0.015);
    }

    #[test]
    fn test_pan_speed_matches_visible_width() {
        let mut camera = camera();
        camera.set_zoom(1.0);
        let width = visible_width(55.0, 1920.0 / 1080.0, 1280.6);
        assert!((camera.pan_speed() - width / 1920.0).abs() < 1e-4);

        camera.zoom_in();
        assert!(camera.pan_speed() < width / 1920.0);
    }

    #[test]
    fn test_pan_moves_target_against_pointer() {
        let mut camera = camera();
        assert!(camera.pan_target(Vec2::new(100.0, 0.0)));
        assert!(camera.target().x < 0.0);
        assert!(camera.target().y.abs() < 1e-4);

        let mut camera = self::camera();
        camera.pan_target(Vec2::new(0.0, 100.0));
        assert!(camera.target().z < 0.0);
    }

    #[test]
    fn test_controls_disabled_blocks_input() {
        let mut camera = camera();
        camera.set_controls_enabled(false);
        assert!(!camera.zoom_in());
        assert!(!camera.set_zoom(3.0));
        assert!(!camera.pan_target(Vec2::new(5.0, 5.0)));
        assert_eq!(camera.target(), Vec3::ZERO);
    }

    #[test]
    fn test_position_follows_zoom() {
        let mut camera = camera();
        camera.set_zoom(1.0);
        let far = camera.position().length();
        camera.set_zoom_override(Some(2.0));
        assert!((camera.position().length() - far / 2.0).abs() < 1e-2);
        camera.restore_zoom_index(camera.zoom_index());
        assert_eq!(camera.zoom(), 1.0);
    }

    #[test]
    fn test_center_ray_points_at_look_target() {
        let mut camera = camera();
        camera.set_target(Vec3::new(50.0, 0.0, 20.0));
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        let to_target = (camera.target() - ray.origin).normalize();
        assert!(ray.direction.distance(to_target) < 1e-4);
    }

    #[test]
    fn test_glide_reaches_goal_and_clears_override() {
        let mut camera = camera();
        camera.glide_to(Vec3::new(100.0, 0.0, 0.0), Some(1.0));
        for _ in 0..200 {
            camera.step_glide(0.2);
        }
        assert!(!camera.is_gliding());
        assert_eq!(camera.target(), Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(camera.zoom(), 1.0);

        camera.glide_to(Vec3::ZERO, None);
        for _ in 0..200 {
            camera.step_glide(0.2);
        }
        assert_eq!(camera.zoom_override(), None);
        assert_eq!(camera.target(), Vec3::ZERO);
    }
}
