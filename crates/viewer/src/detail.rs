//! Detail mode: focus one top-level node and fade everything else away.
//!
//! Phases run `Inactive -> Entering -> Active -> Exiting -> Inactive`.
//! Entering snapshots the material of every visual, then animates the
//! focused node to the origin and scales it to a fixed share of the screen.
//! Exiting plays the reverse and restores every snapshot exactly.

use crate::animation::{Animator, Easing, Tick};
use crate::camera::{visible_width, CameraManager, CameraSnapshot};
use crate::config::ViewerConfig;
use glam::Vec3;
use scene_graph::{Material, SceneGraph, Visual, VisualId, VisualKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::f32::consts::{FRAC_PI_2, TAU};
use tree::NodeId;

/// Below this opacity a fading visual is hidden.
const HIDE_OPACITY: f32 = 0.05;
/// Share of the enter animation after which related labels appear.
const LABEL_SPAWN_PROGRESS: f32 = 0.8;
const LABEL_STAGGER: f32 = 0.08;
const LABEL_FADE_TIME: f32 = 0.35;
/// Pause between the exit zoom and the restore animation.
const EXIT_RESTORE_DELAY: f32 = 0.5;
/// Label ring radius relative to the focused node's on-screen radius.
const LABEL_RING_FACTOR: f32 = 1.4;
const PLACEHOLDER_TEXT: &str = "no data";

/// Scale that makes a node of `base_radius` span `percent` of the visible
/// width at `standard_distance`.
pub fn detail_scale(
    percent: f32,
    base_radius: f32,
    fov_degrees: f32,
    aspect: f32,
    standard_distance: f32,
) -> f32 {
    let width = visible_width(fov_degrees, aspect, standard_distance);
    (width * percent / 100.0) / (2.0 * base_radius)
}

/// The services detail mode needs from whoever owns the data.
pub trait DetailModeHost {
    /// Text of the records related to `node`, in display order.
    fn related_records(&self, node: NodeId) -> Vec<String>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailPhase {
    #[default]
    Inactive,
    Entering,
    Active,
    Exiting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DetailAnimation {
    Enter,
    LabelFade(usize),
    AffordanceFade,
    ExitZoom,
    ExitRestore,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Snapshot {
    material: Material,
    visible: bool,
}

#[derive(Clone, Copy, Debug)]
struct Focus {
    node: NodeId,
    visual: VisualId,
    position: Vec3,
    scale: Vec3,
    base_radius: f32,
    target_scale: f32,
}

/// Values captured the moment exit starts, so the reverse animation
/// continues from wherever enter left off.
#[derive(Clone, Debug)]
struct ExitStart {
    zoom: f32,
    target: Vec3,
    look_at: Vec3,
    position: Vec3,
    scale: Vec3,
    opacities: HashMap<VisualId, f32>,
}

#[derive(Clone, Copy, Debug)]
struct DetailSettings {
    screen_size_percent: f32,
    animation_time: f32,
    standard_distance: f32,
    detail_zoom: f32,
}

#[derive(Debug)]
pub struct DetailMode {
    settings: DetailSettings,
    phase: DetailPhase,
    focus: Option<Focus>,
    snapshots: HashMap<VisualId, Snapshot>,
    camera_snapshot: Option<CameraSnapshot>,
    exit_start: Option<ExitStart>,
    animator: Animator<DetailAnimation>,
    related: Vec<String>,
    labels: Vec<VisualId>,
    affordance: Option<VisualId>,
    labels_spawned: bool,
}

impl DetailMode {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            settings: DetailSettings {
                screen_size_percent: config.detail_mode_screen_size_percent,
                animation_time: config.detail_mode_animation_time,
                standard_distance: config.standard_distance,
                detail_zoom: config.detail_zoom,
            },
            phase: DetailPhase::Inactive,
            focus: None,
            snapshots: HashMap::new(),
            camera_snapshot: None,
            exit_start: None,
            animator: Animator::new(),
            related: Vec::new(),
            labels: Vec::new(),
            affordance: None,
            labels_spawned: false,
        }
    }

    pub fn phase(&self) -> DetailPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != DetailPhase::Inactive
    }

    pub fn focused_node(&self) -> Option<NodeId> {
        self.focus.map(|f| f.node)
    }

    pub fn focused_visual(&self) -> Option<VisualId> {
        self.focus.map(|f| f.visual)
    }

    /// Scale the focused node animates to.
    pub fn target_scale(&self) -> Option<f32> {
        self.focus.map(|f| f.target_scale)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn labels(&self) -> &[VisualId] {
        &self.labels
    }

    pub fn exit_affordance(&self) -> Option<VisualId> {
        self.affordance
    }

    /// Starts focusing `node`. Rejected unless detail mode is inactive.
    pub fn enter(
        &mut self,
        node: NodeId,
        scene: &mut SceneGraph,
        camera: &mut CameraManager,
        host: &dyn DetailModeHost,
    ) -> bool {
        if self.phase != DetailPhase::Inactive {
            log::debug!("detail mode busy ({:?}), ignoring enter for {node}", self.phase);
            return false;
        }
        let Some(visual_id) = scene.node_visual(node) else {
            log::warn!("detail mode: no mesh for node {node}");
            return false;
        };

        scene.settle(visual_id);
        let Some(visual) = scene.get(visual_id) else {
            return false;
        };
        let base_radius = visual.radius;
        let target_scale = detail_scale(
            self.settings.screen_size_percent,
            base_radius,
            camera.fov(),
            camera.aspect(),
            self.settings.standard_distance,
        );
        self.focus = Some(Focus {
            node,
            visual: visual_id,
            position: visual.position,
            scale: visual.scale,
            base_radius,
            target_scale,
        });

        self.snapshots = scene
            .iter()
            .map(|(id, v)| {
                (
                    id,
                    Snapshot {
                        material: v.material,
                        visible: v.visible,
                    },
                )
            })
            .collect();
        self.camera_snapshot = Some(camera.snapshot());
        camera.set_controls_enabled(false);
        camera.set_look_override(Some(Vec3::ZERO));

        self.related = host.related_records(node);
        self.labels_spawned = false;
        self.animator.start(
            DetailAnimation::Enter,
            self.settings.animation_time,
            Easing::CubicInOut,
        );
        self.phase = DetailPhase::Entering;
        log::info!(
            "entering detail mode for {node} ({} related records, scale {target_scale:.3})",
            self.related.len()
        );
        true
    }

    /// Starts leaving detail mode. Allowed while entering or active.
    pub fn exit(&mut self, scene: &SceneGraph, camera: &CameraManager) -> bool {
        if !matches!(self.phase, DetailPhase::Entering | DetailPhase::Active) {
            return false;
        }
        let Some(focus) = self.focus else {
            return false;
        };
        let Some(visual) = scene.get(focus.visual) else {
            return false;
        };

        self.exit_start = Some(ExitStart {
            zoom: camera.zoom(),
            target: camera.target(),
            look_at: camera.look_at(),
            position: visual.position,
            scale: visual.scale,
            opacities: scene
                .iter()
                .map(|(id, v)| (id, v.material.opacity))
                .collect(),
        });

        // Labels that never spawned stay unspawned.
        self.labels_spawned = true;
        self.animator.clear();
        self.animator.start(
            DetailAnimation::ExitZoom,
            self.settings.animation_time,
            Easing::CubicInOut,
        );
        self.animator.start_delayed(
            DetailAnimation::ExitRestore,
            EXIT_RESTORE_DELAY,
            self.settings.animation_time,
            Easing::CubicInOut,
        );
        self.phase = DetailPhase::Exiting;
        log::info!("exiting detail mode for {}", focus.node);
        true
    }

    /// Advances the running animations by `dt` seconds.
    pub fn update(&mut self, dt: f32, scene: &mut SceneGraph, camera: &mut CameraManager) {
        if self.phase == DetailPhase::Inactive {
            return;
        }
        if matches!(self.phase, DetailPhase::Entering | DetailPhase::Active) {
            camera.set_look_override(Some(Vec3::ZERO));
        }

        for tick in self.animator.advance(dt) {
            self.apply_tick(tick, scene, camera);
            if self.phase == DetailPhase::Inactive {
                break;
            }
        }
    }

    fn apply_tick(
        &mut self,
        tick: Tick<DetailAnimation>,
        scene: &mut SceneGraph,
        camera: &mut CameraManager,
    ) {
        match tick.key {
            DetailAnimation::Enter => {
                self.apply_enter_frame(tick.eased, scene, camera);
                if tick.progress >= LABEL_SPAWN_PROGRESS && !self.labels_spawned {
                    self.spawn_labels(scene, camera);
                }
                if tick.finished {
                    self.phase = DetailPhase::Active;
                    log::debug!("detail mode active");
                }
            }
            DetailAnimation::LabelFade(index) => {
                if let Some(label) = self.labels.get(index).and_then(|id| scene.get_mut(*id)) {
                    label.material.opacity = tick.eased;
                    label.material.transparent = true;
                    label.visible = true;
                }
            }
            DetailAnimation::AffordanceFade => {
                if let Some(affordance) = self.affordance.and_then(|id| scene.get_mut(id)) {
                    affordance.material.opacity = tick.eased;
                    affordance.visible = true;
                }
            }
            DetailAnimation::ExitZoom => {
                if let (Some(start), Some(snapshot)) = (&self.exit_start, self.camera_snapshot) {
                    let zoom = start.zoom + (snapshot.zoom - start.zoom) * tick.eased;
                    camera.set_zoom_override(Some(zoom));
                }
            }
            DetailAnimation::ExitRestore => {
                self.apply_restore_frame(tick.eased, scene, camera);
                if tick.finished {
                    self.finish_exit(scene, camera);
                }
            }
        }
    }

    /// Visuals that stay fully visible: the focused mesh with its
    /// decorations and descendants, plus the detail labels.
    fn owned_set(&self, scene: &SceneGraph) -> HashSet<VisualId> {
        let Some(focus) = self.focus else {
            return HashSet::new();
        };
        let mut roots = scene.owned_by(focus.node);
        roots.push(focus.visual);
        roots.extend(self.labels.iter().copied());
        roots.extend(self.affordance);

        roots.into_iter().flat_map(|id| scene.subtree(id)).collect()
    }

    fn apply_enter_frame(&mut self, t: f32, scene: &mut SceneGraph, camera: &mut CameraManager) {
        let (Some(focus), Some(snapshot)) = (self.focus, self.camera_snapshot) else {
            return;
        };

        // Recomputed every frame so visuals created mid-animation are covered.
        let owned = self.owned_set(scene);
        let created: HashSet<VisualId> = self.labels.iter().copied().chain(self.affordance).collect();
        for (id, visual) in scene.iter_mut() {
            if created.contains(&id) {
                continue;
            }
            if owned.contains(&id) {
                visual.material.opacity = 1.0;
                visual.visible = true;
                continue;
            }
            let base = self.snapshots.get(&id).map_or(1.0, |s| s.material.opacity);
            visual.material.opacity = base * (1.0 - t);
            visual.material.transparent = true;
            visual.visible = visual.material.opacity >= HIDE_OPACITY;
        }

        if let Some(visual) = scene.get_mut(focus.visual) {
            visual.scale = focus.scale.lerp(Vec3::splat(focus.target_scale), t);
            visual.position = focus.position.lerp(Vec3::ZERO, t);
        }

        let zoom = snapshot.zoom + (self.settings.detail_zoom - snapshot.zoom) * t;
        camera.set_zoom_override(Some(zoom));
        camera.set_target(snapshot.target.lerp(Vec3::ZERO, t));
        camera.set_look_override(Some(Vec3::ZERO));
    }

    fn apply_restore_frame(&mut self, t: f32, scene: &mut SceneGraph, camera: &mut CameraManager) {
        let (Some(focus), Some(start), Some(snapshot)) =
            (self.focus, self.exit_start.as_ref(), self.camera_snapshot)
        else {
            return;
        };

        let created: HashSet<VisualId> = self.labels.iter().copied().chain(self.affordance).collect();
        for (id, visual) in scene.iter_mut() {
            let from = start.opacities.get(&id).copied().unwrap_or(visual.material.opacity);
            if created.contains(&id) {
                visual.material.opacity = from * (1.0 - t);
                visual.visible = visual.material.opacity >= HIDE_OPACITY;
                continue;
            }
            let (to, visible) = self
                .snapshots
                .get(&id)
                .map_or((1.0, true), |s| (s.material.opacity, s.visible));
            visual.material.opacity = from + (to - from) * t;
            visual.material.transparent = true;
            visual.visible = visible && visual.material.opacity >= HIDE_OPACITY;
        }

        if let Some(visual) = scene.get_mut(focus.visual) {
            visual.scale = start.scale.lerp(focus.scale, t);
            visual.position = start.position.lerp(focus.position, t);
        }

        camera.set_target(start.target.lerp(snapshot.target, t));
        camera.set_look_override(Some(start.look_at.lerp(snapshot.target, t)));
    }

    /// Puts every snapshot back exactly and returns to `Inactive`.
    fn finish_exit(&mut self, scene: &mut SceneGraph, camera: &mut CameraManager) {
        if let Some(focus) = self.focus {
            if let Some(visual) = scene.get_mut(focus.visual) {
                visual.scale = focus.scale;
                visual.position = focus.position;
            }
        }

        for id in self.labels.drain(..).chain(self.affordance.take()) {
            scene.remove(id);
        }

        let snapshots = std::mem::take(&mut self.snapshots);
        for (id, visual) in scene.iter_mut() {
            match snapshots.get(&id) {
                Some(snapshot) => {
                    visual.material = snapshot.material;
                    visual.visible = snapshot.visible;
                }
                None => {
                    visual.material.opacity = 1.0;
                    visual.material.transparent = false;
                    visual.visible = true;
                }
            }
        }

        if let Some(snapshot) = self.camera_snapshot.take() {
            camera.restore_zoom_index(snapshot.zoom_index);
            camera.set_target(snapshot.target);
        }
        camera.set_look_override(None);
        camera.set_controls_enabled(true);

        let node = self.focus.take().map(|f| f.node);
        self.reset_state();
        log::info!("detail mode closed{}", node.map(|n| format!(" for {n}")).unwrap_or_default());
    }

    fn spawn_labels(&mut self, scene: &mut SceneGraph, camera: &CameraManager) {
        self.labels_spawned = true;
        let Some(focus) = self.focus else {
            return;
        };

        let texts = if self.related.is_empty() {
            vec![PLACEHOLDER_TEXT.to_string()]
        } else {
            self.related.clone()
        };

        let forward = (camera.look_at() - camera.position())
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);
        let ring = focus.base_radius * focus.target_scale * LABEL_RING_FACTOR;

        let count = texts.len();
        for (index, text) in texts.into_iter().enumerate() {
            let angle = TAU * index as f32 / count as f32 - FRAC_PI_2;
            let position = (right * angle.cos() + up * angle.sin()) * ring;
            let id = scene.insert(
                Visual::new(VisualKind::DetailLabel)
                    .with_owner(focus.node)
                    .with_position(position)
                    .with_text(text)
                    .with_material(transparent(0.0)),
                None,
            );
            self.labels.push(id);
            self.animator.start_delayed(
                DetailAnimation::LabelFade(index),
                LABEL_STAGGER * index as f32,
                LABEL_FADE_TIME,
                Easing::Linear,
            );
        }

        let affordance = scene.insert(
            Visual::new(VisualKind::ExitAffordance)
                .with_owner(focus.node)
                .with_position(up * ring * 1.3)
                .with_text("×")
                .with_material(transparent(0.0)),
            None,
        );
        self.affordance = Some(affordance);
        self.animator
            .start(DetailAnimation::AffordanceFade, LABEL_FADE_TIME, Easing::Linear);
        log::debug!("spawned {count} detail labels");
    }

    /// Recomputes the target scale after the viewport changed.
    pub fn rescale(&mut self, scene: &mut SceneGraph, camera: &CameraManager) {
        let phase = self.phase;
        let Some(focus) = self.focus.as_mut() else {
            return;
        };
        focus.target_scale = detail_scale(
            self.settings.screen_size_percent,
            focus.base_radius,
            camera.fov(),
            camera.aspect(),
            self.settings.standard_distance,
        );
        if phase == DetailPhase::Active {
            if let Some(visual) = scene.get_mut(focus.visual) {
                visual.scale = Vec3::splat(focus.target_scale);
            }
        }
    }

    /// Drops all state without animating. Used when the scene is rebuilt.
    pub fn reset(&mut self, camera: &mut CameraManager) {
        if self.phase == DetailPhase::Inactive {
            return;
        }
        if let Some(snapshot) = self.camera_snapshot.take() {
            camera.restore_zoom_index(snapshot.zoom_index);
            camera.set_target(snapshot.target);
        }
        camera.set_look_override(None);
        camera.set_controls_enabled(true);
        self.focus = None;
        self.snapshots.clear();
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.exit_start = None;
        self.animator.clear();
        self.related.clear();
        self.labels.clear();
        self.affordance = None;
        self.labels_spawned = false;
        self.phase = DetailPhase::Inactive;
    }
}

fn transparent(opacity: f32) -> Material {
    Material {
        opacity,
        transparent: true,
        emissive: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Records(HashMap<NodeId, Vec<String>>);

    impl DetailModeHost for Records {
        fn related_records(&self, node: NodeId) -> Vec<String> {
            self.0.get(&node).cloned().unwrap_or_default()
        }
    }

    struct Fixture {
        scene: SceneGraph,
        camera: CameraManager,
        detail: DetailMode,
        focus: VisualId,
        other: VisualId,
        halo: VisualId,
    }

    fn fixture() -> Fixture {
        let config = ViewerConfig::default();
        let mut scene = SceneGraph::new();
        let focus = scene.insert(
            Visual::new(VisualKind::NodeMesh)
                .with_owner(NodeId(1))
                .with_position(Vec3::new(300.0, 0.0, 0.0))
                .with_radius(135.0),
            None,
        );
        let halo = scene.insert(
            Visual::new(VisualKind::GlowShell)
                .with_owner(NodeId(1))
                .with_radius(160.0),
            Some(focus),
        );
        let other = scene.insert(
            Visual::new(VisualKind::NodeMesh)
                .with_owner(NodeId(2))
                .with_position(Vec3::new(-300.0, 0.0, 0.0))
                .with_radius(135.0)
                .with_material(transparent(0.5)),
            None,
        );
        Fixture {
            scene,
            camera: CameraManager::new(&config),
            detail: DetailMode::new(&config),
            focus,
            other,
            halo,
        }
    }

    fn run(f: &mut Fixture, seconds: f32) {
        let steps = (seconds * 60.0).ceil() as usize;
        for _ in 0..steps {
            f.detail.update(1.0 / 60.0, &mut f.scene, &mut f.camera);
        }
    }

    #[test]
    fn test_detail_scale_closed_form() {
        let expected = {
            let fov = 55.0_f64.to_radians();
            let width = 2.0 * (fov / 2.0).tan() * 1280.6 * (16.0 / 9.0);
            (width * 0.22 / 270.0) as f32
        };
        let scale = detail_scale(22.0, 135.0, 55.0, 16.0 / 9.0, 1280.6);
        assert!((scale - expected).abs() < 1e-3);
        assert!((scale - 1.931).abs() < 1e-2);
    }

    #[test]
    fn test_enter_reaches_active_and_fades_others() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        assert!(f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host));
        assert_eq!(f.detail.phase(), DetailPhase::Entering);
        assert!(!f.camera.controls_enabled());

        run(&mut f, 1.5);
        assert_eq!(f.detail.phase(), DetailPhase::Active);

        let focus = f.scene.get(f.focus).unwrap();
        assert_eq!(focus.position, Vec3::ZERO);
        assert!((focus.scale.x - f.detail.target_scale().unwrap()).abs() < 1e-4);
        assert_eq!(f.scene.get(f.halo).unwrap().material.opacity, 1.0);

        let other = f.scene.get(f.other).unwrap();
        assert!(other.material.opacity < HIDE_OPACITY);
        assert!(!other.visible);
        assert_eq!(f.camera.look_at(), Vec3::ZERO);
        assert!((f.camera.zoom() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_placeholder_label_without_related_records() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        run(&mut f, 2.0);

        assert_eq!(f.detail.labels().len(), 1);
        let label = f.scene.get(f.detail.labels()[0]).unwrap();
        assert_eq!(label.text.as_deref(), Some(PLACEHOLDER_TEXT));
        assert_eq!(label.material.opacity, 1.0);
        assert!(f.detail.exit_affordance().is_some());
    }

    #[test]
    fn test_labels_spawn_after_most_of_enter() {
        let mut f = fixture();
        let host = Records(HashMap::from([(
            NodeId(1),
            vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()],
        )]));
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);

        run(&mut f, 1.2 * 0.5);
        assert!(f.detail.labels().is_empty());
        run(&mut f, 1.2 * 0.4);
        assert_eq!(f.detail.labels().len(), 3);

        run(&mut f, 1.0);
        let texts: Vec<_> = f
            .detail
            .labels()
            .iter()
            .map(|id| f.scene.get(*id).unwrap().text.clone().unwrap())
            .collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
        assert!(f
            .detail
            .labels()
            .iter()
            .all(|id| f.scene.get(*id).unwrap().material.opacity == 1.0));
    }

    #[test]
    fn test_full_cycle_restores_exactly() {
        let mut f = fixture();
        let before_camera = f.camera.snapshot();
        let host = Records(HashMap::new());

        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        run(&mut f, 1.5);
        assert!(f.detail.exit(&f.scene, &f.camera));
        assert_eq!(f.detail.phase(), DetailPhase::Exiting);
        run(&mut f, 2.0);

        assert_eq!(f.detail.phase(), DetailPhase::Inactive);
        let other = f.scene.get(f.other).unwrap();
        assert_eq!(other.material.opacity, 0.5);
        assert!(other.material.transparent);
        assert!(other.visible);

        let focus = f.scene.get(f.focus).unwrap();
        assert_eq!(focus.material, Material::default());
        assert_eq!(focus.position, Vec3::new(300.0, 0.0, 0.0));
        assert_eq!(focus.scale, Vec3::ONE);

        assert_eq!(f.scene.len(), 3);
        assert_eq!(f.camera.snapshot(), before_camera);
        assert_eq!(f.camera.look_override(), None);
        assert!(f.camera.controls_enabled());
        assert_eq!(f.detail.snapshot_count(), 0);
    }

    #[test]
    fn test_reentry_rejected_until_inactive() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        assert!(!f.detail.enter(NodeId(2), &mut f.scene, &mut f.camera, &host));

        run(&mut f, 1.5);
        f.detail.exit(&f.scene, &f.camera);
        assert!(!f.detail.enter(NodeId(2), &mut f.scene, &mut f.camera, &host));
        assert!(!f.detail.exit(&f.scene, &f.camera));

        run(&mut f, 2.0);
        assert!(f.detail.enter(NodeId(2), &mut f.scene, &mut f.camera, &host));
        assert_eq!(f.detail.focused_node(), Some(NodeId(2)));
    }

    #[test]
    fn test_exit_while_entering_restores() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        run(&mut f, 0.3);
        assert!(f.detail.exit(&f.scene, &f.camera));
        run(&mut f, 2.0);

        assert_eq!(f.detail.phase(), DetailPhase::Inactive);
        assert!(f.detail.labels().is_empty());
        assert_eq!(f.scene.len(), 3);
        assert_eq!(f.scene.get(f.other).unwrap().material.opacity, 0.5);
        assert_eq!(f.scene.get(f.focus).unwrap().position, Vec3::new(300.0, 0.0, 0.0));
    }

    #[test]
    fn test_rescale_in_active_phase() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        run(&mut f, 1.5);
        let wide = f.detail.target_scale().unwrap();

        f.camera.resize(1000.0, 1000.0);
        f.detail.rescale(&mut f.scene, &f.camera);
        let square = f.detail.target_scale().unwrap();
        assert!(square < wide);
        assert_eq!(f.scene.get(f.focus).unwrap().scale, Vec3::splat(square));
    }

    #[test]
    fn test_unknown_node_rejected() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        assert!(!f.detail.enter(NodeId(42), &mut f.scene, &mut f.camera, &host));
        assert!(!f.detail.is_active());
    }

    #[test]
    fn test_decoration_added_while_entering_is_owned() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        run(&mut f, 0.3);
        assert_eq!(f.detail.phase(), DetailPhase::Entering);

        let firefly = f.scene.insert(
            Visual::new(VisualKind::Firefly)
                .with_owner(NodeId(1))
                .with_material(transparent(0.3)),
            None,
        );
        f.detail.update(1.0 / 60.0, &mut f.scene, &mut f.camera);

        let firefly = f.scene.get(firefly).unwrap();
        assert_eq!(firefly.material.opacity, 1.0);
        assert!(firefly.visible);
    }

    #[test]
    fn test_visual_added_while_active_restores_to_defaults() {
        let mut f = fixture();
        let host = Records(HashMap::new());
        f.detail.enter(NodeId(1), &mut f.scene, &mut f.camera, &host);
        run(&mut f, 1.5);
        assert_eq!(f.detail.phase(), DetailPhase::Active);

        let late = f.scene.insert(
            Visual::new(VisualKind::NodeMesh)
                .with_owner(NodeId(3))
                .with_radius(135.0)
                .with_material(transparent(0.2)),
            None,
        );
        f.scene.get_mut(late).unwrap().visible = false;

        assert!(f.detail.exit(&f.scene, &f.camera));
        run(&mut f, 2.5);
        assert_eq!(f.detail.phase(), DetailPhase::Inactive);

        let late = f.scene.get(late).unwrap();
        assert_eq!(late.material.opacity, 1.0);
        assert!(!late.material.transparent);
        assert!(late.visible);
    }
}
