use crate::camera::CameraManager;
use crate::config::ViewerConfig;
use crate::detail::{DetailMode, DetailModeHost};
use crate::fireflies::FireflySystem;
use crate::interaction::{HitTest, NodeInteraction, PointerEvent, SurfaceRect};
use glam::{Vec2, Vec3};
use scene_graph::{Material, SceneGraph, Visual, VisualKind};
use std::collections::HashMap;
use tree::{LaidOutTree, LevelLimits, NodeId, Record, TreeBuilder};

/// Label height above its node, in node radii.
const LABEL_OFFSET: f32 = 1.3;
const GLOW_FACTOR: f32 = 1.2;
const RING_FACTOR: f32 = 1.5;

/// Fraction of the remaining distance covered in `dt` seconds when `rate`
/// is covered per 60 Hz frame.
pub(crate) fn motion_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (1.0 - rate.clamp(0.0, 1.0)).powf(dt * 60.0)
}

/// Direct children of every record in the full dataset.
///
/// Unlike the built forest this ignores `max_depth` and level limits.
#[derive(Clone, Debug, Default)]
pub struct RecordIndex {
    children: HashMap<NodeId, Vec<String>>,
}

impl RecordIndex {
    pub fn new(records: &[Record]) -> Self {
        let mut children: HashMap<NodeId, Vec<String>> = HashMap::new();
        for record in records {
            if let Some(parent) = record.parent_id {
                children.entry(parent).or_default().push(record.text.clone());
            }
        }
        Self { children }
    }
}

impl DetailModeHost for RecordIndex {
    fn related_records(&self, node: NodeId) -> Vec<String> {
        self.children.get(&node).cloned().unwrap_or_default()
    }
}

/// Current drag gesture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragState {
    /// Panning the camera
    Panning { last: Vec2 },
}

/// Owns every piece of viewer state and drives it once per frame.
pub struct Viewer {
    config: ViewerConfig,
    records: Vec<Record>,
    related: RecordIndex,
    builder: TreeBuilder,
    forest: Vec<LaidOutTree>,
    levels: HashMap<NodeId, usize>,
    scene: SceneGraph,
    camera: CameraManager,
    interaction: NodeInteraction,
    detail: DetailMode,
    fireflies: FireflySystem,
    surface: SurfaceRect,
    drag: Option<DragState>,
    clock: f32,
}

impl Viewer {
    pub fn new(config: ViewerConfig, records: Vec<Record>) -> Self {
        let mut viewer = Self {
            related: RecordIndex::new(&records),
            records,
            builder: TreeBuilder::new(),
            forest: Vec::new(),
            levels: HashMap::new(),
            scene: SceneGraph::new(),
            camera: CameraManager::new(&config),
            interaction: NodeInteraction::new(&config),
            detail: DetailMode::new(&config),
            fireflies: FireflySystem::new(config.fireflies_per_node, config.firefly_seed),
            surface: SurfaceRect::new(config.viewport_width, config.viewport_height),
            drag: None,
            clock: 0.0,
            config,
        };
        viewer.rebuild();
        viewer
    }

    // Accessors

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn forest(&self) -> &[LaidOutTree] {
        &self.forest
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &CameraManager {
        &self.camera
    }

    pub fn interaction(&self) -> &NodeInteraction {
        &self.interaction
    }

    pub fn detail(&self) -> &DetailMode {
        &self.detail
    }

    pub fn fireflies(&self) -> &FireflySystem {
        &self.fireflies
    }

    pub fn surface(&self) -> SurfaceRect {
        self.surface
    }

    pub fn drag(&self) -> Option<DragState> {
        self.drag
    }

    /// Seconds advanced through [`Viewer::update`] since the last rebuild.
    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.interaction.selected()
    }

    /// Trees held by the builder cache.
    pub fn cached_tree_count(&self) -> usize {
        self.builder.cached_tree_count()
    }

    /// Level of a node in the built forest.
    pub fn level_of(&self, node: NodeId) -> Option<usize> {
        self.levels.get(&node).copied()
    }

    /// Sets `max_depth` and rebuilds when it changed.
    pub fn set_max_depth(&mut self, max_depth: i32) -> bool {
        if self.config.max_depth == max_depth {
            return false;
        }
        self.config.max_depth = max_depth;
        self.rebuild();
        true
    }

    pub fn set_level_limits(&mut self, limits: LevelLimits) {
        self.config.level_limits = limits;
        self.rebuild();
    }

    pub fn set_records(&mut self, records: Vec<Record>) {
        self.related = RecordIndex::new(&records);
        self.records = records;
        self.builder.clear_cache();
        self.rebuild();
    }

    // Building

    /// Discards every visual and builds the scene from scratch.
    ///
    /// No visual handle survives a rebuild.
    pub fn rebuild(&mut self) {
        self.detail.reset(&mut self.camera);
        self.interaction.clear();
        self.drag = None;
        self.scene.clear();
        self.fireflies.clear();
        self.clock = 0.0;

        self.forest = self
            .builder
            .build(&self.records, &self.config.build_options());
        self.levels = self
            .forest
            .iter()
            .flat_map(|laid_out| laid_out.tree.nodes().map(|node| (node.id, node.level)))
            .collect();

        for laid_out in &self.forest {
            visualize_tree(&mut self.scene, laid_out, &self.config);
        }
        self.fireflies.spawn(&mut self.scene);

        let min_zoom = self.fit_zoom();
        self.camera.set_min_zoom(min_zoom);
        log::info!(
            "built {} trees, {} nodes, {} visuals, min zoom {min_zoom:.4}",
            self.forest.len(),
            self.levels.len(),
            self.scene.len()
        );
    }

    /// Zoom at which the whole forest fits the viewport, capped at the
    /// configured minimum.
    fn fit_zoom(&self) -> f32 {
        let configured = self.camera.configured_min_zoom();
        let extent = self
            .forest
            .iter()
            .map(|laid_out| laid_out.offset.length() + laid_out.outer_radius)
            .fold(0.0, f32::max);
        if extent <= 0.0 {
            return configured;
        }

        let half_fov = (self.camera.fov().to_radians() / 2.0).tan();
        let required_distance = extent / (half_fov * self.camera.aspect().min(1.0));
        let zoom = self.config.base_distance / required_distance;
        if zoom.is_finite() && zoom > 0.0 {
            zoom.min(configured)
        } else {
            configured
        }
    }

    // Frame

    /// Advances every animation by `dt` seconds. Any `dt` is accepted.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += dt;

        self.detail.update(dt, &mut self.scene, &mut self.camera);
        let factor = motion_factor(self.config.motion_rate, dt);
        self.scene.step_motion(factor);
        self.camera.step_glide(factor);
        self.fireflies
            .update(dt, &mut self.scene, self.detail.is_active());
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.camera.resize(width, height);
        self.surface.width = width;
        self.surface.height = height;
        self.detail.rescale(&mut self.scene, &self.camera);
    }

    pub fn set_surface(&mut self, surface: SurfaceRect) {
        self.surface = surface;
        self.resize(surface.width, surface.height);
    }

    // Selection and detail mode

    /// Selects a node, or opens detail mode for levels 0 and 1.
    pub fn select_node(&mut self, node: NodeId) -> bool {
        let Some(level) = self.level_of(node) else {
            log::debug!("select: unknown node {node}");
            return false;
        };
        if NodeInteraction::routes_to_detail(level) {
            return self.enter_detail_mode(node);
        }
        if self.detail.is_active() {
            return false;
        }
        self.interaction
            .select_node(node, &mut self.scene, &mut self.camera)
    }

    pub fn deselect_node(&mut self) -> bool {
        if self.detail.is_active() {
            return false;
        }
        self.interaction
            .deselect_node(&mut self.scene, &mut self.camera)
    }

    pub fn enter_detail_mode(&mut self, node: NodeId) -> bool {
        if self.detail.is_active() || !self.levels.contains_key(&node) {
            return false;
        }
        self.interaction
            .deselect_node(&mut self.scene, &mut self.camera);
        self.camera.finish_glide();
        self.drag = None;
        self.detail
            .enter(node, &mut self.scene, &mut self.camera, &self.related)
    }

    pub fn exit_detail_mode(&mut self) -> bool {
        self.detail.exit(&self.scene, &self.camera)
    }

    // Camera controls

    pub fn zoom_in(&mut self) -> bool {
        self.camera.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.camera.zoom_out()
    }

    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        self.camera.set_zoom(zoom)
    }

    pub fn pan(&mut self, delta: Vec2) -> bool {
        self.camera.pan_target(delta)
    }

    // Pointer input

    /// Handles a pointer press. Returns whether the press was consumed;
    /// unconsumed presses on empty space start a pan.
    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        if event.button != 0 {
            return false;
        }
        let focus = if self.detail.is_active() {
            self.detail.focused_visual()
        } else {
            None
        };
        let hit = self
            .interaction
            .hit_test(&event, &self.surface, &self.scene, &self.camera, focus);

        if self.detail.is_active() {
            return match hit {
                HitTest::OverUi => false,
                HitTest::Node(..) => true,
                HitTest::Empty => {
                    self.exit_detail_mode();
                    true
                }
            };
        }

        match hit {
            HitTest::OverUi => false,
            HitTest::Node(node, _) => {
                self.select_node(node);
                true
            }
            HitTest::Empty => {
                self.deselect_node();
                if self.camera.controls_enabled() {
                    self.drag = Some(DragState::Panning {
                        last: event.position(),
                    });
                }
                false
            }
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> bool {
        let Some(DragState::Panning { last }) = self.drag.as_mut() else {
            return false;
        };
        let position = event.position();
        let delta = position - *last;
        *last = position;
        self.camera.pan_target(delta)
    }

    pub fn pointer_up(&mut self, _event: PointerEvent) -> bool {
        self.drag.take().is_some()
    }

    /// Releases every visual, snapshot and cache. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.detail.reset(&mut self.camera);
        self.interaction.clear();
        self.drag = None;
        self.scene.clear();
        self.fireflies.clear();
        self.builder.clear_cache();
        self.forest.clear();
        self.levels.clear();
        log::debug!("viewer disposed");
    }
}

impl DetailModeHost for Viewer {
    fn related_records(&self, node: NodeId) -> Vec<String> {
        self.related.related_records(node)
    }
}

/// Creates the mesh, label and halo of every node, plus a ring for roots.
fn visualize_tree(scene: &mut SceneGraph, laid_out: &LaidOutTree, config: &ViewerConfig) {
    for key in laid_out.tree.preorder() {
        let Some(node) = laid_out.tree.get(key) else {
            continue;
        };
        let radius = if node.is_root() {
            config.root_radius
        } else {
            config.node_radius
        };

        let mesh = scene.insert(
            Visual::new(VisualKind::NodeMesh)
                .with_owner(node.id)
                .with_position(node.position)
                .with_radius(radius)
                .with_text(node.text.clone()),
            None,
        );
        scene.insert(
            Visual::new(VisualKind::Label)
                .with_owner(node.id)
                .with_position(Vec3::new(0.0, radius * LABEL_OFFSET, 0.0))
                .with_text(node.text.clone()),
            Some(mesh),
        );
        scene.insert(
            Visual::new(VisualKind::GlowShell)
                .with_owner(node.id)
                .with_radius(radius * GLOW_FACTOR)
                .with_material(Material {
                    opacity: 0.25,
                    transparent: true,
                    emissive: 0.5,
                }),
            Some(mesh),
        );
        if node.is_root() {
            scene.insert(
                Visual::new(VisualKind::NeonRing)
                    .with_owner(node.id)
                    .with_radius(radius * RING_FACTOR)
                    .with_material(Material {
                        opacity: 0.8,
                        transparent: true,
                        emissive: 1.0,
                    }),
                Some(mesh),
            );
        }
    }
}
