//! Pointer hit testing and node selection.

use crate::camera::CameraManager;
use crate::config::ViewerConfig;
use glam::{Vec2, Vec3};
use scene_graph::{SceneGraph, VisualId, VisualKind};
use serde::{Deserialize, Serialize};
use tree::NodeId;

/// Emissive strength of the selected node.
const SELECTED_EMISSIVE: f32 = 0.6;
/// Pushed neighbors end up this much further out than touching.
const PUSH_MARGIN: f32 = 1.1;

/// A pointer event in client pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub client_x: f32,
    pub client_y: f32,
    /// 0 is the primary button.
    #[serde(default)]
    pub button: u8,
    /// The event landed on a UI element drawn over the scene.
    #[serde(default)]
    pub over_ui: bool,
}

impl PointerEvent {
    pub fn new(client_x: f32, client_y: f32) -> Self {
        Self {
            client_x,
            client_y,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.client_x, self.client_y)
    }
}

/// Bounds of the render surface in client pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    /// Normalized device coordinates of a client point, y up.
    pub fn to_ndc(&self, point: Vec2) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            (point.x - self.left) / self.width * 2.0 - 1.0,
            -((point.y - self.top) / self.height * 2.0 - 1.0),
        ))
    }
}

/// What a pointer-down landed on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitTest {
    /// Over a UI element; the scene ignores it.
    OverUi,
    /// A node mesh.
    Node(NodeId, VisualId),
    /// Nothing pickable.
    Empty,
}

#[derive(Clone, Debug)]
struct Selection {
    node: NodeId,
    visual: VisualId,
    previous_emissive: f32,
    pushed: Vec<VisualId>,
}

#[derive(Clone, Copy, Debug)]
struct CameraHome {
    target: Vec3,
    zoom_override: Option<f32>,
}

/// Selection state and the push-away of neighbors around the selection.
#[derive(Clone, Debug)]
pub struct NodeInteraction {
    selected: Option<Selection>,
    camera_home: Option<CameraHome>,
    selected_scale: f32,
    zoom_multiplier: f32,
}

impl NodeInteraction {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            selected: None,
            camera_home: None,
            selected_scale: config.selected_scale,
            zoom_multiplier: config.selection_zoom_multiplier,
        }
    }

    /// Nodes at level 0 and 1 open detail mode instead of being selected.
    pub fn routes_to_detail(level: usize) -> bool {
        level <= 1
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected.as_ref().map(|s| s.node)
    }

    pub fn pushed_count(&self) -> usize {
        self.selected.as_ref().map_or(0, |s| s.pushed.len())
    }

    /// Finds the node under the pointer.
    ///
    /// Decorations never win a hit. With `focus` set only that visual can be
    /// hit; anything else reports [`HitTest::Empty`].
    pub fn hit_test(
        &self,
        event: &PointerEvent,
        surface: &SurfaceRect,
        scene: &SceneGraph,
        camera: &CameraManager,
        focus: Option<VisualId>,
    ) -> HitTest {
        if event.over_ui {
            return HitTest::OverUi;
        }
        let Some(ndc) = surface.to_ndc(event.position()) else {
            return HitTest::Empty;
        };
        let ray = camera.ray_from_ndc(ndc);

        let hit = scene.raycast(&ray).into_iter().find_map(|hit| {
            let visual = scene.get(hit.visual)?;
            if !visual.kind().is_pickable() {
                return None;
            }
            if focus.is_some_and(|focus| focus != hit.visual) {
                return None;
            }
            visual.owner().map(|node| (node, hit.visual))
        });

        match hit {
            Some((node, visual)) => HitTest::Node(node, visual),
            None => HitTest::Empty,
        }
    }

    /// Highlights a node, pushes overlapping neighbors away and frames it.
    ///
    /// Selecting another node first releases the current one. Returns false
    /// when the node has no mesh or is already selected.
    pub fn select_node(
        &mut self,
        node: NodeId,
        scene: &mut SceneGraph,
        camera: &mut CameraManager,
    ) -> bool {
        if self.selected() == Some(node) {
            return false;
        }
        let Some(visual_id) = scene.node_visual(node) else {
            log::debug!("select: no mesh for node {node}");
            return false;
        };

        if let Some(previous) = self.selected.take() {
            Self::release(previous, scene);
        }

        let home = *self.camera_home.get_or_insert(CameraHome {
            target: camera.target(),
            zoom_override: camera.zoom_override(),
        });

        let Some(visual) = scene.get_mut(visual_id) else {
            return false;
        };
        let previous_emissive = visual.material.emissive;
        visual.material.emissive = SELECTED_EMISSIVE;
        scene.animate_scale(visual_id, Vec3::splat(self.selected_scale));

        let pushed = self.push_away_neighbor_nodes(visual_id, scene);
        log::debug!("selected {node}, pushed {} neighbors", pushed.len());

        let base_zoom = home.zoom_override.unwrap_or_else(|| camera.step_zoom());
        camera.glide_to(
            scene.world_position(visual_id),
            Some(base_zoom * self.zoom_multiplier),
        );

        self.selected = Some(Selection {
            node,
            visual: visual_id,
            previous_emissive,
            pushed,
        });
        true
    }

    /// Restores the selected node, its neighbors and the camera.
    pub fn deselect_node(&mut self, scene: &mut SceneGraph, camera: &mut CameraManager) -> bool {
        let Some(selection) = self.selected.take() else {
            return false;
        };
        log::debug!("deselected {}", selection.node);
        Self::release(selection, scene);

        if let Some(home) = self.camera_home.take() {
            camera.glide_to(home.target, home.zoom_override);
        }
        true
    }

    /// Forgets all handles without touching the scene.
    pub fn clear(&mut self) {
        self.selected = None;
        self.camera_home = None;
    }

    fn release(selection: Selection, scene: &mut SceneGraph) {
        if let Some(visual) = scene.get_mut(selection.visual) {
            visual.material.emissive = selection.previous_emissive;
        }
        scene.animate_scale(selection.visual, Vec3::ONE);
        for id in selection.pushed {
            scene.return_home(id);
        }
    }

    /// Pushes every node mesh too close to the enlarged selection outward
    /// along the line between centers, to the safe distance.
    ///
    /// Positions are sampled once before any push is issued, so the result
    /// does not depend on iteration order.
    fn push_away_neighbor_nodes(&self, selected: VisualId, scene: &mut SceneGraph) -> Vec<VisualId> {
        let Some(visual) = scene.get(selected) else {
            return Vec::new();
        };
        let center = scene.world_position(selected);
        let selected_radius = visual.radius * self.selected_scale;

        let neighbors: Vec<(VisualId, Vec3, Vec3, f32)> = scene
            .iter()
            .filter(|(id, v)| {
                *id != selected && v.kind() == VisualKind::NodeMesh && scene.is_effectively_visible(*id)
            })
            .map(|(id, v)| {
                let radius = v.radius * scene.world_scale(id).max_element();
                (id, v.position, scene.world_position(id), radius)
            })
            .collect();

        let mut pushed = Vec::new();
        for (id, local, world, radius) in neighbors {
            let required = (selected_radius + radius) * PUSH_MARGIN;
            let offset = world - center;
            let distance = offset.length();
            if distance >= required {
                continue;
            }
            let direction = offset.try_normalize().unwrap_or(Vec3::X);
            let destination = center + direction * required;
            scene.push_to(id, local + (destination - world));
            pushed.push(id);
        }
        pushed
    }
}
