//! # Scene Graph
//!
//! The retained visual layer of the radial tree viewer. Every sphere, label,
//! halo and particle a renderer draws is a [`Visual`] record stored here and
//! addressed by a stable [`VisualId`].
//!
//! ## Key Concepts
//!
//! - **Visuals**: value records with a narrow mutable surface (position,
//!   scale, material, visibility) and an optional owning tree node.
//! - **Hierarchy**: labels and halos hang off their node mesh; world
//!   positions are resolved through the parent chain.
//! - **Motion**: each visual carries its own animation targets, advanced by
//!   [`SceneGraph::step_motion`] once per frame.
//! - **Picking**: [`SceneGraph::raycast`] intersects bounding spheres.
//!
//! The graph knows nothing about the data model beyond [`NodeId`]s, and
//! nothing about how visuals are rendered.

mod ray;
mod visual;

pub use ray::{Ray, RayHit};
pub use visual::{Material, Motion, Visual, VisualKind};

use glam::Vec3;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::fmt::{self, Display};
use tree::NodeId;

slotmap::new_key_type! {
    /// Stable identifier of a visual, assigned at creation.
    pub struct VisualId;
}

impl Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Distance under which an animated value snaps to its target.
pub const MOTION_EPSILON: f32 = 0.01;

/// SceneGraph stores every visual of the viewer.
///
/// Node meshes are additionally indexed by their tree node id so
/// interaction code can go from data to visuals and back.
#[derive(Debug, Default)]
pub struct SceneGraph {
    /// Storage for all visuals, indexed by their IDs
    visuals: SlotMap<VisualId, Visual>,

    /// Top-level visuals in insertion order
    roots: Vec<VisualId>,

    /// Maps tree node ids to their mesh visual
    node_mapping: HashMap<NodeId, VisualId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a visual, optionally as a child of `parent`.
    ///
    /// A missing parent makes the visual top-level.
    pub fn insert(&mut self, mut visual: Visual, parent: Option<VisualId>) -> VisualId {
        let parent = parent.filter(|id| self.visuals.contains_key(*id));
        visual.parent = parent;
        visual.children.clear();

        let mapped_node = match (visual.kind, visual.owner) {
            (VisualKind::NodeMesh, Some(node)) => Some(node),
            _ => None,
        };

        let id = self.visuals.insert(visual);
        match parent.and_then(|p| self.visuals.get_mut(p)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        if let Some(node) = mapped_node {
            self.node_mapping.insert(node, id);
        }
        id
    }

    fn detach(&mut self, id: VisualId) {
        match self.visuals.get(id).and_then(|v| v.parent) {
            Some(parent_id) => {
                if let Some(parent) = self.visuals.get_mut(parent_id) {
                    parent.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
    }

    /// Removes a visual and all of its descendants.
    pub fn remove(&mut self, id: VisualId) -> bool {
        if !self.visuals.contains_key(id) {
            return false;
        }
        self.detach(id);
        for removed in self.subtree(id) {
            if let Some(visual) = self.visuals.remove(removed) {
                if let Some(node) = visual.owner {
                    if self.node_mapping.get(&node) == Some(&removed) {
                        self.node_mapping.remove(&node);
                    }
                }
            }
        }
        true
    }

    /// Drops every visual. Handles from before the call become invalid.
    pub fn clear(&mut self) {
        self.visuals.clear();
        self.roots.clear();
        self.node_mapping.clear();
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.visuals.contains_key(id)
    }

    pub fn get(&self, id: VisualId) -> Option<&Visual> {
        self.visuals.get(id)
    }

    pub fn get_mut(&mut self, id: VisualId) -> Option<&mut Visual> {
        self.visuals.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VisualId, &Visual)> {
        self.visuals.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (VisualId, &mut Visual)> {
        self.visuals.iter_mut()
    }

    pub fn roots(&self) -> &[VisualId] {
        &self.roots
    }

    /// Mesh visual of a tree node.
    pub fn node_visual(&self, node: NodeId) -> Option<VisualId> {
        self.node_mapping.get(&node).copied()
    }

    /// Node meshes in no particular order.
    pub fn node_visuals(&self) -> impl Iterator<Item = (NodeId, VisualId)> + '_ {
        self.node_mapping.iter().map(|(node, id)| (*node, *id))
    }

    /// Visuals whose owner is `node`, including its mesh.
    pub fn owned_by(&self, node: NodeId) -> Vec<VisualId> {
        self.visuals
            .iter()
            .filter(|(_, v)| v.owner == Some(node))
            .map(|(id, _)| id)
            .collect()
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn subtree(&self, id: VisualId) -> Vec<VisualId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(visual) = self.visuals.get(current) {
                result.push(current);
                stack.extend(visual.children.iter().rev().copied());
            }
        }
        result
    }

    /// World-space position, resolved through the parent chain.
    pub fn world_position(&self, id: VisualId) -> Vec3 {
        let Some(visual) = self.visuals.get(id) else {
            return Vec3::ZERO;
        };
        let mut position = visual.position;
        let mut current = visual.parent;
        while let Some(parent_id) = current {
            let Some(parent) = self.visuals.get(parent_id) else {
                break;
            };
            position = parent.position + parent.scale * position;
            current = parent.parent;
        }
        position
    }

    /// Accumulated scale of a visual and its ancestors.
    pub fn world_scale(&self, id: VisualId) -> Vec3 {
        let mut scale = Vec3::ONE;
        let mut current = Some(id);
        while let Some(visual_id) = current {
            let Some(visual) = self.visuals.get(visual_id) else {
                break;
            };
            scale *= visual.scale;
            current = visual.parent;
        }
        scale
    }

    /// Whether the visual and all of its ancestors are visible.
    pub fn is_effectively_visible(&self, id: VisualId) -> bool {
        let mut current = Some(id);
        while let Some(visual_id) = current {
            match self.visuals.get(visual_id) {
                Some(visual) if visual.visible => current = visual.parent,
                _ => return false,
            }
        }
        true
    }

    /// Sets the visibility of a visual
    pub fn set_visible(&mut self, id: VisualId, visible: bool) {
        if let Some(visual) = self.visuals.get_mut(id) {
            visual.visible = visible;
        }
    }

    /// All visible visuals hit by `ray`, nearest first.
    ///
    /// Decorations are included; filtering them is the caller's choice.
    pub fn raycast(&self, ray: &Ray) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = self
            .visuals
            .keys()
            .filter(|id| self.is_effectively_visible(*id))
            .filter_map(|id| {
                let visual = &self.visuals[id];
                let radius = visual.radius * self.world_scale(id).max_element();
                ray.intersect_sphere(self.world_position(id), radius)
                    .map(|distance| RayHit {
                        visual: id,
                        distance,
                    })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Moves a visual toward `target`, remembering where it started.
    ///
    /// Repeated pushes keep the original home position.
    pub fn push_to(&mut self, id: VisualId, target: Vec3) {
        if let Some(visual) = self.visuals.get_mut(id) {
            let current = visual.position;
            visual.motion.home.get_or_insert(current);
            visual.motion.position_target = Some(target);
            visual.motion.returning_home = false;
        }
    }

    /// Sends a pushed visual back to its home position.
    pub fn return_home(&mut self, id: VisualId) {
        if let Some(visual) = self.visuals.get_mut(id) {
            if let Some(home) = visual.motion.home {
                visual.motion.position_target = Some(home);
                visual.motion.returning_home = true;
            }
        }
    }

    pub fn animate_scale(&mut self, id: VisualId, target: Vec3) {
        if let Some(visual) = self.visuals.get_mut(id) {
            visual.motion.scale_target = Some(target);
        }
    }

    /// Jumps a visual to the end of its pending motion.
    pub fn settle(&mut self, id: VisualId) {
        if let Some(visual) = self.visuals.get_mut(id) {
            if let Some(target) = visual.motion.position_target.take() {
                visual.position = target;
            }
            if let Some(target) = visual.motion.scale_target.take() {
                visual.scale = target;
            }
            if visual.motion.returning_home {
                visual.motion.home = None;
                visual.motion.returning_home = false;
            }
        }
    }

    /// Advances every visual's motion by `factor` (0..=1) of the remaining
    /// distance. Values within [`MOTION_EPSILON`] snap exactly to their
    /// target and stop. Returns the number of visuals still moving.
    pub fn step_motion(&mut self, factor: f32) -> usize {
        let factor = factor.clamp(0.0, 1.0);
        let mut moving = 0;
        for visual in self.visuals.values_mut() {
            if let Some(target) = visual.motion.position_target {
                let next = visual.position.lerp(target, factor);
                if next.distance(target) < MOTION_EPSILON {
                    visual.position = target;
                    visual.motion.position_target = None;
                    if visual.motion.returning_home {
                        visual.motion.home = None;
                        visual.motion.returning_home = false;
                    }
                } else {
                    visual.position = next;
                }
            }
            if let Some(target) = visual.motion.scale_target {
                let next = visual.scale.lerp(target, factor);
                if next.distance(target) < MOTION_EPSILON {
                    visual.scale = target;
                    visual.motion.scale_target = None;
                } else {
                    visual.scale = next;
                }
            }
            if visual.motion.is_moving() {
                moving += 1;
            }
        }
        moving
    }
}
