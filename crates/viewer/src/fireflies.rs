//! Small particles orbiting each node.
//!
//! Purely decorative: fireflies are never pickable and are excluded from
//! hit testing by their kind. Orbits follow the owning mesh, so pushed or
//! focused nodes carry their fireflies along.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_graph::{Material, SceneGraph, Visual, VisualId, VisualKind};
use std::f32::consts::TAU;
use tree::NodeId;

const FIREFLY_RADIUS: f32 = 4.0;

#[derive(Clone, Copy, Debug)]
struct Firefly {
    visual: VisualId,
    anchor: VisualId,
    /// Orbit radius in multiples of the anchor radius.
    orbit: f32,
    speed: f32,
    phase: f32,
    pulse: f32,
}

#[derive(Debug)]
pub struct FireflySystem {
    fireflies: Vec<Firefly>,
    per_node: usize,
    seed: u64,
    time: f32,
}

impl FireflySystem {
    pub fn new(per_node: usize, seed: u64) -> Self {
        Self {
            fireflies: Vec::new(),
            per_node,
            seed,
            time: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.fireflies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fireflies.is_empty()
    }

    /// Creates fireflies around every node mesh in the scene.
    ///
    /// The same scene and seed always produce the same orbits.
    pub fn spawn(&mut self, scene: &mut SceneGraph) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut nodes: Vec<(NodeId, VisualId)> = scene.node_visuals().collect();
        nodes.sort_by_key(|(node, _)| *node);

        for (node, anchor) in nodes {
            for _ in 0..self.per_node {
                let firefly = Firefly {
                    visual: scene.insert(
                        Visual::new(VisualKind::Firefly)
                            .with_owner(node)
                            .with_radius(FIREFLY_RADIUS)
                            .with_material(Material {
                                opacity: 0.8,
                                transparent: true,
                                emissive: 1.0,
                            }),
                        None,
                    ),
                    anchor,
                    orbit: rng.random_range(1.3..2.0),
                    speed: rng.random_range(0.3..0.9),
                    phase: rng.random_range(0.0..TAU),
                    pulse: rng.random_range(0.0..TAU),
                };
                self.fireflies.push(firefly);
            }
        }
        self.place(scene, false);
        log::debug!("spawned {} fireflies", self.fireflies.len());
    }

    /// Advances the orbits. With `hold_opacity` the pulse is skipped so
    /// another owner can drive the fade.
    pub fn update(&mut self, dt: f32, scene: &mut SceneGraph, hold_opacity: bool) {
        if dt.is_finite() && dt > 0.0 {
            self.time += dt;
        }
        self.fireflies.retain(|f| scene.contains(f.visual));
        self.place(scene, hold_opacity);
    }

    fn place(&self, scene: &mut SceneGraph, hold_opacity: bool) {
        for firefly in &self.fireflies {
            let Some(anchor) = scene.get(firefly.anchor) else {
                continue;
            };
            let center = scene.world_position(firefly.anchor);
            let radius = anchor.radius * scene.world_scale(firefly.anchor).max_element() * firefly.orbit;

            let angle = self.time * firefly.speed + firefly.phase;
            let offset = Vec3::new(
                angle.cos() * radius,
                (angle * 1.3).sin() * radius * 0.3,
                angle.sin() * radius,
            );

            if let Some(visual) = scene.get_mut(firefly.visual) {
                visual.position = center + offset;
                if !hold_opacity {
                    visual.material.opacity = 0.55 + 0.35 * (self.time * 2.0 + firefly.pulse).sin();
                }
            }
        }
    }

    /// Forgets all fireflies. Their visuals go with the scene.
    pub fn clear(&mut self) {
        self.fireflies.clear();
        self.time = 0.0;
    }
}
