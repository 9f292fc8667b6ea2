use crate::VisualId;
use glam::Vec3;

/// A picking ray in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Distance along the ray to the first intersection with a sphere.
    ///
    /// Returns 0 when the origin is already inside the sphere.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        if radius <= 0.0 {
            return None;
        }
        let to_center = center - self.origin;
        let c = to_center.length_squared() - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        let b = to_center.dot(self.direction);
        if b <= 0.0 {
            return None;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        Some(b - discriminant.sqrt())
    }
}

/// One intersection found by [`SceneGraph::raycast`](crate::SceneGraph::raycast).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub visual: VisualId,
    pub distance: f32,
}
