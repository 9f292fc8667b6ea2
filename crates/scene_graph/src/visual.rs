use crate::VisualId;
use glam::Vec3;
use tree::NodeId;

/// What a visual represents. The renderer decides how each kind looks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualKind {
    /// The sphere of a tree node.
    NodeMesh,
    /// Text label attached to a node.
    Label,
    /// Translucent halo around a node.
    GlowShell,
    /// Ring decoration around root nodes.
    NeonRing,
    /// Orbiting particle owned by a node.
    Firefly,
    /// Related-record label shown around a node in detail mode.
    DetailLabel,
    /// The "close" control shown in detail mode.
    ExitAffordance,
}

impl VisualKind {
    /// Only node meshes take part in hit testing.
    pub fn is_pickable(self) -> bool {
        matches!(self, VisualKind::NodeMesh)
    }
}

/// The material state detail mode snapshots and restores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub opacity: f32,
    pub transparent: bool,
    /// Highlight strength, 0 when idle.
    pub emissive: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            transparent: false,
            emissive: 0.0,
        }
    }
}

/// Per-visual animation state.
///
/// Every animation target lives on the visual it moves, so overlapping
/// animations on different visuals never share scratch state. Issuing a new
/// target replaces the old one in a single assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// Position before the first push, restored on release.
    pub home: Option<Vec3>,
    pub position_target: Option<Vec3>,
    pub scale_target: Option<Vec3>,
    pub(crate) returning_home: bool,
}

impl Motion {
    pub fn is_moving(&self) -> bool {
        self.position_target.is_some() || self.scale_target.is_some()
    }

    pub fn is_displaced(&self) -> bool {
        self.home.is_some()
    }
}

/// A retained visual record.
///
/// The public fields are the surface the interaction and detail-mode code
/// reads and writes. Hierarchy links stay private so they can only change
/// through [`SceneGraph`](crate::SceneGraph).
#[derive(Clone, Debug)]
pub struct Visual {
    pub(crate) kind: VisualKind,
    pub(crate) owner: Option<NodeId>,
    pub(crate) parent: Option<VisualId>,
    pub(crate) children: Vec<VisualId>,

    /// Local position, relative to the parent visual.
    pub position: Vec3,
    pub scale: Vec3,
    /// Bounding sphere radius at scale 1.
    pub radius: f32,
    pub material: Material,
    pub visible: bool,
    pub text: Option<String>,
    pub motion: Motion,
}

impl Visual {
    pub fn new(kind: VisualKind) -> Self {
        Self {
            kind,
            owner: None,
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            radius: 0.0,
            material: Material::default(),
            visible: true,
            text: None,
            motion: Motion::default(),
        }
    }

    pub fn with_owner(mut self, owner: NodeId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn kind(&self) -> VisualKind {
        self.kind
    }

    /// Node this visual belongs to, if any.
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn parent(&self) -> Option<VisualId> {
        self.parent
    }

    pub fn children(&self) -> &[VisualId] {
        &self.children
    }
}
