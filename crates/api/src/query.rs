//! Viewer queries - read-only access to viewer state.
//!
//! Queries allow inspecting the viewer without modifying it, e.g. to check
//! where a node ended up before issuing a click.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tree::NodeId;
use viewer::{CameraPose, DetailPhase};

/// A query for viewer state (read-only).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Get the camera pose and zoom state.
    GetCamera,

    /// Get the selected node.
    GetSelection,

    /// Get the detail-mode phase and labels.
    GetDetailState,

    /// Get every built node.
    GetNodes,

    /// Get a specific node by ID.
    GetNode { id: NodeId },

    /// Get the ring radii of one tree of the forest.
    GetLevelRadii { tree: usize },

    /// Get the number of live visuals.
    GetVisualCount,
}

/// Response to a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResult {
    Camera {
        pose: CameraPose,
        zoom: f32,
        zoom_index: usize,
        zoom_steps: Vec<f32>,
        controls_enabled: bool,
    },

    Selection { node: Option<NodeId> },

    DetailState {
        phase: DetailPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        focused: Option<NodeId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        labels: Vec<String>,
    },

    Nodes { nodes: Vec<NodeInfo> },

    Node { node: Option<NodeInfo> },

    LevelRadii { radii: Vec<f32> },

    Count { count: usize },

    Error { message: String },
}

/// Serializable node information.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub level: usize,
    pub text: String,
    /// Current world position of the node mesh.
    pub position: Vec3,
    pub scale: f32,
    pub opacity: f32,
    pub visible: bool,
}
