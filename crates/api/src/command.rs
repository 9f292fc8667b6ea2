//! Viewer commands - all operations that change viewer state.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tree::{LevelLimits, NodeId};

/// A command that changes viewer state.
///
/// Commands are serializable for:
/// - Recording sessions
/// - Scripting from the CLI
/// - Replaying interactions in tests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // === Selection ===
    /// Select a node. Levels 0 and 1 open detail mode instead.
    SelectNode { id: NodeId },

    /// Release the current selection.
    DeselectNode,

    // === Detail mode ===
    /// Focus a node in detail mode.
    EnterDetailMode { id: NodeId },

    /// Leave detail mode.
    ExitDetailMode,

    // === Camera ===
    ZoomIn,

    ZoomOut,

    /// Snap to the zoom step nearest to `zoom`.
    SetZoom { zoom: f32 },

    /// Pan as if the pointer moved by `delta` pixels.
    Pan { delta: Vec2 },

    /// Resize the render surface.
    Resize { width: f32, height: f32 },

    // === Pointer ===
    /// Press and release the primary button at a client position.
    Click {
        position: Vec2,
        #[serde(default)]
        over_ui: bool,
    },

    /// Press at `from`, move to `to`, release.
    Drag { from: Vec2, to: Vec2 },

    // === Data ===
    /// Rebuild with a new maximum depth.
    SetMaxDepth { depth: i32 },

    /// Rebuild with new per-level node caps.
    SetLevelLimits { limits: LevelLimits },

    // === Time ===
    /// Run the frame loop for `seconds`, in steps of `step` seconds.
    AdvanceTime {
        seconds: f32,
        #[serde(default = "default_frame_step")]
        step: f32,
    },

    // === Batch ===
    /// Execute multiple commands in sequence.
    Batch { commands: Vec<Command> },
}

fn default_frame_step() -> f32 {
    1.0 / 60.0
}

/// Result of executing a command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResult {
    /// Command ran. `changed` is false when it was a valid no-op.
    Success { changed: bool },
    /// Command failed.
    Error { message: String },
}

impl CommandResult {
    pub fn changed(changed: bool) -> Self {
        Self::Success { changed }
    }

    pub fn success() -> Self {
        Self::Success { changed: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_node_serializes_with_type_field() {
        let cmd = Command::SelectNode { id: NodeId(7) };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["type"], "select_node");
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn pan_serializes_delta_as_array() {
        let cmd = Command::Pan {
            delta: Vec2::new(10.0, 20.0),
        };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["type"], "pan");
        assert_eq!(json["delta"], serde_json::json!([10.0, 20.0]));
    }

    #[test]
    fn batch_command_contains_nested_commands() {
        let cmd = Command::Batch {
            commands: vec![Command::ZoomIn, Command::ExitDetailMode],
        };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["type"], "batch");
        let commands = json["commands"].as_array().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0]["type"], "zoom_in");
        assert_eq!(commands[1]["type"], "exit_detail_mode");
    }

    #[test]
    fn advance_time_defaults_step() {
        let cmd: Command = serde_json::from_str(r#"{"type": "advance_time", "seconds": 2}"#).unwrap();
        match cmd {
            Command::AdvanceTime { seconds, step } => {
                assert_eq!(seconds, 2.0);
                assert!((step - 1.0 / 60.0).abs() < 1e-7);
            }
            _ => panic!("Expected AdvanceTime command"),
        }
    }

    #[test]
    fn set_level_limits_deserializes_map() {
        let cmd: Command = serde_json::from_str(
            r#"{"type": "set_level_limits", "limits": {"1": 3, "2": 10}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::SetLevelLimits {
                limits: LevelLimits::new().with_limit(1, 3).with_limit(2, 10),
            }
        );
    }

    #[test]
    fn command_roundtrips_through_json() {
        let original = Command::Click {
            position: Vec2::new(5.0, 6.0),
            over_ui: true,
        };
        let json = serde_json::to_string(&original).unwrap();
        let restored: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn result_serializes_with_status() {
        let json = serde_json::to_value(CommandResult::error("nope")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "nope");

        let json = serde_json::to_value(CommandResult::changed(false)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["changed"], false);
    }
}
