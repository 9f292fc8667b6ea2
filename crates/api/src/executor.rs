//! Command and query execution against a Viewer.
//!
//! This module connects the abstract Command/Query types to the actual
//! viewer, executing operations and returning results.

use crate::{Command, CommandResult, NodeInfo, Query, QueryResult};
use tree::NodeId;
use viewer::{DetailPhase, PointerEvent, Viewer};

/// Longest time a single `AdvanceTime` may cover.
const MAX_ADVANCE_SECONDS: f32 = 600.0;

/// Most frames a single `AdvanceTime` may run.
const MAX_ADVANCE_FRAMES: f32 = MAX_ADVANCE_SECONDS * 1000.0;

/// Execute a command against a viewer.
pub fn execute_command(viewer: &mut Viewer, command: Command) -> CommandResult {
    log::debug!("execute {command:?}");
    match command {
        Command::SelectNode { id } => {
            if viewer.level_of(id).is_none() {
                return unknown_node(id);
            }
            CommandResult::changed(viewer.select_node(id))
        }

        Command::DeselectNode => CommandResult::changed(viewer.deselect_node()),

        Command::EnterDetailMode { id } => {
            if viewer.level_of(id).is_none() {
                return unknown_node(id);
            }
            CommandResult::changed(viewer.enter_detail_mode(id))
        }

        Command::ExitDetailMode => CommandResult::changed(viewer.exit_detail_mode()),

        Command::ZoomIn => CommandResult::changed(viewer.zoom_in()),

        Command::ZoomOut => CommandResult::changed(viewer.zoom_out()),

        Command::SetZoom { zoom } => {
            if !zoom.is_finite() || zoom <= 0.0 {
                return CommandResult::error(format!("invalid zoom {zoom}"));
            }
            CommandResult::changed(viewer.set_zoom(zoom))
        }

        Command::Pan { delta } => CommandResult::changed(viewer.pan(delta)),

        Command::Resize { width, height } => {
            if !(width > 0.0 && height > 0.0) {
                return CommandResult::error(format!("invalid size {width}x{height}"));
            }
            viewer.resize(width, height);
            CommandResult::success()
        }

        Command::Click { position, over_ui } => {
            let event = PointerEvent {
                over_ui,
                ..PointerEvent::new(position.x, position.y)
            };
            let before = snapshot(viewer);
            viewer.pointer_down(event);
            viewer.pointer_up(event);
            CommandResult::changed(snapshot(viewer) != before)
        }

        Command::Drag { from, to } => {
            let before = viewer.camera().target();
            viewer.pointer_down(PointerEvent::new(from.x, from.y));
            viewer.pointer_move(PointerEvent::new(to.x, to.y));
            viewer.pointer_up(PointerEvent::new(to.x, to.y));
            CommandResult::changed(viewer.camera().target() != before)
        }

        Command::SetMaxDepth { depth } => CommandResult::changed(viewer.set_max_depth(depth)),

        Command::SetLevelLimits { limits } => {
            viewer.set_level_limits(limits);
            CommandResult::success()
        }

        Command::AdvanceTime { seconds, step } => {
            if !(step > 0.0) || !seconds.is_finite() || seconds < 0.0 {
                return CommandResult::error("advance_time needs seconds >= 0 and step > 0");
            }
            if seconds > MAX_ADVANCE_SECONDS {
                return CommandResult::error(format!(
                    "advance_time is limited to {MAX_ADVANCE_SECONDS} seconds"
                ));
            }
            let frames = (seconds / step).ceil();
            if frames > MAX_ADVANCE_FRAMES {
                return CommandResult::error(format!(
                    "advance_time step {step} needs more than {MAX_ADVANCE_FRAMES} frames"
                ));
            }
            let frames = frames as usize;
            for frame in 0..frames {
                let dt = (seconds - step * frame as f32).clamp(0.0, step);
                viewer.update(dt);
            }
            CommandResult::changed(seconds > 0.0)
        }

        Command::Batch { commands } => {
            let mut changed = false;
            for cmd in commands {
                match execute_command(viewer, cmd) {
                    CommandResult::Success { changed: c } => changed |= c,
                    CommandResult::Error { message } => {
                        return CommandResult::error(format!("Batch failed: {}", message));
                    }
                }
            }
            CommandResult::changed(changed)
        }
    }
}

/// Execute a query against a viewer.
pub fn execute_query(viewer: &Viewer, query: Query) -> QueryResult {
    match query {
        Query::GetCamera => {
            let camera = viewer.camera();
            QueryResult::Camera {
                pose: camera.pose(),
                zoom: camera.zoom(),
                zoom_index: camera.zoom_index(),
                zoom_steps: camera.zoom_steps().to_vec(),
                controls_enabled: camera.controls_enabled(),
            }
        }

        Query::GetSelection => QueryResult::Selection {
            node: viewer.selected_node(),
        },

        Query::GetDetailState => {
            let detail = viewer.detail();
            QueryResult::DetailState {
                phase: detail.phase(),
                focused: detail.focused_node(),
                labels: detail
                    .labels()
                    .iter()
                    .filter_map(|id| viewer.scene().get(*id)?.text.clone())
                    .collect(),
            }
        }

        Query::GetNodes => {
            let mut nodes: Vec<NodeInfo> = viewer
                .forest()
                .iter()
                .flat_map(|laid_out| laid_out.tree.nodes())
                .filter_map(|node| node_info(viewer, node.id))
                .collect();
            nodes.sort_by_key(|info| info.id);
            QueryResult::Nodes { nodes }
        }

        Query::GetNode { id } => QueryResult::Node {
            node: node_info(viewer, id),
        },

        Query::GetLevelRadii { tree } => match viewer.forest().get(tree) {
            Some(laid_out) => QueryResult::LevelRadii {
                radii: laid_out.level_radii.as_slice().to_vec(),
            },
            None => QueryResult::Error {
                message: format!("no tree at index {tree}"),
            },
        },

        Query::GetVisualCount => QueryResult::Count {
            count: viewer.scene().len(),
        },
    }
}

fn unknown_node(id: NodeId) -> CommandResult {
    CommandResult::error(format!("unknown node {id}"))
}

/// State a click can change.
fn snapshot(viewer: &Viewer) -> (Option<NodeId>, DetailPhase, Option<NodeId>) {
    (
        viewer.selected_node(),
        viewer.detail().phase(),
        viewer.detail().focused_node(),
    )
}

fn node_info(viewer: &Viewer, id: NodeId) -> Option<NodeInfo> {
    let level = viewer.level_of(id)?;
    let scene = viewer.scene();
    let visual_id = scene.node_visual(id)?;
    let visual = scene.get(visual_id)?;
    Some(NodeInfo {
        id,
        level,
        text: visual.text.clone().unwrap_or_default(),
        position: scene.world_position(visual_id),
        scale: visual.scale.x,
        opacity: visual.material.opacity,
        visible: visual.visible,
    })
}
