//! Interactive radial tree viewer core.
//!
//! Owns the camera, node selection, detail mode and decorative particles
//! for a forest laid out by the `tree` crate, and exposes a single
//! [`Viewer::update`] entry point for the render loop. Rendering itself is
//! left to whoever reads the [`scene_graph::SceneGraph`].

pub mod animation;
pub mod camera;
pub mod config;
pub mod detail;
pub mod fireflies;
pub mod interaction;
mod viewer;

pub use animation::{ease_in_out_cubic, Animator, Easing, Tick};
pub use camera::{visible_width, CameraManager, CameraPose, CameraSnapshot};
pub use config::ViewerConfig;
pub use detail::{detail_scale, DetailMode, DetailModeHost, DetailPhase};
pub use fireflies::FireflySystem;
pub use interaction::{HitTest, NodeInteraction, PointerEvent, SurfaceRect};
pub use viewer::{DragState, RecordIndex, Viewer};
