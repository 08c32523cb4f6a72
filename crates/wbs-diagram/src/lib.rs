//! Interactive WBS diagram state: layout-backed positions, group drag with
//! grid snapping, collapse, label sizing, keyboard nudge and undo/redo.

#![forbid(unsafe_code)]

mod config;
mod engine;
mod events;
mod export;
mod hierarchy;
mod history;
mod viewport;

pub use config::EngineConfig;
pub use engine::{DiagramEngine, RenameCommand};
pub use events::{ArrowKey, InputFocus, SurfaceEvent};
pub use export::{ExportDocument, FrameNode, RenderFrame, StyleSettings};
pub use history::{History, Snapshot, StyleOverride};
pub use viewport::{MAX_ZOOM, MIN_ZOOM, Viewport};
