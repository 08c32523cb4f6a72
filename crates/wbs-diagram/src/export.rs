//! Plain data handed to render surfaces and export encoders.

use serde::{Deserialize, Serialize};
use wbs_core::{DiagramElements, EdgeElement, LayoutMode, WbsError};

use crate::history::Snapshot;
use crate::viewport::Viewport;

/// One node as the surface should paint it. Coordinates are model space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNode {
    pub id: String,
    pub label: String,
    pub level: usize,
    /// Rendered top-left corner.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Label wrapped at the node's text-wrap width.
    pub lines: Vec<String>,
    pub collapsed: bool,
    pub child_count: usize,
    pub selected: bool,
}

/// Everything visible right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub nodes: Vec<FrameNode>,
    pub edges: Vec<EdgeElement>,
    pub viewport: Viewport,
}

impl RenderFrame {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&FrameNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Display settings carried alongside an export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleSettings {
    pub font_size: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub grid_pitch: f64,
    pub snap_to_grid: bool,
}

/// Full engine state for an external encoder (image, JSON, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub title: String,
    pub layout_mode: LayoutMode,
    pub style: StyleSettings,
    pub elements: DiagramElements,
    pub snapshot: Snapshot,
    pub viewport: Viewport,
}

impl ExportDocument {
    pub fn to_json(&self) -> Result<String, WbsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, WbsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, WbsError> {
        Ok(serde_json::from_str(json)?)
    }
}
