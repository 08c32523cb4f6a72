#![forbid(unsafe_code)]

mod font_metrics;
mod tree;

pub use font_metrics::{CharWidthClass, FontMetrics, FontMetricsConfig, FontPreset};
pub use tree::{NestedNode, NodeIndex, NodeKind, WbsNode, WbsTree, rename_node, to_outline};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved id of the virtual root that wraps top-level items.
pub const ROOT_ID: &str = "root";

/// Label shown for a virtual or synthesized root.
pub const DEFAULT_ROOT_LABEL: &str = "Project";

/// One level of indentation in serialized outlines.
pub const INDENT_UNIT: &str = "  ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WbsErrorCode {
    #[default]
    InvalidConfig,
    UnknownLayoutMode,
    Snapshot,
}

impl WbsErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidConfig => "wbs/error/config",
            Self::UnknownLayoutMode => "wbs/error/layout-mode",
            Self::Snapshot => "wbs/error/snapshot",
        }
    }
}

#[derive(Debug, Error)]
pub enum WbsError {
    #[error("invalid value for `{field}`: {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },
    #[error("unknown layout mode `{0}` (expected horizontal, vertical or radial)")]
    UnknownLayoutMode(String),
    #[error("malformed snapshot document: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl WbsError {
    #[must_use]
    pub fn code(&self) -> WbsErrorCode {
        match self {
            Self::InvalidConfig { .. } => WbsErrorCode::InvalidConfig,
            Self::UnknownLayoutMode(_) => WbsErrorCode::UnknownLayoutMode,
            Self::Snapshot(_) => WbsErrorCode::Snapshot,
        }
    }

    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

/// A point in layout-independent model space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Delta that moves `origin` onto `self`.
    #[must_use]
    pub fn delta_from(self, origin: Self) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// Node id to node-center position.
pub type PositionMap = BTreeMap<String, Point>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Vertical,
    Horizontal,
    Radial,
}

impl LayoutMode {
    pub const ALL: [Self; 3] = [Self::Vertical, Self::Horizontal, Self::Radial];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
            Self::Radial => "radial",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = WbsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vertical" | "v" | "tb" | "top-down" => Ok(Self::Vertical),
            "horizontal" | "h" | "lr" | "left-right" => Ok(Self::Horizontal),
            "radial" | "r" => Ok(Self::Radial),
            _ => Err(WbsError::UnknownLayoutMode(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeElement {
    pub id: String,
    pub label: String,
    /// Display depth below the visual root (visual root = 0).
    pub level: usize,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeElement {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
}

impl EdgeElement {
    #[must_use]
    pub fn between(source_id: &str, target_id: &str) -> Self {
        Self {
            id: format!("{source_id}->{target_id}"),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        }
    }
}

/// Flat node/edge list derived from a tree, in pre-order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DiagramElements {
    pub nodes: Vec<NodeElement>,
    pub edges: Vec<EdgeElement>,
}

impl DiagramElements {
    /// Flatten `tree` starting at its visual root.
    ///
    /// A sentinel root is skipped when a single top-level item can stand in
    /// for it; with several top-level items the sentinel is rendered as the
    /// shared root so the diagram stays connected.
    #[must_use]
    pub fn from_tree(tree: &WbsTree) -> Self {
        let mut elements = Self::default();
        let Some(visual_root) = tree.visual_root() else {
            return elements;
        };

        let mut stack = vec![(visual_root, 0_usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = tree.get(index);
            let parent_id = node
                .parent
                .filter(|_| index != visual_root)
                .map(|parent| tree.get(parent).id.clone());
            if let Some(parent_id) = &parent_id {
                elements.edges.push(EdgeElement::between(parent_id, &node.id));
            }
            elements.nodes.push(NodeElement {
                id: node.id.clone(),
                label: node.label.clone(),
                level: depth,
                parent_id,
            });
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        elements
    }

    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<&NodeElement> {
        self.nodes.iter().find(|node| node.id == id)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
