use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, trace};
use wbs_core::{
    DiagramElements, FontMetrics, LayoutMode, NodeElement, Point, PositionMap, WbsError, WbsTree,
    to_outline,
};
use wbs_layout::{LayoutAdapter, TreeLayout};

use crate::config::EngineConfig;
use crate::events::{ArrowKey, InputFocus};
use crate::export::{ExportDocument, FrameNode, RenderFrame, StyleSettings};
use crate::hierarchy::Hierarchy;
use crate::history::{History, Snapshot, StyleOverride};
use crate::viewport::Viewport;

/// Relabel one node through the undoable mutation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameCommand {
    pub node_id: String,
    pub new_label: String,
}

impl RenameCommand {
    #[must_use]
    pub fn new(node_id: impl Into<String>, new_label: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            new_label: new_label.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct DragState {
    anchor: String,
    /// Grab-time center of every group member.
    origins: BTreeMap<String, Point>,
    /// Pointer position at grab time, in model space.
    grab: Option<Point>,
    baseline: Snapshot,
}

#[derive(Debug, Clone)]
struct NudgeState {
    held: BTreeSet<ArrowKey>,
    /// Every node moved so far; the selection may change mid-gesture.
    moved: BTreeSet<String>,
    baseline: Snapshot,
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Dragging(DragState),
    Nudging(NudgeState),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NodeBox {
    width: f64,
    height: f64,
    wrap_width: f64,
}

/// Owns all interactive diagram state derived from one tree.
pub struct DiagramEngine {
    config: EngineConfig,
    metrics: FontMetrics,
    adapter: Box<dyn LayoutAdapter>,
    mode: LayoutMode,
    tree: WbsTree,
    elements: DiagramElements,
    hierarchy: Hierarchy,
    positions: PositionMap,
    style_overrides: BTreeMap<String, StyleOverride>,
    collapsed: BTreeSet<String>,
    selection: BTreeSet<String>,
    viewport: Viewport,
    history: History,
    gesture: Gesture,
    focus: InputFocus,
}

impl fmt::Debug for DiagramEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramEngine")
            .field("mode", &self.mode)
            .field("nodes", &self.elements.node_count())
            .field("collapsed", &self.collapsed)
            .field("selection", &self.selection)
            .field("undo", &self.history.undo_len())
            .field("redo", &self.history.redo_len())
            .finish_non_exhaustive()
    }
}

impl DiagramEngine {
    /// Build an engine placed by the built-in [`TreeLayout`].
    pub fn new(tree: WbsTree, config: EngineConfig) -> Result<Self, WbsError> {
        Self::with_adapter(tree, config, TreeLayout::default())
    }

    pub fn with_adapter(
        tree: WbsTree,
        config: EngineConfig,
        adapter: impl LayoutAdapter + 'static,
    ) -> Result<Self, WbsError> {
        config.validate()?;
        let mut engine = Self {
            metrics: config.font_metrics(),
            adapter: Box::new(adapter),
            mode: LayoutMode::default(),
            tree,
            elements: DiagramElements::default(),
            hierarchy: Hierarchy::default(),
            positions: PositionMap::new(),
            style_overrides: BTreeMap::new(),
            collapsed: BTreeSet::new(),
            selection: BTreeSet::new(),
            viewport: Viewport::default(),
            history: History::new(config.history_capacity),
            gesture: Gesture::Idle,
            focus: InputFocus::Canvas,
            config,
        };
        engine.rebuild();
        Ok(engine)
    }

    #[must_use]
    pub fn with_layout_mode(mut self, mode: LayoutMode) -> Self {
        self.set_layout_mode(mode);
        self
    }

    /// Flatten the tree and request fresh positions from the adapter.
    ///
    /// Starts a new diagram: overrides, collapse state, selection, any open
    /// gesture and the history are all dropped.
    pub fn rebuild(&mut self) {
        self.elements = DiagramElements::from_tree(&self.tree);
        self.hierarchy = Hierarchy::new(&self.elements);

        let mut positions = self.adapter.place(&self.elements, self.mode);
        positions.retain(|id, _| self.hierarchy.contains(id));
        let placed = positions.len();
        for node in &self.elements.nodes {
            positions.entry(node.id.clone()).or_default();
        }
        self.positions = positions;

        self.style_overrides.clear();
        self.collapsed.clear();
        self.selection.clear();
        self.history.clear();
        self.gesture = Gesture::Idle;
        debug!(
            mode = self.mode.as_str(),
            nodes = self.elements.node_count(),
            edges = self.elements.edge_count(),
            unplaced = self.elements.node_count() - placed,
            "diagram built"
        );
    }

    /// Swap in a freshly parsed tree and rebuild.
    pub fn replace_tree(&mut self, tree: WbsTree) {
        self.tree = tree;
        self.rebuild();
    }

    /// Re-run layout in another mode. No-op when the mode is unchanged.
    pub fn set_layout_mode(&mut self, mode: LayoutMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.rebuild();
        true
    }

    #[must_use]
    pub const fn layout_mode(&self) -> LayoutMode {
        self.mode
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn tree(&self) -> &WbsTree {
        &self.tree
    }

    #[must_use]
    pub const fn elements(&self) -> &DiagramElements {
        &self.elements
    }

    #[must_use]
    pub const fn positions(&self) -> &PositionMap {
        &self.positions
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub const fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    #[must_use]
    pub const fn collapsed(&self) -> &BTreeSet<String> {
        &self.collapsed
    }

    #[must_use]
    pub fn style_override(&self, id: &str) -> Option<StyleOverride> {
        self.style_overrides.get(id).copied()
    }

    #[must_use]
    pub const fn focus(&self) -> InputFocus {
        self.focus
    }

    #[must_use]
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    /// Known and not under a collapsed ancestor.
    #[must_use]
    pub fn is_visible(&self, id: &str) -> bool {
        self.hierarchy.contains(id) && !self.hierarchy.is_hidden(id, &self.collapsed)
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging(_))
    }

    #[must_use]
    pub fn is_nudging(&self) -> bool {
        matches!(self.gesture, Gesture::Nudging(_))
    }

    fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    fn element(&self, id: &str) -> Option<&NodeElement> {
        self.hierarchy
            .element_index(id)
            .map(|index| &self.elements.nodes[index])
    }

    fn node_box(&self, id: &str) -> Option<NodeBox> {
        let element = self.element(id)?;
        let padding = self.config.label_padding;
        let style = self.style_overrides.get(id).copied().unwrap_or_default();
        let width = style.width.unwrap_or(self.config.node_width);
        let wrap_width = style
            .text_wrap_width
            .unwrap_or(width - 2.0 * padding)
            .max(1.0);
        let text_height = self.metrics.wrapped_height(&element.label, wrap_width) + 2.0 * padding;
        Some(NodeBox {
            width,
            height: text_height.max(self.config.node_height),
            wrap_width,
        })
    }

    /// Rendered `(width, height)` of a node.
    #[must_use]
    pub fn node_size(&self, id: &str) -> Option<(f64, f64)> {
        self.node_box(id).map(|node| (node.width, node.height))
    }

    /// Full copy of the restorable state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            positions: self.positions.clone(),
            labels: self
                .elements
                .nodes
                .iter()
                .map(|node| (node.id.clone(), node.label.clone()))
                .collect(),
            style_overrides: self.style_overrides.clone(),
            collapsed: self.collapsed.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.positions = snapshot.positions;
        for (id, label) in &snapshot.labels {
            self.apply_label(id, label);
        }
        self.style_overrides = snapshot.style_overrides;
        self.collapsed = snapshot.collapsed;
        let (hierarchy, collapsed) = (&self.hierarchy, &self.collapsed);
        self.selection
            .retain(|id| hierarchy.contains(id) && !hierarchy.is_hidden(id, collapsed));
    }

    fn checkpoint(&mut self) {
        let before = self.snapshot();
        self.history.push(before);
        trace!(undo = self.history.undo_len(), "history entry pushed");
    }

    fn apply_label(&mut self, id: &str, label: &str) -> bool {
        let Some(index) = self.hierarchy.element_index(id) else {
            return false;
        };
        let element = &mut self.elements.nodes[index];
        if element.label == label {
            return false;
        }
        element.label = label.to_string();
        self.tree.set_label(id, label);
        true
    }

    // Selection

    /// Make `id` the only selected node. Hidden nodes cannot be selected.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.is_visible(id) || (self.selection.len() == 1 && self.selection.contains(id)) {
            return false;
        }
        self.selection.clear();
        self.selection.insert(id.to_string());
        true
    }

    pub fn add_to_selection(&mut self, id: &str) -> bool {
        self.is_visible(id) && self.selection.insert(id.to_string())
    }

    pub fn toggle_selection(&mut self, id: &str) -> bool {
        if self.selection.remove(id) {
            return true;
        }
        self.is_visible(id) && self.selection.insert(id.to_string())
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = !self.selection.is_empty();
        self.selection.clear();
        changed
    }

    pub fn set_focus(&mut self, focus: InputFocus) -> bool {
        if focus == self.focus {
            return false;
        }
        if focus == InputFocus::TextField {
            self.end_nudge();
        }
        self.focus = focus;
        true
    }

    // Group drag

    /// The selection when `id` is part of a multi-selection, otherwise `id`
    /// and its whole subtree (hidden nodes included).
    fn drag_group(&self, id: &str) -> Vec<String> {
        if self.selection.len() > 1 && self.selection.contains(id) {
            return self.selection.iter().cloned().collect();
        }
        std::iter::once(id.to_string())
            .chain(self.hierarchy.descendants(id))
            .collect()
    }

    /// Grab `id`. Group positions and the undo baseline are captured here,
    /// before any movement is applied.
    pub fn begin_drag(&mut self, id: &str) -> bool {
        self.begin_drag_with_grab(id, None)
    }

    pub(crate) fn begin_drag_with_grab(&mut self, id: &str, grab: Option<Point>) -> bool {
        if !self.is_idle() || !self.hierarchy.contains(id) {
            return false;
        }
        let origins: BTreeMap<String, Point> = self
            .drag_group(id)
            .into_iter()
            .filter_map(|member| self.positions.get(&member).map(|point| (member, *point)))
            .collect();
        trace!(anchor = id, members = origins.len(), "drag started");
        self.gesture = Gesture::Dragging(DragState {
            anchor: id.to_string(),
            origins,
            grab,
            baseline: self.snapshot(),
        });
        true
    }

    /// Move the anchor to `anchor_position`; every other member follows by
    /// the same delta from its grab-time position.
    pub fn drag_to(&mut self, anchor_position: Point) -> bool {
        let Gesture::Dragging(drag) = &self.gesture else {
            return false;
        };
        let Some(origin) = drag.origins.get(&drag.anchor) else {
            return false;
        };
        let (dx, dy) = anchor_position.delta_from(*origin);
        for (id, start) in &drag.origins {
            self.positions.insert(id.clone(), start.translate(dx, dy));
        }
        true
    }

    /// Drag by a model-space delta measured from the grab position.
    pub fn drag_by(&mut self, dx: f64, dy: f64) -> bool {
        let Gesture::Dragging(drag) = &self.gesture else {
            return false;
        };
        let Some(origin) = drag.origins.get(&drag.anchor).copied() else {
            return false;
        };
        self.drag_to(origin.translate(dx, dy))
    }

    pub(crate) fn drag_pointer_to(&mut self, pointer: Point) -> bool {
        let target = {
            let Gesture::Dragging(drag) = &self.gesture else {
                return false;
            };
            let (Some(grab), Some(origin)) = (drag.grab, drag.origins.get(&drag.anchor)) else {
                return false;
            };
            let (dx, dy) = pointer.delta_from(grab);
            origin.translate(dx, dy)
        };
        self.drag_to(target)
    }

    /// Release: snap the group, then record the pre-drag baseline.
    pub fn end_drag(&mut self) -> bool {
        if !self.is_dragging() {
            return false;
        }
        let Gesture::Dragging(drag) = std::mem::take(&mut self.gesture) else {
            return false;
        };
        let members: Vec<String> = drag.origins.into_keys().collect();
        self.commit_gesture(drag.baseline, &members)
    }

    fn commit_gesture(&mut self, baseline: Snapshot, members: &[String]) -> bool {
        if self.config.snap_to_grid {
            for id in members {
                self.snap_node(id);
            }
        }
        if self.positions == baseline.positions {
            return false;
        }
        self.history.push(baseline);
        trace!(members = members.len(), undo = self.history.undo_len(), "gesture committed");
        true
    }

    fn snap_node(&mut self, id: &str) {
        let (Some(center), Some(node)) = (self.position(id), self.node_box(id)) else {
            return;
        };
        let snapped = self
            .viewport
            .snap_top_left(center, node.width, node.height, self.config.grid_pitch);
        self.positions.insert(id.to_string(), snapped);
    }

    // Keyboard nudge

    /// Move the selection one grid unit (or `coarse_nudge_steps` units).
    ///
    /// The first key-down opens a nudge gesture; repeats and further keys
    /// join it until every key is released.
    pub fn nudge(&mut self, key: ArrowKey, coarse: bool) -> bool {
        if self.focus == InputFocus::TextField || self.selection.is_empty() || self.is_dragging() {
            return false;
        }
        if self.is_idle() {
            let baseline = self.snapshot();
            self.gesture = Gesture::Nudging(NudgeState {
                held: BTreeSet::new(),
                moved: BTreeSet::new(),
                baseline,
            });
        }
        if let Gesture::Nudging(nudge) = &mut self.gesture {
            nudge.held.insert(key);
            nudge.moved.extend(self.selection.iter().cloned());
        }

        let steps = if coarse {
            f64::from(self.config.coarse_nudge_steps)
        } else {
            1.0
        };
        let distance = self.viewport.screen_to_model_distance(self.config.grid_pitch) * steps;
        let (unit_x, unit_y) = key.unit();
        for id in &self.selection {
            if let Some(point) = self.positions.get_mut(id) {
                *point = point.translate(unit_x * distance, unit_y * distance);
            }
        }
        true
    }

    /// Key-up; the nudge commits once no arrow key is held.
    pub fn release_key(&mut self, key: ArrowKey) -> bool {
        let Gesture::Nudging(nudge) = &mut self.gesture else {
            return false;
        };
        nudge.held.remove(&key);
        if nudge.held.is_empty() {
            self.end_nudge()
        } else {
            false
        }
    }

    /// Close an open nudge: snap every moved node and record one history entry.
    pub fn end_nudge(&mut self) -> bool {
        if !self.is_nudging() {
            return false;
        }
        let Gesture::Nudging(nudge) = std::mem::take(&mut self.gesture) else {
            return false;
        };
        let members: Vec<String> = nudge.moved.into_iter().collect();
        self.commit_gesture(nudge.baseline, &members)
    }

    // Collapse

    pub fn collapse(&mut self, id: &str) -> bool {
        if !self.is_idle() || !self.hierarchy.has_children(id) || self.collapsed.contains(id) {
            return false;
        }
        self.checkpoint();
        self.collapsed.insert(id.to_string());
        self.selection
            .retain(|selected| !self.hierarchy.is_hidden(selected, &self.collapsed));
        true
    }

    /// Reveal direct children again; collapsed descendants stay collapsed.
    pub fn expand(&mut self, id: &str) -> bool {
        if !self.is_idle() || !self.collapsed.contains(id) {
            return false;
        }
        self.checkpoint();
        self.collapsed.remove(id);
        true
    }

    pub fn toggle_collapse(&mut self, id: &str) -> bool {
        if self.collapsed.contains(id) {
            self.expand(id)
        } else {
            self.collapse(id)
        }
    }

    // Sizing

    fn fitted_style(&self, id: &str) -> Option<StyleOverride> {
        let element = self.element(id)?;
        let padding = self.config.label_padding;
        let measured = self.metrics.estimate_multiline_width(&element.label) + 2.0 * padding;
        let width = measured.clamp(self.config.min_width, self.config.max_width);
        Some(StyleOverride {
            width: Some(width),
            text_wrap_width: Some((width - 2.0 * padding).max(1.0)),
        })
    }

    /// Size a node to its label, clamped into `[min_width, max_width]`.
    pub fn auto_fit(&mut self, id: &str) -> bool {
        if !self.is_idle() {
            return false;
        }
        let Some(fitted) = self.fitted_style(id) else {
            return false;
        };
        if self.style_overrides.get(id) == Some(&fitted) {
            return false;
        }
        self.checkpoint();
        self.style_overrides.insert(id.to_string(), fitted);
        true
    }

    /// Auto-fit every node as one undoable step.
    pub fn auto_fit_all(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        let changed: Vec<(String, StyleOverride)> = self
            .elements
            .nodes
            .iter()
            .filter_map(|node| self.fitted_style(&node.id).map(|style| (node.id.clone(), style)))
            .filter(|(id, style)| self.style_overrides.get(id) != Some(style))
            .collect();
        if changed.is_empty() {
            return false;
        }
        self.checkpoint();
        self.style_overrides.extend(changed);
        true
    }

    /// Manual resize; the label wraps inside the new width.
    pub fn resize_node(&mut self, id: &str, width: f64) -> bool {
        if !self.is_idle() || !self.hierarchy.contains(id) || !(width.is_finite() && width > 0.0) {
            return false;
        }
        let style = StyleOverride {
            width: Some(width),
            text_wrap_width: Some((width - 2.0 * self.config.label_padding).max(1.0)),
        };
        if self.style_overrides.get(id) == Some(&style) {
            return false;
        }
        self.checkpoint();
        self.style_overrides.insert(id.to_string(), style);
        true
    }

    /// Drop a node's size override so it follows the global default again.
    pub fn reset_size(&mut self, id: &str) -> bool {
        if !self.is_idle() || !self.style_overrides.contains_key(id) {
            return false;
        }
        self.checkpoint();
        self.style_overrides.remove(id);
        true
    }

    // Rename

    /// Apply a rename. Blank or unchanged labels are ignored.
    pub fn rename(&mut self, command: &RenameCommand) -> bool {
        let label = command.new_label.trim();
        if !self.is_idle() || label.is_empty() {
            return false;
        }
        match self.element(&command.node_id) {
            Some(element) if element.label != label => {}
            _ => return false,
        }
        self.checkpoint();
        self.apply_label(&command.node_id, label)
    }

    // History

    pub fn undo(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            return false;
        };
        self.restore(previous);
        debug!(
            undo = self.history.undo_len(),
            redo = self.history.redo_len(),
            "undo"
        );
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            return false;
        };
        self.restore(next);
        debug!(
            undo = self.history.undo_len(),
            redo = self.history.redo_len(),
            "redo"
        );
        true
    }

    // Cosmetic settings: positions, collapse state, selection and history survive.

    fn update_config(&mut self, candidate: EngineConfig) -> Result<(), WbsError> {
        candidate.validate()?;
        self.metrics = candidate.font_metrics();
        self.history.set_capacity(candidate.history_capacity);
        self.config = candidate;
        Ok(())
    }

    pub fn set_font_size(&mut self, font_size: f64) -> Result<(), WbsError> {
        self.update_config(EngineConfig {
            font_size,
            ..self.config
        })
    }

    pub fn set_default_node_size(&mut self, width: f64, height: f64) -> Result<(), WbsError> {
        self.update_config(EngineConfig {
            node_width: width,
            node_height: height,
            ..self.config
        })
    }

    pub fn set_grid_pitch(&mut self, grid_pitch: f64) -> Result<(), WbsError> {
        self.update_config(EngineConfig {
            grid_pitch,
            ..self.config
        })
    }

    pub fn set_snap_to_grid(&mut self, snap_to_grid: bool) {
        self.config.snap_to_grid = snap_to_grid;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_at(&mut self, factor: f64, x: f64, y: f64) -> bool {
        let before = self.viewport;
        self.viewport.zoom_at(factor, x, y);
        self.viewport != before
    }

    pub fn reset_viewport(&mut self) {
        self.viewport.reset();
    }

    // Output

    /// Visible nodes and edges, ready to paint.
    #[must_use]
    pub fn render_frame(&self) -> RenderFrame {
        let nodes = self
            .elements
            .nodes
            .iter()
            .filter(|node| self.is_visible(&node.id))
            .filter_map(|node| {
                let center = self.position(&node.id)?;
                let node_box = self.node_box(&node.id)?;
                Some(FrameNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    level: node.level,
                    x: center.x - node_box.width / 2.0,
                    y: center.y - node_box.height / 2.0,
                    width: node_box.width,
                    height: node_box.height,
                    lines: self.metrics.wrap_to_width(&node.label, node_box.wrap_width),
                    collapsed: self.collapsed.contains(&node.id),
                    child_count: self.hierarchy.children(&node.id).len(),
                    selected: self.selection.contains(&node.id),
                })
            })
            .collect();
        let edges = self
            .elements
            .edges
            .iter()
            .filter(|edge| self.is_visible(&edge.target_id))
            .cloned()
            .collect();
        RenderFrame {
            nodes,
            edges,
            viewport: self.viewport,
        }
    }

    #[must_use]
    pub fn export_document(&self, title: &str) -> ExportDocument {
        ExportDocument {
            title: title.to_string(),
            layout_mode: self.mode,
            style: StyleSettings {
                font_size: self.config.font_size,
                node_width: self.config.node_width,
                node_height: self.config.node_height,
                grid_pitch: self.config.grid_pitch,
                snap_to_grid: self.config.snap_to_grid,
            },
            elements: self.elements.clone(),
            snapshot: self.snapshot(),
            viewport: self.viewport,
        }
    }

    /// Current tree as outline text, renames included.
    #[must_use]
    pub fn outline(&self) -> String {
        to_outline(&self.tree)
    }
}
