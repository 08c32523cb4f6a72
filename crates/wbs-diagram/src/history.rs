//! Snapshot-based undo/redo.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;
use wbs_core::{PositionMap, WbsError};

/// Per-node size override set by auto-fit or a manual resize.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_wrap_width: Option<f64>,
}

impl StyleOverride {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.text_wrap_width.is_none()
    }
}

/// Everything needed to restore the diagram except the selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub positions: PositionMap,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub style_overrides: BTreeMap<String, StyleOverride>,
    #[serde(default)]
    pub collapsed: BTreeSet<String>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, WbsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, WbsError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Bounded undo stack plus redo stack. Undo entries are the state captured
/// immediately before each mutation.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    capacity: usize,
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record the state before a new mutation. Invalidates redo.
    pub fn push(&mut self, before: Snapshot) {
        self.push_undo(before);
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
            trace!(capacity = self.capacity, "evicted oldest undo entry");
        }
    }

    /// Pop the newest undo entry, parking `current` on the redo stack.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(restored)
    }

    /// Mirror of [`History::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo_stack.pop()?;
        self.push_undo(current);
        Some(restored)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
