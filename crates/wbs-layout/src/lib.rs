#![forbid(unsafe_code)]

use std::f64::consts::TAU;

use rustc_hash::FxHashMap;
use tracing::debug;
use wbs_core::{DiagramElements, LayoutMode, Point, PositionMap};

/// Computes initial node centers for a layout mode.
///
/// The diagram engine treats an adapter as a blocking black box: it hands
/// over the flattened elements and reads back one position per node id.
pub trait LayoutAdapter {
    fn place(&self, elements: &DiagramElements, mode: LayoutMode) -> PositionMap;
}

impl<F> LayoutAdapter for F
where
    F: Fn(&DiagramElements, LayoutMode) -> PositionMap,
{
    fn place(&self, elements: &DiagramElements, mode: LayoutMode) -> PositionMap {
        self(elements, mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpacing {
    /// Distance between neighbouring leaf slots.
    pub node_spacing: f64,
    /// Distance between consecutive depths.
    pub rank_spacing: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            node_spacing: 200.0,
            rank_spacing: 220.0,
        }
    }
}

/// Tidy tree placement: leaves take consecutive slots in pre-order and every
/// parent sits centred over its children.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TreeLayout {
    pub spacing: LayoutSpacing,
}

impl TreeLayout {
    #[must_use]
    pub const fn new(spacing: LayoutSpacing) -> Self {
        Self { spacing }
    }
}

/// Slot (along the sibling axis) and depth of every node, by element index.
fn assign_slots(elements: &DiagramElements) -> (Vec<f64>, usize) {
    let index_by_id: FxHashMap<&str, usize> = elements
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); elements.nodes.len()];
    let mut roots = Vec::new();
    for (index, node) in elements.nodes.iter().enumerate() {
        match node.parent_id.as_deref().and_then(|id| index_by_id.get(id)) {
            Some(parent) => children[*parent].push(index),
            None => roots.push(index),
        }
    }

    let mut slots = vec![0.0; elements.nodes.len()];
    let mut next_leaf = 0_usize;
    // Post-order walk so children are placed before their parent.
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|root| (*root, false)).collect();
    while let Some((index, expanded)) = stack.pop() {
        let kids = &children[index];
        if kids.is_empty() {
            slots[index] = next_leaf as f64;
            next_leaf += 1;
        } else if expanded {
            let first = slots[kids[0]];
            let last = slots[kids[kids.len() - 1]];
            slots[index] = (first + last) / 2.0;
        } else {
            stack.push((index, true));
            stack.extend(kids.iter().rev().map(|child| (*child, false)));
        }
    }
    (slots, next_leaf)
}

impl LayoutAdapter for TreeLayout {
    fn place(&self, elements: &DiagramElements, mode: LayoutMode) -> PositionMap {
        let (slots, leaves) = assign_slots(elements);
        let LayoutSpacing {
            node_spacing,
            rank_spacing,
        } = self.spacing;

        let positions: PositionMap = elements
            .nodes
            .iter()
            .zip(&slots)
            .map(|(node, slot)| {
                let depth = node.level as f64;
                let point = match mode {
                    LayoutMode::Vertical => Point::new(slot * node_spacing, depth * rank_spacing),
                    LayoutMode::Horizontal => Point::new(depth * rank_spacing, slot * node_spacing),
                    LayoutMode::Radial => {
                        let angle = TAU * slot / leaves.max(1) as f64;
                        let radius = depth * rank_spacing;
                        Point::new(radius * angle.cos(), radius * angle.sin())
                    }
                };
                (node.id.clone(), point)
            })
            .collect();

        debug!(
            mode = mode.as_str(),
            nodes = positions.len(),
            leaves,
            "tree layout placed"
        );
        positions
    }
}
