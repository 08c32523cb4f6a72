//! Arena-backed work-breakdown tree.
//!
//! Nodes live in a flat table and refer to each other by [`NodeIndex`], so a
//! rename touches exactly one entry. Value semantics are still available via
//! [`rename_node`], which copies the table and patches the copy.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_ROOT_LABEL, INDENT_UNIT, ROOT_ID};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// A node backed by an input line or row.
    #[default]
    Item,
    /// Virtual wrapper of an indentation outline. Never serialized to text;
    /// its children sit at level 0.
    Sentinel,
    /// Generic root minted for a coded table with no common root row.
    SyntheticRoot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WbsNode {
    pub id: String,
    pub label: String,
    pub level: usize,
    pub kind: NodeKind,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WbsTree {
    nodes: Vec<WbsNode>,
    root: NodeIndex,
    index_by_id: FxHashMap<String, NodeIndex>,
}

impl Default for WbsTree {
    fn default() -> Self {
        Self::new_sentinel()
    }
}

impl WbsTree {
    /// Empty tree rooted at the virtual sentinel.
    #[must_use]
    pub fn new_sentinel() -> Self {
        Self::with_root(ROOT_ID, DEFAULT_ROOT_LABEL, NodeKind::Sentinel)
    }

    #[must_use]
    pub fn with_root(id: &str, label: &str, kind: NodeKind) -> Self {
        let root = WbsNode {
            id: id.to_string(),
            label: label.to_string(),
            level: 0,
            kind,
            parent: None,
            children: Vec::new(),
        };
        let mut index_by_id = FxHashMap::default();
        index_by_id.insert(root.id.clone(), NodeIndex(0));
        Self {
            nodes: vec![root],
            root: NodeIndex(0),
            index_by_id,
        }
    }

    /// Append a child under `parent`. Returns `None` when `id` is taken.
    pub fn add_child(&mut self, parent: NodeIndex, id: &str, label: &str) -> Option<NodeIndex> {
        if self.index_by_id.contains_key(id) || parent.0 >= self.nodes.len() {
            return None;
        }
        let index = NodeIndex(self.nodes.len());
        let level = self.child_level(parent);
        self.nodes.push(WbsNode {
            id: id.to_string(),
            label: label.to_string(),
            level,
            kind: NodeKind::Item,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(index);
        self.index_by_id.insert(id.to_string(), index);
        Some(index)
    }

    fn child_level(&self, parent: NodeIndex) -> usize {
        let parent = &self.nodes[parent.0];
        match parent.kind {
            NodeKind::Sentinel => 0,
            NodeKind::Item | NodeKind::SyntheticRoot => parent.level + 1,
        }
    }

    /// Recompute every level top-down from the root, ignoring stored values.
    pub fn normalize_levels(&mut self) {
        self.nodes[self.root.0].level = 0;
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let child_level = self.child_level(index);
            let children = self.nodes[index.0].children.clone();
            for child in children {
                self.nodes[child.0].level = child_level;
                stack.push(child);
            }
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeIndex {
        self.root
    }

    /// # Panics
    ///
    /// Panics if `index` does not belong to this tree.
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> &WbsNode {
        &self.nodes[index.0]
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.index_by_id.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&WbsNode> {
        self.find(id).map(|index| self.get(index))
    }

    pub fn children(&self, index: NodeIndex) -> impl Iterator<Item = &WbsNode> {
        self.nodes[index.0]
            .children
            .iter()
            .map(|child| &self.nodes[child.0])
    }

    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&WbsNode> {
        self.node(id)
            .and_then(|node| node.parent)
            .map(|parent| self.get(parent))
    }

    /// Total node count including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds nothing but its root sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Node count excluding a sentinel root.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self.get(self.root).kind {
            NodeKind::Sentinel => self.nodes.len() - 1,
            NodeKind::Item | NodeKind::SyntheticRoot => self.nodes.len(),
        }
    }

    /// Pre-order walk from the root, root included.
    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index.0].children.iter().rev().copied());
        }
        order
    }

    /// Strict descendants of `index` in pre-order.
    #[must_use]
    pub fn descendants(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeIndex> = self.nodes[index.0].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            found.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        found
    }

    #[must_use]
    pub fn max_level(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind != NodeKind::Sentinel)
            .map(|node| node.level)
            .max()
            .unwrap_or(0)
    }

    /// Node promoted to the top of the rendered diagram.
    ///
    /// A sentinel with exactly one child hands the role to that child without
    /// touching its id or level. `None` for an empty tree.
    #[must_use]
    pub fn visual_root(&self) -> Option<NodeIndex> {
        let root = self.get(self.root);
        match (root.kind, root.children.as_slice()) {
            (NodeKind::Sentinel, []) => None,
            (NodeKind::Sentinel, [only]) => Some(*only),
            _ => Some(self.root),
        }
    }

    /// Rename one node in place. Returns false when the id is unknown or the
    /// label is unchanged.
    pub fn set_label(&mut self, id: &str, label: &str) -> bool {
        let Some(index) = self.find(id) else {
            return false;
        };
        let node = &mut self.nodes[index.0];
        if node.label == label {
            return false;
        }
        node.label = label.to_string();
        true
    }

    /// `(level, label)` for every serialized node, in pre-order.
    #[must_use]
    pub fn outline_shape(&self) -> Vec<(usize, String)> {
        self.pre_order()
            .into_iter()
            .map(|index| self.get(index))
            .filter(|node| node.kind != NodeKind::Sentinel)
            .map(|node| (node.level, node.label.clone()))
            .collect()
    }

    #[must_use]
    pub fn to_nested(&self) -> NestedNode {
        self.nested_from(self.root)
    }

    fn nested_from(&self, index: NodeIndex) -> NestedNode {
        let node = self.get(index);
        NestedNode {
            id: node.id.clone(),
            label: node.label.clone(),
            level: node.level,
            kind: node.kind,
            children: node
                .children
                .iter()
                .map(|child| self.nested_from(*child))
                .collect(),
        }
    }

    /// Rebuild an arena from its nested form. Levels are recomputed and
    /// subtrees whose id repeats an earlier one are dropped.
    #[must_use]
    pub fn from_nested(nested: &NestedNode) -> Self {
        let mut tree = Self::with_root(&nested.id, &nested.label, nested.kind);
        let mut stack: Vec<(NodeIndex, &NestedNode)> = nested
            .children
            .iter()
            .rev()
            .map(|child| (tree.root, child))
            .collect();
        while let Some((parent, child)) = stack.pop() {
            let Some(index) = tree.add_child(parent, &child.id, &child.label) else {
                continue;
            };
            stack.extend(child.children.iter().rev().map(|grandchild| (index, grandchild)));
        }
        tree.normalize_levels();
        tree
    }
}

/// Serde mirror of a [`WbsTree`] as nested value objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub level: usize,
    #[serde(default, skip_serializing_if = "is_item")]
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<NestedNode>,
}

fn is_item(kind: &NodeKind) -> bool {
    *kind == NodeKind::Item
}

/// Serialize a tree as an indented outline, one node per line.
///
/// The sentinel root is omitted; every other node is prefixed with
/// [`INDENT_UNIT`] repeated `level` times.
#[must_use]
pub fn to_outline(tree: &WbsTree) -> String {
    tree.pre_order()
        .into_iter()
        .map(|index| tree.get(index))
        .filter(|node| node.kind != NodeKind::Sentinel)
        .map(|node| format!("{}{}", INDENT_UNIT.repeat(node.level), node.label))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Copy of `tree` with the node `id` relabeled; unknown ids yield an equal copy.
#[must_use]
pub fn rename_node(tree: &WbsTree, id: &str, new_label: &str) -> WbsTree {
    let mut renamed = tree.clone();
    renamed.set_label(id, new_label);
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn planning_tree() -> WbsTree {
        let mut tree = WbsTree::new_sentinel();
        let root = tree.root();
        let project = tree.add_child(root, "1", "Project").expect("project");
        let planning = tree.add_child(project, "1.1", "Planning").expect("planning");
        tree.add_child(planning, "1.1.1", "Define scope").expect("scope");
        tree.add_child(planning, "1.1.2", "Identify stakeholders")
            .expect("stakeholders");
        let execution = tree.add_child(project, "1.2", "Execution").expect("execution");
        tree.add_child(execution, "1.2.1", "Build A").expect("build");
        tree
    }

    #[test]
    fn sentinel_children_start_at_level_zero() {
        let tree = planning_tree();
        assert_eq!(tree.node("1").map(|n| n.level), Some(0));
        assert_eq!(tree.node("1.1").map(|n| n.level), Some(1));
        assert_eq!(tree.node("1.1.2").map(|n| n.level), Some(2));
        assert_eq!(tree.item_count(), 6);
        assert_eq!(tree.max_level(), 2);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut tree = WbsTree::new_sentinel();
        let root = tree.root();
        assert!(tree.add_child(root, "1", "A").is_some());
        assert!(tree.add_child(root, "1", "B").is_none());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn outline_uses_indent_unit_per_level() {
        let outline = to_outline(&planning_tree());
        assert_eq!(
            outline,
            "Project\n  Planning\n    Define scope\n    Identify stakeholders\n  Execution\n    Build A"
        );
    }

    #[test]
    fn synthetic_root_is_serialized() {
        let mut tree = WbsTree::with_root(ROOT_ID, DEFAULT_ROOT_LABEL, NodeKind::SyntheticRoot);
        let root = tree.root();
        tree.add_child(root, "1.1", "Planning").expect("planning");
        assert_eq!(to_outline(&tree), "Project\n  Planning");
    }

    #[test]
    fn rename_copies_and_preserves_structure() {
        let tree = planning_tree();
        let renamed = rename_node(&tree, "1.1", "Initiation");

        assert_eq!(tree.node("1.1").map(|n| n.label.as_str()), Some("Planning"));
        assert_eq!(
            renamed.node("1.1").map(|n| n.label.as_str()),
            Some("Initiation")
        );
        assert_eq!(renamed.node("1.1").map(|n| n.level), Some(1));
        let ids: Vec<String> = renamed
            .pre_order()
            .into_iter()
            .map(|i| renamed.get(i).id.clone())
            .collect();
        let original_ids: Vec<String> = tree
            .pre_order()
            .into_iter()
            .map(|i| tree.get(i).id.clone())
            .collect();
        assert_eq!(ids, original_ids);
    }

    #[test]
    fn rename_unknown_id_returns_equal_tree() {
        let tree = planning_tree();
        assert_eq!(rename_node(&tree, "9.9", "Nope"), tree);
    }

    #[test]
    fn set_label_reports_noop_for_same_label() {
        let mut tree = planning_tree();
        assert!(!tree.set_label("1.1", "Planning"));
        assert!(tree.set_label("1.1", "Plan"));
        assert!(!tree.set_label("missing", "x"));
    }

    #[test]
    fn visual_root_promotes_single_child() {
        let tree = planning_tree();
        assert_eq!(tree.visual_root().map(|i| tree.get(i).id.clone()), Some("1".to_string()));
        assert_eq!(WbsTree::new_sentinel().visual_root(), None);
    }

    #[test]
    fn descendants_are_strict_and_pre_ordered() {
        let tree = planning_tree();
        let planning = tree.find("1.1").expect("planning");
        let ids: Vec<&str> = tree
            .descendants(planning)
            .into_iter()
            .map(|i| tree.get(i).id.as_str())
            .collect();
        assert_eq!(ids, vec!["1.1.1", "1.1.2"]);
        assert_eq!(tree.parent_of("1.1.1").map(|n| n.id.as_str()), Some("1.1"));
    }

    #[test]
    fn nested_form_recomputes_levels() {
        let mut nested = planning_tree().to_nested();
        nested.children[0].level = 42;
        let rebuilt = WbsTree::from_nested(&nested);
        assert_eq!(rebuilt, planning_tree());

        let json = serde_json::to_string(&nested).expect("serialize nested");
        assert!(json.contains("\"kind\":\"sentinel\""));
        let decoded: NestedNode = serde_json::from_str(&json).expect("deserialize nested");
        assert_eq!(WbsTree::from_nested(&decoded), rebuilt);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_levels_follow_parents(shape in proptest::collection::vec(0_usize..8, 1..40)) {
            let mut tree = WbsTree::new_sentinel();
            let mut created = vec![tree.root()];
            for (position, pick) in shape.iter().enumerate() {
                let parent = created[pick % created.len()];
                let id = format!("n{position}");
                let index = tree.add_child(parent, &id, &id).expect("unique id");
                created.push(index);
            }
            let before = tree.clone();
            tree.normalize_levels();
            prop_assert_eq!(&tree, &before);

            for index in tree.pre_order() {
                let node = tree.get(index);
                if let Some(parent) = node.parent {
                    let parent = tree.get(parent);
                    let expected = if parent.kind == NodeKind::Sentinel { 0 } else { parent.level + 1 };
                    prop_assert_eq!(node.level, expected);
                }
            }
        }
    }
}
