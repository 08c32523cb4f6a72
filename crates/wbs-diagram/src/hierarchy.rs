use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use wbs_core::DiagramElements;

/// Parent/children index over flattened elements, built once per build.
#[derive(Debug, Clone, Default)]
pub(crate) struct Hierarchy {
    element_index: FxHashMap<String, usize>,
    parent: FxHashMap<String, String>,
    children: FxHashMap<String, Vec<String>>,
}

impl Hierarchy {
    pub(crate) fn new(elements: &DiagramElements) -> Self {
        let mut hierarchy = Self::default();
        for (index, node) in elements.nodes.iter().enumerate() {
            hierarchy.element_index.insert(node.id.clone(), index);
            if let Some(parent) = &node.parent_id {
                hierarchy.parent.insert(node.id.clone(), parent.clone());
                hierarchy
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }
        hierarchy
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.element_index.contains_key(id)
    }

    pub(crate) fn element_index(&self, id: &str) -> Option<usize> {
        self.element_index.get(id).copied()
    }

    pub(crate) fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn has_children(&self, id: &str) -> bool {
        !self.children(id).is_empty()
    }

    /// Strict descendants in pre-order.
    pub(crate) fn descendants(&self, id: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut stack: Vec<&String> = self.children(id).iter().rev().collect();
        while let Some(current) = stack.pop() {
            found.push(current.clone());
            stack.extend(self.children(current).iter().rev());
        }
        found
    }

    /// True when any strict ancestor of `id` is collapsed.
    pub(crate) fn is_hidden(&self, id: &str, collapsed: &BTreeSet<String>) -> bool {
        let mut cursor = self.parent.get(id);
        while let Some(parent) = cursor {
            if collapsed.contains(parent) {
                return true;
            }
            cursor = self.parent.get(parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbs_parser::parse;

    fn hierarchy() -> Hierarchy {
        let tree = parse("P\n  A\n    A1\n    A2\n      A2x\n  B").tree;
        Hierarchy::new(&DiagramElements::from_tree(&tree))
    }

    #[test]
    fn descendants_are_pre_order_and_strict() {
        let index = hierarchy();
        assert_eq!(index.descendants("1.1"), vec!["1.1.1", "1.1.2", "1.1.2.1"]);
        assert!(index.descendants("1.2").is_empty());
        assert!(index.descendants("missing").is_empty());
        assert_eq!(index.children("1"), ["1.1".to_string(), "1.2".to_string()]);
    }

    #[test]
    fn hidden_when_any_ancestor_is_collapsed() {
        let index = hierarchy();
        let collapsed: BTreeSet<String> = ["1.1".to_string()].into_iter().collect();
        assert!(index.is_hidden("1.1.2.1", &collapsed));
        assert!(index.is_hidden("1.1.1", &collapsed));
        assert!(!index.is_hidden("1.1", &collapsed));
        assert!(!index.is_hidden("1.2", &collapsed));
    }
}
