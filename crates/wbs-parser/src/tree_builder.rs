use wbs_core::{NodeIndex, WbsTree};

use crate::{Dialect, ParseResult};

/// Mints ids for rows whose natural id is taken or missing.
///
/// One generator lives for exactly one parse, so repeated parses of the same
/// input mint the same ids.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    next_row: usize,
}

impl IdGenerator {
    /// First free `<base>~<n>` id, `n` starting at 2.
    pub(crate) fn mint_variant(&mut self, tree: &WbsTree, base: &str) -> String {
        (2_usize..)
            .map(|n| format!("{base}~{n}"))
            .find(|candidate| tree.find(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    pub(crate) fn mint_row(&mut self, tree: &WbsTree) -> String {
        loop {
            self.next_row += 1;
            let candidate = format!("row-{}", self.next_row);
            if tree.find(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

pub(crate) struct TreeBuilder {
    tree: WbsTree,
    ids: IdGenerator,
    warnings: Vec<String>,
}

impl TreeBuilder {
    pub(crate) fn new(tree: WbsTree) -> Self {
        Self {
            tree,
            ids: IdGenerator::default(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn tree(&self) -> &WbsTree {
        &self.tree
    }

    pub(crate) fn root(&self) -> NodeIndex {
        self.tree.root()
    }

    pub(crate) fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Attach a node, minting a variant id when `id` is already in use.
    pub(crate) fn attach(&mut self, parent: NodeIndex, id: &str, label: &str) -> NodeIndex {
        if let Some(index) = self.tree.add_child(parent, id, label) {
            return index;
        }
        let minted = self.ids.mint_variant(&self.tree, id);
        self.add_warning(format!(
            "Duplicate id {id}: row \"{label}\" kept as {minted}"
        ));
        self.attach_minted(parent, &minted, label)
    }

    /// Attach a node that has no natural id.
    pub(crate) fn attach_unnamed(&mut self, parent: NodeIndex, label: &str) -> NodeIndex {
        let minted = self.ids.mint_row(&self.tree);
        self.attach_minted(parent, &minted, label)
    }

    fn attach_minted(&mut self, parent: NodeIndex, id: &str, label: &str) -> NodeIndex {
        // Minted ids are checked against the tree before they are handed out.
        self.tree.add_child(parent, id, label).unwrap_or(parent)
    }

    pub(crate) fn finish(mut self, dialect: Dialect) -> ParseResult {
        self.tree.normalize_levels();
        ParseResult {
            tree: self.tree,
            dialect,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IdGenerator, TreeBuilder};
    use crate::Dialect;
    use wbs_core::WbsTree;

    #[test]
    fn duplicate_ids_get_variants_and_warnings() {
        let mut builder = TreeBuilder::new(WbsTree::new_sentinel());
        let root = builder.root();
        builder.attach(root, "1.1", "First");
        let second = builder.attach(root, "1.1", "Second");
        let third = builder.attach(root, "1.1", "Third");

        assert_eq!(builder.tree().get(second).id, "1.1~2");
        assert_eq!(builder.tree().get(third).id, "1.1~3");
        let result = builder.finish(Dialect::CodedTable);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn row_ids_skip_existing_ids() {
        let mut tree = WbsTree::new_sentinel();
        let root = tree.root();
        tree.add_child(root, "row-1", "Taken").expect("row-1");
        let mut ids = IdGenerator::default();
        assert_eq!(ids.mint_row(&tree), "row-2");
        assert_eq!(ids.mint_row(&tree), "row-3");
    }
}
