//! Indentation dialect: depth comes from leading whitespace.

use wbs_core::{INDENT_UNIT, NodeIndex, WbsTree};

use crate::ParseResult;
use crate::detect::{Dialect, unify_line_endings};
use crate::tree_builder::TreeBuilder;

/// Line endings unified, tabs expanded, trailing whitespace and blank lines dropped.
pub(crate) fn normalized_lines(input: &str, tab_width: usize) -> Vec<String> {
    let tab = " ".repeat(tab_width);
    unify_line_endings(input)
        .lines()
        .map(|line| line.replace('\t', &tab).trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Build a tree from normalized lines with an indentation stack.
///
/// Frames whose indent is at least the new line's are popped; the new node
/// hangs under the frame left on top. Ids are 1-based sibling paths.
pub(crate) fn build_indented_tree(lines: &[String]) -> ParseResult {
    let mut builder = TreeBuilder::new(WbsTree::new_sentinel());
    let root = builder.root();
    let mut stack: Vec<(NodeIndex, isize)> = vec![(root, -1)];

    for line in lines {
        let indent = isize::try_from(indent_of(line)).unwrap_or(isize::MAX);
        while stack.len() > 1 && stack.last().is_some_and(|(_, frame)| *frame >= indent) {
            stack.pop();
        }
        let parent = stack.last().map_or(root, |(index, _)| *index);
        let sibling = builder.tree().get(parent).children.len() + 1;
        let id = if parent == root {
            sibling.to_string()
        } else {
            format!("{}.{sibling}", builder.tree().get(parent).id)
        };
        let index = builder.attach(parent, &id, line.trim());
        stack.push((index, indent));
    }

    builder.finish(Dialect::Indentation)
}

/// Re-indent every line after the first by one level so the first line
/// becomes the single root.
///
/// Leaves the text alone (apart from normalization) when any later line is
/// already indented by a full level, so outlines that have a root are not
/// pushed down twice.
#[must_use]
pub fn make_first_line_root(input: &str, tab_width: usize) -> String {
    let lines = normalized_lines(input, tab_width);
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };
    if rest.iter().any(|line| indent_of(line) >= INDENT_UNIT.len()) {
        return lines.join("\n");
    }
    std::iter::once(first.clone())
        .chain(rest.iter().map(|line| format!("{INDENT_UNIT}{line}")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str) -> ParseResult {
        build_indented_tree(&normalized_lines(text, 2))
    }

    #[test]
    fn normalizes_endings_tabs_and_blanks() {
        let lines = normalized_lines("A\r\n\tB  \r\n\r\n  \nC\rD", 4);
        assert_eq!(lines, vec!["A", "    B", "C", "D"]);
    }

    #[test]
    fn assigns_sibling_path_ids() {
        let result = build("Project\n  Planning\n    Scope\n  Execution");
        let tree = &result.tree;
        assert_eq!(tree.node("1").map(|n| n.label.as_str()), Some("Project"));
        assert_eq!(tree.node("1.1").map(|n| n.label.as_str()), Some("Planning"));
        assert_eq!(tree.node("1.1.1").map(|n| n.label.as_str()), Some("Scope"));
        assert_eq!(tree.node("1.2").map(|n| n.label.as_str()), Some("Execution"));
        assert_eq!(result.dialect, Dialect::Indentation);
    }

    #[test]
    fn zero_indent_lines_are_top_level() {
        let result = build("Alpha\n  Child\nBeta\nGamma");
        let tree = &result.tree;
        let top: Vec<&str> = tree.children(tree.root()).map(|n| n.label.as_str()).collect();
        assert_eq!(top, vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(tree.node("2").map(|n| n.level), Some(0));
    }

    #[test]
    fn uneven_dedent_attaches_to_nearest_shallower_line() {
        let result = build("A\n      B\n   C\n    D");
        let tree = &result.tree;
        assert_eq!(tree.parent_of("1.2").map(|n| n.label.as_str()), Some("A"));
        assert_eq!(tree.node("1.2").map(|n| n.label.as_str()), Some("C"));
        assert_eq!(tree.node("1.2.1").map(|n| n.label.as_str()), Some("D"));
    }

    #[test]
    fn make_first_line_root_indents_flat_lists() {
        assert_eq!(
            make_first_line_root("Project\nPlanning\nExecution", 2),
            "Project\n  Planning\n  Execution"
        );
    }

    #[test]
    fn make_first_line_root_skips_indented_outlines() {
        let text = "Project\n  Planning\nExecution";
        assert_eq!(make_first_line_root(text, 2), text);
        assert_eq!(make_first_line_root("", 2), "");
    }

    #[test]
    fn single_space_indent_does_not_block_root_promotion() {
        assert_eq!(
            make_first_line_root("Project\n Planning", 2),
            "Project\n   Planning"
        );
    }
}
