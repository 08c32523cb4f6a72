//! Coded-table dialect: every row carries a dotted path such as `1.2.3`.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use tracing::trace;
use wbs_core::{DEFAULT_ROOT_LABEL, NodeIndex, NodeKind, ROOT_ID, WbsTree};

use crate::detect::{Dialect, leading_code};
use crate::tree_builder::TreeBuilder;
use crate::ParseResult;

/// One input row of a coded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedRow {
    /// Code exactly as written; becomes the node id.
    pub code: String,
    pub name: String,
}

impl CodedRow {
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Split a text line into code and name.
///
/// Accepts single-segment codes and a trailing dot. When the remainder holds
/// tab-separated columns only the first non-empty one is the name.
pub(crate) fn split_coded_line(line: &str) -> Option<CodedRow> {
    let trimmed = line.trim();
    let found = leading_code(trimmed)?;
    let rest = found.rest.strip_prefix('.').unwrap_or(found.rest);
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest
        .split('\t')
        .map(str::trim)
        .find(|field| !field.is_empty())?;
    Some(CodedRow::new(found.code, name))
}

/// Segments with leading zeros stripped, so `01.2` and `1.2` are one path.
fn path_segments(code: &str) -> Vec<String> {
    code.trim()
        .trim_end_matches('.')
        .split('.')
        .map(|segment| {
            let stripped = segment.trim_start_matches('0');
            let normalized = if stripped.is_empty() { "0" } else { stripped };
            normalized.to_string()
        })
        .collect()
}

fn compare_segment(left: &str, right: &str) -> Ordering {
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

/// Numeric-aware path order: `1.2` < `1.10`, and a prefix sorts before its extensions.
#[must_use]
pub fn compare_codes(left: &str, right: &str) -> Ordering {
    let left_segments = path_segments(left);
    let right_segments = path_segments(right);
    left_segments
        .iter()
        .zip(&right_segments)
        .map(|(l, r)| compare_segment(l, r))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| left_segments.len().cmp(&right_segments.len()))
        .then_with(|| left.cmp(right))
}

fn common_prefix(paths: &[Vec<String>]) -> Vec<String> {
    let Some((first, rest)) = paths.split_first() else {
        return Vec::new();
    };
    let mut prefix = first.clone();
    for path in rest {
        let shared = prefix
            .iter()
            .zip(path)
            .take_while(|(left, right)| left == right)
            .count();
        prefix.truncate(shared);
    }
    prefix
}

/// Build a tree from coded rows.
///
/// Rows are sorted by [`compare_codes`]. The row whose path equals the
/// longest common prefix becomes the root; without one a synthetic root is
/// minted. Each other row hangs under the row with its parent code, or under
/// its nearest present ancestor when that code is missing, or under the root.
///
/// Rows with a blank code are kept as well: they hang under the root with a
/// minted `row-<n>` id.
pub(crate) fn build_coded_tree(rows: Vec<CodedRow>, warnings: Vec<String>) -> ParseResult {
    let (mut rows, uncoded): (Vec<CodedRow>, Vec<CodedRow>) = rows
        .into_iter()
        .partition(|row| !row.code.trim().is_empty());
    if rows.is_empty() {
        let mut builder = TreeBuilder::new(WbsTree::new_sentinel());
        for warning in warnings {
            builder.add_warning(warning);
        }
        if uncoded.is_empty() {
            builder.add_warning("Coded table contained no rows");
        }
        attach_uncoded(&mut builder, &uncoded);
        return builder.finish(Dialect::CodedTable);
    }

    rows.sort_by(|left, right| compare_codes(&left.code, &right.code));
    let paths: Vec<Vec<String>> = rows.iter().map(|row| path_segments(&row.code)).collect();
    let prefix = common_prefix(&paths);
    let min_depth = paths.iter().map(Vec::len).min().unwrap_or(0);
    let root_row = if prefix.is_empty() || prefix.len() != min_depth {
        None
    } else {
        paths.iter().position(|path| *path == prefix)
    };

    let tree = match root_row {
        Some(position) => WbsTree::with_root(
            rows[position].code.trim(),
            rows[position].name.trim(),
            NodeKind::Item,
        ),
        None => WbsTree::with_root(ROOT_ID, DEFAULT_ROOT_LABEL, NodeKind::SyntheticRoot),
    };
    trace!(
        rows = rows.len(),
        min_depth,
        prefix = %prefix.join("."),
        synthetic_root = root_row.is_none(),
        "coded table root resolved"
    );

    let mut builder = TreeBuilder::new(tree);
    for warning in warnings {
        builder.add_warning(warning);
    }
    let root = builder.root();
    let prefix_key = prefix.join(".");
    let mut index_by_path: FxHashMap<String, NodeIndex> = FxHashMap::default();
    if root_row.is_some() {
        index_by_path.insert(prefix_key.clone(), root);
    }

    for (position, (row, path)) in rows.iter().zip(&paths).enumerate() {
        if Some(position) == root_row {
            continue;
        }
        let key = path.join(".");
        let parent = resolve_parent(&mut builder, &index_by_path, row, path, &prefix_key);
        let index = builder.attach(parent, row.code.trim(), row.name.trim());
        index_by_path.entry(key).or_insert(index);
    }
    attach_uncoded(&mut builder, &uncoded);

    builder.finish(Dialect::CodedTable)
}

fn attach_uncoded(builder: &mut TreeBuilder, uncoded: &[CodedRow]) {
    let root = builder.root();
    for row in uncoded {
        let index = builder.attach_unnamed(root, row.name.trim());
        let id = builder.tree().get(index).id.clone();
        builder.add_warning(format!(
            "Row \"{}\" has no code; attached under the root as {id}",
            row.name.trim()
        ));
    }
}

fn resolve_parent(
    builder: &mut TreeBuilder,
    index_by_path: &FxHashMap<String, NodeIndex>,
    row: &CodedRow,
    path: &[String],
    prefix_key: &str,
) -> NodeIndex {
    let parent_key = path[..path.len() - 1].join(".");
    if let Some(parent) = index_by_path.get(&parent_key) {
        return *parent;
    }

    let ancestor = (1..path.len().saturating_sub(1))
        .rev()
        .find_map(|depth| index_by_path.get(&path[..depth].join(".")).copied());
    let expected_missing = parent_key.is_empty() || parent_key == prefix_key;

    match ancestor {
        Some(ancestor) => {
            let ancestor_id = builder.tree().get(ancestor).id.clone();
            builder.add_warning(format!(
                "Parent code {parent_key} of {} is missing; attached under {ancestor_id}",
                row.code.trim()
            ));
            ancestor
        }
        None => {
            if !expected_missing {
                builder.add_warning(format!(
                    "Parent code {parent_key} of {} is missing; attached under the root",
                    row.code.trim()
                ));
            }
            builder.root()
        }
    }
}
