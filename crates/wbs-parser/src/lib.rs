#![forbid(unsafe_code)]

mod coded;
mod detect;
mod indent;
mod rows;
mod tree_builder;

use serde::Serialize;
use serde_json::json;
use tracing::debug;
use wbs_core::WbsTree;

pub use coded::{CodedRow, compare_codes};
pub use detect::{CODED_LINE_THRESHOLD, DetectedDialect, Dialect, detect_dialect, looks_like_coded_line};
pub use indent::make_first_line_root;
pub use rows::Record;

/// Outcome of one parse. Parsing never fails; oddities become warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub tree: WbsTree,
    pub dialect: Dialect,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseOptions {
    /// Promote the first line of a flat outline to the single root.
    pub make_first_line_root: bool,
    /// Spaces per tab when measuring indentation.
    pub tab_width: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            make_first_line_root: false,
            tab_width: 2,
        }
    }
}

/// Any input the parser accepts.
#[derive(Debug, Clone, Copy)]
pub enum ParseInput<'a> {
    Text(&'a str),
    Records(&'a [Record]),
    Grid(&'a [Vec<String>]),
}

#[must_use]
pub fn parse(input: &str) -> ParseResult {
    parse_with_options(input, ParseOptions::default())
}

/// Parse text, picking the dialect with [`detect_dialect`].
#[must_use]
pub fn parse_with_options(input: &str, options: ParseOptions) -> ParseResult {
    let input = detect::unify_line_endings(input);
    let detected = detect_dialect(&input);
    let result = match detected.dialect {
        Dialect::CodedTable => parse_coded_text(&input),
        Dialect::Indentation => {
            let text = if options.make_first_line_root {
                make_first_line_root(&input, options.tab_width)
            } else {
                input.to_string()
            };
            indent::build_indented_tree(&indent::normalized_lines(&text, options.tab_width))
        }
    };
    debug!(
        dialect = result.dialect.as_str(),
        coded_lines = detected.coded_lines,
        lines = detected.total_lines,
        nodes = result.tree.item_count(),
        warnings = result.warnings.len(),
        "parsed outline"
    );
    result
}

#[must_use]
pub fn parse_input(input: ParseInput<'_>, options: ParseOptions) -> ParseResult {
    match input {
        ParseInput::Text(text) => parse_with_options(text, options),
        ParseInput::Records(records) => rows::parse_records(records, options.tab_width),
        ParseInput::Grid(grid) => rows::parse_grid(grid, options.tab_width),
    }
}

/// Build a tree from rows already split into code and name.
#[must_use]
pub fn parse_coded_rows(rows: Vec<CodedRow>) -> ParseResult {
    coded::build_coded_tree(rows, Vec::new())
}

fn parse_coded_text(input: &str) -> ParseResult {
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    for (number, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match coded::split_coded_line(line) {
            Some(row) => rows.push(row),
            None => warnings.push(format!("Line {}: no code; skipped", number + 1)),
        }
    }
    coded::build_coded_tree(rows, warnings)
}

/// Compact JSON evidence of a parse.
#[must_use]
pub fn parse_summary_json(parsed: &ParseResult) -> String {
    json!({
        "dialect": parsed.dialect.as_str(),
        "node_count": parsed.tree.item_count(),
        "depth": parsed.tree.max_level(),
        "warning_count": parsed.warnings.len(),
        "warnings": parsed.warnings.clone(),
    })
    .to_string()
}
