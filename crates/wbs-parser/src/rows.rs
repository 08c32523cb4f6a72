//! Row-set inputs handed over by spreadsheet or CSV readers.

use wbs_core::INDENT_UNIT;

use crate::ParseResult;
use crate::coded::{CodedRow, build_coded_tree};
use crate::detect::is_code_cell;
use crate::indent::{build_indented_tree, normalized_lines};

/// One record: `(header, cell)` pairs in column order.
pub type Record = Vec<(String, String)>;

const CODE_HEADERS: &[&str] = &[
    "wbs",
    "wbs code",
    "wbs id",
    "code",
    "outline",
    "outline number",
    "number",
    "no",
    "no.",
    "#",
    "id",
];

const NAME_HEADERS: &[&str] = &[
    "name",
    "task",
    "task name",
    "title",
    "activity",
    "deliverable",
    "description",
    "label",
];

fn normalize_header(header: &str) -> String {
    header
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn headers_of(records: &[Record]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for (header, _) in records.iter().flatten() {
        if !headers.contains(header) {
            headers.push(header.clone());
        }
    }
    headers
}

fn cell<'a>(record: &'a Record, header: &str) -> &'a str {
    record
        .iter()
        .find(|(name, _)| name == header)
        .map_or("", |(_, value)| value.as_str())
}

fn find_header(headers: &[String], candidates: &[&str], skip: Option<&str>) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        headers
            .iter()
            .filter(|header| Some(header.as_str()) != skip)
            .find(|header| normalize_header(header) == *candidate)
            .cloned()
    })
}

/// First column whose non-blank cells are all codes.
fn sniff_code_header(headers: &[String], records: &[Record]) -> Option<String> {
    headers
        .iter()
        .find(|header| {
            let mut values = records
                .iter()
                .map(|record| cell(record, header).trim())
                .filter(|value| !value.is_empty())
                .peekable();
            values.peek().is_some() && values.all(is_code_cell)
        })
        .cloned()
}

fn normalize_code(code: &str) -> String {
    code.trim().trim_end_matches('.').to_string()
}

/// Parse header-keyed records.
///
/// Without a code column the name cells are read as an outline, so leading
/// whitespace in a name still nests it.
pub(crate) fn parse_records(records: &[Record], tab_width: usize) -> ParseResult {
    let headers = headers_of(records);
    let code_header = find_header(&headers, CODE_HEADERS, None)
        .or_else(|| sniff_code_header(&headers, records));
    let name_header = find_header(&headers, NAME_HEADERS, code_header.as_deref()).or_else(|| {
        headers
            .iter()
            .find(|header| Some(header.as_str()) != code_header.as_deref())
            .cloned()
    });

    let mut warnings = Vec::new();
    let Some(name_header) = name_header else {
        let mut result = build_indented_tree(&[]);
        if !records.is_empty() {
            result.warnings.push("Records have no name column".to_string());
        }
        return result;
    };

    let mut named = Vec::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let name = cell(record, &name_header);
        if name.trim().is_empty() {
            warnings.push(format!("Record {}: blank {name_header}; skipped", position + 1));
            continue;
        }
        named.push((record, name));
    }

    match code_header {
        Some(code_header) => {
            let rows = named
                .into_iter()
                .map(|(record, name)| CodedRow::new(normalize_code(cell(record, &code_header)), name))
                .collect();
            build_coded_tree(rows, warnings)
        }
        None => {
            let text = named
                .into_iter()
                .map(|(_, name)| name)
                .collect::<Vec<_>>()
                .join("\n");
            let mut result = build_indented_tree(&normalized_lines(&text, tab_width));
            warnings.append(&mut result.warnings);
            result.warnings = warnings;
            result
        }
    }
}

fn first_filled(row: &[String]) -> Option<(usize, &str)> {
    row.iter()
        .enumerate()
        .map(|(column, value)| (column, value.trim()))
        .find(|(_, value)| !value.is_empty())
}

/// Parse raw 2-D cells.
///
/// Two or more rows leading with a code make a coded table; otherwise the
/// column of a row's first filled cell is its depth.
pub(crate) fn parse_grid(grid: &[Vec<String>], tab_width: usize) -> ParseResult {
    let coded_rows = grid
        .iter()
        .filter(|row| first_filled(row).is_some_and(|(_, value)| is_code_cell(value)))
        .count();

    if coded_rows >= 2 {
        let mut warnings = Vec::new();
        let mut rows = Vec::with_capacity(coded_rows);
        for (position, row) in grid.iter().enumerate() {
            let Some((column, value)) = first_filled(row) else {
                continue;
            };
            if !is_code_cell(value) {
                warnings.push(format!("Row {}: no code; skipped", position + 1));
                continue;
            }
            let name = row[column + 1..]
                .iter()
                .map(|cell| cell.trim())
                .find(|cell| !cell.is_empty());
            match name {
                Some(name) => rows.push(CodedRow::new(normalize_code(value), name)),
                None => warnings.push(format!("Row {}: code {value} has no name; skipped", position + 1)),
            }
        }
        return build_coded_tree(rows, warnings);
    }

    let text = grid
        .iter()
        .filter_map(|row| first_filled(row))
        .map(|(column, value)| format!("{}{value}", INDENT_UNIT.repeat(column)))
        .collect::<Vec<_>>()
        .join("\n");
    build_indented_tree(&normalized_lines(&text, tab_width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dialect;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(header, value)| ((*header).to_string(), (*value).to_string()))
            .collect()
    }

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    #[test]
    fn header_names_are_normalized() {
        assert_eq!(normalize_header("  WBS_Code "), "wbs code");
        assert_eq!(normalize_header("Task-Name"), "task name");
    }

    #[test]
    fn records_with_known_headers() {
        let records = vec![
            record(&[("WBS Code", "1"), ("Task Name", "Project"), ("Owner", "Ana")]),
            record(&[("WBS Code", "1.1."), ("Task Name", "Planning"), ("Owner", "Bo")]),
            record(&[("WBS Code", "1.2"), ("Task Name", "Execution"), ("Owner", "")]),
        ];
        let result = parse_records(&records, 2);
        assert_eq!(result.dialect, Dialect::CodedTable);
        assert_eq!(result.tree.get(result.tree.root()).label, "Project");
        assert_eq!(result.tree.node("1.1").map(|n| n.label.as_str()), Some("Planning"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn records_sniff_code_column_when_headers_are_unknown() {
        let records = vec![
            record(&[("Ref", "1.1"), ("Item", "Planning")]),
            record(&[("Ref", "1.2"), ("Item", "Execution")]),
        ];
        let result = parse_records(&records, 2);
        assert_eq!(result.dialect, Dialect::CodedTable);
        assert_eq!(result.tree.node("1.2").map(|n| n.label.as_str()), Some("Execution"));
    }

    #[test]
    fn records_without_codes_are_an_outline() {
        let records = vec![
            record(&[("Name", "Project")]),
            record(&[("Name", "  Planning")]),
            record(&[("Name", "")]),
        ];
        let result = parse_records(&records, 2);
        assert_eq!(result.dialect, Dialect::Indentation);
        assert_eq!(result.tree.parent_of("1.1").map(|n| n.label.as_str()), Some("Project"));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn empty_records_give_empty_tree() {
        let result = parse_records(&[], 2);
        assert!(result.tree.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn coded_grid_skips_header_row() {
        let cells = grid(&[
            &["WBS", "Name"],
            &["1", "Project"],
            &["", "1.1", "", "Planning"],
            &["1.2", ""],
        ]);
        let result = parse_grid(&cells, 2);
        assert_eq!(result.dialect, Dialect::CodedTable);
        assert_eq!(result.tree.node("1.1").map(|n| n.label.as_str()), Some("Planning"));
        assert!(result.tree.node("1.2").is_none());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn column_indented_grid() {
        let cells = grid(&[
            &["Project", "", ""],
            &["", "Planning", ""],
            &["", "", "Scope"],
            &["", "Execution"],
            &["", ""],
        ]);
        let result = parse_grid(&cells, 2);
        assert_eq!(result.dialect, Dialect::Indentation);
        assert_eq!(
            result.tree.outline_shape(),
            vec![
                (0, "Project".to_string()),
                (1, "Planning".to_string()),
                (2, "Scope".to_string()),
                (1, "Execution".to_string()),
            ]
        );
    }
}
