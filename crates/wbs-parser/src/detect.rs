use std::borrow::Cow;

use serde::Serialize;

/// Input dialect chosen for a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Rows keyed by a dotted numeric path such as `1.2.3`.
    CodedTable,
    /// Hierarchy encoded by leading whitespace.
    Indentation,
}

impl Dialect {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodedTable => "coded-table",
            Self::Indentation => "indentation",
        }
    }
}

/// Minimum number of coded lines that switches a text to the coded dialect.
pub const CODED_LINE_THRESHOLD: usize = 2;

/// Dialect decision plus the evidence behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectedDialect {
    pub dialect: Dialect,
    pub coded_lines: usize,
    pub total_lines: usize,
}

/// A dotted code at the start of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeadingCode<'a> {
    pub code: &'a str,
    pub segments: usize,
    pub rest: &'a str,
}

/// Scan `<digits>(.<digits>)*` at the start of `text`.
pub(crate) fn leading_code(text: &str) -> Option<LeadingCode<'_>> {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut segments = 0;
    loop {
        let start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == start {
            return None;
        }
        segments += 1;
        let continues = end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit();
        if !continues {
            break;
        }
        end += 1;
    }
    Some(LeadingCode {
        code: &text[..end],
        segments,
        rest: &text[end..],
    })
}

/// True when `cell` is a code and nothing else (a trailing dot is allowed).
pub(crate) fn is_code_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    leading_code(trimmed).is_some_and(|found| found.rest.is_empty() || found.rest == ".")
}

/// Pure per-line predicate of the coded dialect.
///
/// Matches a multi-segment code (`1.2`, `3.1.4`) followed by a separator that
/// holds a tab or at least two consecutive spaces, followed by a name.
#[must_use]
pub fn looks_like_coded_line(line: &str) -> bool {
    let Some(found) = leading_code(line.trim_start()) else {
        return false;
    };
    if found.segments < 2 {
        return false;
    }
    let name = found.rest.trim_start();
    let separator = &found.rest[..found.rest.len() - name.len()];
    (separator.contains('\t') || separator.contains("  ")) && !name.trim().is_empty()
}

/// `\r\n` and lone `\r` become `\n`.
pub(crate) fn unify_line_endings(input: &str) -> Cow<'_, str> {
    if input.contains('\r') {
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(input)
    }
}

/// Pick the dialect for a text. Evaluated once per parse.
#[must_use]
pub fn detect_dialect(input: &str) -> DetectedDialect {
    let mut coded_lines = 0;
    let mut total_lines = 0;
    for line in unify_line_endings(input).lines().filter(|line| !line.trim().is_empty()) {
        total_lines += 1;
        if looks_like_coded_line(line) {
            coded_lines += 1;
        }
    }
    let dialect = if coded_lines >= CODED_LINE_THRESHOLD {
        Dialect::CodedTable
    } else {
        Dialect::Indentation
    };
    DetectedDialect {
        dialect,
        coded_lines,
        total_lines,
    }
}
