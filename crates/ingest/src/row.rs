//! Parsing of one pasted spreadsheet row.
//!
//! Spreadsheets copy a horizontal row as tab-separated values, quoting cells
//! that contain tabs, quotes or line breaks. The parser reads that TSV,
//! keeps the first non-empty row and normalises it to exactly six cells.
//! Pastes without any tab fall back to splitting on runs of whitespace,
//! which is lossy and only meant to salvage something usable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub const FIELD_COUNT: usize = 6;
pub const QUOTE_FIELD: usize = 0;
pub const PARAPHRASE_FIELD: usize = 3;
pub const REFERENCE_FIELD: usize = 5;

static FALLBACK_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}|\n").expect("valid fallback split regex"));

/// Something the parser recovered from. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowNote {
    MultipleRows { rows: usize, discarded: usize },
    ExtraColumns { columns: usize, dropped: usize },
    WhitespaceFallback { cells: usize },
}

impl fmt::Display for RowNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowNote::MultipleRows { rows, discarded } => write!(
                f,
                "Detected {} rows pasted; using the first row and discarding {}.",
                rows, discarded
            ),
            RowNote::ExtraColumns { columns, dropped } => write!(
                f,
                "Detected {} columns; using the first {} and dropping {}.",
                columns, FIELD_COUNT, dropped
            ),
            RowNote::WhitespaceFallback { cells } => write!(
                f,
                "No tabs found in the paste; split on wide whitespace into {} cell(s). Check the detected cells.",
                cells
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRow {
    fields: Vec<String>,
    pub notes: Vec<RowNote>,
}

impl ParsedRow {
    fn from_cells(cells: Vec<String>, mut notes: Vec<RowNote>) -> Self {
        let mut fields = cells;

        if fields.len() > FIELD_COUNT {
            notes.push(RowNote::ExtraColumns {
                columns: fields.len(),
                dropped: fields.len() - FIELD_COUNT,
            });
            fields.truncate(FIELD_COUNT);
        }
        fields.resize(FIELD_COUNT, String::new());

        let fields = fields
            .into_iter()
            .map(|cell| cell.trim().to_string())
            .collect();

        Self { fields, notes }
    }

    pub fn empty() -> Self {
        Self::from_cells(Vec::new(), Vec::new())
    }

    /// Always exactly [`FIELD_COUNT`] entries.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn quote(&self) -> &str {
        self.field(QUOTE_FIELD)
    }

    pub fn paraphrase(&self) -> &str {
        self.field(PARAPHRASE_FIELD)
    }

    pub fn reference(&self) -> &str {
        self.field(REFERENCE_FIELD)
    }
}

/// Parse a pasted block into six trimmed cells.
pub fn parse_row(text: &str) -> ParsedRow {
    if text.trim().is_empty() {
        return ParsedRow::empty();
    }

    if text.contains('\t') {
        parse_tabular(text)
    } else {
        parse_whitespace_fallback(text)
    }
}

fn parse_tabular(text: &str) -> ParsedRow {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let rows: Vec<Vec<String>> = reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => Some(record.iter().map(str::to_string).collect::<Vec<_>>()),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable pasted row");
                None
            }
        })
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .collect();

    let mut notes = Vec::new();
    if rows.len() > 1 {
        notes.push(RowNote::MultipleRows {
            rows: rows.len(),
            discarded: rows.len() - 1,
        });
    }

    let first = rows.into_iter().next().unwrap_or_default();
    ParsedRow::from_cells(first, notes)
}

fn parse_whitespace_fallback(text: &str) -> ParsedRow {
    let cells: Vec<String> = FALLBACK_SPLIT
        .split(text.trim())
        .map(|cell| cell.trim().to_string())
        .collect();

    let notes = vec![RowNote::WhitespaceFallback { cells: cells.len() }];
    ParsedRow::from_cells(cells, notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabbed(count: usize) -> String {
        (0..count)
            .map(|i| format!("c{}", i))
            .collect::<Vec<_>>()
            .join("\t")
    }

    #[test]
    fn test_always_six_fields() {
        for count in [0, 3, 6, 20] {
            let row = parse_row(&tabbed(count));
            assert_eq!(row.fields().len(), FIELD_COUNT, "input with {} cells", count);
        }
        assert_eq!(parse_row("").fields().len(), FIELD_COUNT);
        assert_eq!(parse_row("   \n\n ").fields().len(), FIELD_COUNT);
    }

    #[test]
    fn test_short_row_is_padded() {
        let row = parse_row("a\tb\tc");
        assert_eq!(row.fields(), &["a", "b", "c", "", "", ""]);
        assert!(row.notes.is_empty());
    }

    #[test]
    fn test_long_row_is_truncated_with_note() {
        let row = parse_row(&tabbed(20));
        assert_eq!(row.fields()[5], "c5");
        assert_eq!(
            row.notes,
            vec![RowNote::ExtraColumns { columns: 20, dropped: 14 }]
        );
    }

    #[test]
    fn test_multiple_rows_keep_first() {
        let paste = format!("{}\n{}\n\n{}\n", tabbed(6), "x\ty\tz", "p\tq");
        let row = parse_row(&paste);

        assert_eq!(row.quote(), "c0");
        assert_eq!(
            row.notes,
            vec![RowNote::MultipleRows { rows: 3, discarded: 2 }]
        );
        assert!(row.notes[0].to_string().contains("discarding 2"));
    }

    #[test]
    fn test_blank_leading_rows_are_ignored() {
        let row = parse_row("\t\t\n\nquote\tb\tc\tpara\te\thttps://x.org/a.pdf");
        assert_eq!(row.quote(), "quote");
        assert_eq!(row.paraphrase(), "para");
        assert!(row.notes.is_empty());
    }

    #[test]
    fn test_quoted_multiline_cell() {
        let paste = "\"first line\nsecond line\"\tb\tc\tpara\te\tref";
        let row = parse_row(paste);

        assert_eq!(row.quote(), "first line\nsecond line");
        assert_eq!(row.reference(), "ref");
        assert!(row.notes.is_empty());
    }

    #[test]
    fn test_cells_are_trimmed() {
        let row = parse_row("  The effect  \t X \tY\t  Student says \tZ\t https://example.org/p.pdf ");
        assert_eq!(row.quote(), "The effect");
        assert_eq!(row.paraphrase(), "Student says");
        assert_eq!(row.reference(), "https://example.org/p.pdf");
    }

    #[test]
    fn test_spreadsheet_row_positions() {
        let row = parse_row(
            "The effect was significant (p<.05)\tX\tY\tStudent says it was huge\tZ\thttps://example.org/paper.pdf",
        );
        assert_eq!(
            row.fields(),
            &[
                "The effect was significant (p<.05)",
                "X",
                "Y",
                "Student says it was huge",
                "Z",
                "https://example.org/paper.pdf",
            ]
        );
    }

    #[test]
    fn test_whitespace_fallback() {
        let row = parse_row("quote text  b  c\npara text\ne   https://x.org/a.pdf");
        assert_eq!(
            row.fields(),
            &["quote text", "b", "c", "para text", "e", "https://x.org/a.pdf"]
        );
        assert_eq!(row.notes, vec![RowNote::WhitespaceFallback { cells: 6 }]);
    }
}
