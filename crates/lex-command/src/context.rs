//! Tabular context sent alongside the instruction.
//!
//! The model only sees a small, textual preview of the table: the header row
//! and up to [`PREVIEW_ROWS`] data rows, cells separated by ` | `. A table
//! without rows renders as an empty string.

use std::path::{Path, PathBuf};

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use tracing::debug;

use crate::error::Result;

/// Data rows included in the preview.
pub const PREVIEW_ROWS: usize = 3;

const CELL_SEPARATOR: &str = " | ";

/// A header row plus preview rows, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableContext {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableContext {
    /// Build from header names and rows. Only the first [`PREVIEW_ROWS`]
    /// rows are kept.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        rows.truncate(PREVIEW_ROWS);
        Self { headers, rows }
    }

    /// Build from the head of a DataFrame. Nulls become empty cells.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let headers: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let height = df.height().min(PREVIEW_ROWS);
        let mut rows = vec![Vec::with_capacity(headers.len()); height];

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            for (i, row) in rows.iter_mut().enumerate() {
                row.push(cell_text(series.get(i)?));
            }
        }

        Ok(Self { headers, rows })
    }

    /// Load a CSV file, reading every column as text.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading context from {}", path.display());

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_n_rows(Some(PREVIEW_ROWS))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()?;

        Self::from_dataframe(&df)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Render the preview, or `""` when there are no rows.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.headers.join(CELL_SEPARATOR));
        lines.extend(self.rows.iter().map(|row| row.join(CELL_SEPARATOR)));
        lines.join("\n")
    }
}

fn cell_text(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_render_header_and_rows() {
        let context = TableContext::new(
            strings(&["Name", "Age"]),
            vec![strings(&["Ann", "31"]), strings(&["Bob", "27"])],
        );
        assert_eq!(context.render(), "Name | Age\nAnn | 31\nBob | 27");
    }

    #[test]
    fn test_only_three_rows_kept() {
        let rows = (0..5).map(|i| vec![i.to_string()]).collect();
        let context = TableContext::new(strings(&["n"]), rows);

        assert_eq!(context.rows().len(), 3);
        assert_eq!(context.render(), "n\n0\n1\n2");
    }

    #[test]
    fn test_no_rows_renders_empty() {
        let context = TableContext::new(strings(&["Name", "Age"]), Vec::new());
        assert_eq!(context.render(), "");
        assert_eq!(TableContext::default().render(), "");
    }

    #[test]
    fn test_from_dataframe() {
        let df = df![
            "city" => [Some("Oslo"), None, Some("Lima"), Some("Pune")],
            "pop" => [700, 0, 10_000, 3_000],
        ]
        .unwrap();

        let context = TableContext::from_dataframe(&df).unwrap();
        assert_eq!(context.headers(), &strings(&["city", "pop"])[..]);
        assert_eq!(context.render(), "city | pop\nOslo | 700\n | 0\nLima | 10000");
    }

    #[test]
    fn test_from_csv_reads_text() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,score,label").unwrap();
        writeln!(file, "007,1.50,").unwrap();
        writeln!(file, "008,2.00,b").unwrap();
        file.flush().unwrap();

        let context = TableContext::from_csv_path(file.path()).unwrap();

        // Leading zeros and trailing decimals survive because nothing is parsed
        assert_eq!(context.render(), "id | score | label\n007 | 1.50 | \n008 | 2.00 | b");
    }

    #[test]
    fn test_missing_csv_is_error() {
        let err = TableContext::from_csv_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CommandError::Polars(_) | crate::error::CommandError::Io(_)
        ));
    }

    #[test]
    fn test_csv_preview_stops_at_three_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.csv");
        let body: String = std::iter::once("n\n".to_string())
            .chain((0..10).map(|i| format!("{}\n", i)))
            .collect();
        std::fs::write(&path, body).unwrap();

        let context = TableContext::from_csv_path(&path).unwrap();
        assert_eq!(context.render(), "n\n0\n1\n2");
    }
}
