//! CSV output format for metric rows
//!
//! One header row in fixed column order, then one row per item. Undefined
//! values are empty cells, so spreadsheet formulas downstream see blanks.

use crate::row::{MetricRow, HEADERS};

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<MetricRow>,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Add a row to the output
    pub fn add_row(&mut self, row: MetricRow) {
        self.rows.push(row);
    }

    /// Generate CSV header row
    fn header(&self) -> String {
        HEADERS
            .iter()
            .map(|h| Self::escape_field(h))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        // If field contains comma, quote, or newline, wrap in quotes and escape quotes
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Format a metric row as CSV
    fn format_row(&self, row: &MetricRow) -> String {
        row.cells()
            .iter()
            .map(|cell| Self::escape_field(cell))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        output.push_str(&self.header());
        output.push('\n');

        for row in &self.rows {
            output.push_str(&self.format_row(row));
            output.push('\n');
        }

        output
    }
}
