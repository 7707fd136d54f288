//! Human-readable summary table for terminal output

use crate::batch::BatchReport;
use crate::row::MetricRow;
use std::fmt::Write;

fn opt(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_line(row: &MetricRow) -> String {
    format!(
        "{:<14} {:>10} {:>6} {:>6} {:>8} {:>11.2} {:>8.2}% {}",
        row.id,
        row.end_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
        opt(row.metrics.cycle_time),
        opt(row.metrics.lead_time),
        row.blocked_days,
        row.unassigned_review_days,
        row.metrics.flow_efficiency * 100.0,
        row.region
    )
}

/// Render a batch report as a table plus a list of failed items
pub fn format_report(report: &BatchReport) -> String {
    let mut out = String::new();

    if report.rows.is_empty() {
        out.push_str("No items processed.\n");
    } else {
        out.push_str("item             end date  cycle   lead  blocked  unassigned  flow eff region\n");
        out.push_str("-------------- ---------- ------ ------ -------- ----------- --------- -------------\n");
        for row in &report.rows {
            out.push_str(&format_line(row));
            out.push('\n');
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailed items ({}):", report.failures.len());
        for failure in &report.failures {
            let _ = writeln!(out, "  {}", failure);
        }
    }

    out
}
