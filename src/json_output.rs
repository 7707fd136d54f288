//! JSON output format for batch reports

use crate::batch::{BatchReport, ItemFailure};
use crate::row::MetricRow;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// An item that produced no row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFailure {
    pub item_id: String,
    pub reason: String,
}

impl From<&ItemFailure> for JsonFailure {
    fn from(failure: &ItemFailure) -> Self {
        Self {
            item_id: failure.item_id.clone(),
            reason: failure.reason.clone(),
        }
    }
}

/// Summary counts for the run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_items: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Observation horizon used to close open intervals (RFC 3339)
    pub observed_at: String,
    /// One record per successfully processed item
    pub rows: Vec<MetricRow>,
    /// Items whose data could not be fetched
    pub failures: Vec<JsonFailure>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output structure
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "flowtrace-json-v1".to_string(),
            observed_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            rows: Vec::new(),
            failures: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    /// Build the output for a finished batch
    pub fn from_report(report: &BatchReport, now: DateTime<Utc>) -> Self {
        let mut output = Self::new(now);
        for row in &report.rows {
            output.add_row(row.clone());
        }
        for failure in &report.failures {
            output.add_failure(failure.into());
        }
        output
    }

    pub fn add_row(&mut self, row: MetricRow) {
        self.summary.total_items += 1;
        self.summary.succeeded += 1;
        self.rows.push(row);
    }

    pub fn add_failure(&mut self, failure: JsonFailure) {
        self.summary.total_items += 1;
        self.summary.failed += 1;
        self.failures.push(failure);
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
