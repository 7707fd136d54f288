//! Per-item row assembly
//!
//! [`RowAssembler`] runs the extractors over one item's changelog and folds
//! the results, together with the item's static fields, into a flat
//! [`MetricRow`]. It holds no state between items.

use crate::config::{FlowConfig, Region};
use crate::event::{normalize_changelog, ChangeEvent, RawChangeRecord};
use crate::interval::{blocked_days, status_marker_intervals};
use crate::metrics::{derive_metrics, DerivedMetrics, StatusDates};
use crate::ownership::{ownership_changes, unassigned_duration};
use crate::status::{extract_first_entry_dates, Status};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Column headers, in output order
pub const HEADERS: [&str; 30] = [
    "ID",
    "Backlog",
    "In Progress",
    "Peer Review",
    "Pending Deployment",
    "Testing",
    "Approved for Release",
    "Closed",
    "Blocked",
    "Issue Type",
    "Story Points",
    "Priority",
    "Blocked Days",
    "Project Code",
    "Unassigned Time in Peer Review (days)",
    "End Date",
    "Team",
    "Sprint",
    "Year",
    "Region",
    "Cycle Time",
    "Lead Time",
    "In Progress Time",
    "PR Time",
    "Active PR Time",
    "PD Time",
    "Customer",
    "Ramp Time",
    "Flow Efficiency",
    "YearClean",
];

/// Static item fields supplied by a metadata provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub issue_type: String,
    pub priority: String,
    pub story_points: Option<f64>,
    pub project_code: String,
    pub team: String,
    pub sprint: String,
    /// Creation date, used only when the Backlog fallback is enabled
    pub created: Option<NaiveDate>,
}

/// Flat metric record for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: String,
    #[serde(flatten)]
    pub dates: StatusDates,
    pub issue_type: String,
    pub story_points: Option<f64>,
    pub priority: String,
    pub blocked_days: i64,
    pub project_code: String,
    pub unassigned_review_days: f64,
    pub end_date: Option<NaiveDate>,
    pub team: String,
    pub sprint: String,
    pub year: Option<i32>,
    pub region: Region,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    pub customer: String,
    pub year_clean: String,
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn int_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl MetricRow {
    /// Cell values as text, aligned with [`HEADERS`]; undefined values are blank
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(HEADERS.len());

        cells.push(self.id.clone());
        cells.extend(self.dates.in_order().into_iter().map(date_cell));
        cells.push(self.issue_type.clone());
        cells.push(
            self.story_points
                .map(|p| p.to_string())
                .unwrap_or_default(),
        );
        cells.push(self.priority.clone());
        cells.push(self.blocked_days.to_string());
        cells.push(self.project_code.clone());
        cells.push(format!("{:.2}", self.unassigned_review_days));
        cells.push(date_cell(self.end_date));
        cells.push(self.team.clone());
        cells.push(self.sprint.clone());
        cells.push(self.year.map(|y| y.to_string()).unwrap_or_default());
        cells.push(self.region.to_string());
        cells.push(int_cell(self.metrics.cycle_time));
        cells.push(int_cell(self.metrics.lead_time));
        cells.push(int_cell(self.metrics.in_progress_time));
        cells.push(self.metrics.pr_time.to_string());
        cells.push(format!("{:.2}", self.metrics.active_pr_time));
        cells.push(int_cell(self.metrics.pd_time));
        cells.push(self.customer.clone());
        cells.push(int_cell(self.metrics.ramp_time));
        cells.push(format!("{:.4}", self.metrics.flow_efficiency));
        cells.push(self.year_clean.clone());

        cells
    }
}

/// Customer code: the item id prefix before the first `-`
pub fn customer_code(item_id: &str) -> String {
    item_id
        .split_once('-')
        .map(|(prefix, _)| prefix.to_string())
        .unwrap_or_default()
}

/// Composes the extractors into one row per item
#[derive(Debug, Clone)]
pub struct RowAssembler<'a> {
    config: &'a FlowConfig,
    now: DateTime<Utc>,
}

impl<'a> RowAssembler<'a> {
    /// `now` is the observation horizon used to close open intervals
    pub fn new(config: &'a FlowConfig, now: DateTime<Utc>) -> Self {
        Self { config, now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Normalize a raw changelog, then assemble
    pub fn assemble_raw(
        &self,
        item_id: &str,
        changelog: &[RawChangeRecord],
        metadata: &ItemMetadata,
    ) -> MetricRow {
        let events = normalize_changelog(changelog);
        if events.is_empty() && !changelog.is_empty() {
            tracing::warn!("{}: no usable changelog events", item_id);
        }
        self.assemble(item_id, &events, metadata)
    }

    /// Build the metric row for one item
    pub fn assemble(
        &self,
        item_id: &str,
        events: &[ChangeEvent],
        metadata: &ItemMetadata,
    ) -> MetricRow {
        let config = self.config;

        let first_entry = extract_first_entry_dates(events, &config.status_field);
        let mut dates = StatusDates::from_timestamps(
            &first_entry,
            &Status::parse(&config.review_status),
            &Status::parse(&config.blocked_status),
        );
        if dates.backlog.is_none() && config.backlog_fallback_to_created {
            dates.backlog = metadata.created;
        }

        let blocked = status_marker_intervals(events, &config.status_field, &config.blocked_status);
        let review = status_marker_intervals(events, &config.status_field, &config.review_status);
        let owners = ownership_changes(events, &config.ownership_field);

        let blocked_days = blocked_days(&blocked, self.now);
        let unassigned_review_days = unassigned_duration(&review, &owners, self.now);
        let end_date = dates.end_date();
        let metrics = derive_metrics(&dates, end_date, unassigned_review_days);
        let year = end_date.map(|d| d.year());

        tracing::debug!(
            "{}: {} events, {} blocked intervals ({} open), {} review intervals ({} open)",
            item_id,
            events.len(),
            blocked.len(),
            blocked.open_count(),
            review.len(),
            review.open_count()
        );

        MetricRow {
            id: item_id.to_string(),
            dates,
            issue_type: metadata.issue_type.clone(),
            story_points: metadata.story_points,
            priority: metadata.priority.clone(),
            blocked_days,
            project_code: metadata.project_code.clone(),
            unassigned_review_days,
            end_date,
            team: metadata.team.clone(),
            sprint: metadata.sprint.clone(),
            year,
            region: config.region_for(&metadata.team),
            metrics,
            customer: customer_code(item_id),
            year_clean: year.map(|y| y.to_string()).unwrap_or_default(),
        }
    }
}
