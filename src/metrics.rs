//! Derived flow metrics
//!
//! Pure functions over an item's reconstructed status dates. Differences are
//! whole calendar days. A missing operand makes the result undefined (`None`)
//! unless a default is stated on the field.

use crate::status::{Status, StatusTimestamps};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The canonical status dates of one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDates {
    pub backlog: Option<NaiveDate>,
    pub in_progress: Option<NaiveDate>,
    pub peer_review: Option<NaiveDate>,
    pub pending_deployment: Option<NaiveDate>,
    pub testing: Option<NaiveDate>,
    pub approved_for_release: Option<NaiveDate>,
    pub closed: Option<NaiveDate>,
    pub blocked: Option<NaiveDate>,
}

impl StatusDates {
    /// Pick the canonical dates out of the first-entry map
    ///
    /// `review` and `blocked` are the statuses that fill the Peer Review and
    /// Blocked columns, so a workflow that calls them something else still
    /// lines up with its review and blocked intervals.
    pub fn from_timestamps(timestamps: &StatusTimestamps, review: &Status, blocked: &Status) -> Self {
        Self {
            backlog: timestamps.get(&Status::Backlog),
            in_progress: timestamps.get(&Status::InProgress),
            peer_review: timestamps.get(review),
            pending_deployment: timestamps.get(&Status::PendingDeployment),
            testing: timestamps.get(&Status::Testing),
            approved_for_release: timestamps.get(&Status::ApprovedForRelease),
            closed: timestamps.get(&Status::Closed),
            blocked: timestamps.get(blocked),
        }
    }

    /// Dates in [`Status::CANONICAL`] order
    pub fn in_order(&self) -> [Option<NaiveDate>; 8] {
        [
            self.backlog,
            self.in_progress,
            self.peer_review,
            self.pending_deployment,
            self.testing,
            self.approved_for_release,
            self.closed,
            self.blocked,
        ]
    }

    /// Earliest of Testing, Approved for Release and Closed
    pub fn end_date(&self) -> Option<NaiveDate> {
        [self.testing, self.approved_for_release, self.closed]
            .into_iter()
            .flatten()
            .min()
    }
}

/// Duration and ratio metrics for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// End date − In Progress + 1 (both boundary days count)
    pub cycle_time: Option<i64>,
    /// End date − Backlog + 1
    pub lead_time: Option<i64>,
    /// Peer Review − In Progress
    pub in_progress_time: Option<i64>,
    /// Pending Deployment − Peer Review; 0 when either is missing
    pub pr_time: i64,
    /// PR time minus unowned review days
    pub active_pr_time: f64,
    /// End date − Pending Deployment + 1
    pub pd_time: Option<i64>,
    /// In Progress − Backlog
    pub ramp_time: Option<i64>,
    /// Cycle time / lead time; 0 when undefined, when lead time is 0, or when
    /// out-of-order dates would make it negative
    pub flow_efficiency: f64,
}

fn days_between(later: Option<NaiveDate>, earlier: Option<NaiveDate>) -> Option<i64> {
    Some((later? - earlier?).num_days())
}

fn inclusive_days(later: Option<NaiveDate>, earlier: Option<NaiveDate>) -> Option<i64> {
    days_between(later, earlier).map(|d| d + 1)
}

/// Compute derived metrics from status dates
///
/// `end_date` is passed in rather than recomputed so callers can reuse the
/// value they put in the row.
pub fn derive_metrics(
    dates: &StatusDates,
    end_date: Option<NaiveDate>,
    unassigned_review_days: f64,
) -> DerivedMetrics {
    let cycle_time = inclusive_days(end_date, dates.in_progress);
    let lead_time = inclusive_days(end_date, dates.backlog);
    let pr_time = days_between(dates.pending_deployment, dates.peer_review).unwrap_or(0);

    let flow_efficiency = match (cycle_time, lead_time) {
        (Some(cycle), Some(lead)) if lead != 0 => (cycle as f64 / lead as f64).max(0.0),
        _ => 0.0,
    };

    DerivedMetrics {
        cycle_time,
        lead_time,
        in_progress_time: days_between(dates.peer_review, dates.in_progress),
        pr_time,
        active_pr_time: pr_time as f64 - unassigned_review_days,
        pd_time: inclusive_days(end_date, dates.pending_deployment),
        ramp_time: days_between(dates.in_progress, dates.backlog),
        flow_efficiency,
    }
}
