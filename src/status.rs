//! Status vocabulary and first-entry date extraction
//!
//! The workflow has a fixed set of statuses. Anything outside that set is kept
//! as [`Status::Unrecognized`] so it can be logged instead of silently mixed in.

use crate::event::ChangeEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Workflow status, in pipeline order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Backlog,
    InProgress,
    PeerReview,
    PendingDeployment,
    Testing,
    ApprovedForRelease,
    Closed,
    Blocked,
    Unrecognized(String),
}

impl Status {
    /// The statuses that get a date column in every metric row
    pub const CANONICAL: [Status; 8] = [
        Status::Backlog,
        Status::InProgress,
        Status::PeerReview,
        Status::PendingDeployment,
        Status::Testing,
        Status::ApprovedForRelease,
        Status::Closed,
        Status::Blocked,
    ];

    /// Map a status name from a changelog onto the vocabulary
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "Backlog" => Status::Backlog,
            // Older workflows spell it without the space
            "In Progress" | "InProgress" => Status::InProgress,
            "Peer Review" => Status::PeerReview,
            "Pending Deployment" => Status::PendingDeployment,
            "Testing" => Status::Testing,
            "Approved for Release" => Status::ApprovedForRelease,
            "Closed" => Status::Closed,
            "Blocked" => Status::Blocked,
            other => Status::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Status::Backlog => "Backlog",
            Status::InProgress => "In Progress",
            Status::PeerReview => "Peer Review",
            Status::PendingDeployment => "Pending Deployment",
            Status::Testing => "Testing",
            Status::ApprovedForRelease => "Approved for Release",
            Status::Closed => "Closed",
            Status::Blocked => "Blocked",
            Status::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Status::Unrecognized(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First calendar date each status was entered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTimestamps {
    first_entry: BTreeMap<Status, NaiveDate>,
}

impl StatusTimestamps {
    pub fn get(&self, status: &Status) -> Option<NaiveDate> {
        self.first_entry.get(status).copied()
    }

    pub fn len(&self) -> usize {
        self.first_entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_entry.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Status, &NaiveDate)> {
        self.first_entry.iter()
    }

    /// Statuses seen in the log that are not part of the vocabulary
    pub fn unrecognized(&self) -> impl Iterator<Item = &Status> {
        self.first_entry.keys().filter(|s| !s.is_recognized())
    }
}

/// Older spelling of "In Progress"; only consulted when the spaced form is absent
const LEGACY_IN_PROGRESS: &str = "InProgress";

/// Record the first date each status was entered
///
/// Only events on `status_field` with a target value count. The date is the
/// calendar date in the event's own recorded offset (truncated, not rounded).
/// Re-entering a status later never moves its date.
pub fn extract_first_entry_dates(events: &[ChangeEvent], status_field: &str) -> StatusTimestamps {
    let mut transitions: Vec<&ChangeEvent> =
        events.iter().filter(|e| e.is_field(status_field)).collect();
    transitions.sort_by_key(|e| e.instant());

    let mut first_entry = BTreeMap::new();
    let mut legacy_in_progress: Option<NaiveDate> = None;

    for event in transitions {
        let Some(target) = event.to_value.as_deref() else {
            tracing::debug!("Status change at {} has no target status", event.timestamp);
            continue;
        };

        let date = event.timestamp.date_naive();
        if target.trim() == LEGACY_IN_PROGRESS {
            legacy_in_progress.get_or_insert(date);
            continue;
        }

        let status = Status::parse(target);
        if !status.is_recognized() {
            tracing::debug!("Unrecognized status {:?} at {}", target, event.timestamp);
        }

        first_entry.entry(status).or_insert(date);
    }

    if let Some(date) = legacy_in_progress {
        first_entry.entry(Status::InProgress).or_insert(date);
    }

    StatusTimestamps { first_entry }
}
