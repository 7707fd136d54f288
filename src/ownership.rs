//! Unowned time inside review windows
//!
//! Review intervals come from the status stream; owner changes come from a
//! separate stream. The two are only correlated by timestamp.

use crate::event::{ChangeEvent, OwnershipChange};
use crate::interval::{Interval, IntervalSet};
use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Owner changes recorded on `ownership_field`, sorted chronologically
pub fn ownership_changes(events: &[ChangeEvent], ownership_field: &str) -> Vec<OwnershipChange> {
    let mut changes: Vec<OwnershipChange> = events
        .iter()
        .filter(|e| e.is_field(ownership_field))
        .map(OwnershipChange::from_event)
        .collect();
    changes.sort_by_key(|c| c.timestamp);
    changes
}

/// Unowned time within a single review interval
///
/// The owner is unknown at the start of the window and counts as unassigned
/// until the first in-window change says otherwise.
fn unassigned_within(
    interval: &Interval,
    changes: &[OwnershipChange],
    now: DateTime<Utc>,
) -> Duration {
    let end = interval.resolved_end(now);

    let mut in_window: Vec<&OwnershipChange> = changes
        .iter()
        .filter(|c| interval.contains(c.timestamp, now))
        .collect();
    in_window.sort_by_key(|c| c.timestamp);

    let mut unassigned = Duration::zero();
    let mut cursor_time = interval.start;
    let mut owner: Option<&str> = None;

    for change in in_window {
        if owner.is_none() {
            unassigned = unassigned + (change.timestamp - cursor_time);
        }
        cursor_time = change.timestamp;
        owner = change.to_owner.as_deref();
    }

    if owner.is_none() {
        unassigned = unassigned + (end - cursor_time);
    }

    unassigned
}

/// Total unowned time across review intervals, in days (two decimals)
///
/// Open review intervals count up to `now`. No review intervals means zero.
pub fn unassigned_duration(
    review_intervals: &IntervalSet,
    ownership_events: &[OwnershipChange],
    now: DateTime<Utc>,
) -> f64 {
    let total = review_intervals
        .iter()
        .fold(Duration::zero(), |acc, interval| {
            acc + unassigned_within(interval, ownership_events, now)
        });

    round_days(total)
}

/// Express a duration as fractional days rounded to two decimals
pub fn round_days(duration: Duration) -> f64 {
    let days = duration.num_milliseconds() as f64 / MILLIS_PER_DAY;
    (days * 100.0).round() / 100.0
}
