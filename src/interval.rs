//! Interval reconstruction from enter/exit marker events
//!
//! Matching events are merged into one timeline and paired by position:
//! 1st with 2nd, 3rd with 4th, and so on. The labels on the events are not
//! trusted, so a log that toggles the marker inconsistently still pairs
//! deterministically. A trailing unpaired event leaves an open interval,
//! which is resolved against the observation horizon ("now") for durations.

use crate::event::ChangeEvent;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One contiguous occupancy of a tracked state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    /// `None` while the state has not been exited
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// End of the interval, with an open end resolved to `now`
    ///
    /// Never earlier than `start`: a horizon before the interval began
    /// resolves to `start`.
    pub fn resolved_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end.unwrap_or(now).max(self.start)
    }

    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.resolved_end(now) - self.start
    }

    /// Whether `instant` lies within `[start, end]` (both inclusive)
    pub fn contains(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.resolved_end(now)
    }
}

/// Chronological intervals for one item and one tracked marker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn closed_count(&self) -> usize {
        self.intervals.iter().filter(|i| !i.is_open()).count()
    }

    pub fn open_count(&self) -> usize {
        self.intervals.iter().filter(|i| i.is_open()).count()
    }

    /// Sum of interval durations, open ends resolved to `now`
    pub fn total_duration(&self, now: DateTime<Utc>) -> Duration {
        self.intervals
            .iter()
            .fold(Duration::zero(), |acc, i| acc + i.duration(now))
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Pair marker events into intervals by position
///
/// Events matching either predicate are sorted chronologically (stable), then
/// consumed two at a time. The first matching event always opens an interval,
/// even if it looks like an exit, so logs that start mid-interval still pair.
pub fn pair_intervals<E, X>(events: &[ChangeEvent], enter: E, exit: X) -> IntervalSet
where
    E: Fn(&ChangeEvent) -> bool,
    X: Fn(&ChangeEvent) -> bool,
{
    let mut timeline: Vec<DateTime<Utc>> = events
        .iter()
        .filter(|e| enter(*e) || exit(*e))
        .map(ChangeEvent::instant)
        .collect();
    timeline.sort();

    let intervals = timeline
        .chunks(2)
        .filter_map(|pair| {
            pair.first().map(|&start| Interval {
                start,
                end: pair.get(1).copied(),
            })
        })
        .collect();

    IntervalSet { intervals }
}

/// Intervals spent in one status value
///
/// Entering is a change *to* `marker` on `status_field`; exiting is a change
/// *from* it.
pub fn status_marker_intervals(
    events: &[ChangeEvent],
    status_field: &str,
    marker: &str,
) -> IntervalSet {
    pair_intervals(
        events,
        |e| e.is_field(status_field) && e.enters(marker),
        |e| e.is_field(status_field) && e.leaves(marker),
    )
}

/// Whole days spent in the intervals
///
/// Each interval is truncated to whole days on its own before summing, so
/// several short stays add up to zero.
pub fn blocked_days(intervals: &IntervalSet, now: DateTime<Utc>) -> i64 {
    intervals.iter().map(|i| i.duration(now).num_days()).sum()
}
