//! Changelog event model
//!
//! Providers deliver changelog history as [`RawChangeRecord`]s: one record per
//! history entry, carrying a string timestamp and one or more field changes.
//! [`normalize_changelog`] flattens those into typed [`ChangeEvent`]s.
//!
//! Per-record anomalies never escape this module:
//! - a record whose timestamp is missing or unparseable is dropped (`warn!`)
//! - a change item without a field name is ignored (`debug!`)

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp layouts accepted in changelog exports, tried in order.
///
/// `%z` accepts both `+0000` and `+00:00`.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Recoverable anomalies found while normalizing a changelog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// One change inside a raw history entry (Jira `items[]` shape)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChangeItem {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub from_string: Option<String>,
    #[serde(default)]
    pub to_string: Option<String>,
}

/// A raw history entry as delivered by a changelog provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChangeRecord {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub items: Vec<RawChangeItem>,
}

impl RawChangeRecord {
    /// Build a record with a single field change
    pub fn single(
        created: impl Into<String>,
        field: impl Into<String>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Self {
        Self {
            created: Some(created.into()),
            items: vec![RawChangeItem {
                field: Some(field.into()),
                from_string: from.map(str::to_string),
                to_string: to.map(str::to_string),
            }],
        }
    }
}

/// A single field change with a timezone-aware timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub field: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
}

impl ChangeEvent {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        field: impl Into<String>,
        from_value: Option<&str>,
        to_value: Option<&str>,
    ) -> Self {
        Self {
            timestamp,
            field: field.into(),
            from_value: from_value.map(str::to_string),
            to_value: to_value.map(str::to_string),
        }
    }

    /// Timestamp normalized to UTC, used for all interval arithmetic
    pub fn instant(&self) -> DateTime<Utc> {
        self.timestamp.with_timezone(&Utc)
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.field == name
    }

    /// True when this event moves the field *into* `value`
    ///
    /// Surrounding whitespace is ignored on both sides, as in [`Status::parse`].
    ///
    /// [`Status::parse`]: crate::status::Status::parse
    pub fn enters(&self, value: &str) -> bool {
        same_value(self.to_value.as_deref(), value)
    }

    /// True when this event moves the field *out of* `value`
    pub fn leaves(&self, value: &str) -> bool {
        same_value(self.from_value.as_deref(), value)
    }
}

fn same_value(recorded: Option<&str>, expected: &str) -> bool {
    recorded.is_some_and(|v| v.trim() == expected.trim())
}

/// A change of owner (assignee), kept apart from status events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipChange {
    pub timestamp: DateTime<Utc>,
    pub from_owner: Option<String>,
    pub to_owner: Option<String>,
}

impl OwnershipChange {
    /// Ownership view of a change event
    ///
    /// Blank owner names are treated as "unassigned".
    pub fn from_event(event: &ChangeEvent) -> Self {
        Self {
            timestamp: event.instant(),
            from_owner: owner_name(event.from_value.as_deref()),
            to_owner: owner_name(event.to_value.as_deref()),
        }
    }
}

fn owner_name(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Parse a changelog timestamp, keeping its recorded UTC offset
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, EventError> {
    let trimmed = raw.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    // RFC 3339 covers the `Z` suffix the Jira layouts above do not
    DateTime::parse_from_rfc3339(trimmed)
        .map_err(|_| EventError::MalformedTimestamp(raw.to_string()))
}

/// Flatten raw history entries into change events
///
/// Output order follows input order; callers sort where chronology matters.
pub fn normalize_changelog(records: &[RawChangeRecord]) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for record in records {
        let timestamp = match record
            .created
            .as_deref()
            .ok_or(EventError::MissingField("created"))
            .and_then(parse_timestamp)
        {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!("Dropping changelog record ({} items): {}", record.items.len(), e);
                continue;
            }
        };

        for item in &record.items {
            let Some(field) = item.field.as_deref() else {
                tracing::debug!(
                    "Ignoring change item at {}: {}",
                    timestamp,
                    EventError::MissingField("field")
                );
                continue;
            };

            events.push(ChangeEvent::new(
                timestamp,
                field,
                item.from_string.as_deref(),
                item.to_string.as_deref(),
            ));
        }
    }

    events
}

/// Sort events chronologically (stable for identical timestamps)
pub fn sort_chronologically(events: &mut [ChangeEvent]) {
    events.sort_by_key(ChangeEvent::instant);
}
