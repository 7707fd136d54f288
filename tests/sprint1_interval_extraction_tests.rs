// Interval extraction scenarios: status dates, blocked time, review ownership gaps
//
// Each test builds a raw changelog the way a provider would deliver it and
// checks the assembled metric row.

use chrono::{DateTime, NaiveDate, Utc};
use flowtrace::config::FlowConfig;
use flowtrace::event::{normalize_changelog, parse_timestamp, RawChangeRecord};
use flowtrace::interval::{blocked_days, status_marker_intervals};
use flowtrace::ownership::{ownership_changes, unassigned_duration};
use flowtrace::row::{ItemMetadata, RowAssembler};

fn utc(ts: &str) -> DateTime<Utc> {
    parse_timestamp(ts).unwrap().with_timezone(&Utc)
}

fn status(ts: &str, from: Option<&str>, to: &str) -> RawChangeRecord {
    RawChangeRecord::single(ts, "status", from, Some(to))
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[test]
fn test_scenario_a_review_without_owner_events() {
    let changelog = vec![
        status("2024-04-01T09:00:00.000+0000", None, "Backlog"),
        status("2024-04-02T09:00:00.000+0000", Some("Backlog"), "In Progress"),
        status("2024-04-05T09:00:00.000+0000", Some("In Progress"), "Peer Review"),
        status("2024-04-07T15:00:00.000+0000", Some("Peer Review"), "Testing"),
    ];

    let config = FlowConfig::default();
    let assembler = RowAssembler::new(&config, utc("2024-05-01T00:00:00+0000"));
    let row = assembler.assemble_raw("ACME-100", &changelog, &ItemMetadata::default());

    // t3 - t2 = 2 days 6 hours
    assert_eq!(row.unassigned_review_days, 2.25);
    // t2 - t1 in whole days
    assert_eq!(row.metrics.in_progress_time, Some(3));
    assert_eq!(row.end_date, date(2024, 4, 7));
    assert_eq!(row.metrics.cycle_time, Some(6));
    assert_eq!(row.metrics.lead_time, Some(7));
    assert_eq!(row.metrics.ramp_time, Some(1));
    // No Pending Deployment: PR time defaults to zero
    assert_eq!(row.metrics.pr_time, 0);
    assert_eq!(row.metrics.active_pr_time, -2.25);
}

#[test]
fn test_scenario_b_consecutive_blocked_entries_pair_positionally() {
    let changelog = vec![
        status("2024-04-01T08:00:00.000+0000", Some("In Progress"), "Blocked"),
        status("2024-04-04T20:00:00.000+0000", Some("Peer Review"), "Blocked"),
    ];
    let events = normalize_changelog(&changelog);
    let now = utc("2024-06-01T00:00:00+0000");

    let blocked = status_marker_intervals(&events, "status", "Blocked");
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked.open_count(), 0);

    let interval = blocked.iter().next().unwrap();
    assert_eq!(interval.start, utc("2024-04-01T08:00:00+0000"));
    assert_eq!(interval.end, Some(utc("2024-04-04T20:00:00+0000")));

    // 3.5 days floors to 3
    assert_eq!(blocked_days(&blocked, now), 3);
}

#[test]
fn test_scenario_c_review_never_left_counts_to_now() {
    let changelog = vec![
        status("2024-04-01T00:00:00.000+0000", Some("Backlog"), "In Progress"),
        status("2024-04-03T00:00:00.000+0000", Some("In Progress"), "Peer Review"),
    ];
    let events = normalize_changelog(&changelog);
    let now = utc("2024-04-06T12:00:00+0000");

    let review = status_marker_intervals(&events, "status", "Peer Review");
    assert_eq!(review.open_count(), 1);

    let owners = ownership_changes(&events, "assignee");
    assert_eq!(unassigned_duration(&review, &owners, now), 3.5);

    let config = FlowConfig::default();
    let row = RowAssembler::new(&config, now).assemble_raw("ACME-101", &changelog, &ItemMetadata::default());
    assert_eq!(row.unassigned_review_days, 3.5);
    assert_eq!(row.end_date, None);
}

#[test]
fn test_scenario_d_missing_backlog() {
    let changelog = vec![
        status("2024-04-02T09:00:00.000+0000", Some("To Do"), "In Progress"),
        status("2024-04-09T09:00:00.000+0000", Some("In Progress"), "Closed"),
    ];

    let config = FlowConfig::default();
    let row = RowAssembler::new(&config, Utc::now()).assemble_raw(
        "ACME-102",
        &changelog,
        &ItemMetadata::default(),
    );

    assert_eq!(row.dates.backlog, None);
    assert_eq!(row.metrics.lead_time, None);
    assert_eq!(row.metrics.ramp_time, None);
    assert_eq!(row.metrics.cycle_time, Some(8));
    assert_eq!(row.metrics.flow_efficiency, 0.0);

    let cells = row.cells();
    assert_eq!(cells[1], "", "Backlog column should be blank");
}

#[test]
fn test_reassignment_inside_review_window() {
    let changelog = vec![
        status("2024-04-01T00:00:00.000+0000", Some("In Progress"), "Peer Review"),
        RawChangeRecord::single("2024-04-01T12:00:00.000+0000", "assignee", None, Some("dana")),
        RawChangeRecord::single("2024-04-02T00:00:00.000+0000", "assignee", Some("dana"), None),
        RawChangeRecord::single("2024-04-02T06:00:00.000+0000", "assignee", None, Some("lee")),
        status("2024-04-03T00:00:00.000+0000", Some("Peer Review"), "Pending Deployment"),
        status("2024-04-04T00:00:00.000+0000", Some("Pending Deployment"), "Testing"),
    ];

    let config = FlowConfig::default();
    let row = RowAssembler::new(&config, Utc::now()).assemble_raw(
        "ACME-103",
        &changelog,
        &ItemMetadata::default(),
    );

    // 12h before the first owner, 6h between owners
    assert_eq!(row.unassigned_review_days, 0.75);
    assert_eq!(row.metrics.pr_time, 2);
    assert_eq!(row.metrics.active_pr_time, 1.25);
    assert_eq!(row.metrics.pd_time, Some(2));
}

#[test]
fn test_review_reentry_creates_second_window() {
    let changelog = vec![
        status("2024-04-01T00:00:00.000+0000", Some("In Progress"), "Peer Review"),
        status("2024-04-02T00:00:00.000+0000", Some("Peer Review"), "In Progress"),
        status("2024-04-05T00:00:00.000+0000", Some("In Progress"), "Peer Review"),
        status("2024-04-05T12:00:00.000+0000", Some("Peer Review"), "Testing"),
    ];
    let events = normalize_changelog(&changelog);

    let review = status_marker_intervals(&events, "status", "Peer Review");
    assert_eq!(review.len(), 2);

    // Re-entry keeps the first Peer Review date
    let config = FlowConfig::default();
    let row = RowAssembler::new(&config, Utc::now()).assemble("ACME-104", &events, &ItemMetadata::default());
    assert_eq!(row.dates.peer_review, date(2024, 4, 1));
    assert_eq!(row.unassigned_review_days, 1.5);
}

#[test]
fn test_malformed_records_are_dropped_not_fatal() {
    let changelog = vec![
        status("garbage", None, "Backlog"),
        status("2024-04-02T09:00:00.000+0000", Some("Backlog"), "In Progress"),
        status("2024-04-03T09:00:00.000+0000", Some("In Progress"), "Testing"),
    ];

    let config = FlowConfig::default();
    let row = RowAssembler::new(&config, Utc::now()).assemble_raw(
        "ACME-105",
        &changelog,
        &ItemMetadata::default(),
    );

    assert_eq!(row.dates.backlog, None);
    assert_eq!(row.metrics.cycle_time, Some(2));
}
