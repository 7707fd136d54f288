//! flowtrace - Workflow timing metrics from ticket changelogs
//!
//! Reconstructs, per work item, the first date each status was entered, the
//! time spent blocked, and the time a review step sat without an owner, then
//! derives cycle time, lead time, flow efficiency and related metrics.
//!
//! Fetching changelogs is left to [`provider`] implementations; everything
//! else is pure, per-item computation.

pub mod batch;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod event;
pub mod interval;
pub mod json_output;
pub mod metrics;
pub mod ownership;
pub mod provider;
pub mod row;
pub mod status;
pub mod text_output;
