//! CLI argument parsing for flowtrace

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for metric rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary table (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "flowtrace")]
#[command(version)]
#[command(about = "Workflow timing metrics from ticket changelogs", long_about = None)]
pub struct Cli {
    /// JSON export containing items, their fields and changelogs
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// TOML configuration (field names, markers, region table)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Observation horizon for open intervals, RFC 3339 (default: current time)
    #[arg(long = "now", value_name = "TIMESTAMP")]
    pub now: Option<String>,

    /// Only process item ids matching this regex
    #[arg(short = 'e', long = "filter", value_name = "REGEX")]
    pub filter: Option<String>,

    /// Worker threads (overrides the config file)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Enable debug tracing output on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
