//! Extraction configuration
//!
//! Field names, marker statuses and the region table are injected here rather
//! than read from the environment inside the engine. Loadable from TOML;
//! missing keys fall back to their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Region an item's team belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "US")]
    Us,
    International,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Us => f.write_str("US"),
            Region::International => f.write_str("International"),
        }
    }
}

/// Configuration for metric extraction
///
/// # Example
/// ```
/// use flowtrace::config::FlowConfig;
///
/// let config = FlowConfig::default();
/// assert_eq!(config.review_status, "Peer Review");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Changelog field carrying status transitions
    pub status_field: String,

    /// Changelog field carrying owner (assignee) changes
    pub ownership_field: String,

    /// Status counted as blocked time
    pub blocked_status: String,

    /// Status whose unowned time is measured
    pub review_status: String,

    /// Teams that map to the US region; everything else is International
    pub us_teams: Vec<String>,

    /// Use the item's creation date as the Backlog date when the changelog
    /// never shows a Backlog transition
    pub backlog_fallback_to_created: bool,

    /// Worker threads for batch processing (1 = sequential)
    pub jobs: usize,

    /// Export field id holding story points
    pub story_points_field: String,

    /// Export field id holding the project code
    pub project_code_field: String,

    /// Export field id holding the team name
    pub team_field: String,

    /// Export field id holding the sprint
    pub sprint_field: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            status_field: "status".to_string(),
            ownership_field: "assignee".to_string(),
            blocked_status: "Blocked".to_string(),
            review_status: "Peer Review".to_string(),
            us_teams: ["Kraken", "TOS", "Argos", "Alchemy"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            backlog_fallback_to_created: false,
            jobs: 1,
            story_points_field: "customfield_10013".to_string(),
            project_code_field: "customfield_14300".to_string(),
            team_field: "customfield_team".to_string(),
            sprint_field: "customfield_sprint".to_string(),
        }
    }
}

impl FlowConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FlowConfig = toml::from_str(content).context("Invalid flow config")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Region for a team name (exact match against `us_teams`)
    pub fn region_for(&self, team: &str) -> Region {
        if self.us_teams.iter().any(|t| t == team) {
            Region::Us
        } else {
            Region::International
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("status_field", &self.status_field),
            ("ownership_field", &self.ownership_field),
            ("blocked_status", &self.blocked_status),
            ("review_status", &self.review_status),
            ("story_points_field", &self.story_points_field),
            ("project_code_field", &self.project_code_field),
            ("team_field", &self.team_field),
            ("sprint_field", &self.sprint_field),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }

        if self.blocked_status.trim() == self.review_status.trim() {
            return Err(format!(
                "blocked_status and review_status must differ, both are {:?}",
                self.blocked_status
            ));
        }

        if self.jobs == 0 {
            return Err("jobs must be >= 1".to_string());
        }

        Ok(())
    }
}
