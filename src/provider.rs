//! Changelog and metadata providers
//!
//! The engine never fetches anything itself. It asks a [`ChangelogProvider`]
//! for an item's history and a [`MetadataProvider`] for its static fields.
//! Paging, authentication and retries belong to the provider.
//!
//! [`JsonExportProvider`] serves both from a Jira-style JSON export. Custom
//! fields are looked up by the ids in a [`FieldMap`]:
//!
//! ```json
//! { "items": [ { "key": "ABC-1",
//!                "fields": { "issuetype": { "name": "Story" },
//!                            "customfield_team": { "value": "Kraken" } },
//!                "changelog": [ { "created": "2024-01-02T10:00:00.000+0000",
//!                                 "items": [ { "field": "status",
//!                                              "fromString": "Backlog",
//!                                              "toString": "In Progress" } ] } ] } ] }
//! ```
//!
//! Items are kept as raw JSON and converted only when fetched, so one entry
//! with an unexpected shape fails on its own instead of rejecting the file.

use crate::config::FlowConfig;
use crate::event::{parse_timestamp, RawChangeRecord};
use crate::row::ItemMetadata;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to obtain an item's data; fatal for that item only
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("No changelog available for {0}")]
    ChangelogUnavailable(String),

    #[error("Failed to read export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid export document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Invalid data for {item_id}: {reason}")]
    InvalidItem { item_id: String, reason: String },
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Source of per-item change history
pub trait ChangelogProvider {
    /// Full (already de-paginated) history for one item
    fn fetch_changelog(&self, item_id: &str) -> Result<Vec<RawChangeRecord>>;
}

/// Source of per-item static fields
pub trait MetadataProvider {
    fn fetch_metadata(&self, item_id: &str) -> Result<ItemMetadata>;
}

/// Export field ids of the instance-specific custom fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub story_points: String,
    pub project_code: String,
    pub team: String,
    pub sprint: String,
}

impl FieldMap {
    pub fn from_config(config: &FlowConfig) -> Self {
        Self {
            story_points: config.story_points_field.clone(),
            project_code: config.project_code_field.clone(),
            team: config.team_field.clone(),
            sprint: config.sprint_field.clone(),
        }
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::from_config(&FlowConfig::default())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ExportDocument {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Clone)]
struct ExportItem {
    key: String,
    fields: Value,
    /// `None` when the exporter could not retrieve the history
    changelog: Option<Value>,
}

impl ExportItem {
    fn from_value(entry: Value) -> Option<Self> {
        let Value::Object(mut entry) = entry else {
            return None;
        };
        let key = match entry.remove("key") {
            Some(Value::String(key)) => key,
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };

        Some(Self {
            key,
            fields: entry.remove("fields").unwrap_or(Value::Null),
            changelog: entry.remove("changelog").filter(|v| !v.is_null()),
        })
    }

    fn invalid(&self, reason: impl Into<String>) -> ProviderError {
        ProviderError::InvalidItem {
            item_id: self.key.clone(),
            reason: reason.into(),
        }
    }

    fn metadata(&self, field_map: &FieldMap) -> Result<ItemMetadata> {
        let fields = match &self.fields {
            Value::Object(fields) => fields,
            Value::Null => return Ok(ItemMetadata::default()),
            other => return Err(self.invalid(format!("fields is {}, expected an object", kind(other)))),
        };
        let text = |id: &str| fields.get(id).and_then(text_value).unwrap_or_default();

        Ok(ItemMetadata {
            issue_type: text("issuetype"),
            priority: text("priority"),
            story_points: fields.get(&field_map.story_points).and_then(story_points),
            project_code: text(&field_map.project_code),
            team: text(&field_map.team),
            sprint: text(&field_map.sprint),
            created: fields
                .get("created")
                .and_then(Value::as_str)
                .and_then(|raw| parse_timestamp(raw).ok())
                .map(|ts| ts.date_naive()),
        })
    }

    fn changelog(&self) -> Result<Vec<RawChangeRecord>> {
        let raw = self
            .changelog
            .as_ref()
            .ok_or_else(|| ProviderError::ChangelogUnavailable(self.key.clone()))?;
        Vec::<RawChangeRecord>::deserialize(raw)
            .map_err(|e| self.invalid(format!("changelog: {}", e)))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Display text of a loosely typed field
///
/// Options arrive as `{ "value": ... }`, named entities as `{ "name": ... }`,
/// multi-valued fields as arrays (joined with ", ").
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("name"))
            .and_then(text_value),
        Value::Array(values) => {
            let parts: Vec<String> = values.iter().filter_map(text_value).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null => None,
    }
}

/// Story points arrive as a number, a numeric string, or null
fn story_points(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Provider backed by a JSON export file
#[derive(Debug, Clone)]
pub struct JsonExportProvider {
    items: Vec<ExportItem>,
    index: HashMap<String, usize>,
    field_map: FieldMap,
}

impl JsonExportProvider {
    /// Parse an export document
    ///
    /// Only the envelope is checked here. Entries without a usable `key`
    /// cannot be reported per item and are skipped with a warning.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: ExportDocument = serde_json::from_str(content)?;

        let mut items = Vec::with_capacity(document.items.len());
        for (position, entry) in document.items.into_iter().enumerate() {
            match ExportItem::from_value(entry) {
                Some(item) => items.push(item),
                None => tracing::warn!("Skipping export entry {}: no item key", position),
            }
        }

        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if index.insert(item.key.clone(), i).is_some() {
                tracing::warn!("Duplicate item {} in export, keeping the last", item.key);
            }
        }

        Ok(Self {
            items,
            index,
            field_map: FieldMap::default(),
        })
    }

    /// Load an export document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Read custom fields from the given field ids
    pub fn with_field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// Item ids in export order (duplicates collapsed)
    pub fn item_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .filter(|(i, item)| self.index.get(&item.key) == Some(i))
            .map(|(_, item)| item.key.clone())
            .collect()
    }

    fn item(&self, item_id: &str) -> Result<&ExportItem> {
        self.index
            .get(item_id)
            .and_then(|&i| self.items.get(i))
            .ok_or_else(|| ProviderError::ItemNotFound(item_id.to_string()))
    }
}

impl ChangelogProvider for JsonExportProvider {
    fn fetch_changelog(&self, item_id: &str) -> Result<Vec<RawChangeRecord>> {
        self.item(item_id)?.changelog()
    }
}

impl MetadataProvider for JsonExportProvider {
    fn fetch_metadata(&self, item_id: &str) -> Result<ItemMetadata> {
        self.item(item_id)?.metadata(&self.field_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EXPORT: &str = r#"{
        "items": [
            {
                "key": "ACME-1",
                "fields": {
                    "created": "2024-01-01T08:00:00.000+0000",
                    "issuetype": { "name": "Bug" },
                    "priority": { "name": "Low" },
                    "customfield_10013": 5,
                    "customfield_14300": { "value": "P-77" },
                    "customfield_team": "Argos",
                    "customfield_sprint": "Sprint 3"
                },
                "changelog": [
                    { "created": "2024-01-02T10:00:00.000+0000",
                      "items": [ { "field": "status", "fromString": "Backlog", "toString": "In Progress" } ] }
                ]
            },
            {
                "key": "ACME-2",
                "fields": { "customfield_10013": "2.5", "customfield_14300": "P-12" }
            }
        ]
    }"#;

    #[test]
    fn test_item_ids_in_order() {
        let provider = JsonExportProvider::from_json_str(EXPORT).unwrap();
        assert_eq!(provider.item_ids(), vec!["ACME-1", "ACME-2"]);
    }

    #[test]
    fn test_fetch_metadata() {
        let provider = JsonExportProvider::from_json_str(EXPORT).unwrap();
        let meta = provider.fetch_metadata("ACME-1").unwrap();
        assert_eq!(meta.issue_type, "Bug");
        assert_eq!(meta.priority, "Low");
        assert_eq!(meta.story_points, Some(5.0));
        assert_eq!(meta.project_code, "P-77");
        assert_eq!(meta.team, "Argos");
        assert_eq!(meta.sprint, "Sprint 3");
        assert_eq!(meta.created, NaiveDate::from_ymd_opt(2024, 1, 1));

        let sparse = provider.fetch_metadata("ACME-2").unwrap();
        assert_eq!(sparse.story_points, Some(2.5));
        assert_eq!(sparse.project_code, "P-12");
        assert_eq!(sparse.issue_type, "");
        assert_eq!(sparse.created, None);
    }

    #[test]
    fn test_custom_field_map() {
        let doc = r#"{ "items": [ { "key": "F-1", "fields": {
            "customfield_10026": 8,
            "customfield_14300": "ignored",
            "customfield_99": { "value": "PX-3" },
            "squad": "Argos",
            "iteration": "Sprint 9"
        }, "changelog": [] } ] }"#;
        let field_map = FieldMap {
            story_points: "customfield_10026".to_string(),
            project_code: "customfield_99".to_string(),
            team: "squad".to_string(),
            sprint: "iteration".to_string(),
        };
        let provider = JsonExportProvider::from_json_str(doc)
            .unwrap()
            .with_field_map(field_map);

        let meta = provider.fetch_metadata("F-1").unwrap();
        assert_eq!(meta.story_points, Some(8.0));
        assert_eq!(meta.project_code, "PX-3");
        assert_eq!(meta.team, "Argos");
        assert_eq!(meta.sprint, "Sprint 9");
    }

    #[test]
    fn test_loose_field_shapes() {
        let doc = r#"{ "items": [ { "key": "L-1", "fields": {
            "customfield_team": { "value": "Kraken" },
            "customfield_sprint": 7,
            "priority": { "id": "3" }
        }, "changelog": [] }, { "key": "L-2", "fields": {
            "customfield_sprint": [ { "name": "Sprint 11" }, { "name": "Sprint 12" } ]
        }, "changelog": [] } ] }"#;
        let provider = JsonExportProvider::from_json_str(doc).unwrap();

        let meta = provider.fetch_metadata("L-1").unwrap();
        assert_eq!(meta.team, "Kraken");
        assert_eq!(meta.sprint, "7");
        assert_eq!(meta.priority, "");

        let meta = provider.fetch_metadata("L-2").unwrap();
        assert_eq!(meta.sprint, "Sprint 11, Sprint 12");
    }

    #[test]
    fn test_malformed_entry_fails_only_that_item() {
        let doc = r#"{ "items": [
            { "key": "G-1", "fields": {}, "changelog": [] },
            { "key": "B-1", "fields": "oops", "changelog": [ { "created": 5, "items": [] } ] },
            { "fields": {}, "changelog": [] }
        ] }"#;
        let provider = JsonExportProvider::from_json_str(doc).unwrap();

        assert_eq!(provider.item_ids(), vec!["G-1", "B-1"]);
        assert!(provider.fetch_changelog("G-1").unwrap().is_empty());
        assert!(matches!(
            provider.fetch_metadata("B-1"),
            Err(ProviderError::InvalidItem { item_id, .. }) if item_id == "B-1"
        ));
        assert!(matches!(
            provider.fetch_changelog("B-1"),
            Err(ProviderError::InvalidItem { .. })
        ));
    }

    #[test]
    fn test_fetch_changelog() {
        let provider = JsonExportProvider::from_json_str(EXPORT).unwrap();
        let changelog = provider.fetch_changelog("ACME-1").unwrap();
        assert_eq!(changelog.len(), 1);
        assert_eq!(changelog[0].items[0].to_string.as_deref(), Some("In Progress"));
    }

    #[test]
    fn test_missing_changelog_is_provider_failure() {
        let provider = JsonExportProvider::from_json_str(EXPORT).unwrap();
        assert!(matches!(
            provider.fetch_changelog("ACME-2"),
            Err(ProviderError::ChangelogUnavailable(id)) if id == "ACME-2"
        ));
    }

    #[test]
    fn test_unknown_item() {
        let provider = JsonExportProvider::from_json_str(EXPORT).unwrap();
        assert!(matches!(
            provider.fetch_metadata("NOPE-1"),
            Err(ProviderError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            JsonExportProvider::from_json_str("{ not json"),
            Err(ProviderError::InvalidDocument(_))
        ));
        assert!(matches!(
            JsonExportProvider::from_json_str(r#"{ "items": 3 }"#),
            Err(ProviderError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = JsonExportProvider::from_path(Path::new("/nonexistent/export.json"));
        assert!(matches!(result, Err(ProviderError::Io { .. })));
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let doc = r#"{ "items": [
            { "key": "D-1", "fields": { "customfield_team": "first" }, "changelog": [] },
            { "key": "D-1", "fields": { "customfield_team": "second" }, "changelog": [] }
        ] }"#;
        let provider = JsonExportProvider::from_json_str(doc).unwrap();
        assert_eq!(provider.item_ids(), vec!["D-1"]);
        assert_eq!(provider.fetch_metadata("D-1").unwrap().team, "second");
    }
}
