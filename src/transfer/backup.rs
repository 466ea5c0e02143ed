// src/transfer/backup.rs
//! Versioned JSON backup of activities and their samples

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::models::{Activity, GpsPoint};
use crate::store::ActivityStore;

pub const EXPORT_VERSION: &str = "1.0";

const INVALID_JSON: &str = "Invalid JSON format";
const INVALID_STRUCTURE: &str = "Invalid export file structure";

/// One activity with its route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedActivity {
    pub activity: Activity,
    #[serde(rename = "gpsPoints")]
    pub gps_points: Vec<GpsPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: String,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub activities: Vec<ExportedActivity>,
}

impl ExportBundle {
    pub fn new(activities: Vec<ExportedActivity>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            activities,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        info!(
            "Exported {} activities to {}",
            self.activities.len(),
            path.display()
        );
        Ok(())
    }
}

/// Result of an import run.
///
/// `success` holds when nothing failed or at least one activity was
/// imported, so partial progress still counts as success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportOutcome {
    fn rejected(message: &str) -> Self {
        Self {
            success: false,
            errors: vec![message.to_string()],
            ..Self::default()
        }
    }
}

/// `activity-<sport>-<YYYY-MM-DD>.<ext>`, dated by the activity start
pub fn activity_file_name(activity: &Activity, extension: &str) -> String {
    format!(
        "activity-{}-{}.{}",
        activity.sport_type.as_str(),
        activity.started_at.format("%Y-%m-%d"),
        extension
    )
}

/// `sports-tracker-export-<YYYY-MM-DD>.json`
pub fn bulk_file_name(date: NaiveDate) -> String {
    format!("sports-tracker-export-{}.json", date.format("%Y-%m-%d"))
}

/// Write an activity the store refused to `dir` as a one-activity backup,
/// named so repeated failures do not overwrite each other. The file imports
/// like any other export.
pub async fn write_unsaved(
    dir: &Path,
    activity: Activity,
    gps_points: Vec<GpsPoint>,
) -> Result<PathBuf> {
    let short_id: String = activity.id.chars().take(8).collect();
    let path = dir.join(format!(
        "unsaved-{}-{}.json",
        activity_file_name(&activity, "json").trim_end_matches(".json"),
        short_id
    ));

    ExportBundle::new(vec![ExportedActivity {
        activity,
        gps_points,
    }])
    .write_to(&path)
    .await?;
    warn!("Unsaved recording written to {}", path.display());
    Ok(path)
}

async fn load_entry<S: ActivityStore>(store: &S, activity: Activity) -> Result<ExportedActivity> {
    let gps_points = store.get_samples_for_activity(&activity.id).await?;
    Ok(ExportedActivity {
        activity,
        gps_points,
    })
}

pub async fn export_activity<S: ActivityStore>(store: &S, id: &str) -> Result<ExportBundle> {
    let activity = store
        .get_activity(id)
        .await?
        .ok_or_else(|| TrackerError::NotFound(format!("activity {}", id)))?;

    Ok(ExportBundle::new(vec![load_entry(store, activity).await?]))
}

pub async fn export_all<S: ActivityStore>(store: &S) -> Result<ExportBundle> {
    let mut entries = Vec::new();
    for activity in store.list_activities().await? {
        entries.push(load_entry(store, activity).await?);
    }
    Ok(ExportBundle::new(entries))
}

fn has_valid_structure(root: &Value) -> bool {
    let Some(activities) = root.get("activities").and_then(Value::as_array) else {
        return false;
    };
    if !root.get("version").map_or(false, Value::is_string) {
        return false;
    }

    activities.iter().all(|entry| {
        let activity = entry.get("activity");
        let is_string = |field: &str| {
            activity
                .and_then(|a| a.get(field))
                .map_or(false, Value::is_string)
        };
        is_string("id")
            && is_string("sport_type")
            && is_string("started_at")
            && entry.get("gpsPoints").map_or(false, Value::is_array)
    })
}

async fn import_entry<S: ActivityStore>(store: &S, entry: &Value) -> Result<bool> {
    let mut item: ExportedActivity = serde_json::from_value(entry.clone())?;
    item.activity.validate()?;

    if store.activity_exists(&item.activity.id).await? {
        return Ok(false);
    }

    for point in &mut item.gps_points {
        point.activity_id = item.activity.id.clone();
    }
    store
        .add_activity_with_samples(&item.activity, &item.gps_points)
        .await?;
    Ok(true)
}

/// Import a bundle produced by [`ExportBundle::to_json`].
///
/// Activities whose id already exists are skipped. A failing activity is
/// recorded in `errors` and does not stop the others.
pub async fn import_json<S: ActivityStore>(store: &S, json: &str) -> ImportOutcome {
    let root: Value = match serde_json::from_str(json) {
        Ok(root) => root,
        Err(e) => {
            warn!("Rejected import: {}", e);
            return ImportOutcome::rejected(INVALID_JSON);
        }
    };

    if !has_valid_structure(&root) {
        warn!("Rejected import: unexpected document structure");
        return ImportOutcome::rejected(INVALID_STRUCTURE);
    }

    let mut outcome = ImportOutcome::default();
    let entries = root
        .get("activities")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for entry in entries {
        let id = entry
            .pointer("/activity/id")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match import_entry(store, entry).await {
            Ok(true) => outcome.imported += 1,
            Ok(false) => {
                warn!("Skipping activity {}: already present", id);
                outcome.skipped += 1;
            }
            Err(e) => outcome
                .errors
                .push(format!("Failed to import activity {}: {}", id, e)),
        }
    }

    outcome.success = outcome.errors.is_empty() || outcome.imported > 0;
    info!(
        "Import finished: {} imported, {} skipped, {} failed",
        outcome.imported,
        outcome.skipped,
        outcome.errors.len()
    );
    outcome
}

pub async fn import_file<S: ActivityStore>(store: &S, path: &Path) -> Result<ImportOutcome> {
    let json = tokio::fs::read_to_string(path).await?;
    Ok(import_json(store, &json).await)
}
