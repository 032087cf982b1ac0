// Sensor presentation
// Derives sensor state and attributes from coordinator-cached data

mod files;
mod tasks;

pub use files::{root_files_sensor, track_dir_sensor, FileCoordinatorData};
pub use tasks::{fetch_task_data, task_sensor, TaskData, TaskSensorKind, TaskSnapshot};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;

/// Prefix of every sensor id
pub const SENSOR_ID_PREFIX: &str = "openlist";

/// Shown in `last_updated` before the first refresh
pub const NEVER_UPDATED: &str = "never";

/// Snapshot of a single sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensor {
    /// Stable unique id, e.g. `openlist_home_upload_done`
    pub id: String,
    pub name: String,
    pub icon: &'static str,
    pub state: i64,
    pub available: bool,
    pub attributes: Value,
}

/// Build `openlist_{source}_{suffix}` with `:`, `/`, `.` and `-` replaced by `_`
pub fn sensor_id(source: &str, suffix: &str) -> String {
    format!("{}_{}_{}", SENSOR_ID_PREFIX, source, suffix).replace([':', '/', '.', '-'], "_")
}

pub(crate) fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => NEVER_UPDATED.to_string(),
    }
}

pub(crate) fn update_status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sensor_id_sanitized() {
        assert_eq!(
            sensor_id("nas.local:5244", "root_files"),
            "openlist_nas_local_5244_root_files"
        );
        assert_eq!(
            sensor_id("home", "track_dir_/media/tv-shows"),
            "openlist_home_track_dir__media_tv_shows"
        );
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(None), "never");

        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let formatted = format_timestamp(Some(ts));
        assert_eq!(formatted.len(), "2024-05-01 12:30:00".len());
        assert!(formatted.starts_with("2024-05-0"));
    }

    #[test]
    fn test_update_status() {
        assert_eq!(update_status(true), "success");
        assert_eq!(update_status(false), "failure");
    }
}
