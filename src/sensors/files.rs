// File count sensors
// Root directory and tracked directory listings

use serde_json::{json, Value};

use super::{format_timestamp, sensor_id, update_status, Sensor};
use crate::coordinator::CoordinatorState;

/// Raw `fs/list` response cached by a file coordinator
pub type FileCoordinatorData = Value;

const CODE_UNAUTHORIZED: i64 = 401;

/// Why a cached listing could not be counted
#[derive(Debug, Clone, PartialEq)]
enum Listing<'a> {
    Content(Vec<&'a Value>),
    Unauthorized(String),
    Malformed(&'static str, String),
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn classify(data: Option<&Value>) -> Listing<'_> {
    let Some(data) = data else {
        return Listing::Malformed("invalid data", "no data fetched yet".to_string());
    };

    let Some(envelope) = data.as_object() else {
        return Listing::Malformed(
            "invalid data",
            format!("expected object, got {}", type_name(data)),
        );
    };

    if envelope.get("code").and_then(|c| c.as_i64()) == Some(CODE_UNAUTHORIZED) {
        let message = envelope
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        return Listing::Unauthorized(message);
    }

    match envelope.get("data") {
        None | Some(Value::Null) => {
            Listing::Malformed("incomplete data", "missing 'data' field".to_string())
        }
        Some(Value::Object(inner)) => {
            let content = inner
                .get("content")
                .and_then(|c| c.as_array())
                .map(|items| items.iter().collect())
                .unwrap_or_default();
            Listing::Content(content)
        }
        Some(other) => Listing::Malformed(
            "malformed data",
            format!("'data' is not an object, got {}", type_name(other)),
        ),
    }
}

fn build(
    id: String,
    name: String,
    icon: &'static str,
    directory: Option<&str>,
    state: &CoordinatorState<FileCoordinatorData>,
) -> Sensor {
    let last_updated = format_timestamp(state.last_updated);
    let listing = classify(state.data.as_ref());

    let available = state.last_update_success
        && state.data.as_ref().is_some_and(|d| d.is_object())
        && !matches!(listing, Listing::Unauthorized(_));

    let (count, mut attributes) = match listing {
        Listing::Unauthorized(message) => (
            -1,
            json!({
                "status": "authentication failed",
                "error": message,
                "last_updated": last_updated,
            }),
        ),
        Listing::Malformed(status, detail) => {
            tracing::debug!(sensor = %id, detail = %detail, "Cached listing is malformed");
            (
                0,
                json!({
                    "status": status,
                    "error": detail,
                    "last_updated": last_updated,
                }),
            )
        }
        Listing::Content(items) => {
            let file_names: Vec<&Value> = items
                .iter()
                .filter_map(|item| item.get("name"))
                .collect();

            // Timestamps are ISO 8601 strings, so lexical max is chronological
            let latest_modified = items
                .iter()
                .filter_map(|item| item.get("modified").and_then(|m| m.as_str()))
                .filter(|m| !m.is_empty())
                .max();

            (
                items.len() as i64,
                json!({
                    "files": file_names,
                    "total": items.len(),
                    "latest_modified": latest_modified,
                    "update_status": update_status(state.last_update_success),
                    "last_updated": last_updated,
                    "available": available,
                }),
            )
        }
    };

    if let (Some(dir), Some(map)) = (directory, attributes.as_object_mut()) {
        map.insert("directory".to_string(), Value::String(dir.to_string()));
    }

    Sensor {
        id,
        name,
        icon,
        state: count,
        available,
        attributes,
    }
}

/// Number of entries in the root directory
pub fn root_files_sensor(source: &str, state: &CoordinatorState<FileCoordinatorData>) -> Sensor {
    build(
        sensor_id(source, "root_files"),
        "Root file count".to_string(),
        "mdi:folder-file",
        None,
        state,
    )
}

/// Number of entries in one tracked directory
pub fn track_dir_sensor(
    source: &str,
    directory: &str,
    state: &CoordinatorState<FileCoordinatorData>,
) -> Sensor {
    build(
        sensor_id(source, &format!("track_dir_{}", directory)),
        format!("Directory file count: {}", directory),
        "mdi:folder-search",
        Some(directory),
        state,
    )
}
