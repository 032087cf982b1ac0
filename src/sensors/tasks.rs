// Task queue sensors
// Per task type done/undone/failed counts

use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{format_timestamp, sensor_id, update_status, Sensor};
use crate::api::OpenListClient;
use crate::coordinator::CoordinatorState;
use crate::error::Result;
use crate::models::{ApiResponse, TaskState, TaskType};

/// Maximum task rows exposed per sensor
pub const MAX_TASK_DETAILS: usize = 20;

/// Done and undone task lists of one task type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSnapshot {
    pub done: Vec<Value>,
    pub undone: Vec<Value>,
}

impl TaskSnapshot {
    /// Done tasks that did not succeed
    pub fn failed(&self) -> impl Iterator<Item = &Value> {
        self.done
            .iter()
            .filter(|task| task.is_object() && TaskState::of(task) != TaskState::Succeeded)
    }

    pub fn failed_count(&self) -> i64 {
        self.failed().count() as i64
    }

    pub fn done_total(&self) -> i64 {
        self.done.len() as i64
    }

    pub fn undone_count(&self) -> i64 {
        self.undone.len() as i64
    }

    pub fn succeeded_count(&self) -> i64 {
        (self.done_total() - self.failed_count()).max(0)
    }
}

/// Snapshot of every task type, cached by the task coordinator
pub type TaskData = BTreeMap<TaskType, TaskSnapshot>;

fn list_if_ok(response: &Value) -> Vec<Value> {
    ApiResponse::from_value(response)
        .filter(ApiResponse::is_success)
        .map(|r| r.data_list())
        .unwrap_or_default()
}

async fn fetch_snapshot(client: &OpenListClient, task_type: TaskType) -> Result<TaskSnapshot> {
    let done = client.task_done(task_type).await?;
    let undone = client.task_undone(task_type).await?;
    Ok(TaskSnapshot {
        done: list_if_ok(&done),
        undone: list_if_ok(&undone),
    })
}

/// Fetch done/undone lists for every task type
///
/// A failure for one task type is logged and yields an empty snapshot for that
/// type only.
pub async fn fetch_task_data(client: &OpenListClient) -> TaskData {
    let results = join_all(TaskType::ALL.iter().map(|&task_type| async move {
        let snapshot = match fetch_snapshot(client, task_type).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(task_type = %task_type, error = %e, "Failed to fetch task data");
                TaskSnapshot::default()
            }
        };
        (task_type, snapshot)
    }))
    .await;

    results.into_iter().collect()
}

/// Which slice of a task type a sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSensorKind {
    Done,
    Undone,
    Failed,
}

impl TaskSensorKind {
    pub const ALL: [TaskSensorKind; 3] = [Self::Done, Self::Undone, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Undone => "undone",
            Self::Failed => "failed",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Done => "completed tasks",
            Self::Undone => "pending tasks",
            Self::Failed => "failed tasks",
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            Self::Done => "mdi:check-circle-outline",
            Self::Undone => "mdi:progress-clock",
            Self::Failed => "mdi:alert-circle-outline",
        }
    }

    /// Task state shown in the detail rows; failed rows have no single state
    pub fn target_state(&self) -> Option<i64> {
        match self {
            Self::Done => Some(TaskState::SUCCEEDED),
            Self::Undone => Some(TaskState::RUNNING),
            Self::Failed => None,
        }
    }

    fn count(&self, snapshot: &TaskSnapshot) -> i64 {
        match self {
            Self::Done => snapshot.succeeded_count(),
            Self::Undone => snapshot.undone_count(),
            Self::Failed => snapshot.failed_count(),
        }
    }

    fn rows<'a>(&self, snapshot: &'a TaskSnapshot) -> Vec<&'a Value> {
        let with_state = |tasks: &'a [Value], state: i64| -> Vec<&'a Value> {
            tasks
                .iter()
                .filter(|t| t.get("state").and_then(|s| s.as_i64()) == Some(state))
                .collect()
        };

        match self {
            Self::Done => with_state(&snapshot.done, TaskState::SUCCEEDED),
            Self::Undone => with_state(&snapshot.undone, TaskState::RUNNING),
            Self::Failed => snapshot.failed().collect(),
        }
    }
}

fn detail_row(task: &Value, kind: TaskSensorKind) -> Value {
    let progress = task.get("progress").and_then(|p| p.as_f64()).unwrap_or(0.0);
    let end_time = match kind {
        TaskSensorKind::Undone => Value::Null,
        _ => task.get("end_time").cloned().unwrap_or(Value::Null),
    };

    json!({
        "id": task.get("id"),
        "name": task.get("name"),
        "progress": format!("{:.1}%", progress),
        "status": task.get("status"),
        "state": task.get("state"),
        "start_time": task.get("start_time"),
        "end_time": end_time,
        "total_bytes": task.get("total_bytes"),
        "error": task.get("error").cloned().unwrap_or_else(|| json!("")),
    })
}

/// Sensor for one task type and kind
pub fn task_sensor(
    source: &str,
    task_type: TaskType,
    kind: TaskSensorKind,
    state: &CoordinatorState<TaskData>,
) -> Sensor {
    let id = sensor_id(source, &format!("{}_{}", task_type.as_str(), kind.as_str()));
    let name = format!("{} {}", task_type.display_name(), kind.label());
    let last_updated = format_timestamp(state.last_updated);
    let available = state.last_update_success && state.data.is_some();

    let Some(snapshot) = state.data.as_ref().map(|d| d.get(&task_type).cloned().unwrap_or_default())
    else {
        return Sensor {
            id,
            name,
            icon: kind.icon(),
            state: 0,
            available,
            attributes: json!({
                "status": "invalid data",
                "error": "no data fetched yet",
                "last_updated": last_updated,
                "task_type": task_type.as_str(),
                "task_name": task_type.display_name(),
                "sensor_kind": kind.as_str(),
            }),
        };
    };

    let succeeded = snapshot.succeeded_count();
    let failed = snapshot.failed_count();
    let undone = snapshot.undone_count();

    let tasks: Vec<Value> = kind
        .rows(&snapshot)
        .into_iter()
        .take(MAX_TASK_DETAILS)
        .map(|task| detail_row(task, kind))
        .collect();

    Sensor {
        id,
        name,
        icon: kind.icon(),
        state: kind.count(&snapshot),
        available,
        attributes: json!({
            "task_type": task_type.as_str(),
            "task_name": task_type.display_name(),
            "sensor_kind": kind.as_str(),
            "target_state": kind.target_state(),
            "stats": {
                "succeeded": succeeded,
                "failed": failed,
                "undone": undone,
                "total": succeeded + failed + undone,
                "raw_done_total": snapshot.done_total(),
            },
            "tasks": tasks,
            "update_status": update_status(state.last_update_success),
            "last_updated": last_updated,
            "available": available,
        }),
    }
}
