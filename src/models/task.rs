use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::OpenListError;

/// Task queues exposed under `/api/task/{task_type}/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Upload,
    Copy,
    OfflineDownload,
    OfflineDownloadTransfer,
    Decompress,
    DecompressUpload,
    Move,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::Upload,
        TaskType::Copy,
        TaskType::OfflineDownload,
        TaskType::OfflineDownloadTransfer,
        TaskType::Decompress,
        TaskType::DecompressUpload,
        TaskType::Move,
    ];

    /// Wire name used in task endpoint paths
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Upload => "upload",
            TaskType::Copy => "copy",
            TaskType::OfflineDownload => "offline_download",
            TaskType::OfflineDownloadTransfer => "offline_download_transfer",
            TaskType::Decompress => "decompress",
            TaskType::DecompressUpload => "decompress_upload",
            TaskType::Move => "move",
        }
    }

    /// Human-readable name for sensor titles
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskType::Upload => "Upload",
            TaskType::Copy => "Copy",
            TaskType::OfflineDownload => "Offline download",
            TaskType::OfflineDownloadTransfer => "Offline download transfer",
            TaskType::Decompress => "Decompress",
            TaskType::DecompressUpload => "Decompress upload",
            TaskType::Move => "Move",
        }
    }

    /// Comma separated list of every task type name
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = OpenListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                OpenListError::validation(format!(
                    "unsupported task type: {} (supported: {})",
                    s,
                    TaskType::supported()
                ))
            })
    }
}

/// Interpretation of the integer `state` field on task records
///
/// Only 1 and 2 are known; everything else is treated as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Succeeded,
    Failed(i64),
}

impl TaskState {
    pub const RUNNING: i64 = 1;
    pub const SUCCEEDED: i64 = 2;

    pub fn from_code(code: i64) -> Self {
        match code {
            Self::RUNNING => TaskState::Running,
            Self::SUCCEEDED => TaskState::Succeeded,
            other => TaskState::Failed(other),
        }
    }

    /// State of a raw task record; a missing or non-integer state counts as failed
    pub fn of(task: &Value) -> Self {
        match task.get("state").and_then(|s| s.as_i64()) {
            Some(code) => Self::from_code(code),
            None => TaskState::Failed(-1),
        }
    }
}
