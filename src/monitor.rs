// Monitor wiring
// Builds the file, task and tracked directory coordinators and exposes their sensors

use futures::future::{join_all, FutureExt};
use std::sync::Arc;
use std::time::Duration;

use crate::api::OpenListClient;
use crate::coordinator::{Coordinator, UpdateFailed, UpdateFn};
use crate::error::{truncate, ERROR_SNIPPET_LEN};
use crate::models::{ApiResponse, TaskType};
use crate::sensors::{
    fetch_task_data, root_files_sensor, task_sensor, track_dir_sensor, FileCoordinatorData, Sensor,
    TaskData, TaskSensorKind,
};

/// Root listing and tracked directory poll interval
pub const DEFAULT_FILE_SCAN_INTERVAL_SECS: u64 = 300;

/// Task queue poll interval
pub const DEFAULT_TASK_SCAN_INTERVAL_SECS: u64 = 120;

/// One tracked directory and its coordinator
pub struct TrackedDir {
    pub path: String,
    pub coordinator: Coordinator<FileCoordinatorData>,
}

/// Owns every coordinator for one OpenList server
pub struct Monitor {
    source: String,
    files: Coordinator<FileCoordinatorData>,
    tasks: Coordinator<TaskData>,
    track_dirs: Vec<TrackedDir>,
}

/// Update function listing `path`; fails unless the server answers `code == 200`
fn listing_update(client: OpenListClient, path: String) -> UpdateFn<FileCoordinatorData> {
    Arc::new(move || {
        let client = client.clone();
        let path = path.clone();
        async move {
            let response = client
                .list(&path)
                .await
                .map_err(|e| UpdateFailed(format!("failed to list {}: {}", path, e)))?;

            match ApiResponse::from_value(&response) {
                Some(envelope) if envelope.is_success() => Ok(response),
                _ => Err(UpdateFailed(format!(
                    "unexpected listing for {}: {}",
                    path,
                    truncate(&response.to_string(), ERROR_SNIPPET_LEN)
                ))),
            }
        }
        .boxed()
    })
}

fn task_update(client: OpenListClient) -> UpdateFn<TaskData> {
    Arc::new(move || {
        let client = client.clone();
        async move { Ok::<_, UpdateFailed>(fetch_task_data(&client).await) }.boxed()
    })
}

impl Monitor {
    pub fn new(source: impl Into<String>, client: OpenListClient, track_dirs: &[String]) -> Self {
        let files = Coordinator::new(
            "openlist_file_coordinator",
            listing_update(client.clone(), "/".to_string()),
        );
        let tasks = Coordinator::new("openlist_task_coordinator", task_update(client.clone()));

        let track_dirs = track_dirs
            .iter()
            .map(|path| TrackedDir {
                path: path.clone(),
                coordinator: Coordinator::new(
                    format!("openlist_track_dir_{}", path.replace(['/', ' '], "_")),
                    listing_update(client.clone(), path.clone()),
                ),
            })
            .collect();

        Self {
            source: source.into(),
            files,
            tasks,
            track_dirs,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn track_dirs(&self) -> &[TrackedDir] {
        &self.track_dirs
    }

    pub fn files(&self) -> &Coordinator<FileCoordinatorData> {
        &self.files
    }

    pub fn tasks(&self) -> &Coordinator<TaskData> {
        &self.tasks
    }

    /// Refresh every coordinator once, concurrently
    pub async fn refresh_all(&self) {
        let mut refreshes = vec![self.files.refresh().boxed(), self.tasks.refresh().boxed()];
        refreshes.extend(self.track_dirs.iter().map(|d| d.coordinator.refresh().boxed()));
        join_all(refreshes).await;
    }

    pub fn start(&self, file_interval: Duration, task_interval: Duration) {
        self.files.start(file_interval);
        self.tasks.start(task_interval);
        for dir in &self.track_dirs {
            dir.coordinator.start(file_interval);
        }
        tracing::info!(
            source = %self.source,
            track_dirs = self.track_dirs.len(),
            "Monitor started"
        );
    }

    pub fn stop(&self) {
        self.files.stop();
        self.tasks.stop();
        for dir in &self.track_dirs {
            dir.coordinator.stop();
        }
    }

    /// Current snapshot of every sensor
    pub async fn sensors(&self) -> Vec<Sensor> {
        let mut sensors = Vec::with_capacity(1 + TaskType::ALL.len() * 3 + self.track_dirs.len());

        sensors.push(root_files_sensor(&self.source, &self.files.snapshot().await));

        let tasks = self.tasks.snapshot().await;
        for task_type in TaskType::ALL {
            for kind in TaskSensorKind::ALL {
                sensors.push(task_sensor(&self.source, task_type, kind, &tasks));
            }
        }

        for dir in &self.track_dirs {
            let state = dir.coordinator.snapshot().await;
            sensors.push(track_dir_sensor(&self.source, &dir.path, &state));
        }

        sensors
    }

    pub async fn sensor(&self, id: &str) -> Option<Sensor> {
        self.sensors().await.into_iter().find(|s| s.id == id)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, LOGIN_PATH};
    use crate::http_client::OpenListHttpClient;
    use mockito::{Matcher, ServerGuard};

    async fn login_mock(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"tok"}}"#)
            .expect(1)
            .create_async()
            .await
    }

    fn monitor_for(server: &ServerGuard, track_dirs: &[String]) -> Monitor {
        let http =
            OpenListHttpClient::new(Credentials::new(server.url(), "admin", "secret"), 30).unwrap();
        Monitor::new("home", OpenListClient::new(http), track_dirs)
    }

    #[tokio::test]
    async fn test_sensor_inventory() {
        let server = mockito::Server::new_async().await;
        let monitor = monitor_for(&server, &["/movies".to_string(), "/tv".to_string()]);

        let sensors = monitor.sensors().await;
        assert_eq!(sensors.len(), 1 + 7 * 3 + 2);
        assert_eq!(sensors[0].id, "openlist_home_root_files");
        assert!(sensors.iter().any(|s| s.id == "openlist_home_move_failed"));
        assert!(sensors.iter().any(|s| s.id == "openlist_home_track_dir__tv"));
        assert!(sensors.iter().all(|s| !s.available));
    }

    #[tokio::test]
    async fn test_refresh_all_populates_sensors() {
        let mut server = mockito::Server::new_async().await;
        let login = login_mock(&mut server).await;
        let _root = server
            .mock("POST", "/api/fs/list")
            .match_body(Matcher::PartialJson(serde_json::json!({"path": "/"})))
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"content":[{"name":"a"},{"name":"b"}]}}"#)
            .create_async()
            .await;
        let _movies = server
            .mock("POST", "/api/fs/list")
            .match_body(Matcher::PartialJson(serde_json::json!({"path": "/movies"})))
            .with_status(200)
            .with_body(r#"{"code":500,"message":"object not found","data":null}"#)
            .create_async()
            .await;
        let _tasks = server
            .mock("GET", Matcher::Regex(r"^/api/task/".to_string()))
            .with_status(200)
            .with_body(r#"{"code":200,"data":[{"id":"1","state":2}]}"#)
            .create_async()
            .await;

        let monitor = monitor_for(&server, &["/movies".to_string()]);
        monitor.refresh_all().await;

        let root = monitor.sensor("openlist_home_root_files").await.unwrap();
        assert_eq!(root.state, 2);
        assert!(root.available);

        let upload_done = monitor.sensor("openlist_home_upload_done").await.unwrap();
        assert_eq!(upload_done.state, 1);
        assert!(upload_done.available);

        let movies = monitor.sensor("openlist_home_track_dir__movies").await.unwrap();
        assert!(!movies.available);
        let state = monitor.track_dirs()[0].coordinator.snapshot().await;
        assert!(state.last_error.unwrap().contains("unexpected listing for /movies"));

        assert!(monitor.sensor("openlist_home_nope").await.is_none());
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let server = mockito::Server::new_async().await;
        let monitor = monitor_for(&server, &["/a".to_string()]);

        monitor.start(Duration::from_secs(3600), Duration::from_secs(3600));
        assert!(monitor.files().is_running());
        assert!(monitor.tasks().is_running());
        assert!(monitor.track_dirs()[0].coordinator.is_running());

        monitor.stop();
        assert!(!monitor.files().is_running());
        assert!(!monitor.tasks().is_running());
    }
}
