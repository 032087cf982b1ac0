// Service registry
// Named operations callable over the HTTP surface, mapped onto endpoint methods

use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::OpenListClient;
use crate::error::{truncate, OpenListError, ERROR_SNIPPET_LEN};
use crate::models::TaskType;

/// Failures reported to service callers
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("{service}: missing required argument: {argument}")]
    MissingArgument { service: String, argument: String },

    #[error("{service}: unsupported task type: {value} (supported: {supported})")]
    UnsupportedTaskType {
        service: String,
        value: String,
        supported: String,
    },

    #[error("{service} failed: {source}")]
    Failed {
        service: String,
        source: OpenListError,
    },
}

/// Task services take a `task_type`, file services do not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Task,
    File,
}

/// One registered service
#[derive(Debug)]
pub struct Service {
    pub name: &'static str,
    pub kind: ServiceKind,
    /// Endpoint invoked by the service
    pub endpoint: &'static str,
    /// Arguments that must be present (value checks happen at the endpoint)
    pub required: &'static [&'static str],
    /// Service argument names that differ from the endpoint's
    pub renames: &'static [(&'static str, &'static str)],
}

const fn task(
    name: &'static str,
    endpoint: &'static str,
    required: &'static [&'static str],
) -> Service {
    Service {
        name,
        kind: ServiceKind::Task,
        endpoint,
        required,
        renames: &[],
    }
}

const fn file(
    name: &'static str,
    endpoint: &'static str,
    required: &'static [&'static str],
) -> Service {
    Service {
        name,
        kind: ServiceKind::File,
        endpoint,
        required,
        renames: &[],
    }
}

pub static SERVICES: &[Service] = &[
    task("get_task_info", "task_info", &["task_type"]),
    task("get_task_done", "task_done", &["task_type"]),
    task("get_task_undone", "task_undone", &["task_type"]),
    task("delete_task", "task_delete", &["task_type", "tid"]),
    task("cancel_task", "task_cancel", &["task_type", "tid"]),
    task("clear_done_tasks", "task_clear_done", &["task_type"]),
    task("clear_succeeded_tasks", "task_clear_succeeded", &["task_type"]),
    task("retry_task", "task_retry", &["task_type", "tid"]),
    task("retry_failed_tasks", "task_retry_failed", &["task_type"]),
    task("delete_some_tasks", "task_delete_some", &["task_type", "tids"]),
    task("cancel_some_tasks", "task_cancel_some", &["task_type", "tids"]),
    task("retry_some_tasks", "task_retry_some", &["task_type", "tids"]),
    file("mkdir", "mkdir", &["path"]),
    file("rename", "rename", &["path", "name"]),
    file("list_files", "list", &[]),
    file("get_file_info", "get", &["path"]),
    file("search_files", "search", &["parent", "keywords", "scope"]),
    file("get_dirs", "dirs", &[]),
    file("batch_rename", "batch_rename", &["src_dir", "rename_objects"]),
    file(
        "regex_rename",
        "regex_rename",
        &["src_dir", "src_name_regex", "new_name_regex"],
    ),
    file("move_files", "move", &["src_dir", "dst_dir", "names"]),
    file("recursive_move", "recursive_move", &["src_dir", "dst_dir"]),
    file("copy_files", "copy", &["src_dir", "dst_dir", "names"]),
    Service {
        renames: &[("dir_path", "dir")],
        ..file("remove_files", "remove", &["dir_path", "names"])
    },
    file("remove_empty_dir", "remove_empty_dir", &["src_dir"]),
    file(
        "add_offline_download",
        "add_offline_download",
        &["path", "urls", "tool", "delete_policy"],
    ),
    file("get_archive_meta", "archive_meta", &["path"]),
    file("list_archive", "archive_list", &["path", "inner_path"]),
    file(
        "decompress_archive",
        "archive_decompress",
        &["src_dir", "dst_dir", "name", "inner_path"],
    ),
];

pub fn find(name: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.name == name)
}

/// Dispatches named service calls to the API client
#[derive(Clone)]
pub struct ServiceRegistry {
    client: OpenListClient,
}

impl ServiceRegistry {
    pub fn new(client: OpenListClient) -> Self {
        Self { client }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        SERVICES.iter().map(|s| s.name)
    }

    /// Validate arguments and run the named service
    pub async fn call(
        &self,
        name: &str,
        mut args: Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let service = find(name).ok_or_else(|| ServiceError::UnknownService(name.to_string()))?;

        let result = match Self::prepare(service, &mut args) {
            Ok(()) => {
                tracing::debug!(service = service.name, endpoint = service.endpoint, "Calling service");
                self.client
                    .invoke(service.endpoint, args)
                    .await
                    .map_err(|source| ServiceError::Failed {
                        service: service.name.to_string(),
                        source,
                    })
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(value) => tracing::info!(
                service = service.name,
                result = %truncate(&value.to_string(), ERROR_SNIPPET_LEN),
                "Service call succeeded"
            ),
            Err(e) => tracing::error!(service = service.name, error = %e, "Service call failed"),
        }

        result
    }

    fn prepare(service: &Service, args: &mut Map<String, Value>) -> Result<(), ServiceError> {
        if let Some(missing) = service.required.iter().find(|a| !args.contains_key(**a)) {
            return Err(ServiceError::MissingArgument {
                service: service.name.to_string(),
                argument: missing.to_string(),
            });
        }

        if service.kind == ServiceKind::Task {
            let value = args.get("task_type");
            let parsed = value
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<TaskType>().ok());
            if parsed.is_none() {
                return Err(ServiceError::UnsupportedTaskType {
                    service: service.name.to_string(),
                    value: match value {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    },
                    supported: TaskType::supported(),
                });
            }
        }

        for (from, to) in service.renames {
            if let Some(value) = args.remove(*from) {
                args.insert(to.to_string(), value);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::auth::{Credentials, LOGIN_PATH};
    use crate::http_client::OpenListHttpClient;
    use mockito::{Matcher, ServerGuard};
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn registry_for(server: &ServerGuard) -> ServiceRegistry {
        let http =
            OpenListHttpClient::new(Credentials::new(server.url(), "admin", "secret"), 30).unwrap();
        ServiceRegistry::new(OpenListClient::new(http))
    }

    async fn forbid_all(server: &mut ServerGuard) -> Vec<mockito::Mock> {
        let mut mocks = Vec::new();
        for method in ["GET", "POST"] {
            mocks.push(
                server
                    .mock(method, Matcher::Any)
                    .expect(0)
                    .create_async()
                    .await,
            );
        }
        mocks
    }

    #[test]
    fn test_every_service_targets_a_known_endpoint() {
        assert_eq!(SERVICES.len(), 29);
        for service in SERVICES {
            let endpoint = endpoints::find(service.endpoint)
                .unwrap_or_else(|| panic!("{} has no endpoint", service.name));
            assert_eq!(
                endpoint.is_task_scoped(),
                service.kind == ServiceKind::Task,
                "{}",
                service.name
            );
        }
    }

    #[test]
    fn test_service_names_unique() {
        let mut names: Vec<_> = SERVICES.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SERVICES.len());
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let server = mockito::Server::new_async().await;
        let registry = registry_for(&server);
        let err = registry.call("format_disk", Map::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownService(ref n) if n == "format_disk"));
    }

    #[tokio::test]
    async fn test_missing_argument_never_reaches_network() {
        let mut server = mockito::Server::new_async().await;
        let mocks = forbid_all(&mut server).await;
        let registry = registry_for(&server);

        let err = registry
            .call("rename", args(json!({"path": "/a"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "rename: missing required argument: name");

        let err = registry
            .call("delete_task", args(json!({"task_type": "upload"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingArgument { ref argument, .. } if argument == "tid"));

        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_bad_task_type_never_reaches_network() {
        let mut server = mockito::Server::new_async().await;
        let mocks = forbid_all(&mut server).await;
        let registry = registry_for(&server);

        for service in SERVICES.iter().filter(|s| s.kind == ServiceKind::Task) {
            let mut call_args = Map::new();
            for arg in service.required {
                call_args.insert(arg.to_string(), json!("x"));
            }
            call_args.insert("task_type".to_string(), json!("sync"));

            let err = registry.call(service.name, call_args).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::UnsupportedTaskType { ref value, .. } if value == "sync"),
                "{}",
                service.name
            );
        }

        let err = registry
            .call("get_task_done", args(json!({"task_type": 3})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported task type: 3"));

        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_remove_files_renames_dir_path() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"tok"}}"#)
            .create_async()
            .await;
        let remove = server
            .mock("POST", "/api/fs/remove")
            .match_body(Matcher::Json(json!({"dir": "/tmp", "names": ["a", "b"]})))
            .with_status(200)
            .with_body(r#"{"code":200,"message":"success","data":null}"#)
            .expect(1)
            .create_async()
            .await;

        let registry = registry_for(&server);
        let result = registry
            .call("remove_files", args(json!({"dir_path": "/tmp", "names": ["a", "b"]})))
            .await
            .unwrap();
        assert_eq!(result["code"], 200);
        remove.assert_async().await;
    }

    #[tokio::test]
    async fn test_task_service_strips_task_type_from_path() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"tok"}}"#)
            .create_async()
            .await;
        let retry = server
            .mock("POST", "/api/task/copy/retry")
            .match_query(Matcher::UrlEncoded("tid".into(), "t-9".into()))
            .with_status(200)
            .with_body(r#"{"code":200,"data":null}"#)
            .expect(1)
            .create_async()
            .await;

        let registry = registry_for(&server);
        registry
            .call("retry_task", args(json!({"task_type": "copy", "tid": "t-9"})))
            .await
            .unwrap();
        retry.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_failure_wrapped() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(r#"{"code":200,"data":{"token":"tok"}}"#)
            .create_async()
            .await;
        let _mkdir = server
            .mock("POST", "/api/fs/mkdir")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let registry = registry_for(&server);
        let err = registry
            .call("mkdir", args(json!({"path": "/new"})))
            .await
            .unwrap_err();

        match err {
            ServiceError::Failed { ref service, ref source } => {
                assert_eq!(service, "mkdir");
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
