use serde::Serialize;
use serde_json::{json, Map, Value};

use super::endpoints::{self, Endpoint, Payload, TASK_TYPE_PLACEHOLDER};
use crate::error::{OpenListError, Result};
use crate::http_client::{OpenListHttpClient, RequestOptions};
use crate::models::TaskType;

/// One entry of a batch rename
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameObject {
    pub src_name: String,
    pub new_name: String,
}

/// Typed access to the OpenList API
///
/// Every method goes through [`OpenListClient::invoke`], which validates the
/// arguments against the endpoint table before any network call.
#[derive(Clone)]
pub struct OpenListClient {
    http: OpenListHttpClient,
}

impl OpenListClient {
    pub fn new(http: OpenListHttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &OpenListHttpClient {
        &self.http
    }

    /// Call an endpoint by name with a JSON argument map
    pub async fn invoke(&self, name: &str, args: Map<String, Value>) -> Result<Value> {
        let endpoint = endpoints::find(name)
            .ok_or_else(|| OpenListError::validation(format!("unknown operation: {}", name)))?;
        self.call(endpoint, args).await
    }

    /// Validate, assemble and send one endpoint call
    pub async fn call(&self, endpoint: &Endpoint, args: Map<String, Value>) -> Result<Value> {
        endpoint.validate(&args)?;

        let path = if endpoint.is_task_scoped() {
            let task_type = task_type_arg(&args)?;
            endpoint.path.replace(TASK_TYPE_PLACEHOLDER, task_type.as_str())
        } else {
            endpoint.path.to_string()
        };

        let options = match endpoint.payload {
            Payload::Object => RequestOptions::new().json(endpoint.object_body(&args)),
            Payload::Empty => RequestOptions::new(),
            Payload::TaskId => match args.get("tid") {
                Some(Value::String(tid)) if !tid.is_empty() => {
                    RequestOptions::new().query("tid", tid.as_str())
                }
                Some(Value::String(_)) | Some(Value::Null) | None => RequestOptions::new(),
                Some(other) => RequestOptions::new().query("tid", other.to_string()),
            },
            Payload::TaskIds => match args.get("tids") {
                Some(tids @ Value::Array(_)) => RequestOptions::new().json(tids.clone()),
                _ => {
                    return Err(OpenListError::validation(format!(
                        "{}: 'tids' must be a list of task ids",
                        endpoint.name
                    )))
                }
            },
        };

        tracing::debug!(operation = endpoint.name, path = %path, "Invoking OpenList operation");
        self.http.request(endpoint.verb.into(), &path, options).await
    }

    // ---- file system ----

    /// List a directory with default paging
    pub async fn list(&self, path: &str) -> Result<Value> {
        self.invoke("list", args(json!({ "path": path }))).await
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.invoke("get", args(json!({ "path": path }))).await
    }

    pub async fn search(&self, parent: &str, keywords: &str, scope: i64) -> Result<Value> {
        self.invoke(
            "search",
            args(json!({ "parent": parent, "keywords": keywords, "scope": scope })),
        )
        .await
    }

    pub async fn dirs(&self, path: &str) -> Result<Value> {
        self.invoke("dirs", args(json!({ "path": path }))).await
    }

    pub async fn mkdir(&self, path: &str) -> Result<Value> {
        self.invoke("mkdir", args(json!({ "path": path }))).await
    }

    pub async fn rename(&self, path: &str, name: &str) -> Result<Value> {
        self.invoke("rename", args(json!({ "path": path, "name": name })))
            .await
    }

    pub async fn batch_rename(&self, src_dir: &str, rename_objects: &[RenameObject]) -> Result<Value> {
        self.invoke(
            "batch_rename",
            args(json!({ "src_dir": src_dir, "rename_objects": rename_objects })),
        )
        .await
    }

    pub async fn regex_rename(
        &self,
        src_dir: &str,
        src_name_regex: &str,
        new_name_regex: &str,
    ) -> Result<Value> {
        self.invoke(
            "regex_rename",
            args(json!({
                "src_dir": src_dir,
                "src_name_regex": src_name_regex,
                "new_name_regex": new_name_regex,
            })),
        )
        .await
    }

    pub async fn move_files(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<Value> {
        self.invoke(
            "move",
            args(json!({ "src_dir": src_dir, "dst_dir": dst_dir, "names": names })),
        )
        .await
    }

    /// Move everything below `src_dir` into `dst_dir`
    pub async fn recursive_move(&self, src_dir: &str, dst_dir: &str) -> Result<Value> {
        self.invoke(
            "recursive_move",
            args(json!({ "src_dir": src_dir, "dst_dir": dst_dir })),
        )
        .await
    }

    pub async fn copy_files(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<Value> {
        self.invoke(
            "copy",
            args(json!({ "src_dir": src_dir, "dst_dir": dst_dir, "names": names })),
        )
        .await
    }

    pub async fn remove_files(&self, dir: &str, names: &[String]) -> Result<Value> {
        self.invoke("remove", args(json!({ "dir": dir, "names": names })))
            .await
    }

    pub async fn remove_empty_dir(&self, src_dir: &str) -> Result<Value> {
        self.invoke("remove_empty_dir", args(json!({ "src_dir": src_dir })))
            .await
    }

    pub async fn add_offline_download(
        &self,
        path: &str,
        urls: &[String],
        tool: &str,
        delete_policy: &str,
    ) -> Result<Value> {
        self.invoke(
            "add_offline_download",
            args(json!({
                "path": path,
                "urls": urls,
                "tool": tool,
                "delete_policy": delete_policy,
            })),
        )
        .await
    }

    pub async fn archive_meta(&self, path: &str) -> Result<Value> {
        self.invoke("archive_meta", args(json!({ "path": path }))).await
    }

    pub async fn archive_list(&self, path: &str, inner_path: &str) -> Result<Value> {
        self.invoke(
            "archive_list",
            args(json!({ "path": path, "inner_path": inner_path })),
        )
        .await
    }

    pub async fn archive_decompress(
        &self,
        src_dir: &str,
        dst_dir: &str,
        names: &[String],
        inner_path: &str,
    ) -> Result<Value> {
        self.invoke(
            "archive_decompress",
            args(json!({
                "src_dir": src_dir,
                "dst_dir": dst_dir,
                "name": names,
                "inner_path": inner_path,
            })),
        )
        .await
    }

    /// Current user profile
    pub async fn me(&self) -> Result<Value> {
        self.invoke("me", Map::new()).await
    }

    // ---- tasks ----

    pub async fn task_info(&self, task_type: TaskType, tid: Option<&str>) -> Result<Value> {
        let mut map = task_args(task_type);
        if let Some(tid) = tid {
            map.insert("tid".to_string(), Value::from(tid));
        }
        self.invoke("task_info", map).await
    }

    pub async fn task_done(&self, task_type: TaskType) -> Result<Value> {
        self.invoke("task_done", task_args(task_type)).await
    }

    pub async fn task_undone(&self, task_type: TaskType) -> Result<Value> {
        self.invoke("task_undone", task_args(task_type)).await
    }

    pub async fn task_delete(&self, task_type: TaskType, tid: &str) -> Result<Value> {
        self.invoke("task_delete", task_id_args(task_type, tid)).await
    }

    pub async fn task_cancel(&self, task_type: TaskType, tid: &str) -> Result<Value> {
        self.invoke("task_cancel", task_id_args(task_type, tid)).await
    }

    pub async fn task_clear_done(&self, task_type: TaskType) -> Result<Value> {
        self.invoke("task_clear_done", task_args(task_type)).await
    }

    pub async fn task_clear_succeeded(&self, task_type: TaskType) -> Result<Value> {
        self.invoke("task_clear_succeeded", task_args(task_type))
            .await
    }

    pub async fn task_retry(&self, task_type: TaskType, tid: &str) -> Result<Value> {
        self.invoke("task_retry", task_id_args(task_type, tid)).await
    }

    pub async fn task_retry_failed(&self, task_type: TaskType) -> Result<Value> {
        self.invoke("task_retry_failed", task_args(task_type)).await
    }

    pub async fn task_delete_some(&self, task_type: TaskType, tids: &[String]) -> Result<Value> {
        self.invoke("task_delete_some", task_ids_args(task_type, tids))
            .await
    }

    pub async fn task_cancel_some(&self, task_type: TaskType, tids: &[String]) -> Result<Value> {
        self.invoke("task_cancel_some", task_ids_args(task_type, tids))
            .await
    }

    pub async fn task_retry_some(&self, task_type: TaskType, tids: &[String]) -> Result<Value> {
        self.invoke("task_retry_some", task_ids_args(task_type, tids))
            .await
    }
}

/// Unwrap a `json!` object literal into an argument map
fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn task_args(task_type: TaskType) -> Map<String, Value> {
    args(json!({ "task_type": task_type.as_str() }))
}

fn task_id_args(task_type: TaskType, tid: &str) -> Map<String, Value> {
    args(json!({ "task_type": task_type.as_str(), "tid": tid }))
}

fn task_ids_args(task_type: TaskType, tids: &[String]) -> Map<String, Value> {
    args(json!({ "task_type": task_type.as_str(), "tids": tids }))
}

fn task_type_arg(args: &Map<String, Value>) -> Result<TaskType> {
    match args.get("task_type") {
        Some(Value::String(s)) => s.parse(),
        other => Err(OpenListError::validation(format!(
            "unsupported task type: {}",
            other.map(|v| v.to_string()).unwrap_or_default()
        ))),
    }
}
