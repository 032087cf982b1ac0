// Declarative table of OpenList API operations

use reqwest::Method;
use serde_json::{Map, Value};

use crate::error::{OpenListError, Result};

/// Placeholder replaced by the task type in task endpoint paths
pub const TASK_TYPE_PLACEHOLDER: &str = "{task_type}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
        }
    }
}

/// How the arguments travel on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// JSON object of the declared arguments merged over defaults
    Object,
    /// Nothing beyond the path
    Empty,
    /// `tid` as a query parameter, sent when present
    TaskId,
    /// `tids` as a bare JSON array body
    TaskIds,
}

/// Default value for an optional argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgDefault {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl ArgDefault {
    fn to_value(self) -> Value {
        match self {
            ArgDefault::Str(s) => Value::from(s),
            ArgDefault::Int(i) => Value::from(i),
            ArgDefault::Bool(b) => Value::from(b),
        }
    }
}

/// One remote operation
#[derive(Debug)]
pub struct Endpoint {
    pub name: &'static str,
    pub verb: Verb,
    pub path: &'static str,
    /// Arguments that must be present and non-empty
    pub required: &'static [&'static str],
    /// Optional arguments and their defaults
    pub optional: &'static [(&'static str, ArgDefault)],
    pub payload: Payload,
}

impl Endpoint {
    pub fn is_task_scoped(&self) -> bool {
        self.path.contains(TASK_TYPE_PLACEHOLDER)
    }

    fn accepts(&self, arg: &str) -> bool {
        self.required.contains(&arg) || self.optional.iter().any(|(name, _)| *name == arg)
    }

    /// Reject missing, null, empty-string and empty-list required arguments
    /// and arguments the endpoint does not declare
    pub fn validate(&self, args: &Map<String, Value>) -> Result<()> {
        for name in self.required {
            match args.get(*name) {
                None | Some(Value::Null) => {
                    return Err(OpenListError::validation(format!(
                        "{}: missing required argument '{}'",
                        self.name, name
                    )));
                }
                Some(value) if is_empty(value) => {
                    return Err(OpenListError::validation(format!(
                        "{}: argument '{}' must not be empty",
                        self.name, name
                    )));
                }
                Some(_) => {}
            }
        }

        if let Some(unknown) = args.keys().find(|k| !self.accepts(k)) {
            return Err(OpenListError::validation(format!(
                "{}: unexpected argument '{}'",
                self.name, unknown
            )));
        }

        if self.name == "rename" {
            if let Some(name) = args.get("name").and_then(|v| v.as_str()) {
                if name.contains('/') {
                    return Err(OpenListError::validation(
                        "rename: new name must not contain '/'",
                    ));
                }
            }
        }

        Ok(())
    }

    /// JSON body of an `Object` payload: defaults overlaid by the caller's arguments
    pub fn object_body(&self, args: &Map<String, Value>) -> Value {
        let mut body = Map::new();
        for (name, default) in self.optional {
            body.insert(name.to_string(), default.to_value());
        }
        for (name, value) in args {
            if name != "task_type" {
                body.insert(name.clone(), value.clone());
            }
        }
        Value::Object(body)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

use ArgDefault::{Bool, Int, Str};
use Payload::{Empty, Object, TaskId, TaskIds};
use Verb::{Get, Post};

const TASK: &[&str] = &["task_type"];
const TASK_AND_ID: &[&str] = &["task_type", "tid"];
const TASK_AND_IDS: &[&str] = &["task_type", "tids"];

/// Every operation the client can issue
pub static ENDPOINTS: &[Endpoint] = &[
    // ---- file system ----
    Endpoint {
        name: "list",
        verb: Post,
        path: "/api/fs/list",
        required: &[],
        optional: &[
            ("path", Str("/")),
            ("password", Str("")),
            ("page", Int(1)),
            ("per_page", Int(0)),
            ("refresh", Bool(false)),
        ],
        payload: Object,
    },
    Endpoint {
        name: "get",
        verb: Post,
        path: "/api/fs/get",
        required: &["path"],
        optional: &[
            ("password", Str("")),
            ("page", Int(1)),
            ("per_page", Int(0)),
            ("refresh", Bool(false)),
        ],
        payload: Object,
    },
    Endpoint {
        name: "search",
        verb: Post,
        path: "/api/fs/search",
        required: &["parent", "keywords", "scope"],
        optional: &[("page", Int(1)), ("per_page", Int(20)), ("password", Str(""))],
        payload: Object,
    },
    Endpoint {
        name: "dirs",
        verb: Post,
        path: "/api/fs/dirs",
        required: &[],
        optional: &[
            ("path", Str("/")),
            ("password", Str("")),
            ("force_root", Bool(false)),
        ],
        payload: Object,
    },
    Endpoint {
        name: "mkdir",
        verb: Post,
        path: "/api/fs/mkdir",
        required: &["path"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "rename",
        verb: Post,
        path: "/api/fs/rename",
        required: &["path", "name"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "batch_rename",
        verb: Post,
        path: "/api/fs/batch_rename",
        required: &["src_dir", "rename_objects"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "regex_rename",
        verb: Post,
        path: "/api/fs/regex_rename",
        required: &["src_dir", "src_name_regex", "new_name_regex"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "move",
        verb: Post,
        path: "/api/fs/move",
        required: &["src_dir", "dst_dir", "names"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "recursive_move",
        verb: Post,
        path: "/api/fs/recursive_move",
        required: &["src_dir", "dst_dir"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "copy",
        verb: Post,
        path: "/api/fs/copy",
        required: &["src_dir", "dst_dir", "names"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "remove",
        verb: Post,
        path: "/api/fs/remove",
        required: &["dir", "names"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "remove_empty_dir",
        verb: Post,
        path: "/api/fs/remove_empty_directory",
        required: &["src_dir"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "add_offline_download",
        verb: Post,
        path: "/api/fs/add_offline_download",
        required: &["path", "urls", "tool", "delete_policy"],
        optional: &[],
        payload: Object,
    },
    Endpoint {
        name: "archive_meta",
        verb: Post,
        path: "/api/fs/archive/meta",
        required: &["path"],
        optional: &[
            ("password", Str("")),
            ("refresh", Bool(false)),
            ("archive_pass", Str("")),
        ],
        payload: Object,
    },
    Endpoint {
        name: "archive_list",
        verb: Post,
        path: "/api/fs/archive/list",
        required: &["path", "inner_path"],
        optional: &[
            ("password", Str("")),
            ("page", Int(1)),
            ("per_page", Int(0)),
            ("refresh", Bool(false)),
            ("archive_pass", Str("")),
        ],
        payload: Object,
    },
    Endpoint {
        name: "archive_decompress",
        verb: Post,
        path: "/api/fs/archive/decompress",
        required: &["src_dir", "dst_dir", "name", "inner_path"],
        optional: &[
            ("archive_pass", Str("")),
            ("cache_full", Bool(true)),
            ("put_into_new_dir", Bool(false)),
        ],
        payload: Object,
    },
    Endpoint {
        name: "me",
        verb: Get,
        path: "/api/me",
        required: &[],
        optional: &[],
        payload: Empty,
    },
    // ---- tasks ----
    Endpoint {
        name: "task_info",
        verb: Post,
        path: "/api/task/{task_type}/info",
        required: TASK,
        optional: &[("tid", Str(""))],
        payload: TaskId,
    },
    Endpoint {
        name: "task_done",
        verb: Get,
        path: "/api/task/{task_type}/done",
        required: TASK,
        optional: &[],
        payload: Empty,
    },
    Endpoint {
        name: "task_undone",
        verb: Get,
        path: "/api/task/{task_type}/undone",
        required: TASK,
        optional: &[],
        payload: Empty,
    },
    Endpoint {
        name: "task_delete",
        verb: Post,
        path: "/api/task/{task_type}/delete",
        required: TASK_AND_ID,
        optional: &[],
        payload: TaskId,
    },
    Endpoint {
        name: "task_cancel",
        verb: Post,
        path: "/api/task/{task_type}/cancel",
        required: TASK_AND_ID,
        optional: &[],
        payload: TaskId,
    },
    Endpoint {
        name: "task_clear_done",
        verb: Post,
        path: "/api/task/{task_type}/clear_done",
        required: TASK,
        optional: &[],
        payload: Empty,
    },
    Endpoint {
        name: "task_clear_succeeded",
        verb: Post,
        path: "/api/task/{task_type}/clear_succeeded",
        required: TASK,
        optional: &[],
        payload: Empty,
    },
    Endpoint {
        name: "task_retry",
        verb: Post,
        path: "/api/task/{task_type}/retry",
        required: TASK_AND_ID,
        optional: &[],
        payload: TaskId,
    },
    Endpoint {
        name: "task_retry_failed",
        verb: Post,
        path: "/api/task/{task_type}/retry_failed",
        required: TASK,
        optional: &[],
        payload: Empty,
    },
    Endpoint {
        name: "task_delete_some",
        verb: Post,
        path: "/api/task/{task_type}/delete_some",
        required: TASK_AND_IDS,
        optional: &[],
        payload: TaskIds,
    },
    Endpoint {
        name: "task_cancel_some",
        verb: Post,
        path: "/api/task/{task_type}/cancel_some",
        required: TASK_AND_IDS,
        optional: &[],
        payload: TaskIds,
    },
    Endpoint {
        name: "task_retry_some",
        verb: Post,
        path: "/api/task/{task_type}/retry_some",
        required: TASK_AND_IDS,
        optional: &[],
        payload: TaskIds,
    },
];

/// Look up an endpoint by name
pub fn find(name: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().find(|e| e.name == name)
}
