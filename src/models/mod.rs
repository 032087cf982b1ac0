// Data models for the OpenList API

pub mod response;
pub mod task;

pub use response::ApiResponse;
pub use task::{TaskState, TaskType};
