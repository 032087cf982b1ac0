use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware::{self as axum_middleware},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware;
use crate::monitor::Monitor;
use crate::sensors::Sensor;
use crate::services::ServiceRegistry;

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub proxy_api_key: String,
    pub monitor: Arc<Monitor>,
    pub services: Arc<ServiceRegistry>,
}

/// Health check routes (no authentication required)
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

/// Sensor and service routes (require authentication)
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/sensors", get(list_sensors_handler))
        .route("/sensors/:id", get(get_sensor_handler))
        .route("/services", get(list_services_handler))
        .route("/services/:name", post(call_service_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}

/// GET / - Simple health check
///
/// This endpoint does not require authentication (for load balancers).
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "OpenList monitor is running",
        "version": VERSION
    }))
}

/// GET /health - Detailed health check
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION
    }))
}

/// GET /sensors - Current snapshot of every sensor
async fn list_sensors_handler(State(state): State<AppState>) -> Json<Value> {
    let sensors = state.monitor.sensors().await;
    Json(json!({
        "source": state.monitor.source(),
        "sensors": sensors,
    }))
}

/// GET /sensors/:id - One sensor by id
async fn get_sensor_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sensor>, ApiError> {
    state
        .monitor
        .sensor(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown sensor: {}", id)))
}

/// GET /services - Registered service names
async fn list_services_handler(State(state): State<AppState>) -> Json<Value> {
    let names: Vec<&str> = state.services.names().collect();
    Json(json!({ "services": names }))
}

/// POST /services/:name - Run a service with a JSON object of arguments
///
/// An empty body is treated as no arguments.
async fn call_service_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(service = %name, "Request to /services");

    let args = parse_args(&body)?;
    let result = state.services.call(&name, args).await?;

    Ok(Json(json!({
        "service": name,
        "result": result,
    })))
}

fn parse_args(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::ValidationError(
            "service arguments must be a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::ValidationError(format!(
            "invalid JSON arguments: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OpenListClient;
    use crate::auth::Credentials;
    use crate::http_client::OpenListHttpClient;

    fn create_test_state() -> AppState {
        let http =
            OpenListHttpClient::new(Credentials::new("http://127.0.0.1:1", "admin", "secret"), 30)
                .unwrap();
        let client = OpenListClient::new(http);

        AppState {
            proxy_api_key: "test-key".to_string(),
            monitor: Arc::new(Monitor::new("home", client.clone(), &["/movies".to_string()])),
            services: Arc::new(ServiceRegistry::new(client)),
        }
    }

    #[tokio::test]
    async fn test_root_handler() {
        let json = root_handler().await;
        let value = json.0;

        assert_eq!(value["status"], "ok");
        assert_eq!(value["message"], "OpenList monitor is running");
        assert_eq!(value["version"], VERSION);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let json = health_handler().await;
        let value = json.0;

        assert_eq!(value["status"], "healthy");
        assert!(value["timestamp"].is_string());
        assert_eq!(value["version"], VERSION);
    }

    #[tokio::test]
    async fn test_list_sensors_handler() {
        let state = create_test_state();
        let value = list_sensors_handler(State(state)).await.0;

        assert_eq!(value["source"], "home");
        let sensors = value["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 1 + 21 + 1);
        assert_eq!(sensors[0]["id"], "openlist_home_root_files");
        assert_eq!(sensors[0]["available"], false);
    }

    #[tokio::test]
    async fn test_get_sensor_handler() {
        let state = create_test_state();

        let sensor = get_sensor_handler(
            State(state.clone()),
            Path("openlist_home_copy_undone".to_string()),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(sensor.name, "Copy pending tasks");

        let err = get_sensor_handler(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_services_handler() {
        let state = create_test_state();
        let value = list_services_handler(State(state)).await.0;
        let names = value["services"].as_array().unwrap();
        assert!(names.contains(&json!("remove_files")));
        assert!(names.contains(&json!("retry_some_tasks")));
    }

    #[tokio::test]
    async fn test_call_service_validation_errors() {
        let state = create_test_state();

        let err = call_service_handler(
            State(state.clone()),
            Path("mkdir".to_string()),
            Bytes::from_static(b"{}"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(ref m) if m.contains("path")));

        let err = call_service_handler(
            State(state.clone()),
            Path("no_such_service".to_string()),
            Bytes::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = call_service_handler(
            State(state),
            Path("mkdir".to_string()),
            Bytes::from_static(b"[1,2]"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn test_parse_args() {
        assert!(parse_args(b"").unwrap().is_empty());
        assert!(parse_args(b"  \n").unwrap().is_empty());
        assert_eq!(parse_args(br#"{"path":"/a"}"#).unwrap()["path"], "/a");
        assert!(parse_args(b"not json").is_err());
        assert!(parse_args(b"\"text\"").is_err());
    }
}
