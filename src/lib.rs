// OpenList Monitor - Library root

pub mod api;
pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http_client;
pub mod middleware;
pub mod models;
pub mod monitor;
pub mod routes;
pub mod sensors;
pub mod services;

use axum::Router;

/// Build the application with all routes and middleware
pub fn build_app(state: routes::AppState) -> Router {
    Router::new()
        // Health check routes (no auth required)
        .merge(routes::health_routes())
        // Sensor and service routes (with auth)
        .merge(routes::api_routes(state))
        .layer(middleware::cors_layer())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
