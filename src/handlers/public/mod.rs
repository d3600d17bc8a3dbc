// handlers/public/mod.rs - Public handlers (no authentication required)

use axum::extract::State;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - Service banner and endpoint map
pub async fn root(State(state): State<AppState>) -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Ok(ApiResponse::success(json!({
        "name": state.config.app_name,
        "version": version,
        "description": format!("Welcome to the {}", state.config.app_name),
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/api/auth/me, /api/auth/verify (protected)",
            "notes": "/api/notes/[:id[/favorite]] (protected)",
            "tags": "/api/tags/[:id] (protected)",
        }
    })))
}

/// GET /health - Liveness for monitoring and load balancers
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "service": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })))
}
