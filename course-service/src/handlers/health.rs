use crate::startup::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

/// Liveness: answers as long as the process serves requests.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Readiness: the course store must answer a one-row read.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Course store readiness probe failed");
        AppError::from(e)
    })?;

    Ok(Json(json!({ "ready": true })))
}
