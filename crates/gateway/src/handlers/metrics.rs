//! Prometheus exposition endpoint

use axum::extract::State;
use chatbridge_common::errors::{AppError, Result};

use crate::AppState;

/// Render every recorded metric in the Prometheus text format
pub async fn render(State(state): State<AppState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound {
            resource_type: "endpoint".to_string(),
            id: "/metrics".to_string(),
        })
}
