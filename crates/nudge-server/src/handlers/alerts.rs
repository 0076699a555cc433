//! Alert handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{AppError, AppState};
use nudge_core::Alert;

/// Query parameters for listing alerts
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub include_acknowledged: bool,
}

/// GET /api/alerts - Alerts for flagged purchases, newest first
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    Ok(Json(state.db.list_alerts(params.include_acknowledged)?))
}

/// POST /api/alerts/:id/acknowledge - Mark an alert as seen
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Alert>, AppError> {
    Ok(Json(state.db.acknowledge_alert(id, Utc::now())?))
}
