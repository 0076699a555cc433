//! Status, config and audit log handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use nudge_core::config::ConfigFile;
use nudge_core::models::GuardStats;
use nudge_core::{AuditEntry, ProtectionStatus};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub stats: GuardStats,
    pub protection: ProtectionStatus,
}

/// GET /api/status - Totals and protection status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let stats = state.db.get_guard_stats()?;
    let protection = state
        .protection()?
        .status(Utc::now(), state.guard.config());
    Ok(Json(StatusResponse { stats, protection }))
}

/// GET /api/config - Effective guard configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigFile> {
    Json(state.guard.config().to_file())
}

/// Query parameters for audit log
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: i64,
}

fn default_audit_limit() -> i64 {
    100
}

/// GET /api/audit - List audit log entries
pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_audit_log(limit)?))
}
