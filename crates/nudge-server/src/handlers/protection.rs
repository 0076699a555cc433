//! Protection switch handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::{AppError, AppState};
use nudge_core::guard::{DEFAULT_BYPASS_MINUTES, MAX_BYPASS_MINUTES};
use nudge_core::ProtectionStatus;

fn status(state: &AppState, protection: &nudge_core::ProtectionState) -> ProtectionStatus {
    protection.status(Utc::now(), state.guard.config())
}

/// GET /api/protection - Current protection status
pub async fn get_protection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProtectionStatus>, AppError> {
    let protection = state.protection()?;
    Ok(Json(status(&state, &protection)))
}

/// POST /api/protection/enable
pub async fn enable_protection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProtectionStatus>, AppError> {
    let protection = state
        .update_protection("protection_enable", |p| p.enable())
        .await?;
    Ok(Json(status(&state, &protection)))
}

/// POST /api/protection/disable
pub async fn disable_protection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProtectionStatus>, AppError> {
    let protection = state
        .update_protection("protection_disable", |p| p.disable())
        .await?;
    Ok(Json(status(&state, &protection)))
}

#[derive(Debug, Default, Deserialize)]
pub struct BypassRequest {
    pub minutes: Option<i64>,
}

/// POST /api/protection/bypass - Suspend protection for a while
pub async fn bypass_protection(
    State(state): State<Arc<AppState>>,
    body: Option<Json<BypassRequest>>,
) -> Result<Json<ProtectionStatus>, AppError> {
    let minutes = body
        .and_then(|Json(b)| b.minutes)
        .unwrap_or(DEFAULT_BYPASS_MINUTES);
    if !(1..=MAX_BYPASS_MINUTES).contains(&minutes) {
        return Err(AppError::bad_request(&format!(
            "minutes must be between 1 and {}",
            MAX_BYPASS_MINUTES
        )));
    }

    let protection = state
        .update_protection("protection_bypass", |p| {
            p.temporary_bypass(Utc::now(), minutes);
        })
        .await?;
    Ok(Json(status(&state, &protection)))
}
