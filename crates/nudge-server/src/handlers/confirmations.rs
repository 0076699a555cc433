//! Pending confirmation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::{AppError, AppState};
use nudge_core::PendingConfirmation;

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    #[serde(flatten)]
    pub confirmation: PendingConfirmation,
    /// Seconds until the purchase finalizes on its own
    pub remaining_seconds: i64,
    pub can_proceed: bool,
}

impl PendingResponse {
    fn new(confirmation: PendingConfirmation) -> Self {
        let remaining_seconds = confirmation.remaining(Utc::now()).num_seconds();
        let can_proceed = confirmation.can_proceed();
        Self {
            confirmation,
            remaining_seconds,
            can_proceed,
        }
    }
}

/// GET /api/pending - Purchases waiting for confirmation
///
/// Finalizes any whose delay has elapsed before listing.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PendingResponse>>, AppError> {
    state.db.release_due(Utc::now())?;
    let pending = state.db.list_pending()?;
    Ok(Json(pending.into_iter().map(PendingResponse::new).collect()))
}

/// GET /api/pending/:id - Poll a confirmation
pub async fn get_pending(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PendingResponse>, AppError> {
    let pending = state.db.poll_pending(id, Utc::now())?;
    Ok(Json(PendingResponse::new(pending)))
}

/// POST /api/pending/:id/confirm - Let the purchase through now
pub async fn confirm_pending(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PendingResponse>, AppError> {
    let pending = state.db.confirm_pending(id, Utc::now())?;
    Ok(Json(PendingResponse::new(pending)))
}

/// POST /api/pending/:id/cancel - Call the purchase off
pub async fn cancel_pending(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PendingResponse>, AppError> {
    let pending = state.db.cancel_pending(id, Utc::now())?;
    Ok(Json(PendingResponse::new(pending)))
}

/// POST /api/pending/release - Finalize every purchase whose delay has elapsed
pub async fn release_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PendingConfirmation>>, AppError> {
    Ok(Json(state.db.release_due(Utc::now())?))
}
