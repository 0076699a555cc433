//! Savings goal handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use nudge_core::{Goal, GoalStatus, SavedGoal};

#[derive(Debug, Deserialize)]
pub struct GoalQuery {
    /// Include paused and completed goals
    #[serde(default)]
    pub all: bool,
}

/// GET /api/goals - Active goals, or every goal with `?all=true`
pub async fn list_goals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoalQuery>,
) -> Result<Json<Vec<SavedGoal>>, AppError> {
    let status = (!params.all).then_some(GoalStatus::Active);
    Ok(Json(state.db.list_goals(status)?))
}

/// POST /api/goals - Add a goal
pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    Json(goal): Json<Goal>,
) -> Result<(StatusCode, Json<SavedGoal>), AppError> {
    let id = state.db.add_goal(&goal)?;
    let saved = state
        .db
        .get_goal(id)?
        .ok_or_else(|| AppError::not_found("Goal not found"))?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/goals/:id
pub async fn get_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SavedGoal>, AppError> {
    let saved = state
        .db
        .get_goal(id)?
        .ok_or_else(|| AppError::not_found("Goal not found"))?;
    Ok(Json(saved))
}

#[derive(Debug, Deserialize)]
pub struct GoalProgressRequest {
    /// Total saved towards the goal
    pub current_amount: f64,
}

/// POST /api/goals/:id/progress - Record how much has been saved
pub async fn update_goal_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<GoalProgressRequest>,
) -> Result<Json<SavedGoal>, AppError> {
    Ok(Json(state.db.update_goal_progress(id, body.current_amount)?))
}

#[derive(Debug, Deserialize)]
pub struct GoalStatusRequest {
    pub status: GoalStatus,
}

/// POST /api/goals/:id/status - Pause, resume or complete a goal
pub async fn update_goal_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<GoalStatusRequest>,
) -> Result<Json<SavedGoal>, AppError> {
    Ok(Json(state.db.set_goal_status(id, body.status)?))
}

/// DELETE /api/goals/:id
pub async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.db.delete_goal(id)?;
    Ok(StatusCode::NO_CONTENT)
}
