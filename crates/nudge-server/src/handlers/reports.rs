//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;

use crate::{AppError, AppState};
use nudge_core::{DecendioReport, FlagSummary, SpendingSummary};

/// Query parameters for the decendio report (defaults to the current month)
#[derive(Debug, Deserialize)]
pub struct DecendioQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// GET /api/reports/decendio - Income and expenses per ten-day period
pub async fn report_decendio(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DecendioQuery>,
) -> Result<Json<DecendioReport>, AppError> {
    let today = Local::now().date_naive();
    let year = params.year.unwrap_or(today.year());
    let month = params.month.unwrap_or(today.month());
    if !(1..=12).contains(&month) {
        return Err(AppError::bad_request("month must be between 1 and 12"));
    }

    Ok(Json(state.db.decendio_report(year, month)?))
}

/// Date range for the flag and spending summaries
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    /// Inclusive
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    fn validate(&self) -> Result<(), AppError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::bad_request("from must not be after to"));
            }
        }
        Ok(())
    }
}

/// GET /api/reports/flags - Count and amount per risk flag
pub async fn report_flags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<FlagSummary>>, AppError> {
    params.validate()?;
    Ok(Json(state.db.flag_summary(params.from, params.to)?))
}

/// GET /api/reports/summary - Income, expenses, savings rate and expenses
/// per category
pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<SpendingSummary>, AppError> {
    params.validate()?;
    Ok(Json(state.db.spending_summary(params.from, params.to)?))
}
