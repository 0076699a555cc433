//! Guard evaluation and intervention handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState};
use nudge_core::intervention::InterventionStats;
use nudge_core::{
    Evaluation, Goal, Ingestor, Intervention, NewTransaction, RequiredAction, TransactionSource,
};

/// A purchase to evaluate; accepts the same fields as a JSON import record
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    pub record: serde_json::Map<String, serde_json::Value>,
    /// Savings goals to compare the purchase against (stored active goals
    /// when omitted)
    #[serde(default)]
    pub goals: Option<Vec<Goal>>,
}

impl EvaluateRequest {
    fn transaction(&self) -> Result<NewTransaction, AppError> {
        let record = serde_json::Value::Object(self.record.clone());
        Ok(Ingestor::new(TransactionSource::Manual).parse_record(record)?)
    }

    fn goals(&self, state: &AppState) -> Result<Vec<Goal>, AppError> {
        match &self.goals {
            Some(goals) => Ok(goals.clone()),
            None => Ok(state.db.active_goals()?),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub transaction: NewTransaction,
    pub evaluation: Evaluation,
    /// Present whenever the guard asks for more than nothing
    pub intervention: Option<Intervention>,
}

/// POST /api/evaluate - Evaluate a purchase without storing it
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let tx = body.transaction()?;
    let now = Utc::now();
    let protection = state.protection()?;

    let evaluation = state
        .guard
        .evaluate_with_protection(&tx, &state.db, now, &protection)?;

    let intervention = if evaluation.action != RequiredAction::None {
        let goals = body.goals(&state)?;
        let mut engine = state.interventions.lock().await;
        Some(engine.generate(&tx, evaluation.assessment.score, &goals))
    } else {
        None
    };

    Ok(Json(EvaluateResponse {
        transaction: tx,
        evaluation,
        intervention,
    }))
}

#[derive(Debug, Deserialize)]
pub struct InterventionRequest {
    #[serde(flatten)]
    pub purchase: EvaluateRequest,
    /// Use this score instead of scoring the purchase
    #[serde(default)]
    pub risk_score: Option<u8>,
}

/// POST /api/interventions - Build an intervention for a purchase
pub async fn create_intervention(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InterventionRequest>,
) -> Result<Json<Intervention>, AppError> {
    let tx = body.purchase.transaction()?;

    let score = match body.risk_score {
        Some(score) if score > 100 => {
            return Err(AppError::bad_request("risk_score must be between 0 and 100"))
        }
        Some(score) => score,
        None => {
            state
                .guard
                .evaluate(&tx, &state.db, Utc::now())?
                .assessment
                .score
        }
    };

    let goals = body.purchase.goals(&state)?;
    let mut engine = state.interventions.lock().await;
    Ok(Json(engine.generate(&tx, score, &goals)))
}

/// GET /api/interventions/stats - Interventions shown this session
pub async fn intervention_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InterventionStats>, AppError> {
    Ok(Json(state.interventions.lock().await.stats()))
}
