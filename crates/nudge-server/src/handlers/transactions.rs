//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use nudge_core::{
    process_batch, BatchReport, Evaluation, Ingestor, KeywordCategorizer, Pipeline, RiskFlag,
    RowError, SignConvention, Transaction, TransactionQuery, TransactionSource,
};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub from: Option<NaiveDate>,
    /// Inclusive
    pub to: Option<NaiveDate>,
    pub flag: Option<String>,
    #[serde(default)]
    pub include_superseded: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let flag: Option<RiskFlag> = params
        .flag
        .as_deref()
        .map(|f| f.parse())
        .transpose()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let transactions = state.db.list_transactions(&TransactionQuery {
        from: params.from,
        to: params.to,
        flag,
        include_superseded: params.include_superseded,
        limit: Some(params.limit.clamp(1, MAX_PAGE_LIMIT)),
        offset: Some(params.offset.max(0)),
    })?;

    Ok(Json(transactions))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let tx = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;
    Ok(Json(tx))
}

/// Query parameters for submitting transactions
#[derive(Debug, Deserialize)]
pub struct IngestQuery {
    /// import, receipt, or manual (default)
    pub source: Option<String>,
    /// negative_is_debit or positive_is_debit (default depends on source)
    pub sign: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Records that could not be read
    pub rejected: Vec<RowError>,
    #[serde(flatten)]
    pub report: BatchReport,
}

/// POST /api/transactions - Evaluate and store a batch of records
///
/// The body is a JSON array of records, or an object with a `transactions`
/// array. Unreadable records are reported and skipped.
pub async fn create_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngestQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IngestResponse>, AppError> {
    let source: TransactionSource = params
        .source
        .as_deref()
        .unwrap_or("manual")
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;
    let mut ingestor = Ingestor::new(source);
    if let Some(sign) = params.sign.as_deref() {
        let sign: SignConvention = sign.parse().map_err(|e: String| AppError::bad_request(&e))?;
        ingestor = ingestor.with_sign(sign);
    }

    let ingested = ingestor.parse_value(body)?;

    let protection = state.protection()?;
    let categorizer = KeywordCategorizer::new()?;
    let pipeline = Pipeline {
        db: &state.db,
        guard: &state.guard,
        categorizer: &categorizer,
        protection: &protection,
    };
    let report = process_batch(&pipeline, ingested.accepted, Utc::now());

    Ok(Json(IngestResponse {
        rejected: ingested.errors,
        report,
    }))
}

/// Fields to change in a correction; absent fields keep the original value
#[derive(Debug, Deserialize)]
pub struct CorrectTransactionRequest {
    pub amount: Option<f64>,
    pub description: Option<String>,
    /// Same formats as import records
    pub timestamp: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CorrectTransactionResponse {
    pub id: i64,
    pub supersedes_id: i64,
    pub evaluation: Evaluation,
}

/// POST /api/transactions/:id/correct - Store a correction for a transaction
pub async fn correct_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<CorrectTransactionRequest>,
) -> Result<Json<CorrectTransactionResponse>, AppError> {
    let original = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    if let Some(amount) = body.amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::bad_request("amount must be a non-negative number"));
        }
    }
    let timestamp = match body.timestamp.as_deref() {
        Some(s) => Some(nudge_core::ingest::parse_timestamp(s)?),
        None => original.timestamp,
    };

    let tx = nudge_core::NewTransaction {
        timestamp,
        amount: body.amount.unwrap_or(original.amount),
        kind: original.kind,
        description: body.description.unwrap_or(original.description),
        payee: body.payee.or(original.payee),
        category: body
            .category
            .map(|c| c.trim().to_lowercase())
            .or(original.category),
        source: original.source,
        import_hash: None,
    };

    let protection = state.protection()?;
    let categorizer = KeywordCategorizer::new()?;
    let pipeline = Pipeline {
        db: &state.db,
        guard: &state.guard,
        categorizer: &categorizer,
        protection: &protection,
    };

    let (new_id, evaluation) = pipeline.correct(id, tx, Utc::now()).map_err(|e| match e {
        nudge_core::Error::InvalidData(msg) => AppError::conflict(&msg),
        other => AppError::from(other),
    })?;

    Ok(Json(CorrectTransactionResponse {
        id: new_id,
        supersedes_id: id,
        evaluation,
    }))
}
