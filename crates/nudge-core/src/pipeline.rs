//! Batch processing: ingest -> guard -> categorize -> store
//!
//! Every record is evaluated against the history already in the database, so
//! earlier records of the same batch count as precedent for later ones. A
//! failure on one record is reported and the batch continues. Flagged records
//! also get an alert.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::categorize::Categorizer;
use crate::db::{Database, TransactionInsertResult};
use crate::error::Result;
use crate::guard::{Evaluation, Guard, ProtectionState};
use crate::ingest::RowError;
use crate::models::{GuardState, NewTransaction, RequiredAction, RiskFlag};

/// Outcome for one stored record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
    pub flags: BTreeSet<RiskFlag>,
    pub action: RequiredAction,
    pub state: GuardState,
    pub risk_score: u8,
    pub release_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub flagged: usize,
    pub pending: usize,
    pub results: Vec<ProcessedTransaction>,
    /// Per-record failures (1-based position in the batch)
    pub errors: Vec<RowError>,
}

/// What happened to one record
#[derive(Debug, Clone)]
pub enum Processed {
    /// Already stored under this id
    Duplicate(i64),
    Stored {
        id: i64,
        evaluation: Evaluation,
        transaction: NewTransaction,
    },
}

/// Collaborators shared by every record of a batch
pub struct Pipeline<'a> {
    pub db: &'a Database,
    pub guard: &'a Guard,
    pub categorizer: &'a dyn Categorizer,
    pub protection: &'a ProtectionState,
}

impl Pipeline<'_> {
    /// Evaluate, categorize and store one record
    pub fn process_one(&self, mut tx: NewTransaction, now: DateTime<Utc>) -> Result<Processed> {
        if let Some(hash) = tx.import_hash.as_deref() {
            if let Some(existing) = self.db.find_by_import_hash(hash)? {
                return Ok(Processed::Duplicate(existing));
            }
        }

        let evaluation = self
            .guard
            .evaluate_with_protection(&tx, self.db, now, self.protection)?;

        self.fill_category(&mut tx);

        match self.db.insert_transaction(&tx, &evaluation)? {
            TransactionInsertResult::Duplicate(id) => Ok(Processed::Duplicate(id)),
            TransactionInsertResult::Inserted(id) => {
                self.raise_alert(id, &tx, &evaluation);
                Ok(Processed::Stored {
                    id,
                    evaluation,
                    transaction: tx,
                })
            }
        }
    }

    /// Evaluate and store a correction for `original_id`
    ///
    /// The corrected record goes through the guard again, so fixing an amount
    /// or time can add or clear flags on the new row.
    pub fn correct(
        &self,
        original_id: i64,
        mut tx: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<(i64, Evaluation)> {
        let evaluation = self
            .guard
            .evaluate_with_protection(&tx, self.db, now, self.protection)?;
        self.fill_category(&mut tx);
        let id = self.db.insert_correction(original_id, &tx, &evaluation)?;
        self.raise_alert(id, &tx, &evaluation);
        Ok((id, evaluation))
    }

    /// The transaction is already stored, so a failed alert is only logged
    fn raise_alert(&self, id: i64, tx: &NewTransaction, evaluation: &Evaluation) {
        if evaluation.flags.is_empty() {
            return;
        }
        if let Err(e) = self.db.add_alert(id, tx, evaluation) {
            warn!(transaction_id = id, error = %e, "Failed to record alert");
        }
    }

    /// Categorizer failures leave the record uncategorized
    fn fill_category(&self, tx: &mut NewTransaction) {
        if tx.category.is_some() {
            return;
        }
        match self.categorizer.categorize(tx) {
            Ok(category) => tx.category = category,
            Err(e) => warn!(
                categorizer = self.categorizer.name(),
                error = %e,
                "Categorization failed, storing uncategorized"
            ),
        }
    }
}

/// Process a batch of ingested records
pub fn process_batch(
    pipeline: &Pipeline<'_>,
    records: Vec<NewTransaction>,
    now: DateTime<Utc>,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (i, tx) in records.into_iter().enumerate() {
        let row = i + 1;
        match pipeline.process_one(tx, now) {
            Ok(Processed::Duplicate(_)) => report.duplicates += 1,
            Ok(Processed::Stored {
                id,
                evaluation,
                transaction: tx,
            }) => {
                report.inserted += 1;
                if !evaluation.flags.is_empty() {
                    report.flagged += 1;
                }
                if evaluation.is_pending() {
                    report.pending += 1;
                }
                report.results.push(ProcessedTransaction {
                    id,
                    description: tx.description,
                    amount: tx.amount,
                    category: tx.category,
                    flags: evaluation.flags,
                    action: evaluation.action,
                    state: evaluation.state,
                    risk_score: evaluation.assessment.score,
                    release_at: evaluation.release_at,
                });
            }
            Err(e) => {
                warn!(row, error = %e, "Failed to process record");
                report.errors.push(RowError {
                    row,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        flagged = report.flagged,
        pending = report.pending,
        errors = report.errors.len(),
        "Batch processed"
    );
    report
}
