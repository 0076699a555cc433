//! Transaction operations
//!
//! Transactions are written once together with their flags and, when the
//! guard held them, their pending confirmation. The effective guard state of a
//! stored transaction comes from its confirmation when one exists.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::{format_timestamp, parse_datetime, parse_timestamp, Database};
use crate::confirmation::PendingConfirmation;
use crate::error::{Error, Result};
use crate::guard::Evaluation;
use crate::history::{HistoryEntry, TransactionHistory};
use crate::models::{
    GuardState, GuardStats, NewTransaction, RiskFlag, Transaction, TransactionSource,
};

/// Result of inserting a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionInsertResult {
    /// Transaction was inserted, contains new transaction ID
    Inserted(i64),
    /// Same import hash already stored, contains existing transaction ID
    Duplicate(i64),
}

/// Filters for listing transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub from: Option<NaiveDate>,
    /// Inclusive
    pub to: Option<NaiveDate>,
    pub flag: Option<RiskFlag>,
    /// Also return records replaced by a correction
    pub include_superseded: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const SELECT_TRANSACTION: &str = r#"
    SELECT t.id, t.timestamp, t.amount, t.kind, t.description, t.payee, t.category,
           COALESCE(pc.state, t.guard_state), t.risk_score, t.source, t.supersedes_id,
           t.created_at,
           (SELECT GROUP_CONCAT(f.flag) FROM transaction_flags f WHERE f.transaction_id = t.id)
    FROM transactions t
    LEFT JOIN pending_confirmations pc ON pc.transaction_id = t.id
"#;

/// Transactions with no correction pointing at them
const NOT_SUPERSEDED: &str =
    "NOT EXISTS (SELECT 1 FROM transactions s WHERE s.supersedes_id = t.id)";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let timestamp: Option<String> = row.get(1)?;
    let kind: String = row.get(3)?;
    let state: String = row.get(7)?;
    let source: String = row.get(9)?;
    let created_at: String = row.get(11)?;
    let flags: Option<String> = row.get(12)?;

    Ok(Transaction {
        id: row.get(0)?,
        timestamp: timestamp.as_deref().and_then(parse_timestamp),
        amount: row.get(2)?,
        kind: kind.parse().unwrap_or_default(),
        description: row.get(4)?,
        payee: row.get(5)?,
        category: row.get(6)?,
        guard_state: state.parse().unwrap_or_default(),
        risk_score: row.get(8)?,
        source: source.parse().unwrap_or_default(),
        supersedes_id: row.get(10)?,
        created_at: parse_datetime(&created_at),
        risk_flags: flags
            .map(|s| s.split(',').filter_map(|f| f.parse().ok()).collect())
            .unwrap_or_default(),
    })
}

impl Database {
    /// Look up a stored transaction by import hash
    pub fn find_by_import_hash(&self, import_hash: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![import_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Store an evaluated transaction with its flags and pending confirmation
    ///
    /// Duplicates (same import hash) are skipped.
    pub fn insert_transaction(
        &self,
        tx: &NewTransaction,
        evaluation: &Evaluation,
    ) -> Result<TransactionInsertResult> {
        if let Some(hash) = tx.import_hash.as_deref() {
            if let Some(existing) = self.find_by_import_hash(hash)? {
                debug!(existing, "Skipping duplicate transaction");
                return Ok(TransactionInsertResult::Duplicate(existing));
            }
        }

        let id = self.insert_record(tx, evaluation, None)?;
        Ok(TransactionInsertResult::Inserted(id))
    }

    /// Store a correction for an earlier transaction
    ///
    /// The original row is left as is; the new row points back to it. Each
    /// record can be corrected once (correct the correction to chain further).
    pub fn insert_correction(
        &self,
        original_id: i64,
        tx: &NewTransaction,
        evaluation: &Evaluation,
    ) -> Result<i64> {
        let original = self
            .get_transaction(original_id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", original_id)))?;

        if let Some(existing) = self.find_correction(original_id)? {
            return Err(Error::InvalidData(format!(
                "transaction {} was already corrected by {}",
                original.id, existing
            )));
        }

        let mut tx = tx.clone();
        tx.source = TransactionSource::Correction;
        tx.import_hash = None;

        let id = self.insert_record(&tx, evaluation, Some(original_id))?;
        self.log_audit(
            "correct",
            Some("transaction"),
            Some(id),
            Some(&format!("supersedes {}", original_id)),
        )?;
        info!(original_id, correction_id = id, "Transaction corrected");
        Ok(id)
    }

    fn insert_record(
        &self,
        tx: &NewTransaction,
        evaluation: &Evaluation,
        supersedes_id: Option<i64>,
    ) -> Result<i64> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        db_tx.execute(
            r#"
            INSERT INTO transactions (timestamp, amount, kind, description, payee, category,
                                      guard_state, risk_score, source, import_hash, supersedes_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.timestamp.map(format_timestamp),
                tx.amount,
                tx.kind.as_str(),
                tx.description,
                tx.payee,
                tx.category,
                evaluation.state.as_str(),
                evaluation.assessment.score,
                tx.source.as_str(),
                tx.import_hash,
                supersedes_id,
            ],
        )?;
        let id = db_tx.last_insert_rowid();

        for flag in &evaluation.flags {
            db_tx.execute(
                "INSERT OR IGNORE INTO transaction_flags (transaction_id, flag) VALUES (?, ?)",
                params![id, flag.as_str()],
            )?;
        }

        if let (GuardState::PendingConfirmation, Some(release_at)) =
            (evaluation.state, evaluation.release_at)
        {
            let pending = PendingConfirmation::new(id, evaluation.evaluated_at, release_at);
            db_tx.execute(
                r#"
                INSERT INTO pending_confirmations (transaction_id, created_at, release_at, state)
                VALUES (?, ?, ?, ?)
                "#,
                params![
                    id,
                    pending.created_at.to_rfc3339(),
                    pending.release_at.to_rfc3339(),
                    pending.state.as_str(),
                ],
            )?;
        }

        db_tx.commit()?;
        Ok(id)
    }

    /// Attach a flag to a stored transaction
    ///
    /// Flags are append-only; adding an existing flag is a no-op.
    pub fn add_flag(&self, transaction_id: i64, flag: RiskFlag) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO transaction_flags (transaction_id, flag) VALUES (?, ?)",
            params![transaction_id, flag.as_str()],
        )?;
        Ok(inserted > 0)
    }

    pub fn get_flags(&self, transaction_id: i64) -> Result<BTreeSet<RiskFlag>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT flag FROM transaction_flags WHERE transaction_id = ?")?;
        let flags = stmt
            .query_map(params![transaction_id], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|f| f.parse().ok())
            .collect();
        Ok(flags)
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE t.id = ?", SELECT_TRANSACTION);
        let tx = conn
            .query_row(&sql, params![id], row_to_transaction)
            .optional()?;
        Ok(tx)
    }

    /// ID of the record that corrects `id`, if any
    pub fn find_correction(&self, id: i64) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT id FROM transactions WHERE supersedes_id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !query.include_superseded {
            conditions.push(NOT_SUPERSEDED.to_string());
        }
        if let Some(from) = query.from {
            conditions.push("COALESCE(t.timestamp, t.created_at) >= ?".to_string());
            params.push(Box::new(from.to_string()));
        }
        if let Some(to) = query.to {
            conditions.push("COALESCE(t.timestamp, t.created_at) < ?".to_string());
            let end = to.succ_opt().unwrap_or(to);
            params.push(Box::new(end.to_string()));
        }
        if let Some(flag) = query.flag {
            conditions.push(
                "EXISTS (SELECT 1 FROM transaction_flags f WHERE f.transaction_id = t.id AND f.flag = ?)"
                    .to_string(),
            );
            params.push(Box::new(flag.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "{} {} ORDER BY COALESCE(t.timestamp, t.created_at) DESC, t.id DESC LIMIT ? OFFSET ?",
            SELECT_TRANSACTION, where_clause
        );
        params.push(Box::new(query.limit.unwrap_or(-1)));
        params.push(Box::new(query.offset.unwrap_or(0)));

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(param_refs.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Totals for the status view
    pub fn get_guard_stats(&self) -> Result<GuardStats> {
        let conn = self.conn()?;

        let count_flag = |flag: RiskFlag| -> Result<i64> {
            let sql = format!(
                "SELECT COUNT(*) FROM transaction_flags f JOIN transactions t ON t.id = f.transaction_id \
                 WHERE f.flag = ? AND {}",
                NOT_SUPERSEDED
            );
            Ok(conn.query_row(&sql, params![flag.as_str()], |row| row.get(0))?)
        };

        let total_transactions: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM transactions t WHERE {}", NOT_SUPERSEDED),
            [],
            |row| row.get(0),
        )?;
        let flagged_transactions: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM transactions t WHERE {} AND EXISTS \
                 (SELECT 1 FROM transaction_flags f WHERE f.transaction_id = t.id)",
                NOT_SUPERSEDED
            ),
            [],
            |row| row.get(0),
        )?;
        let pending_confirmations: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pending_confirmations WHERE state = ?",
            params![GuardState::PendingConfirmation.as_str()],
            |row| row.get(0),
        )?;

        Ok(GuardStats {
            total_transactions,
            flagged_transactions,
            pending_confirmations,
            night_purchases: count_flag(RiskFlag::NightPurchase)?,
            impulse_suspected: count_flag(RiskFlag::ImpulseSuspected)?,
            unverified_timing: count_flag(RiskFlag::UnverifiedTiming)?,
        })
    }
}

impl TransactionHistory for Database {
    /// Current (not superseded, not cancelled) expenses in `[from, to)`
    fn entries_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT t.timestamp, t.amount, t.description, t.payee, t.category
            FROM transactions t
            LEFT JOIN pending_confirmations pc ON pc.transaction_id = t.id
            WHERE t.kind = 'debit'
              AND t.timestamp IS NOT NULL
              AND t.timestamp >= ? AND t.timestamp < ?
              AND (pc.state IS NULL OR pc.state != ?)
              AND {}
            ORDER BY t.timestamp
            "#,
            NOT_SUPERSEDED
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                format_timestamp(from),
                format_timestamp(to),
                GuardState::Cancelled.as_str()
            ],
            |row| {
                let ts: String = row.get(0)?;
                let description: String = row.get(2)?;
                let payee: Option<String> = row.get(3)?;
                let category: Option<String> = row.get(4)?;
                Ok((ts, row.get::<_, f64>(1)?, description, payee, category))
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (ts, amount, description, payee, category) = row?;
            if let Some(timestamp) = parse_timestamp(&ts) {
                entries.push(HistoryEntry::new(
                    timestamp,
                    amount,
                    payee.as_deref().unwrap_or(&description),
                    category.as_deref(),
                ));
            }
        }
        Ok(entries)
    }
}
