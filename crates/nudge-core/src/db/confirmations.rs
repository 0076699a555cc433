//! Pending confirmation operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{parse_instant, Database};
use crate::confirmation::PendingConfirmation;
use crate::error::{Error, Result};
use crate::models::GuardState;

const SELECT_CONFIRMATION: &str = r#"
    SELECT id, transaction_id, created_at, release_at, state, resolved_at, resolution
    FROM pending_confirmations
"#;

fn row_to_confirmation(row: &Row) -> rusqlite::Result<PendingConfirmation> {
    let created_at: String = row.get(2)?;
    let release_at: String = row.get(3)?;
    let state: String = row.get(4)?;
    let resolved_at: Option<String> = row.get(5)?;
    let resolution: Option<String> = row.get(6)?;

    Ok(PendingConfirmation {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        created_at: parse_instant(&created_at),
        release_at: parse_instant(&release_at),
        state: state.parse().unwrap_or_default(),
        resolved_at: resolved_at.as_deref().map(parse_instant),
        resolution: resolution.and_then(|r| r.parse().ok()),
    })
}

impl Database {
    pub fn get_pending(&self, id: i64) -> Result<Option<PendingConfirmation>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE id = ?", SELECT_CONFIRMATION);
        Ok(conn
            .query_row(&sql, params![id], row_to_confirmation)
            .optional()?)
    }

    pub fn get_pending_for_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<Option<PendingConfirmation>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE transaction_id = ?", SELECT_CONFIRMATION);
        Ok(conn
            .query_row(&sql, params![transaction_id], row_to_confirmation)
            .optional()?)
    }

    /// Confirmations still waiting, soonest release first
    pub fn list_pending(&self) -> Result<Vec<PendingConfirmation>> {
        self.list_confirmations(Some(GuardState::PendingConfirmation))
    }

    pub fn list_confirmations(&self, state: Option<GuardState>) -> Result<Vec<PendingConfirmation>> {
        let conn = self.conn()?;
        let confirmations = match state {
            Some(state) => {
                let sql = format!("{} WHERE state = ? ORDER BY release_at, id", SELECT_CONFIRMATION);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![state.as_str()], row_to_confirmation)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!("{} ORDER BY release_at, id", SELECT_CONFIRMATION);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], row_to_confirmation)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(confirmations)
    }

    fn save_resolution(&self, pending: &PendingConfirmation) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE pending_confirmations
            SET state = ?, resolved_at = ?, resolution = ?
            WHERE id = ?
            "#,
            params![
                pending.state.as_str(),
                pending.resolved_at.map(|t| t.to_rfc3339()),
                pending.resolution.map(|r| r.as_str()),
                pending.id,
            ],
        )?;
        Ok(())
    }

    fn require_pending(&self, id: i64) -> Result<PendingConfirmation> {
        self.get_pending(id)?
            .ok_or_else(|| Error::NotFound(format!("confirmation {}", id)))
    }

    /// Finalize a confirmation if its delay has elapsed
    pub fn poll_pending(&self, id: i64, now: DateTime<Utc>) -> Result<PendingConfirmation> {
        let mut pending = self.require_pending(id)?;
        if pending.is_pending() && pending.poll(now) == GuardState::Finalized {
            self.save_resolution(&pending)?;
        }
        Ok(pending)
    }

    /// Explicit user confirmation
    pub fn confirm_pending(&self, id: i64, now: DateTime<Utc>) -> Result<PendingConfirmation> {
        let mut pending = self.require_pending(id)?;
        let was_pending = pending.is_pending();
        pending.confirm(now)?;
        if was_pending {
            self.save_resolution(&pending)?;
            self.log_audit("confirm", Some("transaction"), Some(pending.transaction_id), None)?;
        }
        Ok(pending)
    }

    /// Explicit user cancellation
    pub fn cancel_pending(&self, id: i64, now: DateTime<Utc>) -> Result<PendingConfirmation> {
        let mut pending = self.require_pending(id)?;
        let was_pending = pending.is_pending();
        pending.cancel(now)?;
        if was_pending {
            self.save_resolution(&pending)?;
            self.log_audit("cancel", Some("transaction"), Some(pending.transaction_id), None)?;
        }
        Ok(pending)
    }

    pub fn cancel_pending_for_transaction(
        &self,
        transaction_id: i64,
        now: DateTime<Utc>,
    ) -> Result<PendingConfirmation> {
        let pending = self
            .get_pending_for_transaction(transaction_id)?
            .ok_or_else(|| {
                Error::NotFound(format!("confirmation for transaction {}", transaction_id))
            })?;
        self.cancel_pending(pending.id, now)
    }

    /// Finalize every confirmation whose delay has elapsed
    pub fn release_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingConfirmation>> {
        let mut released = Vec::new();
        for mut pending in self.list_pending()? {
            if pending.poll(now) == GuardState::Finalized {
                self.save_resolution(&pending)?;
                released.push(pending);
            }
        }
        if !released.is_empty() {
            info!(count = released.len(), "Released pending confirmations");
        }
        Ok(released)
    }
}
