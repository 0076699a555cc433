//! Alerts raised for flagged purchases
//!
//! One alert is written for every stored transaction that carries at least
//! one risk flag. Alerts stay in the unacknowledged list until the user
//! acknowledges them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{parse_instant, Database};
use crate::error::{Error, Result};
use crate::guard::Evaluation;
use crate::models::{NewTransaction, RequiredAction, RiskFlag};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub transaction_id: i64,
    pub flags: BTreeSet<RiskFlag>,
    pub risk_score: u8,
    pub action: RequiredAction,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

const SELECT_ALERT: &str = r#"
    SELECT id, transaction_id, flags, risk_score, action, message, created_at, acknowledged_at
    FROM alerts
"#;

fn row_to_alert(row: &Row) -> rusqlite::Result<Alert> {
    let flags: String = row.get(2)?;
    let risk_score: i64 = row.get(3)?;
    let action: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let acknowledged_at: Option<String> = row.get(7)?;

    Ok(Alert {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        flags: flags.split(',').filter_map(|f| f.parse().ok()).collect(),
        risk_score: risk_score.clamp(0, 100) as u8,
        action: action.parse().unwrap_or_default(),
        message: row.get(5)?,
        created_at: parse_instant(&created_at),
        acknowledged_at: acknowledged_at.as_deref().map(parse_instant),
    })
}

/// Human-readable summary of a flagged purchase
pub fn alert_message(tx: &NewTransaction, evaluation: &Evaluation) -> String {
    let flags = evaluation
        .flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut message = format!("{:.2} at {}: {}", tx.amount, tx.description, flags);
    if let Some(release_at) = evaluation.release_at {
        message.push_str(&format!(
            " (held until {})",
            release_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    message
}

impl Database {
    /// Record an alert for a flagged transaction
    pub fn add_alert(
        &self,
        transaction_id: i64,
        tx: &NewTransaction,
        evaluation: &Evaluation,
    ) -> Result<i64> {
        let flags = evaluation
            .flags
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO alerts (transaction_id, flags, risk_score, action, message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                transaction_id,
                flags,
                evaluation.assessment.score,
                evaluation.action.as_str(),
                alert_message(tx, evaluation),
                evaluation.evaluated_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_alert(&self, id: i64) -> Result<Option<Alert>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE id = ?", SELECT_ALERT);
        Ok(conn.query_row(&sql, params![id], row_to_alert).optional()?)
    }

    /// Alerts, newest first
    pub fn list_alerts(&self, include_acknowledged: bool) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let sql = if include_acknowledged {
            format!("{} ORDER BY id DESC", SELECT_ALERT)
        } else {
            format!("{} WHERE acknowledged_at IS NULL ORDER BY id DESC", SELECT_ALERT)
        };
        let mut stmt = conn.prepare(&sql)?;
        let alerts = stmt
            .query_map([], row_to_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    /// Mark an alert as seen; acknowledging twice keeps the first time
    pub fn acknowledge_alert(&self, id: i64, now: DateTime<Utc>) -> Result<Alert> {
        let alert = self
            .get_alert(id)?
            .ok_or_else(|| Error::NotFound(format!("alert {}", id)))?;
        if alert.is_acknowledged() {
            return Ok(alert);
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE alerts SET acknowledged_at = ? WHERE id = ? AND acknowledged_at IS NULL",
            params![now.to_rfc3339(), id],
        )?;
        self.log_audit("alert_acknowledge", Some("alert"), Some(id), None)?;

        self.get_alert(id)?
            .ok_or_else(|| Error::NotFound(format!("alert {}", id)))
    }
}
