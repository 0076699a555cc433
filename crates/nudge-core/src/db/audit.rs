//! Audit log and persisted protection settings

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{parse_instant, Database};
use crate::error::Result;
use crate::guard::ProtectionState;

const PROTECTION_ENABLED: &str = "protection.enabled";
const PROTECTION_BYPASS_UNTIL: &str = "protection.bypass_until";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}

impl Database {
    /// Record an action in the audit log
    pub fn log_audit(
        &self,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO audit_log (action, entity_type, entity_id, details)
            VALUES (?, ?, ?, ?)
            "#,
            params![action, entity_type, entity_id, details],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List audit log entries, newest first
    pub fn list_audit_log(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, timestamp, action, entity_type, entity_id, details
            FROM audit_log
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    details: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Protection switch as last saved (enabled when never saved)
    pub fn load_protection(&self) -> Result<ProtectionState> {
        let enabled = self
            .get_setting(PROTECTION_ENABLED)?
            .map(|v| v != "false")
            .unwrap_or(true);
        let bypass_until: Option<DateTime<Utc>> = self
            .get_setting(PROTECTION_BYPASS_UNTIL)?
            .filter(|v| !v.is_empty())
            .map(|v| parse_instant(&v));
        Ok(ProtectionState::from_parts(enabled, bypass_until))
    }

    /// Persist the protection switch and note the change in the audit log
    pub fn save_protection(&self, state: &ProtectionState, action: &str) -> Result<()> {
        self.set_setting(
            PROTECTION_ENABLED,
            if state.is_enabled() { "true" } else { "false" },
        )?;
        let until = state
            .bypass_until()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        self.set_setting(PROTECTION_BYPASS_UNTIL, &until)?;
        self.log_audit(
            action,
            Some("protection"),
            None,
            (!until.is_empty()).then_some(until.as_str()),
        )?;
        Ok(())
    }
}
