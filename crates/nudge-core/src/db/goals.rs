//! Savings goal operations
//!
//! Active goals feed interventions: the goal impact line and the
//! "this purchase is N% of what is left" comparison.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::intervention::{Goal, GoalStatus};

/// A goal as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGoal {
    pub id: i64,
    #[serde(flatten)]
    pub goal: Goal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_GOAL: &str = r#"
    SELECT id, name, target_amount, current_amount, status, created_at, updated_at
    FROM goals
"#;

fn row_to_goal(row: &Row) -> rusqlite::Result<SavedGoal> {
    let status: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(SavedGoal {
        id: row.get(0)?,
        goal: Goal {
            name: row.get(1)?,
            target_amount: row.get(2)?,
            current_amount: row.get(3)?,
            status: status.parse().unwrap_or_default(),
        },
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn validate_amount(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidData(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}

impl Database {
    /// Store a new goal
    pub fn add_goal(&self, goal: &Goal) -> Result<i64> {
        let name = goal.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("goal name is required".to_string()));
        }
        validate_amount(goal.target_amount, "target_amount")?;
        if goal.target_amount == 0.0 {
            return Err(Error::InvalidData("target_amount must be positive".to_string()));
        }
        validate_amount(goal.current_amount, "current_amount")?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO goals (name, target_amount, current_amount, status)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                name,
                goal.target_amount,
                goal.current_amount,
                goal.status.as_str()
            ],
        )?;
        let id = conn.last_insert_rowid();

        self.log_audit("goal_add", Some("goal"), Some(id), Some(name))?;
        info!(id, name, target = goal.target_amount, "Added goal");
        Ok(id)
    }

    pub fn get_goal(&self, id: i64) -> Result<Option<SavedGoal>> {
        let conn = self.conn()?;
        let sql = format!("{} WHERE id = ?", SELECT_GOAL);
        Ok(conn.query_row(&sql, params![id], row_to_goal).optional()?)
    }

    fn require_goal(&self, id: i64) -> Result<SavedGoal> {
        self.get_goal(id)?
            .ok_or_else(|| Error::NotFound(format!("goal {}", id)))
    }

    /// Goals in creation order, optionally only those in `status`
    pub fn list_goals(&self, status: Option<GoalStatus>) -> Result<Vec<SavedGoal>> {
        let conn = self.conn()?;
        let goals = match status {
            Some(status) => {
                let sql = format!("{} WHERE status = ? ORDER BY id", SELECT_GOAL);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![status.as_str()], row_to_goal)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!("{} ORDER BY id", SELECT_GOAL);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], row_to_goal)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(goals)
    }

    /// Active goals, as interventions use them
    pub fn active_goals(&self) -> Result<Vec<Goal>> {
        Ok(self
            .list_goals(Some(GoalStatus::Active))?
            .into_iter()
            .map(|g| g.goal)
            .collect())
    }

    /// Record how much has been saved towards a goal
    ///
    /// An active goal that reaches its target becomes `Completed`.
    pub fn update_goal_progress(&self, id: i64, current_amount: f64) -> Result<SavedGoal> {
        validate_amount(current_amount, "current_amount")?;
        let mut saved = self.require_goal(id)?;

        saved.goal.current_amount = current_amount;
        if saved.goal.status == GoalStatus::Active && saved.goal.remaining() <= 0.0 {
            saved.goal.status = GoalStatus::Completed;
            info!(id, name = %saved.goal.name, "Goal reached");
        }
        self.save_goal(&saved)?;

        self.log_audit(
            "goal_progress",
            Some("goal"),
            Some(id),
            Some(&format!("{:.2}", current_amount)),
        )?;
        self.require_goal(id)
    }

    pub fn set_goal_status(&self, id: i64, status: GoalStatus) -> Result<SavedGoal> {
        let mut saved = self.require_goal(id)?;
        saved.goal.status = status;
        self.save_goal(&saved)?;
        self.log_audit("goal_status", Some("goal"), Some(id), Some(status.as_str()))?;
        self.require_goal(id)
    }

    fn save_goal(&self, saved: &SavedGoal) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE goals
            SET current_amount = ?, status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                saved.goal.current_amount,
                saved.goal.status.as_str(),
                saved.id
            ],
        )?;
        Ok(())
    }

    pub fn delete_goal(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM goals WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("goal {}", id)));
        }
        self.log_audit("goal_delete", Some("goal"), Some(id), None)?;
        Ok(())
    }
}
