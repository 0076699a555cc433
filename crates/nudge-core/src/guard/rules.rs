//! Guard rules
//!
//! Each rule is independent and yields at most one flag. The guard iterates
//! the list and attaches every flag that fires.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GuardConfig;
use crate::error::Result;
use crate::history::TransactionHistory;
use crate::models::{NewTransaction, RiskFlag};

/// Inputs shared by all rules for one evaluation
pub struct RuleContext<'a> {
    pub transaction: &'a NewTransaction,
    pub config: &'a GuardConfig,
    pub history: &'a dyn TransactionHistory,
}

impl RuleContext<'_> {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.transaction.timestamp
    }

    fn over_threshold(&self) -> bool {
        self.transaction.amount >= self.config.impulse_threshold
    }

    fn is_night(&self) -> bool {
        self.timestamp()
            .map(|ts| self.config.is_night(ts.time()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Flags records that arrived without a timestamp
    TimingVerification,
    /// Purchase time inside the night window
    NightWindow,
    /// Large purchase without a recent precedent
    ImpulseThreshold,
    /// Large or night purchase that must wait for confirmation
    HighRiskConfirmation,
}

impl Rule {
    /// Built-in rules in evaluation order
    pub fn all() -> &'static [Rule] {
        &[
            Self::TimingVerification,
            Self::NightWindow,
            Self::ImpulseThreshold,
            Self::HighRiskConfirmation,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimingVerification => "timing_verification",
            Self::NightWindow => "night_window",
            Self::ImpulseThreshold => "impulse_threshold",
            Self::HighRiskConfirmation => "high_risk_confirmation",
        }
    }

    /// The flag this rule can attach
    pub fn flag(&self) -> RiskFlag {
        match self {
            Self::TimingVerification => RiskFlag::UnverifiedTiming,
            Self::NightWindow => RiskFlag::NightPurchase,
            Self::ImpulseThreshold => RiskFlag::ImpulseSuspected,
            Self::HighRiskConfirmation => RiskFlag::HighRiskConfirmationPending,
        }
    }

    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Option<RiskFlag>> {
        let fired = match self {
            Self::TimingVerification => ctx.timestamp().is_none(),
            Self::NightWindow => ctx.is_night(),
            Self::ImpulseThreshold => match ctx.timestamp() {
                Some(ts) if ctx.over_threshold() => !has_recent_precedent(ctx, ts)?,
                _ => false,
            },
            Self::HighRiskConfirmation => ctx.over_threshold() || ctx.is_night(),
        };

        if fired {
            debug!(rule = self.as_str(), flag = %self.flag(), "Rule fired");
        }
        Ok(fired.then(|| self.flag()))
    }
}

/// Whether the same payee or category was bought within the lookback window
fn has_recent_precedent(ctx: &RuleContext<'_>, ts: NaiveDateTime) -> Result<bool> {
    let since = ts
        .checked_sub_signed(ctx.config.impulse_lookback)
        .unwrap_or(NaiveDateTime::MIN);
    let entries = ctx.history.entries_between(since, ts)?;
    Ok(entries.iter().any(|e| e.matches(ctx.transaction)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryEntry, NoHistory};
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn config() -> GuardConfig {
        GuardConfig::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            100.0,
            Duration::minutes(5),
        )
        .unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn fire(rule: Rule, tx: &NewTransaction, history: &dyn TransactionHistory) -> bool {
        let config = config();
        let ctx = RuleContext {
            transaction: tx,
            config: &config,
            history,
        };
        rule.evaluate(&ctx).unwrap().is_some()
    }

    #[test]
    fn test_rule_flags_are_distinct() {
        let flags: std::collections::BTreeSet<_> = Rule::all().iter().map(|r| r.flag()).collect();
        assert_eq!(flags.len(), Rule::all().len());
    }

    #[test]
    fn test_night_window_rule() {
        let night = NewTransaction::expense(at(15, 2, 30), 10.0, "Store");
        let day = NewTransaction::expense(at(15, 14, 30), 10.0, "Store");
        assert!(fire(Rule::NightWindow, &night, &NoHistory));
        assert!(!fire(Rule::NightWindow, &day, &NoHistory));
    }

    #[test]
    fn test_impulse_requires_threshold() {
        let below = NewTransaction::expense(at(15, 14, 0), 99.99, "Store");
        let at_threshold = NewTransaction::expense(at(15, 14, 0), 100.0, "Store");
        assert!(!fire(Rule::ImpulseThreshold, &below, &NoHistory));
        assert!(fire(Rule::ImpulseThreshold, &at_threshold, &NoHistory));
    }

    #[test]
    fn test_impulse_suppressed_by_recent_same_category() {
        let history = vec![HistoryEntry::new(at(10, 12, 0), 30.0, "Rappi", Some("delivery"))];
        let tx = NewTransaction::expense(at(15, 14, 0), 150.0, "iFood").with_category("delivery");
        assert!(!fire(Rule::ImpulseThreshold, &tx, &history));
    }

    #[test]
    fn test_impulse_ignores_history_outside_lookback() {
        // 30-day lookback; entry is 40 days earlier
        let old = NaiveDate::from_ymd_opt(2023, 12, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let history = vec![HistoryEntry::new(old, 30.0, "iFood", Some("delivery"))];
        let tx = NewTransaction::expense(at(15, 14, 0), 150.0, "iFood").with_category("delivery");
        assert!(fire(Rule::ImpulseThreshold, &tx, &history));
    }

    #[test]
    fn test_impulse_ignores_later_history() {
        let history = vec![HistoryEntry::new(at(16, 9, 0), 30.0, "iFood", None)];
        let tx = NewTransaction::expense(at(15, 14, 0), 150.0, "iFood");
        assert!(fire(Rule::ImpulseThreshold, &tx, &history));
    }

    #[test]
    fn test_high_risk_on_amount_or_night() {
        let big_day = NewTransaction::expense(at(15, 14, 0), 100.0, "Store");
        let small_night = NewTransaction::expense(at(15, 3, 0), 5.0, "Store");
        let small_day = NewTransaction::expense(at(15, 14, 0), 5.0, "Store");
        assert!(fire(Rule::HighRiskConfirmation, &big_day, &NoHistory));
        assert!(fire(Rule::HighRiskConfirmation, &small_night, &NoHistory));
        assert!(!fire(Rule::HighRiskConfirmation, &small_day, &NoHistory));
    }

    #[test]
    fn test_missing_timestamp_skips_timing_rules() {
        let mut tx = NewTransaction::expense(at(15, 2, 0), 500.0, "Store");
        tx.timestamp = None;
        assert!(fire(Rule::TimingVerification, &tx, &NoHistory));
        assert!(!fire(Rule::NightWindow, &tx, &NoHistory));
        assert!(!fire(Rule::ImpulseThreshold, &tx, &NoHistory));
        // Amount alone still requires confirmation
        assert!(fire(Rule::HighRiskConfirmation, &tx, &NoHistory));
    }
}
