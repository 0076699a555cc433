//! Behavioral guard
//!
//! Evaluates an incoming transaction against the configured rules and decides
//! what the caller must do before the purchase goes through.
//!
//! ## Lifecycle
//!
//! ```text
//! NEW -> EVALUATING -> APPROVED
//!                   -> PENDING_CONFIRMATION -> FINALIZED (confirm or timeout)
//!                                           -> CANCELLED
//! ```
//!
//! Evaluation is pure: the guard reads the config and the history it is
//! given and never writes anywhere. Persisting the result is the caller's job
//! (see [`crate::pipeline`]).

pub mod protection;
pub mod rules;
pub mod scoring;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GuardConfig;
use crate::error::{Error, Result};
use crate::history::TransactionHistory;
use crate::models::{GuardState, NewTransaction, RequiredAction, RiskFlag};

pub use protection::{
    ProtectionState, ProtectionStatus, DEFAULT_BYPASS_MINUTES, MAX_BYPASS_MINUTES,
};
pub use rules::{Rule, RuleContext};
pub use scoring::{
    RecommendedStep, Recommendation, RiskAssessment, RiskFactor, RiskFactorKind, RiskLevel,
    REFLECTIVE_SCORE,
};

/// Outcome of evaluating one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub flags: BTreeSet<RiskFlag>,
    pub action: RequiredAction,
    /// `Approved` or `PendingConfirmation`
    pub state: GuardState,
    pub assessment: RiskAssessment,
    pub evaluated_at: DateTime<Utc>,
    /// When a pending purchase finalizes on its own
    pub release_at: Option<DateTime<Utc>>,
    /// False when protection was disabled or bypassed; flags are kept for audit
    pub protected: bool,
}

impl Evaluation {
    pub fn is_pending(&self) -> bool {
        self.state == GuardState::PendingConfirmation
    }
}

/// Rule engine bound to a validated configuration
pub struct Guard {
    config: GuardConfig,
    rules: Vec<Rule>,
}

impl Guard {
    /// Create a guard with the built-in rules
    ///
    /// Fails fast when the config is malformed.
    pub fn new(config: GuardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rules: Rule::all().to_vec(),
        })
    }

    /// Restrict the guard to a subset of rules
    pub fn with_rules(mut self, rules: &[Rule]) -> Self {
        self.rules = rules.to_vec();
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate with protection active
    pub fn evaluate(
        &self,
        tx: &NewTransaction,
        history: &dyn TransactionHistory,
        now: DateTime<Utc>,
    ) -> Result<Evaluation> {
        self.run(tx, history, now, true)
    }

    /// Evaluate honoring the session's protection switch
    pub fn evaluate_with_protection(
        &self,
        tx: &NewTransaction,
        history: &dyn TransactionHistory,
        now: DateTime<Utc>,
        protection: &ProtectionState,
    ) -> Result<Evaluation> {
        self.run(tx, history, now, protection.is_active(now))
    }

    fn run(
        &self,
        tx: &NewTransaction,
        history: &dyn TransactionHistory,
        now: DateTime<Utc>,
        protected: bool,
    ) -> Result<Evaluation> {
        if !tx.is_expense() {
            debug!(amount = tx.amount, "Skipping credit transaction");
            return Ok(Evaluation {
                flags: BTreeSet::new(),
                action: RequiredAction::None,
                state: GuardState::Approved,
                assessment: RiskAssessment::none(&self.config),
                evaluated_at: now,
                release_at: None,
                protected,
            });
        }

        debug!(state = %GuardState::Evaluating, amount = tx.amount, "Evaluating transaction");

        let ctx = RuleContext {
            transaction: tx,
            config: &self.config,
            history,
        };

        let mut flags = BTreeSet::new();
        for rule in &self.rules {
            if let Some(flag) = rule.evaluate(&ctx)? {
                flags.insert(flag);
            }
        }

        let recent_count = match tx.timestamp {
            Some(ts) => history
                .entries_between(scoring::frequency_window_start(ts, &self.config), ts)?
                .len(),
            None => 0,
        };
        let assessment = scoring::assess(tx, &self.config, recent_count);

        let action = required_action(&flags, assessment.score);

        let (action, state, release_at) = match (protected, action) {
            (false, _) => (RequiredAction::None, GuardState::Approved, None),
            (true, RequiredAction::BlockPendingConfirmation) => {
                let release_at = now
                    .checked_add_signed(self.config.confirmation_delay)
                    .ok_or_else(|| {
                        Error::Config("confirmation deadline is out of range".to_string())
                    })?;
                (action, GuardState::PendingConfirmation, Some(release_at))
            }
            (true, action) => (action, GuardState::Approved, None),
        };

        if !flags.is_empty() {
            info!(
                flags = ?flags,
                action = %action,
                score = assessment.score,
                protected,
                "Transaction flagged"
            );
        }

        Ok(Evaluation {
            flags,
            action,
            state,
            assessment,
            evaluated_at: now,
            release_at,
            protected,
        })
    }
}

/// Map flags and score to the action the caller must take
pub fn required_action(flags: &BTreeSet<RiskFlag>, score: u8) -> RequiredAction {
    if flags.contains(&RiskFlag::HighRiskConfirmationPending) {
        RequiredAction::BlockPendingConfirmation
    } else if score >= REFLECTIVE_SCORE {
        RequiredAction::ReflectivePrompt
    } else {
        RequiredAction::None
    }
}

/// Evaluate a single transaction with protection active
pub fn evaluate(
    tx: &NewTransaction,
    config: &GuardConfig,
    history: &dyn TransactionHistory,
) -> Result<(BTreeSet<RiskFlag>, RequiredAction)> {
    let guard = Guard::new(config.clone())?;
    let evaluation = guard.evaluate(tx, history, Utc::now())?;
    Ok((evaluation.flags, evaluation.action))
}
