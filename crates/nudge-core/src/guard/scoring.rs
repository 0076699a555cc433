//! Risk score for a single purchase
//!
//! The score (0-100) sums independent factors: night timing weighted by
//! hour, amount over the threshold, high-risk category, and purchase bursts.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::GuardConfig;
use crate::models::NewTransaction;

/// Lower bound of the band that warrants a reflective prompt
pub const REFLECTIVE_SCORE: u8 = 30;

const NIGHT_BASE: f64 = 30.0;
const AMOUNT_BASE: f64 = 25.0;
const AMOUNT_FACTOR_CAP: f64 = 3.0;
const CATEGORY_BASE: f64 = 20.0;
const CATEGORY_NIGHT_MULTIPLIER: f64 = 1.5;
const BURST_MIN_COUNT: usize = 3;
const BURST_PER_TX: f64 = 5.0;
const BURST_CAP: f64 = 20.0;

/// Risk multiplier for the hour of day; peaks at 2-3am
pub fn hour_risk_multiplier(hour: u32) -> f64 {
    match hour {
        0 => 1.5,
        1 => 1.8,
        2 | 3 => 2.0,
        4 => 1.8,
        5 => 1.5,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => Self::Low,
            30..=49 => Self::Medium,
            50..=69 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    NightTime,
    HighAmount,
    RiskyCategory,
    HighFrequency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: RiskFactorKind,
    pub description: String,
    pub score: f64,
}

/// Suggested next step for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedStep {
    Proceed,
    Confirm,
    Delay,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub level: RiskLevel,
    pub message: String,
    pub step: RecommendedStep,
    pub delay_minutes: i64,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub is_high_risk: bool,
    pub is_night: bool,
    pub factors: Vec<RiskFactor>,
    pub recommendation: Recommendation,
}

impl RiskAssessment {
    /// Assessment for purchases that are never scored (income, unprotected)
    pub fn none(config: &GuardConfig) -> Self {
        Self {
            score: 0,
            level: RiskLevel::Low,
            is_high_risk: false,
            is_night: false,
            factors: vec![],
            recommendation: recommend(0, config),
        }
    }
}

/// Score a purchase
///
/// `recent_count` is the number of purchases seen in the frequency window
/// before this one.
pub fn assess(tx: &NewTransaction, config: &GuardConfig, recent_count: usize) -> RiskAssessment {
    let mut factors = Vec::new();
    let is_night = tx
        .timestamp
        .map(|ts| config.is_night(ts.time()))
        .unwrap_or(false);

    if let (true, Some(ts)) = (is_night, tx.timestamp) {
        let score = NIGHT_BASE * hour_risk_multiplier(ts.hour());
        factors.push(RiskFactor {
            factor: RiskFactorKind::NightTime,
            description: format!("Purchase at {}", ts.format("%H:%M")),
            score,
        });
    }

    if tx.amount >= config.impulse_threshold {
        let ratio = (tx.amount / config.impulse_threshold).min(AMOUNT_FACTOR_CAP);
        factors.push(RiskFactor {
            factor: RiskFactorKind::HighAmount,
            description: format!(
                "{:.2} is at or above the {:.2} limit",
                tx.amount, config.impulse_threshold
            ),
            score: AMOUNT_BASE * ratio,
        });
    }

    if let Some(category) = tx.category.as_deref() {
        if config.is_high_risk_category(category) {
            let score = if is_night {
                CATEGORY_BASE * CATEGORY_NIGHT_MULTIPLIER
            } else {
                CATEGORY_BASE
            };
            factors.push(RiskFactor {
                factor: RiskFactorKind::RiskyCategory,
                description: format!("Category '{}' is considered high risk", category),
                score,
            });
        }
    }

    if recent_count >= BURST_MIN_COUNT {
        factors.push(RiskFactor {
            factor: RiskFactorKind::HighFrequency,
            description: format!(
                "{} purchases in the last {} minutes",
                recent_count,
                config.frequency_window.num_minutes()
            ),
            score: (recent_count as f64 * BURST_PER_TX).min(BURST_CAP),
        });
    }

    let total: f64 = factors.iter().map(|f| f.score).sum();
    let score = total.min(100.0) as u8;

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        is_high_risk: score >= config.risk_score_threshold,
        is_night,
        factors,
        recommendation: recommend(score, config),
    }
}

/// Recommendation for a score
pub fn recommend(score: u8, config: &GuardConfig) -> Recommendation {
    let delay = config.confirmation_delay.num_minutes();
    let level = RiskLevel::from_score(score);
    let (message, step, delay_minutes, questions): (&str, _, _, &[&str]) = match level {
        RiskLevel::Low => (
            "Purchase is within your usual pattern.",
            RecommendedStep::Proceed,
            0,
            &[],
        ),
        RiskLevel::Medium => (
            "Consider whether this purchase is really necessary.",
            RecommendedStep::Confirm,
            0,
            &[
                "Was this purchase planned?",
                "Could you wait until tomorrow to decide?",
            ],
        ),
        RiskLevel::High => (
            "Heads up: this may be an impulse purchase.",
            RecommendedStep::Delay,
            delay,
            &[
                "Why do you want to buy this right now?",
                "How will you feel about this decision tomorrow?",
                "Does this purchase move you closer to your goals?",
            ],
        ),
        RiskLevel::Critical => (
            "High risk of an impulse purchase.",
            RecommendedStep::Block,
            delay * 2,
            &[
                "Are you stressed or anxious right now?",
                "Have you regretted purchases made at times like this?",
                "What would happen if you did not buy this?",
            ],
        ),
    };

    Recommendation {
        level,
        message: message.to_string(),
        step,
        delay_minutes,
        questions: questions.iter().map(|q| q.to_string()).collect(),
    }
}

/// Start of the frequency window for a purchase at `ts`
pub fn frequency_window_start(ts: NaiveDateTime, config: &GuardConfig) -> NaiveDateTime {
    ts.checked_sub_signed(config.frequency_window)
        .unwrap_or(NaiveDateTime::MIN)
}
