//! Domain models for Nudge

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of money movement
///
/// Amounts are always stored non-negative; the kind carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money leaving the account (expense)
    #[default]
    Debit,
    /// Money entering the account (income, refund)
    Credit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" | "debito" | "expense" | "d" => Ok(Self::Debit),
            "credit" | "credito" | "income" | "c" => Ok(Self::Credit),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction source - how it was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Imported from a statement file
    #[default]
    Import,
    /// Extracted from a receipt by the OCR service
    Receipt,
    /// Manually entered
    Manual,
    /// Replacement record for an earlier transaction
    Correction,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Receipt => "receipt",
            Self::Manual => "manual",
            Self::Correction => "correction",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "import" => Ok(Self::Import),
            "receipt" | "ocr" => Ok(Self::Receipt),
            "manual" => Ok(Self::Manual),
            "correction" => Ok(Self::Correction),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk tag attached by the behavioral guard
///
/// Flags are only ever added to a transaction, never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    /// Purchase made inside the configured night window
    NightPurchase,
    /// Large purchase with no recent precedent for the payee/category
    ImpulseSuspected,
    /// Purchase is held until the confirmation delay elapses or the user confirms
    HighRiskConfirmationPending,
    /// Record had no timestamp, so timing checks were skipped
    UnverifiedTiming,
}

impl RiskFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NightPurchase => "night_purchase",
            Self::ImpulseSuspected => "impulse_suspected",
            Self::HighRiskConfirmationPending => "high_risk_confirmation_pending",
            Self::UnverifiedTiming => "unverified_timing",
        }
    }

    pub fn all() -> &'static [RiskFlag] {
        &[
            Self::NightPurchase,
            Self::ImpulseSuspected,
            Self::HighRiskConfirmationPending,
            Self::UnverifiedTiming,
        ]
    }
}

impl std::str::FromStr for RiskFlag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "night_purchase" => Ok(Self::NightPurchase),
            "impulse_suspected" => Ok(Self::ImpulseSuspected),
            "high_risk_confirmation_pending" => Ok(Self::HighRiskConfirmationPending),
            "unverified_timing" => Ok(Self::UnverifiedTiming),
            _ => Err(format!("Unknown risk flag: {}", s)),
        }
    }
}

impl std::fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the caller must do before the transaction goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequiredAction {
    /// Hold until the confirmation delay elapses or the user confirms
    BlockPendingConfirmation,
    /// Show reflective questions but let the purchase proceed
    ReflectivePrompt,
    #[default]
    None,
}

impl RequiredAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockPendingConfirmation => "BLOCK_PENDING_CONFIRMATION",
            Self::ReflectivePrompt => "REFLECTIVE_PROMPT",
            Self::None => "NONE",
        }
    }
}

impl std::str::FromStr for RequiredAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "BLOCK_PENDING_CONFIRMATION" => Ok(Self::BlockPendingConfirmation),
            "REFLECTIVE_PROMPT" => Ok(Self::ReflectivePrompt),
            "NONE" => Ok(Self::None),
            _ => Err(format!("Unknown required action: {}", s)),
        }
    }
}

impl std::fmt::Display for RequiredAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a transaction under guard evaluation
///
/// `New -> Evaluating -> {Approved | PendingConfirmation} -> Finalized`.
/// A pending transaction may also be `Cancelled` by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    #[default]
    New,
    Evaluating,
    Approved,
    PendingConfirmation,
    Finalized,
    Cancelled,
}

impl GuardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Evaluating => "evaluating",
            Self::Approved => "approved",
            Self::PendingConfirmation => "pending_confirmation",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        }
    }

    /// No further transitions are possible from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Finalized | Self::Cancelled)
    }
}

impl std::str::FromStr for GuardState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "evaluating" => Ok(Self::Evaluating),
            "approved" => Ok(Self::Approved),
            "pending_confirmation" => Ok(Self::PendingConfirmation),
            "finalized" => Ok(Self::Finalized),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown guard state: {}", s)),
        }
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction ready to be evaluated and stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    /// Local wall-clock time of the purchase, if the source provided one
    pub timestamp: Option<NaiveDateTime>,
    /// Non-negative magnitude
    pub amount: f64,
    #[serde(default)]
    pub kind: TransactionKind,
    pub description: String,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: TransactionSource,
    /// Deduplication hash for imported rows
    #[serde(default)]
    pub import_hash: Option<String>,
}

impl NewTransaction {
    /// Convenience constructor for a debit with a known timestamp
    pub fn expense(timestamp: NaiveDateTime, amount: f64, description: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp),
            amount,
            kind: TransactionKind::Debit,
            description: description.into(),
            payee: None,
            category: None,
            source: TransactionSource::Manual,
            import_hash: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Debit
    }

    /// Key used to match a purchase against earlier ones from the same merchant
    pub fn merchant_key(&self) -> String {
        normalize_merchant(self.payee.as_deref().unwrap_or(&self.description))
    }
}

/// A persisted, annotated transaction
///
/// Stored records are immutable; corrections are new records that point
/// back through `supersedes_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub timestamp: Option<NaiveDateTime>,
    pub amount: f64,
    pub kind: TransactionKind,
    pub description: String,
    pub payee: Option<String>,
    pub category: Option<String>,
    pub risk_flags: BTreeSet<RiskFlag>,
    pub guard_state: GuardState,
    pub risk_score: u8,
    pub source: TransactionSource,
    pub supersedes_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Debit
    }

    pub fn merchant_key(&self) -> String {
        normalize_merchant(self.payee.as_deref().unwrap_or(&self.description))
    }
}

/// Simple merchant name normalization
pub fn normalize_merchant(description: &str) -> String {
    description
        .to_uppercase()
        .replace(['*', '#'], " ")
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Totals shown by `nudge status` and `/api/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardStats {
    pub total_transactions: i64,
    pub flagged_transactions: i64,
    pub pending_confirmations: i64,
    pub night_purchases: i64,
    pub impulse_suspected: i64,
    pub unverified_timing: i64,
}
