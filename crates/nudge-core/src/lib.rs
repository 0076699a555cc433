//! Nudge Core Library
//!
//! Behavioral spending guard for personal finances:
//! - Guard rules for night, impulse and high-risk purchases
//! - Risk scoring and confirmation delays
//! - Reflective interventions (questions, goal impact, alternatives)
//! - CSV/JSON ingestion for statement and receipt exports
//! - Keyword categorization behind a pluggable trait
//! - Append-only storage with audit log, alerts and savings goals
//! - Decendio, spending summary and flag reports

pub mod categorize;
pub mod config;
pub mod confirmation;
pub mod db;
pub mod error;
pub mod guard;
pub mod history;
pub mod ingest;
pub mod intervention;
pub mod models;
pub mod pipeline;
pub mod reports;

pub use categorize::{Categorizer, KeywordCategorizer};
pub use config::{load_config, GuardConfig};
pub use confirmation::{PendingConfirmation, Resolution};
pub use db::{Alert, AuditEntry, Database, SavedGoal, TransactionInsertResult, TransactionQuery};
pub use error::{Error, Result};
pub use guard::{evaluate, Evaluation, Guard, ProtectionState, ProtectionStatus, Rule};
pub use history::{HistoryEntry, NoHistory, TransactionHistory};
pub use ingest::{IngestReport, Ingestor, RowError, SignConvention};
pub use intervention::{Goal, GoalStatus, Intervention, InterventionEngine, InterventionLevel};
pub use models::{
    GuardState, NewTransaction, RequiredAction, RiskFlag, Transaction, TransactionKind,
    TransactionSource,
};
pub use pipeline::{process_batch, BatchReport, Pipeline, Processed, ProcessedTransaction};
pub use reports::{CategorySpending, DecendioPeriod, DecendioReport, FlagSummary, SpendingSummary};
