//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Nudge - Pause before the purchases you regret
#[derive(Parser)]
#[command(name = "nudge")]
#[command(about = "Behavioral spending guard for personal finances", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "nudge.db", global = true)]
    pub db: PathBuf,

    /// Guard config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set NUDGE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from a CSV or JSON export
    Import {
        /// File to import (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Where the records come from: import, receipt, manual
        #[arg(short, long, default_value = "import")]
        source: String,

        /// Amount sign convention: negative-is-debit or positive-is-debit
        /// (defaults to the usual convention for the source)
        #[arg(long)]
        sign: Option<String>,
    },

    /// Evaluate a single purchase
    Evaluate {
        /// Amount of the purchase
        #[arg(short, long)]
        amount: f64,

        /// Description or merchant
        #[arg(short, long)]
        description: String,

        /// Purchase time (YYYY-MM-DD HH:MM[:SS] or RFC 3339); omit if unknown
        #[arg(short, long)]
        timestamp: Option<String>,

        /// Category (auto-detected if omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Payee, if different from the description
        #[arg(long)]
        payee: Option<String>,

        /// Record the purchase after evaluating it
        #[arg(long)]
        store: bool,

        /// Print the evaluation as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored transactions
    Transactions {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Only transactions with this flag (e.g. night_purchase)
        #[arg(long)]
        flag: Option<String>,

        /// Include records replaced by a correction
        #[arg(long)]
        all: bool,
    },

    /// Record a correction for a stored transaction
    Correct {
        /// Transaction ID to correct
        id: i64,

        /// Corrected amount
        #[arg(short, long)]
        amount: Option<f64>,

        /// Corrected description
        #[arg(short, long)]
        description: Option<String>,

        /// Corrected purchase time
        #[arg(short, long)]
        timestamp: Option<String>,

        /// Corrected category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List purchases waiting for confirmation
    Pending,

    /// Confirm a pending purchase
    Confirm {
        /// Confirmation ID
        id: i64,
    },

    /// Cancel a pending purchase
    Cancel {
        /// Confirmation ID
        id: i64,
    },

    /// Finalize pending purchases whose delay has elapsed
    Release,

    /// Show or change the protection switch
    Protection {
        #[command(subcommand)]
        action: Option<ProtectionAction>,
    },

    /// Manage savings goals shown in interventions
    Goals {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// List or acknowledge alerts for flagged purchases
    Alerts {
        #[command(subcommand)]
        action: Option<AlertAction>,
    },

    /// Generate reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Show the effective guard configuration
    Config {
        /// Print the override file location instead
        #[arg(long)]
        path: bool,
    },

    /// Show database and guard status
    Status,

    /// Show recent audit log entries
    Audit {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum ProtectionAction {
    /// Show protection status
    Status,
    /// Turn protection on (also ends any bypass)
    Enable,
    /// Turn protection off until enabled again
    Disable,
    /// Suspend protection for a while
    Bypass {
        /// Minutes to suspend protection
        #[arg(short, long, default_value = "30")]
        minutes: i64,
    },
}

#[derive(Subcommand)]
pub enum GoalAction {
    /// Add a goal
    Add {
        /// Goal name
        name: String,

        /// Amount to save
        #[arg(short, long)]
        target: f64,

        /// Amount already saved
        #[arg(short, long, default_value = "0")]
        current: f64,
    },
    /// List goals
    List {
        /// Include paused and completed goals
        #[arg(long)]
        all: bool,
    },
    /// Record how much has been saved so far
    Progress {
        /// Goal ID
        id: i64,

        /// Total saved towards the goal
        #[arg(short, long)]
        saved: f64,
    },
    /// Change a goal's status (active, paused, completed)
    Status {
        /// Goal ID
        id: i64,

        /// New status
        status: String,
    },
    /// Delete a goal
    Delete {
        /// Goal ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum AlertAction {
    /// List alerts (unacknowledged only by default)
    List {
        /// Include acknowledged alerts
        #[arg(long)]
        all: bool,
    },
    /// Acknowledge an alert
    Ack {
        /// Alert ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Income and expenses per ten-day period of a month
    Decendio {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Income, expenses, savings rate and expenses per category
    Summary {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Flag counts and amounts
    Flags {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}
