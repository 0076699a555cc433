//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `alerts` - Alerts raised for flagged purchases
//! - `core` - Shared utilities (open_db, load_guard) and init/config
//! - `import` - Import and single-purchase evaluation
//! - `transactions` - Listing and corrections
//! - `confirmations` - Pending purchases (list, confirm, cancel, release)
//! - `goals` - Savings goals used by interventions
//! - `protection` - Protection switch
//! - `reports` - Decendio, spending summary and flag reports
//! - `serve` - Web server command
//! - `status` - Status and audit log

pub mod alerts;
pub mod confirmations;
pub mod core;
pub mod goals;
pub mod import;
pub mod protection;
pub mod reports;
pub mod serve;
pub mod status;
pub mod transactions;

// Re-export command functions for main.rs
pub use alerts::*;
pub use confirmations::*;
pub use core::*;
pub use goals::*;
pub use import::*;
pub use protection::*;
pub use reports::*;
pub use serve::*;
pub use status::*;
pub use transactions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Comma-separated flag names, or "-" when there are none
pub fn format_flags<'a, I>(flags: I) -> String
where
    I: IntoIterator<Item = &'a nudge_core::RiskFlag>,
{
    let names: Vec<&str> = flags.into_iter().map(|f| f.as_str()).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
