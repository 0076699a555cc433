//! Transaction command implementations (list, correct)

use anyhow::{Context, Result};
use chrono::Utc;
use nudge_core::{
    ingest::parse_timestamp, Database, Guard, KeywordCategorizer, NewTransaction, Pipeline,
    RiskFlag, TransactionQuery,
};

use super::{format_flags, truncate};

pub fn cmd_transactions_list(
    db: &Database,
    limit: i64,
    flag: Option<&str>,
    include_superseded: bool,
) -> Result<()> {
    let flag: Option<RiskFlag> = flag
        .map(|f| f.parse().map_err(|e: String| anyhow::anyhow!(e)))
        .transpose()?;

    let transactions = db.list_transactions(&TransactionQuery {
        flag,
        include_superseded,
        limit: Some(limit),
        ..Default::default()
    })?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<16} {:>10} {:<28} {:<12} {:<20} FLAGS",
        "ID", "WHEN", "AMOUNT", "DESCRIPTION", "CATEGORY", "STATE"
    );
    println!("{}", "-".repeat(110));

    for tx in &transactions {
        let when = tx
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        let amount = if tx.is_expense() {
            format!("-{:.2}", tx.amount)
        } else {
            format!("+{:.2}", tx.amount)
        };
        let id = match tx.supersedes_id {
            Some(_) => format!("{}*", tx.id),
            None => tx.id.to_string(),
        };
        println!(
            "{:<6} {:<16} {:>10} {:<28} {:<12} {:<20} {}",
            id,
            when,
            amount,
            truncate(&tx.description, 28),
            truncate(tx.category.as_deref().unwrap_or("-"), 12),
            tx.guard_state.as_str(),
            format_flags(&tx.risk_flags)
        );
    }

    println!();
    println!("Showing {} transactions (* = correction)", transactions.len());
    Ok(())
}

/// Fields to change in a correction; unset fields keep the original value
#[derive(Default)]
pub struct Correction {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub timestamp: Option<String>,
    pub category: Option<String>,
}

pub fn cmd_correct(db: &Database, guard: &Guard, id: i64, changes: Correction) -> Result<()> {
    let original = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", id))?;

    let timestamp = match changes.timestamp.as_deref() {
        Some(s) => Some(parse_timestamp(s).context("Invalid --timestamp")?),
        None => original.timestamp,
    };

    let tx = NewTransaction {
        timestamp,
        amount: changes.amount.unwrap_or(original.amount),
        kind: original.kind,
        description: changes.description.unwrap_or(original.description),
        payee: original.payee,
        category: changes
            .category
            .map(|c| c.trim().to_lowercase())
            .or(original.category),
        source: original.source,
        import_hash: None,
    };

    let protection = db.load_protection()?;
    let categorizer = KeywordCategorizer::new()?;
    let pipeline = Pipeline {
        db,
        guard,
        categorizer: &categorizer,
        protection: &protection,
    };
    let (new_id, evaluation) = pipeline.correct(id, tx, Utc::now())?;

    println!("✏️  Transaction #{} corrected by #{}", id, new_id);
    println!("   Flags: {}", format_flags(&evaluation.flags));
    if evaluation.is_pending() {
        println!("   ⏳ The corrected purchase is held for confirmation");
    }
    Ok(())
}
