//! Pending confirmation commands (pending, confirm, cancel, release)

use anyhow::Result;
use chrono::{Local, Utc};
use nudge_core::{Database, PendingConfirmation};

use super::{format_flags, truncate};

fn describe(db: &Database, pending: &PendingConfirmation) -> Result<String> {
    Ok(match db.get_transaction(pending.transaction_id)? {
        Some(tx) => format!("{:.2} {}", tx.amount, truncate(&tx.description, 30)),
        None => format!("transaction #{}", pending.transaction_id),
    })
}

pub fn cmd_pending(db: &Database) -> Result<()> {
    let now = Utc::now();

    // Finalize anything whose delay ran out since the last command
    let released = db.release_due(now)?;
    if !released.is_empty() {
        println!("✅ {} purchase(s) finalized after their delay", released.len());
        println!();
    }

    let pending = db.list_pending()?;
    if pending.is_empty() {
        println!("No purchases waiting for confirmation.");
        return Ok(());
    }

    println!("⏳ Waiting for confirmation");
    println!("   ─────────────────────────────────────────────────────────────");
    for p in &pending {
        let tx = db.get_transaction(p.transaction_id)?;
        let (amount, description, flags) = match &tx {
            Some(tx) => (
                tx.amount,
                truncate(&tx.description, 28),
                format_flags(&tx.risk_flags),
            ),
            None => (0.0, "?".to_string(), "-".to_string()),
        };
        let remaining = p.remaining(now);
        println!(
            "   [{:>3}] {:>10.2}  {:<28} releases {} ({}m{:02}s)",
            p.id,
            amount,
            description,
            p.release_at.with_timezone(&Local).format("%H:%M:%S"),
            remaining.num_minutes(),
            remaining.num_seconds() % 60
        );
        println!("         {}", flags);
    }

    println!();
    println!("Confirm with 'nudge confirm <id>' or cancel with 'nudge cancel <id>'");
    Ok(())
}

pub fn cmd_confirm(db: &Database, id: i64) -> Result<()> {
    let pending = db.confirm_pending(id, Utc::now())?;
    println!("✅ Confirmed {}", describe(db, &pending)?);
    Ok(())
}

pub fn cmd_cancel(db: &Database, id: i64) -> Result<()> {
    let pending = db.cancel_pending(id, Utc::now())?;
    println!("🛑 Cancelled {}", describe(db, &pending)?);
    println!("   The record is kept for history but no longer counts as spending.");
    Ok(())
}

pub fn cmd_release(db: &Database) -> Result<()> {
    let released = db.release_due(Utc::now())?;
    if released.is_empty() {
        println!("Nothing to release.");
        return Ok(());
    }

    println!("✅ Released {} purchase(s):", released.len());
    for p in &released {
        println!("   [{:>3}] {}", p.id, describe(db, p)?);
    }
    Ok(())
}
