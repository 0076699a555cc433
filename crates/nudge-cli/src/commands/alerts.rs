//! Alert commands

use anyhow::Result;
use chrono::{Local, Utc};
use nudge_core::Database;

use super::{format_flags, truncate};

pub fn cmd_alerts_list(db: &Database, all: bool) -> Result<()> {
    let alerts = db.list_alerts(all)?;
    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    println!("{:<6} {:<17} {:>5}  {:<48} FLAGS", "ID", "WHEN", "SCORE", "MESSAGE");
    println!("{}", "-".repeat(100));
    for alert in &alerts {
        let marker = if alert.is_acknowledged() { " " } else { "*" };
        println!(
            "{:<6} {:<17} {:>5}  {:<48} {}{}",
            alert.id,
            alert
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            alert.risk_score,
            truncate(&alert.message, 48),
            format_flags(&alert.flags),
            marker
        );
    }
    if !all {
        println!();
        println!("Acknowledge with 'nudge alerts ack <ID>'.");
    }
    Ok(())
}

pub fn cmd_alerts_ack(db: &Database, id: i64) -> Result<()> {
    let alert = db.acknowledge_alert(id, Utc::now())?;
    println!("✓ Acknowledged alert #{}: {}", alert.id, alert.message);
    Ok(())
}
