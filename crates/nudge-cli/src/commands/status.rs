//! Status and audit log commands

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use nudge_core::{config::load_config, db::DB_KEY_ENV, Database};

use super::{open_db, truncate};

pub fn cmd_status(db_path: &Path, config_path: Option<&Path>, no_encrypt: bool) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Nudge Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    match load_config(config_path) {
        Ok(config) => println!(
            "   Guard: night {}-{}, threshold {:.2}, delay {} min",
            config.night_start.format("%H:%M"),
            config.night_end.format("%H:%M"),
            config.impulse_threshold,
            config.confirmation_delay.num_minutes()
        ),
        Err(e) => println!("   ❌ Guard config: {}", e),
    }

    // Try to open the database and show stats
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => print_stats(&db)?,
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

fn print_stats(db: &Database) -> Result<()> {
    let stats = db.get_guard_stats()?;
    let protection = db.load_protection()?;

    println!();
    println!(
        "   Protection: {}",
        if protection.is_active(Utc::now()) {
            "ON"
        } else if protection.is_enabled() {
            "BYPASSED"
        } else {
            "OFF"
        }
    );
    println!("   Transactions: {}", stats.total_transactions);
    println!("   Flagged: {}", stats.flagged_transactions);
    println!("   Waiting for confirmation: {}", stats.pending_confirmations);
    println!("   🌙 Night purchases: {}", stats.night_purchases);
    println!("   ⚡ Impulse suspected: {}", stats.impulse_suspected);
    println!("   ❓ Unverified timing: {}", stats.unverified_timing);
    Ok(())
}

pub fn cmd_audit(db: &Database, limit: i64) -> Result<()> {
    let entries = db.list_audit_log(limit)?;
    if entries.is_empty() {
        println!("Audit log is empty.");
        return Ok(());
    }

    println!("{:<20} {:<20} {:<14} DETAILS", "WHEN", "ACTION", "ENTITY");
    println!("{}", "-".repeat(80));
    for entry in &entries {
        let entity = match (&entry.entity_type, entry.entity_id) {
            (Some(t), Some(id)) => format!("{} #{}", t, id),
            (Some(t), None) => t.clone(),
            _ => "-".to_string(),
        };
        println!(
            "{:<20} {:<20} {:<14} {}",
            entry.timestamp,
            entry.action,
            truncate(&entity, 14),
            entry.details.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
