//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_guard` - Load and validate the guard configuration
//! - `cmd_init` - Initialize the database
//! - `cmd_config` - Show the effective configuration

use std::path::Path;

use anyhow::{Context, Result};
use nudge_core::config::{default_config_path, load_config};
use nudge_core::{Database, Guard};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the guard config; a malformed config stops the command
pub fn load_guard(config_path: Option<&Path>) -> Result<Guard> {
    let config = load_config(config_path).context("Invalid guard configuration")?;
    Guard::new(config).context("Invalid guard configuration")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let protection = db.load_protection()?;
    println!(
        "   Protection: {}",
        if protection.is_enabled() { "ON" } else { "OFF" }
    );

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: nudge import --file statement.csv");
    println!("  2. Review held purchases: nudge pending");
    println!("  3. Start web API: nudge serve");

    Ok(())
}

pub fn cmd_config(config_path: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        match default_config_path() {
            Some(path) => {
                let marker = if path.exists() { "" } else { " (not present)" };
                println!("{}{}", path.display(), marker);
            }
            None => println!("(no data directory on this platform)"),
        }
        return Ok(());
    }

    let config = load_config(config_path).context("Invalid guard configuration")?;
    let rendered =
        toml::to_string_pretty(&config.to_file()).context("Failed to render configuration")?;

    println!("# Effective guard configuration");
    println!();
    print!("{}", rendered);
    Ok(())
}
