//! Protection switch commands

use anyhow::Result;
use chrono::{Local, Utc};
use nudge_core::guard::MAX_BYPASS_MINUTES;
use nudge_core::{Database, Guard};

pub fn cmd_protection_status(db: &Database, guard: &Guard) -> Result<()> {
    let state = db.load_protection()?;
    let status = state.status(Utc::now(), guard.config());

    println!();
    println!("🛡️  Protection");
    println!("   ─────────────────────────────");
    if !status.enabled {
        println!("   Status: OFF");
    } else if let Some(until) = status.bypass_until {
        println!(
            "   Status: BYPASSED until {}",
            until.with_timezone(&Local).format("%H:%M")
        );
    } else {
        println!("   Status: ON");
    }
    println!(
        "   Night window: {} - {}{}",
        status.night_start,
        status.night_end,
        if status.is_night_period { " (now)" } else { "" }
    );
    println!("   Amount threshold: {:.2}", status.amount_threshold);
    println!(
        "   Confirmation delay: {} min",
        guard.config().confirmation_delay.num_minutes()
    );
    println!();
    Ok(())
}

pub fn cmd_protection_enable(db: &Database) -> Result<()> {
    let mut state = db.load_protection()?;
    state.enable();
    db.save_protection(&state, "protection_enable")?;
    println!("🛡️  Protection enabled");
    Ok(())
}

pub fn cmd_protection_disable(db: &Database) -> Result<()> {
    let mut state = db.load_protection()?;
    state.disable();
    db.save_protection(&state, "protection_disable")?;
    println!("⚠️  Protection disabled. Purchases will be flagged but never held.");
    println!("   Turn it back on with 'nudge protection enable'");
    Ok(())
}

pub fn cmd_protection_bypass(db: &Database, minutes: i64) -> Result<()> {
    if !(1..=MAX_BYPASS_MINUTES).contains(&minutes) {
        anyhow::bail!("--minutes must be between 1 and {}", MAX_BYPASS_MINUTES);
    }
    let mut state = db.load_protection()?;
    let until = state.temporary_bypass(Utc::now(), minutes);
    db.save_protection(&state, "protection_bypass")?;
    println!(
        "⏸️  Protection bypassed for {} minutes (until {})",
        minutes,
        until.with_timezone(&Local).format("%H:%M")
    );
    Ok(())
}
