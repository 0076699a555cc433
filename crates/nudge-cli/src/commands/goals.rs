//! Savings goal commands

use anyhow::Result;
use nudge_core::{Database, Goal, GoalStatus};

use super::truncate;

pub fn cmd_goals_add(db: &Database, name: &str, target: f64, current: f64) -> Result<()> {
    let mut goal = Goal::new(name, target);
    goal.current_amount = current;
    let id = db.add_goal(&goal)?;
    println!("🎯 Added goal #{}: {} ({:.2})", id, name.trim(), target);
    Ok(())
}

pub fn cmd_goals_list(db: &Database, all: bool) -> Result<()> {
    let status = (!all).then_some(GoalStatus::Active);
    let goals = db.list_goals(status)?;
    if goals.is_empty() {
        println!("No goals. Add one with 'nudge goals add'.");
        return Ok(());
    }

    println!(
        "{:<6} {:<28} {:>12} {:>12} {:>6}  STATUS",
        "ID", "NAME", "SAVED", "TARGET", "%"
    );
    println!("{}", "-".repeat(78));
    for saved in &goals {
        let goal = &saved.goal;
        println!(
            "{:<6} {:<28} {:>12.2} {:>12.2} {:>5.0}%  {}",
            saved.id,
            truncate(&goal.name, 28),
            goal.current_amount,
            goal.target_amount,
            goal.progress_percent(),
            goal.status.as_str()
        );
    }
    Ok(())
}

pub fn cmd_goals_progress(db: &Database, id: i64, saved_amount: f64) -> Result<()> {
    let saved = db.update_goal_progress(id, saved_amount)?;
    let goal = &saved.goal;
    if goal.status == GoalStatus::Completed {
        println!("🎉 Goal '{}' reached!", goal.name);
    } else {
        println!(
            "🎯 '{}' is at {:.0}% ({:.2} left)",
            goal.name,
            goal.progress_percent(),
            goal.remaining().max(0.0)
        );
    }
    Ok(())
}

pub fn cmd_goals_status(db: &Database, id: i64, status: &str) -> Result<()> {
    let status: GoalStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let saved = db.set_goal_status(id, status)?;
    println!("🎯 '{}' is now {}", saved.goal.name, status.as_str());
    Ok(())
}

pub fn cmd_goals_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_goal(id)?;
    println!("🗑️  Deleted goal #{}", id);
    Ok(())
}
