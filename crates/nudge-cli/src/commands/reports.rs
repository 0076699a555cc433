//! Report command implementations

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use nudge_core::Database;

use super::truncate;

/// Parse "YYYY-MM", defaulting to the current month
pub fn resolve_month(month: Option<&str>) -> Result<(i32, u32)> {
    match month {
        None => {
            let today = Local::now().date_naive();
            Ok((today.year(), today.month()))
        }
        Some(s) => {
            let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
                .with_context(|| format!("Invalid month '{}' (use YYYY-MM)", s))?;
            Ok((date.year(), date.month()))
        }
    }
}

pub fn parse_date_arg(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
        .transpose()
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", name))
}

pub fn cmd_report_decendio(db: &Database, year: i32, month: u32) -> Result<()> {
    let report = db.decendio_report(year, month)?;

    println!();
    println!("📅 Decendio report {}-{:02}", report.year, report.month);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<10} {:>12} {:>12} {:>12} {:>6}",
        "PERIOD", "INCOME", "EXPENSES", "NET", "TXS"
    );
    for period in report.periods.iter().chain(std::iter::once(&report.total)) {
        if period.label == "Total" {
            println!("   {}", "-".repeat(56));
        }
        println!(
            "   {:<10} {:>12.2} {:>12.2} {:>12.2} {:>6}",
            period.label, period.income, period.expenses, period.net, period.transaction_count
        );
    }
    println!();
    Ok(())
}

fn describe_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    match (from, to) {
        (Some(f), Some(t)) => format!("{} to {}", f, t),
        (Some(f), None) => format!("since {}", f),
        (None, Some(t)) => format!("until {}", t),
        (None, None) => "all time".to_string(),
    }
}

pub fn cmd_report_summary(
    db: &Database,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let summary = db.spending_summary(from, to)?;

    println!();
    println!("📌 Financial summary ({})", describe_range(from, to));
    println!("   ─────────────────────────────────────────────");
    println!("   Income:        {:>12.2}", summary.income);
    println!("   Expenses:      {:>12.2}", summary.expenses);
    println!("   Net:           {:>12.2}", summary.net);
    println!("   Savings rate:  {:>11.1}%", summary.savings_rate);

    if !summary.categories.is_empty() {
        println!();
        println!("   {:<24} {:>12} {:>7} {:>6}", "CATEGORY", "AMOUNT", "%", "TXS");
        for entry in &summary.categories {
            println!(
                "   {:<24} {:>12.2} {:>6.1}% {:>6}",
                truncate(&entry.category, 24),
                entry.amount,
                entry.percentage,
                entry.transaction_count
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_report_flags(
    db: &Database,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let summary = db.flag_summary(from, to)?;
    let range = describe_range(from, to);

    println!();
    println!("🚩 Flag summary ({})", range);
    println!("   ─────────────────────────────────────────────────────");
    println!("   {:<32} {:>6} {:>12}", "FLAG", "COUNT", "AMOUNT");
    for entry in &summary {
        println!(
            "   {:<32} {:>6} {:>12.2}",
            entry.flag.as_str(),
            entry.count,
            entry.total_amount
        );
    }
    println!();
    Ok(())
}
