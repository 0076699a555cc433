//! Reports over stored transactions
//!
//! A decendio splits a month into three periods (1-10, 11-20, 21-end).
//! Cancelled purchases never happened, so they are left out of totals.
//!
//! The spending summary gives the headline figures for a date range: income,
//! expenses, savings rate and the expense share of each category.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{GuardState, RiskFlag, Transaction, TransactionKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecendioPeriod {
    /// "1 to 10", "11 to 20", "21 to 31", or "Total"
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecendioReport {
    pub year: i32,
    pub month: u32,
    pub periods: Vec<DecendioPeriod>,
    pub total: DecendioPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub flag: RiskFlag,
    pub count: usize,
    pub total_amount: f64,
}

/// Expenses of one category within a spending summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub amount: f64,
    /// Share of total expenses
    pub percentage: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    /// Net as a percentage of income (0 without income)
    pub savings_rate: f64,
    pub transaction_count: usize,
    /// Largest first
    pub categories: Vec<CategorySpending>,
}

/// Category name used for expenses without one
pub const UNCATEGORIZED: &str = "uncategorized";

/// First and last day of a month
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidData(format!("invalid month: {}-{:02}", year, month)))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| Error::InvalidData(format!("invalid month: {}-{:02}", year, month)))?;
    let last = next.pred_opt().unwrap_or(first);
    Ok((first, last))
}

/// Date a transaction counts towards: purchase date, else the day it was stored
pub fn effective_date(tx: &Transaction) -> NaiveDate {
    tx.timestamp
        .map(|ts| ts.date())
        .unwrap_or_else(|| tx.created_at.date_naive())
}

fn period_index(day: u32) -> usize {
    match day {
        1..=10 => 0,
        11..=20 => 1,
        _ => 2,
    }
}

fn empty_period(label: String, start: NaiveDate, end: NaiveDate) -> DecendioPeriod {
    DecendioPeriod {
        label,
        start,
        end,
        income: 0.0,
        expenses: 0.0,
        net: 0.0,
        transaction_count: 0,
    }
}

fn add(period: &mut DecendioPeriod, tx: &Transaction) {
    match tx.kind {
        TransactionKind::Credit => period.income += tx.amount,
        TransactionKind::Debit => period.expenses += tx.amount,
    }
    period.net = period.income - period.expenses;
    period.transaction_count += 1;
}

/// Income and expenses per decendio of a month
///
/// Transactions outside the month are ignored.
pub fn decendio_report(year: i32, month: u32, transactions: &[Transaction]) -> Result<DecendioReport> {
    let (first, last) = month_bounds(year, month)?;

    let mut periods: Vec<DecendioPeriod> = [(1, 10), (11, 20), (21, last.day())]
        .into_iter()
        .filter_map(|(start, end)| {
            let s = first.with_day(start)?;
            let e = first.with_day(end)?;
            Some(empty_period(format!("{} to {}", start, end), s, e))
        })
        .collect();
    let mut total = empty_period("Total".to_string(), first, last);

    for tx in transactions {
        if tx.guard_state == GuardState::Cancelled {
            continue;
        }
        let date = effective_date(tx);
        if date < first || date > last {
            continue;
        }
        if let Some(period) = periods.get_mut(period_index(date.day())) {
            add(period, tx);
        }
        add(&mut total, tx);
    }

    Ok(DecendioReport {
        year,
        month,
        periods,
        total,
    })
}

/// Count and amount per risk flag, one entry for every flag
pub fn flag_summary(transactions: &[Transaction]) -> Vec<FlagSummary> {
    let mut by_flag: BTreeMap<RiskFlag, (usize, f64)> = BTreeMap::new();
    for tx in transactions {
        for flag in &tx.risk_flags {
            let entry = by_flag.entry(*flag).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += tx.amount;
        }
    }

    RiskFlag::all()
        .iter()
        .map(|flag| {
            let (count, total_amount) = by_flag.get(flag).copied().unwrap_or((0, 0.0));
            FlagSummary {
                flag: *flag,
                count,
                total_amount,
            }
        })
        .collect()
}

/// Income, expenses, savings rate and per-category expenses
///
/// Transactions whose effective date falls outside `from..=to` are ignored.
pub fn spending_summary(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    transactions: &[Transaction],
) -> SpendingSummary {
    let mut income = 0.0;
    let mut expenses = 0.0;
    let mut transaction_count = 0;
    let mut by_category: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for tx in transactions {
        if tx.guard_state == GuardState::Cancelled {
            continue;
        }
        let date = effective_date(tx);
        if from.is_some_and(|f| date < f) || to.is_some_and(|t| date > t) {
            continue;
        }
        transaction_count += 1;
        match tx.kind {
            TransactionKind::Credit => income += tx.amount,
            TransactionKind::Debit => {
                expenses += tx.amount;
                let category = tx.category.as_deref().unwrap_or(UNCATEGORIZED);
                let entry = by_category.entry(category).or_insert((0.0, 0));
                entry.0 += tx.amount;
                entry.1 += 1;
            }
        }
    }

    let mut categories: Vec<CategorySpending> = by_category
        .into_iter()
        .map(|(category, (amount, count))| CategorySpending {
            category: category.to_string(),
            amount,
            percentage: if expenses > 0.0 {
                amount / expenses * 100.0
            } else {
                0.0
            },
            transaction_count: count,
        })
        .collect();
    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    let net = income - expenses;
    SpendingSummary {
        from,
        to,
        income,
        expenses,
        net,
        savings_rate: if income > 0.0 { net / income * 100.0 } else { 0.0 },
        transaction_count,
        categories,
    }
}
