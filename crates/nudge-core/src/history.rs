//! Recent transaction history used by the guard
//!
//! The guard never owns history; it asks a [`TransactionHistory`] for the
//! purchases inside a time range. The database implements it for stored
//! transactions, and slices of [`HistoryEntry`] implement it for callers that
//! keep history in memory.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{normalize_merchant, NewTransaction, Transaction};

/// The parts of a past purchase the guard needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: NaiveDateTime,
    pub amount: f64,
    /// Normalized payee (see [`normalize_merchant`])
    pub merchant_key: String,
    pub category: Option<String>,
}

impl HistoryEntry {
    pub fn new(
        timestamp: NaiveDateTime,
        amount: f64,
        merchant: &str,
        category: Option<&str>,
    ) -> Self {
        Self {
            timestamp,
            amount,
            merchant_key: normalize_merchant(merchant),
            category: category.map(|c| c.to_string()),
        }
    }

    /// Same payee, or same category when both sides have one
    pub fn matches(&self, tx: &NewTransaction) -> bool {
        if self.merchant_key == tx.merchant_key() {
            return true;
        }
        match (&self.category, &tx.category) {
            (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
            _ => false,
        }
    }
}

impl TryFrom<&Transaction> for HistoryEntry {
    type Error = ();

    /// Only expenses with a timestamp can take part in history lookups
    fn try_from(tx: &Transaction) -> std::result::Result<Self, Self::Error> {
        match tx.timestamp {
            Some(timestamp) if tx.is_expense() => Ok(Self {
                timestamp,
                amount: tx.amount,
                merchant_key: tx.merchant_key(),
                category: tx.category.clone(),
            }),
            _ => Err(()),
        }
    }
}

/// Source of recent purchases
pub trait TransactionHistory {
    /// Expense entries with a timestamp in `[from, to)`
    fn entries_between(&self, from: NaiveDateTime, to: NaiveDateTime)
        -> Result<Vec<HistoryEntry>>;
}

impl TransactionHistory for [HistoryEntry] {
    fn entries_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .iter()
            .filter(|e| e.timestamp >= from && e.timestamp < to)
            .cloned()
            .collect())
    }
}

impl TransactionHistory for Vec<HistoryEntry> {
    fn entries_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<HistoryEntry>> {
        self.as_slice().entries_between(from, to)
    }
}

/// History that is always empty (first purchase ever, or no store attached)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl TransactionHistory for NoHistory {
    fn entries_between(&self, _: NaiveDateTime, _: NaiveDateTime) -> Result<Vec<HistoryEntry>> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_slice_history_is_half_open() {
        let history = vec![
            HistoryEntry::new(at(1, 10), 20.0, "Steam", Some("games")),
            HistoryEntry::new(at(5, 10), 20.0, "Steam", Some("games")),
            HistoryEntry::new(at(10, 10), 20.0, "Steam", Some("games")),
        ];
        let found = history.entries_between(at(1, 10), at(10, 10)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].timestamp, at(1, 10));
    }

    #[test]
    fn test_matches_on_payee() {
        let entry = HistoryEntry::new(at(1, 10), 20.0, "iFood *Pedido 991", None);
        let tx = NewTransaction::expense(at(2, 10), 150.0, "IFOOD PEDIDO 991");
        assert!(entry.matches(&tx));
    }

    #[test]
    fn test_matches_on_category_case_insensitive() {
        let entry = HistoryEntry::new(at(1, 10), 20.0, "Rappi", Some("Delivery"));
        let tx = NewTransaction::expense(at(2, 10), 150.0, "iFood").with_category("delivery");
        assert!(entry.matches(&tx));
    }

    #[test]
    fn test_no_match_when_category_missing_on_one_side() {
        let entry = HistoryEntry::new(at(1, 10), 20.0, "Rappi", None);
        let tx = NewTransaction::expense(at(2, 10), 150.0, "iFood").with_category("delivery");
        assert!(!entry.matches(&tx));
    }

    #[test]
    fn test_no_history_is_empty() {
        assert!(NoHistory.entries_between(at(1, 0), at(31, 0)).unwrap().is_empty());
    }
}
