//! Report queries

use chrono::NaiveDate;

use super::transactions::TransactionQuery;
use super::Database;
use crate::error::Result;
use crate::reports::{self, DecendioReport, FlagSummary, SpendingSummary};

impl Database {
    /// Decendio report for a month
    pub fn decendio_report(&self, year: i32, month: u32) -> Result<DecendioReport> {
        let (first, last) = reports::month_bounds(year, month)?;
        let transactions = self.list_transactions(&TransactionQuery {
            from: Some(first),
            to: Some(last),
            ..Default::default()
        })?;
        reports::decendio_report(year, month, &transactions)
    }

    /// Flag counts and amounts over an optional date range (inclusive)
    pub fn flag_summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<FlagSummary>> {
        let transactions = self.list_transactions(&TransactionQuery {
            from,
            to,
            ..Default::default()
        })?;
        Ok(reports::flag_summary(&transactions))
    }

    /// Income, expenses, savings rate and per-category expenses over an
    /// optional date range (inclusive)
    pub fn spending_summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<SpendingSummary> {
        let transactions = self.list_transactions(&TransactionQuery {
            from,
            to,
            ..Default::default()
        })?;
        Ok(reports::spending_summary(from, to, &transactions))
    }
}
