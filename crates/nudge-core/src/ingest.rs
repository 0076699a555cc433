//! Transaction ingestion from CSV and JSON exports
//!
//! Both formats carry the same columns:
//!
//! ```text
//! timestamp,amount,description,payee,category,kind
//! 2024-01-15 02:13,-150.00,STEAM PURCHASE,Steam,games,
//! ```
//!
//! Only `amount` and `description` are required. A row that fails to parse is
//! reported in [`IngestReport::errors`] and the rest of the file continues.
//!
//! Only timed statement rows (`TransactionSource::Import`) carry an import
//! hash, so re-importing the same statement is idempotent. Receipts and
//! manual entries are never deduplicated: two identical coffees are two
//! purchases, and each one goes through the guard.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionKind, TransactionSource};

/// How a source encodes direction in the amount sign
///
/// Fixed per source and applied at ingest; stored amounts are always
/// non-negative. An explicit `kind` column wins over the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Bank statements: negative amounts are expenses
    NegativeIsDebit,
    /// Card statements and receipts: positive amounts are purchases
    PositiveIsDebit,
}

impl SignConvention {
    /// Convention used when the caller does not pick one
    pub fn for_source(source: TransactionSource) -> Self {
        match source {
            TransactionSource::Import => Self::NegativeIsDebit,
            TransactionSource::Receipt
            | TransactionSource::Manual
            | TransactionSource::Correction => Self::PositiveIsDebit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NegativeIsDebit => "negative_is_debit",
            Self::PositiveIsDebit => "positive_is_debit",
        }
    }

    /// Split a signed amount into magnitude and direction
    pub fn apply(&self, signed: f64) -> (f64, TransactionKind) {
        let kind = match self {
            Self::NegativeIsDebit if signed < 0.0 => TransactionKind::Debit,
            Self::NegativeIsDebit => TransactionKind::Credit,
            Self::PositiveIsDebit if signed < 0.0 => TransactionKind::Credit,
            Self::PositiveIsDebit => TransactionKind::Debit,
        };
        (signed.abs(), kind)
    }
}

impl std::str::FromStr for SignConvention {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "negative_is_debit" | "negative" | "statement" => Ok(Self::NegativeIsDebit),
            "positive_is_debit" | "positive" | "card" | "receipt" => Ok(Self::PositiveIsDebit),
            _ => Err(format!("Unknown sign convention: {}", s)),
        }
    }
}

/// A row that could not be ingested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based record number (header not counted)
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: Vec<NewTransaction>,
    pub errors: Vec<RowError>,
}

impl IngestReport {
    /// Give repeated rows of one statement distinct hashes
    ///
    /// The n-th identical row gets the n-th hash, so the same statement
    /// imported twice still lines up row for row.
    fn number_repeats(&mut self) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for tx in &mut self.accepted {
            if let Some(hash) = tx.import_hash.take() {
                let count = seen.entry(hash.clone()).or_insert(0);
                tx.import_hash = Some(if *count == 0 {
                    hash
                } else {
                    format!("{}-{}", hash, count)
                });
                *count += 1;
            }
        }
    }

    fn reject(&mut self, row: usize, err: impl std::fmt::Display) {
        warn!(row, error = %err, "Skipping unreadable record");
        self.errors.push(RowError {
            row,
            message: err.to_string(),
        });
    }
}

/// Numeric or textual amount ("R$ 1.234,56")
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    timestamp: Option<String>,
    amount: RawAmount,
    description: String,
    #[serde(default)]
    payee: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Record parser bound to one source
#[derive(Debug, Clone, Copy)]
pub struct Ingestor {
    source: TransactionSource,
    sign: SignConvention,
}

impl Ingestor {
    pub fn new(source: TransactionSource) -> Self {
        Self {
            source,
            sign: SignConvention::for_source(source),
        }
    }

    pub fn with_sign(mut self, sign: SignConvention) -> Self {
        self.sign = sign;
        self
    }

    pub fn source(&self) -> TransactionSource {
        self.source
    }

    pub fn sign(&self) -> SignConvention {
        self.sign
    }

    /// Parse a CSV export with a header row
    pub fn parse_csv<R: Read>(&self, reader: R) -> Result<IngestReport> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        // Normalize header case so "Amount" and "amount" both work
        let headers = rdr.headers()?.clone();
        let lowered: csv::StringRecord = headers.iter().map(|h| h.to_lowercase()).collect();
        rdr.set_headers(lowered);

        let mut report = IngestReport::default();
        for (i, result) in rdr.deserialize::<RawRecord>().enumerate() {
            let row = i + 1;
            match result
                .map_err(Error::from)
                .and_then(|raw| self.normalize(raw))
            {
                Ok(tx) => report.accepted.push(tx),
                Err(e) => report.reject(row, e),
            }
        }
        report.number_repeats();

        debug!(
            source = self.source.as_str(),
            accepted = report.accepted.len(),
            errors = report.errors.len(),
            "Parsed CSV records"
        );
        Ok(report)
    }

    /// Parse a JSON array of records, or an object with a `transactions` array
    pub fn parse_json<R: Read>(&self, reader: R) -> Result<IngestReport> {
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        self.parse_value(value)
    }

    /// Same as [`Ingestor::parse_json`] for an already-decoded document
    pub fn parse_value(&self, value: serde_json::Value) -> Result<IngestReport> {
        let items = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("transactions") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(Error::Import(
                        "expected a JSON array or an object with a 'transactions' array".into(),
                    ))
                }
            },
            _ => return Err(Error::Import("expected a JSON array of records".into())),
        };

        let mut report = IngestReport::default();
        for (i, item) in items.into_iter().enumerate() {
            let row = i + 1;
            match self.parse_record(item) {
                Ok(tx) => report.accepted.push(tx),
                Err(e) => report.reject(row, e),
            }
        }
        report.number_repeats();

        debug!(
            source = self.source.as_str(),
            accepted = report.accepted.len(),
            errors = report.errors.len(),
            "Parsed JSON records"
        );
        Ok(report)
    }

    /// Parse a single JSON record
    pub fn parse_record(&self, value: serde_json::Value) -> Result<NewTransaction> {
        let raw: RawRecord = serde_json::from_value(value)?;
        self.normalize(raw)
    }

    /// Parse a file, picking the format from its extension
    pub fn parse_file(&self, path: &Path) -> Result<IngestReport> {
        let file = File::open(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        let report = match ext.as_deref() {
            Some("json") => self.parse_json(file)?,
            Some("csv") | None => self.parse_csv(file)?,
            Some(other) => {
                return Err(Error::Import(format!(
                    "unsupported file type '.{}' (expected .csv or .json)",
                    other
                )))
            }
        };

        info!(
            path = %path.display(),
            accepted = report.accepted.len(),
            errors = report.errors.len(),
            "Ingested file"
        );
        Ok(report)
    }

    fn normalize(&self, raw: RawRecord) -> Result<NewTransaction> {
        let description = raw.description.trim().to_string();
        if description.is_empty() {
            return Err(Error::Import("Missing description".into()));
        }

        let signed = match raw.amount {
            RawAmount::Number(n) => n,
            RawAmount::Text(s) => parse_amount(&s)?,
        };
        if !signed.is_finite() {
            return Err(Error::Import(format!("Invalid amount: {}", signed)));
        }

        let (amount, kind) = match non_empty(raw.kind) {
            Some(k) => {
                let kind = k.parse::<TransactionKind>().map_err(Error::Import)?;
                (signed.abs(), kind)
            }
            None => self.sign.apply(signed),
        };

        let timestamp = match non_empty(raw.timestamp) {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        };

        let import_hash = match (self.source, timestamp) {
            (TransactionSource::Import, Some(ts)) => {
                Some(generate_hash(ts, &description, amount, kind))
            }
            _ => None,
        };

        Ok(NewTransaction {
            timestamp,
            amount,
            kind,
            description,
            payee: non_empty(raw.payee),
            category: non_empty(raw.category).map(|c| c.to_lowercase()),
            source: self.source,
            import_hash,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Generate a hash for deduplication
fn generate_hash(
    timestamp: NaiveDateTime,
    description: &str,
    amount: f64,
    kind: TransactionKind,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(kind.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a purchase timestamp
///
/// RFC 3339 values keep their wall-clock time (the offset is dropped), since
/// the night window applies to the time the purchase was made locally.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S", // 2024-01-15 02:13:45
        "%Y-%m-%d %H:%M",    // 2024-01-15 02:13
        "%Y-%m-%dT%H:%M:%S", // 2024-01-15T02:13:45
        "%Y-%m-%dT%H:%M",    // 2024-01-15T02:13
        "%d/%m/%Y %H:%M:%S", // 15/01/2024 02:13:45
        "%d/%m/%Y %H:%M",    // 15/01/2024 02:13
    ];

    for fmt in formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }

    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDate::parse_from_str(s, "%d/%m/%Y").is_ok()
    {
        return Err(Error::Import(format!(
            "Timestamp has no time of day: {} (leave it empty if the time is unknown)",
            s
        )));
    }

    Err(Error::Import(format!("Unable to parse timestamp: {}", s)))
}

/// Parse an amount string, handling currency symbols and both decimal styles
///
/// `1,234.56`, `1.234,56` and `12,50` are all accepted; parentheses mean
/// negative. A lone comma followed by exactly three digits (`1,234`) is a
/// thousands separator, as is any comma in `1,234,567`.
pub fn parse_amount(s: &str) -> Result<f64> {
    let mut cleaned: String = s
        .trim()
        .replace("R$", "")
        .replace(['$', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Comma is the decimal separator
        (Some(c), Some(d)) if c > d => cleaned = cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned = cleaned.replace(',', ""),
        (Some(c), None) => {
            let tail = &cleaned[c + 1..];
            let grouped = cleaned.matches(',').count() > 1
                || (tail.len() == 3 && tail.chars().all(|ch| ch.is_ascii_digit()));
            cleaned = if grouped {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            };
        }
        _ => {}
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}
