//! CSV ingestion and schema validation for transaction ledgers.
//!
//! The expected header carries (at least) the columns
//! `transaction_id, sender_id, receiver_id, amount, timestamp` in any order.
//! Extra columns are ignored. Rows are returned in file order because the
//! graph builder's edge-collapse rule depends on it.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::TransactionRecord;

/// Columns every ledger must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "transaction_id",
    "sender_id",
    "receiver_id",
    "amount",
    "timestamp",
];

/// Naive layouts tried after RFC 3339. Naive values are read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Ledger rejected before it reaches the detection engine.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Header lacks one or more required columns.
    #[error("CSV schema mismatch: missing columns {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A required cell is empty.
    #[error("row {row}: missing value for `{field}`")]
    MissingField { row: usize, field: &'static str },

    /// Timestamp is not in any accepted layout.
    #[error("row {row}: unparsable timestamp `{value}`")]
    InvalidTimestamp { row: usize, value: String },

    /// Amount is not a finite, non-negative number.
    #[error("row {row}: invalid amount `{value}`")]
    InvalidAmount { row: usize, value: String },

    #[error("failed to read ledger: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Column positions resolved from the header row.
struct ColumnMap {
    transaction_id: usize,
    sender_id: usize,
    receiver_id: usize,
    amount: usize,
    timestamp: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, SchemaError> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        // All five are present past this point.
        let resolve = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            transaction_id: resolve("transaction_id"),
            sender_id: resolve("sender_id"),
            receiver_id: resolve("receiver_id"),
            amount: resolve("amount"),
            timestamp: resolve("timestamp"),
        })
    }
}

/// Load and validate a ledger from a CSV file on disk.
///
/// # Errors
///
/// Returns [`SchemaError`] if the file cannot be opened or any row fails
/// validation. No partial ledger is ever returned.
pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<TransactionRecord>, SchemaError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let records = read_transactions(file)?;
    info!(path = %path.display(), rows = records.len(), "ledger loaded");
    Ok(records)
}

/// Parse and validate a ledger from any CSV byte stream.
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<TransactionRecord>, SchemaError> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let columns = ColumnMap::from_headers(csv_reader.headers()?)?;

    let mut out = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row?;
        out.push(parse_row(&row, &columns, idx + 1)?);
    }

    debug!(rows = out.len(), "ledger rows validated");
    Ok(out)
}

fn parse_row(
    row: &StringRecord,
    columns: &ColumnMap,
    row_number: usize,
) -> Result<TransactionRecord, SchemaError> {
    let field = |pos: usize, name: &'static str| -> Result<&str, SchemaError> {
        match row.get(pos) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(SchemaError::MissingField {
                row: row_number,
                field: name,
            }),
        }
    };

    let transaction_id = field(columns.transaction_id, "transaction_id")?;
    let sender_id = field(columns.sender_id, "sender_id")?;
    let receiver_id = field(columns.receiver_id, "receiver_id")?;
    let raw_amount = field(columns.amount, "amount")?;
    let raw_timestamp = field(columns.timestamp, "timestamp")?;

    let amount = match raw_amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => {
            return Err(SchemaError::InvalidAmount {
                row: row_number,
                value: raw_amount.to_string(),
            })
        }
    };

    let timestamp =
        parse_timestamp(raw_timestamp).ok_or_else(|| SchemaError::InvalidTimestamp {
            row: row_number,
            value: raw_timestamp.to_string(),
        })?;

    Ok(TransactionRecord::new(
        transaction_id,
        sender_id,
        receiver_id,
        amount,
        timestamp,
    ))
}

/// Parse an ISO-8601-ish timestamp into UTC.
///
/// Offsets are honoured when present; naive values and bare dates are taken
/// as UTC (bare dates at midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
