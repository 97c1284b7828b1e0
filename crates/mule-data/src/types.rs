//! Type definitions for ledger data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One validated ledger transaction.
///
/// Records are immutable once ingested. Their relative order is meaningful:
/// graph construction keeps the attributes of the *last* record seen for each
/// ordered `(sender, receiver)` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Ledger-assigned transaction identifier.
    pub transaction_id: String,
    /// Account the funds left.
    pub sender_id: String,
    /// Account the funds arrived at.
    pub receiver_id: String,
    /// Non-negative transferred amount.
    pub amount: f64,
    /// Instant the transaction was booked (UTC).
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Convenience constructor used by fixtures and callers that already hold
    /// validated values.
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            amount,
            timestamp,
        }
    }
}
