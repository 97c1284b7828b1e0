//! Shared test helpers and ledger fixtures.
//!
//! Every fixture is built as CSV text so integration tests exercise the same
//! ingestion path as real ledgers.

#![allow(dead_code)]

use mule_data::ingest::read_transactions;
use mule_data::types::TransactionRecord;

/// CSV header accepted by the ingestion layer.
pub const HEADER: &str = "transaction_id,sender_id,receiver_id,amount,timestamp";

/// Builds a ledger CSV from `(sender, receiver, hours_after_start)` rows.
///
/// Transaction ids are `TX0001`, `TX0002`, … in row order, amounts are a
/// fixed 250.00 and hours are offsets from 2024-02-22 00:00:00.
///
/// # Example
/// ```ignore
/// let csv = ledger_csv(&[("A", "B", 0), ("B", "C", 1)]);
/// ```
pub fn ledger_csv(rows: &[(&str, &str, i64)]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (i, (from, to, hours)) in rows.iter().enumerate() {
        let day = 22 + hours / 24;
        let hour = hours % 24;
        out.push_str(&format!(
            "TX{:04},{from},{to},250.00,2024-02-{day:02} {hour:02}:00:00\n",
            i + 1
        ));
    }
    out
}

/// Parses a CSV fixture into validated records.
///
/// # Panics
/// Panics if the fixture itself is malformed.
pub fn ledger(rows: &[(&str, &str, i64)]) -> Vec<TransactionRecord> {
    read_transactions(ledger_csv(rows).as_bytes()).expect("fixture ledger should parse")
}

/// Triangle `A→B→C→A`.
pub fn triangle() -> Vec<(&'static str, &'static str, i64)> {
    vec![("A", "B", 0), ("B", "C", 1), ("C", "A", 2)]
}

/// Ten distinct senders paying `receiver` one hour apart.
pub fn fan_in_rows(receiver: &'static str) -> Vec<(&'static str, &'static str, i64)> {
    const SENDERS: [&str; 10] = [
        "SM01", "SM02", "SM03", "SM04", "SM05", "SM06", "SM07", "SM08", "SM09", "SM10",
    ];
    SENDERS
        .iter()
        .enumerate()
        .map(|(i, sender)| (*sender, receiver, i as i64))
        .collect()
}

/// Layered chain `S→I1→I2→I3→T`, each intermediary with degree 2.
pub fn shell_chain() -> Vec<(&'static str, &'static str, i64)> {
    vec![
        ("S", "I1", 0),
        ("I1", "I2", 1),
        ("I2", "I3", 2),
        ("I3", "T", 3),
    ]
}
