//! mule-data crate
//!
//! Transaction ledger types and CSV ingestion. Everything handed to
//! `mule-analysis` has already passed schema validation here.

pub mod ingest;
pub mod types;

pub use ingest::{load_transactions, read_transactions, SchemaError};
pub use types::TransactionRecord;
