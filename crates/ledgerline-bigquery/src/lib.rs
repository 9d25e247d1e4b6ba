//! Ledgerline BigQuery - streaming-insert sink
//!
//! Each flushed batch becomes one `tabledata.insertAll` request.

pub mod insert;
pub mod sink;

// Re-exports
pub use insert::{InsertAllRequest, InsertAllResponse, InsertError, InsertRow, rejection_summary};
pub use sink::{BigQueryConfig, BigQuerySink, DEFAULT_ENDPOINT};
