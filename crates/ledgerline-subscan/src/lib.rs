//! Ledgerline Subscan - transfer source for Subscan-indexed chains
//!
//! Walks `/api/scan/transfers` for one network and decodes each page
//! into [`TransferRecord`](ledgerline_core::TransferRecord)s.

pub mod client;
pub mod decode;

// Re-exports
pub use client::{DEFAULT_NETWORK, SubscanSource, transfers_endpoint};
pub use decode::{TransfersPage, decode_page};
