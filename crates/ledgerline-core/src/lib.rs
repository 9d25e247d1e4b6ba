//! Ledgerline Core - paginated transfer ingestion
//!
//! This crate provides the pieces shared by every source and sink:
//! the record model, the [`Paginator`] that walks a paginated source,
//! the [`BatchAccumulator`] that flushes size-bounded batches, and the
//! [`run_ingest`] loop tying them together.

pub mod accumulator;
pub mod error;
pub mod http;
pub mod logging;
pub mod paginator;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod retry;
pub mod schema;
pub mod shutdown;
pub mod sink;
pub mod source;

#[cfg(test)]
mod testutil;

// Re-exports for convenience
pub use accumulator::{BatchAccumulator, DEFAULT_BATCH_SIZE};
pub use error::{FetchError, IngestError, SinkError};
pub use http::{HttpConfig, SHARED_RUNTIME, http_client, http_config, set_http_config};
pub use logging::{IndicatifLogger, init_logging};
pub use paginator::{Page, Paginator, PaginatorConfig, StopReason};
pub use pipeline::{IngestStats, run_ingest};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use record::{PageRequest, TransferFilter, TransferRecord};
pub use retry::{RetryPolicy, Retrying, retry_with_backoff};
pub use shutdown::{StopSignal, shutdown_flag};
pub use sink::{ParquetSink, Sink, cleanup_tmp_files};
pub use source::RecordSource;
