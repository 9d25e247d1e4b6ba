//! Ingest loop: paginator → accumulator → sink

use std::time::{Duration, Instant};

use indicatif::ProgressBar;

use crate::accumulator::BatchAccumulator;
use crate::error::IngestError;
use crate::paginator::{Paginator, StopReason};
use crate::progress::{fmt_num, report_ingest};
use crate::shutdown::StopSignal;
use crate::sink::Sink;
use crate::source::RecordSource;

/// Log interval in pages (non-TTY progress)
const LOG_EVERY_PAGES: u32 = 100;

/// Statistics from one ingest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    /// Requests answered, including the final empty page
    pub pages: u32,
    pub rows_fetched: usize,
    pub rows_flushed: usize,
    pub batches: usize,
    pub stop: StopReason,
    pub elapsed: Duration,
}

impl IngestStats {
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows_flushed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        log::info!(
            "{}: {} rows in {} batches from {} pages [{:.1}s, {:.0} rows/s]",
            self.stop,
            fmt_num(self.rows_flushed),
            fmt_num(self.batches),
            fmt_num(self.pages as usize),
            self.elapsed.as_secs_f64(),
            self.rows_per_sec()
        );
    }
}

/// Drive pagination to the end, flushing through the accumulator.
///
/// `stop` is checked before every page request. When it fires, the partial
/// buffer is flushed (best effort) and the run ends with
/// [`StopReason::Cancelled`] or [`StopReason::Deadline`].
///
/// A fetch or flush error that arrives after `stop` fired (typically a
/// [`Retrying`](crate::Retrying) wrapper giving up) is treated as the stop.
///
/// On error the accumulator keeps every unflushed record; the caller may
/// spill [`BatchAccumulator::pending`] before exiting, or restart from
/// [`BatchAccumulator::first_pending_page`].
pub fn run_ingest<S: RecordSource, K: Sink>(
    pages: &mut Paginator<S>,
    acc: &mut BatchAccumulator<K>,
    stop: &StopSignal,
    pb: &ProgressBar,
) -> Result<IngestStats, IngestError> {
    let start = Instant::now();
    let (rows_before, batches_before) = (acc.rows_flushed(), acc.batches_flushed());
    let mut rows_fetched = 0usize;

    let reason = loop {
        if let Some(reason) = stop.check() {
            log::warn!(
                "{reason} before page {}, flushing {} buffered rows",
                pages.cursor(),
                acc.pending().len()
            );
            break reason;
        }
        let page = match pages.next() {
            Some(Ok(page)) => page,
            Some(Err(e)) => match stop.check() {
                // A retrying source gave up because of the stop
                Some(reason) => {
                    log::warn!(
                        "{reason} after error ({e}), flushing {} buffered rows",
                        acc.pending().len()
                    );
                    break reason;
                }
                None => return Err(e),
            },
            None => break pages.stop_reason().unwrap_or(StopReason::Exhausted),
        };

        rows_fetched += page.records.len();
        log::debug!("page {}: {} records", page.index, page.records.len());
        if let Err(source) = acc.append_page(page.index, page.records) {
            match stop.check() {
                Some(reason) => {
                    log::warn!("{reason} while flushing: {source}");
                    break reason;
                }
                None => {
                    return Err(IngestError::Flush {
                        rows: acc.pending().len(),
                        source,
                    });
                }
            }
        }

        let batches = acc.batches_flushed() - batches_before;
        report_ingest(pb, pages.cursor(), rows_fetched, batches);
        if page.index.wrapping_add(1) % LOG_EVERY_PAGES == 0 {
            log::info!(
                "page {}: {} rows fetched, {batches} batches flushed",
                page.index,
                fmt_num(rows_fetched)
            );
        }
    };

    acc.finish().map_err(|source| IngestError::Flush {
        rows: acc.pending().len(),
        source,
    })?;

    Ok(IngestStats {
        pages: pages.pages_fetched(),
        rows_fetched,
        rows_flushed: acc.rows_flushed() - rows_before,
        batches: acc.batches_flushed() - batches_before,
        stop: reason,
        elapsed: start.elapsed(),
    })
}
