//! Size-bounded batch accumulator in front of a [`Sink`]

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::error::SinkError;
use crate::record::TransferRecord;
use crate::sink::Sink;

/// Default maximum batch size (records per sink write).
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Buffers records and hands them to the sink in batches of at most
/// `max_batch` records, in arrival order.
///
/// A failed flush leaves the buffer untouched. Nothing is retried here;
/// the caller decides whether to abort, spill [`pending`](Self::pending),
/// or keep going.
pub struct BatchAccumulator<S> {
    sink: S,
    buffer: Vec<TransferRecord>,
    /// Origin of buffered rows, oldest first: (source page, row count)
    origins: VecDeque<(Option<u32>, usize)>,
    max_batch: usize,
    batches_flushed: usize,
    rows_flushed: usize,
}

impl<S: std::fmt::Debug> std::fmt::Debug for BatchAccumulator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchAccumulator")
            .field("sink", &self.sink)
            .field("buffered", &self.buffer.len())
            .field("max_batch", &self.max_batch)
            .field("batches_flushed", &self.batches_flushed)
            .finish_non_exhaustive()
    }
}

impl<S: Sink> BatchAccumulator<S> {
    pub fn new(sink: S, max_batch: NonZeroUsize) -> Self {
        let max_batch = max_batch.get();
        Self {
            sink,
            // Cap the upfront allocation, large batches grow on demand
            buffer: Vec::with_capacity(max_batch.min(DEFAULT_BATCH_SIZE)),
            origins: VecDeque::new(),
            max_batch,
            batches_flushed: 0,
            rows_flushed: 0,
        }
    }

    /// Add a record; flush synchronously once the buffer reaches `max_batch`
    pub fn append(&mut self, record: TransferRecord) -> Result<(), SinkError> {
        self.buffer.push(record);
        self.note_origin(None, 1);
        if self.buffer.len() >= self.max_batch {
            self.flush_full()?;
        }
        Ok(())
    }

    /// Add a whole page, then flush every full batch it completes.
    ///
    /// Batches match what per-record [`append`](Self::append) would produce,
    /// but on a failed flush the rest of the page is already buffered.
    pub fn append_all(
        &mut self,
        records: impl IntoIterator<Item = TransferRecord>,
    ) -> Result<(), SinkError> {
        let before = self.buffer.len();
        self.buffer.extend(records);
        self.note_origin(None, self.buffer.len() - before);
        self.flush_full()
    }

    /// [`append_all`](Self::append_all) for the records of source page `page`,
    /// remembered for [`first_pending_page`](Self::first_pending_page)
    pub fn append_page(
        &mut self,
        page: u32,
        records: impl IntoIterator<Item = TransferRecord>,
    ) -> Result<(), SinkError> {
        let before = self.buffer.len();
        self.buffer.extend(records);
        self.note_origin(Some(page), self.buffer.len() - before);
        self.flush_full()
    }

    /// Flush the remainder once the stream is exhausted.
    ///
    /// No sink call is made for an empty buffer.
    pub fn finish(&mut self) -> Result<(), SinkError> {
        self.flush_full()?;
        if !self.buffer.is_empty() {
            self.sink.flush(&self.buffer)?;
            self.record_flush(self.buffer.len());
            self.buffer.clear();
            self.origins.clear();
        }
        Ok(())
    }

    /// Flush leading `max_batch` chunks.
    ///
    /// More than one chunk is only present when the caller kept appending
    /// after a failed flush.
    fn flush_full(&mut self) -> Result<(), SinkError> {
        while self.buffer.len() >= self.max_batch {
            self.sink.flush(&self.buffer[..self.max_batch])?;
            self.record_flush(self.max_batch);
            self.buffer.drain(..self.max_batch);
        }
        Ok(())
    }

    fn note_origin(&mut self, page: Option<u32>, rows: usize) {
        if rows == 0 {
            return;
        }
        match self.origins.back_mut() {
            Some((last, count)) if *last == page => *count += rows,
            _ => self.origins.push_back((page, rows)),
        }
    }

    fn record_flush(&mut self, rows: usize) {
        let mut left = rows;
        while left > 0 {
            let Some(front) = self.origins.front_mut() else {
                break;
            };
            let taken = front.1.min(left);
            front.1 -= taken;
            left -= taken;
            if front.1 == 0 {
                self.origins.pop_front();
            }
        }
        self.batches_flushed += 1;
        self.rows_flushed += rows;
        log::debug!("flushed batch #{} ({rows} rows)", self.batches_flushed);
    }

    /// Records appended but not yet flushed
    pub fn pending(&self) -> &[TransferRecord] {
        &self.buffer
    }

    /// Hand the unflushed records to the caller, leaving the buffer empty
    pub fn take_pending(&mut self) -> Vec<TransferRecord> {
        self.origins.clear();
        std::mem::take(&mut self.buffer)
    }

    /// Source page of the oldest unflushed record appended via
    /// [`append_page`](Self::append_page)
    pub fn first_pending_page(&self) -> Option<u32> {
        self.origins.iter().find_map(|&(page, _)| page)
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    pub fn batches_flushed(&self) -> usize {
        self.batches_flushed
    }

    pub fn rows_flushed(&self) -> usize {
        self.rows_flushed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
