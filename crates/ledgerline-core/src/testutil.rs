//! In-memory source and sink doubles shared by unit tests

use std::collections::VecDeque;

use crate::error::{FetchError, SinkError};
use crate::record::{PageRequest, TransferRecord};
use crate::sink::Sink;
use crate::source::RecordSource;

pub fn record(i: u64) -> TransferRecord {
    TransferRecord {
        extrinsic_index: format!("{i}-1"),
        block_num: i,
        block_timestamp: 1_600_000_000 + i as i64,
        from: "alice".to_string(),
        to: "bob".to_string(),
        amount: format!("{i}.000000000001"),
        success: true,
    }
}

pub fn records(range: std::ops::Range<u64>) -> Vec<TransferRecord> {
    range.map(record).collect()
}

/// Serves scripted responses in order, then empty pages forever
#[derive(Default)]
pub struct ScriptedSource {
    responses: VecDeque<Result<Vec<TransferRecord>, FetchError>>,
    pub requests: Vec<PageRequest>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<Vec<TransferRecord>, FetchError>>) -> Self {
        Self {
            responses: responses.into(),
            requests: Vec::new(),
        }
    }

    /// `n` records split into full pages of `page_size`, then an empty page
    pub fn paged(n: u64, page_size: u64) -> Self {
        let all = records(0..n);
        let pages = all
            .chunks(page_size as usize)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Self::new(pages)
    }
}

impl RecordSource for ScriptedSource {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<TransferRecord>, FetchError> {
        self.requests.push(request.clone());
        self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Records every flushed batch; fails the calls listed in `fail_on`
#[derive(Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<TransferRecord>>,
    pub calls: usize,
    pub fail_on: Vec<usize>,
}

impl MemorySink {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Default::default()
        }
    }

    pub fn flattened(&self) -> Vec<TransferRecord> {
        self.batches.iter().flatten().cloned().collect()
    }
}

impl Sink for MemorySink {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(SinkError::Transport {
                status: Some(503),
                message: "backend unavailable".to_string(),
            });
        }
        self.batches.push(batch.to_vec());
        Ok(())
    }
}
