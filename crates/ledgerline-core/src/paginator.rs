//! Page-by-page walk over a [`RecordSource`]

use std::num::NonZeroU32;

use crate::error::{FetchError, IngestError};
use crate::record::{PageRequest, TransferFilter, TransferRecord};
use crate::source::RecordSource;

/// Why a run stopped requesting pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned an empty page or no `transfers` field
    Exhausted,
    /// `max_rows` records were emitted
    RowBudget,
    /// `max_pages` pages were fetched
    PageLimit,
    /// Operator interrupt
    Cancelled,
    /// Run deadline passed
    Deadline,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exhausted => "source exhausted",
            Self::RowBudget => "row budget reached",
            Self::PageLimit => "page limit reached",
            Self::Cancelled => "cancelled",
            Self::Deadline => "deadline reached",
        })
    }
}

#[derive(Debug, Clone)]
pub struct PaginatorConfig {
    /// Rows per page, constant for the run
    pub page_size: NonZeroU32,
    pub filter: TransferFilter,
    pub start_page: u32,
    pub max_pages: Option<u32>,
    pub max_rows: Option<usize>,
}

impl PaginatorConfig {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            page_size,
            filter: TransferFilter::default(),
            start_page: 0,
            max_pages: None,
            max_rows: None,
        }
    }
}

/// One non-empty page of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: u32,
    pub records: Vec<TransferRecord>,
}

/// Lazily fetches pages, one request per [`next`](Iterator::next) call.
///
/// Yields `Err` at most once; the iterator is fused afterwards.
pub struct Paginator<S> {
    source: S,
    config: PaginatorConfig,
    cursor: u32,
    pages_fetched: u32,
    rows_emitted: usize,
    stopped: Option<StopReason>,
    failed: bool,
}

impl<S: RecordSource> Paginator<S> {
    pub fn new(source: S, config: PaginatorConfig) -> Self {
        let cursor = config.start_page;
        Self {
            source,
            config,
            cursor,
            pages_fetched: 0,
            rows_emitted: 0,
            stopped: None,
            failed: false,
        }
    }

    /// Issue one request for `page_index` with the configured size and filters
    pub fn fetch_page(&mut self, page_index: u32) -> Result<Vec<TransferRecord>, FetchError> {
        let request = PageRequest {
            row: self.config.page_size.get(),
            page: page_index,
            filter: self.config.filter.clone(),
        };
        self.source.fetch_page(&request)
    }

    fn stop(&mut self, reason: StopReason) {
        log::debug!("pagination stopped at page {}: {reason}", self.cursor);
        self.stopped = Some(reason);
    }

    fn budget_left(&self) -> Option<usize> {
        self.config
            .max_rows
            .map(|max| max.saturating_sub(self.rows_emitted))
    }

    fn next_page(&mut self) -> Option<Result<Page, IngestError>> {
        if self.stopped.is_some() || self.failed {
            return None;
        }
        if self
            .config
            .max_pages
            .is_some_and(|max| self.pages_fetched >= max)
        {
            self.stop(StopReason::PageLimit);
            return None;
        }
        if self.budget_left() == Some(0) {
            self.stop(StopReason::RowBudget);
            return None;
        }

        let index = self.cursor;
        let mut records = match self.fetch_page(index) {
            Ok(records) => records,
            Err(source) => {
                self.failed = true;
                return Some(Err(IngestError::Fetch {
                    page: index,
                    source,
                }));
            }
        };
        self.pages_fetched += 1;

        if records.is_empty() {
            self.stop(StopReason::Exhausted);
            return None;
        }
        match index.checked_add(1) {
            Some(next) => self.cursor = next,
            None => {
                log::warn!("page index {index} is the last addressable page");
                self.stop(StopReason::Exhausted);
            }
        }

        if let Some(left) = self.budget_left() {
            if records.len() >= left {
                records.truncate(left);
                self.rows_emitted += records.len();
                self.stop(StopReason::RowBudget);
                return Some(Ok(Page { index, records }));
            }
        }
        self.rows_emitted += records.len();
        Some(Ok(Page { index, records }))
    }

    /// Set once pagination ended without error
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Index of the next page to request
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Requests that returned a response, including the final empty one
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn rows_emitted(&self) -> usize {
        self.rows_emitted
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: RecordSource> Iterator for Paginator<S> {
    type Item = Result<Page, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page()
    }
}

impl<S: RecordSource> std::iter::FusedIterator for Paginator<S> {}
