//! Retry with exponential backoff for sources and sinks.
//!
//! The ingest core never retries on its own. Wrapping a source or sink in
//! [`Retrying`] opts into retries for transient errors only.

use std::time::{Duration, Instant};

use crate::error::{FetchError, SinkError};
use crate::http::http_config;
use crate::paginator::StopReason;
use crate::record::{PageRequest, TransferRecord};
use crate::shutdown::StopSignal;
use crate::sink::Sink;
use crate::source::RecordSource;

/// Errors that know whether another attempt could succeed
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }
}

impl Retryable for SinkError {
    fn is_retryable(&self) -> bool {
        SinkError::is_retryable(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Fail on the first error
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Policy from the global [`HttpConfig`](crate::http::HttpConfig)
    pub fn from_http_config() -> Self {
        let config = http_config();
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base,
        }
    }

    /// Exponential backoff: base, 2·base, 4·base, ... for attempt 1, 2, 3, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Longest uninterrupted sleep while waiting out a backoff
const STOP_POLL: Duration = Duration::from_millis(100);

/// Retry a fallible operation with exponential backoff.
///
/// Returns the first `Ok`, or the final `Err` on exhaustion / non-retryable error.
/// When `stop` fires, no further attempt is made and the last error is returned.
pub fn retry_with_backoff<T, E: Retryable>(
    label: &str,
    policy: RetryPolicy,
    stop: Option<&StopSignal>,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                log::warn!(
                    "{label}: attempt {attempt}/{} failed: {e}, retrying in {delay:?}",
                    policy.max_retries
                );
                if let Some(reason) = stop.and_then(|s| sleep_unless_stopped(delay, s)) {
                    log::warn!("{label}: {reason}, not retrying");
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sleep for `delay` in short slices; `Some(reason)` if `stop` fired first
fn sleep_unless_stopped(delay: Duration, stop: &StopSignal) -> Option<StopReason> {
    let end = Instant::now() + delay;
    loop {
        if let Some(reason) = stop.check() {
            return Some(reason);
        }
        let now = Instant::now();
        if now >= end {
            return None;
        }
        std::thread::sleep((end - now).min(STOP_POLL));
    }
}

/// Source or sink decorator that retries transient failures.
///
/// Retried flushes may write a batch twice; sinks tolerate duplicates.
#[derive(Debug)]
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
    stop: Option<StopSignal>,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            stop: None,
        }
    }

    /// Give up retrying (and backing off) once `stop` fires
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<S: RecordSource> RecordSource for Retrying<S> {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<TransferRecord>, FetchError> {
        let inner = &mut self.inner;
        retry_with_backoff(
            &format!("page {}", request.page),
            self.policy,
            self.stop.as_ref(),
            || inner.fetch_page(request),
        )
    }
}

impl<K: Sink> Sink for Retrying<K> {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        let inner = &mut self.inner;
        retry_with_backoff(
            &format!("flush of {} rows", batch.len()),
            self.policy,
            self.stop.as_ref(),
            || inner.flush(batch),
        )
    }
}
