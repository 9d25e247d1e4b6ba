//! Graceful shutdown via atomic flag, plus an optional run deadline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use crate::paginator::StopReason;

static FLAG: LazyLock<Arc<AtomicBool>> = LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// Global shutdown flag — set by SIGTERM/SIGINT handler
pub fn shutdown_flag() -> &'static Arc<AtomicBool> {
    &FLAG
}

/// External cancellation checked by the ingest loop before every page fetch
#[derive(Debug, Clone)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            deadline: None,
        }
    }

    /// Signal backed by the process-wide shutdown flag
    pub fn from_shutdown_flag() -> Self {
        Self::new(shutdown_flag().clone())
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// `Some(reason)` once the run must stop; the interrupt wins over the deadline
    pub fn check(&self) -> Option<StopReason> {
        if self.flag.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StopReason::Deadline),
            _ => None,
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_signal_is_quiet() {
        assert_eq!(StopSignal::default().check(), None);
    }

    #[test]
    fn raise_cancels() {
        let signal = StopSignal::default();
        let clone = signal.clone();
        clone.raise();
        assert_eq!(signal.check(), Some(StopReason::Cancelled));
    }

    #[test]
    fn past_deadline_stops() {
        let signal = StopSignal::default().with_deadline(Instant::now());
        assert_eq!(signal.check(), Some(StopReason::Deadline));

        let later = StopSignal::default().with_timeout(Duration::from_secs(3600));
        assert_eq!(later.check(), None);
    }

    #[test]
    fn interrupt_wins_over_deadline() {
        let signal = StopSignal::default().with_deadline(Instant::now());
        signal.raise();
        assert_eq!(signal.check(), Some(StopReason::Cancelled));
    }
}
