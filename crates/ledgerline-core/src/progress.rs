//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: an indicatif spinner line per ingest run.
//! Non-TTY mode: hidden bars, periodic log lines carry progress instead.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Create a spinner status line for an ingest run.
    ///
    /// Update with [`report_ingest`] as pages arrive.
    /// Non-TTY: hidden (no-op).
    pub fn ingest_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:<12.cyan.bold} [{elapsed_precise}] {wide_msg}",
            )
            .expect("invalid template"),
        );
        // Truncate long names to keep lines aligned
        let display = if name.len() > 12 { &name[..12] } else { name };
        pb.set_prefix(display.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Render the ingest counters onto a spinner line
pub fn report_ingest(pb: &ProgressBar, page: u32, rows: usize, batches: usize) {
    pb.set_message(format!(
        "page {} · {} rows · {} batches flushed",
        fmt_num(page as usize),
        fmt_num(rows),
        fmt_num(batches)
    ));
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
