//! SIGINT/SIGTERM handling

use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use ledgerline_core::shutdown_flag;

/// First signal raises the shutdown flag so the ingest loop can flush and
/// stop before its next page. A second signal exits immediately with 130.
pub fn install_handlers() -> Result<()> {
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: the handler only does an atomic swap and `_exit`
        // (signal_hook::low_level::exit), both async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    signal_hook::low_level::exit(130);
                }
            })
        }
        .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(())
}
