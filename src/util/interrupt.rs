//! Ctrl-C handling.
//!
//! relay does not die on SIGINT. The handler only records the interrupt;
//! the process runner forwards it to whatever child is in flight and the
//! step is reported as interrupted.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide Ctrl-C handler. Call once from `main`.
pub fn install_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
    })
    .context("failed to install the Ctrl-C handler")
}

/// The flag set by the handler, for code that watches it while waiting.
pub fn flag() -> &'static AtomicBool {
    &INTERRUPTED
}
