//! # Cooperative Cancellation (§5)
//!
//! A pollable, `Send + Sync` cancellation flag the fixpoint driver checks
//! between strata, between iterations within a stratum, and between rules
//! within an iteration. Grounded on the split between a caller-held trigger
//! and a driver-held poll handle used for query timeouts elsewhere in the
//! corpus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle a caller can clone and hold on another thread to cancel an
/// in-progress evaluation. Cancelling is a one-way latch: once set, it
/// cannot be unset.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
