//! Cooperative cancellation and progress counters for a running simplification
//!
//! A [`RunControl`] is shared between the thread running the simplifier and any
//! observer. The simplifier polls the cancellation flag between iterations and
//! publishes its counters; it never blocks on the control.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ControlState {
    cancelled: AtomicBool,
    iterations: AtomicUsize,
    collapses: AtomicUsize,
}

/// Handle for cancelling and observing a simplification run
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    state: Arc<ControlState>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop at the next iteration boundary
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Relaxed)
    }

    /// Candidate selections performed so far
    pub fn iterations(&self) -> usize {
        self.state.iterations.load(Ordering::Relaxed)
    }

    /// Edge collapses performed so far
    pub fn collapses(&self) -> usize {
        self.state.collapses.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, iterations: usize, collapses: usize) {
        self.state.iterations.store(iterations, Ordering::Relaxed);
        self.state.collapses.store(collapses, Ordering::Relaxed);
    }
}
