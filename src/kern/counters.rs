//! Message Ring Event Counters
//!
//! Atomically updated counters for the interrupt and dispatch paths. These
//! are the only place most failures surface besides the log, so every drop
//! and every stray interrupt is counted.
//!
//! ## Counter Categories
//!
//! - **Interrupt**: fast interrupts taken, worker wakeups
//! - **Dispatch**: messages delivered, dropped, receive errors, passes
//! - **Global**: interrupts with no worker on the core

use core::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Counter Type
// ============================================================================

/// Named event counter
#[derive(Debug)]
pub struct MsgCounter {
    value: AtomicU64,
    name: &'static str,
}

impl MsgCounter {
    /// Create a new counter
    pub const fn new(name: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
        }
    }

    /// Increment counter by 1
    #[inline]
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment counter by n
    #[inline]
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current value
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero
    #[inline]
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }

    /// Get counter name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ============================================================================
// Global Counters
// ============================================================================

/// Message ring interrupts that arrived on a core with no worker
pub static C_MSGRING_BADINTR: MsgCounter = MsgCounter::new("msgring_badintr");

// ============================================================================
// Per-core Counters
// ============================================================================

/// Counters kept for each core's message station
#[derive(Debug)]
pub struct CoreCounters {
    /// Fast interrupts taken
    pub intr: MsgCounter,
    /// Worker wakeups issued by the fast path
    pub wakeups: MsgCounter,
    /// Messages handed to a registered handler
    pub delivered: MsgCounter,
    /// Messages dropped for lack of a handler
    pub dropped: MsgCounter,
    /// Receives that reported an error
    pub rx_errors: MsgCounter,
    /// Calls into the dispatch loop
    pub passes: MsgCounter,
}

impl CoreCounters {
    pub const fn new() -> Self {
        Self {
            intr: MsgCounter::new("msgring_nintr"),
            wakeups: MsgCounter::new("msgring_wakeups"),
            delivered: MsgCounter::new("msgring_delivered"),
            dropped: MsgCounter::new("msgring_dropped"),
            rx_errors: MsgCounter::new("msgring_rx_errors"),
            passes: MsgCounter::new("msgring_passes"),
        }
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            intr: self.intr.get(),
            wakeups: self.wakeups.get(),
            delivered: self.delivered.get(),
            dropped: self.dropped.get(),
            rx_errors: self.rx_errors.get(),
            passes: self.passes.get(),
        }
    }

    /// Reset every counter to zero
    pub fn reset(&self) {
        self.intr.reset();
        self.wakeups.reset();
        self.delivered.reset();
        self.dropped.reset();
        self.rx_errors.reset();
        self.passes.reset();
    }
}

impl Default for CoreCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a core's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub intr: u64,
    pub wakeups: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub rx_errors: u64,
    pub passes: u64,
}
