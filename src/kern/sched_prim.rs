//! Scheduling Primitives - Interrupt Thread Wait/Wakeup
//!
//! The message ring needs three things from the kernel scheduler: create a
//! thread bound to a cpu, park that thread until the interrupt path wakes
//! it, and wake it again. The `Scheduler` trait is that seam; the kernel
//! provides the real implementation, `HostScheduler` (feature `std`) maps it
//! onto OS threads.

use alloc::boxed::Box;

use crate::error::MsgringError;
use crate::types::{CpuId, ThreadId};

// ============================================================================
// Wait Results
// ============================================================================

/// Result of a wait operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WaitResult {
    /// Thread was awakened normally
    Normal = 0,
    /// Thread was awakened abnormally (clear wait, shutdown)
    Abnormal = 1,
    /// Thread was interrupted
    Interrupted = 2,
}

// ============================================================================
// Scheduler Interface
// ============================================================================

/// Body of a newly created kernel thread; receives its own thread id
pub type ThreadEntry = Box<dyn FnOnce(ThreadId) + Send + 'static>;

/// Kernel scheduler operations used by the interrupt thread hand-off
pub trait Scheduler: Send + Sync {
    /// Create a thread bound to `cpu` at interrupt-thread priority and make
    /// it runnable.
    fn spawn_bound(&self, name: &str, cpu: CpuId, entry: ThreadEntry)
        -> Result<ThreadId, MsgringError>;

    /// Park `thread` until `wake_intr` is called for it.
    ///
    /// `pending` is evaluated under the scheduler's thread lock before
    /// parking; if it returns true the call returns immediately. A wakeup
    /// racing with the check is never lost.
    fn await_intr(&self, thread: ThreadId, pending: &dyn Fn() -> bool) -> WaitResult;

    /// Make `thread` runnable if it is parked in `await_intr`.
    ///
    /// Returns true only if the thread was parked. Must not block for long
    /// or allocate: it runs from the fast interrupt path.
    fn wake_intr(&self, thread: ThreadId) -> bool;

    /// Hook the fast interrupt path up to `irq`
    fn establish_intr(&self, irq: u32) -> Result<(), MsgringError> {
        let _ = irq;
        Ok(())
    }
}
