//! Per-core message ring interrupt thread
//!
//! The fast interrupt path and the worker thread share one descriptor per
//! core. The only shared state on the steady-state path is `pending`:
//!
//! - the fast path bumps it with release ordering after masking the ring
//!   interrupt
//! - the worker reads it with acquire ordering, drains, then clears exactly
//!   the value it read; if the fast path bumped it again meanwhile the
//!   clear fails and the worker drains again before unmasking
//!
//! `draining` is claimed with a compare-exchange for the whole run, so a
//! second caller on the same core backs off instead of draining alongside
//! the worker. The worker re-checks `pending` before parking, so work
//! raised while another caller held the claim is not lost.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::types::{CoreId, CpuId, ThreadId};

/// Observable state of a core's interrupt thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IthreadState {
    /// Nothing pending, interrupt unmasked (or about to be)
    Idle,
    /// Fast path fired, worker not yet draining
    InterruptPending,
    /// Worker inside the dispatch loop
    Draining,
}

/// Interrupt thread descriptor
#[derive(Debug)]
pub struct MsgringThread {
    thread: ThreadId,
    cpu: CpuId,
    core: CoreId,
    pending: AtomicU32,
    draining: AtomicBool,
}

impl MsgringThread {
    pub fn new(thread: ThreadId, cpu: CpuId, core: CoreId) -> Self {
        Self {
            thread,
            cpu,
            core,
            pending: AtomicU32::new(0),
            draining: AtomicBool::new(false),
        }
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    pub fn core(&self) -> CoreId {
        self.core
    }

    /// Mark work pending; called from the fast interrupt path
    ///
    /// Returns true if nothing was pending before.
    pub fn raise(&self) -> bool {
        self.pending.fetch_add(1, Ordering::Release) == 0
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) != 0
    }

    pub fn state(&self) -> IthreadState {
        if self.draining.load(Ordering::Acquire) {
            IthreadState::Draining
        } else if self.is_pending() {
            IthreadState::InterruptPending
        } else {
            IthreadState::Idle
        }
    }

    /// Run `drain` until no interrupt is pending, calling `rearm` after
    /// each pass that cleared the flag
    ///
    /// Returns the number of drain passes made; 0 when another caller is
    /// already draining this core.
    pub fn run_pending<D, A>(&self, mut drain: D, mut rearm: A) -> usize
    where
        D: FnMut(),
        A: FnMut(),
    {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return 0;
        }

        let mut passes = 0;
        loop {
            let seen = self.pending.load(Ordering::Acquire);
            if seen == 0 {
                break;
            }

            drain();
            passes += 1;

            if self
                .pending
                .compare_exchange(seen, 0, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                rearm();
            }
        }
        self.draining.store(false, Ordering::Release);
        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    fn descriptor() -> MsgringThread {
        MsgringThread::new(ThreadId(7), CpuId(4), CoreId(1))
    }

    #[test]
    fn test_idle_to_pending() {
        let ithd = descriptor();
        assert_eq!(ithd.state(), IthreadState::Idle);
        assert!(ithd.raise());
        assert!(!ithd.raise());
        assert_eq!(ithd.state(), IthreadState::InterruptPending);
    }

    #[test]
    fn test_run_pending_clears_and_rearms() {
        let ithd = descriptor();
        ithd.raise();
        let rearmed = Cell::new(0);
        let passes = ithd.run_pending(|| {}, || rearmed.set(rearmed.get() + 1));
        assert_eq!(passes, 1);
        assert_eq!(rearmed.get(), 1);
        assert_eq!(ithd.state(), IthreadState::Idle);
    }

    #[test]
    fn test_nothing_pending_no_pass() {
        let ithd = descriptor();
        let passes = ithd.run_pending(|| panic!("drained"), || panic!("rearmed"));
        assert_eq!(passes, 0);
    }

    #[test]
    fn test_raise_while_draining_reruns() {
        let ithd = descriptor();
        ithd.raise();
        let calls = Cell::new(0);
        let rearmed = Cell::new(0);
        let passes = ithd.run_pending(
            || {
                assert_eq!(ithd.state(), IthreadState::Draining);
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    ithd.raise();
                }
            },
            || rearmed.set(rearmed.get() + 1),
        );
        assert_eq!(passes, 2);
        // The first pass could not clear the flag, so only the second
        // re-enabled the interrupt
        assert_eq!(rearmed.get(), 1);
        assert!(!ithd.is_pending());
    }

    #[test]
    fn test_second_runner_backs_off() {
        let ithd = descriptor();
        ithd.raise();
        let inner = Cell::new(usize::MAX);
        let calls = Cell::new(0);
        let passes = ithd.run_pending(
            || {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    // Another caller tries to drain the same core mid-pass
                    ithd.raise();
                    inner.set(ithd.run_pending(|| panic!("nested drain"), || {}));
                }
            },
            || {},
        );
        assert_eq!(inner.get(), 0);
        // The raise made during the first pass is picked up by the owner
        assert_eq!(passes, 2);
        assert_eq!(ithd.state(), IthreadState::Idle);
    }
}
