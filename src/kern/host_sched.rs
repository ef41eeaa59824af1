//! Hosted scheduler backed by OS threads
//!
//! Each kernel thread is a `std::thread` with a wait record guarded by a
//! mutex and condition variable. The mutex plays the role of the kernel's
//! thread lock: the pending check in `await_intr` and the parked flag
//! tested by `wake_intr` are both done under it, so no wakeup is lost.
//! Cpu binding is recorded but not enforced.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::vec::Vec;

use crate::error::MsgringError;
use crate::kern::sched_prim::{Scheduler, ThreadEntry, WaitResult};
use crate::types::{CpuId, ThreadId};

#[derive(Debug, Default)]
struct WaitState {
    awaiting: bool,
    shutdown: bool,
    wakeups: u64,
}

#[derive(Debug)]
struct HostThread {
    cpu: CpuId,
    state: Mutex<WaitState>,
    cv: Condvar,
}

impl HostThread {
    fn lock(&self) -> MutexGuard<'_, WaitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scheduler for hosted builds, tests and the simulator
#[derive(Debug, Default)]
pub struct HostScheduler {
    threads: Mutex<BTreeMap<ThreadId, Arc<HostThread>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    irqs: Mutex<Vec<u32>>,
}

impl HostScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn thread(&self, id: ThreadId) -> Option<Arc<HostThread>> {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Cpu the thread was bound to
    pub fn cpu_of(&self, id: ThreadId) -> Option<CpuId> {
        self.thread(id).map(|t| t.cpu)
    }

    /// Is the thread currently parked in `await_intr`?
    pub fn is_parked(&self, id: ThreadId) -> bool {
        self.thread(id).is_some_and(|t| t.lock().awaiting)
    }

    /// Wakeups delivered to the thread so far
    pub fn wakeups(&self, id: ThreadId) -> u64 {
        self.thread(id).map_or(0, |t| t.lock().wakeups)
    }

    /// Number of threads created
    pub fn thread_count(&self) -> usize {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Interrupts established through `establish_intr`
    pub fn established_irqs(&self) -> Vec<u32> {
        self.irqs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear every wait abnormally and join the threads
    pub fn shutdown(&self) {
        let threads: Vec<Arc<HostThread>> = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for thread in threads {
            let mut st = thread.lock();
            st.shutdown = true;
            st.awaiting = false;
            thread.cv.notify_all();
        }

        let handles: Vec<JoinHandle<()>> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("interrupt thread panicked");
            }
        }
    }
}

impl Scheduler for HostScheduler {
    fn spawn_bound(
        &self,
        name: &str,
        cpu: CpuId,
        entry: ThreadEntry,
    ) -> Result<ThreadId, MsgringError> {
        let id = ThreadId::new();
        let record = Arc::new(HostThread {
            cpu,
            state: Mutex::new(WaitState::default()),
            cv: Condvar::new(),
        });
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record);

        let spawned = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || entry(id));
        match spawned {
            Ok(handle) => {
                self.handles
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle);
                log::debug!("created {} bound to {}", name, cpu);
                Ok(id)
            }
            Err(err) => {
                log::error!("failed to create {}: {}", name, err);
                self.threads
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                Err(MsgringError::ThreadCreate(cpu.core()))
            }
        }
    }

    fn await_intr(&self, thread: ThreadId, pending: &dyn Fn() -> bool) -> WaitResult {
        let Some(record) = self.thread(thread) else {
            return WaitResult::Abnormal;
        };
        let mut st = record.lock();
        if st.shutdown {
            return WaitResult::Abnormal;
        }
        if pending() {
            return WaitResult::Normal;
        }
        st.awaiting = true;
        while st.awaiting {
            st = record
                .cv
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if st.shutdown {
            WaitResult::Abnormal
        } else {
            WaitResult::Normal
        }
    }

    fn wake_intr(&self, thread: ThreadId) -> bool {
        let Some(record) = self.thread(thread) else {
            return false;
        };
        let mut st = record.lock();
        if !st.awaiting {
            return false;
        }
        st.awaiting = false;
        st.wakeups += 1;
        record.cv.notify_one();
        true
    }

    fn establish_intr(&self, irq: u32) -> Result<(), MsgringError> {
        self.irqs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(irq);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..2000 {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_wake_only_when_parked() {
        let sched = Arc::new(HostScheduler::new());
        let flag = Arc::new(AtomicBool::new(false));

        let s = sched.clone();
        let f = flag.clone();
        let id = sched
            .spawn_bound(
                "waiter",
                CpuId(4),
                Box::new(move |me| {
                    while !f.load(Ordering::Acquire) {
                        if s.await_intr(me, &|| f.load(Ordering::Acquire)) == WaitResult::Abnormal
                        {
                            return;
                        }
                    }
                }),
            )
            .unwrap();

        assert_eq!(sched.cpu_of(id), Some(CpuId(4)));
        wait_until(|| sched.is_parked(id));

        flag.store(true, Ordering::Release);
        assert!(sched.wake_intr(id));
        // Already runnable, a second wake is not counted
        assert!(!sched.wake_intr(id));
        assert_eq!(sched.wakeups(id), 1);

        sched.shutdown();
    }

    #[test]
    fn test_pending_skips_park() {
        let sched = HostScheduler::new();
        let id = sched
            .spawn_bound("noop", CpuId(0), Box::new(|_| {}))
            .unwrap();
        assert_eq!(sched.await_intr(id, &|| true), WaitResult::Normal);
        assert!(!sched.is_parked(id));
        sched.shutdown();
    }

    #[test]
    fn test_unknown_thread() {
        let sched = HostScheduler::new();
        assert_eq!(
            sched.await_intr(ThreadId(u64::MAX), &|| false),
            WaitResult::Abnormal
        );
        assert!(!sched.wake_intr(ThreadId(u64::MAX)));
    }
}
