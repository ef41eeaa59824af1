//! Kern subsystem - kernel services the message ring consumes
//!
//! Event counters and the scheduler seam used by the interrupt threads.

pub mod counters;
#[cfg(feature = "std")]
pub mod host_sched;
pub mod sched_prim;

pub use counters::{CoreCounters, CounterSnapshot, MsgCounter, C_MSGRING_BADINTR};
#[cfg(feature = "std")]
pub use host_sched::HostScheduler;
pub use sched_prim::{Scheduler, ThreadEntry, WaitResult};
