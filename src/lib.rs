//! msgring - message ring interrupt and dispatch core for XLR/XLS class
//! processors
//!
//! Cores and on-chip devices exchange small messages through per-core
//! hardware buckets. This crate drains those buckets into registered
//! handlers, splits ring interrupts into a fast path and a bound worker
//! thread per core, and programs the credit counters and bucket sizes of
//! each core from a board description.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
// Hardware register code often uses explicit bit shifts for documentation
#![allow(clippy::identity_op)]
// Register accessors need explicit casts for memory-mapped I/O
#![allow(clippy::unnecessary_cast)]

// Standard library replacement for no_std
extern crate alloc;

// Core types
pub mod error;
pub mod message;
pub mod types;

pub mod console;
pub mod drivers;
pub mod kern;

// Fast Messaging Network subsystem
pub mod fmn;

pub use error::{MsgringError, RxError, TxError};
pub use fmn::{BoardInfo, IntrStatus, MessageHandler, Msgring, MsgringConfig};
pub use message::{Envelope, Message};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Subsystem name used in log lines
pub const NAME: &str = "msgring";
