//! Message ring register backends
//!
//! `MessageRing` is the capability interface the dispatch loop and the
//! interrupt path use to reach one core's message station. Two backends:
//!
//! - `RegisterRing`: volatile accesses on the station's register window
//! - `SoftRing`: a software model of the fabric for tests and simulation

pub mod msgring;
pub mod soft_ring;

pub use msgring::RegisterRing;
pub use soft_ring::{SoftFabric, SoftRing};

use crate::error::{RxError, TxError};
use crate::message::{Envelope, Message};
use crate::types::{BucketId, CoreId, StationId, BUCKETS_PER_CORE};

// ============================================================================
// Status Word
// ============================================================================

/// Shift of the bucket-empty bitmap in the status word
pub const STATUS_EMPTY_SHIFT: u32 = 24;

/// Receive status: bucket was empty
pub const RX_STATUS_EMPTY: u32 = 0x10;
/// Receive status: receive error
pub const RX_STATUS_ERROR: u32 = 0x20;
/// Receive status error bits
pub const RX_STATUS_ERROR_MASK: u32 = 0x30;

/// Message ring status word
///
/// Bits 24..31 hold one "empty" bit per bucket; a set bit means the bucket
/// has nothing to pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingStatus(pub u32);

impl RingStatus {
    /// Status word with every bucket empty
    pub const ALL_EMPTY: Self = Self(0xff << STATUS_EMPTY_SHIFT);

    /// Build a status word from a bitmap of non-empty buckets
    pub fn from_ready(ready: u8) -> Self {
        Self(((!ready) as u32) << STATUS_EMPTY_SHIFT)
    }

    /// Per-bucket empty bitmap
    pub fn empty_bitmap(self) -> u8 {
        ((self.0 >> STATUS_EMPTY_SHIFT) & 0xff) as u8
    }

    pub fn bucket_empty(self, bucket: BucketId) -> bool {
        self.empty_bitmap() & (1 << bucket.0) != 0
    }

    /// Are the first `num_buckets` buckets all empty?
    pub fn all_empty(self, num_buckets: usize) -> bool {
        let n = num_buckets.min(BUCKETS_PER_CORE);
        let mask = if n == BUCKETS_PER_CORE {
            0xff
        } else {
            (1u8 << n) - 1
        };
        self.empty_bitmap() & mask == mask
    }
}

/// Decode a receive status word into (size, code, source)
///
/// size is `((status & 0xc0) >> 6) + 1` words, code is bits 8..15 and the
/// source station bits 16..22.
pub fn decode_rx_status(bucket: BucketId, status: u32) -> Result<(usize, u8, StationId), RxError> {
    if status & RX_STATUS_EMPTY != 0 {
        return Err(RxError::Empty(bucket));
    }
    if status & RX_STATUS_ERROR_MASK != 0 {
        return Err(RxError::Hardware { bucket, status });
    }
    let size = (((status & 0xc0) >> 6) + 1) as usize;
    let code = ((status >> 8) & 0xff) as u8;
    let source = StationId(((status >> 16) & 0x7f) as u8);
    Ok((size, code, source))
}

/// Encode (size, code, source) the way the receive status register reports
/// them
pub fn encode_rx_status(size: usize, code: u8, source: StationId) -> u32 {
    ((((size.clamp(1, 4) - 1) as u32) << 6) & 0xc0)
        | ((code as u32) << 8)
        | (((source.0 & 0x7f) as u32) << 16)
}

// ============================================================================
// Ring Interface
// ============================================================================

/// Access to one core's message station
///
/// All methods take `&self`: the station is shared between the fast
/// interrupt path and the worker thread, and the hardware registers carry
/// their own state.
pub trait MessageRing: Send + Sync {
    /// Core owning this station
    fn core(&self) -> CoreId;

    /// Read the status word
    fn read_status(&self) -> RingStatus;

    /// Pop one message from `bucket`
    fn receive(&self, bucket: BucketId) -> Result<Envelope, RxError>;

    /// Send `size` words of `msg` with `code` to `dest`
    fn send(&self, size: usize, code: u8, dest: StationId, msg: &Message) -> Result<(), TxError>;

    /// Record the status seen when the dispatch loop exited
    fn write_exit_status(&self, status: RingStatus);

    /// Read the interrupt configuration register
    fn read_config(&self) -> u32;

    /// Write the interrupt configuration register
    fn write_config(&self, config: u32);

    /// Program the capacity of one bucket
    fn write_bucket_size(&self, bucket: BucketId, size: u8);

    /// Program credit-counter register `index` (`dest * 8 + bucket`)
    fn write_credit(&self, index: usize, credits: u8);
}
