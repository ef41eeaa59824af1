//! Message station register driver
//!
//! Drives one core's message station through its 32-bit register window.
//! Receive and send are command/status handshakes: write the command,
//! poll the status register until the busy bit clears, then read or
//! check the result.

use core::ptr::{read_volatile, write_volatile};

use super::{decode_rx_status, MessageRing, RingStatus};
use crate::error::{RxError, TxError};
use crate::message::{Envelope, Message, MSG_MAX_WORDS};
use crate::types::{BucketId, CoreId, StationId, BUCKETS_PER_CORE, MAX_STATIONS};

/// Station register offsets
const MSGRNG_STATUS: usize = 0x000; // Bucket-empty bitmap in bits 24..31
const MSGRNG_CONFIG: usize = 0x004; // Interrupt configuration
const MSGRNG_RX_CMD: usize = 0x008; // Pop command (bucket number)
const MSGRNG_RX_STATUS: usize = 0x00C; // Size/code/source of popped message
const MSGRNG_TX_CMD: usize = 0x010; // Send command
const MSGRNG_TX_STATUS: usize = 0x014; // Send result
const MSGRNG_EXIT_STATUS: usize = 0x018; // Dispatch exit status (diagnostic)
const MSGRNG_RX_DATA: usize = 0x020; // msg0..msg3, 64-bit
const MSGRNG_TX_DATA: usize = 0x040; // msg0..msg3, 64-bit
const MSGRNG_BUCKET_SIZE: usize = 0x080; // One register per bucket
const MSGRNG_CC: usize = 0x100; // Credit counters, 16 dest x 8 buckets

/// Size of the register window in bytes
pub const MSGRNG_WINDOW_SIZE: usize = MSGRNG_CC + MAX_STATIONS * 4;

/// Command/status busy bit
const MSGRNG_BUSY: u32 = 1 << 31;

/// Send status bits
const TX_STATUS_NO_CREDIT: u32 = 1 << 1;
const TX_STATUS_FULL: u32 = 1 << 2;

/// Polls of the busy bit before a command is declared failed
const POLL_LIMIT: usize = 1000;

/// Register-backed message station
#[derive(Debug)]
pub struct RegisterRing {
    core: CoreId,
    base: usize,
}

impl RegisterRing {
    /// Create a driver for the station window at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of a mapped, 8-byte aligned register
    /// window of at least `MSGRNG_WINDOW_SIZE` bytes that stays valid for
    /// the life of the driver and is only driven through this instance.
    pub unsafe fn new(core: CoreId, base: usize) -> Self {
        Self { core, base }
    }

    /// Read station register
    fn read_reg(&self, offset: usize) -> u32 {
        unsafe { read_volatile((self.base + offset) as *const u32) }
    }

    /// Write station register
    fn write_reg(&self, offset: usize, value: u32) {
        unsafe {
            write_volatile((self.base + offset) as *mut u32, value);
        }
    }

    fn read_data(&self, offset: usize, word: usize) -> u64 {
        unsafe { read_volatile((self.base + offset + word * 8) as *const u64) }
    }

    fn write_data(&self, offset: usize, word: usize, value: u64) {
        unsafe {
            write_volatile((self.base + offset + word * 8) as *mut u64, value);
        }
    }

    /// Spin until the busy bit of `offset` clears; returns the final value
    fn wait_not_busy(&self, offset: usize) -> Option<u32> {
        for _ in 0..POLL_LIMIT {
            let value = self.read_reg(offset);
            if value & MSGRNG_BUSY == 0 {
                return Some(value);
            }
            core::hint::spin_loop();
        }
        None
    }
}

impl MessageRing for RegisterRing {
    fn core(&self) -> CoreId {
        self.core
    }

    fn read_status(&self) -> RingStatus {
        RingStatus(self.read_reg(MSGRNG_STATUS))
    }

    fn receive(&self, bucket: BucketId) -> Result<Envelope, RxError> {
        self.write_reg(MSGRNG_RX_CMD, bucket.0 as u32);
        let status = self
            .wait_not_busy(MSGRNG_RX_STATUS)
            .ok_or(RxError::Hardware {
                bucket,
                status: MSGRNG_BUSY,
            })?;
        let (size, code, source) = decode_rx_status(bucket, status)?;

        let mut msg = Message::default();
        for (i, word) in msg.words.iter_mut().enumerate().take(size) {
            *word = self.read_data(MSGRNG_RX_DATA, i);
        }

        Ok(Envelope {
            bucket,
            size,
            code,
            source,
            msg,
        })
    }

    fn send(&self, size: usize, code: u8, dest: StationId, msg: &Message) -> Result<(), TxError> {
        if size == 0 || size > MSG_MAX_WORDS {
            return Err(TxError::BadSize(size));
        }
        for (i, word) in msg.words.iter().enumerate().take(size) {
            self.write_data(MSGRNG_TX_DATA, i, *word);
        }
        let cmd = ((size as u32 - 1) & 0x3) | ((code as u32) << 8) | (((dest.0 & 0x7f) as u32) << 16);
        self.write_reg(MSGRNG_TX_CMD, cmd);

        let status = self
            .wait_not_busy(MSGRNG_TX_STATUS)
            .ok_or(TxError::Full(dest))?;
        if status & TX_STATUS_NO_CREDIT != 0 {
            return Err(TxError::NoCredit(dest));
        }
        if status & TX_STATUS_FULL != 0 {
            return Err(TxError::Full(dest));
        }
        Ok(())
    }

    fn write_exit_status(&self, status: RingStatus) {
        self.write_reg(MSGRNG_EXIT_STATUS, status.0);
    }

    fn read_config(&self) -> u32 {
        self.read_reg(MSGRNG_CONFIG)
    }

    fn write_config(&self, config: u32) {
        self.write_reg(MSGRNG_CONFIG, config);
    }

    fn write_bucket_size(&self, bucket: BucketId, size: u8) {
        if bucket.index() < BUCKETS_PER_CORE {
            self.write_reg(MSGRNG_BUCKET_SIZE + bucket.index() * 4, size as u32);
        }
    }

    fn write_credit(&self, index: usize, credits: u8) {
        if index < MAX_STATIONS {
            self.write_reg(MSGRNG_CC + index * 4, credits as u32);
        }
    }
}
