//! Message ring interrupt configuration

use crate::types::BUCKETS_PER_CORE;

/// Interrupt line the message ring raises
pub const IRQ_MSGRING: u8 = 6;

/// Interrupt type field in the config register; clearing it masks the
/// interrupt
pub const CONFIG_INT_TYPE_MASK: u32 = 0x3;

/// Attempts made by `Msgring::send` while the destination has no credit
pub const SEND_RETRIES: usize = 100;

/// Message ring interrupt configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgringConfig {
    /// Interrupt type: 0x02 interrupts while any bucket is non-empty
    pub int_type: u8,
    /// Buckets the dispatch loop pops (from bucket 0 upward)
    pub pop_num_buckets: usize,
    /// Whether the ring interrupt is used at all
    pub int_en: bool,
    /// Messages queued before the interrupt is raised
    pub watermark_count: u8,
    /// Hardware threads the interrupt is delivered to
    pub thread_mask: u8,
    pub irq: u8,
}

impl MsgringConfig {
    /// Value written to the config register to enable the interrupt
    pub fn config_word(&self) -> u32 {
        let int_type = if self.int_en {
            self.int_type as u32 & CONFIG_INT_TYPE_MASK
        } else {
            0
        };
        ((self.watermark_count as u32) << 24)
            | ((self.irq as u32) << 16)
            | ((self.thread_mask as u32) << 8)
            | int_type
    }

    /// Builder-style override of the number of buckets popped
    pub fn with_pop_buckets(mut self, n: usize) -> Self {
        self.pop_num_buckets = n.clamp(1, BUCKETS_PER_CORE);
        self
    }
}

impl Default for MsgringConfig {
    fn default() -> Self {
        Self {
            int_type: 0x02,
            pop_num_buckets: BUCKETS_PER_CORE,
            int_en: true,
            watermark_count: 1,
            thread_mask: 0x01,
            irq: IRQ_MSGRING,
        }
    }
}
