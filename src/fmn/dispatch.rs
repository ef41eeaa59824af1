//! Bucket dispatch loop
//!
//! Drains every non-empty bucket of one core's station. Each outer pass
//! re-reads the status word and pops at most one message per non-empty
//! bucket, lowest bucket first, so a busy bucket cannot starve the others.
//! The loop returns only once all popped buckets read empty.

use log::{debug, warn};

use super::board::BoardInfo;
use super::registry::HandlerRegistry;
use crate::drivers::{MessageRing, RingStatus};
use crate::error::RxError;
use crate::kern::counters::CoreCounters;
use crate::types::{BucketId, BUCKETS_PER_CORE};

/// Outcome of one call to `drain`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages handed to a handler
    pub delivered: usize,
    /// Messages with no registered handler
    pub dropped: usize,
    /// Receives that reported an error
    pub rx_errors: usize,
    /// Status-word reads that found work
    pub sweeps: usize,
    /// Status written to the exit-status register
    pub exit_status: RingStatus,
}

/// Drain the first `num_buckets` buckets of `ring`
pub fn drain<R: MessageRing + ?Sized>(
    ring: &R,
    board: &BoardInfo,
    registry: &HandlerRegistry,
    num_buckets: usize,
    counters: &CoreCounters,
) -> DrainReport {
    let num_buckets = num_buckets.min(BUCKETS_PER_CORE);
    let mut report = DrainReport::default();
    counters.passes.inc();

    loop {
        let status = ring.read_status();
        if status.all_empty(num_buckets) {
            break;
        }
        report.sweeps += 1;

        for b in 0..num_buckets {
            let bucket = BucketId(b as u8);
            if status.bucket_empty(bucket) {
                continue;
            }

            let env = match ring.receive(bucket) {
                Ok(env) => env,
                Err(RxError::Empty(_)) => continue,
                Err(err) => {
                    debug!("{}: {}", ring.core(), err);
                    report.rx_errors += 1;
                    counters.rx_errors.inc();
                    continue;
                }
            };

            let slot = board.tx_station(env.source);
            match registry.lookup(slot) {
                Some(handler) => {
                    handler.handle(&env);
                    report.delivered += 1;
                    counters.delivered.inc();
                }
                None => {
                    warn!(
                        "{}: no handler for message from {} ({}), {}, size={}, code={}, msg0={:#x}, dropping",
                        ring.core(),
                        env.source,
                        slot,
                        bucket,
                        env.size,
                        env.code,
                        env.msg.msg0()
                    );
                    report.dropped += 1;
                    counters.dropped.inc();
                }
            }
        }
    }

    let exit = ring.read_status();
    ring.write_exit_status(exit);
    report.exit_status = exit;
    report
}
