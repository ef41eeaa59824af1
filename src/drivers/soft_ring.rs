//! Software model of the on-chip messaging fabric
//!
//! `SoftFabric` holds a FIFO per hardware station plus the per-core
//! registers (config, exit status, credit counters). `SoftRing` is one
//! core's view of it and implements `MessageRing`.
//!
//! Modelled behaviour:
//! - bucket capacity comes from the bucket-size registers (32 until set)
//! - a cpu-to-station send consumes one credit of the sender's counter for
//!   that station; popping the message returns the credit to that sender
//! - device traffic (`inject`) neither takes nor returns credits, whatever
//!   source station it claims
//! - the interrupt line is level-triggered: asserted while the interrupt
//!   type field is set and any of the core's buckets holds a message

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use super::{MessageRing, RingStatus};
use crate::error::{RxError, TxError};
use crate::message::{Envelope, Message, MSG_MAX_WORDS};
use crate::types::{BucketId, CoreId, StationId, BUCKETS_PER_CORE, MAX_CORES, MAX_STATIONS};

/// Bucket depth before the size register is programmed
pub const DEFAULT_BUCKET_DEPTH: usize = 32;

/// Interrupt type field of the config register
const CONFIG_INT_TYPE_MASK: u32 = 0x3;

#[derive(Debug)]
struct Queued {
    env: Envelope,
    /// Core whose credit this message holds, if any
    credited: Option<CoreId>,
}

#[derive(Debug)]
struct StationQueue {
    queue: VecDeque<Queued>,
    capacity: usize,
}

#[derive(Debug)]
struct CoreRegs {
    config: u32,
    exit_status: u32,
    /// Credits this core holds for each destination station
    credits: [u8; MAX_STATIONS],
    /// One-shot receive faults, by bucket
    faults: u8,
}

#[derive(Debug)]
struct FabricState {
    stations: Vec<StationQueue>,
    cores: Vec<CoreRegs>,
}

impl FabricState {
    fn push(&mut self, dest: StationId, entry: Queued) -> Result<(), TxError> {
        let station = self
            .stations
            .get_mut(dest.index())
            .ok_or(TxError::Full(dest))?;
        if station.queue.len() >= station.capacity {
            return Err(TxError::Full(dest));
        }
        station.queue.push_back(entry);
        Ok(())
    }

    fn ready_bitmap(&self, core: CoreId) -> u8 {
        let base = core.station_base().index();
        (0..BUCKETS_PER_CORE).fold(0u8, |bm, b| {
            match self.stations.get(base + b) {
                Some(s) if !s.queue.is_empty() => bm | (1 << b),
                _ => bm,
            }
        })
    }
}

/// The whole fabric, shared by every core's `SoftRing`
#[derive(Debug)]
pub struct SoftFabric {
    inner: Mutex<FabricState>,
}

impl SoftFabric {
    pub fn new() -> Arc<Self> {
        let stations = (0..MAX_STATIONS)
            .map(|_| StationQueue {
                queue: VecDeque::new(),
                capacity: DEFAULT_BUCKET_DEPTH,
            })
            .collect();
        let cores = (0..MAX_CORES)
            .map(|_| CoreRegs {
                config: 0,
                exit_status: 0,
                credits: [0; MAX_STATIONS],
                faults: 0,
            })
            .collect();
        Arc::new(Self {
            inner: Mutex::new(FabricState { stations, cores }),
        })
    }

    /// One core's station view
    pub fn ring(self: &Arc<Self>, core: CoreId) -> SoftRing {
        SoftRing {
            core,
            fabric: Arc::clone(self),
        }
    }

    /// Views for cores `0..n`
    pub fn rings(self: &Arc<Self>, n: usize) -> Vec<SoftRing> {
        (0..n.min(MAX_CORES)).map(|c| self.ring(CoreId(c))).collect()
    }

    /// Deliver a device-originated message into `dest`
    pub fn inject(
        &self,
        dest: StationId,
        source: StationId,
        code: u8,
        words: &[u64],
    ) -> Result<(), TxError> {
        let msg = Message::from_words(words)?;
        let env = Envelope {
            bucket: BucketId((dest.index() % BUCKETS_PER_CORE) as u8),
            size: words.len(),
            code,
            source,
            msg,
        };
        self.inner.lock().push(dest, Queued { env, credited: None })
    }

    /// Messages waiting at `station`
    pub fn queued(&self, station: StationId) -> usize {
        self.inner
            .lock()
            .stations
            .get(station.index())
            .map_or(0, |s| s.queue.len())
    }

    /// Make the next receive on `bucket` of `core` report an error
    pub fn fail_next_receive(&self, core: CoreId, bucket: BucketId) {
        if let Some(regs) = self.inner.lock().cores.get_mut(core.0) {
            regs.faults |= 1 << bucket.0;
        }
    }

    /// Credits `core` currently holds for `dest`
    pub fn credits(&self, core: CoreId, dest: StationId) -> u8 {
        self.inner
            .lock()
            .cores
            .get(core.0)
            .and_then(|r| r.credits.get(dest.index()).copied())
            .unwrap_or(0)
    }

    /// Programmed capacity of `station`
    pub fn capacity(&self, station: StationId) -> usize {
        self.inner
            .lock()
            .stations
            .get(station.index())
            .map_or(0, |s| s.capacity)
    }

    /// Last exit status written by `core`
    pub fn exit_status(&self, core: CoreId) -> RingStatus {
        RingStatus(
            self.inner
                .lock()
                .cores
                .get(core.0)
                .map_or(0, |r| r.exit_status),
        )
    }

    /// Level of the message ring interrupt line for `core`
    pub fn irq_asserted(&self, core: CoreId) -> bool {
        let state = self.inner.lock();
        let enabled = state
            .cores
            .get(core.0)
            .is_some_and(|r| r.config & CONFIG_INT_TYPE_MASK != 0);
        enabled && state.ready_bitmap(core) != 0
    }
}

/// One core's view of a `SoftFabric`
#[derive(Debug, Clone)]
pub struct SoftRing {
    core: CoreId,
    fabric: Arc<SoftFabric>,
}

impl SoftRing {
    pub fn fabric(&self) -> &Arc<SoftFabric> {
        &self.fabric
    }
}

impl MessageRing for SoftRing {
    fn core(&self) -> CoreId {
        self.core
    }

    fn read_status(&self) -> RingStatus {
        RingStatus::from_ready(self.fabric.inner.lock().ready_bitmap(self.core))
    }

    fn receive(&self, bucket: BucketId) -> Result<Envelope, RxError> {
        let mut state = self.fabric.inner.lock();
        if bucket.index() >= BUCKETS_PER_CORE {
            return Err(RxError::Empty(bucket));
        }

        if let Some(regs) = state.cores.get_mut(self.core.0) {
            if regs.faults & (1 << bucket.0) != 0 {
                regs.faults &= !(1 << bucket.0);
                return Err(RxError::Hardware {
                    bucket,
                    status: super::RX_STATUS_ERROR,
                });
            }
        }

        let dest = self.core.station_base().index() + bucket.index();
        let Queued { env, credited } = state
            .stations
            .get_mut(dest)
            .and_then(|s| s.queue.pop_front())
            .ok_or(RxError::Empty(bucket))?;

        // Hand the credit back to the sending core
        if let Some(sender) = credited {
            if let Some(credit) = state
                .cores
                .get_mut(sender.0)
                .and_then(|r| r.credits.get_mut(dest))
            {
                *credit = credit.saturating_add(1);
            }
        }
        Ok(env)
    }

    fn send(&self, size: usize, code: u8, dest: StationId, msg: &Message) -> Result<(), TxError> {
        if size == 0 || size > MSG_MAX_WORDS {
            return Err(TxError::BadSize(size));
        }
        let mut state = self.fabric.inner.lock();
        let available = state
            .cores
            .get(self.core.0)
            .and_then(|r| r.credits.get(dest.index()).copied())
            .unwrap_or(0);
        if available == 0 {
            return Err(TxError::NoCredit(dest));
        }

        let env = Envelope {
            bucket: BucketId((dest.index() % BUCKETS_PER_CORE) as u8),
            size,
            code,
            source: self.core.station_base(),
            msg: *msg,
        };
        state.push(
            dest,
            Queued {
                env,
                credited: Some(self.core),
            },
        )?;
        if let Some(credit) = state
            .cores
            .get_mut(self.core.0)
            .and_then(|r| r.credits.get_mut(dest.index()))
        {
            *credit -= 1;
        }
        Ok(())
    }

    fn write_exit_status(&self, status: RingStatus) {
        if let Some(regs) = self.fabric.inner.lock().cores.get_mut(self.core.0) {
            regs.exit_status = status.0;
        }
    }

    fn read_config(&self) -> u32 {
        self.fabric
            .inner
            .lock()
            .cores
            .get(self.core.0)
            .map_or(0, |r| r.config)
    }

    fn write_config(&self, config: u32) {
        if let Some(regs) = self.fabric.inner.lock().cores.get_mut(self.core.0) {
            regs.config = config;
        }
    }

    fn write_bucket_size(&self, bucket: BucketId, size: u8) {
        if bucket.index() >= BUCKETS_PER_CORE {
            return;
        }
        let station = self.core.station_base().index() + bucket.index();
        if let Some(s) = self.fabric.inner.lock().stations.get_mut(station) {
            s.capacity = size as usize;
        }
    }

    fn write_credit(&self, index: usize, credits: u8) {
        if let Some(credit) = self
            .fabric
            .inner
            .lock()
            .cores
            .get_mut(self.core.0)
            .and_then(|r| r.credits.get_mut(index))
        {
            *credit = credits;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_and_receive_fifo() {
        let fabric = SoftFabric::new();
        let ring = fabric.ring(CoreId(0));

        fabric.inject(StationId(2), StationId(120), 1, &[10]).unwrap();
        fabric.inject(StationId(2), StationId(120), 1, &[11]).unwrap();

        let status = ring.read_status();
        assert!(!status.bucket_empty(BucketId(2)));
        assert!(status.bucket_empty(BucketId(0)));

        assert_eq!(ring.receive(BucketId(2)).unwrap().msg.msg0(), 10);
        assert_eq!(ring.receive(BucketId(2)).unwrap().msg.msg0(), 11);
        assert_eq!(ring.receive(BucketId(2)), Err(RxError::Empty(BucketId(2))));
        assert!(ring.read_status().all_empty(8));
    }

    #[test]
    fn test_bucket_capacity() {
        let fabric = SoftFabric::new();
        let ring = fabric.ring(CoreId(1));
        ring.write_bucket_size(BucketId(0), 1);
        assert_eq!(fabric.capacity(StationId(8)), 1);

        fabric.inject(StationId(8), StationId(104), 0, &[1]).unwrap();
        assert_eq!(
            fabric.inject(StationId(8), StationId(104), 0, &[2]),
            Err(TxError::Full(StationId(8)))
        );
    }

    #[test]
    fn test_send_consumes_and_returns_credit() {
        let fabric = SoftFabric::new();
        let sender = fabric.ring(CoreId(0));
        let receiver = fabric.ring(CoreId(1));
        let msg = Message::single(0x55);

        assert_eq!(
            sender.send(1, 0, StationId(9), &msg),
            Err(TxError::NoCredit(StationId(9)))
        );

        sender.write_credit(9, 1);
        sender.send(1, 4, StationId(9), &msg).unwrap();
        assert_eq!(fabric.credits(CoreId(0), StationId(9)), 0);
        assert_eq!(
            sender.send(1, 4, StationId(9), &msg),
            Err(TxError::NoCredit(StationId(9)))
        );

        let env = receiver.receive(BucketId(1)).unwrap();
        assert_eq!(env.source, StationId(0));
        assert_eq!(env.code, 4);
        assert_eq!(fabric.credits(CoreId(0), StationId(9)), 1);
    }

    #[test]
    fn test_injected_from_cpu_station_returns_no_credit() {
        let fabric = SoftFabric::new();
        let core5 = fabric.ring(CoreId(5));
        let core0 = fabric.ring(CoreId(0));
        core5.write_credit(0, 1);

        // Station 42 belongs to core 5, but nothing was sent through it
        for w in [1, 2, 3] {
            fabric.inject(StationId(0), StationId(42), 0, &[w]).unwrap();
        }
        for _ in 0..3 {
            assert_eq!(core0.receive(BucketId(0)).unwrap().source, StationId(42));
        }
        assert_eq!(fabric.credits(CoreId(5), StationId(0)), 1);

        // A real send from core 5 still gets its credit back
        core5.send(1, 0, StationId(0), &Message::single(4)).unwrap();
        assert_eq!(fabric.credits(CoreId(5), StationId(0)), 0);
        core0.receive(BucketId(0)).unwrap();
        assert_eq!(fabric.credits(CoreId(5), StationId(0)), 1);
    }

    #[test]
    fn test_one_shot_fault() {
        let fabric = SoftFabric::new();
        let ring = fabric.ring(CoreId(0));
        fabric.inject(StationId(3), StationId(120), 0, &[1]).unwrap();
        fabric.fail_next_receive(CoreId(0), BucketId(3));

        assert!(matches!(
            ring.receive(BucketId(3)),
            Err(RxError::Hardware { .. })
        ));
        assert!(ring.receive(BucketId(3)).is_ok());
    }

    #[test]
    fn test_irq_level() {
        let fabric = SoftFabric::new();
        let ring = fabric.ring(CoreId(0));
        fabric.inject(StationId(0), StationId(120), 0, &[1]).unwrap();
        assert!(!fabric.irq_asserted(CoreId(0)));

        ring.write_config(0x02);
        assert!(fabric.irq_asserted(CoreId(0)));

        ring.receive(BucketId(0)).unwrap();
        assert!(!fabric.irq_asserted(CoreId(0)));
    }
}
