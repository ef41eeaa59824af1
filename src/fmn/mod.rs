//! Fast Messaging Network - message ring interrupt and dispatch
//!
//! `Msgring` owns the pieces of the subsystem: the board description, the
//! handler registry, one station per core and the per-core interrupt
//! threads. The kernel reaches it from three places:
//!
//! 1. Driver attach: `register_handler` for the transmit station a driver
//!    receives from. The first registration creates the core 0 worker and
//!    establishes the ring interrupt.
//! 2. Interrupt: `fast_intr` from the hard interrupt handler. It masks the
//!    ring interrupt, marks work pending and wakes the worker.
//! 3. Worker: each worker drains its core's buckets through `dispatch::drain`
//!    and unmasks the interrupt when nothing is left.
//!
//! Per-core bring-up (`cpu_init`) programs bucket sizes and credit
//! counters and is the only path that touches more than one register under
//! the configuration lock.

pub mod board;
pub mod config;
pub mod dispatch;
pub mod ithread;
pub mod registry;

pub use board::{BoardInfo, CreditConfig};
pub use config::{MsgringConfig, CONFIG_INT_TYPE_MASK, IRQ_MSGRING, SEND_RETRIES};
pub use dispatch::{drain, DrainReport};
pub use ithread::{IthreadState, MsgringThread};
pub use registry::{FnHandler, HandlerRegistry, MessageHandler, MAX_TX_STNS};

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use spin::{Mutex, Once};

use crate::drivers::MessageRing;
use crate::error::{MsgringError, TxError};
use crate::kern::counters::{CoreCounters, C_MSGRING_BADINTR};
use crate::kern::sched_prim::{Scheduler, WaitResult};
use crate::message::Message;
use crate::types::{BucketId, CoreId, CpuId, StationId, ThreadId, TxStation};
use crate::types::{BUCKETS_PER_CORE, MAX_CORES, THREADS_PER_CORE};

/// Result of the fast interrupt path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrStatus {
    /// Worker marked pending
    Handled,
    /// No worker on this core; the interrupt was masked and counted
    Stray,
}

/// Per-core state
struct CoreSlot<R> {
    ring: R,
    ithread: Once<MsgringThread>,
    thread_created: AtomicBool,
    counters: CoreCounters,
}

/// The message ring subsystem
pub struct Msgring<R: MessageRing, S: Scheduler> {
    board: BoardInfo,
    config: MsgringConfig,
    sched: Arc<S>,
    registry: HandlerRegistry,
    cores: heapless::Vec<CoreSlot<R>, MAX_CORES>,
    /// Serialises configuration register updates across cores
    config_lock: Mutex<()>,
    intr_established: AtomicBool,
}

impl<R, S> Msgring<R, S>
where
    R: MessageRing + 'static,
    S: Scheduler + 'static,
{
    /// Create the subsystem; `rings` must be the stations of cores 0, 1, ...
    /// in order
    pub fn new<I>(
        board: BoardInfo,
        config: MsgringConfig,
        sched: Arc<S>,
        rings: I,
    ) -> Result<Arc<Self>, MsgringError>
    where
        I: IntoIterator<Item = R>,
    {
        let mut cores = heapless::Vec::new();
        for (idx, ring) in rings.into_iter().enumerate() {
            if ring.core() != CoreId(idx) {
                return Err(MsgringError::NoSuchCore(ring.core()));
            }
            cores
                .push(CoreSlot {
                    ring,
                    ithread: Once::new(),
                    thread_created: AtomicBool::new(false),
                    counters: CoreCounters::new(),
                })
                .map_err(|_| MsgringError::NoSuchCore(CoreId(idx)))?;
        }

        Ok(Arc::new(Self {
            board,
            config,
            sched,
            registry: HandlerRegistry::new(),
            cores,
            config_lock: Mutex::new(()),
            intr_established: AtomicBool::new(false),
        }))
    }

    /// Boot-core bring-up
    pub fn init(&self, boot_core: CoreId) -> Result<(), MsgringError> {
        info!(
            "msgring: {} board, {} cores, {} buckets popped, config {:#010x}",
            self.board.name,
            self.cores.len(),
            self.config.pop_num_buckets,
            self.config.config_word()
        );
        self.cpu_init(boot_core)
    }

    fn slot(&self, core: CoreId) -> Result<&CoreSlot<R>, MsgringError> {
        self.cores.get(core.0).ok_or(MsgringError::NoSuchCore(core))
    }

    /// Program the bucket sizes and credit counters of `core`
    ///
    /// Nothing is written when the board has no credit table for the core.
    pub fn cpu_init(&self, core: CoreId) -> Result<(), MsgringError> {
        let slot = self.slot(core)?;
        let sizes = self.board.core_bucket_sizes(core)?;
        let cc = self.board.credit_config(core).inspect_err(|_| {
            error!("msgring: no credit configuration for {}", core);
        })?;

        let _guard = self.config_lock.lock();
        for (b, size) in sizes.iter().enumerate() {
            slot.ring.write_bucket_size(BucketId(b as u8), *size);
        }
        for (dest, row) in cc.counters.iter().enumerate() {
            for (b, credits) in row.iter().enumerate() {
                slot.ring.write_credit(dest * BUCKETS_PER_CORE + b, *credits);
            }
        }
        debug!("msgring: {} bucket sizes and credits programmed", core);
        Ok(())
    }

    fn unmask(&self, slot: &CoreSlot<R>) {
        let _guard = self.config_lock.lock();
        slot.ring.write_config(self.config.config_word());
    }

    /// Clear the interrupt type field; no locking, safe from the fast path
    fn mask(slot: &CoreSlot<R>) {
        let config = slot.ring.read_config();
        slot.ring.write_config(config & !CONFIG_INT_TYPE_MASK);
    }

    /// Enable the ring interrupt on `core`
    pub fn enable_intr(&self, core: CoreId) -> Result<(), MsgringError> {
        let slot = self.slot(core)?;
        self.unmask(slot);
        Ok(())
    }

    /// Disable the ring interrupt on `core`
    pub fn disable_intr(&self, core: CoreId) -> Result<(), MsgringError> {
        let slot = self.slot(core)?;
        let _guard = self.config_lock.lock();
        Self::mask(slot);
        Ok(())
    }

    /// Register `handler` for messages from transmit station `station`
    ///
    /// A later registration for the same station replaces the earlier one.
    pub fn register_handler(
        self: &Arc<Self>,
        station: TxStation,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), MsgringError> {
        if self.registry.register(station, handler)? {
            debug!("msgring: handler for {} replaced", station);
        }

        if self
            .intr_established
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Err(err) = self.arm() {
                self.intr_established.store(false, Ordering::Release);
                return Err(err);
            }
        }
        Ok(())
    }

    fn arm(self: &Arc<Self>) -> Result<(), MsgringError> {
        match self.create_thread(CoreId(0)) {
            Ok(_) | Err(MsgringError::ThreadExists(_)) => {}
            Err(err) => return Err(err),
        }
        let irq = self.config.irq as u32;
        self.sched.establish_intr(irq).inspect_err(|err| {
            error!("msgring: {}", err);
        })?;
        info!("msgring: interrupt {} established", irq);
        Ok(())
    }

    /// Create the interrupt thread of `core`, bound to its first cpu
    pub fn create_thread(self: &Arc<Self>, core: CoreId) -> Result<ThreadId, MsgringError> {
        let slot = self.slot(core)?;
        if slot.thread_created.swap(true, Ordering::AcqRel) {
            return Err(MsgringError::ThreadExists(core));
        }

        let cpu = core.first_cpu();
        let mut name: heapless::String<16> = heapless::String::new();
        let _ = write!(name, "msg_intr{}", cpu.0);

        let this = Arc::clone(self);
        let entry = Box::new(move |tid: ThreadId| this.msgring_process(core, cpu, tid));
        match self.sched.spawn_bound(&name, cpu, entry) {
            Ok(tid) => {
                info!("msgring: created {} for {} on {}", name, core, cpu);
                Ok(tid)
            }
            Err(err) => {
                slot.thread_created.store(false, Ordering::Release);
                error!("msgring: {}", err);
                Err(err)
            }
        }
    }

    /// Create workers for the secondary cores present in `hw_thread_mask`
    ///
    /// Each core owns a 4-bit slice of the mask; a core gets a worker when
    /// any of its hardware threads is enabled. Returns the number created.
    pub fn start_threads(self: &Arc<Self>, hw_thread_mask: u32) -> Result<usize, MsgringError> {
        let mut created = 0;
        for core in 1..MAX_CORES {
            let threads = (hw_thread_mask >> (core * THREADS_PER_CORE)) & 0xf;
            if threads == 0 {
                continue;
            }
            if core >= self.cores.len() {
                warn!("msgring: core{} enabled but has no message station", core);
                continue;
            }
            match self.create_thread(CoreId(core)) {
                Ok(_) => created += 1,
                Err(MsgringError::ThreadExists(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(created)
    }

    /// Body of a core's interrupt thread
    fn msgring_process(&self, core: CoreId, cpu: CpuId, tid: ThreadId) {
        let Ok(slot) = self.slot(core) else {
            return;
        };
        let ithd = slot.ithread.call_once(|| MsgringThread::new(tid, cpu, core));
        info!("msgring: {} interrupt thread running on {}", core, cpu);
        self.unmask(slot);

        loop {
            self.run_worker(slot, ithd);
            match self.sched.await_intr(tid, &|| ithd.is_pending()) {
                WaitResult::Normal => {}
                WaitResult::Abnormal | WaitResult::Interrupted => break,
            }
        }
        debug!("msgring: {} interrupt thread exiting", core);
    }

    fn run_worker(&self, slot: &CoreSlot<R>, ithd: &MsgringThread) -> usize {
        ithd.run_pending(
            || {
                drain(
                    &slot.ring,
                    &self.board,
                    &self.registry,
                    self.config.pop_num_buckets,
                    &slot.counters,
                );
            },
            || self.unmask(slot),
        )
    }

    /// Fast interrupt path for `core`
    ///
    /// Never blocks or allocates: one config register update, one atomic
    /// increment and at most one wakeup.
    pub fn fast_intr(&self, core: CoreId) -> IntrStatus {
        let Some(slot) = self.cores.get(core.0) else {
            C_MSGRING_BADINTR.inc();
            return IntrStatus::Stray;
        };
        slot.counters.intr.inc();
        Self::mask(slot);

        let Some(ithd) = slot.ithread.get() else {
            C_MSGRING_BADINTR.inc();
            return IntrStatus::Stray;
        };
        ithd.raise();
        if self.sched.wake_intr(ithd.thread()) {
            slot.counters.wakeups.inc();
        }
        IntrStatus::Handled
    }

    /// Run the worker loop of `core` once on the calling thread
    ///
    /// Returns the number of drain passes made, 0 when the core's worker
    /// is draining at the time; pending work is then left to it.
    pub fn service_pending(&self, core: CoreId) -> Result<usize, MsgringError> {
        let slot = self.slot(core)?;
        let ithd = slot.ithread.get().ok_or(MsgringError::NoThread(core))?;
        Ok(self.run_worker(slot, ithd))
    }

    /// Send a 1-4 word message from `core` to station `dest`
    ///
    /// Retried up to `SEND_RETRIES` times while the destination is out of
    /// credit or full.
    pub fn send(
        &self,
        core: CoreId,
        dest: StationId,
        code: u8,
        words: &[u64],
    ) -> Result<(), MsgringError> {
        let slot = self.slot(core)?;
        let msg = Message::from_words(words)?;

        let mut last = TxError::NoCredit(dest);
        for _ in 0..SEND_RETRIES {
            match slot.ring.send(words.len(), code, dest, &msg) {
                Ok(()) => return Ok(()),
                Err(err @ TxError::BadSize(_)) => return Err(err.into()),
                Err(err) => {
                    last = err;
                    core::hint::spin_loop();
                }
            }
        }
        debug!("msgring: {} send to {} failed: {}", core, dest, last);
        Err(last.into())
    }

    pub fn board(&self) -> &BoardInfo {
        &self.board
    }

    pub fn config(&self) -> &MsgringConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<S> {
        &self.sched
    }

    /// Number of cores with a message station
    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }

    pub fn ring(&self, core: CoreId) -> Option<&R> {
        self.cores.get(core.0).map(|s| &s.ring)
    }

    pub fn counters(&self, core: CoreId) -> Option<&CoreCounters> {
        self.cores.get(core.0).map(|s| &s.counters)
    }

    /// Interrupt thread of `core`, once it is running
    pub fn worker(&self, core: CoreId) -> Option<&MsgringThread> {
        self.cores.get(core.0).and_then(|s| s.ithread.get())
    }

    pub fn thread_state(&self, core: CoreId) -> Option<IthreadState> {
        self.worker(core).map(MsgringThread::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::soft_ring::DEFAULT_BUCKET_DEPTH;
    use crate::drivers::{SoftFabric, SoftRing};
    use crate::kern::sched_prim::ThreadEntry;
    use crate::message::Envelope;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::sync::atomic::AtomicUsize;

    /// Scheduler double: runs the thread body inline. `await_intr` returns
    /// at once (abnormally when nothing is pending) so the body exits, and
    /// the test drives the worker with `service_pending`.
    #[derive(Default)]
    struct TestSched {
        parked: AtomicBool,
        wakes: AtomicUsize,
        spawned: Mutex<Vec<(String, CpuId)>>,
        irqs: Mutex<Vec<u32>>,
        fail_spawn: AtomicBool,
    }

    impl Scheduler for TestSched {
        fn spawn_bound(
            &self,
            name: &str,
            cpu: CpuId,
            entry: ThreadEntry,
        ) -> Result<ThreadId, MsgringError> {
            if self.fail_spawn.load(Ordering::Relaxed) {
                return Err(MsgringError::ThreadCreate(cpu.core()));
            }
            self.spawned.lock().push((name.into(), cpu));
            let id = ThreadId::new();
            entry(id);
            Ok(id)
        }

        fn await_intr(&self, _thread: ThreadId, pending: &dyn Fn() -> bool) -> WaitResult {
            if pending() {
                WaitResult::Normal
            } else {
                WaitResult::Abnormal
            }
        }

        fn wake_intr(&self, _thread: ThreadId) -> bool {
            let was_parked = self.parked.swap(false, Ordering::AcqRel);
            if was_parked {
                self.wakes.fetch_add(1, Ordering::Relaxed);
            }
            was_parked
        }

        fn establish_intr(&self, irq: u32) -> Result<(), MsgringError> {
            self.irqs.lock().push(irq);
            Ok(())
        }
    }

    type TestRing = Msgring<SoftRing, TestSched>;

    fn setup(board: BoardInfo) -> (Arc<SoftFabric>, Arc<TestSched>, Arc<TestRing>) {
        let fabric = SoftFabric::new();
        let sched = Arc::new(TestSched::default());
        let ms = Msgring::new(
            board,
            MsgringConfig::default(),
            sched.clone(),
            fabric.rings(MAX_CORES),
        )
        .unwrap();
        (fabric, sched, ms)
    }

    fn recorder(ms: &Arc<TestRing>, station: TxStation) -> Arc<Mutex<Vec<u64>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        ms.register_handler(
            station,
            Arc::new(move |env: &Envelope| sink.lock().push(env.msg.msg0())),
        )
        .unwrap();
        seen
    }

    #[test]
    fn test_rings_must_be_in_core_order() {
        let fabric = SoftFabric::new();
        let rings = [fabric.ring(CoreId(1))];
        let result = Msgring::new(
            BoardInfo::xlr(),
            MsgringConfig::default(),
            Arc::new(TestSched::default()),
            rings,
        );
        assert!(matches!(result, Err(MsgringError::NoSuchCore(CoreId(1)))));
    }

    #[test]
    fn test_cpu_init_programs_sizes_and_credits() {
        let (fabric, _sched, ms) = setup(BoardInfo::xlr());
        ms.init(CoreId(0)).unwrap();
        ms.cpu_init(CoreId(1)).unwrap();

        assert_eq!(fabric.capacity(StationId(8)), 32);
        assert_eq!(fabric.credits(CoreId(1), StationId(9)), 4);
        assert_eq!(fabric.credits(CoreId(1), StationId(120)), 1);
        assert_eq!(fabric.credits(CoreId(0), StationId(64)), 2);
    }

    #[test]
    fn test_cpu_init_without_credit_table() {
        let mut board = BoardInfo::xlr();
        board.set_credit_config(CoreId(2), None);
        let (fabric, _sched, ms) = setup(board);

        assert_eq!(
            ms.cpu_init(CoreId(2)),
            Err(MsgringError::NoCreditConfig(CoreId(2)))
        );
        // Nothing was programmed
        assert_eq!(fabric.capacity(StationId(16)), DEFAULT_BUCKET_DEPTH);
        assert_eq!(fabric.credits(CoreId(2), StationId(0)), 0);
        assert_eq!(
            ms.cpu_init(CoreId(8)),
            Err(MsgringError::NoSuchCore(CoreId(8)))
        );
    }

    #[test]
    fn test_first_registration_arms_core0() {
        let (fabric, sched, ms) = setup(BoardInfo::xlr());
        recorder(&ms, TxStation::SAE);

        {
            let spawned = sched.spawned.lock();
            assert_eq!(spawned.len(), 1);
            assert_eq!(spawned[0], (String::from("msg_intr0"), CpuId(0)));
        }
        assert_eq!(*sched.irqs.lock(), [IRQ_MSGRING as u32]);
        assert_eq!(ms.thread_state(CoreId(0)), Some(IthreadState::Idle));
        assert_eq!(
            fabric.ring(CoreId(0)).read_config(),
            MsgringConfig::default().config_word()
        );

        // Later registrations only fill the table
        recorder(&ms, TxStation::DMA);
        assert_eq!(sched.spawned.lock().len(), 1);
        assert_eq!(sched.irqs.lock().len(), 1);
        assert_eq!(ms.registry().registered_count(), 2);
    }

    #[test]
    fn test_register_out_of_range() {
        let (_fabric, sched, ms) = setup(BoardInfo::xlr());
        let bad = TxStation(MAX_TX_STNS);
        assert_eq!(
            ms.register_handler(bad, Arc::new(|_: &Envelope| {})),
            Err(MsgringError::InvalidStation(bad))
        );
        assert!(sched.spawned.lock().is_empty());
        assert!(ms.worker(CoreId(0)).is_none());
    }

    #[test]
    fn test_failed_thread_creation_retried() {
        let (_fabric, sched, ms) = setup(BoardInfo::xlr());
        sched.fail_spawn.store(true, Ordering::Relaxed);
        assert_eq!(
            ms.register_handler(TxStation::SAE, Arc::new(|_: &Envelope| {})),
            Err(MsgringError::ThreadCreate(CoreId(0)))
        );
        assert!(sched.irqs.lock().is_empty());

        sched.fail_spawn.store(false, Ordering::Relaxed);
        ms.register_handler(TxStation::SAE, Arc::new(|_: &Envelope| {}))
            .unwrap();
        assert!(ms.worker(CoreId(0)).is_some());
        assert_eq!(sched.irqs.lock().len(), 1);
    }

    #[test]
    fn test_one_worker_per_core() {
        let (_fabric, sched, ms) = setup(BoardInfo::xlr());
        ms.create_thread(CoreId(3)).unwrap();
        assert_eq!(
            ms.create_thread(CoreId(3)),
            Err(MsgringError::ThreadExists(CoreId(3)))
        );
        assert_eq!(sched.spawned.lock().len(), 1);
        assert_eq!(ms.worker(CoreId(3)).map(MsgringThread::cpu), Some(CpuId(12)));
    }

    #[test]
    fn test_start_threads_from_mask() {
        let (_fabric, sched, ms) = setup(BoardInfo::xlr());
        // core0 slice ignored, core1 and core3 enabled, core2 empty
        let created = ms.start_threads(0x0000_f01f).unwrap();
        assert_eq!(created, 2);

        let cpus: Vec<CpuId> = sched.spawned.lock().iter().map(|(_, c)| *c).collect();
        assert_eq!(cpus, [CpuId(4), CpuId(12)]);
        assert!(ms.worker(CoreId(0)).is_none());
        assert!(ms.worker(CoreId(2)).is_none());

        // Already running
        assert_eq!(ms.start_threads(0x0000_f01f).unwrap(), 0);
    }

    #[test]
    fn test_fast_intr_wakes_parked_worker_once() {
        let (fabric, sched, ms) = setup(BoardInfo::xlr());
        recorder(&ms, TxStation::SAE);
        sched.parked.store(true, Ordering::Release);

        assert_eq!(ms.fast_intr(CoreId(0)), IntrStatus::Handled);
        assert_eq!(fabric.ring(CoreId(0)).read_config() & CONFIG_INT_TYPE_MASK, 0);
        assert_eq!(ms.thread_state(CoreId(0)), Some(IthreadState::InterruptPending));

        // Worker already runnable
        assert_eq!(ms.fast_intr(CoreId(0)), IntrStatus::Handled);
        assert_eq!(sched.wakes.load(Ordering::Relaxed), 1);

        let snap = ms.counters(CoreId(0)).unwrap().snapshot();
        assert_eq!(snap.intr, 2);
        assert_eq!(snap.wakeups, 1);
    }

    #[test]
    fn test_service_pending_drains_and_unmasks() {
        let (fabric, _sched, ms) = setup(BoardInfo::xlr());
        let seen = recorder(&ms, TxStation::SAE);

        for w in [7, 8, 9] {
            fabric.inject(StationId(0), StationId(122), 1, &[w]).unwrap();
        }
        assert!(fabric.irq_asserted(CoreId(0)));
        ms.fast_intr(CoreId(0));
        assert!(!fabric.irq_asserted(CoreId(0)));

        assert_eq!(ms.service_pending(CoreId(0)), Ok(1));
        assert_eq!(*seen.lock(), [7, 8, 9]);
        assert_eq!(ms.thread_state(CoreId(0)), Some(IthreadState::Idle));
        assert_eq!(
            fabric.ring(CoreId(0)).read_config(),
            MsgringConfig::default().config_word()
        );
        assert_eq!(ms.counters(CoreId(0)).unwrap().delivered.get(), 3);
    }

    #[test]
    fn test_reraise_while_draining_reruns_pass() {
        let (fabric, _sched, ms) = setup(BoardInfo::xlr());
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&ms);
        let f = fabric.clone();
        let c = calls.clone();
        ms.register_handler(
            TxStation::DMA,
            Arc::new(move |_: &Envelope| {
                if c.fetch_add(1, Ordering::Relaxed) == 0 {
                    // A new message arrives and the interrupt fires mid-drain
                    f.inject(StationId(2), StationId(104), 0, &[2]).unwrap();
                    if let Some(ms) = weak.upgrade() {
                        ms.fast_intr(CoreId(0));
                    }
                }
            }),
        )
        .unwrap();

        fabric.inject(StationId(1), StationId(104), 0, &[1]).unwrap();
        ms.fast_intr(CoreId(0));

        assert_eq!(ms.service_pending(CoreId(0)), Ok(2));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert_eq!(ms.thread_state(CoreId(0)), Some(IthreadState::Idle));
        assert_eq!(ms.counters(CoreId(0)).unwrap().passes.get(), 2);
        assert_eq!(
            fabric.ring(CoreId(0)).read_config() & CONFIG_INT_TYPE_MASK,
            0x02
        );
    }

    #[test]
    fn test_stray_interrupt_masked() {
        let (fabric, _sched, ms) = setup(BoardInfo::xlr());
        ms.enable_intr(CoreId(5)).unwrap();
        let before = C_MSGRING_BADINTR.get();

        assert_eq!(ms.fast_intr(CoreId(5)), IntrStatus::Stray);
        assert_eq!(fabric.ring(CoreId(5)).read_config() & CONFIG_INT_TYPE_MASK, 0);
        assert!(C_MSGRING_BADINTR.get() > before);
        assert_eq!(
            ms.service_pending(CoreId(5)),
            Err(MsgringError::NoThread(CoreId(5)))
        );
    }

    #[test]
    fn test_enable_disable_intr() {
        let (fabric, _sched, ms) = setup(BoardInfo::xlr());
        let ring = fabric.ring(CoreId(2));

        ms.enable_intr(CoreId(2)).unwrap();
        assert_eq!(ring.read_config(), 0x0106_0102);
        ms.disable_intr(CoreId(2)).unwrap();
        assert_eq!(ring.read_config(), 0x0106_0100);
    }

    #[test]
    fn test_send_uses_credits() {
        let (fabric, _sched, ms) = setup(BoardInfo::xlr());
        assert_eq!(
            ms.send(CoreId(0), StationId(9), 3, &[0xfeed]),
            Err(MsgringError::Send(TxError::NoCredit(StationId(9))))
        );

        ms.cpu_init(CoreId(0)).unwrap();
        for _ in 0..4 {
            ms.send(CoreId(0), StationId(9), 3, &[0xfeed]).unwrap();
        }
        assert_eq!(fabric.queued(StationId(9)), 4);
        assert!(ms.send(CoreId(0), StationId(9), 3, &[0xfeed]).is_err());
        assert_eq!(
            ms.send(CoreId(0), StationId(9), 3, &[]),
            Err(MsgringError::Send(TxError::BadSize(0)))
        );
    }
}
