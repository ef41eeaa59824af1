//! Common types used across the message ring
//!
//! Identifiers for cores, cpus, stations and handler slots live here so the
//! drivers and the dispatch code can share them without circular imports.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Number of cores on the largest supported part
pub const MAX_CORES: usize = 8;

/// Hardware threads per core; cpu ids are `core * THREADS_PER_CORE + thread`
pub const THREADS_PER_CORE: usize = 4;

/// Buckets owned by each core's message station
pub const BUCKETS_PER_CORE: usize = 8;

/// Number of hardware station ids on the fabric
pub const MAX_STATIONS: usize = 128;

/// Credit-counter destinations programmed per core
pub const CC_DESTINATIONS: usize = 16;

/// Thread identifier handed out by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ThreadId(pub u64);

impl ThreadId {
    /// Create a new thread ID with a unique auto-incremented value
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ThreadId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Physical core number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CoreId(pub usize);

impl CoreId {
    /// Cpu id of hardware thread 0 on this core
    pub fn first_cpu(self) -> CpuId {
        CpuId(self.0 * THREADS_PER_CORE)
    }

    /// First hardware station owned by this core
    pub fn station_base(self) -> StationId {
        StationId((self.0 * BUCKETS_PER_CORE) as u8)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}

/// Logical cpu (hardware thread) number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CpuId(pub usize);

impl CpuId {
    /// Core this hardware thread lives on
    pub fn core(self) -> CoreId {
        CoreId(self.0 / THREADS_PER_CORE)
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Bucket index within one core's station (0..8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BucketId(pub u8);

impl BucketId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket{}", self.0)
    }
}

/// Hardware station id (0..128)
///
/// Stations 0..64 are the cpu buckets (`core * 8 + bucket`); the rest belong
/// to on-chip devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StationId(pub u8);

impl StationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Core owning this station, if it is a cpu bucket
    pub fn cpu_core(self) -> Option<CoreId> {
        let idx = self.index();
        if idx < MAX_CORES * BUCKETS_PER_CORE {
            Some(CoreId(idx / BUCKETS_PER_CORE))
        } else {
            None
        }
    }

    /// Bucket on the owning core, if it is a cpu bucket
    pub fn cpu_bucket(self) -> Option<BucketId> {
        self.cpu_core()
            .map(|_| BucketId((self.index() % BUCKETS_PER_CORE) as u8))
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stn{}", self.0)
    }
}

/// Handler slot a station is translated to ("transmit station")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TxStation(pub usize);

impl TxStation {
    pub const CPU_0: Self = Self(0);
    pub const CPU_1: Self = Self(1);
    pub const CPU_2: Self = Self(2);
    pub const CPU_3: Self = Self(3);
    pub const CPU_4: Self = Self(4);
    pub const CPU_5: Self = Self(5);
    pub const CPU_6: Self = Self(6);
    pub const CPU_7: Self = Self(7);
    /// Four-port GMAC block
    pub const GMAC: Self = Self(8);
    pub const DMA: Self = Self(9);
    pub const XGS_0: Self = Self(10);
    pub const XGS_1: Self = Self(11);
    /// Security acceleration engine
    pub const SAE: Self = Self(12);
    pub const GMAC0: Self = Self(13);
    pub const GMAC1: Self = Self(14);
    /// Compression/decompression engine
    pub const CDE: Self = Self(15);
    pub const PCIE: Self = Self(16);
    /// Stations with no owner map here; nothing should register it
    pub const INVALID: Self = Self(17);

    /// Slot for a cpu core
    pub fn cpu(core: CoreId) -> Self {
        Self(core.0)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TxStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx_stn{}", self.0)
    }
}
