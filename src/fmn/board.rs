//! Board description: station map, bucket sizes, credit counters
//!
//! Every hardware station belongs to a transmit-station slot (the handler
//! the dispatch loop calls for messages from it). Each core programs the
//! sizes of its eight buckets and its credit counters, one per destination
//! station, from the tables here.

use core::ops::Range;

use crate::error::MsgringError;
use crate::types::{
    CoreId, StationId, TxStation, BUCKETS_PER_CORE, CC_DESTINATIONS, MAX_CORES, MAX_STATIONS,
};

/// Credit counters for one core: `counters[dest][bucket]` is the credit
/// this core holds for station `dest * 8 + bucket`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditConfig {
    pub counters: [[u8; BUCKETS_PER_CORE]; CC_DESTINATIONS],
}

impl CreditConfig {
    pub const fn zeroed() -> Self {
        Self {
            counters: [[0; BUCKETS_PER_CORE]; CC_DESTINATIONS],
        }
    }
}

/// Static description of one board's messaging fabric
#[derive(Debug, Clone)]
pub struct BoardInfo {
    pub name: &'static str,
    msgmap: [TxStation; MAX_STATIONS],
    bucket_sizes: [u8; MAX_STATIONS],
    credit_configs: [Option<CreditConfig>; MAX_CORES],
}

impl BoardInfo {
    /// A board with every station unmapped and no credit tables
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            msgmap: [TxStation::INVALID; MAX_STATIONS],
            bucket_sizes: [0; MAX_STATIONS],
            credit_configs: [None; MAX_CORES],
        }
    }

    /// XLR: eight cores, two XGMAC blocks, GMAC, DMA, CDE, PCIe, SAE
    pub fn xlr() -> Self {
        let mut board = Self::empty("xlr");
        board.map_cpu_stations(MAX_CORES);
        board.map_range(64..80, TxStation::XGS_0, 16);
        board.map_range(80..96, TxStation::XGS_1, 16);
        board.map_range(96..104, TxStation::GMAC, 16);
        board.map_range(104..108, TxStation::DMA, 8);
        board.map_range(108..112, TxStation::CDE, 8);
        board.map_range(116..120, TxStation::PCIE, 8);
        board.map_range(120..128, TxStation::SAE, 8);
        board.fill_credit_configs(MAX_CORES);
        board
    }

    /// XLS: four cores, two GMAC blocks, DMA, CDE, PCIe, SAE
    pub fn xls() -> Self {
        let mut board = Self::empty("xls");
        board.map_cpu_stations(4);
        board.map_range(64..80, TxStation::GMAC1, 16);
        board.map_range(96..104, TxStation::GMAC0, 16);
        board.map_range(104..108, TxStation::DMA, 8);
        board.map_range(108..112, TxStation::CDE, 8);
        board.map_range(116..120, TxStation::PCIE, 8);
        board.map_range(120..128, TxStation::SAE, 8);
        board.fill_credit_configs(4);
        board
    }

    fn map_cpu_stations(&mut self, cores: usize) {
        for core in 0..cores.min(MAX_CORES) {
            let base = CoreId(core).station_base().index();
            self.map_range(base..base + BUCKETS_PER_CORE, TxStation::cpu(CoreId(core)), 32);
        }
    }

    /// Map a station range to `slot` with the given bucket size
    pub fn map_range(&mut self, stations: Range<usize>, slot: TxStation, size: u8) {
        for stn in stations.take_while(|s| *s < MAX_STATIONS) {
            self.msgmap[stn] = slot;
            self.bucket_sizes[stn] = size;
        }
    }

    /// Split every station's bucket evenly between the cores that send to it
    fn fill_credit_configs(&mut self, cores: usize) {
        let cores = cores.clamp(1, MAX_CORES);
        let mut cc = CreditConfig::zeroed();
        for (stn, size) in self.bucket_sizes.iter().enumerate() {
            let share = if *size == 0 {
                0
            } else {
                (*size as usize / cores).max(1) as u8
            };
            cc.counters[stn / BUCKETS_PER_CORE][stn % BUCKETS_PER_CORE] = share;
        }
        for core in 0..cores {
            self.credit_configs[core] = Some(cc);
        }
    }

    /// Handler slot for messages from `source`
    pub fn tx_station(&self, source: StationId) -> TxStation {
        self.msgmap
            .get(source.index())
            .copied()
            .unwrap_or(TxStation::INVALID)
    }

    /// Bucket size for a station
    pub fn bucket_size(&self, station: StationId) -> u8 {
        self.bucket_sizes.get(station.index()).copied().unwrap_or(0)
    }

    /// Bucket sizes of the eight buckets owned by `core`
    pub fn core_bucket_sizes(&self, core: CoreId) -> Result<&[u8], MsgringError> {
        if core.0 >= MAX_CORES {
            return Err(MsgringError::NoSuchCore(core));
        }
        let base = core.station_base().index();
        Ok(&self.bucket_sizes[base..base + BUCKETS_PER_CORE])
    }

    /// Credit-counter table for `core`
    pub fn credit_config(&self, core: CoreId) -> Result<&CreditConfig, MsgringError> {
        self.credit_configs
            .get(core.0)
            .and_then(Option::as_ref)
            .ok_or(MsgringError::NoCreditConfig(core))
    }

    /// Replace (or remove) the credit table of `core`
    pub fn set_credit_config(&mut self, core: CoreId, config: Option<CreditConfig>) {
        if let Some(entry) = self.credit_configs.get_mut(core.0) {
            *entry = config;
        }
    }
}
