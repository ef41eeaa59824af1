//! Error types for the message ring using thiserror

use thiserror::Error;

use crate::types::{BucketId, CoreId, StationId, TxStation};

/// Errors returned by registration, configuration and thread setup
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgringError {
    #[error("transmit station {0} out of range")]
    InvalidStation(TxStation),

    #[error("no credit configuration for {0}")]
    NoCreditConfig(CoreId),

    #[error("{0} has no message ring")]
    NoSuchCore(CoreId),

    #[error("interrupt thread already created on {0}")]
    ThreadExists(CoreId),

    #[error("failed to create interrupt thread on {0}")]
    ThreadCreate(CoreId),

    #[error("no interrupt thread running on {0}")]
    NoThread(CoreId),

    #[error("send failed: {0}")]
    Send(#[from] TxError),
}

/// Failure reported by a bucket receive
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    #[error("{0} empty")]
    Empty(BucketId),

    #[error("receive error on {bucket}, status {status:#x}")]
    Hardware { bucket: BucketId, status: u32 },
}

/// Failure reported by a message send
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    #[error("no credit for {0}")]
    NoCredit(StationId),

    #[error("destination {0} full")]
    Full(StationId),

    #[error("invalid message size {0}")]
    BadSize(usize),
}
