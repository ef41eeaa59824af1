//! Message ring messages
//!
//! A message is one to four 64-bit words. The fabric delivers it into a
//! bucket together with a size, an 8-bit code and the station it came from.

use crate::error::TxError;
use crate::types::{BucketId, StationId};

/// Maximum payload words in one message
pub const MSG_MAX_WORDS: usize = 4;

/// Message payload (`msg0..msg3`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message {
    pub words: [u64; MSG_MAX_WORDS],
}

impl Message {
    /// Create a message from up to four words; missing words are zero
    pub fn from_words(words: &[u64]) -> Result<Self, TxError> {
        if words.is_empty() || words.len() > MSG_MAX_WORDS {
            return Err(TxError::BadSize(words.len()));
        }
        let mut msg = Self::default();
        msg.words[..words.len()].copy_from_slice(words);
        Ok(msg)
    }

    /// Single-word message
    pub const fn single(msg0: u64) -> Self {
        Self {
            words: [msg0, 0, 0, 0],
        }
    }

    pub fn msg0(&self) -> u64 {
        self.words[0]
    }
}

/// A received message with the delivery metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Bucket the message was popped from
    pub bucket: BucketId,
    /// Valid payload words (1..=4)
    pub size: usize,
    /// Software-defined message code
    pub code: u8,
    /// Station that sent the message
    pub source: StationId,
    pub msg: Message,
}

impl Envelope {
    /// Only the valid payload words
    pub fn payload(&self) -> &[u64] {
        &self.msg.words[..self.size.min(MSG_MAX_WORDS)]
    }
}
