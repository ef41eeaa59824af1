//! Transmit-station handler registry
//!
//! One slot per transmit station. Registration overwrites (last one wins);
//! there is no unregister. The dispatch loop clones the handler out of the
//! slot and calls it with the slot lock released.

use alloc::sync::Arc;
use spin::Mutex;

use crate::error::MsgringError;
use crate::message::Envelope;
use crate::types::TxStation;

/// Number of transmit-station slots
pub const MAX_TX_STNS: usize = 18;

/// Receiver of messages from one transmit station
///
/// The handler's own state plays the part of the per-registration context.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, env: &Envelope);
}

impl<F> MessageHandler for F
where
    F: Fn(&Envelope) + Send + Sync,
{
    fn handle(&self, env: &Envelope) {
        self(env)
    }
}

/// A plain function plus a context value, for drivers that keep their
/// state in a separate softc-like structure
pub struct FnHandler<C> {
    action: fn(&Envelope, &C),
    context: C,
}

impl<C: Send + Sync> FnHandler<C> {
    pub fn new(action: fn(&Envelope, &C), context: C) -> Self {
        Self { action, context }
    }
}

impl<C: Send + Sync> MessageHandler for FnHandler<C> {
    fn handle(&self, env: &Envelope) {
        (self.action)(env, &self.context)
    }
}

type Slot = Option<Arc<dyn MessageHandler>>;

/// Handler table indexed by transmit station
pub struct HandlerRegistry {
    slots: Mutex<[Slot; MAX_TX_STNS]>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(core::array::from_fn(|_| None)),
        }
    }

    /// Install `handler` for `station`
    ///
    /// Returns true if a previous handler was replaced.
    pub fn register(
        &self,
        station: TxStation,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<bool, MsgringError> {
        let mut slots = self.slots.lock();
        let slot = slots
            .get_mut(station.index())
            .ok_or(MsgringError::InvalidStation(station))?;
        Ok(slot.replace(handler).is_some())
    }

    /// Handler for `station`, if one is registered
    pub fn lookup(&self, station: TxStation) -> Option<Arc<dyn MessageHandler>> {
        self.slots.lock().get(station.index()).and_then(Clone::clone)
    }

    pub fn is_registered(&self, station: TxStation) -> bool {
        self.slots
            .lock()
            .get(station.index())
            .is_some_and(Option::is_some)
    }

    /// Number of occupied slots
    pub fn registered_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered", &self.registered_count())
            .finish()
    }
}
