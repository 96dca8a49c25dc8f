//! Application layer
//!
//! Shared state handed to the stack callbacks, button handling and the
//! control loop.

pub mod control;
pub mod input;
pub mod peripherals;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

use crate::ble::connection::ConnectionTracker;
use crate::ble::gatt::DataCharacteristic;
use crate::core::channel::{ByteChannel, DEFAULT_CAPACITY};
use input::PressCounter;

/// State shared between callback contexts and the control loop.
///
/// Constructed once at startup; callbacks receive a `&'static` to it.
pub struct SharedState<M: RawMutex, const N: usize> {
    /// Bytes written by the central, drained by the control loop
    pub channel: ByteChannel<M, N>,
    pub connection: ConnectionTracker,
    pub presses: PressCounter,
}

impl<M: RawMutex, const N: usize> SharedState<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: ByteChannel::new(),
            connection: ConnectionTracker::new(),
            presses: PressCounter::new(),
        }
    }

    /// GATT handlers bound to this state
    pub fn characteristic(&self) -> DataCharacteristic<'_, M, N> {
        DataCharacteristic::new(&self.channel, &self.presses)
    }
}

impl<M: RawMutex, const N: usize> Default for SharedState<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state as used by the firmware
pub type AppState = SharedState<CriticalSectionRawMutex, DEFAULT_CAPACITY>;
