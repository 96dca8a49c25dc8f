//! Board bindings
//!
//! nrf-softdevice implementations of the stack capability and embassy-nrf
//! drivers for the development kit buttons and LEDs. Only built with the
//! `firmware` feature.

pub mod dk;
pub mod softdevice;
