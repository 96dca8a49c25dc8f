#![cfg_attr(not(test), no_std)]

//! nRF52820 S140 BLE Data Peripheral Library
//!
//! Advertises a custom GATT service, accepts a single connection and
//! exchanges bytes through one read/write characteristic backed by a bounded
//! queue. Organized into layers:
//!
//! - `core`: bounded byte channel and error taxonomy
//! - `ble`: advertising, connection tracking, GATT data service
//! - `app`: shared state, button input, control loop
//! - `board` (feature `firmware`): nrf-softdevice and embassy-nrf bindings

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod app;
pub mod ble;
pub mod config;
pub mod core;

#[cfg(feature = "firmware")]
pub mod board;
