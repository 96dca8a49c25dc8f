//! BLE Protocol Implementation
//!
//! Advertising, connection tracking and the GATT data service, written
//! against the narrow stack capability in [`stack`].

pub mod advertising;
pub mod connection;
pub mod gatt;
pub mod stack;
pub mod uuid;
