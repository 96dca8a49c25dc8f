//! Core System Infrastructure
//!
//! Building blocks that are not BLE-specific: the bounded byte channel shared
//! between callback and control-loop contexts, and the error taxonomy.

pub mod channel;
pub mod error;
