//! Error taxonomy
//!
//! Stack and peripheral failures are fatal during startup and logged during
//! steady state. ATT errors are reported to the remote peer.

/// ATT error code: Invalid Offset
pub const ATT_ERR_INVALID_OFFSET: u8 = 0x07;

/// ATT error code: Insufficient Resources
pub const ATT_ERR_INSUFFICIENT_RESOURCES: u8 = 0x11;

/// BLE stack operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackOp {
    /// Radio / SoftDevice enable
    Enable,
    /// Advertising set creation
    CreateSet,
    /// Advertising data assignment
    SetData,
    /// Advertising start
    Start,
}

/// Underlying BLE stack operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackError {
    pub op: StackOp,
    /// Stack specific error code (SoftDevice NRF_ERROR_* or errno style)
    pub code: u32,
}

impl StackError {
    pub const fn new(op: StackOp, code: u32) -> Self {
        Self { op, code }
    }
}

/// Stack error code used when an advertising operation targets a set that was never created
pub const STACK_ERR_NOT_INITIALIZED: u32 = 0x8;

/// Errors surfaced to the remote peer as ATT protocol errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttError {
    /// Write does not fit in the remaining queue space; nothing was enqueued
    InsufficientQueueSpace { requested: usize, free: usize },
    /// Read offset lies beyond the end of the characteristic value
    ReadWindow { offset: usize, len: usize },
}

impl AttError {
    /// ATT protocol error code reported to the central
    pub const fn att_code(&self) -> u8 {
        match self {
            AttError::InsufficientQueueSpace { .. } => ATT_ERR_INSUFFICIENT_RESOURCES,
            AttError::ReadWindow { .. } => ATT_ERR_INVALID_OFFSET,
        }
    }
}

/// Peripheral driver that failed to initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Device {
    Buttons,
    Leds,
}

/// LED or button driver initialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralInitError {
    pub device: Device,
    pub code: u32,
}

impl PeripheralInitError {
    pub const fn new(device: Device, code: u32) -> Self {
        Self { device, code }
    }
}

/// Top level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Stack(StackError),
    Att(AttError),
    PeripheralInit(PeripheralInitError),
}

impl From<StackError> for Error {
    fn from(err: StackError) -> Self {
        Error::Stack(err)
    }
}

impl From<AttError> for Error {
    fn from(err: AttError) -> Self {
        Error::Att(err)
    }
}

impl From<PeripheralInitError> for Error {
    fn from(err: PeripheralInitError) -> Self {
        Error::PeripheralInit(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_att_codes() {
        let full = AttError::InsufficientQueueSpace { requested: 17, free: 16 };
        assert_eq!(full.att_code(), 0x11);

        let window = AttError::ReadWindow { offset: 3, len: 2 };
        assert_eq!(window.att_code(), 0x07);
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = StackError::new(StackOp::Start, 0x12).into();
        assert_eq!(err, Error::Stack(StackError { op: StackOp::Start, code: 0x12 }));

        let err: Error = PeripheralInitError::new(Device::Leds, 5).into();
        assert!(matches!(err, Error::PeripheralInit(e) if e.device == Device::Leds));
    }
}
