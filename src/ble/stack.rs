//! BLE stack capability
//!
//! The narrow surface the core needs from the radio and link layer. The
//! firmware implements it over nrf-softdevice; tests implement it with mocks.

use crate::config::Config;
use crate::core::error::StackError;

/// Advertising set parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvParams {
    /// Accept connections while advertising
    pub connectable: bool,
    /// Advertise the GAP device name
    pub use_name: bool,
    /// Advertise with the identity address instead of a private one
    pub use_identity: bool,
    /// Advertising interval minimum (0.625ms units)
    pub interval_min: u16,
    /// Advertising interval maximum (0.625ms units)
    pub interval_max: u16,
}

impl AdvParams {
    /// Connectable, named, identity-addressed fast advertising
    pub const fn connectable_fast(config: &Config) -> Self {
        Self {
            connectable: true,
            use_name: true,
            use_identity: true,
            interval_min: config.adv_interval_min,
            interval_max: config.adv_interval_max,
        }
    }
}

/// Radio bring-up
pub trait Radio {
    fn enable(&mut self) -> Result<(), StackError>;
}

/// Extended advertising set operations
pub trait AdvertisingStack {
    /// Opaque advertising set handle
    type Handle: Copy;

    /// Create an advertising set with `params`
    fn create(&mut self, params: &AdvParams) -> Result<Self::Handle, StackError>;

    /// Replace the advertising data of an existing set.
    ///
    /// The stack copies `data`; the slice does not need to outlive the call.
    fn set_data(&mut self, handle: Self::Handle, data: &[u8]) -> Result<(), StackError>;

    /// Start advertising on an existing set
    fn start(&mut self, handle: Self::Handle) -> Result<(), StackError>;
}

impl<T: AdvertisingStack> AdvertisingStack for &mut T {
    type Handle = T::Handle;

    fn create(&mut self, params: &AdvParams) -> Result<Self::Handle, StackError> {
        (**self).create(params)
    }

    fn set_data(&mut self, handle: Self::Handle, data: &[u8]) -> Result<(), StackError> {
        (**self).set_data(handle, data)
    }

    fn start(&mut self, handle: Self::Handle) -> Result<(), StackError> {
        (**self).start(handle)
    }
}
