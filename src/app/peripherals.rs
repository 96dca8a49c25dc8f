//! Board peripheral interfaces
//!
//! Button and LED drivers are external collaborators; the control loop only
//! needs initialization and fire-and-forget LED requests.

use crate::core::error::PeripheralInitError;

/// LEDs driven by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    /// Connection status and disconnect flash sequence
    Status,
    /// Reflects the last byte written by the central
    Data,
}

/// Button driver
pub trait Buttons {
    fn init(&mut self) -> Result<(), PeripheralInitError>;
}

/// LED driver
pub trait Leds {
    fn init(&mut self) -> Result<(), PeripheralInitError>;

    fn set(&mut self, led: Led, on: bool);

    /// Reflect one byte received from the central: non-zero lights the data LED
    fn show_byte(&mut self, byte: u8) {
        self.set(Led::Data, byte != 0);
    }
}
