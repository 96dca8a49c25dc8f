//! GATT Service Definition
//!
//! One primary service with one characteristic (write without response +
//! read). Writes are appended to the byte channel as a stream; reads return
//! the press counter, little-endian, windowed by the ATT offset.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::app::input::PressCounter;
use crate::ble::uuid::Uuid128;
use crate::config::Config;
use crate::core::channel::{ByteChannel, ChannelError};
use crate::core::error::AttError;

/// Characteristic properties (matches BLE specification)
pub mod char_properties {
    pub const BROADCAST: u8 = 0x01;
    pub const READ: u8 = 0x02;
    pub const WRITE_WITHOUT_RESPONSE: u8 = 0x04;
    pub const WRITE: u8 = 0x08;
    pub const NOTIFY: u8 = 0x10;
    pub const INDICATE: u8 = 0x20;
}

/// Write flags delivered with a write callback
pub mod write_flags {
    /// Prepare Write Request: validate only, data arrives again on execute
    pub const PREPARE: u8 = 0x01;
    /// Write Command (no response expected by the peer)
    pub const CMD: u8 = 0x02;
    /// Execute Write Request
    pub const EXECUTE: u8 = 0x04;
}

/// Length of the readable characteristic value
pub const READ_VALUE_LEN: usize = 2;

/// Service and characteristic identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceDescriptor {
    pub service_uuid: Uuid128,
    pub char_uuid: Uuid128,
    pub properties: u8,
}

impl ServiceDescriptor {
    pub const fn new(config: &Config) -> Self {
        Self {
            service_uuid: Uuid128::from_short(config.service_uuid16),
            char_uuid: Uuid128::from_short(config.char_uuid16),
            properties: char_properties::WRITE_WITHOUT_RESPONSE | char_properties::READ,
        }
    }
}

/// Copy `value[offset..]` into `buf`, truncated to `buf.len()`.
///
/// `offset == value.len()` is a valid empty read (end of an ATT long read);
/// anything beyond is an invalid offset.
pub fn read_window(value: &[u8], buf: &mut [u8], offset: usize) -> Result<usize, AttError> {
    if offset > value.len() {
        return Err(AttError::ReadWindow {
            offset,
            len: value.len(),
        });
    }
    let window = &value[offset..];
    let n = window.len().min(buf.len());
    buf[..n].copy_from_slice(&window[..n]);
    Ok(n)
}

/// Read/write handlers bound to the shared channel and counter
pub struct DataCharacteristic<'a, M: RawMutex, const N: usize> {
    channel: &'a ByteChannel<M, N>,
    counter: &'a PressCounter,
}

impl<'a, M: RawMutex, const N: usize> DataCharacteristic<'a, M, N> {
    pub const fn new(channel: &'a ByteChannel<M, N>, counter: &'a PressCounter) -> Self {
        Self { channel, counter }
    }

    /// Write callback.
    ///
    /// All of `data` is enqueued or none of it. `offset` is ignored: the
    /// characteristic is a byte stream, not a positional value. Returns the
    /// number of bytes accepted.
    pub fn on_write(&self, data: &[u8], offset: usize, flags: u8) -> Result<usize, AttError> {
        debug!(
            "Writing characteristic: {} bytes (offset {}, flags {:#04x})",
            data.len(),
            offset,
            flags
        );

        if flags & write_flags::PREPARE != 0 {
            // Authorization only; the bytes are delivered again on execute
            let free = self.channel.free();
            if data.len() > free {
                warn!("Prepared write of {} bytes does not fit ({} free)", data.len(), free);
                return Err(AttError::InsufficientQueueSpace {
                    requested: data.len(),
                    free,
                });
            }
            return Ok(0);
        }

        match self.channel.push_all(data) {
            Ok(()) => Ok(data.len()),
            Err(ChannelError::InsufficientSpace { requested, free }) => {
                warn!("Write rejected: {} bytes, {} free", requested, free);
                Err(AttError::InsufficientQueueSpace { requested, free })
            }
        }
    }

    /// Read callback: press counter, little-endian, windowed by `offset`
    pub fn on_read(&self, buf: &mut [u8], offset: usize) -> Result<usize, AttError> {
        debug!("Reading characteristic (offset {}, len {})", offset, buf.len());
        read_window(&self.read_value(), buf, offset)
    }

    /// Current readable value
    pub fn read_value(&self) -> [u8; READ_VALUE_LEN] {
        self.counter.get().to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    use super::*;

    #[test]
    fn test_descriptor_uuids() {
        let desc = ServiceDescriptor::new(&Config::DEFAULT);
        assert_eq!(desc.service_uuid.short(), 0xDEAD);
        assert_eq!(desc.char_uuid.short(), 0xBEEF);
        assert_ne!(desc.service_uuid, desc.char_uuid);
        assert_eq!(desc.properties, 0x06);
    }

    #[test]
    fn test_read_window_edges() {
        let value = [0x34, 0x12];
        let mut buf = [0u8; 4];

        assert_eq!(read_window(&value, &mut buf, 0), Ok(2));
        assert_eq!(buf[..2], [0x34, 0x12]);

        assert_eq!(read_window(&value, &mut buf, 1), Ok(1));
        assert_eq!(buf[0], 0x12);

        assert_eq!(read_window(&value, &mut buf, 2), Ok(0));
        assert_eq!(
            read_window(&value, &mut buf, 3),
            Err(AttError::ReadWindow { offset: 3, len: 2 })
        );

        // Buffer shorter than the value truncates
        let mut short = [0u8; 1];
        assert_eq!(read_window(&value, &mut short, 0), Ok(1));
        assert_eq!(short, [0x34]);
    }

    #[test]
    fn test_prepare_write_does_not_enqueue() {
        let channel = ByteChannel::<CriticalSectionRawMutex, 4>::new();
        let counter = PressCounter::new();
        let chr = DataCharacteristic::new(&channel, &counter);

        assert_eq!(chr.on_write(&[1, 2, 3], 0, write_flags::PREPARE), Ok(0));
        assert!(channel.is_empty());

        assert_eq!(
            chr.on_write(&[1, 2, 3, 4, 5], 0, write_flags::PREPARE),
            Err(AttError::InsufficientQueueSpace { requested: 5, free: 4 })
        );
    }

    #[test]
    fn test_offset_is_ignored_for_writes() {
        let channel = ByteChannel::<CriticalSectionRawMutex, 4>::new();
        let counter = PressCounter::new();
        let chr = DataCharacteristic::new(&channel, &counter);

        chr.on_write(&[9], 0, write_flags::CMD).unwrap();
        chr.on_write(&[8], 5, write_flags::CMD).unwrap();
        assert_eq!(channel.try_pop(), Some(9));
        assert_eq!(channel.try_pop(), Some(8));
    }
}
