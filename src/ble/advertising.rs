//! BLE Advertising Manager
//!
//! Owns the advertising parameters, the advertisement payload and the
//! advertising set handle. The payload is serialized by hand so the wire
//! layout is exact regardless of target:
//!
//! ```text
//! 02 01 06             flags: LE general discoverable | BR/EDR not supported
//! 03 02 AD DE          incomplete list of 16-bit service UUIDs
//! 05 FF 59 00 cc cc    manufacturer data: vendor id, press counter (LE)
//! ```

use heapless::Vec;

use crate::ble::stack::{AdvParams, AdvertisingStack};
use crate::config::{Config, StartFailurePolicy};
use crate::core::error::{StackError, StackOp, STACK_ERR_NOT_INITIALIZED};

/// AD type: Flags
pub const AD_TYPE_FLAGS: u8 = 0x01;
/// AD type: Incomplete List of 16-bit Service UUIDs
pub const AD_TYPE_UUID16_INCOMPLETE: u8 = 0x02;
/// AD type: Complete Local Name
pub const AD_TYPE_COMPLETE_NAME: u8 = 0x09;
/// AD type: Manufacturer Specific Data
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// LE General Discoverable Mode
pub const FLAG_LE_GENERAL_DISC: u8 = 0x02;
/// BR/EDR Not Supported
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Manufacturer data body: vendor id + counter
pub const MANUFACTURER_DATA_LEN: usize = 4;

/// Encoded advertisement length (three AD structures)
pub const ADV_PAYLOAD_LEN: usize = 3 + 4 + 2 + MANUFACTURER_DATA_LEN;

/// Maximum legacy advertising data length (BLE specification)
pub const MAX_ADV_DATA_LEN: usize = 31;

/// Vendor specific advertisement body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManufacturerData {
    pub vendor_id: u16,
    pub counter: u16,
}

impl ManufacturerData {
    pub fn encode(&self) -> [u8; MANUFACTURER_DATA_LEN] {
        let vendor = self.vendor_id.to_le_bytes();
        let counter = self.counter.to_le_bytes();
        [vendor[0], vendor[1], counter[0], counter[1]]
    }

    pub fn decode(data: &[u8]) -> Option<Self> {
        match data {
            [v0, v1, c0, c1] => Some(Self {
                vendor_id: u16::from_le_bytes([*v0, *v1]),
                counter: u16::from_le_bytes([*c0, *c1]),
            }),
            _ => None,
        }
    }
}

/// Advertisement payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisementPayload {
    pub flags: u8,
    pub service_uuid16: u16,
    pub manufacturer: ManufacturerData,
}

impl AdvertisementPayload {
    pub const fn new(config: &Config) -> Self {
        Self {
            flags: FLAG_LE_GENERAL_DISC | FLAG_BR_EDR_NOT_SUPPORTED,
            service_uuid16: config.service_uuid16,
            manufacturer: ManufacturerData {
                vendor_id: config.vendor_id,
                counter: 0,
            },
        }
    }

    /// Serialize to AD structures
    pub fn encode(&self) -> [u8; ADV_PAYLOAD_LEN] {
        let uuid = self.service_uuid16.to_le_bytes();
        let mfg = self.manufacturer.encode();
        [
            2,
            AD_TYPE_FLAGS,
            self.flags,
            3,
            AD_TYPE_UUID16_INCOMPLETE,
            uuid[0],
            uuid[1],
            1 + MANUFACTURER_DATA_LEN as u8,
            AD_TYPE_MANUFACTURER_DATA,
            mfg[0],
            mfg[1],
            mfg[2],
            mfg[3],
        ]
    }

    /// Parse AD structures back into a payload.
    ///
    /// Unknown AD types are skipped; all three fields must be present.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let mut flags = None;
        let mut service_uuid16 = None;
        let mut manufacturer = None;

        for (ad_type, body) in AdStructures::new(data) {
            match (ad_type, body) {
                (AD_TYPE_FLAGS, [f]) => flags = Some(*f),
                (AD_TYPE_UUID16_INCOMPLETE, [lo, hi, ..]) => {
                    service_uuid16 = Some(u16::from_le_bytes([*lo, *hi]))
                }
                (AD_TYPE_MANUFACTURER_DATA, body) => manufacturer = ManufacturerData::decode(body),
                _ => {}
            }
        }

        Some(Self {
            flags: flags?,
            service_uuid16: service_uuid16?,
            manufacturer: manufacturer?,
        })
    }
}

/// Iterator over `(type, body)` AD structures; stops at the first malformed entry
pub struct AdStructures<'a> {
    data: &'a [u8],
}

impl<'a> AdStructures<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.data.split_first()?;
        let len = len as usize;
        if len == 0 || len > rest.len() {
            self.data = &[];
            return None;
        }
        let (entry, rest) = rest.split_at(len);
        self.data = rest;
        Some((entry[0], &entry[1..]))
    }
}

/// Complete Local Name AD structure, truncated to fit one advertising packet
pub fn complete_name_ad(name: &str) -> Vec<u8, MAX_ADV_DATA_LEN> {
    let name = name.as_bytes();
    let len = name.len().min(MAX_ADV_DATA_LEN - 2);

    let mut ad = Vec::new();
    // Lengths are bounded by MAX_ADV_DATA_LEN above
    let _ = ad.push(len as u8 + 1);
    let _ = ad.push(AD_TYPE_COMPLETE_NAME);
    let _ = ad.extend_from_slice(&name[..len]);
    ad
}

/// Outcome of a successful `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingStatus {
    /// The set is created and advertising
    Advertising,
    /// The set is created and holds data but start failed; boot continues
    Deferred(StackError),
}

/// Advertising manager
pub struct AdvertisingManager<S: AdvertisingStack> {
    stack: S,
    params: AdvParams,
    payload: AdvertisementPayload,
    handle: Option<S::Handle>,
    start_failure: StartFailurePolicy,
}

impl<S: AdvertisingStack> AdvertisingManager<S> {
    pub fn new(stack: S, config: &Config) -> Self {
        Self {
            stack,
            params: AdvParams::connectable_fast(config),
            payload: AdvertisementPayload::new(config),
            handle: None,
            start_failure: config.start_failure,
        }
    }

    /// Create the advertising set, assign the payload and start advertising
    pub fn initialize(&mut self) -> Result<AdvertisingStatus, StackError> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = self.stack.create(&self.params).map_err(|e| {
                    error!("Failed to create advertising set: {}", e);
                    e
                })?;
                self.handle = Some(handle);
                handle
            }
        };

        debug!("Setting advertising data");
        self.stack.set_data(handle, &self.payload.encode()).map_err(|e| {
            error!("Failed to set advertising data: {}", e);
            e
        })?;

        debug!("Starting advertising");
        match self.stack.start(handle) {
            Ok(()) => {
                info!("Advertising started");
                Ok(AdvertisingStatus::Advertising)
            }
            Err(e) => match self.start_failure {
                StartFailurePolicy::Tolerate => {
                    warn!("Failed to start advertising set, continuing boot: {}", e);
                    Ok(AdvertisingStatus::Deferred(e))
                }
                StartFailurePolicy::Abort => {
                    error!("Failed to start advertising set: {}", e);
                    Err(e)
                }
            },
        }
    }

    /// Re-apply the current payload to the existing set
    pub fn refresh(&mut self) -> Result<(), StackError> {
        let handle = self.require_handle(StackOp::SetData)?;
        self.stack.set_data(handle, &self.payload.encode())
    }

    /// Start advertising again on the existing set (e.g. after a disconnect)
    pub fn restart(&mut self) -> Result<(), StackError> {
        let handle = self.require_handle(StackOp::Start)?;
        self.stack.start(handle)
    }

    /// Update the counter field; call `refresh` to publish it
    pub fn set_counter(&mut self, counter: u16) {
        self.payload.manufacturer.counter = counter;
    }

    pub fn counter(&self) -> u16 {
        self.payload.manufacturer.counter
    }

    pub fn payload(&self) -> &AdvertisementPayload {
        &self.payload
    }

    pub fn params(&self) -> &AdvParams {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    fn require_handle(&self, op: StackOp) -> Result<S::Handle, StackError> {
        self.handle.ok_or(StackError::new(op, STACK_ERR_NOT_INITIALIZED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_layout() {
        let mut payload = AdvertisementPayload::new(&Config::DEFAULT);
        payload.manufacturer.counter = 0x1234;

        assert_eq!(
            payload.encode(),
            [0x02, 0x01, 0x06, 0x03, 0x02, 0xAD, 0xDE, 0x05, 0xFF, 0x59, 0x00, 0x34, 0x12]
        );
        assert!(ADV_PAYLOAD_LEN <= MAX_ADV_DATA_LEN);
    }

    #[test]
    fn test_decode_skips_unknown_structures() {
        let data = [
            0x02, 0x01, 0x06, // flags
            0x04, AD_TYPE_COMPLETE_NAME, b'a', b'b', b'c', // name
            0x03, 0x02, 0xAD, 0xDE, // uuid16
            0x05, 0xFF, 0x59, 0x00, 0x07, 0x00, // manufacturer data
        ];
        let payload = AdvertisementPayload::decode(&data).unwrap();

        assert_eq!(payload.flags, 0x06);
        assert_eq!(payload.service_uuid16, 0xDEAD);
        assert_eq!(payload.manufacturer, ManufacturerData { vendor_id: 0x0059, counter: 7 });
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let payload = AdvertisementPayload::new(&Config::DEFAULT).encode();
        assert!(AdvertisementPayload::decode(&payload[..ADV_PAYLOAD_LEN - 1]).is_none());
        assert!(AdvertisementPayload::decode(&[]).is_none());
    }

    #[test]
    fn test_complete_name_ad() {
        let ad = complete_name_ad("BLE_Lab");
        assert_eq!(ad.as_slice(), &[8, 0x09, b'B', b'L', b'E', b'_', b'L', b'a', b'b']);

        let long = complete_name_ad("a device name that is far too long for one packet");
        assert_eq!(long.len(), MAX_ADV_DATA_LEN);
        assert_eq!(long[0] as usize, MAX_ADV_DATA_LEN - 1);
    }

    #[test]
    fn test_manufacturer_data_length_checked() {
        assert!(ManufacturerData::decode(&[0x59, 0x00, 0x01]).is_none());
        assert_eq!(
            ManufacturerData::decode(&[0x59, 0x00, 0x01, 0x02]),
            Some(ManufacturerData { vendor_id: 0x0059, counter: 0x0201 })
        );
    }
}
