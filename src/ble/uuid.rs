//! 128-bit UUID derivation
//!
//! Service and characteristic UUIDs are built from a fixed 128-bit base with
//! a 16-bit short code inserted at bytes 12-13 (little-endian), the layout
//! the SoftDevice and centrals expect for vendor UUIDs.

use core::fmt;

/// Base UUID `0000xxxx-0000-1000-8000-00805F9B34FB` in little-endian byte order
pub const UUID_BASE: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Byte offset of the 16-bit short code inside the base
pub const SHORT_CODE_OFFSET: usize = 12;

/// 128-bit UUID stored little-endian (over-the-air byte order)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uuid128(pub [u8; 16]);

impl Uuid128 {
    /// Insert `short` into `base` at bytes 12-13
    pub const fn from_base_and_short(base: &[u8; 16], short: u16) -> Self {
        let mut bytes = *base;
        let short_bytes = short.to_le_bytes();
        bytes[SHORT_CODE_OFFSET] = short_bytes[0];
        bytes[SHORT_CODE_OFFSET + 1] = short_bytes[1];
        Self(bytes)
    }

    /// Derive from the default base
    pub const fn from_short(short: u16) -> Self {
        Self::from_base_and_short(&UUID_BASE, short)
    }

    /// 16-bit short code carried at bytes 12-13
    pub const fn short(&self) -> u16 {
        u16::from_le_bytes([self.0[SHORT_CODE_OFFSET], self.0[SHORT_CODE_OFFSET + 1]])
    }

    /// Little-endian bytes as handed to the stack
    pub const fn as_le_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Canonical big-endian text form, e.g. `0000dead-0000-1000-8000-00805f9b34fb`
impl fmt::Display for Uuid128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().rev().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_code_inserted_at_offset_12() {
        let uuid = Uuid128::from_short(0xDEAD);
        assert_eq!(uuid.0[12], 0xAD);
        assert_eq!(uuid.0[13], 0xDE);
        assert_eq!(uuid.0[..12], UUID_BASE[..12]);
        assert_eq!(uuid.0[14..], [0x00, 0x00]);
        assert_eq!(uuid.short(), 0xDEAD);
    }

    #[test]
    fn test_custom_base() {
        let base = [
            0x00, 0x63, 0x4C, 0xF7, 0x6F, 0x05, 0x53, 0xB6,
            0xFB, 0x47, 0x75, 0x9E, 0x00, 0x00, 0xC8, 0xC3,
        ];
        let uuid = Uuid128::from_base_and_short(&base, 0x0001);

        assert_eq!(uuid.0[12], 0x01);
        assert_eq!(uuid.0[13], 0x00);
        assert_eq!(uuid.0[0], 0x00);
        assert_eq!(uuid.0[14], 0xC8);
        assert_eq!(uuid.0[15], 0xC3);
    }

    #[test]
    fn test_display_matches_canonical_form() {
        assert_eq!(
            Uuid128::from_short(0xDEAD).to_string(),
            "0000dead-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            Uuid128::from_short(0xBEEF).to_string(),
            "0000beef-0000-1000-8000-00805f9b34fb"
        );
    }
}
