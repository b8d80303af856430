/// A 128-bit service or characteristic identifier.
///
/// Stored big-endian so the textual ordering matches the wire registry form.
/// 16-bit assigned numbers expand onto the Bluetooth base UUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uuid([u8; 16]);

/// The Bluetooth base UUID, `00000000-0000-1000-8000-00805F9B34FB`
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

impl Uuid {
    /// Create an identifier from a full 128-bit value
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Expand a 16-bit assigned number onto the Bluetooth base UUID
    #[must_use]
    pub const fn from_u16(short: u16) -> Self {
        Self::from_u128(BASE_UUID | ((short as u128) << 96))
    }

    /// Create an identifier from raw big-endian bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw big-endian bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Uuid {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl From<u16> for Uuid {
    fn from(short: u16) -> Self {
        Self::from_u16(short)
    }
}

impl core::fmt::Display for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    #[test]
    fn test_uuid_short_form_expansion() {
        let short = Uuid::from_u16(0xFFE0);
        let full = Uuid::from_u128(0x0000_FFE0_0000_1000_8000_0080_5F9B_34FB);
        assert_eq!(short, full);
    }

    #[test]
    fn test_uuid_display_format() {
        let mut rendered: String<36> = String::new();
        core::fmt::write(
            &mut rendered,
            format_args!("{}", Uuid::from_u16(0x180A)),
        )
        .unwrap();
        assert_eq!(rendered.as_str(), "0000180A-0000-1000-8000-00805F9B34FB");
    }

    #[test]
    fn test_uuid_vendor_range_roundtrip() {
        let vendor = Uuid::from_u128(0x6E40_0001_B5A3_F393_E0A9_E50E_24DC_CA9E);
        assert_eq!(
            vendor.as_bytes(),
            &[
                0x6E, 0x40, 0x00, 0x01, 0xB5, 0xA3, 0xF3, 0x93, 0xE0, 0xA9, 0xE5, 0x0E, 0x24,
                0xDC, 0xCA, 0x9E,
            ]
        );
        assert_eq!(Uuid::from_bytes(*vendor.as_bytes()), vendor);
    }

    #[test]
    fn test_uuid_inequality() {
        assert_ne!(Uuid::from_u16(0xFFE0), Uuid::from_u16(0xFFE1));
        assert_ne!(
            Uuid::from_u16(0x0001),
            Uuid::from_u128(0x0000_0001_0000_0000_0000_0000_0000_0000)
        );
    }
}
