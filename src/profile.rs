//! Device Profile Catalog
//!
//! Static protocol parameters for the BLE serial module families the engine
//! knows how to talk to. A profile names the service that identifies the
//! family, the characteristics carrying each direction of the byte pipe,
//! the command terminator the firmware expects, and the fragment sizes the
//! module negotiates.
//!
//! The catalog is fixed at construction and matched in declaration order:
//! the first profile whose service a peripheral reports wins, and no
//! further services are examined.

use crate::Uuid;

/// Command terminator appended to every outbound payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Terminator {
    /// No terminator
    #[default]
    None,
    /// Carriage return (`\r`)
    Cr,
    /// Line feed (`\n`)
    Lf,
    /// Carriage return + line feed (`\r\n`)
    CrLf,
    /// Single NUL byte
    Nul,
}

impl Terminator {
    /// The terminator bytes to append after a payload
    #[must_use]
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::None => b"",
            Self::Cr => b"\r",
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::Nul => b"\0",
        }
    }
}

/// Protocol parameters for one family of BLE serial peripherals
///
/// Immutable once constructed. A session holds a reference to its matched
/// profile for the lifetime of the connection; the profile is never
/// reassigned or mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceProfile {
    /// Family name, for diagnostics and session snapshots
    pub family: &'static str,
    /// Service identifying the family during discovery
    pub service: Uuid,
    /// Characteristic outbound fragments are written to
    pub write_channel: Uuid,
    /// Characteristic inbound response notifications arrive on
    pub read_channel: Uuid,
    /// Characteristic controlling the module's operating mode, if the family has one
    pub mode_channel: Option<Uuid>,
    /// Characteristic carrying out-of-band event notifications, if the family has one
    pub event_channel: Option<Uuid>,
    /// Terminator appended to every outbound payload
    pub terminator: Terminator,
    /// Largest outbound fragment the module accepts
    pub tx_fragment: usize,
    /// Largest inbound notification the module produces (informational)
    pub rx_fragment: usize,
}

/// Nordic UART Service (nRF5x SDK, Adafruit Bluefruit and friends)
pub const NORDIC_UART: DeviceProfile = DeviceProfile {
    family: "nordic-uart",
    service: Uuid::from_u128(0x6E40_0001_B5A3_F393_E0A9_E50E_24DC_CA9E),
    write_channel: Uuid::from_u128(0x6E40_0002_B5A3_F393_E0A9_E50E_24DC_CA9E),
    read_channel: Uuid::from_u128(0x6E40_0003_B5A3_F393_E0A9_E50E_24DC_CA9E),
    mode_channel: None,
    event_channel: None,
    terminator: Terminator::None,
    tx_fragment: 20,
    rx_fragment: 20,
};

/// JNHuaMao HM-10/HM-11 modules; one characteristic carries both directions
pub const HM10: DeviceProfile = DeviceProfile {
    family: "hm10",
    service: Uuid::from_u16(0xFFE0),
    write_channel: Uuid::from_u16(0xFFE1),
    read_channel: Uuid::from_u16(0xFFE1),
    mode_channel: None,
    event_channel: None,
    terminator: Terminator::None,
    tx_fragment: 20,
    rx_fragment: 20,
};

/// Microchip RN4870/BM70 Transparent UART, with its mode control point
pub const MICROCHIP_TRANSPARENT: DeviceProfile = DeviceProfile {
    family: "microchip-transparent",
    service: Uuid::from_u128(0x4953_5343_FE7D_4AE5_8FA9_9FAF_D205_E455),
    write_channel: Uuid::from_u128(0x4953_5343_8841_43F4_A8D4_ECBE_3472_9BB3),
    read_channel: Uuid::from_u128(0x4953_5343_1E4D_4BD9_BA61_23C6_4724_9616),
    mode_channel: Some(Uuid::from_u128(0x4953_5343_4C8A_39B3_2F49_511C_FF07_3B7E)),
    event_channel: None,
    terminator: Terminator::Cr,
    tx_fragment: 240,
    rx_fragment: 240,
};

/// Laird BL6xx Virtual Serial Port, with the ModemIn status characteristic
pub const LAIRD_VSP: DeviceProfile = DeviceProfile {
    family: "laird-vsp",
    service: Uuid::from_u128(0x569A_1101_B87F_490C_92CB_11BA_5EA5_167C),
    write_channel: Uuid::from_u128(0x569A_2001_B87F_490C_92CB_11BA_5EA5_167C),
    read_channel: Uuid::from_u128(0x569A_2000_B87F_490C_92CB_11BA_5EA5_167C),
    mode_channel: None,
    event_channel: Some(Uuid::from_u128(0x569A_2003_B87F_490C_92CB_11BA_5EA5_167C)),
    terminator: Terminator::CrLf,
    tx_fragment: 15,
    rx_fragment: 20,
};

/// u-blox Serial Port Service; the FIFO carries both directions, credits
/// notifications arrive as an independent event stream
pub const UBLOX_SPS: DeviceProfile = DeviceProfile {
    family: "ublox-sps",
    service: Uuid::from_u128(0x2456_E1B9_26E2_8F83_E744_F34F_01E9_D701),
    write_channel: Uuid::from_u128(0x2456_E1B9_26E2_8F83_E744_F34F_01E9_D703),
    read_channel: Uuid::from_u128(0x2456_E1B9_26E2_8F83_E744_F34F_01E9_D703),
    mode_channel: None,
    event_channel: Some(Uuid::from_u128(0x2456_E1B9_26E2_8F83_E744_F34F_01E9_D704)),
    terminator: Terminator::None,
    tx_fragment: 240,
    rx_fragment: 240,
};

/// The built-in catalog, in matching priority order
pub static CATALOG: [DeviceProfile; 5] = [
    NORDIC_UART,
    HM10,
    MICROCHIP_TRANSPARENT,
    LAIRD_VSP,
    UBLOX_SPS,
];

/// Match reported services against a catalog, first match wins
///
/// The scan order is the catalog order, so an earlier profile shadows a
/// later one if a peripheral were ever to advertise both services.
#[must_use]
pub fn match_service<'c>(
    catalog: &'c [DeviceProfile],
    services: &[Uuid],
) -> Option<&'c DeviceProfile> {
    catalog.iter().find(|profile| services.contains(&profile.service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_bytes() {
        assert_eq!(Terminator::None.as_bytes(), b"");
        assert_eq!(Terminator::Cr.as_bytes(), b"\r");
        assert_eq!(Terminator::Lf.as_bytes(), b"\n");
        assert_eq!(Terminator::CrLf.as_bytes(), b"\r\n");
        assert_eq!(Terminator::Nul.as_bytes(), b"\0");
    }

    #[test]
    fn test_catalog_services_are_distinct() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.service, b.service, "duplicate service in catalog");
            }
        }
    }

    #[test]
    fn test_catalog_fragment_sizes_are_sane() {
        for profile in &CATALOG {
            assert!(profile.tx_fragment >= 15, "{} fragment too small", profile.family);
            assert!(profile.tx_fragment <= 240, "{} fragment too large", profile.family);
        }
    }

    #[test]
    fn test_shared_channel_families() {
        // HM-10 and the u-blox FIFO talk both directions over one characteristic
        assert_eq!(HM10.write_channel, HM10.read_channel);
        assert_eq!(UBLOX_SPS.write_channel, UBLOX_SPS.read_channel);
        // Split-channel families keep the directions apart
        assert_ne!(NORDIC_UART.write_channel, NORDIC_UART.read_channel);
        assert_ne!(LAIRD_VSP.write_channel, LAIRD_VSP.read_channel);
    }

    #[test]
    fn test_match_service_first_wins() {
        // Peripheral advertising both the Laird and Nordic services: the
        // catalog entry that comes first takes priority.
        let services = [LAIRD_VSP.service, NORDIC_UART.service];
        let matched = match_service(&CATALOG, &services).unwrap();
        assert_eq!(matched.family, "nordic-uart");
    }

    #[test]
    fn test_match_service_none() {
        let services = [Uuid::from_u16(0x180A), Uuid::from_u16(0x180F)];
        assert!(match_service(&CATALOG, &services).is_none());
    }

    #[test]
    fn test_match_service_single() {
        let services = [Uuid::from_u16(0x180A), HM10.service];
        let matched = match_service(&CATALOG, &services).unwrap();
        assert_eq!(matched.family, "hm10");
    }
}
