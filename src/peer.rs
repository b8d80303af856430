use crate::LinkError;

/// Opaque, stable handle identifying one peripheral for the lifetime of the
/// engine. The transport adapter assigns it; the engine only compares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerId(pub [u8; 6]);

impl PeerId {
    /// Create a new peer identity from raw bytes
    #[must_use]
    pub const fn new(id: [u8; 6]) -> Self {
        Self(id)
    }

    /// Get the raw identity bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Format the identity as a colon-separated hex string
    #[must_use]
    pub fn format_hex(&self) -> heapless::String<17> {
        let mut result = heapless::String::new();
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                result.push(':').ok();
            }
            let hex_chars = [
                '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F',
            ];
            result.push(hex_chars[(byte >> 4) as usize]).ok();
            result.push(hex_chars[(byte & 0x0F) as usize]).ok();
        }
        result
    }

    /// Parse a peer identity from a colon-separated hex string
    ///
    /// # Errors
    /// Returns `LinkError::NotFound` if the string is not exactly 17
    /// characters long or contains invalid characters
    pub fn from_hex(hex: &str) -> Result<Self, LinkError> {
        if hex.len() != 17 || !hex.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(LinkError::NotFound);
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in hex.split(':').enumerate() {
            if i >= 6 || byte.len() != 2 {
                return Err(LinkError::NotFound);
            }
            bytes[i] = u8::from_str_radix(byte, 16).map_err(|_| LinkError::NotFound)?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 6]> for PeerId {
    fn from(id: [u8; 6]) -> Self {
        Self(id)
    }
}

impl From<PeerId> for [u8; 6] {
    fn from(peer: PeerId) -> Self {
        peer.0
    }
}

impl From<PeerId> for heapless::String<17> {
    fn from(peer: PeerId) -> Self {
        peer.format_hex()
    }
}

impl TryFrom<&str> for PeerId {
    type Error = LinkError;

    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        PeerId::from_hex(hex)
    }
}

impl TryFrom<&[u8]> for PeerId {
    type Error = LinkError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() == 6 {
            let mut id = [0u8; 6];
            id.copy_from_slice(bytes);
            Ok(PeerId(id))
        } else {
            Err(LinkError::NotFound)
        }
    }
}
