//! Transport Adapter boundary
//!
//! The engine consumes a GATT-central transport through this narrow
//! interface: a handful of fire-and-forget operations plus an event stream
//! reporting their outcomes. Implementations wrap whatever stack the target
//! platform provides (an HCI host, a SoftDevice, a vendor SDK); the engine
//! never sees anything below this seam.
//!
//! Operations take `&self` and complete when the underlying call has been
//! *issued*; their outcomes arrive later as `TransportEvent`s, which the
//! processor feeds into the host state machine one at a time.

use heapless::{String, Vec};

use crate::constants::{
    MAX_CHARACTERISTICS, MAX_DEVICE_NAME_LENGTH, MAX_FAULT_LENGTH, MAX_FRAGMENT, MAX_SERVICES,
};
use crate::{PeerId, Uuid};

/// An underlying transport failure, with its message
///
/// Messages longer than the buffer are truncated; the engine only ever
/// relays them for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportError {
    message: String<MAX_FAULT_LENGTH>,
}

impl TransportError {
    /// Wrap a transport failure message, truncating if necessary
    #[must_use]
    pub fn new(message: &str) -> Self {
        let mut truncated = String::new();
        for c in message.chars() {
            if truncated.push(c).is_err() {
                break;
            }
        }
        Self { message: truncated }
    }

    /// The failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&str> for TransportError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Asynchronous callbacks from the transport, delivered to the processor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEvent {
    /// Transport readiness changed (radio powered on/off)
    ReadyChanged {
        /// Whether the transport can now service operations
        ready: bool,
    },
    /// Discovery reported a peripheral
    Discovered {
        /// Peripheral identity
        peer: PeerId,
        /// Advertised name, possibly empty
        name: String<MAX_DEVICE_NAME_LENGTH>,
    },
    /// A requested link came up
    Connected {
        /// Peripheral identity
        peer: PeerId,
    },
    /// A requested link failed to come up
    ConnectFailed {
        /// Peripheral identity
        peer: PeerId,
        /// Underlying failure
        error: TransportError,
    },
    /// A link went down, requested or not
    Disconnected {
        /// Peripheral identity
        peer: PeerId,
        /// Underlying failure, if the teardown was not clean
        error: Option<TransportError>,
    },
    /// Service enumeration finished
    ServicesDiscovered {
        /// Peripheral identity
        peer: PeerId,
        /// Services the peripheral exposes
        services: Vec<Uuid, MAX_SERVICES>,
    },
    /// Characteristic enumeration finished for one service
    CharacteristicsDiscovered {
        /// Peripheral identity
        peer: PeerId,
        /// Service the characteristics belong to
        service: Uuid,
        /// Characteristics the service exposes
        characteristics: Vec<Uuid, MAX_CHARACTERISTICS>,
    },
    /// Outcome of a `write` issued with acknowledgement
    WriteAck {
        /// Peripheral identity
        peer: PeerId,
        /// Characteristic the write targeted
        characteristic: Uuid,
        /// Underlying failure, if the write was not accepted
        error: Option<TransportError>,
    },
    /// A notification arrived on a subscribed characteristic
    ValueUpdate {
        /// Peripheral identity
        peer: PeerId,
        /// Characteristic the bytes arrived on
        characteristic: Uuid,
        /// Notification payload
        bytes: Vec<u8, MAX_FRAGMENT>,
        /// Underlying failure, if the update reports one
        error: Option<TransportError>,
    },
}

/// The GATT-central operations the engine needs from a platform
///
/// Implementations own their interior mutability; every method takes
/// `&self` so the processor can await an event and issue operations from
/// the same loop iteration.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Begin peripheral discovery
    async fn start_discovery(&self) -> Result<(), TransportError>;

    /// Stop peripheral discovery
    async fn stop_discovery(&self) -> Result<(), TransportError>;

    /// Establish a link; outcome arrives as `Connected`/`ConnectFailed`
    async fn connect(&self, peer: PeerId) -> Result<(), TransportError>;

    /// Tear down a link (or cancel an attempt); outcome arrives as `Disconnected`
    async fn disconnect(&self, peer: PeerId) -> Result<(), TransportError>;

    /// Enumerate services; outcome arrives as `ServicesDiscovered`
    async fn discover_services(&self, peer: PeerId) -> Result<(), TransportError>;

    /// Enumerate one service's characteristics; outcome arrives as
    /// `CharacteristicsDiscovered`
    async fn discover_characteristics(
        &self,
        peer: PeerId,
        service: Uuid,
    ) -> Result<(), TransportError>;

    /// Subscribe to notifications on a characteristic
    async fn subscribe(&self, peer: PeerId, characteristic: Uuid) -> Result<(), TransportError>;

    /// Write bytes to a characteristic; with `with_ack` the outcome arrives
    /// as `WriteAck`
    async fn write(
        &self,
        peer: PeerId,
        characteristic: Uuid,
        bytes: &[u8],
        with_ack: bool,
    ) -> Result<(), TransportError>;

    /// Wait for the next transport callback
    async fn next_event(&self) -> TransportEvent;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message() {
        let error = TransportError::new("link loss");
        assert_eq!(error.message(), "link loss");
        assert_eq!(TransportError::from("link loss"), error);
    }

    #[test]
    fn test_transport_error_truncates_long_messages() {
        let raw = [b'x'; 2 * MAX_FAULT_LENGTH];
        let long = core::str::from_utf8(&raw).unwrap();
        let error = TransportError::new(long);
        assert_eq!(error.message().len(), MAX_FAULT_LENGTH);
    }
}
