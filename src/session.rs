//! Device Session state
//!
//! Per-peripheral mutable state: lifecycle phase, discovered channels,
//! transfer flags and buffers, and the watchdogs supervising the current
//! phase. Sessions are owned by the `LinkHost` map and only ever mutated
//! from the processor's single execution context.

use heapless::{String, Vec};

use crate::constants::{
    MAX_ALIAS_LENGTH, MAX_DEVICE_NAME_LENGTH, MAX_RX_BUFFER, MAX_TX_BUFFER,
};
use crate::profile::DeviceProfile;
use crate::timer::Watchdog;
use crate::{PeerId, SessionInfo, Uuid};

/// Lifecycle phase of a session, from the manager's point of view
///
/// A session is in exactly one phase at a time; transitions happen
/// atomically within a single state-machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkPhase {
    /// Reported by discovery, no link
    Discovered,
    /// Link establishment requested, awaiting the transport's verdict
    Connecting,
    /// Link up
    Connected,
    /// Link teardown requested, awaiting the transport's verdict
    Disconnecting,
}

/// State for one tracked peripheral
#[derive(Debug)]
pub struct DeviceSession {
    /// Stable peripheral identity
    pub peer: PeerId,
    /// Advertised display name
    pub name: String<MAX_DEVICE_NAME_LENGTH>,
    /// Index-qualified alias (`name_N`), unique across the session map
    pub alias: String<MAX_ALIAS_LENGTH>,
    /// Current lifecycle phase
    pub phase: LinkPhase,
    /// Matched profile; assigned once after service discovery, never reassigned
    pub profile: Option<&'static DeviceProfile>,
    /// Discovered outbound characteristic
    pub write_channel: Option<Uuid>,
    /// Discovered inbound characteristic
    pub read_channel: Option<Uuid>,
    /// Discovered mode characteristic
    pub mode_channel: Option<Uuid>,
    /// Discovered event characteristic
    pub event_channel: Option<Uuid>,
    /// Link is up
    pub connected: bool,
    /// A fragment pipeline is running
    pub sending: bool,
    /// A command answer is being collected
    pub waiting_answer: bool,
    /// Mode byte written, acknowledgement outstanding
    pub mode_pending: Option<u8>,
    /// `Ready` has been reported for this connection
    pub ready_notified: bool,
    /// Outbound payload, terminator included
    pub tx_buffer: Vec<u8, MAX_TX_BUFFER>,
    /// Bytes acknowledged so far
    pub tx_sent: usize,
    /// Size of the fragment currently awaiting acknowledgement
    pub tx_in_flight: usize,
    /// Response accumulator
    pub rx_buffer: Vec<u8, MAX_RX_BUFFER>,
    /// Event-channel accumulator
    pub event_buffer: Vec<u8, MAX_RX_BUFFER>,
    /// Command watchdog (connect/disconnect/send-ack/mode-ack/response)
    pub watchdog: Watchdog,
    /// Event-channel quiet-period watchdog, independent of the command cycle
    pub event_gap: Watchdog,
    /// Last mode reported by the peripheral
    pub last_mode: Option<u8>,
}

impl DeviceSession {
    /// Create a freshly discovered session
    #[must_use]
    pub fn new(
        peer: PeerId,
        name: String<MAX_DEVICE_NAME_LENGTH>,
        alias: String<MAX_ALIAS_LENGTH>,
    ) -> Self {
        Self {
            peer,
            name,
            alias,
            phase: LinkPhase::Discovered,
            profile: None,
            write_channel: None,
            read_channel: None,
            mode_channel: None,
            event_channel: None,
            connected: false,
            sending: false,
            waiting_answer: false,
            mode_pending: None,
            ready_notified: false,
            tx_buffer: Vec::new(),
            tx_sent: 0,
            tx_in_flight: 0,
            rx_buffer: Vec::new(),
            event_buffer: Vec::new(),
            watchdog: Watchdog::new(),
            event_gap: Watchdog::new(),
            last_mode: None,
        }
    }

    /// Clear everything a connection establishes: profile, channels, flags,
    /// buffers, and both watchdogs. Identity, name, alias and phase are kept.
    pub fn reset(&mut self) {
        self.profile = None;
        self.write_channel = None;
        self.read_channel = None;
        self.mode_channel = None;
        self.event_channel = None;
        self.connected = false;
        self.sending = false;
        self.waiting_answer = false;
        self.mode_pending = None;
        self.ready_notified = false;
        self.tx_buffer.clear();
        self.tx_sent = 0;
        self.tx_in_flight = 0;
        self.rx_buffer.clear();
        self.event_buffer.clear();
        self.watchdog.cancel();
        self.event_gap.cancel();
        self.last_mode = None;
    }

    /// Whether both directions of the byte pipe have been discovered
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.write_channel.is_some() && self.read_channel.is_some()
    }

    /// Snapshot for API consumers
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            peer: self.peer,
            name: self.name.clone(),
            alias: self.alias.clone(),
            phase: self.phase,
            ready: self.is_ready(),
            family: self.profile.map(|profile| profile.family),
            mode: self.last_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::HM10;
    use crate::timer::WatchdogPhase;
    use embassy_time::{Duration, Instant};

    fn session() -> DeviceSession {
        DeviceSession::new(
            PeerId::new([1, 2, 3, 4, 5, 6]),
            String::try_from("HM10").unwrap(),
            String::try_from("HM10_1").unwrap(),
        )
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = session();
        assert_eq!(s.phase, LinkPhase::Discovered);
        assert!(!s.connected);
        assert!(!s.sending);
        assert!(!s.waiting_answer);
        assert!(!s.is_ready());
        assert!(s.profile.is_none());
        assert!(!s.watchdog.is_armed());
    }

    #[test]
    fn test_ready_requires_both_channels() {
        let mut s = session();
        s.write_channel = Some(HM10.write_channel);
        assert!(!s.is_ready());
        s.read_channel = Some(HM10.read_channel);
        assert!(s.is_ready());
    }

    #[test]
    fn test_reset_clears_connection_state() {
        let mut s = session();
        s.phase = LinkPhase::Connected;
        s.profile = Some(&HM10);
        s.write_channel = Some(HM10.write_channel);
        s.read_channel = Some(HM10.read_channel);
        s.connected = true;
        s.sending = true;
        s.waiting_answer = true;
        s.mode_pending = Some(1);
        s.ready_notified = true;
        s.tx_buffer.extend_from_slice(b"AT").unwrap();
        s.tx_sent = 2;
        s.tx_in_flight = 2;
        s.rx_buffer.extend_from_slice(b"OK").unwrap();
        s.event_buffer.extend_from_slice(b"!").unwrap();
        s.last_mode = Some(1);
        s.watchdog
            .arm(Instant::from_millis(0), WatchdogPhase::Response, Duration::from_millis(200));
        s.event_gap
            .arm(Instant::from_millis(0), WatchdogPhase::EventGap, Duration::from_millis(200));

        s.reset();

        assert!(s.profile.is_none());
        assert!(s.write_channel.is_none() && s.read_channel.is_none());
        assert!(!s.connected && !s.sending && !s.waiting_answer);
        assert!(s.mode_pending.is_none() && s.last_mode.is_none());
        assert!(!s.ready_notified);
        assert!(s.tx_buffer.is_empty() && s.rx_buffer.is_empty() && s.event_buffer.is_empty());
        assert_eq!(s.tx_sent, 0);
        assert_eq!(s.tx_in_flight, 0);
        assert!(!s.watchdog.is_armed() && !s.event_gap.is_armed());
        // Identity and phase survive a reset
        assert_eq!(s.phase, LinkPhase::Connected);
        assert_eq!(s.alias.as_str(), "HM10_1");
    }

    #[test]
    fn test_info_snapshot() {
        let mut s = session();
        s.profile = Some(&HM10);
        s.write_channel = Some(HM10.write_channel);
        s.read_channel = Some(HM10.read_channel);
        s.last_mode = Some(2);

        let info = s.info();
        assert_eq!(info.peer, s.peer);
        assert_eq!(info.family, Some("hm10"));
        assert!(info.ready);
        assert_eq!(info.mode, Some(2));
    }
}
