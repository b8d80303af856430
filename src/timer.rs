//! Watchdog Timer Service
//!
//! Single-shot, phase-tagged timeout supervision for session phases. A
//! `Watchdog` is a one-deadline slot: arming it always invalidates whatever
//! was armed before, so a session can never have two command deadlines
//! pending at once.
//!
//! Deadlines are plain data. The processor task asks the host for the
//! earliest deadline and sleeps on it with `embassy_time::Timer`; expiry is
//! detected by comparing against a caller-supplied `Instant`, which keeps
//! the state machine deterministic under test (tests pass synthetic
//! instants instead of reading a clock).

use embassy_time::{Duration, Instant};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_RECEIVE_FIRST_PACKET_MS, DEFAULT_RECEIVE_SUBSEQUENT_MS,
    DEFAULT_SEND_PACKET_MS,
};

/// The configurable timeout classes exposed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutKind {
    /// Link establishment (also reused for teardown supervision)
    Connect,
    /// Wait for the first notification of a response
    ReceiveFirstPacket,
    /// Quiet-period window between response notifications
    ReceiveSubsequentPackets,
    /// Wait for a fragment write acknowledgement
    SendPacket,
}

/// Timeout table, adjustable at runtime via the engine API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    connect: Duration,
    receive_first_packet: Duration,
    receive_subsequent_packets: Duration,
    send_packet: Duration,
}

impl Timeouts {
    /// Create a timeout table with the default values
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            receive_first_packet: Duration::from_millis(DEFAULT_RECEIVE_FIRST_PACKET_MS),
            receive_subsequent_packets: Duration::from_millis(DEFAULT_RECEIVE_SUBSEQUENT_MS),
            send_packet: Duration::from_millis(DEFAULT_SEND_PACKET_MS),
        }
    }

    /// Get the configured duration for a timeout class
    #[must_use]
    pub const fn get(&self, kind: TimeoutKind) -> Duration {
        match kind {
            TimeoutKind::Connect => self.connect,
            TimeoutKind::ReceiveFirstPacket => self.receive_first_packet,
            TimeoutKind::ReceiveSubsequentPackets => self.receive_subsequent_packets,
            TimeoutKind::SendPacket => self.send_packet,
        }
    }

    /// Replace the configured duration for a timeout class
    pub fn set(&mut self, kind: TimeoutKind, value: Duration) {
        match kind {
            TimeoutKind::Connect => self.connect = value,
            TimeoutKind::ReceiveFirstPacket => self.receive_first_packet = value,
            TimeoutKind::ReceiveSubsequentPackets => self.receive_subsequent_packets = value,
            TimeoutKind::SendPacket => self.send_packet = value,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new()
    }
}

/// Session phase a watchdog expiry is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogPhase {
    /// Link establishment in progress
    Connect,
    /// Link teardown in progress
    Disconnect,
    /// Fragment written, acknowledgement outstanding
    SendAck,
    /// Mode byte written, acknowledgement outstanding
    ModeAck,
    /// Command sent, response notifications being collected
    Response,
    /// Event-channel bytes being collected
    EventGap,
}

/// An armed single-shot deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Armed {
    /// Phase the deadline supervises
    pub phase: WatchdogPhase,
    /// Absolute expiry instant
    pub deadline: Instant,
}

/// Single-slot watchdog: at most one deadline armed at any time
///
/// `arm` cancels the previous deadline before installing the new one, so
/// a stale expiry can never fire after the slot has been repurposed.
#[derive(Debug, Default)]
pub struct Watchdog {
    slot: Option<Armed>,
}

impl Watchdog {
    /// Create a disarmed watchdog
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Arm the watchdog for `phase`, expiring `after` from `now`
    ///
    /// Any previously armed deadline is invalidated first.
    pub fn arm(&mut self, now: Instant, phase: WatchdogPhase, after: Duration) {
        self.cancel();
        self.slot = Some(Armed {
            phase,
            deadline: now + after,
        });
    }

    /// Disarm, returning the phase that was pending (if any)
    pub fn cancel(&mut self) -> Option<WatchdogPhase> {
        self.slot.take().map(|armed| armed.phase)
    }

    /// Whether a deadline is currently armed
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// The phase currently supervised, if armed
    #[must_use]
    pub fn phase(&self) -> Option<WatchdogPhase> {
        self.slot.map(|armed| armed.phase)
    }

    /// The absolute expiry instant, if armed
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.slot.map(|armed| armed.deadline)
    }

    /// Fire the watchdog if its deadline has passed
    ///
    /// Disarms on expiry, so each armed deadline fires at most once.
    pub fn take_expired(&mut self, now: Instant) -> Option<WatchdogPhase> {
        let expired = matches!(&self.slot, Some(armed) if armed.deadline <= now);
        if expired { self.cancel() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_timeout_defaults() {
        let timeouts = Timeouts::new();
        assert_eq!(timeouts.get(TimeoutKind::Connect).as_millis(), 20_000);
        assert_eq!(timeouts.get(TimeoutKind::ReceiveFirstPacket).as_millis(), 2_000);
        assert_eq!(timeouts.get(TimeoutKind::ReceiveSubsequentPackets).as_millis(), 200);
        assert_eq!(timeouts.get(TimeoutKind::SendPacket).as_millis(), 1_500);
    }

    #[test]
    fn test_timeout_set_roundtrip() {
        let mut timeouts = Timeouts::new();
        timeouts.set(TimeoutKind::SendPacket, Duration::from_millis(350));
        assert_eq!(timeouts.get(TimeoutKind::SendPacket).as_millis(), 350);
        // Other kinds untouched
        assert_eq!(timeouts.get(TimeoutKind::Connect).as_millis(), 20_000);
    }

    #[test]
    fn test_watchdog_fires_only_after_deadline() {
        let mut watchdog = Watchdog::new();
        watchdog.arm(at(0), WatchdogPhase::Connect, Duration::from_millis(100));

        assert!(watchdog.is_armed());
        assert_eq!(watchdog.take_expired(at(99)), None);
        assert!(watchdog.is_armed());
        assert_eq!(watchdog.take_expired(at(100)), Some(WatchdogPhase::Connect));
        assert!(!watchdog.is_armed());
    }

    #[test]
    fn test_watchdog_fires_at_most_once() {
        let mut watchdog = Watchdog::new();
        watchdog.arm(at(0), WatchdogPhase::Response, Duration::from_millis(50));

        assert_eq!(watchdog.take_expired(at(200)), Some(WatchdogPhase::Response));
        assert_eq!(watchdog.take_expired(at(400)), None);
    }

    #[test]
    fn test_watchdog_rearm_invalidates_previous_deadline() {
        let mut watchdog = Watchdog::new();
        watchdog.arm(at(0), WatchdogPhase::Connect, Duration::from_millis(50));
        watchdog.arm(at(10), WatchdogPhase::SendAck, Duration::from_millis(500));

        // The first deadline has passed, but it was replaced: nothing fires.
        assert_eq!(watchdog.take_expired(at(60)), None);
        assert_eq!(watchdog.phase(), Some(WatchdogPhase::SendAck));

        // Only the replacement fires, and only once.
        assert_eq!(watchdog.take_expired(at(510)), Some(WatchdogPhase::SendAck));
        assert_eq!(watchdog.take_expired(at(1_000)), None);
    }

    #[test]
    fn test_watchdog_cancel_prevents_expiry() {
        let mut watchdog = Watchdog::new();
        watchdog.arm(at(0), WatchdogPhase::Disconnect, Duration::from_millis(50));

        assert_eq!(watchdog.cancel(), Some(WatchdogPhase::Disconnect));
        assert_eq!(watchdog.take_expired(at(1_000)), None);
        // Cancelling a disarmed watchdog is a no-op
        assert_eq!(watchdog.cancel(), None);
    }

    #[test]
    fn test_watchdog_quiet_period_rearm_pushes_deadline_out() {
        let mut watchdog = Watchdog::new();
        let gap = Duration::from_millis(200);

        watchdog.arm(at(0), WatchdogPhase::Response, gap);
        watchdog.arm(at(50), WatchdogPhase::Response, gap);

        assert_eq!(watchdog.take_expired(at(200)), None);
        assert_eq!(watchdog.deadline(), Some(at(250)));
        assert_eq!(watchdog.take_expired(at(250)), Some(WatchdogPhase::Response));
    }
}
