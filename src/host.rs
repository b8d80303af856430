//! Link Host - the session state machine
//!
//! `LinkHost` owns every tracked session and advances their phases in
//! response to three inputs: API requests, transport events, and watchdog
//! expirations. All three entry points are driven by the processor task
//! from a single serialized context, so no locking is needed anywhere in
//! here; a step always runs to completion before the next input is
//! examined.
//!
//! ## Step shape
//!
//! Each entry point takes the transport by reference (to issue follow-up
//! operations), the current instant (to arm watchdogs), and an outbox the
//! step fills with notifications. The processor forwards the outbox to the
//! notification channel after the step returns, which keeps emission
//! ordered and keeps this module free of channel plumbing.
//!
//! ## Outbound pipelining
//!
//! A send keeps exactly one fragment in flight: write with acknowledgement,
//! arm the send watchdog, and only on the acknowledgement write the next
//! fragment. The last acknowledgement flips the session from `sending` to
//! `waiting_answer` and arms the response watchdog.
//!
//! ## Quiet-period framing
//!
//! The protocol has no length prefix. While `waiting_answer` every read-
//! channel notification is appended to the response accumulator and the
//! response watchdog is re-armed with the short inter-packet window;
//! the answer is complete when the window finally elapses in silence. The
//! event characteristic runs the same policy on its own accumulator and
//! its own watchdog, decoupled from the command cycle.

use embassy_time::{Duration, Instant};
use heapless::{FnvIndexMap, String, Vec};

use crate::constants::{
    MAX_ALIAS_LENGTH, MAX_DEVICE_NAME_LENGTH, MAX_FRAGMENT, MAX_OUTBOX, MAX_SESSIONS,
};
use crate::profile::{self, DeviceProfile};
use crate::session::{DeviceSession, LinkPhase};
use crate::timer::{TimeoutKind, Timeouts, WatchdogPhase};
use crate::transport::{Transport, TransportError, TransportEvent};
use crate::{LinkError, Notification, PeerId, Request, Response, SessionInfo, Uuid};

/// Notifications produced by one state-machine step
pub type Outbox = Vec<Notification, MAX_OUTBOX>;

fn notify(outbox: &mut Outbox, notification: Notification) {
    if outbox.push(notification).is_err() {
        warn!("notification outbox overflow, event dropped");
    }
}

/// The session manager
///
/// Owns the session map, the profile catalog reference, the timeout table,
/// and the transport-wide flags. Constructed explicitly and driven by
/// [`crate::processor::run`]; callers own its lifetime.
pub struct LinkHost {
    catalog: &'static [DeviceProfile],
    sessions: FnvIndexMap<PeerId, DeviceSession, MAX_SESSIONS>,
    timeouts: Timeouts,
    scanning: bool,
    transport_ready: bool,
}

impl LinkHost {
    /// Create a host over the given profile catalog with default timeouts
    #[must_use]
    pub fn new(catalog: &'static [DeviceProfile]) -> Self {
        Self::with_timeouts(catalog, Timeouts::new())
    }

    /// Create a host over the given profile catalog and timeout table
    #[must_use]
    pub fn with_timeouts(catalog: &'static [DeviceProfile], timeouts: Timeouts) -> Self {
        Self {
            catalog,
            sessions: FnvIndexMap::new(),
            timeouts,
            scanning: false,
            transport_ready: false,
        }
    }

    /// Whether discovery is currently running
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Whether the transport has reported itself ready
    #[must_use]
    pub fn is_transport_ready(&self) -> bool {
        self.transport_ready
    }

    /// The current timeout table
    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Look up a tracked session
    #[must_use]
    pub fn session(&self, peer: PeerId) -> Option<&DeviceSession> {
        self.sessions.get(&peer)
    }

    /// Number of tracked sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The earliest armed watchdog deadline across all sessions
    ///
    /// The processor sleeps until this instant (or a new input arrives).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions
            .values()
            .flat_map(|session| {
                [session.watchdog.deadline(), session.event_gap.deadline()]
            })
            .flatten()
            .min()
    }

    /// Process one API request and return its synchronous result
    pub async fn process_request<T: Transport>(
        &mut self,
        request: Request,
        now: Instant,
        transport: &T,
        outbox: &mut Outbox,
    ) -> Response {
        match request {
            Request::StartScan => self.start_scan(transport, outbox).await,
            Request::StopScan => self.stop_scan(transport, outbox).await,
            Request::Connect(peer) => self.connect(peer, now, transport).await,
            Request::Disconnect(peer) => self.disconnect(peer, now, transport).await,
            Request::SendData(peer, payload) => {
                self.send_data(peer, &payload, now, transport).await
            }
            Request::SetMode(peer, mode) => self.set_mode(peer, mode, now, transport).await,
            Request::Sessions => {
                let snapshots: Vec<SessionInfo, MAX_SESSIONS> =
                    self.sessions.values().map(DeviceSession::info).collect();
                Response::Sessions(snapshots)
            }
            Request::FindByName(name) => {
                Response::Session(self.find_session(|session| session.name == name))
            }
            Request::FindByAlias(alias) => {
                Response::Session(self.find_session(|session| session.alias == alias))
            }
            Request::GetTimeout(kind) => Response::Timeout(self.timeouts.get(kind).as_millis()),
            Request::SetTimeout(kind, millis) => {
                self.timeouts.set(kind, Duration::from_millis(millis));
                Response::TimeoutUpdated
            }
            Request::Shutdown => {
                self.teardown_all_sessions();
                self.scanning = false;
                Response::ShutdownComplete
            }
        }
    }

    /// Process one transport callback
    pub async fn process_transport_event<T: Transport>(
        &mut self,
        event: TransportEvent,
        now: Instant,
        transport: &T,
        outbox: &mut Outbox,
    ) {
        match event {
            TransportEvent::ReadyChanged { ready } => self.on_ready_changed(ready, outbox),
            TransportEvent::Discovered { peer, name } => self.on_discovered(peer, name, outbox),
            TransportEvent::Connected { peer } => self.on_connected(peer, transport, outbox).await,
            TransportEvent::ConnectFailed { peer, error } => {
                self.on_connect_failed(peer, error, outbox);
            }
            TransportEvent::Disconnected { peer, error } => {
                self.on_disconnected(peer, error, outbox);
            }
            TransportEvent::ServicesDiscovered { peer, services } => {
                self.on_services_discovered(peer, &services, transport, outbox).await;
            }
            TransportEvent::CharacteristicsDiscovered {
                peer,
                characteristics,
                ..
            } => {
                self.on_characteristics_discovered(peer, &characteristics, transport, outbox)
                    .await;
            }
            TransportEvent::WriteAck {
                peer,
                characteristic,
                error,
            } => {
                self.on_write_ack(peer, characteristic, error, now, transport, outbox)
                    .await;
            }
            TransportEvent::ValueUpdate {
                peer,
                characteristic,
                bytes,
                error,
            } => self.on_value_update(peer, characteristic, bytes, error, now, outbox),
        }
    }

    /// Fire every watchdog whose deadline has passed
    pub async fn process_expirations<T: Transport>(
        &mut self,
        now: Instant,
        transport: &T,
        outbox: &mut Outbox,
    ) {
        let mut expired: Vec<(PeerId, WatchdogPhase), MAX_OUTBOX> = Vec::new();
        for (peer, session) in self.sessions.iter_mut() {
            if let Some(phase) = session.watchdog.take_expired(now) {
                expired.push((*peer, phase)).ok();
            }
            if let Some(phase) = session.event_gap.take_expired(now) {
                expired.push((*peer, phase)).ok();
            }
        }
        for (peer, phase) in expired {
            self.on_watchdog_expired(peer, phase, transport, outbox).await;
        }
    }

    async fn start_scan<T: Transport>(&mut self, transport: &T, outbox: &mut Outbox) -> Response {
        if self.scanning {
            return Response::Error(LinkError::ScanAlreadyStarted);
        }
        if !self.transport_ready {
            return Response::Error(LinkError::TransportNotReady);
        }

        // A new scan starts from a clean discovery list; sessions with a
        // live or pending link stay tracked.
        let stale: Vec<PeerId, MAX_SESSIONS> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.phase == LinkPhase::Discovered)
            .map(|(peer, _)| *peer)
            .collect();
        for peer in stale {
            self.sessions.remove(&peer);
        }

        if let Err(error) = transport.start_discovery().await {
            return Response::Error(LinkError::Transport(error));
        }
        self.scanning = true;
        notify(outbox, Notification::ScanStarted);
        Response::ScanStarted
    }

    async fn stop_scan<T: Transport>(&mut self, transport: &T, outbox: &mut Outbox) -> Response {
        if !self.scanning {
            return Response::Error(LinkError::ScanNotStarted);
        }
        if let Err(error) = transport.stop_discovery().await {
            return Response::Error(LinkError::Transport(error));
        }
        self.scanning = false;
        notify(outbox, Notification::ScanStopped);
        Response::ScanStopped
    }

    async fn connect<T: Transport>(
        &mut self,
        peer: PeerId,
        now: Instant,
        transport: &T,
    ) -> Response {
        if !self.transport_ready {
            return Response::Error(LinkError::TransportNotReady);
        }
        if self.scanning {
            return Response::Error(LinkError::BusyScanning);
        }
        let connect_timeout = self.timeouts.get(TimeoutKind::Connect);
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Response::Error(LinkError::NotFound);
        };
        match session.phase {
            LinkPhase::Connecting => return Response::Error(LinkError::AlreadyConnecting),
            LinkPhase::Connected => return Response::Error(LinkError::AlreadyConnected),
            LinkPhase::Disconnecting => return Response::Error(LinkError::AlreadyDisconnecting),
            LinkPhase::Discovered => {}
        }

        session.reset();
        session.phase = LinkPhase::Connecting;
        session
            .watchdog
            .arm(now, WatchdogPhase::Connect, connect_timeout);

        if let Err(error) = transport.connect(peer).await {
            session.watchdog.cancel();
            session.phase = LinkPhase::Discovered;
            return Response::Error(LinkError::Transport(error));
        }
        Response::ConnectStarted
    }

    async fn disconnect<T: Transport>(
        &mut self,
        peer: PeerId,
        now: Instant,
        transport: &T,
    ) -> Response {
        if !self.transport_ready {
            return Response::Error(LinkError::TransportNotReady);
        }
        if self.scanning {
            return Response::Error(LinkError::BusyScanning);
        }
        let disconnect_timeout = self.timeouts.get(TimeoutKind::Connect);
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Response::Error(LinkError::NotFound);
        };
        match session.phase {
            LinkPhase::Disconnecting => return Response::Error(LinkError::AlreadyDisconnecting),
            LinkPhase::Discovered | LinkPhase::Connecting => {
                return Response::Error(LinkError::NotConnected);
            }
            LinkPhase::Connected => {}
        }

        session.phase = LinkPhase::Disconnecting;
        session
            .watchdog
            .arm(now, WatchdogPhase::Disconnect, disconnect_timeout);

        if let Err(error) = transport.disconnect(peer).await {
            session.watchdog.cancel();
            session.phase = LinkPhase::Connected;
            return Response::Error(LinkError::Transport(error));
        }
        Response::DisconnectStarted
    }

    async fn send_data<T: Transport>(
        &mut self,
        peer: PeerId,
        payload: &[u8],
        now: Instant,
        transport: &T,
    ) -> Response {
        if !self.transport_ready {
            return Response::Error(LinkError::TransportNotReady);
        }
        if self.scanning {
            return Response::Error(LinkError::BusyScanning);
        }
        let send_timeout = self.timeouts.get(TimeoutKind::SendPacket);
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Response::Error(LinkError::NotFound);
        };
        if session.phase != LinkPhase::Connected || !session.connected {
            return Response::Error(LinkError::NotConnected);
        }
        let (Some(write_channel), Some(_)) = (session.write_channel, session.read_channel) else {
            return Response::Error(LinkError::ServiceNotDiscovered);
        };
        if session.sending {
            return Response::Error(LinkError::AlreadySendingData);
        }
        if session.waiting_answer {
            return Response::Error(LinkError::WaitingCommandAnswer);
        }
        let Some(profile) = session.profile else {
            return Response::Error(LinkError::Internal);
        };

        let terminator = profile.terminator.as_bytes();
        if payload.len() + terminator.len() > session.tx_buffer.capacity() {
            return Response::Error(LinkError::PayloadTooLarge);
        }
        session.tx_buffer.clear();
        if session.tx_buffer.extend_from_slice(payload).is_err()
            || session.tx_buffer.extend_from_slice(terminator).is_err()
        {
            return Response::Error(LinkError::Internal);
        }
        session.tx_sent = 0;
        session.tx_in_flight = 0;
        session.sending = true;

        let fragment = profile.tx_fragment.min(session.tx_buffer.len());
        let result = transport
            .write(peer, write_channel, &session.tx_buffer[..fragment], true)
            .await;
        match result {
            Ok(()) => {
                session.tx_in_flight = fragment;
                session.watchdog.arm(now, WatchdogPhase::SendAck, send_timeout);
                Response::SendStarted
            }
            Err(error) => {
                session.sending = false;
                session.tx_buffer.clear();
                Response::Error(LinkError::Transport(error))
            }
        }
    }

    async fn set_mode<T: Transport>(
        &mut self,
        peer: PeerId,
        mode: u8,
        now: Instant,
        transport: &T,
    ) -> Response {
        if !self.transport_ready {
            return Response::Error(LinkError::TransportNotReady);
        }
        if self.scanning {
            return Response::Error(LinkError::BusyScanning);
        }
        let send_timeout = self.timeouts.get(TimeoutKind::SendPacket);
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Response::Error(LinkError::NotFound);
        };
        if session.phase != LinkPhase::Connected || !session.connected {
            return Response::Error(LinkError::NotConnected);
        }
        if session.write_channel.is_none() || session.read_channel.is_none() {
            return Response::Error(LinkError::ServiceNotDiscovered);
        }
        if session.sending {
            return Response::Error(LinkError::AlreadySendingData);
        }
        if session.waiting_answer {
            return Response::Error(LinkError::WaitingCommandAnswer);
        }
        let Some(mode_channel) = session.mode_channel else {
            return Response::Error(LinkError::SetModeInvalidCharacteristic);
        };
        if session.mode_pending.is_some() {
            return Response::Error(LinkError::SetModeInProgress);
        }

        let result = transport.write(peer, mode_channel, &[mode], true).await;
        match result {
            Ok(()) => {
                session.mode_pending = Some(mode);
                session.watchdog.arm(now, WatchdogPhase::ModeAck, send_timeout);
                Response::SetModeStarted
            }
            Err(error) => Response::Error(LinkError::Transport(error)),
        }
    }

    fn on_ready_changed(&mut self, ready: bool, outbox: &mut Outbox) {
        self.transport_ready = ready;
        if ready {
            debug!("transport ready");
            notify(outbox, Notification::TransportReady);
            return;
        }
        // Readiness loss is fatal to every session at once; one
        // notification covers them all.
        warn!("transport lost, dropping {} sessions", self.sessions.len());
        self.scanning = false;
        self.teardown_all_sessions();
        notify(outbox, Notification::TransportLost);
    }

    fn on_discovered(
        &mut self,
        peer: PeerId,
        name: String<MAX_DEVICE_NAME_LENGTH>,
        outbox: &mut Outbox,
    ) {
        if self.sessions.contains_key(&peer) {
            trace!("repeat discovery report");
            return;
        }
        let alias = self.make_alias(&name);
        let session = DeviceSession::new(peer, name, alias);
        if self.sessions.insert(peer, session).is_err() {
            warn!("session table full, discovery report dropped");
            return;
        }
        notify(outbox, Notification::Discovered(peer));
    }

    async fn on_connected<T: Transport>(
        &mut self,
        peer: PeerId,
        transport: &T,
        outbox: &mut Outbox,
    ) {
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("connect report for untracked peer");
            return;
        };
        if session.phase != LinkPhase::Connecting {
            warn!("connect report outside a connect attempt");
            return;
        }
        session.watchdog.cancel();
        session.phase = LinkPhase::Connected;
        session.connected = true;
        notify(outbox, Notification::Connected(peer));

        if let Err(error) = transport.discover_services(peer).await {
            notify(outbox, Notification::Failure(peer, LinkError::Transport(error)));
        }
    }

    fn on_connect_failed(&mut self, peer: PeerId, error: TransportError, outbox: &mut Outbox) {
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("connect failure for untracked peer");
            return;
        };
        if session.phase != LinkPhase::Connecting {
            warn!("connect failure outside a connect attempt");
            return;
        }
        session.watchdog.cancel();
        session.reset();
        session.phase = LinkPhase::Discovered;
        notify(outbox, Notification::Failure(peer, LinkError::Transport(error)));
    }

    fn on_disconnected(
        &mut self,
        peer: PeerId,
        error: Option<TransportError>,
        outbox: &mut Outbox,
    ) {
        let Some(session) = self.sessions.get(&peer) else {
            warn!("disconnect report for untracked peer");
            return;
        };
        if session.phase == LinkPhase::Discovered {
            // No link existed; nothing to tear down.
            trace!("disconnect report for an unlinked session");
            return;
        }
        if let Some(error) = error {
            debug!("unclean teardown: {:?}", error);
        }
        // Requested or not, the link is gone: the session is dropped and the
        // peripheral reappears on the next scan.
        self.sessions.remove(&peer);
        notify(outbox, Notification::Disconnected(peer));
    }

    async fn on_services_discovered<T: Transport>(
        &mut self,
        peer: PeerId,
        services: &[Uuid],
        transport: &T,
        outbox: &mut Outbox,
    ) {
        let catalog = self.catalog;
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("service report for untracked peer");
            return;
        };
        if session.profile.is_some() {
            trace!("profile already assigned");
            return;
        }
        let Some(profile) = profile::match_service(catalog, services) else {
            // Connected but unusable; the caller must disconnect explicitly.
            warn!("no catalog profile matches the reported services");
            return;
        };
        session.profile = Some(profile);
        debug!("matched profile {}", profile.family);

        if let Err(error) = transport.discover_characteristics(peer, profile.service).await {
            notify(outbox, Notification::Failure(peer, LinkError::Transport(error)));
        }
    }

    async fn on_characteristics_discovered<T: Transport>(
        &mut self,
        peer: PeerId,
        characteristics: &[Uuid],
        transport: &T,
        outbox: &mut Outbox,
    ) {
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("characteristic report for untracked peer");
            return;
        };
        let Some(profile) = session.profile else {
            warn!("characteristic report before profile assignment");
            return;
        };

        for &characteristic in characteristics {
            if characteristic == profile.write_channel {
                if let Err(error) = transport.subscribe(peer, characteristic).await {
                    warn!("subscribe failed: {:?}", error);
                }
                session.write_channel = Some(characteristic);
            }
            if characteristic == profile.read_channel {
                session.read_channel = Some(characteristic);
                // Shared-channel families were already subscribed via the
                // write branch above.
                if profile.read_channel != profile.write_channel {
                    if let Err(error) = transport.subscribe(peer, characteristic).await {
                        warn!("subscribe failed: {:?}", error);
                    }
                }
            }
            if profile.mode_channel == Some(characteristic) {
                if let Err(error) = transport.subscribe(peer, characteristic).await {
                    warn!("subscribe failed: {:?}", error);
                }
                session.mode_channel = Some(characteristic);
            }
            if profile.event_channel == Some(characteristic) {
                if let Err(error) = transport.subscribe(peer, characteristic).await {
                    warn!("subscribe failed: {:?}", error);
                }
                session.event_channel = Some(characteristic);
            }
        }

        // Discovery order is not guaranteed; report readiness exactly once,
        // whenever both directions are in place.
        if !session.ready_notified && session.is_ready() {
            session.ready_notified = true;
            notify(outbox, Notification::Ready(peer));
        }
    }

    async fn on_write_ack<T: Transport>(
        &mut self,
        peer: PeerId,
        characteristic: Uuid,
        error: Option<TransportError>,
        now: Instant,
        transport: &T,
        outbox: &mut Outbox,
    ) {
        let send_timeout = self.timeouts.get(TimeoutKind::SendPacket);
        let first_packet = self.timeouts.get(TimeoutKind::ReceiveFirstPacket);
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("write ack for untracked peer");
            return;
        };

        if session.mode_pending.is_some() && session.mode_channel == Some(characteristic) {
            session.watchdog.cancel();
            session.mode_pending = None;
            if let Some(error) = error {
                warn!("mode write rejected: {:?}", error);
                notify(outbox, Notification::Failure(peer, LinkError::SetModeWriteFailed));
            }
            // On success the peripheral reports the new mode on the mode
            // characteristic; `ModeChanged` is emitted there.
            return;
        }

        if session.sending && session.write_channel == Some(characteristic) {
            session.watchdog.cancel();
            if let Some(error) = error {
                // The pipeline aborts; partially sent data is not retried.
                session.sending = false;
                session.tx_buffer.clear();
                session.tx_sent = 0;
                session.tx_in_flight = 0;
                notify(outbox, Notification::Failure(peer, LinkError::Transport(error)));
                return;
            }

            session.tx_sent += session.tx_in_flight;
            session.tx_in_flight = 0;

            if session.tx_sent < session.tx_buffer.len() {
                let Some(profile) = session.profile else {
                    session.sending = false;
                    notify(outbox, Notification::Failure(peer, LinkError::Internal));
                    return;
                };
                let remaining = session.tx_buffer.len() - session.tx_sent;
                let fragment = profile.tx_fragment.min(remaining);
                let range = session.tx_sent..session.tx_sent + fragment;
                let result = transport
                    .write(peer, characteristic, &session.tx_buffer[range], true)
                    .await;
                match result {
                    Ok(()) => {
                        session.tx_in_flight = fragment;
                        session.watchdog.arm(now, WatchdogPhase::SendAck, send_timeout);
                    }
                    Err(error) => {
                        session.sending = false;
                        session.tx_buffer.clear();
                        session.tx_sent = 0;
                        notify(outbox, Notification::Failure(peer, LinkError::Transport(error)));
                    }
                }
            } else {
                // Last fragment acknowledged: the command is out, start
                // collecting the answer.
                session.sending = false;
                session.waiting_answer = true;
                session.rx_buffer.clear();
                session
                    .watchdog
                    .arm(now, WatchdogPhase::Response, first_packet);
                notify(outbox, Notification::DataSent(peer));
            }
            return;
        }

        warn!("unexpected write ack");
    }

    fn on_value_update(
        &mut self,
        peer: PeerId,
        characteristic: Uuid,
        bytes: Vec<u8, MAX_FRAGMENT>,
        error: Option<TransportError>,
        now: Instant,
        outbox: &mut Outbox,
    ) {
        let gap = self.timeouts.get(TimeoutKind::ReceiveSubsequentPackets);
        let Some(session) = self.sessions.get_mut(&peer) else {
            warn!("value update for untracked peer");
            return;
        };

        if let Some(error) = error {
            if session.waiting_answer && session.read_channel == Some(characteristic) {
                session.watchdog.cancel();
                session.waiting_answer = false;
                session.rx_buffer.clear();
                notify(outbox, Notification::Failure(peer, LinkError::Transport(error)));
            } else {
                warn!("value update error: {:?}", error);
            }
            return;
        }

        if session.mode_channel == Some(characteristic) {
            let Some(&mode) = bytes.first() else {
                warn!("empty mode report");
                return;
            };
            session.last_mode = Some(mode);
            notify(outbox, Notification::ModeChanged(peer, mode));
            return;
        }

        if session.event_channel == Some(characteristic) {
            if session.event_buffer.extend_from_slice(&bytes).is_err() {
                warn!("event accumulator overflow, bytes dropped");
            }
            // Same quiet-period policy as responses, on an independent
            // timer: each burst byte pushes the flush out.
            session.event_gap.arm(now, WatchdogPhase::EventGap, gap);
            return;
        }

        if session.read_channel == Some(characteristic) {
            if session.waiting_answer {
                if session.rx_buffer.extend_from_slice(&bytes).is_err() {
                    warn!("response accumulator overflow, bytes dropped");
                }
                // Receiving data resets the clock rather than satisfying it.
                session.watchdog.arm(now, WatchdogPhase::Response, gap);
            } else {
                // No outstanding request: deliver immediately and
                // individually.
                notify(outbox, Notification::PassiveDataReceived(peer, bytes));
            }
            return;
        }

        warn!("value update on an unrecorded characteristic");
    }

    async fn on_watchdog_expired<T: Transport>(
        &mut self,
        peer: PeerId,
        phase: WatchdogPhase,
        transport: &T,
        outbox: &mut Outbox,
    ) {
        match phase {
            WatchdogPhase::Connect => {
                // Cancel the attempt at the transport, then demote the
                // session so the caller may retry without rescanning.
                if let Err(error) = transport.disconnect(peer).await {
                    debug!("cancel of timed-out connect failed: {:?}", error);
                }
                if let Some(session) = self.sessions.get_mut(&peer) {
                    session.reset();
                    session.phase = LinkPhase::Discovered;
                }
                notify(outbox, Notification::Failure(peer, LinkError::ConnectTimedOut));
            }
            WatchdogPhase::Disconnect => {
                // The transport never answered; consider the session
                // disconnected regardless.
                self.sessions.remove(&peer);
                notify(outbox, Notification::Failure(peer, LinkError::DisconnectTimedOut));
            }
            WatchdogPhase::SendAck => {
                if let Some(session) = self.sessions.get_mut(&peer) {
                    session.sending = false;
                    session.tx_buffer.clear();
                    session.tx_sent = 0;
                    session.tx_in_flight = 0;
                }
                notify(outbox, Notification::Failure(peer, LinkError::SendDataTimeout));
            }
            WatchdogPhase::ModeAck => {
                if let Some(session) = self.sessions.get_mut(&peer) {
                    session.mode_pending = None;
                }
                notify(outbox, Notification::Failure(peer, LinkError::SetModeTimedOut));
            }
            WatchdogPhase::Response => {
                let Some(session) = self.sessions.get_mut(&peer) else {
                    return;
                };
                session.waiting_answer = false;
                if session.rx_buffer.is_empty() {
                    notify(outbox, Notification::Failure(peer, LinkError::ReceivingDataTimeout));
                } else {
                    let answer = core::mem::take(&mut session.rx_buffer);
                    notify(outbox, Notification::DataReceived(peer, answer));
                }
            }
            WatchdogPhase::EventGap => {
                let Some(session) = self.sessions.get_mut(&peer) else {
                    return;
                };
                if !session.event_buffer.is_empty() {
                    let burst = core::mem::take(&mut session.event_buffer);
                    notify(outbox, Notification::EventData(peer, burst));
                }
            }
        }
    }

    fn find_session(&self, pred: impl Fn(&DeviceSession) -> bool) -> Option<SessionInfo> {
        self.sessions
            .values()
            .find(|session| pred(session))
            .map(DeviceSession::info)
    }

    fn make_alias(&self, name: &str) -> String<MAX_ALIAS_LENGTH> {
        use core::fmt::Write as _;
        let base = if name.is_empty() { "unknown" } else { name };
        let index = self
            .sessions
            .values()
            .filter(|session| {
                let existing = if session.name.is_empty() {
                    "unknown"
                } else {
                    session.name.as_str()
                };
                existing == base
            })
            .count()
            + 1;
        let mut alias = String::new();
        write!(alias, "{base}_{index}").ok();
        alias
    }

    fn teardown_all_sessions(&mut self) {
        let peers: Vec<PeerId, MAX_SESSIONS> = self.sessions.keys().copied().collect();
        for peer in peers {
            if let Some(session) = self.sessions.get_mut(&peer) {
                session.reset();
            }
            self.sessions.remove(&peer);
        }
    }
}

impl Default for LinkHost {
    fn default() -> Self {
        Self::new(&profile::CATALOG)
    }
}
