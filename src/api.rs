//! Wrenlink API surface
//!
//! The caller-facing half of the engine: a channel bundle the caller owns,
//! and a thin handle whose async methods send one request, await its
//! synchronous result, and map it to a `Result`. Asynchronous outcomes
//! (connections coming up, framed answers, failures) arrive on the
//! notification channel in the order the state machine emitted them.
//!
//! There is no global engine instance: the caller constructs the channels
//! (typically in a `static`, so the processor task can borrow them at
//! `'static`), the host, and the processor, and owns all three lifetimes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use wrenlink::api::{Api, EngineChannels};
//!
//! static CHANNELS: EngineChannels = EngineChannels::new();
//!
//! async fn example() -> Result<(), wrenlink::LinkError> {
//!     let api = Api::new(&CHANNELS);
//!     api.start_scan().await?;
//!     let sessions = api.sessions().await?;
//!     if let Some(session) = sessions.first() {
//!         api.connect(session.peer).await?;
//!     }
//!     Ok(())
//! }
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use heapless::{String, Vec};

use crate::constants::{CHANNEL_DEPTH, MAX_SESSIONS, MAX_TX_BUFFER};
use crate::timer::TimeoutKind;
use crate::{LinkError, Notification, PeerId, Request, Response, SessionInfo};

/// The channel bundle connecting API callers to the processor task
///
/// Const-constructible so callers can place it in a `static`; the engine
/// itself holds no hidden global state.
pub struct EngineChannels {
    pub(crate) requests: Channel<CriticalSectionRawMutex, Request, CHANNEL_DEPTH>,
    pub(crate) responses: Channel<CriticalSectionRawMutex, Response, CHANNEL_DEPTH>,
    pub(crate) notifications: Channel<CriticalSectionRawMutex, Notification, CHANNEL_DEPTH>,
}

impl EngineChannels {
    /// Create an empty channel bundle
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            responses: Channel::new(),
            notifications: Channel::new(),
        }
    }
}

impl Default for EngineChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for issuing engine operations
///
/// Requests are answered in order; issue one operation at a time per
/// handle-owning task.
pub struct Api<'c> {
    channels: &'c EngineChannels,
}

impl<'c> Api<'c> {
    /// Create an API handle over a channel bundle
    #[must_use]
    pub const fn new(channels: &'c EngineChannels) -> Self {
        Self { channels }
    }

    async fn roundtrip(&self, request: Request) -> Response {
        self.channels.requests.sender().send(request).await;
        self.channels.responses.receiver().receive().await
    }

    /// Subscribe to the ordered session event stream
    #[must_use]
    pub fn notifications(
        &self,
    ) -> Receiver<'c, CriticalSectionRawMutex, Notification, CHANNEL_DEPTH> {
        self.channels.notifications.receiver()
    }

    /// Start peripheral discovery
    ///
    /// # Errors
    ///
    /// Returns an error if a scan is already running, the transport is not
    /// ready, or the transport rejects the operation.
    pub async fn start_scan(&self) -> Result<(), LinkError> {
        match self.roundtrip(Request::StartScan).await {
            Response::ScanStarted => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Stop peripheral discovery
    ///
    /// # Errors
    ///
    /// Returns an error if no scan is running or the transport rejects the
    /// operation.
    pub async fn stop_scan(&self) -> Result<(), LinkError> {
        match self.roundtrip(Request::StopScan).await {
            Response::ScanStopped => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Establish a link to a discovered session; completion arrives as
    /// `Notification::Connected` / `Notification::Ready`
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, mid-transition, already
    /// connected, or the engine is scanning.
    pub async fn connect(&self, peer: PeerId) -> Result<(), LinkError> {
        match self.roundtrip(Request::Connect(peer)).await {
            Response::ConnectStarted => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Tear down a connected session's link; completion arrives as
    /// `Notification::Disconnected`
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, not connected, already
    /// disconnecting, or the engine is scanning.
    pub async fn disconnect(&self, peer: PeerId) -> Result<(), LinkError> {
        match self.roundtrip(Request::Disconnect(peer)).await {
            Response::DisconnectStarted => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Send a command payload; the profile's terminator is appended and the
    /// framed answer arrives as `Notification::DataReceived`
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready for traffic, a transfer
    /// is already running, or the payload exceeds the outbound buffer.
    pub async fn send_data(&self, peer: PeerId, payload: &[u8]) -> Result<(), LinkError> {
        let payload: Vec<u8, MAX_TX_BUFFER> =
            Vec::from_slice(payload).map_err(|()| LinkError::PayloadTooLarge)?;
        match self.roundtrip(Request::SendData(peer, payload)).await {
            Response::SendStarted => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Write a mode byte to the session's mode characteristic; the
    /// peripheral's report arrives as `Notification::ModeChanged`
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready for traffic, the family
    /// has no mode characteristic, or a mode change is already pending.
    pub async fn set_mode(&self, peer: PeerId, mode: u8) -> Result<(), LinkError> {
        match self.roundtrip(Request::SetMode(peer, mode)).await {
            Response::SetModeStarted => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Snapshot every tracked session
    ///
    /// # Errors
    ///
    /// Returns an error if the processor answers unexpectedly.
    pub async fn sessions(&self) -> Result<Vec<SessionInfo, MAX_SESSIONS>, LinkError> {
        match self.roundtrip(Request::Sessions).await {
            Response::Sessions(sessions) => Ok(sessions),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Look up a session by advertised name
    ///
    /// # Errors
    ///
    /// Returns an error if the name exceeds the name buffer or the
    /// processor answers unexpectedly.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<SessionInfo>, LinkError> {
        let name = String::try_from(name).map_err(|()| LinkError::NotFound)?;
        match self.roundtrip(Request::FindByName(name)).await {
            Response::Session(session) => Ok(session),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Look up a session by indexed alias (`name_N`)
    ///
    /// # Errors
    ///
    /// Returns an error if the alias exceeds the alias buffer or the
    /// processor answers unexpectedly.
    pub async fn find_by_alias(&self, alias: &str) -> Result<Option<SessionInfo>, LinkError> {
        let alias = String::try_from(alias).map_err(|()| LinkError::NotFound)?;
        match self.roundtrip(Request::FindByAlias(alias)).await {
            Response::Session(session) => Ok(session),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Read a timeout value in milliseconds
    ///
    /// # Errors
    ///
    /// Returns an error if the processor answers unexpectedly.
    pub async fn timeout(&self, kind: TimeoutKind) -> Result<u64, LinkError> {
        match self.roundtrip(Request::GetTimeout(kind)).await {
            Response::Timeout(millis) => Ok(millis),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Replace a timeout value in milliseconds
    ///
    /// # Errors
    ///
    /// Returns an error if the processor answers unexpectedly.
    pub async fn set_timeout(&self, kind: TimeoutKind, millis: u64) -> Result<(), LinkError> {
        match self.roundtrip(Request::SetTimeout(kind, millis)).await {
            Response::TimeoutUpdated => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }

    /// Reset every session and stop the processor task
    ///
    /// # Errors
    ///
    /// Returns an error if the processor answers unexpectedly.
    pub async fn shutdown(&self) -> Result<(), LinkError> {
        match self.roundtrip(Request::Shutdown).await {
            Response::ShutdownComplete => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(LinkError::Internal),
        }
    }
}
