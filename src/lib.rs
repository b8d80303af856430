#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::too_many_lines)]

// Must come first so the log shims are visible everywhere.
mod fmt;

pub mod api;
pub mod constants;
pub mod host;
mod peer;
pub mod processor;
pub mod profile;
mod session;
pub mod timer;
pub mod transport;
mod uuid;

use heapless::{String, Vec};

use crate::constants::{
    MAX_ALIAS_LENGTH, MAX_DEVICE_NAME_LENGTH, MAX_FRAGMENT, MAX_RX_BUFFER, MAX_SESSIONS,
    MAX_TX_BUFFER,
};
use crate::timer::TimeoutKind;
use crate::transport::TransportError;

pub use host::LinkHost;
pub use peer::PeerId;
pub use session::{DeviceSession, LinkPhase};
pub use uuid::Uuid;

/// Engine errors, reported synchronously as `Response::Error` for
/// precondition violations and asynchronously as `Notification::Failure`
/// for timeouts and transport faults.
///
/// Exactly one failure is reported per failed attempt, after which the
/// session is back in a well-defined idle or disconnected state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The transport is not powered/ready
    TransportNotReady,
    /// `start_scan` called while a scan is running
    ScanAlreadyStarted,
    /// `stop_scan` called with no scan running
    ScanNotStarted,
    /// Operation forbidden while scanning
    BusyScanning,
    /// A link attempt is already in progress for this session
    AlreadyConnecting,
    /// The session is already connected
    AlreadyConnected,
    /// The session is not connected
    NotConnected,
    /// A teardown is already in progress for this session
    AlreadyDisconnecting,
    /// The link attempt outlived its watchdog
    ConnectTimedOut,
    /// The teardown outlived its watchdog; the session is gone regardless
    DisconnectTimedOut,
    /// The byte-pipe characteristics have not been discovered yet
    ServiceNotDiscovered,
    /// A send is already running for this session
    AlreadySendingData,
    /// No send is running for this session
    NotSendingData,
    /// A fragment acknowledgement outlived its watchdog
    SendDataTimeout,
    /// A command answer is still outstanding
    WaitingCommandAnswer,
    /// No response notification arrived within the receive window
    ReceivingDataTimeout,
    /// The matched profile has no mode characteristic
    SetModeInvalidCharacteristic,
    /// A mode change is already in progress for this session
    SetModeInProgress,
    /// The transport rejected the mode write
    SetModeWriteFailed,
    /// The mode write acknowledgement outlived its watchdog
    SetModeTimedOut,
    /// Payload plus terminator exceeds the outbound buffer
    PayloadTooLarge,
    /// An underlying transport failure, with its message
    Transport(TransportError),
    /// The referenced session is not tracked
    NotFound,
    /// Inconsistent internal state; should not occur in correct operation
    Internal,
}

/// API requests sent to the processor task
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Start peripheral discovery
    StartScan,
    /// Stop peripheral discovery
    StopScan,
    /// Establish a link to a discovered session
    Connect(PeerId),
    /// Tear down a connected session's link
    Disconnect(PeerId),
    /// Send a command payload (terminator appended by the engine)
    SendData(PeerId, Vec<u8, MAX_TX_BUFFER>),
    /// Write a mode byte to the session's mode characteristic
    SetMode(PeerId, u8),
    /// Snapshot every tracked session
    Sessions,
    /// Look up a session by advertised name
    FindByName(String<MAX_DEVICE_NAME_LENGTH>),
    /// Look up a session by indexed alias
    FindByAlias(String<MAX_ALIAS_LENGTH>),
    /// Read a timeout value in milliseconds
    GetTimeout(TimeoutKind),
    /// Replace a timeout value in milliseconds
    SetTimeout(TimeoutKind, u64),
    /// Reset every session and stop the processor
    Shutdown,
}

/// Synchronous results sent back from the processor task
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Discovery started
    ScanStarted,
    /// Discovery stopped
    ScanStopped,
    /// Link establishment issued; outcome arrives as a notification
    ConnectStarted,
    /// Link teardown issued; outcome arrives as a notification
    DisconnectStarted,
    /// First fragment written; completion arrives as a notification
    SendStarted,
    /// Mode byte written; completion arrives as a notification
    SetModeStarted,
    /// Session snapshots
    Sessions(Vec<SessionInfo, MAX_SESSIONS>),
    /// Result of a session lookup
    Session(Option<SessionInfo>),
    /// A timeout value in milliseconds
    Timeout(u64),
    /// Timeout value replaced
    TimeoutUpdated,
    /// Engine reset; the processor is exiting
    ShutdownComplete,
    /// The request violated a precondition
    Error(LinkError),
}

/// Session lifecycle and traffic events, delivered in order through a
/// single notification channel
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// Discovery began
    ScanStarted,
    /// Discovery ended
    ScanStopped,
    /// The transport became ready
    TransportReady,
    /// The transport went away; every session has been dropped
    TransportLost,
    /// Discovery reported a new peripheral
    Discovered(PeerId),
    /// The session's link is up
    Connected(PeerId),
    /// Both byte-pipe channels discovered; the session accepts commands
    Ready(PeerId),
    /// The session's link is down and the session has been dropped
    Disconnected(PeerId),
    /// Every fragment of the current payload was acknowledged
    DataSent(PeerId),
    /// A framed command answer
    DataReceived(PeerId, Vec<u8, MAX_RX_BUFFER>),
    /// An unsolicited notification, delivered individually
    PassiveDataReceived(PeerId, Vec<u8, MAX_FRAGMENT>),
    /// A framed burst from the event characteristic
    EventData(PeerId, Vec<u8, MAX_RX_BUFFER>),
    /// The peripheral reported its operating mode
    ModeChanged(PeerId, u8),
    /// An asynchronous failure; the session is back in a well-defined state
    Failure(PeerId, LinkError),
}

/// Snapshot of one session for API consumers
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionInfo {
    /// Stable peripheral identity
    pub peer: PeerId,
    /// Advertised display name
    pub name: String<MAX_DEVICE_NAME_LENGTH>,
    /// Index-qualified alias (`name_N`)
    pub alias: String<MAX_ALIAS_LENGTH>,
    /// Current lifecycle phase
    pub phase: LinkPhase,
    /// Both byte-pipe channels discovered
    pub ready: bool,
    /// Matched profile family, if service matching succeeded
    pub family: Option<&'static str>,
    /// Last mode reported by the peripheral
    pub mode: Option<u8>,
}
