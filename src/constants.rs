//! Wrenlink Constants
//!
//! This module contains all the constants used throughout the Wrenlink
//! library: collection capacities, buffer sizes, and default timeout values.

/// Maximum number of simultaneously tracked sessions (must be a power of two)
pub const MAX_SESSIONS: usize = 8;

/// Maximum advertised device name length in bytes
pub const MAX_DEVICE_NAME_LENGTH: usize = 32;

/// Maximum indexed alias length in bytes (name plus `_N` suffix)
pub const MAX_ALIAS_LENGTH: usize = 36;

/// Capacity of the outbound payload buffer, terminator included
pub const MAX_TX_BUFFER: usize = 512;

/// Capacity of the response and event accumulators
pub const MAX_RX_BUFFER: usize = 512;

/// Largest single transport fragment or notification (ATT MTU 247 minus headers)
pub const MAX_FRAGMENT: usize = 244;

/// Maximum number of services reported per peripheral
pub const MAX_SERVICES: usize = 8;

/// Maximum number of characteristics reported per service
pub const MAX_CHARACTERISTICS: usize = 8;

/// Maximum transport fault message length in bytes
pub const MAX_FAULT_LENGTH: usize = 48;

/// Maximum notifications a single state-machine step can emit
pub const MAX_OUTBOX: usize = 16;

/// Depth of the request, response, and notification channels
pub const CHANNEL_DEPTH: usize = 8;

/// Default link establishment timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;

/// Default wait for the first response notification in milliseconds
pub const DEFAULT_RECEIVE_FIRST_PACKET_MS: u64 = 2_000;

/// Default quiet-period window between response notifications in milliseconds
pub const DEFAULT_RECEIVE_SUBSEQUENT_MS: u64 = 200;

/// Default wait for a fragment write acknowledgement in milliseconds
pub const DEFAULT_SEND_PACKET_MS: u64 = 1_500;
