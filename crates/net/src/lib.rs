#![warn(missing_docs)]
//! Wire protocols spoken between the dashboard and the game server.
//!
//! Two channels are covered: the binary status payload returned by the polling endpoint
//! ([`status`]) and the JSON frames of the live admin connection ([`hub`]), together with
//! the registry state machine those frames drive ([`session`]).

pub mod correlator;
pub mod format;
pub mod hub;
pub mod logs;
pub mod player;
pub mod session;
pub mod skin;
pub mod status;

pub use correlator::{CommandCorrelator, CommandId, PendingCommand};
pub use hub::{decode_frame, FrameError, HubMessage, OutboundMessage, PlayerRecord, World};
pub use logs::{LogBuffer, LogLine, LogViewport};
pub use player::{PlayerDetail, PlayerDetailError};
pub use session::{AdminSession, SessionEvent, SessionLimits};
pub use skin::{SkinBlock, SkinError, SKIN_BYTES};
pub use status::{
    decode_status, encode_status, PlayerSummary, ServerStatus, StatusDecode, StatusDecodeError,
    StatusEncodeError,
};

/// Default delay between two status polls.
pub const STATUS_POLL_INTERVAL_MS: u64 = 3000;
