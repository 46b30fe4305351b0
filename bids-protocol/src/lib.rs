//! # bids-protocol
//!
//! Wire protocol implementation for bids.
//!
//! This crate provides:
//! - Newline framing with a bounded line length
//! - Request parsing into an operation and its arguments
//! - Reply line formatting for responses and broadcasts
//! - Stable numeric error codes

pub mod codec;
pub mod error;
pub mod message;
pub mod reply;

pub use codec::{encode_line, LineDecoder};
pub use error::{ErrorCode, ProtocolError};
pub use message::{Operation, Request};
pub use reply::{AuctionSummary, Reply};

/// Protocol version announced in the greeting.
pub const PROTOCOL_VERSION: &str = "1.1.1";

/// Default port for the bids server.
pub const DEFAULT_PORT: u16 = 7402;

/// Default maximum length of a single line, excluding the newline.
pub const MAX_LINE_BYTES: usize = 1024;
