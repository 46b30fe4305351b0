//! Protocol error types and error codes.

use std::fmt;
use thiserror::Error;

/// Errors raised while framing or parsing a line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("line too long: more than {max} bytes")]
    LineTooLong { max: usize },

    #[error("invalid UTF-8 in line")]
    InvalidUtf8,

    #[error("empty line")]
    EmptyLine,

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl ProtocolError {
    /// Returns the wire error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ProtocolError::LineTooLong { .. } => ErrorCode::LineTooLong,
            ProtocolError::InvalidUtf8 => ErrorCode::Syntax,
            ProtocolError::EmptyLine => ErrorCode::Syntax,
            ProtocolError::UnknownCommand(_) => ErrorCode::UnknownCommand,
        }
    }
}

/// Stable error codes sent in `ERROR <code> <message>` lines.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Protocol errors
    Syntax,
    UnknownCommand,
    LineTooLong,

    // Authorization errors
    NotAuthenticated,

    // Auction errors
    InvalidAuctionName,
    AuctionNotFound,
    InvalidParameters,
    BidTooLow,
    AuctionExpired,

    // Identity errors
    InvalidUsername,
    UsernameTaken,
    InvalidCredentials,
    AlreadyAuthenticated,

    // Liveness
    Timeout,

    // Server faults
    Internal,
}

impl ErrorCode {
    /// Returns the numeric code written on the wire.
    pub fn as_u16(&self) -> u16 {
        match self {
            ErrorCode::Syntax => 10,
            ErrorCode::UnknownCommand => 11,
            ErrorCode::LineTooLong => 12,
            ErrorCode::NotAuthenticated => 20,
            ErrorCode::InvalidAuctionName => 30,
            ErrorCode::AuctionNotFound => 31,
            ErrorCode::InvalidParameters => 33,
            ErrorCode::BidTooLow => 38,
            ErrorCode::AuctionExpired => 39,
            ErrorCode::InvalidUsername => 40,
            ErrorCode::UsernameTaken => 41,
            ErrorCode::InvalidCredentials => 42,
            ErrorCode::AlreadyAuthenticated => 43,
            ErrorCode::Timeout => 50,
            ErrorCode::Internal => 90,
        }
    }

    /// Returns whether the session is closed after this error is sent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::Timeout | ErrorCode::Internal)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
