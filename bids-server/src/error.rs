//! Server error types.

use bids_protocol::ErrorCode;
use thiserror::Error;

/// Server errors.
///
/// Every variant that a command can produce maps onto one `ERROR` line via
/// [`ServerError::error_code`]; the `Display` text is the message part.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] bids_protocol::ProtocolError),

    #[error(transparent)]
    Auction(#[from] bids_core::AuctionError),

    #[error("invalid syntax ({0})")]
    Syntax(&'static str),

    #[error("Auth failed.")]
    NotAuthenticated,

    #[error("Invalid username. Must be 1 to 16 characters from [A-Za-z0-9_-].")]
    InvalidUsername,

    #[error("Username taken.")]
    UsernameTaken,

    #[error("Incorrect password.")]
    InvalidCredentials,

    #[error("already authenticated")]
    AlreadyAuthenticated,

    #[error("timeout")]
    Timeout,

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Converts to protocol error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::Io(_) => ErrorCode::Internal,
            ServerError::Protocol(e) => e.error_code(),
            ServerError::Auction(e) => match e.error_code() {
                "INVALID_AUCTION_NAME" => ErrorCode::InvalidAuctionName,
                "INVALID_PARAMETERS" => ErrorCode::InvalidParameters,
                "AUCTION_NOT_FOUND" => ErrorCode::AuctionNotFound,
                "AUCTION_EXPIRED" => ErrorCode::AuctionExpired,
                "BID_TOO_LOW" => ErrorCode::BidTooLow,
                _ => ErrorCode::Internal,
            },
            ServerError::Syntax(_) => ErrorCode::Syntax,
            ServerError::NotAuthenticated => ErrorCode::NotAuthenticated,
            ServerError::InvalidUsername => ErrorCode::InvalidUsername,
            ServerError::UsernameTaken => ErrorCode::UsernameTaken,
            ServerError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ServerError::AlreadyAuthenticated => ErrorCode::AlreadyAuthenticated,
            ServerError::Timeout => ErrorCode::Timeout,
            ServerError::ShuttingDown => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bids_core::AuctionError;

    #[test]
    fn test_auction_errors_map_to_wire_codes() {
        let cases = [
            (
                AuctionError::InvalidName {
                    name: "a b".into(),
                },
                30,
            ),
            (
                AuctionError::InvalidParameters {
                    reason: "must be integers",
                },
                33,
            ),
            (AuctionError::NotFound { id: 9 }, 31),
            (
                AuctionError::BidTooLow {
                    required: 100,
                    offered: 5,
                },
                38,
            ),
            (AuctionError::Expired { id: 1 }, 39),
        ];
        for (error, code) in cases {
            assert_eq!(ServerError::from(error).error_code().as_u16(), code);
        }
    }

    #[test]
    fn test_session_errors_map_to_wire_codes() {
        assert_eq!(ServerError::Syntax("x").error_code().as_u16(), 10);
        assert_eq!(ServerError::NotAuthenticated.error_code().as_u16(), 20);
        assert_eq!(ServerError::InvalidUsername.error_code().as_u16(), 40);
        assert_eq!(ServerError::UsernameTaken.error_code().as_u16(), 41);
        assert_eq!(ServerError::InvalidCredentials.error_code().as_u16(), 42);
        assert_eq!(ServerError::AlreadyAuthenticated.error_code().as_u16(), 43);
        assert_eq!(ServerError::Timeout.error_code().as_u16(), 50);
    }

    #[test]
    fn test_protocol_error_is_transparent() {
        let err = ServerError::from(bids_protocol::ProtocolError::UnknownCommand("FOO".into()));
        assert_eq!(err.error_code().as_u16(), 11);
        assert_eq!(err.to_string(), "unknown command: FOO");
    }
}
