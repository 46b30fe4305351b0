//! Core error types.

use crate::auction::AuctionId;
use thiserror::Error;

/// Errors from auction creation and bidding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuctionError {
    #[error("invalid auction name: {name}")]
    InvalidName { name: String },

    #[error("invalid parameters ({reason})")]
    InvalidParameters { reason: &'static str },

    #[error("auction not found: {id}")]
    NotFound { id: AuctionId },

    #[error("auction ended: {id}")]
    Expired { id: AuctionId },

    #[error("bid too low: {offered} (min {required})")]
    BidTooLow { required: u64, offered: u64 },
}

impl AuctionError {
    /// Returns an error code suitable for protocol responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuctionError::InvalidName { .. } => "INVALID_AUCTION_NAME",
            AuctionError::InvalidParameters { .. } => "INVALID_PARAMETERS",
            AuctionError::NotFound { .. } => "AUCTION_NOT_FOUND",
            AuctionError::Expired { .. } => "AUCTION_EXPIRED",
            AuctionError::BidTooLow { .. } => "BID_TOO_LOW",
        }
    }
}
