//! # bids-core
//!
//! Auction engine for bids.
//!
//! This crate provides:
//! - Name validation shared by display names and auction names
//! - Auction records with derived time remaining
//! - The auction house: id allocation, bid acceptance, expiry sweeps

pub mod auction;
pub mod error;
pub mod house;
pub mod name;

pub use auction::{Auction, AuctionId, AuctionSpec, Leader, SessionId};
pub use error::AuctionError;
pub use house::{AuctionHouse, AuctionOutcome, Resolution};
pub use name::{is_valid_name, MAX_NAME_LEN};
