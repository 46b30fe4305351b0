//! Auction records.

use crate::error::AuctionError;
use crate::name::is_valid_name;
use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

/// Auction identifier, allocated from a global counter and never reused.
pub type AuctionId = u64;

/// Opaque handle to a connection's session.
///
/// Auctions refer to bidders through this handle only, so a session that
/// goes away never leaves a dangling reference behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Validated parameters of a new auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSpec {
    pub name: String,
    pub min_price: u64,
    pub increment: u64,
    pub duration_secs: u64,
}

impl AuctionSpec {
    /// Builds a spec from the raw `CREAT` arguments.
    ///
    /// Numbers are checked for integer syntax first, then the name, then
    /// that every number is at least 1.
    pub fn parse(
        name: &str,
        min_price: &str,
        increment: &str,
        duration_secs: &str,
    ) -> Result<Self, AuctionError> {
        let not_integer = AuctionError::InvalidParameters {
            reason: "must be integers",
        };
        let min_price: i64 = min_price.parse().map_err(|_| not_integer.clone())?;
        let increment: i64 = increment.parse().map_err(|_| not_integer.clone())?;
        let duration_secs: i64 = duration_secs.parse().map_err(|_| not_integer)?;

        if !is_valid_name(name) {
            return Err(AuctionError::InvalidName {
                name: name.to_string(),
            });
        }

        if min_price < 1 || increment < 1 || duration_secs < 1 {
            return Err(AuctionError::InvalidParameters {
                reason: "must be positive",
            });
        }

        Ok(Self {
            name: name.to_string(),
            min_price: min_price as u64,
            increment: increment as u64,
            duration_secs: duration_secs as u64,
        })
    }
}

/// Current highest bidder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leader {
    pub session: SessionId,
    /// Display name at the time of the bid; announced when the auction ends.
    pub name: String,
}

/// A live auction.
#[derive(Debug, Clone)]
pub struct Auction {
    id: AuctionId,
    name: String,
    min_price: u64,
    increment: u64,
    duration: Duration,
    creator: SessionId,
    current_bid: u64,
    leader: Option<Leader>,
    participants: BTreeSet<SessionId>,
    created_at: Instant,
}

impl Auction {
    pub(crate) fn new(id: AuctionId, spec: AuctionSpec, creator: SessionId, now: Instant) -> Self {
        Self {
            id,
            name: spec.name,
            min_price: spec.min_price,
            increment: spec.increment,
            duration: Duration::from_secs(spec.duration_secs),
            creator,
            current_bid: 0,
            leader: None,
            participants: BTreeSet::new(),
            created_at: now,
        }
    }

    pub fn id(&self) -> AuctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_price(&self) -> u64 {
        self.min_price
    }

    pub fn increment(&self) -> u64 {
        self.increment
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn creator(&self) -> SessionId {
        self.creator
    }

    /// Highest accepted bid, 0 while nobody has bid.
    pub fn current_bid(&self) -> u64 {
        self.current_bid
    }

    pub fn leader(&self) -> Option<&Leader> {
        self.leader.as_ref()
    }

    pub fn participants(&self) -> &BTreeSet<SessionId> {
        &self.participants
    }

    /// `max(0, duration - elapsed)`.
    pub fn time_left(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.created_at))
    }

    /// Time left rounded up to whole seconds, so a live auction never shows 0.
    pub fn secs_left(&self, now: Instant) -> u64 {
        let left = self.time_left(now);
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.time_left(now).is_zero()
    }

    /// Smallest amount the next bid must reach.
    pub fn required_bid(&self) -> u64 {
        if self.current_bid == 0 {
            self.min_price
        } else {
            self.current_bid.saturating_add(self.increment)
        }
    }

    /// Applies the bid rules and records the bid when it is accepted.
    pub(crate) fn place_bid(
        &mut self,
        bidder: SessionId,
        bidder_name: &str,
        amount: u64,
        now: Instant,
    ) -> Result<(), AuctionError> {
        if self.is_expired(now) {
            return Err(AuctionError::Expired { id: self.id });
        }

        let required = self.required_bid();
        if amount < required {
            return Err(AuctionError::BidTooLow {
                required,
                offered: amount,
            });
        }

        self.current_bid = amount;
        self.leader = Some(Leader {
            session: bidder,
            name: bidder_name.to_string(),
        });
        self.participants.insert(bidder);
        Ok(())
    }
}
