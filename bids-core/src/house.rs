//! The auction house - owns every live auction.

use crate::auction::{Auction, AuctionId, AuctionSpec, Leader, SessionId};
use crate::error::AuctionError;
use std::collections::BTreeMap;
use std::time::Instant;

/// How an auction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Won { leader: Leader, amount: u64 },
    NoBids,
}

/// Result of removing one expired auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionOutcome {
    pub auction_id: AuctionId,
    pub name: String,
    pub resolution: Resolution,
}

/// Live auctions keyed by id, plus the id counter.
///
/// Not thread-safe by itself; the server keeps it inside a single task.
#[derive(Debug)]
pub struct AuctionHouse {
    auctions: BTreeMap<AuctionId, Auction>,
    last_id: AuctionId,
}

impl AuctionHouse {
    pub fn new() -> Self {
        Self {
            auctions: BTreeMap::new(),
            last_id: 0,
        }
    }

    /// Registers a new auction under the next id.
    pub fn create(&mut self, spec: AuctionSpec, creator: SessionId, now: Instant) -> &Auction {
        self.last_id += 1;
        let id = self.last_id;
        tracing::debug!(
            "Auction {} '{}' opened by {} (floor {}, step {}, {}s)",
            id,
            spec.name,
            creator,
            spec.min_price,
            spec.increment,
            spec.duration_secs
        );
        self.auctions
            .entry(id)
            .or_insert_with(|| Auction::new(id, spec, creator, now))
    }

    pub fn get(&self, id: AuctionId) -> Option<&Auction> {
        self.auctions.get(&id)
    }

    /// Places a bid on a live auction.
    pub fn bid(
        &mut self,
        id: AuctionId,
        bidder: SessionId,
        bidder_name: &str,
        amount: u64,
        now: Instant,
    ) -> Result<&Auction, AuctionError> {
        let auction = self
            .auctions
            .get_mut(&id)
            .ok_or(AuctionError::NotFound { id })?;
        auction.place_bid(bidder, bidder_name, amount, now)?;
        Ok(&*auction)
    }

    /// Auctions that still have time left, in id order.
    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Auction> + '_ {
        self.auctions
            .values()
            .filter(move |auction| !auction.is_expired(now))
    }

    /// Removes every expired auction and reports how each one ended.
    ///
    /// An auction is resolved by the sweep that removes it, so each outcome
    /// is reported exactly once.
    pub fn sweep(&mut self, now: Instant) -> Vec<AuctionOutcome> {
        let expired: Vec<AuctionId> = self
            .auctions
            .values()
            .filter(|auction| auction.is_expired(now))
            .map(Auction::id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.auctions.remove(&id))
            .map(|auction| {
                let resolution = match auction.leader() {
                    Some(leader) => Resolution::Won {
                        leader: leader.clone(),
                        amount: auction.current_bid(),
                    },
                    None => Resolution::NoBids,
                };
                AuctionOutcome {
                    auction_id: auction.id(),
                    name: auction.name().to_string(),
                    resolution,
                }
            })
            .collect()
    }

    /// Number of auctions not yet swept, expired or not.
    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }
}

impl Default for AuctionHouse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn spec(name: &str, min: u64, inc: u64, secs: u64) -> AuctionSpec {
        AuctionSpec {
            name: name.to_string(),
            min_price: min,
            increment: inc,
            duration_secs: secs,
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let now = Instant::now();
        let mut house = AuctionHouse::new();
        let a = house.create(spec("a", 1, 1, 1), SessionId(1), now).id();
        let b = house.create(spec("b", 1, 1, 1), SessionId(1), now).id();
        assert_eq!((a, b), (1, 2));

        // Ids are not reused after a sweep.
        house.sweep(now + Duration::from_secs(2));
        assert!(house.is_empty());
        let c = house.create(spec("c", 1, 1, 1), SessionId(1), now).id();
        assert_eq!(c, 3);
    }

    #[test]
    fn test_bid_unknown_auction() {
        let mut house = AuctionHouse::new();
        assert_eq!(
            house
                .bid(42, SessionId(1), "bob", 100, Instant::now())
                .unwrap_err(),
            AuctionError::NotFound { id: 42 }
        );
    }

    #[test]
    fn test_active_filters_expired() {
        let now = Instant::now();
        let mut house = AuctionHouse::new();
        house.create(spec("short", 1, 1, 1), SessionId(1), now);
        house.create(spec("long", 1, 1, 60), SessionId(1), now);

        let later = now + Duration::from_secs(2);
        let names: Vec<&str> = house.active(later).map(Auction::name).collect();
        assert_eq!(names, vec!["long"]);
        // Expired but not yet swept.
        assert_eq!(house.len(), 2);
    }

    #[test]
    fn test_sweep_reports_once() {
        let now = Instant::now();
        let mut house = AuctionHouse::new();
        house.create(spec("item1", 100, 10, 5), SessionId(1), now);

        assert!(house.sweep(now + Duration::from_secs(4)).is_empty());

        let outcomes = house.sweep(now + Duration::from_secs(5));
        assert_eq!(
            outcomes,
            vec![AuctionOutcome {
                auction_id: 1,
                name: "item1".to_string(),
                resolution: Resolution::NoBids,
            }]
        );
        assert!(house.sweep(now + Duration::from_secs(6)).is_empty());
        assert!(house.get(1).is_none());
    }

    #[test]
    fn test_sweep_reports_winner() {
        let now = Instant::now();
        let mut house = AuctionHouse::new();
        house.create(spec("item1", 100, 10, 5), SessionId(1), now);
        house.bid(1, SessionId(2), "bob", 150, now).unwrap();
        house.bid(1, SessionId(3), "carol", 170, now).unwrap();

        let outcomes = house.sweep(now + Duration::from_secs(10));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].resolution,
            Resolution::Won {
                leader: Leader {
                    session: SessionId(3),
                    name: "carol".to_string()
                },
                amount: 170
            }
        );
    }

    proptest! {
        #[test]
        fn prop_accepted_bids_respect_increment(
            min in 1u64..1_000,
            inc in 1u64..100,
            offers in proptest::collection::vec(0u64..5_000, 1..40),
        ) {
            let now = Instant::now();
            let mut house = AuctionHouse::new();
            let id = house.create(spec("prop", min, inc, 60), SessionId(1), now).id();

            let mut accepted = Vec::new();
            for (i, amount) in offers.into_iter().enumerate() {
                if house.bid(id, SessionId(i as u64 + 2), "bidder", amount, now).is_ok() {
                    accepted.push(amount);
                }
            }

            if let Some(first) = accepted.first() {
                prop_assert!(*first >= min);
            }
            for pair in accepted.windows(2) {
                prop_assert!(pair[1] >= pair[0] + inc);
            }
            let current = house.get(id).unwrap().current_bid();
            prop_assert_eq!(current, accepted.last().copied().unwrap_or(0));
        }
    }
}
