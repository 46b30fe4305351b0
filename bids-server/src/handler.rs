//! Command handlers.

use crate::auth::{bidder_tag, CredentialStore};
use crate::error::ServerError;
use crate::registry::SessionRegistry;
use bids_core::{is_valid_name, AuctionError, AuctionHouse, AuctionSpec, SessionId};
use bids_protocol::{AuctionSummary, Operation, Reply, Request};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default number of credential mismatches before a connection is closed.
pub const DEFAULT_MAX_AUTH_FAILURES: u32 = 3;

/// What the connection should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Close,
}

/// Handles commands from sessions.
///
/// Owns the auction house and the credential store. Replies and broadcasts
/// are queued through the [`SessionRegistry`] before `handle` returns.
#[derive(Debug)]
pub struct CommandHandler {
    auctions: AuctionHouse,
    credentials: CredentialStore,
    max_auth_failures: u32,
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            auctions: AuctionHouse::new(),
            credentials: CredentialStore::new(),
            max_auth_failures: DEFAULT_MAX_AUTH_FAILURES,
        }
    }

    /// Sets how many credential mismatches close the connection (0 = never).
    pub fn with_max_auth_failures(mut self, max: u32) -> Self {
        self.max_auth_failures = max;
        self
    }

    pub fn auctions(&self) -> &AuctionHouse {
        &self.auctions
    }

    pub fn auctions_mut(&mut self) -> &mut AuctionHouse {
        &mut self.auctions
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Returns whether authentication is required for an operation.
    fn requires_auth(&self, op: &Operation) -> bool {
        !op.allowed_unauthenticated()
    }

    /// Handles a request from session `id`.
    ///
    /// Errors are answered with a single `ERROR` line to the sender; a fatal
    /// code also closes the session.
    pub fn handle(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
        now: Instant,
    ) -> Disposition {
        let authenticated = match registry.get(id) {
            Some(session) => session.is_authenticated(),
            None => return Disposition::Close,
        };
        debug!("{} -> {}", id, request.op);

        let result = if self.requires_auth(&request.op) && !authenticated {
            Err(ServerError::NotAuthenticated)
        } else {
            match request.op {
                Operation::Hello => self.handle_hello(registry, id, request),
                Operation::Ping => self.handle_ping(registry, id, request),
                Operation::Leave => self.handle_leave(registry, id),
                Operation::Help => self.handle_help(registry, id, request),
                Operation::Speak => self.handle_speak(registry, id, request),
                Operation::ListMembers => self.handle_list_members(registry, id, request),
                Operation::Create => self.handle_create(registry, id, request, now),
                Operation::ListAuctions => self.handle_list_auctions(registry, id, request, now),
                Operation::Bid => self.handle_bid(registry, id, request, now),
            }
        };

        match result {
            Ok(disposition) => disposition,
            Err(e) => {
                let code = e.error_code();
                registry.send(id, &Reply::error(code, e.to_string()));
                if code.is_fatal() {
                    return Disposition::Close;
                }
                if matches!(e, ServerError::InvalidCredentials) {
                    return self.on_auth_failure(registry, id);
                }
                Disposition::Continue
            }
        }
    }

    fn on_auth_failure(&self, registry: &mut SessionRegistry, id: SessionId) -> Disposition {
        let Some(session) = registry.get_mut(id) else {
            return Disposition::Close;
        };
        let failures = session.record_auth_failure();
        if self.max_auth_failures > 0 && failures >= self.max_auth_failures {
            warn!(
                "[{}] Closing {} after {} failed authentication attempts",
                session.remote_addr, id, failures
            );
            return Disposition::Close;
        }
        Disposition::Continue
    }

    /// Display name of an authenticated session.
    fn member_name(registry: &SessionRegistry, id: SessionId) -> Result<String, ServerError> {
        registry
            .get(id)
            .and_then(|session| session.name())
            .map(str::to_string)
            .ok_or(ServerError::NotAuthenticated)
    }

    fn handle_hello(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
    ) -> Result<Disposition, ServerError> {
        if registry.get(id).is_some_and(|s| s.is_authenticated()) {
            return Err(ServerError::AlreadyAuthenticated);
        }

        let args = request.args();
        let (name, credential) = match args.as_slice() {
            [] => return Err(ServerError::InvalidUsername),
            [_] => return Err(ServerError::Syntax("missing credential")),
            [name, credential] => (*name, *credential),
            _ => return Err(ServerError::Syntax("expected HELLO <name> <credential>")),
        };

        if !is_valid_name(name) {
            return Err(ServerError::InvalidUsername);
        }
        if registry.is_name_taken(name) {
            return Err(ServerError::UsernameTaken);
        }
        if !self.credentials.verify(name, credential) {
            return Err(ServerError::InvalidCredentials);
        }
        self.credentials.remember(name, credential);

        if let Some(session) = registry.get_mut(id) {
            session.authenticate(name);
            info!("[{}] {} authenticated as {}", session.remote_addr, id, name);
        }

        let reply = Reply::Hello {
            name: name.to_string(),
        };
        registry.send(id, &reply);
        registry.broadcast(&reply, Some(id));
        Ok(Disposition::Continue)
    }

    fn handle_ping(
        &self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
    ) -> Result<Disposition, ServerError> {
        let args = request.args();
        let [token] = args.as_slice() else {
            return Err(ServerError::Syntax("expected PING <token>"));
        };
        registry.send(
            id,
            &Reply::Pong {
                token: token.to_string(),
            },
        );
        Ok(Disposition::Continue)
    }

    fn handle_leave(
        &self,
        registry: &mut SessionRegistry,
        id: SessionId,
    ) -> Result<Disposition, ServerError> {
        registry.send(id, &Reply::Okay);
        Ok(Disposition::Close)
    }

    fn handle_help(
        &self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
    ) -> Result<Disposition, ServerError> {
        if !request.args().is_empty() {
            return Err(ServerError::Syntax("HELP takes no arguments"));
        }
        registry.send(id, &Reply::Help);
        Ok(Disposition::Continue)
    }

    fn handle_speak(
        &self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
    ) -> Result<Disposition, ServerError> {
        let text = request.text();
        if text.is_empty() {
            return Err(ServerError::Syntax("empty message"));
        }
        let from = Self::member_name(registry, id)?;

        registry.broadcast(
            &Reply::Speak {
                from,
                text: text.to_string(),
            },
            Some(id),
        );
        registry.send(id, &Reply::Okay);
        Ok(Disposition::Continue)
    }

    fn handle_list_members(
        &self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
    ) -> Result<Disposition, ServerError> {
        if !request.args().is_empty() {
            return Err(ServerError::Syntax("LSMEM takes no arguments"));
        }
        let names = registry.member_names();
        registry.send(id, &Reply::Members(names));
        Ok(Disposition::Continue)
    }

    fn handle_create(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
        now: Instant,
    ) -> Result<Disposition, ServerError> {
        let args = request.args();
        let [name, min_price, increment, duration] = args.as_slice() else {
            return Err(ServerError::Syntax(
                "expected CREAT <name> <min_price> <increment> <duration>",
            ));
        };
        let spec = AuctionSpec::parse(name, min_price, increment, duration)?;
        let creator = Self::member_name(registry, id)?;

        let auction = self.auctions.create(spec, id, now);
        info!(
            "{} created auction {} '{}' ({}s)",
            creator,
            auction.id(),
            auction.name(),
            auction.duration().as_secs()
        );
        let created = Reply::Created {
            id: auction.id(),
            name: auction.name().to_string(),
            min_price: auction.min_price(),
            increment: auction.increment(),
            duration_secs: auction.duration().as_secs(),
        };

        registry.send(id, &Reply::OkayWithId { id: auction.id() });
        registry.broadcast(&created, None);
        Ok(Disposition::Continue)
    }

    fn handle_list_auctions(
        &self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
        now: Instant,
    ) -> Result<Disposition, ServerError> {
        if !request.args().is_empty() {
            return Err(ServerError::Syntax("LSAUC takes no arguments"));
        }
        let rows = self
            .auctions
            .active(now)
            .map(|auction| AuctionSummary {
                id: auction.id(),
                name: auction.name().to_string(),
                min_price: auction.min_price(),
                current_bid: auction.current_bid(),
                secs_left: auction.secs_left(now),
                participants: auction.participants().len(),
            })
            .collect();
        registry.send(id, &Reply::Auctions(rows));
        Ok(Disposition::Continue)
    }

    fn handle_bid(
        &mut self,
        registry: &mut SessionRegistry,
        id: SessionId,
        request: &Request,
        now: Instant,
    ) -> Result<Disposition, ServerError> {
        let args = request.args();
        let [auction_id, amount] = args.as_slice() else {
            return Err(ServerError::Syntax("expected BID <auction_id> <amount>"));
        };
        let not_integer = AuctionError::InvalidParameters {
            reason: "must be integers",
        };
        let auction_id: u64 = auction_id.parse().map_err(|_| not_integer.clone())?;
        let amount: i64 = amount.parse().map_err(|_| not_integer)?;
        // Negative offers fall below any floor.
        let amount = u64::try_from(amount).unwrap_or(0);

        let bidder = Self::member_name(registry, id)?;
        self.auctions.bid(auction_id, id, &bidder, amount, now)?;
        info!("{} bid {} on auction {}", bidder, amount, auction_id);

        registry.send(id, &Reply::Okay);
        registry.broadcast(
            &Reply::Bid {
                bidder_tag: bidder_tag(&bidder),
                amount,
                auction_id,
            },
            None,
        );
        Ok(Disposition::Continue)
    }
}
