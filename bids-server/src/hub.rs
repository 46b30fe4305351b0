//! The hub: the single owner of all session and auction state.
//!
//! Connection tasks only move bytes. Everything they read arrives here as a
//! [`HubEvent`], is applied in arrival order, and any resulting replies are
//! queued on the recipients' outbound channels before the next event.

use crate::error::ServerError;
use crate::handler::{CommandHandler, Disposition};
use crate::keepalive::KeepaliveMonitor;
use crate::registry::SessionRegistry;
use crate::server::ServerConfig;
use crate::session::{Outbound, Session};
use bids_core::{Resolution, SessionId};
use bids_protocol::{ProtocolError, Reply, Request};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, info};

/// Input to the hub from connection tasks.
#[derive(Debug)]
pub enum HubEvent {
    /// A connection was accepted.
    Connected {
        id: SessionId,
        remote_addr: SocketAddr,
        outbound: Outbound,
    },
    /// One complete request line.
    Line { id: SessionId, line: String },
    /// Framing failed for one line.
    Malformed { id: SessionId, error: ProtocolError },
    /// The peer closed the connection or the transport failed.
    Disconnected { id: SessionId },
}

/// Session registry, command handler and keepalive monitor behind one
/// synchronous interface. Time is passed in so sweeps are deterministic.
#[derive(Debug)]
pub struct Hub {
    registry: SessionRegistry,
    handler: CommandHandler,
    keepalive: KeepaliveMonitor,
}

impl Hub {
    pub fn new(handler: CommandHandler, keepalive: KeepaliveMonitor) -> Self {
        Self {
            registry: SessionRegistry::new(),
            handler,
            keepalive,
        }
    }

    /// Builds a hub with the limits from the server configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            CommandHandler::new().with_max_auth_failures(config.max_auth_failures),
            KeepaliveMonitor::new(config.ping_interval, config.max_missed_pings),
        )
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    /// Applies one event.
    pub fn handle_event(&mut self, event: HubEvent, now: Instant) {
        match event {
            HubEvent::Connected {
                id,
                remote_addr,
                outbound,
            } => self.on_connect(id, remote_addr, outbound, now),
            HubEvent::Line { id, line } => self.on_line(id, &line, now),
            HubEvent::Malformed { id, error } => self.on_malformed(id, error, now),
            HubEvent::Disconnected { id } => self.disconnect(id, "connection closed"),
        }
    }

    /// Registers a new session and greets it.
    pub fn on_connect(
        &mut self,
        id: SessionId,
        remote_addr: SocketAddr,
        outbound: Outbound,
        now: Instant,
    ) {
        info!("[{}] Client connected as {}", remote_addr, id);
        let mut session = Session::new(id, remote_addr, outbound, now);
        session.send(&Reply::Greeting);
        self.registry.insert(session);
    }

    /// Dispatches one request line.
    pub fn on_line(&mut self, id: SessionId, line: &str, now: Instant) {
        let Some(session) = self.registry.get_mut(id) else {
            debug!("Dropping line from unknown {}", id);
            return;
        };
        session.record_request(now);

        match Request::parse(line) {
            Ok(request) => {
                let disposition = self
                    .handler
                    .handle(&mut self.registry, id, &request, now);
                if disposition == Disposition::Close {
                    self.disconnect(id, "closed by server");
                }
            }
            Err(ProtocolError::EmptyLine) => {}
            Err(e) => self.reply_error(id, ServerError::from(e)),
        }
    }

    /// Answers a line the codec could not frame.
    pub fn on_malformed(&mut self, id: SessionId, error: ProtocolError, now: Instant) {
        let Some(session) = self.registry.get_mut(id) else {
            return;
        };
        session.record_request(now);
        debug!("[{}] Malformed line: {}", session.remote_addr, error);
        self.reply_error(id, ServerError::from(error));
    }

    /// Sends an `ERROR` line and drops the session when the code is fatal.
    fn reply_error(&mut self, id: SessionId, error: ServerError) {
        let code = error.error_code();
        self.registry.send(id, &Reply::error(code, error.to_string()));
        if code.is_fatal() {
            self.disconnect(id, &error.to_string());
        }
    }

    /// Removes a session and tells the others when it had a name.
    ///
    /// Dropping the session drops its outbound sender, which ends the
    /// connection task once the queued lines are flushed. Unknown ids are
    /// ignored, so a close can be reported more than once.
    pub fn disconnect(&mut self, id: SessionId, reason: &str) {
        let Some(mut session) = self.registry.remove(id) else {
            return;
        };
        let previous = session.close();
        info!(
            "[{}] {} disconnected: {} ({:?} -> {:?}, {} requests)",
            session.remote_addr,
            id,
            reason,
            previous,
            session.state(),
            session.request_count()
        );

        if let Some(name) = session.name() {
            self.registry.broadcast(
                &Reply::Left {
                    name: name.to_string(),
                },
                None,
            );
        }
    }

    /// Periodic work: resolves expired auctions, evicts silent sessions
    /// and reaps sessions whose transport failed.
    pub fn tick(&mut self, now: Instant) {
        for outcome in self.handler.auctions_mut().sweep(now) {
            let reply = match outcome.resolution {
                Resolution::Won { leader, amount } => Reply::Won {
                    name: leader.name,
                    amount,
                    auction_id: outcome.auction_id,
                },
                Resolution::NoBids => Reply::NoBids {
                    auction_id: outcome.auction_id,
                },
            };
            info!("Auction {} '{}' ended: {}", outcome.auction_id, outcome.name, reply);
            self.registry.broadcast(&reply, None);
        }

        for id in self.keepalive.sweep(&mut self.registry, now) {
            self.reply_error(id, ServerError::Timeout);
        }

        for id in self.registry.dead_sessions() {
            self.disconnect(id, "write failed");
        }
    }

    /// Drops every session. Connection tasks close once their queues drain.
    pub fn shutdown(&mut self) {
        let sessions = self.registry.drain();
        info!("Closing {} session(s)", sessions.len());
    }
}
