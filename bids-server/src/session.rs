//! Session management.

use bids_core::SessionId;
use bids_protocol::Reply;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Lines queued for one client before it is treated as stalled.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Sender half of a connection's outbound line queue.
pub type Outbound = mpsc::Sender<String>;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state, waiting for HELLO.
    Connected,
    /// HELLO accepted; every command is available.
    Authenticated,
    /// Session is closing. Terminal.
    Closed,
}

/// A client session.
///
/// The session is the only writer to its connection: everything sent to the
/// client goes through [`Session::send`].
#[derive(Debug)]
pub struct Session {
    /// Unique session ID.
    pub id: SessionId,

    /// Remote address.
    pub remote_addr: SocketAddr,

    /// Session state.
    state: SessionState,

    /// Display name from HELLO.
    name: Option<String>,

    /// Session creation time.
    created_at: Instant,

    /// Last time any command arrived.
    last_activity: Instant,

    /// Ping intervals elapsed since last activity, as of the last sweep.
    missed_intervals: u32,

    /// Credential mismatches on HELLO.
    auth_failures: u32,

    /// Request counter.
    request_count: u64,

    /// Outbound line queue drained by the connection task.
    outbound: Outbound,

    /// Set once a send fails; the session is reaped on the next tick.
    transport_dead: bool,
}

impl Session {
    /// Creates a new session.
    pub fn new(id: SessionId, remote_addr: SocketAddr, outbound: Outbound, now: Instant) -> Self {
        Self {
            id,
            remote_addr,
            state: SessionState::Connected,
            name: None,
            created_at: now,
            last_activity: now,
            missed_intervals: 0,
            auth_failures: 0,
            request_count: 0,
            outbound,
            transport_dead: false,
        }
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns whether HELLO has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Returns the display name, once authenticated.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Marks the session authenticated under `name`.
    pub fn authenticate(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.state = SessionState::Authenticated;
    }

    /// Moves the session to its terminal state and returns the one it left.
    pub fn close(&mut self) -> SessionState {
        std::mem::replace(&mut self.state, SessionState::Closed)
    }

    /// Records an incoming command and resets the liveness counters.
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_activity = now;
        self.missed_intervals = 0;
    }

    /// Returns the request count.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn missed_intervals(&self) -> u32 {
        self.missed_intervals
    }

    pub(crate) fn set_missed_intervals(&mut self, missed: u32) {
        self.missed_intervals = missed;
    }

    /// Counts a credential mismatch and returns the new total.
    pub fn record_auth_failure(&mut self) -> u32 {
        self.auth_failures += 1;
        self.auth_failures
    }

    pub fn auth_failures(&self) -> u32 {
        self.auth_failures
    }

    /// Queues a reply for the client.
    ///
    /// Returns `false` and marks the transport dead when the connection task
    /// has gone away or the client has stopped reading and the queue is full.
    pub fn send(&mut self, reply: &Reply) -> bool {
        if self.transport_dead {
            return false;
        }
        match self.outbound.try_send(reply.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "[{}] Outbound queue full, marking {} dead",
                    self.remote_addr,
                    self.id
                );
                self.transport_dead = true;
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("[{}] Write failed, marking {} dead", self.remote_addr, self.id);
                self.transport_dead = true;
                false
            }
        }
    }

    /// Returns whether a send has failed on this session.
    pub fn is_dead(&self) -> bool {
        self.transport_dead
    }
}
