//! The set of live sessions, in connection order.

use crate::session::Session;
use bids_core::SessionId;
use bids_protocol::Reply;
use std::collections::BTreeMap;

/// Live sessions keyed by id.
///
/// Ids grow with each connection, so iteration order is connection order.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> + '_ {
        self.sessions.values_mut()
    }

    /// Returns whether an authenticated session already uses `name`.
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.sessions
            .values()
            .any(|session| session.is_authenticated() && session.name() == Some(name))
    }

    /// Display names of authenticated sessions.
    pub fn member_names(&self) -> Vec<String> {
        self.sessions
            .values()
            .filter(|session| session.is_authenticated())
            .filter_map(|session| session.name().map(str::to_string))
            .collect()
    }

    /// Queues a reply for one session. Unknown ids are ignored.
    pub fn send(&mut self, id: SessionId, reply: &Reply) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => session.send(reply),
            None => false,
        }
    }

    /// Queues a reply for every authenticated session except `exclude`.
    ///
    /// Returns the number of sessions the reply was queued for.
    pub fn broadcast(&mut self, reply: &Reply, exclude: Option<SessionId>) -> usize {
        let mut delivered = 0;
        for session in self.sessions.values_mut() {
            if Some(session.id) == exclude || !session.is_authenticated() {
                continue;
            }
            if session.send(reply) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Sessions whose transport has failed.
    pub fn dead_sessions(&self) -> Vec<SessionId> {
        self.sessions
            .values()
            .filter(|session| session.is_dead())
            .map(|session| session.id)
            .collect()
    }

    /// Removes every session, returning them in connection order.
    pub fn drain(&mut self) -> Vec<Session> {
        std::mem::take(&mut self.sessions).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
