//! Session and channel registry
//!
//! The single store of live sessions and channels. Every method is a pure
//! in-memory edit: no I/O happens here. Methods that imply notifications
//! return a copied recipient snapshot for the caller to broadcast to.
//!
//! Membership is kept in two places, the channel's member set and the
//! session's joined-channel set, and every method edits both together.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;

use tracing::debug;

use crate::broadcast::Recipient;
use crate::channel::Channel;
use crate::session::Session;
use crate::types::SessionId;

/// What was left behind when a session was unregistered
#[derive(Debug)]
pub struct Departure {
    /// The removed session
    pub session: Session,
    /// Each channel the session was in, with the members remaining in it
    pub parted: Vec<(String, Vec<Recipient>)>,
}

/// All live sessions and channels
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    channels: HashMap<String, Channel>,
    // Bumped on every NICK so the latest claim of a nickname can be found.
    nick_clock: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Returns false (and keeps the existing one) on an ID clash.
    pub fn register(&mut self, session: Session) -> bool {
        if self.sessions.contains_key(&session.id) {
            return false;
        }
        self.sessions.insert(session.id, session);
        true
    }

    /// Remove a session and take it out of every channel it had joined.
    ///
    /// Channels left empty are deleted. Returns `None` for an unknown ID.
    pub fn unregister(&mut self, id: SessionId) -> Option<Departure> {
        let session = self.sessions.remove(&id)?;
        let mut parted = Vec::with_capacity(session.channels.len());
        for name in &session.channels {
            self.remove_member(name, id);
            parted.push((name.clone(), self.recipients_of(name)));
        }
        Some(Departure { session, parted })
    }

    pub fn set_nickname(&mut self, id: SessionId, nickname: String) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        self.nick_clock += 1;
        session.nickname = nickname;
        session.nick_claim = self.nick_clock;
        true
    }

    pub fn set_username(&mut self, id: SessionId, username: String) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        session.username = username;
        true
    }

    /// Add a session to a channel, creating the channel if needed.
    ///
    /// Returns the post-join member set, or `None` for an unknown session.
    /// Joining a channel twice is harmless.
    pub fn join(&mut self, id: SessionId, channel: &str) -> Option<Vec<Recipient>> {
        let session = self.sessions.get_mut(&id)?;
        session.channels.insert(channel.to_string());
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| {
                debug!("Channel {} created", channel);
                Channel::new(channel)
            })
            .add_member(id);
        Some(self.recipients_of(channel))
    }

    /// Remove a session from a channel, deleting the channel if now empty.
    ///
    /// Returns the pre-removal member set (including the leaver), or `None`
    /// if the session was not in the channel.
    pub fn part(&mut self, id: SessionId, channel: &str) -> Option<Vec<Recipient>> {
        let session = self.sessions.get_mut(&id)?;
        if !session.channels.remove(channel) {
            return None;
        }
        let members = self.recipients_of(channel);
        self.remove_member(channel, id);
        Some(members)
    }

    /// Copy of the current members of `channel`; empty if it does not exist.
    pub fn recipients_of(&self, channel: &str) -> Vec<Recipient> {
        let Some(channel) = self.channels.get(channel) else {
            return Vec::new();
        };
        channel
            .members()
            .filter_map(|id| self.sessions.get(&id))
            .map(Session::recipient)
            .collect()
    }

    /// The session that most recently claimed `nickname`.
    pub fn find_by_nickname(&self, nickname: &str) -> Option<Recipient> {
        if nickname.is_empty() {
            return None;
        }
        self.sessions
            .values()
            .filter(|s| s.nickname == nickname)
            .max_by_key(|s| s.nick_claim)
            .map(Session::recipient)
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Sorted, owned copy of the current state
    pub fn snapshot(&self) -> RegistrySnapshot {
        let sessions: BTreeMap<SessionId, SessionInfo> = self
            .sessions
            .values()
            .map(|s| {
                (
                    s.id,
                    SessionInfo {
                        nickname: s.nickname.clone(),
                        username: s.username.clone(),
                        peer_addr: s.peer_addr,
                        channels: s.channels.iter().cloned().collect(),
                    },
                )
            })
            .collect();
        let channels: BTreeMap<String, BTreeSet<SessionId>> = self
            .channels
            .values()
            .map(|c| (c.name.clone(), c.members().collect()))
            .collect();
        RegistrySnapshot { sessions, channels }
    }

    fn remove_member(&mut self, channel: &str, id: SessionId) {
        let Some(entry) = self.channels.get_mut(channel) else {
            return;
        };
        entry.remove_member(id);
        if entry.is_empty() {
            self.channels.remove(channel);
            debug!("Channel {} deleted (empty)", channel);
        }
    }
}

/// Owned view of one session inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub nickname: String,
    pub username: String,
    pub peer_addr: Option<SocketAddr>,
    pub channels: BTreeSet<String>,
}

/// Point-in-time copy of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub sessions: BTreeMap<SessionId, SessionInfo>,
    pub channels: BTreeMap<String, BTreeSet<SessionId>>,
}

impl RegistrySnapshot {
    /// Nicknames of the members of `channel`, sorted
    pub fn nicknames_in(&self, channel: &str) -> Vec<&str> {
        let mut nicks: Vec<&str> = self
            .channels
            .get(channel)
            .into_iter()
            .flatten()
            .filter_map(|id| self.sessions.get(id))
            .map(|s| s.nickname.as_str())
            .collect();
        nicks.sort_unstable();
        nicks
    }

    /// Channels joined by any session using `nickname`
    pub fn channels_of(&self, nickname: &str) -> BTreeSet<&str> {
        self.sessions
            .values()
            .filter(|s| s.nickname == nickname)
            .flat_map(|s| s.channels.iter().map(String::as_str))
            .collect()
    }

    pub fn has_nickname(&self, nickname: &str) -> bool {
        self.sessions.values().any(|s| s.nickname == nickname)
    }

    /// Membership agrees in both directions and no channel is empty.
    pub fn is_consistent(&self) -> bool {
        let members_known = self.channels.iter().all(|(name, members)| {
            !members.is_empty()
                && members.iter().all(|id| {
                    self.sessions
                        .get(id)
                        .is_some_and(|s| s.channels.contains(name))
                })
        });
        let joins_known = self.sessions.iter().all(|(id, s)| {
            s.channels
                .iter()
                .all(|name| self.channels.get(name).is_some_and(|m| m.contains(id)))
        });
        members_known && joins_known
    }
}
