//! Channel struct definition
//!
//! A named group of sessions. Channels exist only while they have members.

use std::collections::HashSet;

use crate::types::SessionId;

/// Chat channel
#[derive(Debug)]
pub struct Channel {
    /// Case-sensitive channel name
    pub name: String,
    /// Current members
    members: HashSet<SessionId>,
}

impl Channel {
    /// Create an empty channel
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashSet::new(),
        }
    }

    /// Add a member
    ///
    /// Returns false if the session was already a member.
    pub fn add_member(&mut self, id: SessionId) -> bool {
        self.members.insert(id)
    }

    /// Remove a member
    ///
    /// Returns false if the session was not a member.
    pub fn remove_member(&mut self, id: SessionId) -> bool {
        self.members.remove(&id)
    }

    /// Check if a session is a member
    pub fn contains(&self, id: SessionId) -> bool {
        self.members.contains(&id)
    }

    /// Check if the channel has no members left
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of members
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Member IDs, in no particular order
    pub fn members(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.members.iter().copied()
    }
}
