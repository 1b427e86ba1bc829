use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local mirror of a room's membership. The relay owns the real member list.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    access_token: Option<String>,
    members: BTreeSet<ParticipantId>,
}

impl Room {
    pub fn new(id: RoomId, access_token: impl Into<String>) -> Self {
        Self {
            id,
            access_token: Some(access_token.into()),
            members: BTreeSet::new(),
        }
    }

    /// The token is handed out once, for the `join` message.
    pub fn take_token(&mut self) -> Option<String> {
        self.access_token.take()
    }

    pub fn add_member(&mut self, id: ParticipantId) -> bool {
        self.members.insert(id)
    }

    pub fn remove_member(&mut self, id: &ParticipantId) -> bool {
        self.members.remove(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.members.contains(id)
    }

    pub fn members(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
