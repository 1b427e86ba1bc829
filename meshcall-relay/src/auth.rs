use meshcall_core::{ParticipantId, RoomId};
use std::collections::HashMap;
use thiserror::Error;

/// Why a `join` was refused. The message is what the client sees in
/// `auth-error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("invalid token")]
    InvalidToken,

    #[error("client id must not be empty")]
    EmptyClientId,

    #[error("client id {0} is already connected")]
    DuplicateClientId(ParticipantId),

    #[error("expected a join message")]
    ExpectedJoin,
}

/// Decides who may enter which room.
pub trait RoomAuthorizer: Send + Sync {
    fn authorize(&self, room_id: &RoomId, token: &str) -> Result<(), JoinError>;
}

/// Any non-empty token opens any room.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRooms;

impl RoomAuthorizer for OpenRooms {
    fn authorize(&self, _room_id: &RoomId, token: &str) -> Result<(), JoinError> {
        if token.is_empty() {
            return Err(JoinError::InvalidToken);
        }
        Ok(())
    }
}

/// One fixed token per room; rooms without a token are closed.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<RoomId, String>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_room(mut self, room_id: impl Into<RoomId>, token: impl Into<String>) -> Self {
        self.tokens.insert(room_id.into(), token.into());
        self
    }

    /// Parses `room=token` pairs.
    pub fn parse<'a>(pairs: impl IntoIterator<Item = &'a str>) -> anyhow::Result<Self> {
        let mut tokens = Self::new();
        for pair in pairs {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((room, token)) = pair.split_once('=') else {
                anyhow::bail!("expected room=token, got {pair:?}");
            };
            let (room, token) = (room.trim(), token.trim());
            if room.is_empty() || token.is_empty() {
                anyhow::bail!("empty room or token in {pair:?}");
            }
            tokens = tokens.with_room(room, token);
        }
        Ok(tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl RoomAuthorizer for StaticTokens {
    fn authorize(&self, room_id: &RoomId, token: &str) -> Result<(), JoinError> {
        match self.tokens.get(room_id) {
            Some(expected) if expected == token => Ok(()),
            _ => Err(JoinError::InvalidToken),
        }
    }
}
