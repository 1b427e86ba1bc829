use crate::error::SignalingError;
use crate::signaling::channel::{SignalingChannel, SignalingEvents};
use async_trait::async_trait;
use meshcall_core::{ParticipantId, RoomId};

/// Opens a signaling channel for one join attempt.
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(
        &self,
        room_id: RoomId,
        client_id: ParticipantId,
        room_token: String,
    ) -> Result<(SignalingChannel, SignalingEvents), SignalingError>;
}

/// Connects to a relay over a websocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SignalingConnector for WebSocketConnector {
    async fn connect(
        &self,
        room_id: RoomId,
        client_id: ParticipantId,
        room_token: String,
    ) -> Result<(SignalingChannel, SignalingEvents), SignalingError> {
        SignalingChannel::connect(&self.url, room_id, client_id, room_token).await
    }
}
