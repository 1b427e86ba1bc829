use crate::media::{MediaTrack, TrackKind};
use crate::transport::transport_event::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, ParticipantId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One peer-to-peer media connection.
///
/// Implementations report candidates, state changes and remote tracks only
/// through the event sender they were built with.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn add_track(&self, track: Arc<MediaTrack>) -> Result<()>;

    /// Swaps the outgoing track of `kind` in place. `Ok(false)` when no sender
    /// of that kind exists.
    async fn replace_track(&self, kind: TrackKind, track: Arc<MediaTrack>) -> Result<bool>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        participant: ParticipantId,
        generation: u64,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
