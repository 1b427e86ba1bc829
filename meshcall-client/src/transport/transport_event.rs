use crate::media::TrackKind;
use meshcall_core::{IceCandidate, ParticipantId};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// An inbound media track surfaced by a transport.
pub trait RemoteTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> String;
    fn stream_id(&self) -> String;
    fn kind(&self) -> TrackKind;
    /// Lets the rendering layer reach the concrete track type.
    fn as_any(&self) -> &dyn Any;
}

/// Callbacks from a transport, queued for the call loop.
///
/// `generation` identifies the registry entry that owned the transport when
/// the event was produced; events from a closed entry are dropped.
#[derive(Debug)]
pub enum TransportEvent {
    LocalCandidate {
        participant: ParticipantId,
        generation: u64,
        candidate: IceCandidate,
    },
    StateChanged {
        participant: ParticipantId,
        generation: u64,
        state: TransportState,
    },
    RemoteTrack {
        participant: ParticipantId,
        generation: u64,
        track: Arc<dyn RemoteTrack>,
    },
}

impl TransportEvent {
    pub fn participant(&self) -> &ParticipantId {
        match self {
            Self::LocalCandidate { participant, .. }
            | Self::StateChanged { participant, .. }
            | Self::RemoteTrack { participant, .. } => participant,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::LocalCandidate { generation, .. }
            | Self::StateChanged { generation, .. }
            | Self::RemoteTrack { generation, .. } => *generation,
        }
    }
}
