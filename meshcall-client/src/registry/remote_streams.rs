use crate::transport::RemoteTrack;
use dashmap::DashMap;
use meshcall_core::ParticipantId;
use std::sync::Arc;

/// Remote media of one participant.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub stream_id: String,
    pub tracks: Vec<Arc<dyn RemoteTrack>>,
}

/// Participant id → remote stream, read by the rendering layer.
///
/// Clones share the same map. Only the peer connection registry writes to it.
#[derive(Clone, Default)]
pub struct RemoteStreamRegistry {
    streams: Arc<DashMap<ParticipantId, RemoteStream>>,
}

impl RemoteStreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `track` to the participant's stream. A track from a different
    /// stream replaces whatever was there before.
    pub(crate) fn publish(&self, participant: ParticipantId, track: Arc<dyn RemoteTrack>) {
        let stream_id = track.stream_id();
        let mut entry = self
            .streams
            .entry(participant)
            .or_insert_with(|| RemoteStream {
                stream_id: stream_id.clone(),
                tracks: Vec::new(),
            });

        if entry.stream_id != stream_id {
            *entry = RemoteStream {
                stream_id,
                tracks: Vec::new(),
            };
        }

        let track_id = track.id();
        entry.tracks.retain(|t| t.id() != track_id);
        entry.tracks.push(track);
    }

    pub(crate) fn remove(&self, participant: &ParticipantId) -> bool {
        self.streams.remove(participant).is_some()
    }

    pub(crate) fn clear(&self) {
        self.streams.clear();
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<RemoteStream> {
        self.streams.get(participant).map(|s| s.clone())
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.streams.contains_key(participant)
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.streams.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
