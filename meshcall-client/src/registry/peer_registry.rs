use crate::media::{MediaTrack, TrackKind};
use crate::negotiation::NegotiationState;
use crate::registry::remote_streams::RemoteStreamRegistry;
use crate::transport::{PeerTransport, RemoteTrack, TransportEvent, TransportFactory};
use anyhow::{Context, Result};
use meshcall_core::{IceCandidate, ParticipantId, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    /// Held until the remote description is set.
    Buffered,
    Applied,
    /// The transport refused it; logged and dropped.
    Rejected,
}

/// The single live connection to one remote participant.
pub struct PeerConnectionEntry {
    participant_id: ParticipantId,
    generation: u64,
    transport: Arc<dyn PeerTransport>,
    pending_candidates: Vec<IceCandidate>,
    local_description_set: bool,
    remote_description_set: bool,
    negotiation: NegotiationState,
}

impl PeerConnectionEntry {
    fn new(participant_id: ParticipantId, generation: u64, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            participant_id,
            generation,
            transport,
            pending_candidates: Vec::new(),
            local_description_set: false,
            remote_description_set: false,
            negotiation: NegotiationState::Idle,
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn transport(&self) -> &Arc<dyn PeerTransport> {
        &self.transport
    }

    pub fn pending_candidates(&self) -> &[IceCandidate] {
        &self.pending_candidates
    }

    pub fn local_description_set(&self) -> bool {
        self.local_description_set
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    pub fn negotiation(&self) -> NegotiationState {
        self.negotiation
    }

    pub(crate) fn set_negotiation(&mut self, state: NegotiationState) {
        self.negotiation = state;
    }

    pub async fn set_local_description(&mut self, desc: SessionDescription) -> Result<()> {
        self.transport.set_local_description(desc).await?;
        self.local_description_set = true;
        Ok(())
    }

    /// Sets the remote description, then applies every buffered candidate in
    /// arrival order. Returns how many candidates were flushed.
    pub async fn set_remote_description(&mut self, desc: SessionDescription) -> Result<usize> {
        self.transport.set_remote_description(desc).await?;
        self.remote_description_set = true;

        let pending = std::mem::take(&mut self.pending_candidates);
        let flushed = pending.len();
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
        if flushed > 0 {
            debug!(
                "Flushed {} buffered candidate(s) for {}",
                flushed, self.participant_id
            );
        }
        Ok(flushed)
    }

    pub async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> CandidateDisposition {
        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return CandidateDisposition::Buffered;
        }
        self.apply_candidate(candidate).await
    }

    async fn apply_candidate(&self, candidate: IceCandidate) -> CandidateDisposition {
        match self.transport.add_ice_candidate(candidate).await {
            Ok(()) => CandidateDisposition::Applied,
            Err(e) => {
                warn!(
                    "Failed to add ICE candidate for {}: {:?}",
                    self.participant_id, e
                );
                CandidateDisposition::Rejected
            }
        }
    }
}

/// Owns every peer transport of the call, one per remote participant.
pub struct PeerConnectionRegistry {
    factory: Arc<dyn TransportFactory>,
    events_tx: mpsc::Sender<TransportEvent>,
    entries: HashMap<ParticipantId, PeerConnectionEntry>,
    /// Last state of peers whose entry was closed after failing or leaving.
    retired: HashMap<ParticipantId, NegotiationState>,
    next_generation: u64,
    local_tracks: Vec<Arc<MediaTrack>>,
    remote_streams: RemoteStreamRegistry,
}

impl PeerConnectionRegistry {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        events_tx: mpsc::Sender<TransportEvent>,
        remote_streams: RemoteStreamRegistry,
    ) -> Self {
        Self {
            factory,
            events_tx,
            entries: HashMap::new(),
            retired: HashMap::new(),
            next_generation: 1,
            local_tracks: Vec::new(),
            remote_streams,
        }
    }

    /// Tracks attached to every transport created from now on.
    pub fn set_local_tracks(&mut self, tracks: Vec<Arc<MediaTrack>>) {
        self.local_tracks = tracks;
    }

    pub fn local_tracks(&self) -> &[Arc<MediaTrack>] {
        &self.local_tracks
    }

    pub fn remote_streams(&self) -> &RemoteStreamRegistry {
        &self.remote_streams
    }

    /// Returns the entry for `participant`, creating the transport only if
    /// none exists yet.
    pub async fn get_or_create(
        &mut self,
        participant: &ParticipantId,
    ) -> Result<&mut PeerConnectionEntry> {
        if !self.entries.contains_key(participant) {
            let entry = self.create_entry(participant).await?;
            self.retired.remove(participant);
            self.entries.insert(participant.clone(), entry);
        }
        self.entries
            .get_mut(participant)
            .context("peer entry missing right after insertion")
    }

    async fn create_entry(&mut self, participant: &ParticipantId) -> Result<PeerConnectionEntry> {
        let generation = self.next_generation;
        self.next_generation += 1;

        info!(
            "Creating transport for {} (generation {})",
            participant, generation
        );
        let transport = self
            .factory
            .create(participant.clone(), generation, self.events_tx.clone())
            .await
            .with_context(|| format!("Failed to create transport for {participant}"))?;

        for track in &self.local_tracks {
            if let Err(e) = transport.add_track(track.clone()).await {
                let _ = transport.close().await;
                return Err(e.context(format!("Failed to attach local track for {participant}")));
            }
        }

        Ok(PeerConnectionEntry::new(
            participant.clone(),
            generation,
            transport,
        ))
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&PeerConnectionEntry> {
        self.entries.get(participant)
    }

    pub fn get_mut(&mut self, participant: &ParticipantId) -> Option<&mut PeerConnectionEntry> {
        self.entries.get_mut(participant)
    }

    /// Negotiation state of `participant`: its live entry, else how it ended,
    /// else `Idle`.
    pub fn negotiation_state(&self, participant: &ParticipantId) -> NegotiationState {
        match self.entries.get(participant) {
            Some(entry) => entry.negotiation(),
            None => self
                .retired
                .get(participant)
                .copied()
                .unwrap_or_default(),
        }
    }

    /// Remembers that `participant` ended in `state` so late messages from it
    /// do not bring up a new transport.
    pub(crate) fn retire(&mut self, participant: &ParticipantId, state: NegotiationState) {
        if state.is_terminal() && !self.entries.contains_key(participant) {
            self.retired.insert(participant.clone(), state);
        }
    }

    pub fn is_retired(&self, participant: &ParticipantId) -> bool {
        self.retired.contains_key(participant)
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.entries.contains_key(participant)
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Liveness check for transport callbacks: only the entry that produced
    /// an event may still act on it.
    pub fn is_current(&self, participant: &ParticipantId, generation: u64) -> bool {
        self.entries
            .get(participant)
            .is_some_and(|e| e.generation == generation)
    }

    /// Buffers or applies a candidate received over signaling, creating the
    /// entry when the candidate outruns the offer.
    pub async fn on_remote_candidate(
        &mut self,
        participant: &ParticipantId,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition> {
        let entry = self.get_or_create(participant).await?;
        Ok(entry.on_remote_candidate(candidate).await)
    }

    /// Publishes an incoming track, unless it belongs to a closed entry.
    pub fn on_remote_track(
        &mut self,
        participant: &ParticipantId,
        generation: u64,
        track: Arc<dyn RemoteTrack>,
    ) -> bool {
        if !self.is_current(participant, generation) {
            debug!(
                "Dropping track {} from stale transport of {}",
                track.id(),
                participant
            );
            return false;
        }
        self.remote_streams.publish(participant.clone(), track);
        true
    }

    pub async fn remove(&mut self, participant: &ParticipantId) -> bool {
        self.remote_streams.remove(participant);

        let Some(entry) = self.entries.remove(participant) else {
            return false;
        };
        info!("Closing transport for {}", participant);
        if let Err(e) = entry.transport.close().await {
            warn!("Failed to close transport for {}: {:?}", participant, e);
        }
        true
    }

    /// Closes every transport. Safe on an empty registry and when repeated.
    pub async fn close_all(&mut self) {
        for (participant, entry) in self.entries.drain() {
            if let Err(e) = entry.transport.close().await {
                warn!("Failed to close transport for {}: {:?}", participant, e);
            }
        }
        self.retired.clear();
        self.remote_streams.clear();
    }

    /// Makes `track` the outgoing video on every live transport without
    /// renegotiating, and the video source for transports created later.
    /// Returns how many transports switched.
    pub async fn replace_video_source(&mut self, track: Arc<MediaTrack>) -> usize {
        self.local_tracks.retain(|t| t.kind() != TrackKind::Video);
        self.local_tracks.push(track.clone());

        let mut replaced = 0;
        for (participant, entry) in &self.entries {
            match entry
                .transport
                .replace_track(TrackKind::Video, track.clone())
                .await
            {
                Ok(true) => replaced += 1,
                Ok(false) => warn!("{} has no outgoing video to replace", participant),
                Err(e) => warn!("Video replacement failed for {}: {:?}", participant, e),
            }
        }
        replaced
    }
}
