use crate::error::CallError;
use crate::negotiation::state::{Action, NegotiationInput, NegotiationState, transition};
use crate::registry::{CandidateDisposition, PeerConnectionRegistry};
use crate::signaling::SignalSender;
use crate::transport::TransportEvent;
use anyhow::{Context, Result};
use meshcall_core::{ParticipantId, SessionDescription, SignalMessage};
use tracing::{debug, info, trace, warn};

/// Outcome of one negotiation step that changed a peer's state.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerUpdate {
    pub participant: ParticipantId,
    pub state: NegotiationState,
    /// Present when the peer failed locally; the call itself carries on.
    pub failure: Option<CallError>,
}

/// Drives offer/answer/candidate exchange for every peer of the call.
///
/// Holds no per-peer state of its own: that lives in the registry entries.
/// Each input runs [`transition`] and then performs the resulting actions.
pub struct Negotiator {
    local_id: ParticipantId,
}

impl Negotiator {
    pub fn new(local_id: ParticipantId) -> Self {
        Self { local_id }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    /// Caller path: start a session towards `peer`.
    pub async fn originate(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        peer: &ParticipantId,
    ) -> Option<PeerUpdate> {
        if peer == &self.local_id {
            return None;
        }
        self.drive(registry, signaling, peer, NegotiationInput::Originate)
            .await
    }

    pub async fn handle_signal(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        msg: SignalMessage,
    ) -> Option<PeerUpdate> {
        if msg.recipient() != Some(&self.local_id) {
            debug!("Ignoring {} not addressed to us", msg.kind());
            return None;
        }

        let (peer, input) = match msg {
            SignalMessage::Offer { from, payload, .. } => {
                (from, NegotiationInput::RemoteOffer(payload.sdp))
            }
            SignalMessage::Answer { from, payload, .. } => {
                (from, NegotiationInput::RemoteAnswer(payload.sdp))
            }
            SignalMessage::Candidate { from, payload, .. } => {
                (from, NegotiationInput::RemoteCandidate(payload.candidate))
            }
            _ => return None,
        };

        if peer == self.local_id {
            return None;
        }
        self.drive(registry, signaling, &peer, input).await
    }

    pub async fn handle_transport_event(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        event: TransportEvent,
    ) -> Option<PeerUpdate> {
        if !registry.is_current(event.participant(), event.generation()) {
            trace!(
                "Dropping event from stale transport of {}",
                event.participant()
            );
            return None;
        }

        match event {
            TransportEvent::LocalCandidate {
                participant,
                candidate,
                ..
            } => {
                self.drive(
                    registry,
                    signaling,
                    &participant,
                    NegotiationInput::LocalCandidate(candidate),
                )
                .await
            }
            TransportEvent::StateChanged {
                participant, state, ..
            } => {
                self.drive(
                    registry,
                    signaling,
                    &participant,
                    NegotiationInput::Transport(state),
                )
                .await
            }
            TransportEvent::RemoteTrack {
                participant,
                generation,
                track,
            } => {
                registry.on_remote_track(&participant, generation, track);
                None
            }
        }
    }

    /// Explicit teardown of one peer (it left the room).
    pub async fn close_peer(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        peer: &ParticipantId,
    ) -> Option<PeerUpdate> {
        self.drive(registry, signaling, peer, NegotiationInput::Teardown)
            .await
    }

    async fn drive(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        peer: &ParticipantId,
        input: NegotiationInput,
    ) -> Option<PeerUpdate> {
        let current = registry.negotiation_state(peer);

        let step = transition(&self.local_id, peer, current, input);
        if let Some(reason) = step.ignored {
            debug!("{} in {:?}: {}", peer, current, reason);
            return None;
        }

        let mut state = step.next;
        let mut failure = None;
        for action in step.actions {
            if let Err(e) = self.perform(registry, signaling, peer, action).await {
                warn!("Negotiation with {} failed: {:#}", peer, e);
                registry.remove(peer).await;
                state = NegotiationState::Failed;
                failure = Some(CallError::NegotiationFailed {
                    participant: peer.clone(),
                    reason: format!("{e:#}"),
                });
                break;
            }
        }

        if state == NegotiationState::OfferReceived {
            state = transition(&self.local_id, peer, state, NegotiationInput::AnswerSent).next;
        }

        match registry.get_mut(peer) {
            Some(entry) => entry.set_negotiation(state),
            None => registry.retire(peer, state),
        }

        if state == current && failure.is_none() {
            return None;
        }
        info!("{}: {:?} -> {:?}", peer, current, state);
        Some(PeerUpdate {
            participant: peer.clone(),
            state,
            failure,
        })
    }

    async fn perform(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        peer: &ParticipantId,
        action: Action,
    ) -> Result<()> {
        match action {
            Action::SendOffer => {
                let entry = registry.get_or_create(peer).await?;
                let offer = entry.transport().create_offer().await?;
                entry.set_local_description(offer.clone()).await?;
                signaling.send(SignalMessage::offer(
                    self.local_id.clone(),
                    peer.clone(),
                    offer,
                ))?;
                debug!("Offer sent to {}", peer);
            }

            Action::AcceptOffer(sdp) => {
                self.accept_offer(registry, signaling, peer, sdp).await?;
            }

            Action::YieldAndAccept(sdp) => {
                info!("Offer collision with {}, yielding", peer);
                registry.remove(peer).await;
                self.accept_offer(registry, signaling, peer, sdp).await?;
            }

            Action::ApplyAnswer(sdp) => {
                let entry = registry
                    .get_mut(peer)
                    .with_context(|| format!("answer from {peer} without a transport"))?;
                entry.set_remote_description(sdp).await?;
            }

            Action::ApplyCandidate(candidate) => {
                let disposition = registry.on_remote_candidate(peer, candidate).await?;
                if disposition == CandidateDisposition::Buffered {
                    trace!("Buffered candidate from {}", peer);
                }
            }

            Action::RelayCandidate(candidate) => {
                signaling.send(SignalMessage::candidate(
                    self.local_id.clone(),
                    peer.clone(),
                    candidate,
                ))?;
            }

            Action::Close => {
                registry.remove(peer).await;
            }
        }
        Ok(())
    }

    async fn accept_offer(
        &self,
        registry: &mut PeerConnectionRegistry,
        signaling: &dyn SignalSender,
        peer: &ParticipantId,
        offer: SessionDescription,
    ) -> Result<()> {
        let entry = registry.get_or_create(peer).await?;
        entry.set_remote_description(offer).await?;

        let answer = entry.transport().create_answer().await?;
        entry.set_local_description(answer.clone()).await?;

        signaling.send(SignalMessage::answer(
            self.local_id.clone(),
            peer.clone(),
            answer,
        ))?;
        debug!("Answer sent to {}", peer);
        Ok(())
    }
}
