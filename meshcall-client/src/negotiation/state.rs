use crate::transport::TransportState;
use meshcall_core::{ConnectionState, IceCandidate, ParticipantId, SessionDescription};

/// Per-peer offer/answer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    OfferSent,
    OfferReceived,
    AnswerExchanged,
    Connected,
    Failed,
    Closed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    pub fn connection_state(self) -> ConnectionState {
        match self {
            Self::Idle => ConnectionState::New,
            Self::OfferSent | Self::OfferReceived | Self::AnswerExchanged => {
                ConnectionState::Negotiating
            }
            Self::Connected => ConnectionState::Connected,
            Self::Failed => ConnectionState::Failed,
            Self::Closed => ConnectionState::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationInput {
    /// We learned of the peer and should call it.
    Originate,
    RemoteOffer(SessionDescription),
    RemoteAnswer(SessionDescription),
    RemoteCandidate(IceCandidate),
    LocalCandidate(IceCandidate),
    /// Our answer went out.
    AnswerSent,
    Transport(TransportState),
    /// A local step (SDP creation, description apply) failed.
    LocalError,
    Teardown,
}

/// Side effects the executor performs after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Create an offer, set it locally, send it.
    SendOffer,
    /// Set the remote offer, flush candidates, create + set + send an answer.
    AcceptOffer(SessionDescription),
    /// Drop our own pending offer, then accept theirs on a fresh transport.
    YieldAndAccept(SessionDescription),
    ApplyAnswer(SessionDescription),
    ApplyCandidate(IceCandidate),
    RelayCandidate(IceCandidate),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: NegotiationState,
    pub actions: Vec<Action>,
    /// Set when the input was dropped; explains why.
    pub ignored: Option<&'static str>,
}

impl Transition {
    fn to(next: NegotiationState, actions: Vec<Action>) -> Self {
        Self {
            next,
            actions,
            ignored: None,
        }
    }

    fn ignore(current: NegotiationState, reason: &'static str) -> Self {
        Self {
            next: current,
            actions: Vec::new(),
            ignored: Some(reason),
        }
    }
}

/// The side with the lexicographically smaller id yields when both peers
/// offer at once.
pub fn is_polite(local: &ParticipantId, remote: &ParticipantId) -> bool {
    local < remote
}

/// Pure per-peer transition: no I/O, no registry access.
pub fn transition(
    local: &ParticipantId,
    remote: &ParticipantId,
    current: NegotiationState,
    input: NegotiationInput,
) -> Transition {
    use NegotiationState::*;

    // A retired peer only comes back through a fresh offer.
    if current.is_terminal() {
        return match input {
            NegotiationInput::RemoteOffer(sdp) => {
                Transition::to(OfferReceived, vec![Action::AcceptOffer(sdp)])
            }
            NegotiationInput::Teardown if current == Failed => {
                Transition::to(Closed, vec![Action::Close])
            }
            _ if current == Closed => Transition::ignore(current, "peer is closed"),
            _ => Transition::ignore(current, "peer has failed"),
        };
    }

    match input {
        NegotiationInput::Teardown => Transition::to(Closed, vec![Action::Close]),

        NegotiationInput::Originate => match current {
            Idle => Transition::to(OfferSent, vec![Action::SendOffer]),
            _ => Transition::ignore(current, "negotiation already under way"),
        },

        NegotiationInput::RemoteOffer(sdp) => match current {
            Idle => Transition::to(OfferReceived, vec![Action::AcceptOffer(sdp)]),
            OfferSent if is_polite(local, remote) => {
                Transition::to(OfferReceived, vec![Action::YieldAndAccept(sdp)])
            }
            OfferSent => Transition::ignore(current, "glare: keeping our own offer"),
            _ => Transition::ignore(current, "offer already exchanged"),
        },

        NegotiationInput::AnswerSent => match current {
            OfferReceived => Transition::to(AnswerExchanged, Vec::new()),
            _ => Transition::ignore(current, "no offer being answered"),
        },

        NegotiationInput::RemoteAnswer(sdp) => match current {
            OfferSent => Transition::to(AnswerExchanged, vec![Action::ApplyAnswer(sdp)]),
            _ => Transition::ignore(current, "answer without a pending offer"),
        },

        NegotiationInput::RemoteCandidate(c) => {
            Transition::to(current, vec![Action::ApplyCandidate(c)])
        }

        NegotiationInput::LocalCandidate(c) => {
            Transition::to(current, vec![Action::RelayCandidate(c)])
        }

        NegotiationInput::Transport(TransportState::Connected) => match current {
            AnswerExchanged => Transition::to(Connected, Vec::new()),
            _ => Transition::ignore(current, "connected before answer exchange"),
        },

        NegotiationInput::Transport(TransportState::Failed) | NegotiationInput::LocalError => {
            Transition::to(Failed, vec![Action::Close])
        }

        NegotiationInput::Transport(TransportState::Closed) => {
            Transition::to(Closed, vec![Action::Close])
        }

        // ICE may still recover from `disconnected`; it reports `failed` if not.
        NegotiationInput::Transport(_) => Transition::ignore(current, "transient transport state"),
    }
}
