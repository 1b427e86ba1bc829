use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Browser-shaped session description: `{ "type": "offer", "sdp": "v=0..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpPayload {
    pub sdp: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub candidate: IceCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLeftPayload {
    pub id: ParticipantId,
}

/// Messages exchanged with the signaling relay.
///
/// Everything after `join` that travels between peers is unicast and carries
/// a `to` field; relay notifications (`participants`, `auth-error`,
/// `participant-left`) do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    #[serde(rename_all = "camelCase")]
    Join {
        room_id: RoomId,
        client_id: ParticipantId,
        room_token: String,
    },
    Participants {
        payload: Vec<ParticipantId>,
    },
    Offer {
        from: ParticipantId,
        to: ParticipantId,
        payload: SdpPayload,
    },
    Answer {
        from: ParticipantId,
        to: ParticipantId,
        payload: SdpPayload,
    },
    Candidate {
        from: ParticipantId,
        to: ParticipantId,
        payload: CandidatePayload,
    },
    AuthError {
        payload: AuthErrorPayload,
    },
    ParticipantLeft {
        payload: ParticipantLeftPayload,
    },
}

impl SignalMessage {
    pub fn offer(from: ParticipantId, to: ParticipantId, sdp: SessionDescription) -> Self {
        Self::Offer {
            from,
            to,
            payload: SdpPayload { sdp },
        }
    }

    pub fn answer(from: ParticipantId, to: ParticipantId, sdp: SessionDescription) -> Self {
        Self::Answer {
            from,
            to,
            payload: SdpPayload { sdp },
        }
    }

    pub fn candidate(from: ParticipantId, to: ParticipantId, candidate: IceCandidate) -> Self {
        Self::Candidate {
            from,
            to,
            payload: CandidatePayload { candidate },
        }
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::AuthError {
            payload: AuthErrorPayload {
                message: message.into(),
            },
        }
    }

    pub fn participant_left(id: ParticipantId) -> Self {
        Self::ParticipantLeft {
            payload: ParticipantLeftPayload { id },
        }
    }

    pub fn sender(&self) -> Option<&ParticipantId> {
        match self {
            Self::Offer { from, .. } | Self::Answer { from, .. } | Self::Candidate { from, .. } => {
                Some(from)
            }
            _ => None,
        }
    }

    pub fn recipient(&self) -> Option<&ParticipantId> {
        match self {
            Self::Offer { to, .. } | Self::Answer { to, .. } | Self::Candidate { to, .. } => Some(to),
            _ => None,
        }
    }

    /// Rewrites the sender field; the relay uses it so peers cannot spoof `from`.
    pub fn set_sender(&mut self, id: ParticipantId) {
        match self {
            Self::Offer { from, .. } | Self::Answer { from, .. } | Self::Candidate { from, .. } => {
                *from = id;
            }
            _ => {}
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Participants { .. } => "participants",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::AuthError { .. } => "auth-error",
            Self::ParticipantLeft { .. } => "participant-left",
        }
    }
}
