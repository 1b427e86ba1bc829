use meshcall_core::ParticipantId;
use thiserror::Error;

/// Capture-layer failures, classified from the platform error name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("camera or microphone access was denied")]
    PermissionDenied,

    #[error("no camera or microphone was found")]
    DeviceNotFound,

    #[error("camera or microphone is already in use by another application")]
    DeviceBusy,

    #[error("media access failed: {0}")]
    MediaAccess(String),
}

impl MediaError {
    /// Maps a platform error name (`NotAllowedError`, `NotFoundError`, ...) to
    /// the capture taxonomy.
    pub fn classify(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                Self::DeviceNotFound
            }
            "NotReadableError" | "TrackStartError" | "AbortError" => Self::DeviceBusy,
            _ => Self::MediaAccess(format!("{name}: {message}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("signaling relay rejected the join: {0}")]
    Auth(String),

    #[error("signaling transport closed")]
    TransportClosed,

    #[error("failed to reach signaling relay: {0}")]
    Connect(String),

    #[error("malformed signaling message: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for SignalingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error("negotiation with {participant} failed: {reason}")]
    NegotiationFailed {
        participant: ParticipantId,
        reason: String,
    },

    #[error("operation not allowed while the call is {0}")]
    InvalidState(&'static str),

    #[error("call session is no longer running")]
    SessionClosed,
}

impl CallError {
    /// Only a denied permission can be fixed by the user from within the call.
    pub fn is_user_retriable(&self) -> bool {
        matches!(self, Self::Media(MediaError::PermissionDenied))
    }
}
