use meshcall_core::{MediaPermissionState, ParticipantId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    PermissionPending,
    AcquiringMedia,
    JoiningSignaling,
    Active,
    Ending,
    Ended,
    Error {
        message: String,
        /// The user can fix this from the UI (`retry_media`).
        retriable: bool,
    },
}

impl CallState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PermissionPending => "permission-pending",
            Self::AcquiringMedia => "acquiring-media",
            Self::JoiningSignaling => "joining-signaling",
            Self::Active => "active",
            Self::Ending => "ending",
            Self::Ended => "ended",
            Self::Error { .. } => "error",
        }
    }

    /// A new call may be started from here.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Ended | Self::Error { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// What the local user is currently sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalMediaState {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
}

/// Snapshot published by the session on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallStatus {
    /// Fresh for every `start_call`.
    pub local_id: Option<ParticipantId>,
    pub state: CallState,
    pub media: LocalMediaState,
    pub permission: MediaPermissionState,
}
