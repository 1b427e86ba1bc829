mod media;
mod participant;
mod room;
mod signaling;

pub use media::MediaPermissionState;
pub use participant::{ConnectionState, Participant, ParticipantId};
pub use room::{Room, RoomId};
pub use signaling::{
    AuthErrorPayload, CandidatePayload, IceCandidate, IceServerConfig, ParticipantLeftPayload,
    SdpPayload, SdpType, SessionDescription, SignalMessage,
};
