mod peer_registry;
mod remote_streams;

pub use peer_registry::{CandidateDisposition, PeerConnectionEntry, PeerConnectionRegistry};
pub use remote_streams::{RemoteStream, RemoteStreamRegistry};
