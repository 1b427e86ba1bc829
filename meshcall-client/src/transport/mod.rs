mod peer_transport;
mod transport_event;
mod webrtc_transport;

pub use peer_transport::{PeerTransport, TransportFactory};
pub use transport_event::{RemoteTrack, TransportEvent, TransportState};
pub use webrtc_transport::{WebRtcRemoteTrack, WebRtcTransport, WebRtcTransportFactory};
