mod channel;
mod connector;

pub use channel::{SignalSender, SignalingChannel, SignalingEvent, SignalingEvents};
pub use connector::{SignalingConnector, WebSocketConnector};
