use crate::error::SignalingError;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ParticipantId, RoomId, SignalMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Outbound half of signaling as seen by negotiation.
pub trait SignalSender: Send + Sync {
    fn send(&self, msg: SignalMessage) -> Result<(), SignalingError>;
}

/// What the relay told us, already filtered to this client.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// Members present before we joined, never including ourselves.
    Roster(Vec<ParticipantId>),
    /// Unicast `offer`/`answer`/`candidate` addressed to us.
    Signal(SignalMessage),
    ParticipantLeft(ParticipantId),
    /// Terminal; the channel is closed when this arrives.
    AuthRejected(String),
    /// The transport went away without `close()` being called.
    Disconnected,
}

pub type SignalingEvents = mpsc::UnboundedReceiver<SignalingEvent>;

pub struct SignalingChannel {
    room_id: RoomId,
    client_id: ParticipantId,
    outbound: Option<mpsc::UnboundedSender<String>>,
    closed: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalingChannel {
    /// Opens a websocket to the relay and joins `room_id`.
    pub async fn connect(
        url: &str,
        room_id: RoomId,
        client_id: ParticipantId,
        room_token: String,
    ) -> Result<(Self, SignalingEvents), SignalingError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;
        info!("Connected to signaling relay at {}", url);

        let (mut sink, mut stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        // Not tracked: it exits on its own once the outbound queue is dropped,
        // after flushing what is left and sending a close frame.
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => {
                        if in_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        let (mut channel, events) = Self::attach(room_id, client_id, room_token, out_tx, in_rx)?;
        channel.tasks.push(recv_task);
        Ok((channel, events))
    }

    /// Builds a channel over raw text frame queues and sends `join` right away.
    pub fn attach(
        room_id: RoomId,
        client_id: ParticipantId,
        room_token: String,
        wire_tx: mpsc::UnboundedSender<String>,
        wire_rx: mpsc::UnboundedReceiver<String>,
    ) -> Result<(Self, SignalingEvents), SignalingError> {
        let join = SignalMessage::Join {
            room_id: room_id.clone(),
            client_id: client_id.clone(),
            room_token,
        };
        wire_tx
            .send(serde_json::to_string(&join)?)
            .map_err(|_| SignalingError::TransportClosed)?;
        debug!("Sent join for {} as {}", room_id, client_id);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let dispatch_task = tokio::spawn(dispatch(
            client_id.clone(),
            wire_rx,
            events_tx,
            closed.clone(),
        ));

        let channel = Self {
            room_id,
            client_id,
            outbound: Some(wire_tx),
            closed,
            tasks: vec![dispatch_task],
        };
        Ok((channel, events_rx))
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn client_id(&self) -> &ParticipantId {
        &self.client_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.outbound.is_none()
    }

    /// Idempotent. No `Disconnected` event follows an explicit close.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) && self.outbound.is_none() {
            return;
        }
        self.outbound = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Signaling channel for {} closed", self.client_id);
    }
}

impl SignalSender for SignalingChannel {
    fn send(&self, msg: SignalMessage) -> Result<(), SignalingError> {
        let Some(outbound) = &self.outbound else {
            return Err(SignalingError::TransportClosed);
        };
        if self.closed.load(Ordering::SeqCst) {
            return Err(SignalingError::TransportClosed);
        }
        trace!("-> {}", msg.kind());
        outbound
            .send(serde_json::to_string(&msg)?)
            .map_err(|_| SignalingError::TransportClosed)
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

async fn dispatch(
    client_id: ParticipantId,
    mut wire_rx: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SignalingEvent>,
    closed: Arc<AtomicBool>,
) {
    while let Some(text) = wire_rx.recv().await {
        let msg = match serde_json::from_str::<SignalMessage>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid signaling frame: {}", e);
                continue;
            }
        };

        let event = match msg {
            SignalMessage::Participants { payload } => SignalingEvent::Roster(
                payload.into_iter().filter(|id| id != &client_id).collect(),
            ),
            SignalMessage::AuthError { payload } => {
                warn!("Relay rejected join: {}", payload.message);
                closed.store(true, Ordering::SeqCst);
                let _ = events.send(SignalingEvent::AuthRejected(payload.message));
                return;
            }
            SignalMessage::ParticipantLeft { payload } if payload.id == client_id => continue,
            SignalMessage::ParticipantLeft { payload } => {
                SignalingEvent::ParticipantLeft(payload.id)
            }
            SignalMessage::Join { .. } => {
                debug!("Ignoring join echoed by relay");
                continue;
            }
            msg if msg.recipient() != Some(&client_id) => {
                trace!("Discarding {} addressed to someone else", msg.kind());
                continue;
            }
            msg => SignalingEvent::Signal(msg),
        };

        if events.send(event).is_err() {
            return;
        }
    }

    if !closed.swap(true, Ordering::SeqCst) {
        warn!("Signaling transport closed unexpectedly");
        let _ = events.send(SignalingEvent::Disconnected);
    }
}
