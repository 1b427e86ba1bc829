use crate::auth::{JoinError, RoomAuthorizer};
use axum::extract::ws::Message;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use meshcall_core::{ParticipantId, RoomId, SignalMessage};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct ClientSlot {
    room_id: RoomId,
    tx: mpsc::UnboundedSender<Message>,
}

struct RelayInner {
    clients: DashMap<ParticipantId, ClientSlot>,
    rooms: DashMap<RoomId, BTreeSet<ParticipantId>>,
    authorizer: Box<dyn RoomAuthorizer>,
}

/// Room membership plus unicast forwarding between members.
///
/// The relay never looks inside SDP or candidates; it only checks that
/// sender and recipient share a room and stamps `from`.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(authorizer: impl RoomAuthorizer + 'static) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                clients: DashMap::new(),
                rooms: DashMap::new(),
                authorizer: Box::new(authorizer),
            }),
        }
    }

    /// Admits `client_id` to `room_id` and returns the members that were
    /// already there.
    pub fn join(
        &self,
        room_id: RoomId,
        client_id: ParticipantId,
        token: &str,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Result<Vec<ParticipantId>, JoinError> {
        if client_id.as_str().trim().is_empty() {
            return Err(JoinError::EmptyClientId);
        }
        self.inner.authorizer.authorize(&room_id, token)?;

        match self.inner.clients.entry(client_id.clone()) {
            Entry::Occupied(_) => return Err(JoinError::DuplicateClientId(client_id)),
            Entry::Vacant(slot) => {
                slot.insert(ClientSlot {
                    room_id: room_id.clone(),
                    tx,
                });
            }
        }

        let mut members = self.inner.rooms.entry(room_id.clone()).or_default();
        let roster: Vec<ParticipantId> = members.iter().cloned().collect();
        members.insert(client_id.clone());

        info!(
            "{} joined room {} ({} already present)",
            client_id,
            room_id,
            roster.len()
        );
        Ok(roster)
    }

    /// Forwards a unicast message to its `to`, if that member shares the
    /// sender's room. Returns whether it was delivered.
    pub fn route(&self, from: &ParticipantId, mut msg: SignalMessage) -> bool {
        let Some(to) = msg.recipient().cloned() else {
            warn!("{} sent {} which is not relayable", from, msg.kind());
            return false;
        };

        let Some(room_id) = self.room_of(from) else {
            warn!("Message from unknown client {}", from);
            return false;
        };
        if self.room_of(&to).as_ref() != Some(&room_id) {
            debug!("Dropping {} from {} to {}: not in room {}", msg.kind(), from, to, room_id);
            return false;
        }

        msg.set_sender(from.clone());
        self.send_signal(&to, &msg)
    }

    /// Removes the client and tells the rest of its room.
    pub fn leave(&self, client_id: &ParticipantId) {
        let Some((_, slot)) = self.inner.clients.remove(client_id) else {
            return;
        };

        let remaining: Vec<ParticipantId> = match self.inner.rooms.get_mut(&slot.room_id) {
            Some(mut members) => {
                members.remove(client_id);
                members.iter().cloned().collect()
            }
            None => Vec::new(),
        };
        self.inner
            .rooms
            .remove_if(&slot.room_id, |_, members| members.is_empty());

        info!("{} left room {}", client_id, slot.room_id);
        let notice = SignalMessage::participant_left(client_id.clone());
        for member in &remaining {
            self.send_signal(member, &notice);
        }
    }

    pub fn send_signal(&self, client_id: &ParticipantId, msg: &SignalMessage) -> bool {
        let Some(client) = self.inner.clients.get(client_id) else {
            warn!("Attempted to send signal to disconnected client {}", client_id);
            return false;
        };
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = client.tx.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", client_id, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize signal message: {}", e);
                false
            }
        }
    }

    pub fn room_members(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.inner
            .rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.len()
    }

    fn room_of(&self, client_id: &ParticipantId) -> Option<RoomId> {
        self.inner
            .clients
            .get(client_id)
            .map(|slot| slot.room_id.clone())
    }
}
