use futures::{SinkExt, StreamExt};
use meshcall_core::{ParticipantId, RoomId, SignalMessage};
use meshcall_relay::{RelayService, WS_PATH};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Binds the relay on an ephemeral port and returns its websocket URL.
pub async fn start_relay(service: RelayService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(meshcall_relay::serve(listener, service));
    format!("ws://{addr}{WS_PATH}")
}

/// Raw websocket client speaking the signaling wire format.
pub struct TestClient {
    pub id: ParticipantId,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str, id: &str) -> Self {
        let (socket, _) = connect_async(url).await.expect("Failed to connect");
        Self {
            id: ParticipantId::from(id),
            socket,
        }
    }

    /// Connects and sends `join` for `room` with `token`.
    pub async fn join(url: &str, id: &str, room: &str, token: &str) -> Self {
        let mut client = Self::connect(url, id).await;
        client
            .send(&SignalMessage::Join {
                room_id: RoomId::from(room),
                client_id: ParticipantId::from(id),
                room_token: token.into(),
            })
            .await;
        client
    }

    pub async fn send(&mut self, msg: &SignalMessage) {
        let text = serde_json::to_string(msg).expect("encode");
        self.socket
            .send(Message::Text(text))
            .await
            .expect("Failed to send frame");
    }

    /// Next signaling message, or `None` if the socket closed or nothing
    /// arrived within two seconds.
    pub async fn recv(&mut self) -> Option<SignalMessage> {
        loop {
            let frame = timeout(Duration::from_secs(2), self.socket.next())
                .await
                .ok()??;
            match frame.ok()? {
                Message::Text(text) => return serde_json::from_str(&text).ok(),
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// True when nothing arrives for `ms` milliseconds.
    pub async fn is_quiet(&mut self, ms: u64) -> bool {
        timeout(Duration::from_millis(ms), self.socket.next())
            .await
            .is_err()
    }

    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}
