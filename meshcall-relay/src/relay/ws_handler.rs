use crate::auth::JoinError;
use crate::relay::RelayService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use meshcall_core::SignalMessage;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();

    // Первое сообщение обязано быть join.
    let join = match receiver.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str::<SignalMessage>(&text).ok(),
        _ => None,
    };
    let Some(SignalMessage::Join {
        room_id,
        client_id,
        room_token,
    }) = join
    else {
        reject(&mut sender, JoinError::ExpectedJoin).await;
        return;
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let roster = match service.join(room_id.clone(), client_id.clone(), &room_token, tx) {
        Ok(roster) => roster,
        Err(e) => {
            warn!("Rejected join of {} to room {}: {}", client_id, room_id, e);
            reject(&mut sender, e).await;
            return;
        }
    };
    service.send_signal(&client_id, &SignalMessage::Participants { payload: roster });

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let client_id = client_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(SignalMessage::Join { .. }) => {
                            warn!("{} sent a second join; ignoring", client_id);
                        }
                        Ok(signal) => {
                            service.route(&client_id, signal);
                        }
                        Err(e) => warn!("Invalid SignalMessage from {}: {:?}", client_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.leave(&client_id);
    info!("WebSocket disconnected: {}", client_id);
}

async fn reject(sender: &mut SplitSink<WebSocket, Message>, reason: JoinError) {
    let msg = SignalMessage::auth_error(reason.to_string());
    if let Ok(json) = serde_json::to_string(&msg) {
        let _ = sender.send(Message::Text(json.into())).await;
    }
    let _ = sender.send(Message::Close(None)).await;
}
