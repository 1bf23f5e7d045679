use crate::app::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use chorus_core::{ClientMessage, ConnectionId, ServerMessage};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let cid = ConnectionId::generate();
    let span = info_span!("connection", cid = %cid);

    ws.on_upgrade(move |socket| handle_socket(socket, cid, state).instrument(span))
}

async fn handle_socket(socket: WebSocket, cid: ConnectionId, state: AppState) {
    info!("New WebSocket connection: {}", cid);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.service.add_peer(cid.clone(), tx);

    let welcome = ServerMessage::Welcome {
        connection_id: cid.clone(),
        ice_servers: state.service.ice_servers(),
    };
    if let Err(e) = state.service.send_signal(&cid, &welcome) {
        warn!("Failed to queue welcome frame: {}", e);
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let router = state.router.clone();
        let cid = cid.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => router.handle_message(&cid, msg).await,
                        Err(e) => warn!("Invalid ClientMessage from {}: {}", cid, e),
                    },
                    Message::Close(_) => break,
                    _ => debug!("Ignoring non-text frame from {}", cid),
                }
            }
        }
        .in_current_span()
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.service.remove_peer(&cid);
    state.router.disconnect(&cid).await;
    info!("WebSocket disconnected: {}", cid);
}
