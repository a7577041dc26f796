use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use deployment::Deployment;
use futures::{SinkExt, StreamExt};
use services::services::broadcast::ServerMessage;

use crate::DeploymentImpl;

pub async fn events_ws(
    ws: WebSocketUpgrade,
    State(deployment): State<DeploymentImpl>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_events_ws(socket, deployment).await {
            tracing::warn!("events WS closed: {}", e);
        }
    })
}

async fn handle_events_ws(socket: WebSocket, deployment: DeploymentImpl) -> anyhow::Result<()> {
    let broadcast = deployment.broadcast().clone();
    let (client_id, mut rx) = broadcast.connect();
    let (mut sender, mut receiver) = socket.split();

    // Forward queued frames to the socket. Exiting drops `rx`, which is how
    // the broadcast channel learns this client is gone.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to serialize {:?}: {}", message, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames carry no commands, text is only acknowledged.
    let result: anyhow::Result<()> = loop {
        tokio::select! {
            _ = &mut send_task => break Ok(()),
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Client {} sent: {}", client_id, text.as_str());
                    broadcast.send_to(client_id, ServerMessage::ack());
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => break Err(e.into()),
            },
        }
    };

    broadcast.disconnect(client_id);
    send_task.abort();
    result
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/ws", get(events_ws))
}
