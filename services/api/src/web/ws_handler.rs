//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection gets its own session; inbound frames are dispatched in
//! order and outbound messages are drained from the outbox by a writer task.

use crate::{
    error::ApiError,
    web::{
        dispatch::{handle_client_message, SessionContext},
        protocol::{ClientMessage, ServerMessage},
        state::AppState,
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    info!("New WebSocket connection established, session {}", session_id);

    let (sender, mut receiver) = socket.split();
    let (ctx, outbound) = SessionContext::new(app_state, session_id);

    // --- 1. Writer Task ---
    let writer = tokio::spawn(async move {
        if let Err(e) = write_outbound(sender, outbound).await {
            warn!("Session {}: writer stopped: {}", session_id, e);
        }
    });

    {
        let session = ctx.session.lock().await;
        ctx.outbox.send(ServerMessage::SessionReady {
            session_id,
            mode: session.mode().as_str().to_string(),
        });
    }

    // --- 2. Main Message Loop ---
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(&ctx, msg).await,
                Err(e) => warn!("Session {}: ignoring malformed message: {}", session_id, e),
            },
            Ok(Message::Close(_)) => {
                info!("Session {}: client sent close message.", session_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Session {}: socket error: {}", session_id, e);
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    ctx.session.lock().await.cancellation_token.cancel();
    writer.abort();
    info!("Session {}: WebSocket connection closed.", session_id);
}

/// Serializes queued messages onto the socket until either side goes away.
async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<(), ApiError> {
    while let Some(msg) = outbound.recv().await {
        let json = serde_json::to_string(&msg)?;
        sender.send(Message::Text(json.into())).await?;
    }
    Ok(())
}
