//! services/api/src/web/chat_task.rs
//!
//! Free-reading chat: the reader's message is echoed into the transcript at
//! once and the assistant's reply follows after a short delay.

use crate::web::{
    dispatch::SessionContext,
    protocol::{ChatMessageView, ServerMessage},
    state::sleep_unless_cancelled,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const NOT_READING: &str = "chat is only available in free reading mode";

pub async fn send_chat(ctx: &SessionContext, text: String) {
    let mut session = ctx.session.lock().await;
    let lifetime = session.cancellation_token.clone();
    let Some(reading) = session.reading_mut() else {
        ctx.outbox.send(ServerMessage::error(NOT_READING));
        return;
    };
    let message = match reading.post_user_message(&text) {
        Ok(message) => message,
        Err(e) => {
            ctx.outbox.send(ServerMessage::error(e));
            return;
        }
    };
    let page_number = reading.current_page().map_or(1, |page| page.number);
    ctx.outbox.send(ServerMessage::ChatMessage {
        message: ChatMessageView::from(&message),
    });

    let ctx = ctx.clone();
    tokio::spawn(async move { reply_later(ctx, text, page_number, lifetime).await });
}

async fn reply_later(ctx: SessionContext, text: String, page_number: u32, lifetime: CancellationToken) {
    if !sleep_unless_cancelled(&lifetime, ctx.app_state.config.chat_reply_delay).await {
        debug!("Chat reply cancelled before it was due.");
        return;
    }
    let responder = ctx.app_state.chat_responder.clone();
    let reply = tokio::select! {
        _ = lifetime.cancelled() => return,
        reply = responder.reply(&text, page_number) => reply,
    };

    let mut session = ctx.session.lock().await;
    if lifetime.is_cancelled() {
        return;
    }
    let Some(reading) = session.reading_mut() else {
        return;
    };
    match reply {
        Ok(reply) => {
            let message = reading.post_ai_message(reply);
            ctx.outbox.send(ServerMessage::ChatMessage {
                message: ChatMessageView::from(&message),
            });
        }
        Err(e) => {
            error!("Chat responder failed: {}", e);
            ctx.outbox
                .send(ServerMessage::error("The assistant could not answer right now."));
        }
    }
}
