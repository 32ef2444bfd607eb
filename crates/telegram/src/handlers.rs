use {
    teloxide::types::{MediaKind, Message, MessageKind, Update, UpdateKind},
    tracing::{debug, error},
};

use crate::{
    commands,
    dispatch::{Inbound, InboundKind},
    state::{BotState, Turn},
};

/// A message accepted for dispatch, holding its sender's place in line.
pub struct Queued {
    inbound: Inbound,
    turn: Turn,
}

/// Convert `update` and take its sender's turn.
///
/// Must be called in `update_id` order and before the update is handed to
/// another task; that call order is the order a user's messages are handled in.
pub fn enqueue(update: Update, state: &BotState) -> Option<Queued> {
    let UpdateKind::Message(msg) = update.kind else {
        debug!("ignoring non-message update");
        return None;
    };
    let Some(inbound) = inbound_from_message(&msg, state.bot_username.as_deref()) else {
        debug!(chat_id = msg.chat.id.0, "ignoring message");
        return None;
    };
    let turn = state.queue.enter(inbound.user);
    Some(Queued { inbound, turn })
}

/// Wait for the sender's earlier messages, then run this one through the
/// dispatcher.
pub async fn process(queued: Queued, state: &BotState) {
    let Queued { inbound, mut turn } = queued;
    turn.ready().await;

    let (user, chat_id) = (inbound.user, inbound.chat_id);
    debug!(user, chat_id, "dispatching telegram message");
    if let Err(e) = state.dispatcher.dispatch(inbound).await {
        error!(user, chat_id, error = %e, "error handling telegram message");
    }
    drop(turn);
}

fn inbound_from_message(msg: &Message, bot_username: Option<&str>) -> Option<Inbound> {
    let user = msg.from.as_ref()?.id.0;
    let chat_id = msg.chat.id.0;

    let kind = if let Some(doc) = extract_document(msg) {
        doc
    } else {
        let text = extract_text(msg)?;
        if text.trim_start().starts_with('/') {
            InboundKind::Command(commands::parse_command(&text, bot_username)?)
        } else {
            InboundKind::Text(text)
        }
    };

    Some(Inbound {
        user,
        chat_id,
        kind,
    })
}

fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn extract_document(msg: &Message) -> Option<InboundKind> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Document(d) => Some(InboundKind::Document {
                file_id: d.document.file.id.clone(),
                file_name: d.document.file_name.clone(),
                size: d.document.file.size,
            }),
            _ => None,
        },
        _ => None,
    }
}
