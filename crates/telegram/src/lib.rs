//! Telegram front end for fsbot.
//!
//! Receives updates by long polling or webhook, maps each message onto the
//! per-user conversation state machine in [`dispatch`] and replies through
//! the Bot API.

pub mod bot;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod session;
pub mod state;
pub mod webhook;

pub use {
    bot::run,
    dispatch::{DispatchSettings, Dispatcher, Inbound, InboundKind},
    error::{Error, Result},
    outbound::{ChatTransport, TelegramOutbound},
    session::{Action, Session, SessionStore},
};
