use std::{sync::Arc, time::Duration};

use {
    fsbot_config::FsbotConfig,
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::AllowedUpdate,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    commands,
    dispatch::{DispatchSettings, Dispatcher},
    handlers,
    outbound::{ChatTransport, TelegramOutbound},
    session::SessionStore,
    state::{BotState, UserQueue},
    webhook,
};

/// Long-polling timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Build a bot with a client timeout longer than the long-polling timeout so
/// the HTTP client doesn't abort the request before Telegram responds.
pub fn build_bot(token: &str) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()?;
    Ok(Bot::with_client(token, client))
}

/// Assemble the runtime state around an already-built bot.
pub fn build_state(
    bot: Bot,
    bot_username: Option<String>,
    config: &FsbotConfig,
    cancel: CancellationToken,
) -> BotState {
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramOutbound::new(bot.clone()));
    let sessions = SessionStore::new(config.sessions.ttl(), config.sessions.max_sessions);
    BotState {
        bot,
        bot_username,
        dispatcher: Dispatcher::new(
            transport,
            sessions,
            DispatchSettings::from_config(config),
        ),
        queue: UserQueue::default(),
        cancel,
    }
}

/// Connect to Telegram and serve updates until `cancel` fires.
///
/// Runs in webhook mode when `telegram.webhook_url` is set, otherwise
/// long-polls.
pub async fn run(config: &FsbotConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let token = config
        .telegram
        .token
        .as_ref()
        .map(|t| t.expose_secret().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow::anyhow!("telegram.token is not configured"))?;
    let bot = build_bot(&token)?;

    // Verify credentials and get bot username.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Register slash commands for autocomplete in Telegram clients.
    if let Err(e) = bot.set_my_commands(commands::bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }

    let state = Arc::new(build_state(bot.clone(), bot_username.clone(), config, cancel));

    match config.telegram.webhook_url.as_deref() {
        Some(webhook_url) => {
            info!(username = ?bot_username, "telegram bot connected (webhook mode)");
            webhook::serve(state, config, webhook_url).await
        },
        None => {
            // Delete any existing webhook so long polling works.
            bot.delete_webhook().send().await?;
            info!(
                username = ?bot_username,
                "telegram bot connected (webhook cleared)"
            );
            run_polling(state).await;
            Ok(())
        },
    }
}

/// Manual `getUpdates` loop. Each update is handled on its own task. Turns
/// are taken here, in update order, so a user's messages keep their order
/// whichever task the scheduler runs first.
pub async fn run_polling(state: Arc<BotState>) {
    info!("starting telegram manual polling loop");
    let bot = state.bot.clone();
    let cancel = state.cancel.clone();
    let mut offset: i32 = 0;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => {
                info!("telegram polling stopped");
                break;
            },
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    let Some(queued) = handlers::enqueue(update, &state) else {
                        continue;
                    };
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        handlers::process(queued, &state).await;
                    });
                }
            },
            Err(e) => {
                // Another bot instance is running with the same token.
                let is_conflict =
                    matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates));
                if is_conflict {
                    warn!(
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    cancel.cancel();
                    break;
                }

                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(Duration::from_secs(5)) => {},
                }
            },
        }
    }
}
