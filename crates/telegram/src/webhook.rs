//! Webhook transport: Telegram POSTs updates to `{webhook_url}/webhook`.
//!
//! Every request must carry the secret registered with `setWebhook` in the
//! `X-Telegram-Bot-Api-Secret-Token` header. The bot token is never part of
//! the URL.

use std::sync::Arc;

use {
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    },
    fsbot_config::FsbotConfig,
    rand::distr::{Alphanumeric, SampleString},
    secrecy::ExposeSecret,
    teloxide::{
        prelude::*,
        types::{AllowedUpdate, Update},
    },
    tracing::{debug, info, warn},
};

use crate::{handlers, state::BotState};

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";
pub const WEBHOOK_PATH: &str = "/webhook";

#[derive(Clone)]
struct WebhookState {
    bot: Arc<BotState>,
    secret: Arc<str>,
}

/// Router serving `POST /webhook`.
pub fn router(state: Arc<BotState>, secret: &str) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(receive_update))
        .with_state(WebhookState {
            bot: state,
            secret: Arc::from(secret),
        })
}

/// Register the webhook with Telegram and serve until cancelled.
pub async fn serve(
    state: Arc<BotState>,
    config: &FsbotConfig,
    webhook_url: &str,
) -> anyhow::Result<()> {
    let secret = match &config.telegram.webhook_secret {
        Some(secret) => secret.expose_secret().clone(),
        None => {
            debug!("no webhook secret configured, generating one");
            generate_secret()
        },
    };

    let url = webhook_endpoint(webhook_url)?;
    state
        .bot
        .set_webhook(url.clone())
        .secret_token(secret.clone())
        .allowed_updates(vec![AllowedUpdate::Message])
        .await?;

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!(%addr, webhook = %url, "webhook listener started");

    let cancel = state.cancel.clone();
    axum::serve(listener, router(state, &secret))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("webhook listener stopped");
    Ok(())
}

/// `{base}/webhook`, tolerating a trailing slash on the base URL.
pub fn webhook_endpoint(base: &str) -> anyhow::Result<url::Url> {
    let joined = format!("{}{WEBHOOK_PATH}", base.trim_end_matches('/'));
    url::Url::parse(&joined).map_err(|e| anyhow::anyhow!("invalid webhook url {base:?}: {e}"))
}

fn generate_secret() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 32)
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != &*state.secret {
        warn!("rejected webhook request with a bad secret token");
        return StatusCode::UNAUTHORIZED;
    }

    // Telegram retries non-2xx responses, so unparseable updates are
    // acknowledged and dropped.
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "dropping unparseable webhook update");
            return StatusCode::OK;
        },
    };

    // Take the turn before spawning so the handler order matches arrival.
    let Some(queued) = handlers::enqueue(update, &state.bot) else {
        return StatusCode::OK;
    };
    let bot = Arc::clone(&state.bot);
    tokio::spawn(async move {
        handlers::process(queued, &bot).await;
    });
    StatusCode::OK
}
