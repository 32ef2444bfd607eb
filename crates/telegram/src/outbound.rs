use std::{future::Future, path::Path, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        RequestError,
        prelude::*,
        types::{ChatId, File, InputFile},
    },
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// What the dispatcher needs from a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Upload the file at `path` as a document named `file_name`.
    async fn send_document(&self, chat_id: i64, path: &Path, file_name: &str) -> Result<()>;

    /// Fetch the bytes of a previously uploaded file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Outbound sender backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        chat_id: i64,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramOutbound {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.run_telegram_request_with_retry(chat_id, "send message", || {
            let req = self.bot.send_message(ChatId(chat_id), text);
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path, file_name: &str) -> Result<()> {
        // Read once so retries don't depend on the scratch file still existing.
        let bytes = tokio::fs::read(path).await?;
        debug!(chat_id, file_name, size = bytes.len(), "sending document");
        self.run_telegram_request_with_retry(chat_id, "send document", || {
            let input = InputFile::memory(bytes.clone()).file_name(file_name.to_string());
            let req = self.bot.send_document(ChatId(chat_id), input);
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        download_telegram_file(&self.bot, file_id).await
    }
}

/// Resolve `file_id` with `getFile` and fetch its bytes from the file endpoint.
async fn download_telegram_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    fetch_file(bot, &file).await
}

async fn fetch_file(bot: &Bot, file: &File) -> Result<Vec<u8>> {

    // {api_url}/file/bot<token>/<file_path>
    let url = bot
        .api_url()
        .join(&format!("file/bot{}/{}", bot.token(), file.path))
        .map_err(|e| Error::download(format!("invalid file URL: {e}")))?;

    let response = bot
        .client()
        .get(url)
        .send()
        .await
        .map_err(|e| Error::download(format!("failed to download file: {e}")))?;
    if !response.status().is_success() {
        return Err(Error::download(format!(
            "failed to download file: HTTP {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::download(format!("failed to read file: {e}")))?;
    Ok(bytes.to_vec())
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}
