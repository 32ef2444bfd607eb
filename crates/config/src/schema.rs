//! Config schema types.
use std::{path::PathBuf, time::Duration};

use {secrecy::Secret, serde::Deserialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FsbotConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub structure: StructureConfig,
    pub sessions: SessionsConfig,
    pub api: ApiConfig,
}

/// Webhook listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port the webhook listener accepts Telegram updates on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8443,
        }
    }
}

/// Telegram bot credentials and transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Required; there is no built-in default.
    pub token: Option<Secret<String>>,

    /// Public HTTPS base URL. When set the bot runs in webhook mode and
    /// receives updates at `{webhook_url}/webhook`; otherwise it long-polls.
    pub webhook_url: Option<String>,

    /// Secret echoed by Telegram in `X-Telegram-Bot-Api-Secret-Token`.
    /// Generated at startup when absent.
    pub webhook_secret: Option<Secret<String>>,

    /// Uploaded documents larger than this are refused before download.
    pub max_upload_bytes: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            webhook_url: None,
            webhook_secret: None,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Structure pipeline limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Structures with more entries than this need a "yes" before they are built.
    pub confirm_threshold: usize,
    /// Emit a progress message after every n-th entry.
    pub progress_every: usize,
    /// Hard cap on entries per structure, on every entry point.
    pub max_entries: usize,
    /// Parent directory for scratch directories (default: `$TMPDIR/fsbot`).
    pub work_dir: Option<PathBuf>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            confirm_threshold: 10,
            progress_every: 5,
            max_entries: 1000,
            work_dir: None,
        }
    }
}

impl StructureConfig {
    #[must_use]
    pub fn resolved_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("fsbot"))
    }
}

/// In-memory session store bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Idle sessions older than this are dropped.
    pub ttl_secs: u64,
    /// Maximum number of concurrently tracked users; the oldest is evicted.
    pub max_sessions: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_sessions: 10_000,
        }
    }
}

impl SessionsConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// `/api test` response fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub creator: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            creator: "AI OF LAUTECH".into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn defaults() {
        let cfg = FsbotConfig::default();
        assert!(cfg.telegram.token.is_none());
        assert_eq!(cfg.server.port, 8443);
        assert_eq!(cfg.structure.confirm_threshold, 10);
        assert_eq!(cfg.structure.progress_every, 5);
        assert_eq!(cfg.sessions.ttl(), Duration::from_secs(3600));
        assert!(cfg.structure.resolved_work_dir().ends_with("fsbot"));
    }

    #[test]
    fn deserialize_partial_toml() {
        let cfg: FsbotConfig = toml::from_str(
            r#"
            [telegram]
            token = "123:ABC"
            webhook_url = "https://bot.example.com"

            [structure]
            confirm_threshold = 20
            "#,
        )
        .unwrap();
        assert_eq!(cfg.telegram.token.unwrap().expose_secret(), "123:ABC");
        assert_eq!(
            cfg.telegram.webhook_url.as_deref(),
            Some("https://bot.example.com")
        );
        assert_eq!(cfg.structure.confirm_threshold, 20);
        // untouched fields keep their defaults
        assert_eq!(cfg.structure.max_entries, 1000);
        assert_eq!(cfg.server.bind, "0.0.0.0");
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg: FsbotConfig =
            serde_json::from_str(r#"{"telegram": {"token": "123:SECRET"}}"#).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("SECRET"), "token leaked into Debug: {dbg}");
    }
}
