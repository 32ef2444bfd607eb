//! Configuration validation engine.
//!
//! Checks a loaded configuration for missing credentials, out-of-range
//! limits and unknown or misspelled fields.

use std::{collections::HashMap, path::PathBuf};

use {secrecy::ExposeSecret, serde_json::Value};

use crate::schema::FsbotConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "unknown-field", "missing", "range", "security", "mode"
    pub category: &'static str,
    /// Dotted path, e.g. "telegram.webhook_url"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn fields(names: &[&'static str]) -> KnownKeys {
    KnownKeys::Struct(names.iter().map(|n| (*n, KnownKeys::Leaf)).collect())
}

fn build_schema_map() -> KnownKeys {
    KnownKeys::Struct(HashMap::from([
        ("server", fields(&["bind", "port"])),
        (
            "telegram",
            fields(&["token", "webhook_url", "webhook_secret", "max_upload_bytes"]),
        ),
        (
            "structure",
            fields(&[
                "confirm_threshold",
                "progress_every",
                "max_entries",
                "work_dir",
            ]),
        ),
        ("sessions", fields(&["ttl_secs", "max_sessions"])),
        ("api", fields(&["creator"])),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate `config`. When the raw document is available it is also walked
/// for unknown keys.
#[must_use]
pub fn validate(config: &FsbotConfig, raw: Option<&Value>) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if let Some(raw) = raw {
        check_unknown_fields(raw, &build_schema_map(), "", &mut diagnostics);
    }
    check_telegram(config, &mut diagnostics);
    check_limits(config, &mut diagnostics);

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (Value::Object(map), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child, child_schema, &path, diagnostics);
            continue;
        }
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".into(),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message,
        });
    }
}

fn check_telegram(config: &FsbotConfig, diagnostics: &mut Vec<Diagnostic>) {
    let tg = &config.telegram;

    match tg.token.as_ref().map(|t| t.expose_secret().trim()) {
        None | Some("") => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "missing",
            path: "telegram.token".into(),
            message: "bot token is required (set it here or via FSBOT_TOKEN)".into(),
        }),
        Some(token) if !looks_like_bot_token(token) => diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "security",
            path: "telegram.token".into(),
            message: "token does not look like \"<bot id>:<secret>\"".into(),
        }),
        Some(_) => {},
    }

    let Some(webhook_url) = tg.webhook_url.as_deref() else {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "mode",
            path: "telegram.webhook_url".into(),
            message: "not set; updates will be received by long polling".into(),
        });
        return;
    };

    match url::Url::parse(webhook_url) {
        Ok(u) if u.scheme() == "https" => {},
        Ok(u) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "security",
            path: "telegram.webhook_url".into(),
            message: format!("Telegram only delivers webhooks over https, got {}", u.scheme()),
        }),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "range",
            path: "telegram.webhook_url".into(),
            message: format!("not a valid URL: {e}"),
        }),
    }

    if let Some(secret) = &tg.webhook_secret {
        let secret = secret.expose_secret();
        let valid_chars = secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if secret.is_empty() || secret.len() > 256 || !valid_chars {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "security",
                path: "telegram.webhook_secret".into(),
                message: "must be 1-256 characters of A-Z, a-z, 0-9, _ or -".into(),
            });
        }
    }

    if config.server.port == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "range",
            path: "server.port".into(),
            message: "webhook mode needs a fixed port".into(),
        });
    }
}

fn check_limits(config: &FsbotConfig, diagnostics: &mut Vec<Diagnostic>) {
    let st = &config.structure;
    let zero_checks = [
        ("structure.progress_every", st.progress_every as u64),
        ("structure.max_entries", st.max_entries as u64),
        ("sessions.max_sessions", config.sessions.max_sessions as u64),
        ("sessions.ttl_secs", config.sessions.ttl_secs),
        (
            "telegram.max_upload_bytes",
            u64::from(config.telegram.max_upload_bytes),
        ),
    ];
    for (path, value) in zero_checks {
        if value == 0 {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "range",
                path: path.into(),
                message: "must be greater than 0".into(),
            });
        }
    }

    if st.max_entries > 0 && st.confirm_threshold >= st.max_entries {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "range",
            path: "structure.confirm_threshold".into(),
            message: format!(
                "is not below max_entries ({}); confirmation will never be asked",
                st.max_entries
            ),
        });
    }
}

fn looks_like_bot_token(token: &str) -> bool {
    token.split_once(':').is_some_and(|(id, secret)| {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
    })
}
