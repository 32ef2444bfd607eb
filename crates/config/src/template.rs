//! Default configuration template with all options documented.

/// Generate the default config template listening on `port`.
pub fn default_config_template(port: u16) -> String {
    format!(
        r##"# fsbot configuration
# Uncomment and modify settings as needed. Changes require a restart.
#
# Environment variable substitution is supported: ${{ENV_VAR}} and
# ${{ENV_VAR:-default}}. FSBOT_TOKEN, FSBOT_WEBHOOK_URL, FSBOT_PORT,
# FSBOT_BIND and FSBOT_WEBHOOK_SECRET override the values below.

# ══════════════════════════════════════════════════════════════════════════════
# SERVER (webhook mode only)
# ══════════════════════════════════════════════════════════════════════════════

[server]
bind = "0.0.0.0"                  # Address the webhook listener binds to
port = {port}                        # Port Telegram delivers updates to

# ══════════════════════════════════════════════════════════════════════════════
# TELEGRAM
# ══════════════════════════════════════════════════════════════════════════════

[telegram]
token = "${{FSBOT_TOKEN}}"          # Bot token from @BotFather (required)
# webhook_url = "https://bot.example.com"   # Public HTTPS URL; unset = long polling
# webhook_secret = "change-me"    # X-Telegram-Bot-Api-Secret-Token (random if unset)
max_upload_bytes = 5242880        # Larger uploaded documents are refused

# ══════════════════════════════════════════════════════════════════════════════
# STRUCTURE PIPELINE
# ══════════════════════════════════════════════════════════════════════════════

[structure]
confirm_threshold = 10            # More entries than this asks for "yes" first
progress_every = 5                # Progress message every n-th entry
max_entries = 1000                # Hard cap on entries per structure
# work_dir = "/var/tmp/fsbot"     # Scratch directory parent (default: system temp)

# ══════════════════════════════════════════════════════════════════════════════
# SESSIONS
# ══════════════════════════════════════════════════════════════════════════════

[sessions]
ttl_secs = 3600                   # Idle conversations are forgotten after this
max_sessions = 10000              # Oldest session is evicted beyond this

# ══════════════════════════════════════════════════════════════════════════════
# /api
# ══════════════════════════════════════════════════════════════════════════════

[api]
creator = "AI OF LAUTECH"         # "Creator" field of /api test
"##
    )
}
