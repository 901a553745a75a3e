//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for aichat-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set (apart from a provider key for
/// providers that require one).
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://aichat.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// Base URL of the OpenAI-compatible completion provider.
    pub provider_url: String,

    /// Bearer key sent to the completion provider, if any.
    pub provider_key: Option<String>,

    /// Model identifier forwarded to the provider.
    pub model: String,

    /// Header carrying the authenticated user id, set by the fronting
    /// auth/session provider.
    pub user_header: String,

    /// Shared secret the fronting proxy must present on `/v1` routes.
    /// `None` disables the check.
    pub api_token: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: get_or("AICHAT_BIND", "0.0.0.0:3000"),
            database_url: get_or("AICHAT_DATABASE_URL", "sqlite://aichat.db"),
            log_level: get_or("AICHAT_LOG", "info"),
            log_json: lookup("AICHAT_LOG_JSON").map(|v| parse_flag(&v)).unwrap_or(false),
            cors_allowed_origins: non_empty("AICHAT_CORS_ORIGINS"),
            enable_swagger: lookup("AICHAT_ENABLE_SWAGGER")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            provider_url: get_or("AICHAT_PROVIDER_URL", "https://api.openai.com/v1"),
            provider_key: non_empty("AICHAT_PROVIDER_KEY"),
            model: get_or("AICHAT_MODEL", "gpt-4o-mini"),
            user_header: get_or("AICHAT_USER_HEADER", "x-user-id").to_ascii_lowercase(),
            api_token: non_empty("AICHAT_API_TOKEN"),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
