use crate::domain::notification::MAX_TIME_TO_LIVE;
use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub dispatch: DispatchConfig,

    #[command(flatten)]
    pub apns: ApnsConfig,

    #[command(flatten)]
    pub fcm: FcmConfig,

    #[command(flatten)]
    pub telegram: TelegramConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public API (device registration and webhooks)
    #[arg(long, env = "RELAY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management API (health probes, webhook setup)
    #[arg(long, env = "RELAY_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// How long to wait for in-flight fan-outs during shutdown
    #[arg(long, env = "RELAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Postgres connection URL. Devices are kept in memory when unset.
    #[arg(long = "database-url", env = "RELAY_DATABASE_URL")]
    pub url: Option<String>,

    #[arg(long, env = "RELAY_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    #[arg(long, env = "RELAY_DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    #[arg(long, env = "RELAY_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    /// Upper bound for the backoff between startup connection attempts
    #[arg(long, env = "RELAY_DB_MAX_BACKOFF_SECS", default_value_t = 10)]
    pub max_backoff_secs: u64,

    /// Number of connection attempts before giving up at startup
    #[arg(long, env = "RELAY_DB_CONNECT_ATTEMPTS", default_value_t = 5)]
    pub connect_attempts: usize,
}

#[derive(Clone, Debug, Args)]
pub struct DispatchConfig {
    /// Maximum number of concurrent deliveries per fan-out
    #[arg(long, env = "RELAY_DISPATCH_CONCURRENCY", default_value_t = 32)]
    pub concurrency: usize,

    /// Timeout for a single delivery
    #[arg(long, env = "RELAY_SEND_TIMEOUT_SECS", default_value_t = 8)]
    pub send_timeout_secs: u64,

    /// How long a backend may hold an undelivered notification (at most four weeks)
    #[arg(
        long,
        env = "RELAY_NOTIFICATION_TTL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(0..=MAX_TIME_TO_LIVE.as_secs())
    )]
    pub notification_ttl_secs: u64,

    /// Title shown on every relayed notification
    #[arg(long, env = "RELAY_NOTIFICATION_TITLE", default_value = "New message")]
    pub title: String,

    /// Maximum number of characters of the event text used as body
    #[arg(long, env = "RELAY_BODY_MAX_CHARS", default_value_t = 256)]
    pub body_max_chars: usize,

    /// Android notification channel used for relayed notifications
    #[arg(long, env = "RELAY_ANDROID_CHANNEL_ID", default_value = "default")]
    pub android_channel_id: String,

    /// Tokens starting with this prefix are test fixtures and never notified
    #[arg(long, env = "RELAY_MOCK_TOKEN_PREFIX", default_value = "test-token-")]
    pub mock_token_prefix: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 32,
            send_timeout_secs: 8,
            notification_ttl_secs: 3600,
            title: "New message".to_string(),
            body_max_chars: 256,
            android_channel_id: "default".to_string(),
            mock_token_prefix: "test-token-".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ApnsEnvironment {
    #[default]
    Sandbox,
    Production,
}

#[derive(Clone, Debug, Args)]
pub struct ApnsConfig {
    /// Path to the .p8 signing key. APNs delivery is disabled when unset.
    #[arg(long = "apns-key-path", env = "RELAY_APNS_KEY_PATH")]
    pub key_path: Option<PathBuf>,

    #[arg(long = "apns-key-id", env = "RELAY_APNS_KEY_ID")]
    pub key_id: Option<String>,

    #[arg(long = "apns-team-id", env = "RELAY_APNS_TEAM_ID")]
    pub team_id: Option<String>,

    /// Bundle id of the receiving app
    #[arg(long = "apns-topic", env = "RELAY_APNS_TOPIC")]
    pub topic: Option<String>,

    #[arg(long = "apns-environment", env = "RELAY_APNS_ENVIRONMENT", value_enum, default_value_t = ApnsEnvironment::Sandbox)]
    pub environment: ApnsEnvironment,
}

#[derive(Clone, Debug, Args)]
pub struct FcmConfig {
    /// Firebase project id. FCM delivery is disabled when unset.
    #[arg(long = "fcm-project-id", env = "RELAY_FCM_PROJECT_ID")]
    pub project_id: Option<String>,

    /// OAuth2 access token for the FCM HTTP v1 API
    #[arg(long = "fcm-access-token", env = "RELAY_FCM_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Route iOS devices through FCM instead of APNs
    #[arg(long = "fcm-serves-ios", env = "RELAY_FCM_SERVES_IOS", default_value_t = false)]
    pub serves_ios: bool,
}

#[derive(Clone, Debug, Args)]
pub struct TelegramConfig {
    #[arg(long = "telegram-bot-token", env = "RELAY_TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Public URL Telegram should deliver updates to
    #[arg(long = "telegram-webhook-url", env = "RELAY_TELEGRAM_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Shared secret Telegram echoes in X-Telegram-Bot-Api-Secret-Token
    #[arg(long = "telegram-secret-token", env = "RELAY_TELEGRAM_SECRET_TOKEN", hide_env_values = true)]
    pub secret_token: Option<String>,

    /// Window in which a redelivered update id is acknowledged without a second fan-out
    #[arg(long = "telegram-dedup-window-secs", env = "RELAY_TELEGRAM_DEDUP_WINDOW_SECS", default_value_t = 600)]
    pub dedup_window_secs: u64,

    #[arg(long = "telegram-api-base", env = "RELAY_TELEGRAM_API_BASE", default_value = "https://api.telegram.org")]
    pub api_base: String,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the storage readiness check
    #[arg(long, env = "RELAY_HEALTH_STORAGE_TIMEOUT_MS", default_value_t = 2000)]
    pub storage_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint. Traces and metrics are only exported when set.
    #[arg(long, env = "RELAY_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}
