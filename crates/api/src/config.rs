use std::str::FromStr;

use studio_core::check_in::{CheckInPolicy, DEFAULT_GRACE_MINS};
use studio_db::store::StoreBackend;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub store: StoreConfig,
    pub check_in: CheckInPolicy,
    /// Key for signing check-in passes.
    pub qr_secret: String,
    /// Notification gateway; `None` means events are only logged.
    pub notify_webhook: Option<NotifyWebhookConfig>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Required when `backend` is Postgres.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct NotifyWebhookConfig {
    pub url: String,
    pub secret: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `STORE_BACKEND`         | `postgres`              |
    /// | `DATABASE_URL`          | required for postgres   |
    /// | `DB_MAX_CONNECTIONS`    | `20`                    |
    /// | `CHECK_IN_GRACE_MINS`   | `30`                    |
    /// | `QR_SECRET`             | `JWT_SECRET`            |
    /// | `NOTIFY_WEBHOOK_URL`    | unset                   |
    /// | `NOTIFY_WEBHOOK_SECRET` | required with the URL   |
    ///
    /// # Panics
    ///
    /// Panics on any malformed value. Misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", "3000");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", "30");
        let jwt = JwtConfig::from_env();

        let backend: StoreBackend = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()
            .unwrap_or_else(|e| panic!("STORE_BACKEND: {e}"));
        let store = StoreConfig {
            backend,
            database_url: std::env::var("DATABASE_URL").ok(),
            max_connections: env_parse(
                "DB_MAX_CONNECTIONS",
                &studio_db::DEFAULT_MAX_CONNECTIONS.to_string(),
            ),
        };

        let grace_mins: i64 = env_parse("CHECK_IN_GRACE_MINS", &DEFAULT_GRACE_MINS.to_string());
        assert!(grace_mins >= 0, "CHECK_IN_GRACE_MINS must not be negative");

        let qr_secret = std::env::var("QR_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| jwt.secret.clone());

        let notify_webhook = std::env::var("NOTIFY_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|url| NotifyWebhookConfig {
                url,
                secret: std::env::var("NOTIFY_WEBHOOK_SECRET")
                    .expect("NOTIFY_WEBHOOK_SECRET must be set when NOTIFY_WEBHOOK_URL is"),
            });

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            store,
            check_in: CheckInPolicy::new(grace_mins),
            qr_secret,
            notify_webhook,
        }
    }
}

fn env_parse<T>(key: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .unwrap_or_else(|e| panic!("{key} has invalid value '{raw}': {e}"))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
