//! # Configuration Module
//!
//! Runtime settings read from the process environment (optionally seeded from
//! a `.env` file).

use anyhow::{bail, Context, Result};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use url::Url;

// Constants for configuration defaults
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_WEBHOOK_PORT: u16 = 10000;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-field lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("unsupported LOG_FORMAT '{other}' (expected 'pretty' or 'json')"),
        }
    }
}

/// Webhook listener settings; absent means long polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Public HTTPS address Telegram posts updates to
    pub url: Url,
    /// Local port the listener binds on all interfaces
    pub port: u16,
}

impl WebhookConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Configuration structure for the bot process
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram Bot API token
    pub bot_token: String,
    /// PostgreSQL connection string
    pub database_url: String,
    /// Telegram id of the single administrator (0 disables admin commands)
    pub admin_user_id: i64,
    /// Upper bound of the connection pool
    pub db_max_connections: u32,
    pub log_format: LogFormat,
    pub webhook: Option<WebhookConfig>,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("database_url", &self.database_url)
            .field("admin_user_id", &self.admin_user_id)
            .field("db_max_connections", &self.db_max_connections)
            .field("log_format", &self.log_format)
            .field("webhook", &self.webhook)
            .finish()
    }
}

impl BotConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let database_url = required(&lookup, "DATABASE_URL")?;

        let admin_user_id = match lookup("ADMIN_USER_ID") {
            Some(raw) => raw.trim().parse::<i64>().with_context(|| {
                format!("ADMIN_USER_ID must be a numeric Telegram id, got '{raw}'")
            })?,
            None => 0,
        };

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().with_context(|| {
                format!("DB_MAX_CONNECTIONS must be a positive integer, got '{raw}'")
            })?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        if db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be greater than zero");
        }

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        let webhook = webhook_from_lookup(&lookup)?;

        Ok(Self {
            bot_token,
            database_url,
            admin_user_id,
            db_max_connections,
            log_format,
            webhook,
        })
    }
}

/// `WEBHOOK_URL` (or `RENDER_EXTERNAL_URL` on Render) switches to webhook mode
fn webhook_from_lookup<F>(lookup: &F) -> Result<Option<WebhookConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let raw_url = ["WEBHOOK_URL", "RENDER_EXTERNAL_URL"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty());

    let Some(raw_url) = raw_url else {
        return Ok(None);
    };

    let url = Url::parse(&raw_url)
        .with_context(|| format!("WEBHOOK_URL must be an absolute URL, got '{raw_url}'"))?;

    let port = match lookup("PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .with_context(|| format!("PORT must be a TCP port number, got '{raw}'"))?,
        None => DEFAULT_WEBHOOK_PORT,
    };

    Ok(Some(WebhookConfig { url, port }))
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{key} must be set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
        ]))
        .unwrap();

        assert_eq!(config.admin_user_id, 0);
        assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.webhook, None);
    }

    #[test]
    fn test_webhook_mode() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://x"),
            ("RENDER_EXTERNAL_URL", "https://catalog.example.com"),
        ]))
        .unwrap();

        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.url.as_str(), "https://catalog.example.com/");
        assert_eq!(webhook.port, DEFAULT_WEBHOOK_PORT);
        assert_eq!(webhook.listen_addr().to_string(), "0.0.0.0:10000");

        let config = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://x"),
            ("WEBHOOK_URL", "https://bot.example.com/hook"),
            ("RENDER_EXTERNAL_URL", "https://ignored.example.com"),
            ("PORT", "8443"),
        ]))
        .unwrap();

        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.url.path(), "/hook");
        assert_eq!(webhook.port, 8443);
    }

    #[test]
    fn test_invalid_webhook_settings() {
        let base = [
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://x"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("WEBHOOK_URL", "not a url"));
        assert!(BotConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("WEBHOOK_URL", "https://bot.example.com"));
        pairs.push(("PORT", "99999"));
        assert!(BotConfig::from_lookup(lookup_from(&pairs)).is_err());

        // Blank values fall back to polling
        let mut pairs = base.to_vec();
        pairs.push(("WEBHOOK_URL", "  "));
        let config = BotConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.webhook, None);
    }

    #[test]
    fn test_full_config() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("ADMIN_USER_ID", " 42 "),
            ("DB_MAX_CONNECTIONS", "10"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.admin_user_id, 42);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_required_values() {
        let err = BotConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let base = [
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://x"),
        ];

        let mut pairs = base.to_vec();
        pairs.push(("ADMIN_USER_ID", "admin"));
        assert!(BotConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("DB_MAX_CONNECTIONS", "0"));
        assert!(BotConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push(("LOG_FORMAT", "xml"));
        assert!(BotConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:secret"),
            ("DATABASE_URL", "postgres://x"),
        ]))
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
