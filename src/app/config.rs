use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::models::payment::DEFAULT_PAID_STATUSES;

pub const DEFAULT_PORT: u16 = 3003;
pub const DEFAULT_PIX_API_URL: &str = "https://app.vizzionpay.com/api/v1";
pub const DEFAULT_CARD_API_URL: &str = "https://public-api.kiwify.com/v1";
/// Card tokens are issued for 24 hours.
pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 24 * 60 * 60;
/// Refresh one hour early, so a cached token is trusted for 23 hours.
pub const DEFAULT_TOKEN_SAFETY_MARGIN_SECS: u64 = 60 * 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// 120 checks at 5s: ten minutes of waiting.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid URL for {key}: {source}")]
    InvalidUrl {
        key: &'static str,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub http_timeout: Duration,
    pub pix: PixSettings,
    pub card: CardSettings,
    pub paid_statuses: Vec<String>,
    pub poll: PollSettings,
}

#[derive(Debug, Clone)]
pub struct PixSettings {
    pub api_url: Url,
    pub public_key: SecretString,
    pub secret_key: SecretString,
}

#[derive(Debug, Clone)]
pub struct CardSettings {
    pub api_url: Url,
    pub client_id: String,
    pub client_secret: SecretString,
    pub description: String,
    pub token_validity: Duration,
    pub token_safety_margin: Duration,
}

impl CardSettings {
    /// How long a freshly issued token is reused.
    pub fn token_lifetime(&self) -> Duration {
        self.token_validity.saturating_sub(self.token_safety_margin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Shape of the optional TOML file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub http_timeout_ms: Option<u64>,
    pub paid_statuses: Option<Vec<String>>,
    #[serde(default)]
    pub pix: PixFileConfig,
    #[serde(default)]
    pub card: CardFileConfig,
    #[serde(default)]
    pub poll: PollFileConfig,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PixFileConfig {
    pub api_url: Option<String>,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardFileConfig {
    pub api_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub description: Option<String>,
    pub token_validity_secs: Option<u64>,
    pub token_safety_margin_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollFileConfig {
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Defaults, then the TOML file (if any), then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };

        Self::from_sources(file, |key| env::var(key).ok())
    }

    pub fn from_sources<F>(mut file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("PORT") {
            file.port = Some(parse_number("PORT", &v)?);
        }
        if let Some(v) = var("HTTP_TIMEOUT_MS") {
            file.http_timeout_ms = Some(parse_number("HTTP_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = var("PAID_STATUSES") {
            file.paid_statuses = Some(v.split(',').map(|s| s.trim().to_string()).collect());
        }
        if let Some(v) = var("PIX_API_URL") {
            file.pix.api_url = Some(v);
        }
        if let Some(v) = var("PIX_PUBLIC_KEY") {
            file.pix.public_key = Some(v);
        }
        if let Some(v) = var("PIX_SECRET_KEY") {
            file.pix.secret_key = Some(v);
        }
        if let Some(v) = var("CARD_API_URL") {
            file.card.api_url = Some(v);
        }
        if let Some(v) = var("CARD_CLIENT_ID") {
            file.card.client_id = Some(v);
        }
        if let Some(v) = var("CARD_CLIENT_SECRET") {
            file.card.client_secret = Some(v);
        }
        if let Some(v) = var("CARD_DESCRIPTION") {
            file.card.description = Some(v);
        }
        if let Some(v) = var("TOKEN_VALIDITY_SECS") {
            file.card.token_validity_secs = Some(parse_number("TOKEN_VALIDITY_SECS", &v)?);
        }
        if let Some(v) = var("TOKEN_SAFETY_MARGIN_SECS") {
            file.card.token_safety_margin_secs =
                Some(parse_number("TOKEN_SAFETY_MARGIN_SECS", &v)?);
        }
        if let Some(v) = var("POLL_INTERVAL_SECS") {
            file.poll.interval_secs = Some(parse_number("POLL_INTERVAL_SECS", &v)?);
        }
        if let Some(v) = var("POLL_MAX_ATTEMPTS") {
            file.poll.max_attempts = Some(parse_number("POLL_MAX_ATTEMPTS", &v)?);
        }

        Self::resolve(file)
    }

    fn resolve(file: FileConfig) -> Result<Self, ConfigError> {
        let token_validity = file
            .card
            .token_validity_secs
            .unwrap_or(DEFAULT_TOKEN_VALIDITY_SECS);
        let token_safety_margin = file
            .card
            .token_safety_margin_secs
            .unwrap_or(DEFAULT_TOKEN_SAFETY_MARGIN_SECS);
        if token_safety_margin >= token_validity {
            return Err(ConfigError::InvalidValue {
                key: "TOKEN_SAFETY_MARGIN_SECS",
                value: token_safety_margin.to_string(),
            });
        }

        let poll_interval = file.poll.interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let paid_statuses = file.paid_statuses.unwrap_or_else(|| {
            DEFAULT_PAID_STATUSES.iter().map(|s| s.to_string()).collect()
        });
        if paid_statuses.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "PAID_STATUSES",
                value: paid_statuses.join(","),
            });
        }

        Ok(Self {
            server_port: file.port.unwrap_or(DEFAULT_PORT),
            http_timeout: Duration::from_millis(
                file.http_timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
            ),
            pix: PixSettings {
                api_url: parse_url(
                    "PIX_API_URL",
                    file.pix.api_url.as_deref().unwrap_or(DEFAULT_PIX_API_URL),
                )?,
                public_key: SecretString::new(file.pix.public_key.unwrap_or_default()),
                secret_key: SecretString::new(file.pix.secret_key.unwrap_or_default()),
            },
            card: CardSettings {
                api_url: parse_url(
                    "CARD_API_URL",
                    file.card.api_url.as_deref().unwrap_or(DEFAULT_CARD_API_URL),
                )?,
                client_id: file.card.client_id.unwrap_or_default(),
                client_secret: SecretString::new(file.card.client_secret.unwrap_or_default()),
                description: file
                    .card
                    .description
                    .unwrap_or_else(|| "Pagamento com cartão".to_string()),
                token_validity: Duration::from_secs(token_validity),
                token_safety_margin: Duration::from_secs(token_safety_margin),
            },
            paid_statuses,
            poll: PollSettings {
                interval: Duration::from_secs(poll_interval),
                max_attempts: file.poll.max_attempts.unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS),
            },
        })
    }

    /// Names of the credentials left empty; requests to that gateway will be refused upstream.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.pix.public_key.expose_secret().is_empty() {
            missing.push("PIX_PUBLIC_KEY");
        }
        if self.pix.secret_key.expose_secret().is_empty() {
            missing.push("PIX_SECRET_KEY");
        }
        if self.card.client_id.is_empty() {
            missing.push("CARD_CLIENT_ID");
        }
        if self.card.client_secret.expose_secret().is_empty() {
            missing.push("CARD_CLIENT_SECRET");
        }
        missing
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl { key, source })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(url)
}
