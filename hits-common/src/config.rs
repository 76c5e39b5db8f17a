//! Process configuration
//!
//! The bot reads its configuration exactly once at startup. Values come from
//! three tiers, highest priority first:
//! 1. Command-line flag
//! 2. Environment variable
//! 3. TOML config file (optional)
//!
//! The binary merges the tiers into a [`RawConfig`]; [`BotConfig::from_raw`]
//! validates everything and fails fast. No partial start is possible.

use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Fixed prefix of the webhook route; a random suffix is appended per process
pub const WEBHOOK_PATH_PREFIX: &str = "/webhook/main/";
const WEBHOOK_SUFFIX_LEN: usize = 16;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HANDLER_TIMEOUT_SECS: u64 = 30;

/// How inbound updates reach the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// Platform pushes updates to an HTTPS endpoint we expose
    Webhook,
    /// We long-poll the platform for updates
    Polling,
}

impl FromStr for DeployMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WEBHOOK" => Ok(DeployMode::Webhook),
            "POLLING" => Ok(DeployMode::Polling),
            other => Err(Error::Config(format!(
                "POLL_TYPE must be WEBHOOK or POLLING, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployMode::Webhook => write!(f, "WEBHOOK"),
            DeployMode::Polling => write!(f, "POLLING"),
        }
    }
}

/// Whether a user may remove the last sticker of a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Reject removals that would leave the pack empty
    #[default]
    KeepLast,
    /// Allow a pack to become empty
    AllowEmpty,
}

impl RemovalPolicy {
    pub fn from_allow_empty(allow_empty: bool) -> Self {
        if allow_empty {
            RemovalPolicy::AllowEmpty
        } else {
            RemovalPolicy::KeepLast
        }
    }
}

/// Unvalidated configuration values from any tier
///
/// Also the schema of the optional TOML file; every key is optional there.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub api_token: Option<String>,
    pub api_base_url: Option<String>,
    pub poll_type: Option<String>,
    pub domain: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub admin_username: Option<String>,
    pub handler_timeout_secs: Option<u64>,
    pub startup_delay_secs: Option<u64>,
    pub allow_empty_pack: Option<bool>,
}

impl RawConfig {
    /// Parse TOML config content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML config file
    pub fn load_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read TOML {} failed: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Fill every missing value from `fallback` (self wins)
    pub fn or(self, fallback: RawConfig) -> RawConfig {
        RawConfig {
            api_token: self.api_token.or(fallback.api_token),
            api_base_url: self.api_base_url.or(fallback.api_base_url),
            poll_type: self.poll_type.or(fallback.poll_type),
            domain: self.domain.or(fallback.domain),
            port: self.port.or(fallback.port),
            database_url: self.database_url.or(fallback.database_url),
            admin_username: self.admin_username.or(fallback.admin_username),
            handler_timeout_secs: self.handler_timeout_secs.or(fallback.handler_timeout_secs),
            startup_delay_secs: self.startup_delay_secs.or(fallback.startup_delay_secs),
            allow_empty_pack: self.allow_empty_pack.or(fallback.allow_empty_pack),
        }
    }
}

/// Validated process configuration
///
/// Built once in `main` and shared by reference with every component.
#[derive(Clone)]
pub struct BotConfig {
    pub api_token: String,
    pub api_base_url: String,
    pub deploy_mode: DeployMode,
    /// Externally reachable host name (webhook mode only)
    pub domain: Option<String>,
    pub port: u16,
    pub database_url: String,
    /// Contact handle shown to users, without a leading `@`
    pub admin_username: String,
    /// Route the webhook listens on, regenerated on every start
    pub webhook_path: String,
    pub handler_timeout: Duration,
    pub startup_delay: Duration,
    pub removal_policy: RemovalPolicy,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("api_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("deploy_mode", &self.deploy_mode)
            .field("domain", &self.domain)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("admin_username", &self.admin_username)
            .field("webhook_path", &self.webhook_path)
            .field("handler_timeout", &self.handler_timeout)
            .field("startup_delay", &self.startup_delay)
            .field("removal_policy", &self.removal_policy)
            .finish()
    }
}

impl BotConfig {
    /// Validate raw values into a usable configuration
    pub fn from_raw(raw: RawConfig) -> Result<Self> {
        let api_token = required(raw.api_token, "API_TOKEN")?;

        let deploy_mode: DeployMode = required(raw.poll_type, "POLL_TYPE")?.parse()?;

        let domain = match deploy_mode {
            DeployMode::Webhook => {
                let domain = required(raw.domain, "DOMAIN")?;
                validate_domain(&domain)?;
                Some(domain)
            }
            DeployMode::Polling => match raw.domain {
                Some(domain) if !domain.trim().is_empty() => {
                    validate_domain(&domain)?;
                    Some(domain)
                }
                _ => None,
            },
        };

        let port = match (deploy_mode, raw.port) {
            (_, Some(0)) => return Err(Error::Config("PORT must not be 0".to_string())),
            (_, Some(port)) => port,
            (DeployMode::Webhook, None) => {
                return Err(Error::Config("PORT is not set".to_string()))
            }
            (DeployMode::Polling, None) => DEFAULT_PORT,
        };

        let database_url = required(raw.database_url, "DATABASE_URL")?;
        validate_database_url(&database_url)?;

        let admin_username = required(raw.admin_username, "ADMIN_USERNAME")?
            .trim_start_matches('@')
            .to_string();
        if admin_username.is_empty() {
            return Err(Error::Config("ADMIN_USERNAME is empty".to_string()));
        }

        let api_base_url = raw
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let handler_timeout_secs = raw
            .handler_timeout_secs
            .unwrap_or(DEFAULT_HANDLER_TIMEOUT_SECS);
        if handler_timeout_secs == 0 {
            return Err(Error::Config(
                "HANDLER_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            api_token,
            api_base_url,
            deploy_mode,
            domain,
            port,
            database_url,
            admin_username,
            webhook_path: generate_webhook_path(),
            handler_timeout: Duration::from_secs(handler_timeout_secs),
            startup_delay: Duration::from_secs(raw.startup_delay_secs.unwrap_or(0)),
            removal_policy: RemovalPolicy::from_allow_empty(raw.allow_empty_pack.unwrap_or(false)),
        })
    }

    /// Full HTTPS URL registered with the platform (webhook mode only)
    pub fn webhook_url(&self) -> Option<String> {
        self.domain
            .as_ref()
            .map(|domain| format!("https://{}{}", domain, self.webhook_path))
    }

    /// Link users can follow to reach the administrator
    pub fn admin_contact_url(&self) -> String {
        format!("https://t.me/{}", self.admin_username)
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::Config(format!("{} is not set", name))),
    }
}

/// DOMAIN must be a bare host: no scheme, no trailing slash
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.ends_with('/') {
        return Err(Error::Config("DOMAIN must not end with slash".to_string()));
    }
    if domain.starts_with("http") {
        return Err(Error::Config(
            "DOMAIN must not start with http or https".to_string(),
        ));
    }
    Ok(())
}

/// DATABASE_URL must point at the relational store the bot speaks (SQLite)
pub fn validate_database_url(url: &str) -> Result<()> {
    if !url.starts_with("sqlite:") {
        return Err(Error::Config(
            "DATABASE_URL must start with sqlite:".to_string(),
        ));
    }
    Ok(())
}

/// Fixed prefix plus a random alphanumeric suffix
pub fn generate_webhook_path() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(WEBHOOK_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", WEBHOOK_PATH_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polling_raw() -> RawConfig {
        RawConfig {
            api_token: Some("123:abc".to_string()),
            poll_type: Some("POLLING".to_string()),
            database_url: Some("sqlite://hits.db".to_string()),
            admin_username: Some("@admin".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_deploy_mode_parse() {
        assert_eq!("WEBHOOK".parse::<DeployMode>().unwrap(), DeployMode::Webhook);
        assert_eq!("polling".parse::<DeployMode>().unwrap(), DeployMode::Polling);
        assert!("LONGPOLL".parse::<DeployMode>().is_err());
    }

    #[test]
    fn test_polling_defaults() {
        let config = BotConfig::from_raw(polling_raw()).unwrap();
        assert_eq!(config.deploy_mode, DeployMode::Polling);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.removal_policy, RemovalPolicy::KeepLast);
        assert!(config.webhook_url().is_none());
    }

    #[test]
    fn test_webhook_path_has_prefix_and_random_suffix() {
        let a = generate_webhook_path();
        let b = generate_webhook_path();
        assert!(a.starts_with(WEBHOOK_PATH_PREFIX));
        assert_eq!(a.len(), WEBHOOK_PATH_PREFIX.len() + WEBHOOK_SUFFIX_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = BotConfig::from_raw(polling_raw()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("123:abc"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_raw_merge_prefers_self() {
        let high = RawConfig {
            port: Some(9000),
            ..Default::default()
        };
        let low = RawConfig {
            port: Some(1000),
            domain: Some("bot.example.com".to_string()),
            ..Default::default()
        };
        let merged = high.or(low);
        assert_eq!(merged.port, Some(9000));
        assert_eq!(merged.domain.as_deref(), Some("bot.example.com"));
    }
}
