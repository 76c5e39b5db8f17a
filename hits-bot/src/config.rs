//! Configuration resolution for hits-bot
//!
//! Priority: command line → environment → TOML file. Everything is merged
//! into one [`RawConfig`] and validated once by [`BotConfig::from_raw`];
//! any failure aborts startup.

use clap::Parser;
use hits_common::config::RawConfig;
use hits_common::{BotConfig, Result};
use std::path::PathBuf;
use tracing::info;

/// Legacy name for `POLL_TYPE`
const DEPLOY_METHOD_ENV: &str = "DEPLOY_METHOD";

#[derive(Parser, Debug, Default)]
#[command(name = "hits-bot")]
#[command(about = "Personal sticker pack bot")]
#[command(version)]
pub struct Args {
    /// Optional TOML config file
    #[arg(long = "config", env = "HITS_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Bot API token
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// WEBHOOK or POLLING
    #[arg(long, env = "POLL_TYPE")]
    pub poll_type: Option<String>,

    /// Public host name for the webhook, without scheme
    #[arg(long, env = "DOMAIN")]
    pub domain: Option<String>,

    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// sqlite: connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Handle users are pointed to when something looks wrong
    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    #[arg(long, env = "HANDLER_TIMEOUT_SECS")]
    pub handler_timeout_secs: Option<u64>,

    /// Delay before registering the webhook
    #[arg(long, env = "STARTUP_DELAY_SECS")]
    pub startup_delay_secs: Option<u64>,

    /// Allow removing the last sticker of a pack
    #[arg(long, env = "ALLOW_EMPTY_PACK")]
    pub allow_empty_pack: Option<bool>,
}

impl Args {
    /// Command line and environment tier
    pub fn into_raw(self) -> (Option<PathBuf>, RawConfig) {
        let poll_type = self
            .poll_type
            .or_else(|| std::env::var(DEPLOY_METHOD_ENV).ok());

        let raw = RawConfig {
            api_token: self.api_token,
            api_base_url: self.api_base_url,
            poll_type,
            domain: self.domain,
            port: self.port,
            database_url: self.database_url,
            admin_username: self.admin_username,
            handler_timeout_secs: self.handler_timeout_secs,
            startup_delay_secs: self.startup_delay_secs,
            allow_empty_pack: self.allow_empty_pack,
        };

        (self.config_file, raw)
    }
}

/// Merge all tiers and validate
pub fn load_config(args: Args) -> Result<BotConfig> {
    let (config_file, cli_env) = args.into_raw();

    let raw = match config_file {
        Some(path) => {
            info!(path = %path.display(), "Loading TOML config");
            cli_env.or(RawConfig::load_toml(&path)?)
        }
        None => cli_env,
    };

    BotConfig::from_raw(raw)
}
