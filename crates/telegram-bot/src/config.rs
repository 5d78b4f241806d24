//! Application configuration loaded from environment variables.

use crate::poller::{DEFAULT_NOT_SUPPORTED_MESSAGE, DEFAULT_POLL_INTERVAL};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Telegram configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Bot configuration
    #[serde(default)]
    pub bot: BotConfig,

    /// Command plugin configuration
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_id: Option<String>,

    /// Bot API endpoint
    #[serde(default = "default_telegram_url")]
    pub base_url: String,

    /// Request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Delay between update polls
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reply to commands nobody handles
    #[serde(default)]
    pub complain_about_invalid_commands: bool,

    /// Reply text for unknown commands (`{command}` is substituted)
    #[serde(default = "default_not_supported_message")]
    pub command_not_supported_message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandsConfig {
    #[serde(default)]
    pub get: GetConfig,

    #[serde(default)]
    pub reddit: RedditConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetConfig {
    /// Google Custom Search engine id
    #[serde(default)]
    pub google_cse_id: Option<String>,

    /// Google Custom Search API key
    #[serde(default)]
    pub google_api_key: Option<String>,

    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Timeout for search and image download requests
    #[serde(default = "default_plugin_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    /// Comma-separated subreddits to pick images from
    #[serde(default = "default_subreddits")]
    pub subreddits: String,

    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_reddit_url")]
    pub base_url: String,

    /// Timeout for listing, imgur and image download requests
    #[serde(default = "default_plugin_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl RedditConfig {
    pub fn subreddit_list(&self) -> Vec<String> {
        self.subreddits
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// Default implementations
impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_id: None,
            base_url: default_telegram_url(),
            timeout: default_timeout(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            log_level: default_log_level(),
            complain_about_invalid_commands: false,
            command_not_supported_message: default_not_supported_message(),
        }
    }
}

impl Default for GetConfig {
    fn default() -> Self {
        Self {
            google_cse_id: None,
            google_api_key: None,
            search_url: default_search_url(),
            timeout: default_plugin_timeout(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            subreddits: default_subreddits(),
            user_agent: default_reddit_user_agent(),
            base_url: default_reddit_url(),
            timeout: default_plugin_timeout(),
        }
    }
}

// Default value functions
fn default_telegram_url() -> String {
    telegram_client::DEFAULT_BASE_URL.into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_plugin_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_log_level() -> String {
    "info".into()
}

fn default_not_supported_message() -> String {
    DEFAULT_NOT_SUPPORTED_MESSAGE.into()
}

fn default_search_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}

fn default_subreddits() -> String {
    "aww".into()
}

fn default_reddit_user_agent() -> String {
    "rust:telegram-reddit-command:1 (by /u/killarny)".into()
}

fn default_reddit_url() -> String {
    "https://www.reddit.com".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Bot tokens look like "123456:ABC"; keep everything a string.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if config.telegram.bot_id.is_none() {
            config.telegram.bot_id = std::env::var("TELEGRAM_BOT_ID").ok();
        }
        Ok(config)
    }

    /// Apply a bot id given on the command line.
    pub fn with_bot_id(mut self, bot_id: Option<String>) -> Self {
        if bot_id.is_some() {
            self.telegram.bot_id = bot_id;
        }
        self
    }

    /// The configured bot id; a bot cannot start without one.
    pub fn bot_id(&self) -> Result<&str> {
        match self.telegram.bot_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => bail!("No bot_id supplied. Set TELEGRAM__BOT_ID or pass --bot-id."),
        }
    }
}
