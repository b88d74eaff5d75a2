//! Application settings and Slack credentials.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// Slack credentials, loaded once at startup.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot OAuth token (`xoxb-...`), used for Web API calls.
    bot_token: SecretString,

    /// App-level token (`xapp-...`), used to open Socket Mode connections.
    app_token: SecretString,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .finish()
    }
}

impl SlackConfig {
    /// Creates a new Slack configuration.
    #[must_use]
    pub fn new(bot_token: impl Into<String>, app_token: impl Into<String>) -> Self {
        Self {
            bot_token: SecretString::new(bot_token.into().into()),
            app_token: SecretString::new(app_token.into().into()),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `SLACK_BOT_TOKEN` and `SLACK_APP_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is missing or has the wrong shape.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("SLACK_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("SLACK_BOT_TOKEN"))?;

        let app_token = std::env::var("SLACK_APP_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("SLACK_APP_TOKEN"))?;

        let config = Self::new(bot_token, app_token);
        config.validate()?;
        Ok(config)
    }

    /// Checks token prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidToken`] for empty or mis-prefixed tokens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bot_token.expose_secret().starts_with("xoxb-") {
            return Err(ConfigError::InvalidToken {
                name: "SLACK_BOT_TOKEN",
                prefix: "xoxb-",
            });
        }
        if !self.app_token.expose_secret().starts_with("xapp-") {
            return Err(ConfigError::InvalidToken {
                name: "SLACK_APP_TOKEN",
                prefix: "xapp-",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn bot_token(&self) -> &str {
        self.bot_token.expose_secret()
    }

    #[must_use]
    pub fn app_token(&self) -> &str {
        self.app_token.expose_secret()
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Path to the pools JSON file.
    pub pools_path: PathBuf,

    /// Prefix for commands typed as plain messages (slash commands and
    /// mentions don't need it).
    pub command_prefix: String,

    /// Minimum interval between posted messages in milliseconds.
    pub min_post_interval_ms: u64,

    /// How many selections the audit log keeps.
    pub history_size: usize,

    /// Fixed RNG seed for reproducible picks.
    pub seed: Option<u64>,
}

fn default_command_prefix() -> String {
    "/entropick".to_owned()
}

fn default_min_post_interval() -> u64 {
    1000 // chat.postMessage allows roughly one message per second per channel
}

fn default_history_size() -> usize {
    100
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            pools_path: PathBuf::from("pools.json"),
            command_prefix: default_command_prefix(),
            min_post_interval_ms: default_min_post_interval(),
            history_size: default_history_size(),
            seed: None,
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            pools_path: std::env::var("ENTROPICK_POOLS_PATH")
                .map_or_else(|_| PathBuf::from("pools.json"), PathBuf::from),
            command_prefix: std::env::var("ENTROPICK_COMMAND_PREFIX")
                .unwrap_or_else(|_| default_command_prefix()),
            min_post_interval_ms: parse_env("ENTROPICK_MIN_POST_INTERVAL_MS")
                .unwrap_or_else(default_min_post_interval),
            history_size: parse_env("ENTROPICK_HISTORY_SIZE")
                .unwrap_or_else(default_history_size),
            seed: parse_env("ENTROPICK_SEED"),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring invalid value for {}: {:?}", name, raw);
    }
    parsed
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("{name} must start with '{prefix}'")]
    InvalidToken {
        name: &'static str,
        prefix: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.command_prefix, "/entropick");
        assert_eq!(settings.min_post_interval_ms, 1000);
        assert_eq!(settings.history_size, 100);
        assert!(settings.seed.is_none());
    }

    #[test]
    fn test_slack_config_validate() {
        assert!(SlackConfig::new("xoxb-1", "xapp-1").validate().is_ok());
        assert!(matches!(
            SlackConfig::new("xapp-1", "xapp-1").validate(),
            Err(ConfigError::InvalidToken { name: "SLACK_BOT_TOKEN", .. })
        ));
        assert!(matches!(
            SlackConfig::new("xoxb-1", "").validate(),
            Err(ConfigError::InvalidToken { name: "SLACK_APP_TOKEN", .. })
        ));
    }

    #[test]
    fn test_slack_config_debug_redacts_tokens() {
        let config = SlackConfig::new("xoxb-secret", "xapp-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(config.bot_token(), "xoxb-secret");
    }
}
