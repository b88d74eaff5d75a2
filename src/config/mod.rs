//! Configuration module for the reviewer picker.
//!
//! Handles loading and validation of the reviewer pools file and the
//! Slack credentials and bot settings taken from the environment.

mod pools;
mod settings;

pub use pools::{PoolConfig, PoolsConfig, ValidationError};
pub use settings::{BotSettings, ConfigError, SlackConfig};
