//! The narrow interface through which replies leave the bot.

use std::future::Future;

use super::SlackError;
use crate::commands::Visibility;

/// Where a reply should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// A slash command's `response_url`.
    ResponseUrl(String),

    /// A channel or DM, optionally inside a thread.
    Channel {
        channel: String,
        thread_ts: Option<String>,
        /// User to address ephemeral replies to.
        user: Option<String>,
    },
}

/// Sends text replies back to the chat platform.
pub trait Notifier: Send + Sync {
    /// Delivers `text` to `target`.
    fn notify(
        &self,
        target: &ReplyTarget,
        text: &str,
        visibility: Visibility,
    ) -> impl Future<Output = Result<(), SlackError>> + Send;
}
