//! Slack connection module.
//!
//! Receives commands over Socket Mode and posts replies through the Web
//! API, with rate limiting on outgoing posts.

mod client;
mod events;
mod notifier;
mod rate_limiter;

pub use client::{BotOptions, SlackBot, SlackError};
pub use events::{EnvelopeOutcome, SlackEvent, SocketModeEnvelope, process_envelope, strip_mention};
pub use notifier::{Notifier, ReplyTarget};
pub use rate_limiter::RateLimiter;
