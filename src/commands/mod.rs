//! Command handling module.
//!
//! Processes commands arriving as slash commands, bot mentions, or plain
//! messages that start with the `/entropick` prefix.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{
    BotCommand, CommandResult, DEFAULT_HISTORY, MemberArgs, PickArgs, PickSource, Visibility,
};
