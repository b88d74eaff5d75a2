//! Socket Mode envelopes and the events the bot reacts to.
//!
//! Every envelope carrying an `envelope_id` must be acknowledged. Slash
//! commands, `app_mention` events and direct messages become [`Trigger`]s;
//! everything else is acknowledged and dropped.

use serde::Deserialize;
use tracing::debug;

use super::ReplyTarget;
use crate::dispatch::{CommandText, Trigger};

/// Socket Mode envelope wrapping every inbound payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketModeEnvelope {
    /// Envelope ID to acknowledge (absent on `hello`).
    #[serde(default)]
    pub envelope_id: Option<String>,

    /// Payload kind: `hello`, `events_api`, `slash_commands`, `disconnect`...
    #[serde(rename = "type")]
    pub envelope_type: String,

    #[serde(default)]
    pub payload: Option<serde_json::Value>,

    /// Reason given with `disconnect` envelopes.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Slash command payload (only the fields the bot uses).
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommandPayload {
    /// The command, e.g. `/entropick`.
    pub command: String,
    /// Text typed after the command.
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    /// URL for posting the reply.
    pub response_url: String,
}

/// `events_api` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EventCallback {
    pub event: SlackEvent,
}

/// Slack event types that we handle.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    AppMention(AppMentionEvent),
    Message(MessageEvent),
    #[serde(other)]
    Unknown,
}

/// Bot was @mentioned in a channel.
#[derive(Debug, Clone, Deserialize)]
pub struct AppMentionEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// A message the bot can see.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub channel: String,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Check if this is a direct message.
    #[must_use]
    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im") || self.channel.starts_with('D')
    }

    /// Bot posts, edits and deletions are never commands.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.bot_id.is_some() || self.subtype.is_some()
    }
}

/// What the socket loop should do with one inbound frame.
#[derive(Debug, Default)]
pub struct EnvelopeOutcome {
    /// Acknowledgement frame to send back.
    pub ack: Option<String>,
    /// Command to hand to the dispatcher.
    pub trigger: Option<Trigger>,
    /// Slack asked us to reconnect.
    pub reconnect: bool,
}

/// Decodes one Socket Mode text frame.
///
/// # Errors
///
/// Returns an error if the frame is not a valid envelope.
pub fn process_envelope(
    frame: &str,
    bot_user_id: Option<&str>,
) -> Result<EnvelopeOutcome, serde_json::Error> {
    let envelope: SocketModeEnvelope = serde_json::from_str(frame)?;

    let ack = envelope
        .envelope_id
        .as_ref()
        .map(|id| serde_json::json!({ "envelope_id": id }).to_string());

    let mut outcome = EnvelopeOutcome {
        ack,
        ..EnvelopeOutcome::default()
    };

    match envelope.envelope_type.as_str() {
        "slash_commands" => {
            if let Some(payload) = envelope.payload {
                let command: SlashCommandPayload = serde_json::from_value(payload)?;
                outcome.trigger = Some(trigger_from_slash_command(command));
            }
        }
        "events_api" => {
            if let Some(payload) = envelope.payload {
                let callback: EventCallback = serde_json::from_value(payload)?;
                outcome.trigger = trigger_from_event(callback.event, bot_user_id);
            }
        }
        "disconnect" => {
            debug!(
                "Slack requested disconnect: {}",
                envelope.reason.as_deref().unwrap_or("no reason")
            );
            outcome.reconnect = true;
        }
        "hello" => debug!("Socket Mode connection established"),
        other => debug!("Ignoring envelope type: {}", other),
    }

    Ok(outcome)
}

fn trigger_from_slash_command(command: SlashCommandPayload) -> Trigger {
    debug!(
        "Slash command {} from {} in {}",
        command.command, command.user_id, command.channel_id
    );
    Trigger {
        text: CommandText::Args(command.text),
        requested_by: Some(command.user_id),
        reply_to: ReplyTarget::ResponseUrl(command.response_url),
    }
}

fn trigger_from_event(event: SlackEvent, bot_user_id: Option<&str>) -> Option<Trigger> {
    match event {
        SlackEvent::AppMention(event) => {
            if event.bot_id.is_some() {
                return None;
            }
            Some(Trigger {
                text: CommandText::Args(strip_mention(&event.text, bot_user_id)),
                requested_by: event.user.clone(),
                reply_to: ReplyTarget::Channel {
                    channel: event.channel,
                    thread_ts: Some(event.thread_ts.unwrap_or(event.ts)),
                    user: event.user,
                },
            })
        }
        SlackEvent::Message(event) => {
            if event.is_ignored() || !event.is_direct_message() {
                return None;
            }
            Some(Trigger {
                text: CommandText::Message(event.text),
                requested_by: event.user.clone(),
                reply_to: ReplyTarget::Channel {
                    channel: event.channel,
                    thread_ts: event.thread_ts,
                    user: event.user,
                },
            })
        }
        SlackEvent::Unknown => None,
    }
}

/// Removes the bot mention from an `app_mention` text.
///
/// Without a known bot ID, a leading `<@...>` token is dropped instead.
#[must_use]
pub fn strip_mention(text: &str, bot_user_id: Option<&str>) -> String {
    let text = text.trim();
    match bot_user_id {
        Some(id) => text.replacen(&format!("<@{id}>"), "", 1).trim().to_owned(),
        None => match text.split_once(char::is_whitespace) {
            Some((first, rest)) if first.starts_with("<@") => rest.trim().to_owned(),
            None if text.starts_with("<@") => String::new(),
            _ => text.to_owned(),
        },
    }
}
