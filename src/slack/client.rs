//! Slack client: Socket Mode connection and Web API posting.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::events::process_envelope;
use super::{Notifier, RateLimiter, ReplyTarget};
use crate::commands::Visibility;
use crate::config::SlackConfig;
use crate::dispatch::{DispatchMessage, Trigger};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Attempts per post before a 429 is reported to the caller.
const MAX_POST_ATTEMPTS: u32 = 2;

/// Errors that can occur while talking to Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack API error in {method}: {code}")]
    Api { method: String, code: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dispatcher is no longer running")]
    DispatcherClosed,
}

impl SlackError {
    /// Whether retrying with the same credentials is pointless.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::DispatcherClosed)
    }
}

/// Connection tuning.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Ping interval for WebSocket keep-alive.
    pub ping_interval: Duration,
    /// Timeout for Web API requests.
    pub request_timeout: Duration,
    /// Web API base URL.
    pub api_base: String,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            api_base: SLACK_API_BASE.to_owned(),
        }
    }
}

/// How a single Socket Mode connection ended.
enum ConnectionEnd {
    Shutdown,
    Reconnect,
}

/// Slack bot connection.
pub struct SlackBot {
    config: SlackConfig,

    /// HTTP client for Web API calls.
    client: reqwest::Client,

    options: BotOptions,

    /// Bot's own user ID, learned from `auth.test`.
    bot_user_id: Option<String>,

    /// Spaces out outgoing posts.
    rate_limiter: RateLimiter,
}

impl SlackBot {
    /// Connects to Slack and verifies the bot token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or `auth.test` fails.
    pub async fn connect(
        config: SlackConfig,
        options: BotOptions,
        min_post_interval_ms: u64,
    ) -> Result<Self, SlackError> {
        let mut bot = Self::new(config, options, min_post_interval_ms)?;

        let auth = bot.api_call("auth.test", &json!({})).await.map_err(|e| match e {
            SlackError::Api { code, .. } => SlackError::Auth(code),
            other => other,
        })?;

        if let Some(user_id) = auth.get("user_id").and_then(Value::as_str) {
            let team = auth.get("team").and_then(Value::as_str).unwrap_or("?");
            info!("Authenticated as bot user {} in team {}", user_id, team);
            bot.bot_user_id = Some(user_id.to_owned());
        }

        Ok(bot)
    }

    /// Builds the client without contacting Slack.
    fn new(
        config: SlackConfig,
        options: BotOptions,
        min_post_interval_ms: u64,
    ) -> Result<Self, SlackError> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            options,
            bot_user_id: None,
            rate_limiter: RateLimiter::from_millis(min_post_interval_ms),
        })
    }

    /// The bot's own user ID, if known.
    #[must_use]
    pub fn bot_user_id(&self) -> Option<&str> {
        self.bot_user_id.as_deref()
    }

    /// Runs Socket Mode until shutdown, reconnecting on failures.
    ///
    /// Inbound commands are forwarded to `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that reconnecting cannot fix.
    pub async fn run_socket_mode(
        &self,
        tx: mpsc::Sender<DispatchMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), SlackError> {
        loop {
            let result = match self.open_socket_url().await {
                Ok(url) => {
                    info!("Connecting to Socket Mode...");
                    self.connect_and_run(&url, &tx, &mut shutdown).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(ConnectionEnd::Shutdown) => {
                    info!("Socket Mode stopped");
                    return Ok(());
                }
                Ok(ConnectionEnd::Reconnect) => {
                    info!("Reconnecting to Socket Mode");
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("Socket Mode connection error: {}", e),
            }

            info!("Reconnecting in {:?}...", self.options.reconnect_delay);
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                () = tokio::time::sleep(self.options.reconnect_delay) => {}
            }
        }
    }

    /// Gets a fresh WebSocket URL from `apps.connections.open`.
    async fn open_socket_url(&self) -> Result<String, SlackError> {
        let response = self
            .client
            .post(format!("{}/apps.connections.open", self.options.api_base))
            .bearer_auth(self.config.app_token())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await?;

        let body: Value = response.json().await?;
        check_ok("apps.connections.open", &body)?;

        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| SlackError::Api {
                method: "apps.connections.open".to_owned(),
                code: "missing_url".to_owned(),
            })
    }

    async fn connect_and_run(
        &self,
        url: &str,
        tx: &mpsc::Sender<DispatchMessage>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<ConnectionEnd, SlackError> {
        let (ws_stream, _) = connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();

        let ping_every = self.options.ping_interval;
        let mut ping = interval_at(Instant::now() + ping_every, ping_every);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(ConnectionEnd::Shutdown);
                }
                _ = ping.tick() => {
                    write.send(WsMessage::Ping(Vec::new())).await?;
                }
                frame = read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let outcome = match process_envelope(&text, self.bot_user_id()) {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                warn!("Failed to parse Socket Mode envelope: {}", e);
                                continue;
                            }
                        };

                        // Ack before dispatching so Slack does not redeliver.
                        if let Some(ack) = outcome.ack {
                            write.send(WsMessage::Text(ack)).await?;
                        }

                        if let Some(trigger) = outcome.trigger {
                            forward_trigger(tx, trigger)?;
                        }

                        if outcome.reconnect {
                            return Ok(ConnectionEnd::Reconnect);
                        }
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        write.send(WsMessage::Pong(data)).await?;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("WebSocket closed by server");
                        return Ok(ConnectionEnd::Reconnect);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }

    /// Calls a Web API method with the bot token.
    ///
    /// # Errors
    ///
    /// Returns an error on HTTP failure, rate limiting, or `ok: false`.
    pub async fn api_call(&self, method: &str, payload: &Value) -> Result<Value, SlackError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.options.api_base))
            .bearer_auth(self.config.bot_token())
            .json(payload)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SlackError::RateLimited {
                retry_after_secs: retry_after_secs(&response),
            });
        }

        let body: Value = response.error_for_status()?.json().await?;
        check_ok(method, &body)?;
        Ok(body)
    }

    /// Posts a visible message to a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the post fails.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), SlackError> {
        let (method, payload) = build_post(channel, text, thread_ts, None);
        self.api_call(method, &payload).await.map(|_| ())
    }

    /// Posts a message only `user` can see.
    ///
    /// # Errors
    ///
    /// Returns an error if the post fails.
    pub async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), SlackError> {
        let (method, payload) = build_post(channel, text, thread_ts, Some(user));
        self.api_call(method, &payload).await.map(|_| ())
    }

    /// Replies through a slash command's `response_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn respond(
        &self,
        response_url: &str,
        text: &str,
        visibility: Visibility,
    ) -> Result<(), SlackError> {
        let payload = json!({
            "response_type": response_type(visibility),
            "text": text,
        });

        let response = self.client.post(response_url).json(&payload).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SlackError::RateLimited {
                retry_after_secs: retry_after_secs(&response),
            });
        }
        response.error_for_status()?;
        Ok(())
    }

    async fn deliver(
        &self,
        target: &ReplyTarget,
        text: &str,
        visibility: Visibility,
    ) -> Result<(), SlackError> {
        match target {
            ReplyTarget::ResponseUrl(url) => self.respond(url, text, visibility).await,
            ReplyTarget::Channel {
                channel,
                thread_ts,
                user,
            } => match ephemeral_recipient(channel, user.as_deref(), visibility) {
                Some(user) => {
                    self.post_ephemeral(channel, user, text, thread_ts.as_deref())
                        .await
                }
                None => self.post_message(channel, text, thread_ts.as_deref()).await,
            },
        }
    }
}

impl Notifier for SlackBot {
    async fn notify(
        &self,
        target: &ReplyTarget,
        text: &str,
        visibility: Visibility,
    ) -> Result<(), SlackError> {
        let mut attempt = 1;
        loop {
            self.rate_limiter.wait_and_acquire().await;
            match self.deliver(target, text, visibility).await {
                Err(SlackError::RateLimited { retry_after_secs }) if attempt < MAX_POST_ATTEMPTS => {
                    self.rate_limiter
                        .defer(Duration::from_secs(retry_after_secs))
                        .await;
                    attempt += 1;
                }
                Ok(()) => {
                    debug!("Delivered reply ({} chars)", text.len());
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Hands a trigger to the dispatcher without blocking the socket loop.
///
/// A full queue drops the trigger; acks and pings must keep flowing.
fn forward_trigger(tx: &mpsc::Sender<DispatchMessage>, trigger: Trigger) -> Result<(), SlackError> {
    match tx.try_send(DispatchMessage::Trigger(trigger)) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(DispatchMessage::Trigger(trigger))) => {
            warn!(
                "Dispatcher queue full, dropping command from {}",
                trigger.requested_by.as_deref().unwrap_or("unknown user")
            );
            Ok(())
        }
        Err(TrySendError::Full(_)) => Ok(()),
        Err(TrySendError::Closed(_)) => Err(SlackError::DispatcherClosed),
    }
}

/// Maps `ok: false` bodies to errors.
fn check_ok(method: &str, body: &Value) -> Result<(), SlackError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }

    let code = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");

    match code {
        "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
            Err(SlackError::Auth(format!("{method}: {code}")))
        }
        _ => Err(SlackError::Api {
            method: method.to_owned(),
            code: code.to_owned(),
        }),
    }
}

fn retry_after_secs(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(30)
}

const fn response_type(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Ephemeral => "ephemeral",
        Visibility::InChannel => "in_channel",
    }
}

/// Ephemeral posts need a user and make no sense in a DM.
fn ephemeral_recipient<'a>(
    channel: &str,
    user: Option<&'a str>,
    visibility: Visibility,
) -> Option<&'a str> {
    match visibility {
        Visibility::Ephemeral if !channel.starts_with('D') => user,
        _ => None,
    }
}

/// Builds a `chat.postMessage` or `chat.postEphemeral` call.
fn build_post(
    channel: &str,
    text: &str,
    thread_ts: Option<&str>,
    ephemeral_user: Option<&str>,
) -> (&'static str, Value) {
    let mut payload = json!({
        "channel": channel,
        "text": text,
    });
    if let Some(ts) = thread_ts {
        payload["thread_ts"] = json!(ts);
    }

    match ephemeral_user {
        Some(user) => {
            payload["user"] = json!(user);
            ("chat.postEphemeral", payload)
        }
        None => ("chat.postMessage", payload),
    }
}
