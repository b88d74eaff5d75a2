//! Trigger dispatcher.
//!
//! The Slack connection turns every slash command, mention and direct
//! message into a [`Trigger`] and sends it here. The dispatcher runs the
//! command and hands the reply to a [`Notifier`]. Delivery failures are
//! logged and never stop the loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::commands::{CommandHandler, CommandResult};
use crate::slack::{Notifier, ReplyTarget};

/// Command text as it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandText {
    /// Arguments only (slash command text, mention with the bot stripped).
    Args(String),
    /// A free-form message that may or may not start with the prefix.
    Message(String),
}

/// A command waiting to be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub text: CommandText,

    /// Slack user ID of the sender, if known.
    pub requested_by: Option<String>,

    pub reply_to: ReplyTarget,
}

/// Messages that can be sent to the dispatcher.
#[derive(Debug, Clone)]
pub enum DispatchMessage {
    /// Run a command and reply.
    Trigger(Trigger),
    /// Stop the dispatcher.
    Shutdown,
}

/// Runs triggers through the command handler.
pub struct TriggerDispatcher<N> {
    handler: Arc<CommandHandler>,
    notifier: Arc<N>,
}

impl<N: Notifier> TriggerDispatcher<N> {
    /// Creates a new dispatcher.
    #[must_use]
    pub const fn new(handler: Arc<CommandHandler>, notifier: Arc<N>) -> Self {
        Self { handler, notifier }
    }

    /// Runs the dispatch loop until shutdown or until every sender is gone.
    pub async fn run(&self, mut rx: mpsc::Receiver<DispatchMessage>) {
        info!("Dispatcher started");

        while let Some(msg) = rx.recv().await {
            match msg {
                DispatchMessage::Trigger(trigger) => self.process(trigger).await,
                DispatchMessage::Shutdown => break,
            }
        }

        info!("Dispatcher shutting down");
    }

    /// Runs one trigger and delivers the reply.
    async fn process(&self, trigger: Trigger) {
        let result = self.dispatch(&trigger).await;

        if let Err(e) = self
            .notifier
            .notify(&trigger.reply_to, &result.message, result.visibility)
            .await
        {
            error!("Failed to deliver reply to {:?}: {}", trigger.reply_to, e);
        }
    }

    /// Runs the command carried by `trigger`.
    ///
    /// Text that is not a command gets a usage hint.
    pub async fn dispatch(&self, trigger: &Trigger) -> CommandResult {
        let requested_by = trigger.requested_by.as_deref();

        let result = match &trigger.text {
            CommandText::Args(args) => self.handler.try_handle_args(args, requested_by).await,
            CommandText::Message(text) => match self.handler.try_handle(text, requested_by).await {
                Some(result) => Some(result),
                // Direct messages may leave the prefix off.
                None => self.handler.try_handle_args(text, requested_by).await,
            },
        };

        result.unwrap_or_else(|| {
            debug!("Not a command: {:?}", trigger.text);
            CommandResult::error(format!(
                "Unknown command. Try `{} help`.",
                self.handler.prefix()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tokio::sync::{Mutex, RwLock};

    use super::*;
    use crate::commands::Visibility;
    use crate::config::PoolsConfig;
    use crate::pool::{PoolRegistry, Selector};
    use crate::slack::SlackError;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(ReplyTarget, String, Visibility)>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(
            &self,
            target: &ReplyTarget,
            text: &str,
            visibility: Visibility,
        ) -> Result<(), SlackError> {
            self.sent
                .lock()
                .await
                .push((target.clone(), text.to_owned(), visibility));
            if self.fail {
                return Err(SlackError::Api {
                    method: "chat.postMessage".to_owned(),
                    code: "channel_not_found".to_owned(),
                });
            }
            Ok(())
        }
    }

    fn handler_at(path: &Path) -> Arc<CommandHandler> {
        let config = PoolsConfig::example();
        config.save_to_file(path).unwrap();
        let registry = Arc::new(RwLock::new(PoolRegistry::from_config(&config)));
        Arc::new(CommandHandler::new(
            "/entropick".to_owned(),
            registry,
            Selector::seeded(11),
            10,
            path,
        ))
    }

    fn trigger(text: CommandText) -> Trigger {
        Trigger {
            text,
            requested_by: Some("U9REQ".to_owned()),
            reply_to: ReplyTarget::Channel {
                channel: "C1".to_owned(),
                thread_ts: None,
                user: Some("U9REQ".to_owned()),
            },
        }
    }

    #[tokio::test]
    async fn test_dispatch_pick_is_announced() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = TriggerDispatcher::new(handler_at(&dir.path().join("p.json")), notifier);

        let result = dispatcher
            .dispatch(&trigger(CommandText::Args("pick from frontend".to_owned())))
            .await;
        assert!(result.success);
        assert_eq!(result.visibility, Visibility::InChannel);
        assert!(result.message.contains("<@U04DAVE>") || result.message.contains("<@U05ERIN>"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command_gets_hint() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = TriggerDispatcher::new(handler_at(&dir.path().join("p.json")), notifier);

        let result = dispatcher
            .dispatch(&trigger(CommandText::Args("dance".to_owned())))
            .await;
        assert!(!result.success);
        assert_eq!(result.visibility, Visibility::Ephemeral);
        assert_eq!(result.message, "Unknown command. Try `/entropick help`.");

        let result = dispatcher
            .dispatch(&trigger(CommandText::Args("pick alice from backend".to_owned())))
            .await;
        assert!(!result.success);
        assert_eq!(result.message, "Unknown command. Try `/entropick help`.");
    }

    #[tokio::test]
    async fn test_dispatch_direct_message_with_and_without_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = TriggerDispatcher::new(handler_at(&dir.path().join("p.json")), notifier);

        let prefixed = dispatcher
            .dispatch(&trigger(CommandText::Message("/entropick pools".to_owned())))
            .await;
        let bare = dispatcher
            .dispatch(&trigger(CommandText::Message("pools".to_owned())))
            .await;

        assert!(prefixed.success);
        assert_eq!(prefixed.message, bare.message);
    }

    #[tokio::test]
    async fn test_run_delivers_replies_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher =
            TriggerDispatcher::new(handler_at(&dir.path().join("p.json")), Arc::clone(&notifier));

        let (tx, rx) = mpsc::channel(8);
        tx.send(DispatchMessage::Trigger(trigger(CommandText::Args("help".to_owned()))))
            .await
            .unwrap();
        tx.send(DispatchMessage::Trigger(trigger(CommandText::Args(
            "pick alice bob".to_owned(),
        ))))
        .await
        .unwrap();
        tx.send(DispatchMessage::Shutdown).await.unwrap();
        tx.send(DispatchMessage::Trigger(trigger(CommandText::Args("info".to_owned()))))
            .await
            .unwrap();

        dispatcher.run(rx).await;

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].2, Visibility::Ephemeral);
        assert!(sent[0].1.contains("EntroPick Commands"));
        assert_eq!(sent[1].2, Visibility::InChannel);
        assert!(sent[1].1.starts_with("🎲 Reviewer:"));
    }

    #[tokio::test]
    async fn test_run_survives_delivery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        let dispatcher =
            TriggerDispatcher::new(handler_at(&dir.path().join("p.json")), Arc::clone(&notifier));

        let (tx, rx) = mpsc::channel(8);
        for _ in 0..3 {
            tx.send(DispatchMessage::Trigger(trigger(CommandText::Args("pools".to_owned()))))
                .await
                .unwrap();
        }
        drop(tx);

        dispatcher.run(rx).await;
        assert_eq!(notifier.sent.lock().await.len(), 3);
    }
}
