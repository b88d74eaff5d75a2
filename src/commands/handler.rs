//! Command handler implementation.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::types::{BotCommand, CommandResult, MemberArgs, PickArgs, PickSource};
use crate::pool::{
    AuditLog, PoolError, PoolRegistry, Reviewer, SelectionError, SelectionRecord,
    SelectionSource, Selector,
};

/// Handles bot commands and owns the selection state.
pub struct CommandHandler {
    /// Command prefix for plain messages (e.g. "`/entropick`").
    prefix: String,

    /// Configured pools with their live statistics.
    registry: Arc<RwLock<PoolRegistry>>,

    /// Random source shared by every selection.
    selector: Mutex<Selector>,

    /// Recent selections.
    audit: RwLock<AuditLog>,

    /// Path to the pools file (for saving membership changes).
    config_path: PathBuf,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        prefix: String,
        registry: Arc<RwLock<PoolRegistry>>,
        selector: Selector,
        history_size: usize,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            prefix,
            registry,
            selector: Mutex::new(selector),
            audit: RwLock::new(AuditLog::new(history_size)),
            config_path: config_path.into(),
        }
    }

    /// Command prefix used for plain messages.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Tries to parse and execute a prefixed command from a message.
    ///
    /// Returns `None` if the message is not a command.
    pub async fn try_handle(
        &self,
        message_text: &str,
        requested_by: Option<&str>,
    ) -> Option<CommandResult> {
        let command = BotCommand::parse(message_text, &self.prefix)?;
        Some(self.run(command, requested_by).await)
    }

    /// Tries to parse and execute slash command or mention arguments.
    ///
    /// Returns `None` if the arguments are not a command.
    pub async fn try_handle_args(
        &self,
        args: &str,
        requested_by: Option<&str>,
    ) -> Option<CommandResult> {
        let command = BotCommand::parse_args(args)?;
        Some(self.run(command, requested_by).await)
    }

    async fn run(&self, command: BotCommand, requested_by: Option<&str>) -> CommandResult {
        debug!("Handling command: {}", command);
        let result = self.execute(command, requested_by).await;
        info!(
            "Command result: success={}, visibility={:?}",
            result.success, result.visibility
        );
        result
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand, requested_by: Option<&str>) -> CommandResult {
        match command {
            BotCommand::Pick(args) => self.handle_pick(args, requested_by).await,
            BotCommand::Pools => self.handle_pools().await,
            BotCommand::List(pool) => self.handle_list(pool.as_deref()).await,
            BotCommand::Add(args) => self.handle_add(args).await,
            BotCommand::Remove(args) => self.handle_remove(args).await,
            BotCommand::Away(args) => self.handle_availability(args, false).await,
            BotCommand::Back(args) => self.handle_availability(args, true).await,
            BotCommand::Stats(pool) => self.handle_stats(pool.as_deref()).await,
            BotCommand::Reset(pool) => self.handle_reset(pool.as_deref()).await,
            BotCommand::History(count) => self.handle_history(count).await,
            BotCommand::Help => self.handle_help(),
            BotCommand::Info => self.handle_info(),
        }
    }

    async fn handle_pick(&self, args: PickArgs, requested_by: Option<&str>) -> CommandResult {
        let outcome = match args.source {
            PickSource::DefaultPool => self.pick_from_pool(None, args.count).await,
            PickSource::Pool(name) => self.pick_from_pool(Some(&name), args.count).await,
            PickSource::AdHoc(names) => self.pick_ad_hoc(&names, args.count).await,
        };

        match outcome {
            Ok((source, candidates, picked)) => {
                let mentions: Vec<String> = picked.iter().map(Reviewer::mention).collect();
                let record = SelectionRecord::now(
                    requested_by.map(str::to_owned),
                    source.clone(),
                    candidates,
                    mentions.clone(),
                );
                info!(
                    source = %source,
                    candidates,
                    requested_by = requested_by.unwrap_or("-"),
                    "Selected {}",
                    mentions.join(", ")
                );
                self.audit.write().await.record(record);

                let label = if mentions.len() == 1 {
                    "Reviewer"
                } else {
                    "Reviewers"
                };
                CommandResult::announce(format!("🎲 {label}: {}", mentions.join(", ")))
            }
            Err(e) => CommandResult::error(describe_pool_error(&e)),
        }
    }

    async fn pick_from_pool(
        &self,
        name: Option<&str>,
        count: usize,
    ) -> Result<(SelectionSource, usize, Vec<Reviewer>), PoolError> {
        let mut registry = self.registry.write().await;
        let pool = registry.get_mut(name)?;
        let candidates = pool.available_reviewers().len();

        let mut selector = self.selector.lock().await;
        let picked = pool.pick(count, &mut selector)?;

        Ok((
            SelectionSource::Pool(pool.name().to_owned()),
            candidates,
            picked,
        ))
    }

    async fn pick_ad_hoc(
        &self,
        names: &[String],
        count: usize,
    ) -> Result<(SelectionSource, usize, Vec<Reviewer>), PoolError> {
        let mut candidates: Vec<Reviewer> = Vec::with_capacity(names.len());
        for reviewer in names.iter().filter_map(|n| Reviewer::from_token(n)) {
            if !candidates.contains(&reviewer) {
                candidates.push(reviewer);
            }
        }

        let mut selector = self.selector.lock().await;
        let picked: Vec<Reviewer> = if count == 1 {
            vec![selector.choose(&candidates)?.clone()]
        } else {
            selector
                .choose_many(&candidates, count)?
                .into_iter()
                .cloned()
                .collect()
        };

        Ok((SelectionSource::AdHoc, candidates.len(), picked))
    }

    async fn handle_pools(&self) -> CommandResult {
        let registry = self.registry.read().await;

        if registry.is_empty() {
            return CommandResult::error("No pools configured.");
        }

        let mut lines = vec!["Reviewer pools:".to_owned()];
        for pool in registry.pools() {
            let marker = if pool.name().eq_ignore_ascii_case(registry.default_pool()) {
                "→ "
            } else {
                "  "
            };
            lines.push(format!(
                "{marker}{} ({}/{} available)",
                pool.name(),
                pool.available_reviewers().len(),
                pool.len()
            ));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_list(&self, pool: Option<&str>) -> CommandResult {
        let registry = self.registry.read().await;

        let pool = match registry.get(pool) {
            Ok(pool) => pool,
            Err(e) => return CommandResult::error(describe_pool_error(&e)),
        };

        if pool.is_empty() {
            return CommandResult::success(format!("Pool '{}' has no members.", pool.name()));
        }

        let mut lines = vec![format!("Members of '{}':", pool.name())];
        for reviewer in pool.reviewers() {
            let status = if reviewer.is_available {
                "✓"
            } else {
                "✗ away"
            };
            lines.push(format!(
                "  {} ({}) {status}",
                reviewer.name, reviewer.slack_id
            ));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_add(&self, args: MemberArgs) -> CommandResult {
        let mut registry = self.registry.write().await;
        let snapshot = registry.clone();

        let pool = match registry.get_mut(args.pool.as_deref()) {
            Ok(pool) => pool,
            Err(e) => return CommandResult::error(describe_pool_error(&e)),
        };
        let pool_name = pool.name().to_owned();

        let mut added = Vec::new();
        let mut skipped = Vec::new();
        for token in &args.members {
            let Some(reviewer) = Reviewer::from_token(token) else {
                skipped.push(token.clone());
                continue;
            };

            // A mention names a user ID; two users may share a display name.
            let exists = if token.trim_start().starts_with("<@") {
                pool.reviewers().contains(&reviewer)
            } else {
                pool.find(token).is_some()
            };
            if exists {
                skipped.push(token.clone());
                continue;
            }

            let label = reviewer.mention();
            if pool.add_reviewer(reviewer) {
                added.push(label);
            } else {
                skipped.push(label);
            }
        }

        if added.is_empty() {
            return CommandResult::error(format!(
                "Nothing added to '{pool_name}'. Already members or invalid: {}",
                skipped.join(", ")
            ));
        }

        if let Err(e) = registry.to_config().save_to_file(&self.config_path) {
            *registry = snapshot; // Rollback
            warn!("Failed to save config: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        let mut message = format!("✓ Added to '{pool_name}': {}", added.join(", "));
        if !skipped.is_empty() {
            message.push_str(&format!("\nSkipped: {}", skipped.join(", ")));
        }
        CommandResult::success(message)
    }

    async fn handle_remove(&self, args: MemberArgs) -> CommandResult {
        let mut registry = self.registry.write().await;
        let snapshot = registry.clone();

        let pool = match registry.get_mut(args.pool.as_deref()) {
            Ok(pool) => pool,
            Err(e) => return CommandResult::error(describe_pool_error(&e)),
        };
        let pool_name = pool.name().to_owned();

        let mut removed = Vec::new();
        let mut missing = Vec::new();
        for token in &args.members {
            match pool.remove_reviewer(token) {
                Some(reviewer) => removed.push(reviewer.name),
                None => missing.push(token.clone()),
            }
        }

        if removed.is_empty() {
            return CommandResult::error(format!(
                "Not found in '{pool_name}': {}. Use 'list' to see members.",
                missing.join(", ")
            ));
        }

        if let Err(e) = registry.to_config().save_to_file(&self.config_path) {
            *registry = snapshot; // Rollback
            warn!("Failed to save config: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        let mut message = format!("✓ Removed from '{pool_name}': {}", removed.join(", "));
        if !missing.is_empty() {
            message.push_str(&format!("\nNot found: {}", missing.join(", ")));
        }
        CommandResult::success(message)
    }

    async fn handle_availability(&self, args: MemberArgs, available: bool) -> CommandResult {
        let mut registry = self.registry.write().await;
        let snapshot = registry.clone();

        let mut changed = Vec::new();
        for member in &args.members {
            match registry.set_available(member, args.pool.as_deref(), available) {
                Ok(pools) => changed.push(format!("{member} ({})", pools.join(", "))),
                Err(e) => {
                    *registry = snapshot;
                    return CommandResult::error(describe_pool_error(&e));
                }
            }
        }

        if let Err(e) = registry.to_config().save_to_file(&self.config_path) {
            *registry = snapshot; // Rollback
            warn!("Failed to save config: {}", e);
            return CommandResult::error(format!("Failed to save: {e}"));
        }

        let verb = if available {
            "▶ Back"
        } else {
            "⏸ Away"
        };
        CommandResult::success(format!("{verb}: {}", changed.join(", ")))
    }

    async fn handle_stats(&self, pool: Option<&str>) -> CommandResult {
        let registry = self.registry.read().await;

        let pool = match registry.get(pool) {
            Ok(pool) => pool,
            Err(e) => return CommandResult::error(describe_pool_error(&e)),
        };

        let mut lines = vec![format!(
            "Fairness for '{}' ({} selections):",
            pool.name(),
            pool.total_selections()
        )];
        for stats in pool.fairness_summary() {
            lines.push(format!(
                "  {}: picked {}/{} (expected {:.2}, rate {:.3}, weight {:.2})",
                stats.name,
                stats.times_selected,
                stats.times_available,
                stats.expected_selections,
                stats.selection_rate,
                stats.current_weight
            ));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_reset(&self, pool: Option<&str>) -> CommandResult {
        let mut registry = self.registry.write().await;

        match registry.get_mut(pool) {
            Ok(pool) => {
                pool.reset_stats();
                info!("Statistics reset for pool '{}'", pool.name());
                CommandResult::success(format!("✓ Statistics reset for '{}'.", pool.name()))
            }
            Err(e) => CommandResult::error(describe_pool_error(&e)),
        }
    }

    async fn handle_history(&self, count: usize) -> CommandResult {
        let audit = self.audit.read().await;

        if audit.is_empty() {
            return CommandResult::success("No selections yet.");
        }

        let mut lines = vec!["Recent selections:".to_owned()];
        lines.extend(audit.recent(count).map(|r| format!("  {r}")));

        if let Some(seed) = self.selector.lock().await.seed() {
            lines.push(format!("Seed: {seed}"));
        }

        CommandResult::success(lines.join("\n"))
    }

    fn handle_help(&self) -> CommandResult {
        let mut lines = vec![
            format!("EntroPick Commands (prefix: {})", self.prefix),
            String::new(),
        ];

        for (cmd, aliases, desc) in BotCommand::all_commands() {
            let alias_str = if aliases.is_empty() {
                String::new()
            } else {
                format!(" {aliases}")
            };
            lines.push(format!("  {cmd}{alias_str} - {desc}"));
        }

        CommandResult::success(lines.join("\n"))
    }

    #[allow(clippy::unused_self)]
    fn handle_info(&self) -> CommandResult {
        let version = env!("CARGO_PKG_VERSION");
        let message = format!(
            "EntroPick v{version}\n\
             Picks code reviewers fairly from configured pools."
        );
        CommandResult::success(message)
    }
}

/// Turns a pool error into a user-facing reply.
fn describe_pool_error(err: &PoolError) -> String {
    match err {
        PoolError::UnknownPool(name) => {
            format!("Unknown pool: '{name}'. Use 'pools' to see available pools.")
        }
        PoolError::UnknownReviewer(name) => {
            format!("No reviewer matching '{name}'. Use 'list' to see members.")
        }
        PoolError::Selection(SelectionError::EmptyPool) => {
            "No reviewers available to pick from.".to_owned()
        }
        PoolError::Selection(SelectionError::NotEnough {
            requested,
            available,
        }) => format!("Not enough reviewers: asked for {requested}, only {available} available."),
        PoolError::Selection(e) => e.to_string(),
    }
}
