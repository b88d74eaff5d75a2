//! Command types and definitions.

use std::fmt;

/// Where a `pick` command draws its candidates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickSource {
    /// The configured default pool.
    DefaultPool,
    /// A configured pool by name.
    Pool(String),
    /// Names typed into the command.
    AdHoc(Vec<String>),
}

/// Arguments for `pick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickArgs {
    pub count: usize,
    pub source: PickSource,
}

/// Arguments for membership and availability commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberArgs {
    pub members: Vec<String>,
    pub pool: Option<String>,
}

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Pick one or more reviewers.
    Pick(PickArgs),

    /// List configured pools.
    Pools,

    /// List members of a pool.
    List(Option<String>),

    /// Add members to a pool.
    Add(MemberArgs),

    /// Remove members from a pool.
    Remove(MemberArgs),

    /// Mark members as unavailable.
    Away(MemberArgs),

    /// Mark members as available again.
    Back(MemberArgs),

    /// Show fairness statistics.
    Stats(Option<String>),

    /// Reset selection statistics.
    Reset(Option<String>),

    /// Show recent selections.
    History(usize),

    /// Show help information.
    Help,

    /// Show information about the bot.
    Info,
}

/// Number of audit records shown by `history` without an argument.
pub const DEFAULT_HISTORY: usize = 5;

impl BotCommand {
    /// Parses a command from a message that starts with `prefix`.
    ///
    /// Returns `None` if the message is not a valid command.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let text = text.trim();
        let head = text.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }

        let rest = &text[prefix.len()..];
        // Require a word boundary after the prefix.
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        Self::parse_args(rest)
    }

    /// Parses the argument text of a slash command or mention.
    ///
    /// Empty text means "pick one from the default pool".
    #[must_use]
    pub fn parse_args(args: &str) -> Option<Self> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let Some((cmd, rest)) = tokens.split_first() else {
            return Some(Self::Pick(PickArgs {
                count: 1,
                source: PickSource::DefaultPool,
            }));
        };

        match cmd.to_lowercase().as_str() {
            "pick" | "p" | "choose" => Self::parse_pick(rest),
            "pools" => Some(Self::Pools),
            "list" | "ls" | "l" => Some(Self::List(single_name(rest)?)),
            "add" | "join" => Self::parse_members(rest, "to").map(Self::Add),
            "remove" | "rm" | "del" => Self::parse_members(rest, "from").map(Self::Remove),
            "away" | "ooo" => Self::parse_members(rest, "in").map(Self::Away),
            "back" | "return" => Self::parse_members(rest, "in").map(Self::Back),
            "stats" | "fairness" => Some(Self::Stats(single_name(rest)?)),
            "reset" => Some(Self::Reset(single_name(rest)?)),
            "history" | "log" => match rest {
                [] => Some(Self::History(DEFAULT_HISTORY)),
                [n] => n.parse().ok().filter(|&n| n > 0).map(Self::History),
                _ => None,
            },
            "help" | "h" | "?" => Some(Self::Help),
            "info" | "about" | "version" => Some(Self::Info),
            _ => None,
        }
    }

    /// Parses `pick [N] [from <pool> | <name>...]`.
    fn parse_pick(tokens: &[&str]) -> Option<Self> {
        let (count, tokens) = match tokens.split_first() {
            Some((first, rest)) if first.chars().all(|c| c.is_ascii_digit()) => {
                let count: usize = first.parse().ok()?;
                if count == 0 {
                    return None;
                }
                (count, rest)
            }
            _ => (1, tokens),
        };

        let source = match tokens {
            [] => PickSource::DefaultPool,
            [keyword, pool] if keyword.eq_ignore_ascii_case("from") => {
                PickSource::Pool((*pool).to_owned())
            }
            // `from` anywhere else is a malformed pool pick, not a name.
            names if names.iter().any(|n| n.eq_ignore_ascii_case("from")) => return None,
            names => {
                let names: Vec<String> = names
                    .iter()
                    .flat_map(|n| n.split(','))
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_owned)
                    .collect();
                if names.is_empty() {
                    return None;
                }
                PickSource::AdHoc(names)
            }
        };

        Some(Self::Pick(PickArgs { count, source }))
    }

    /// Parses `<member>... [<keyword> <pool>]`.
    fn parse_members(tokens: &[&str], keyword: &str) -> Option<MemberArgs> {
        let (members, pool) = match tokens {
            [members @ .., kw, pool] if kw.eq_ignore_ascii_case(keyword) => {
                (members, Some((*pool).to_owned()))
            }
            members => (members, None),
        };

        if members.is_empty() {
            return None;
        }

        Some(MemberArgs {
            members: members.iter().map(|m| (*m).to_owned()).collect(),
            pool,
        })
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pick(_) => "pick",
            Self::Pools => "pools",
            Self::List(_) => "list",
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::Away(_) => "away",
            Self::Back(_) => "back",
            Self::Stats(_) => "stats",
            Self::Reset(_) => "reset",
            Self::History(_) => "history",
            Self::Help => "help",
            Self::Info => "info",
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("pick [N]", "(p)", "Pick N reviewers from the default pool"),
            ("pick [N] from <pool>", "", "Pick from a named pool"),
            ("pick [N] <name>...", "", "Pick uniformly from the names given"),
            ("pools", "", "List configured pools"),
            ("list [pool]", "(ls)", "List members of a pool"),
            ("add <member>... [to <pool>]", "", "Add members to a pool"),
            ("remove <member>... [from <pool>]", "(rm)", "Remove members from a pool"),
            ("away <member>... [in <pool>]", "(ooo)", "Mark members unavailable"),
            ("back <member>... [in <pool>]", "", "Mark members available again"),
            ("stats [pool]", "", "Show fairness statistics"),
            ("reset [pool]", "", "Reset selection statistics"),
            ("history [N]", "(log)", "Show recent selections"),
            ("info", "", "Show bot information"),
            ("help", "(h, ?)", "Show this help message"),
        ]
    }
}

/// Accepts zero or one trailing word; more is a parse error.
fn single_name(tokens: &[&str]) -> Option<Option<String>> {
    match tokens {
        [] => Some(None),
        [name] => Some(Some((*name).to_owned())),
        _ => None,
    }
}

impl fmt::Display for PickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultPool => Ok(()),
            Self::Pool(pool) => write!(f, " from {pool}"),
            Self::AdHoc(names) => write!(f, " {}", names.join(" ")),
        }
    }
}

impl fmt::Display for MemberArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.members.join(" "))?;
        if let Some(pool) = &self.pool {
            write!(f, " ({pool})")?;
        }
        Ok(())
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pick(args) => write!(f, "pick {}{}", args.count, args.source),
            Self::List(Some(pool)) | Self::Stats(Some(pool)) | Self::Reset(Some(pool)) => {
                write!(f, "{} {pool}", self.name())
            }
            Self::Add(args) | Self::Remove(args) | Self::Away(args) | Self::Back(args) => {
                write!(f, "{} {args}", self.name())
            }
            Self::History(n) => write!(f, "history {n}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// How a reply should be shown in the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only the invoking user sees the reply.
    #[default]
    Ephemeral,
    /// Everyone in the channel sees the reply.
    InChannel,
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,

    /// Who should see the response.
    pub visibility: Visibility,
}

impl CommandResult {
    /// Creates a successful result visible only to the invoker.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            visibility: Visibility::Ephemeral,
        }
    }

    /// Creates a successful result posted to the whole channel.
    #[must_use]
    pub fn announce(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            visibility: Visibility::InChannel,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            visibility: Visibility::Ephemeral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/entropick";

    fn pick(count: usize, source: PickSource) -> Option<BotCommand> {
        Some(BotCommand::Pick(PickArgs { count, source }))
    }

    #[test]
    fn test_parse_empty_is_default_pick() {
        assert_eq!(BotCommand::parse("/entropick", PREFIX), pick(1, PickSource::DefaultPool));
        assert_eq!(BotCommand::parse_args("   "), pick(1, PickSource::DefaultPool));
    }

    #[test]
    fn test_parse_pick_count() {
        assert_eq!(
            BotCommand::parse("/entropick pick 2", PREFIX),
            pick(2, PickSource::DefaultPool)
        );
        assert_eq!(BotCommand::parse("/entropick pick 0", PREFIX), None);
    }

    #[test]
    fn test_parse_pick_from_pool() {
        assert_eq!(
            BotCommand::parse_args("pick 2 from frontend"),
            pick(2, PickSource::Pool("frontend".to_owned()))
        );
        assert_eq!(
            BotCommand::parse_args("pick FROM backend"),
            pick(1, PickSource::Pool("backend".to_owned()))
        );
        assert_eq!(BotCommand::parse_args("pick from"), None);
    }

    #[test]
    fn test_parse_pick_ad_hoc() {
        assert_eq!(
            BotCommand::parse_args("pick <@U1AAA> <@U2BBB> carol"),
            pick(
                1,
                PickSource::AdHoc(vec![
                    "<@U1AAA>".to_owned(),
                    "<@U2BBB>".to_owned(),
                    "carol".to_owned()
                ])
            )
        );
        assert_eq!(
            BotCommand::parse_args("p 2 alice bob carol"),
            pick(
                2,
                PickSource::AdHoc(vec!["alice".to_owned(), "bob".to_owned(), "carol".to_owned()])
            )
        );
    }

    #[test]
    fn test_parse_pick_misplaced_from_rejected() {
        assert_eq!(BotCommand::parse_args("pick alice from backend"), None);
        assert_eq!(BotCommand::parse_args("pick from a b"), None);
        assert_eq!(BotCommand::parse_args("pick 2 alice bob from"), None);
    }

    #[test]
    fn test_parse_pick_comma_separated_names() {
        let names = PickSource::AdHoc(vec![
            "alice".to_owned(),
            "bob".to_owned(),
            "carol".to_owned(),
        ]);
        assert_eq!(BotCommand::parse_args("pick alice,bob,carol"), pick(1, names.clone()));
        assert_eq!(BotCommand::parse_args("pick alice, bob ,carol"), pick(1, names));
        assert_eq!(BotCommand::parse_args("pick , ,"), None);
    }

    #[test]
    fn test_parse_add_with_pool() {
        assert_eq!(
            BotCommand::parse_args("add alice bob to frontend"),
            Some(BotCommand::Add(MemberArgs {
                members: vec!["alice".to_owned(), "bob".to_owned()],
                pool: Some("frontend".to_owned()),
            }))
        );
    }

    #[test]
    fn test_parse_remove_default_pool() {
        assert_eq!(
            BotCommand::parse_args("rm alice"),
            Some(BotCommand::Remove(MemberArgs {
                members: vec!["alice".to_owned()],
                pool: None,
            }))
        );
        assert_eq!(BotCommand::parse_args("remove"), None);
        assert_eq!(BotCommand::parse_args("remove from backend"), None);
    }

    #[test]
    fn test_parse_away_and_back() {
        assert_eq!(
            BotCommand::parse_args("away <@U1AAA> in backend"),
            Some(BotCommand::Away(MemberArgs {
                members: vec!["<@U1AAA>".to_owned()],
                pool: Some("backend".to_owned()),
            }))
        );
        assert!(matches!(BotCommand::parse_args("back alice"), Some(BotCommand::Back(_))));
    }

    #[test]
    fn test_parse_optional_pool_commands() {
        assert_eq!(BotCommand::parse_args("stats"), Some(BotCommand::Stats(None)));
        assert_eq!(
            BotCommand::parse_args("list frontend"),
            Some(BotCommand::List(Some("frontend".to_owned())))
        );
        assert_eq!(BotCommand::parse_args("reset a b"), None);
    }

    #[test]
    fn test_parse_history() {
        assert_eq!(BotCommand::parse_args("history"), Some(BotCommand::History(DEFAULT_HISTORY)));
        assert_eq!(BotCommand::parse_args("log 12"), Some(BotCommand::History(12)));
        assert_eq!(BotCommand::parse_args("history zero"), None);
    }

    #[test]
    fn test_parse_wrong_prefix() {
        assert_eq!(BotCommand::parse("/other pick", PREFIX), None);
        assert_eq!(BotCommand::parse("/entropicker pick", PREFIX), None);
        assert_eq!(BotCommand::parse("pick", PREFIX), None);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(BotCommand::parse("/EntroPick HELP", PREFIX), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse_args("Pools"), Some(BotCommand::Pools));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(BotCommand::parse_args("dance"), None);
    }

    #[test]
    fn test_display() {
        let cmd = BotCommand::parse_args("pick 2 from backend").unwrap();
        assert_eq!(cmd.to_string(), "pick 2 from backend");
        let cmd = BotCommand::parse_args("away alice in frontend").unwrap();
        assert_eq!(cmd.to_string(), "away alice (frontend)");
    }
}
