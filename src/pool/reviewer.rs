//! Reviewer identity and selection counters.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single reviewer that can be picked from a pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reviewer {
    /// Slack user ID (e.g. `U024BE7LH`) or a free-form handle for ad-hoc pools.
    pub slack_id: String,

    /// Display name.
    pub name: String,

    /// Whether this reviewer can currently be picked.
    #[serde(rename = "available", default = "default_available")]
    pub is_available: bool,

    /// How many times this reviewer has been picked.
    #[serde(skip)]
    pub times_selected: u64,

    /// How many selections happened while this reviewer was available.
    #[serde(skip)]
    pub times_available: u64,
}

fn default_available() -> bool {
    true
}

impl Reviewer {
    /// Creates an available reviewer with zeroed counters.
    #[must_use]
    pub fn new(slack_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slack_id: slack_id.into(),
            name: name.into(),
            is_available: true,
            times_selected: 0,
            times_available: 0,
        }
    }

    /// Builds a reviewer from a chat token.
    ///
    /// Accepts Slack mention escapes (`<@U123|bob>`, `<@U123>`) and plain
    /// handles (`@bob`, `bob`). Returns `None` for empty tokens.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().trim_end_matches(',');
        if token.is_empty() {
            return None;
        }

        if let Some(inner) = token.strip_prefix("<@").and_then(|t| t.strip_suffix('>')) {
            let (id, name) = match inner.split_once('|') {
                Some((id, name)) => (id, name),
                None => (inner, inner),
            };
            if id.is_empty() {
                return None;
            }
            return Some(Self::new(id, name));
        }

        let handle = token.trim_start_matches('@');
        if handle.is_empty() {
            return None;
        }
        Some(Self::new(handle, handle))
    }

    /// Returns how this reviewer should be rendered in a Slack message.
    ///
    /// Real Slack user IDs become mentions so the reviewer is notified.
    #[must_use]
    pub fn mention(&self) -> String {
        if looks_like_user_id(&self.slack_id) {
            format!("<@{}>", self.slack_id)
        } else {
            self.name.clone()
        }
    }

    /// Checks whether a user-supplied token refers to this reviewer.
    ///
    /// Matches on Slack ID, or on the display name ignoring case.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        let Some(other) = Self::from_token(token) else {
            return false;
        };
        self.slack_id == other.slack_id || self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl PartialEq for Reviewer {
    fn eq(&self, other: &Self) -> bool {
        self.slack_id == other.slack_id
    }
}

impl Eq for Reviewer {}

impl Hash for Reviewer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slack_id.hash(state);
    }
}

/// Slack user IDs start with `U` or `W` followed by uppercase alphanumerics.
fn looks_like_user_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('U' | 'W'))
        && id.len() >= 3
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_mention_with_name() {
        let r = Reviewer::from_token("<@U024BE7LH|bob>").unwrap();
        assert_eq!(r.slack_id, "U024BE7LH");
        assert_eq!(r.name, "bob");
    }

    #[test]
    fn test_from_token_bare_mention() {
        let r = Reviewer::from_token("<@U024BE7LH>").unwrap();
        assert_eq!(r.slack_id, "U024BE7LH");
        assert_eq!(r.mention(), "<@U024BE7LH>");
    }

    #[test]
    fn test_from_token_plain_handle() {
        let r = Reviewer::from_token("@alice,").unwrap();
        assert_eq!(r.slack_id, "alice");
        assert_eq!(r.name, "alice");
        assert_eq!(r.mention(), "alice");
    }

    #[test]
    fn test_from_token_empty() {
        assert!(Reviewer::from_token("").is_none());
        assert!(Reviewer::from_token("@").is_none());
        assert!(Reviewer::from_token("<@>").is_none());
    }

    #[test]
    fn test_equality_by_slack_id() {
        let a = Reviewer::new("U1AAA", "alice");
        let mut b = Reviewer::new("U1AAA", "Alice Smith");
        b.times_selected = 4;
        assert_eq!(a, b);
        assert_ne!(a, Reviewer::new("U2BBB", "alice"));
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        let r = Reviewer::new("U1AAA", "Alice");
        assert!(r.matches("alice"));
        assert!(r.matches("<@U1AAA>"));
        assert!(!r.matches("bob"));
    }
}
