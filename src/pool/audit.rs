//! In-memory audit trail of selections.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

/// Where the candidates for a selection came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSource {
    /// A configured pool, picked with fair weights.
    Pool(String),
    /// Names supplied with the command, picked uniformly.
    AdHoc,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool(name) => write!(f, "pool '{name}'"),
            Self::AdHoc => write!(f, "ad-hoc list"),
        }
    }
}

/// One completed selection.
#[derive(Debug, Clone)]
pub struct SelectionRecord {
    pub at: DateTime<Utc>,
    pub requested_by: Option<String>,
    pub source: SelectionSource,
    pub candidates: usize,
    pub selected: Vec<String>,
}

impl SelectionRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn now(
        requested_by: Option<String>,
        source: SelectionSource,
        candidates: usize,
        selected: Vec<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            requested_by,
            source,
            candidates,
            selected,
        }
    }
}

impl fmt::Display for SelectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} from {} ({} candidates)",
            self.at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.selected.join(", "),
            self.source,
            self.candidates
        )?;
        if let Some(user) = &self.requested_by {
            write!(f, " requested by <@{user}>")?;
        }
        Ok(())
    }
}

/// Bounded log of recent selections; the oldest record is dropped first.
#[derive(Debug)]
pub struct AuditLog {
    records: VecDeque<SelectionRecord>,
    capacity: usize,
}

impl AuditLog {
    /// Creates a log that keeps at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, record: SelectionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Returns up to `count` records, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &SelectionRecord> {
        self.records.iter().rev().take(count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> SelectionRecord {
        SelectionRecord::now(None, SelectionSource::AdHoc, 3, vec![name.to_owned()])
    }

    #[test]
    fn test_recent_newest_first() {
        let mut log = AuditLog::new(10);
        log.record(record("a"));
        log.record(record("b"));
        log.record(record("c"));

        let names: Vec<_> = log.recent(2).map(|r| r.selected[0].as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = AuditLog::new(2);
        log.record(record("a"));
        log.record(record("b"));
        log.record(record("c"));

        assert_eq!(log.len(), 2);
        let names: Vec<_> = log.recent(10).map(|r| r.selected[0].as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[test]
    fn test_record_display() {
        let rec = SelectionRecord::now(
            Some("U1AAA".to_owned()),
            SelectionSource::Pool("backend".to_owned()),
            4,
            vec!["<@U2BBB>".to_owned()],
        );
        let text = rec.to_string();
        assert!(text.contains("<@U2BBB> from pool 'backend' (4 candidates)"));
        assert!(text.ends_with("requested by <@U1AAA>"));
    }
}
