//! Named reviewer pool with fairness tracking.
//!
//! Selection is weighted by how far each reviewer is behind their fair share:
//!
//! ```text
//! expected = times_available / Σ times_available × total_selections
//! deficit  = expected − times_selected
//! weight   = max(0.1, 1.0 + deficit)
//! ```
//!
//! With no history every weight is 1.0, so the first picks are uniform.

use serde::Serialize;
use tracing::debug;

use super::{Reviewer, SelectionError, Selector};

/// Smallest weight a reviewer can have, so nobody is ever excluded.
pub const MIN_WEIGHT: f64 = 0.1;

/// Per-reviewer fairness metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FairnessStats {
    pub name: String,
    pub times_selected: u64,
    pub times_available: u64,
    pub expected_selections: f64,
    pub deficit: f64,
    pub selection_rate: f64,
    pub current_weight: f64,
}

/// A named set of reviewers.
#[derive(Debug, Clone)]
pub struct ReviewerPool {
    name: String,
    reviewers: Vec<Reviewer>,
    total_selections: u64,
}

impl ReviewerPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reviewers: Vec::new(),
            total_selections: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All reviewers in insertion order.
    #[must_use]
    pub fn reviewers(&self) -> &[Reviewer] {
        &self.reviewers
    }

    #[must_use]
    pub const fn total_selections(&self) -> u64 {
        self.total_selections
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reviewers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reviewers.is_empty()
    }

    /// Adds a reviewer. Returns `false` if one with the same Slack ID exists.
    pub fn add_reviewer(&mut self, reviewer: Reviewer) -> bool {
        if self.reviewers.contains(&reviewer) {
            return false;
        }
        self.reviewers.push(reviewer);
        true
    }

    /// Removes the reviewer matching `token`, returning it.
    pub fn remove_reviewer(&mut self, token: &str) -> Option<Reviewer> {
        let index = self.reviewers.iter().position(|r| r.matches(token))?;
        Some(self.reviewers.remove(index))
    }

    /// Finds the reviewer matching `token`.
    #[must_use]
    pub fn find(&self, token: &str) -> Option<&Reviewer> {
        self.reviewers.iter().find(|r| r.matches(token))
    }

    /// Sets availability for the reviewer matching `token`.
    ///
    /// Returns `false` if no reviewer matches.
    pub fn set_available(&mut self, token: &str, available: bool) -> bool {
        match self.reviewers.iter_mut().find(|r| r.matches(token)) {
            Some(reviewer) => {
                reviewer.is_available = available;
                true
            }
            None => false,
        }
    }

    /// Reviewers that can currently be picked.
    #[must_use]
    pub fn available_reviewers(&self) -> Vec<&Reviewer> {
        self.reviewers.iter().filter(|r| r.is_available).collect()
    }

    /// Computes fair weights for the given reviewers, in the same order.
    #[must_use]
    pub fn fair_weights(&self, reviewers: &[&Reviewer]) -> Vec<f64> {
        let total_availability: u64 = reviewers.iter().map(|r| r.times_available).sum();

        if total_availability == 0 {
            return vec![1.0; reviewers.len()];
        }

        reviewers
            .iter()
            .map(|r| {
                let deficit = self.expected_selections(r, total_availability)
                    - r.times_selected as f64;
                (1.0 + deficit).max(MIN_WEIGHT)
            })
            .collect()
    }

    fn expected_selections(&self, reviewer: &Reviewer, total_availability: u64) -> f64 {
        if total_availability == 0 {
            return 0.0;
        }
        reviewer.times_available as f64 / total_availability as f64
            * self.total_selections as f64
    }

    /// Picks `count` distinct available reviewers using fair weights, then
    /// updates the selection statistics.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyPool`] if nobody is available and
    /// [`SelectionError::NotEnough`] if fewer than `count` are.
    pub fn pick(
        &mut self,
        count: usize,
        selector: &mut Selector,
    ) -> Result<Vec<Reviewer>, SelectionError> {
        let available = self.available_reviewers();
        if available.is_empty() {
            return Err(SelectionError::EmptyPool);
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        if available.len() < count {
            return Err(SelectionError::NotEnough {
                requested: count,
                available: available.len(),
            });
        }

        let weights = self.fair_weights(&available);
        debug!(pool = %self.name, ?weights, "Fair weights computed");

        let indices = selector.choose_weighted(&weights, count)?;
        let selected: Vec<Reviewer> = indices.into_iter().map(|i| available[i].clone()).collect();

        self.record_selection(&selected);
        Ok(selected)
    }

    /// Updates counters after a selection.
    ///
    /// Every available reviewer gains one availability; selected reviewers
    /// also gain one selection.
    pub fn record_selection(&mut self, selected: &[Reviewer]) {
        for reviewer in self.reviewers.iter_mut().filter(|r| r.is_available) {
            reviewer.times_available += 1;
            if selected.contains(reviewer) {
                reviewer.times_selected += 1;
            }
        }
        self.total_selections += selected.len() as u64;
    }

    /// Fairness metrics for every reviewer, in pool order.
    #[must_use]
    pub fn fairness_summary(&self) -> Vec<FairnessStats> {
        let total_availability: u64 = self
            .reviewers
            .iter()
            .map(|r| r.times_available)
            .sum();

        self.reviewers
            .iter()
            .map(|r| {
                let (expected, deficit, rate) = if r.times_available > 0 {
                    let expected = self.expected_selections(r, total_availability);
                    let deficit = expected - r.times_selected as f64;
                    let rate = r.times_selected as f64 / r.times_available as f64;
                    (expected, deficit, rate)
                } else {
                    (0.0, 0.0, 0.0)
                };

                FairnessStats {
                    name: r.name.clone(),
                    times_selected: r.times_selected,
                    times_available: r.times_available,
                    expected_selections: round_to(expected, 2),
                    deficit: round_to(deficit, 2),
                    selection_rate: round_to(rate, 3),
                    current_weight: round_to((1.0 + deficit).max(MIN_WEIGHT), 2),
                }
            })
            .collect()
    }

    /// Clears all selection statistics.
    pub fn reset_stats(&mut self) {
        for reviewer in &mut self.reviewers {
            reviewer.times_selected = 0;
            reviewer.times_available = 0;
        }
        self.total_selections = 0;
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
