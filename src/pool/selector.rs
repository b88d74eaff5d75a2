//! Random selection primitives.
//!
//! The [`Selector`] owns the random source. It can be seeded so that a
//! sequence of picks can be replayed when a selection needs auditing.

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Errors that can occur while drawing from a pool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("The reviewer pool is empty")]
    EmptyPool,

    #[error("Not enough reviewers available. Requested: {requested}, Available: {available}")]
    NotEnough { requested: usize, available: usize },

    #[error("Invalid selection weights: {0}")]
    InvalidWeights(String),
}

/// Source of randomness for reviewer selection.
#[derive(Debug)]
pub struct Selector {
    rng: StdRng,
    seed: Option<u64>,
}

impl Selector {
    /// Creates a selector seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            seed: None,
        }
    }

    /// Creates a selector whose picks are reproducible for a given seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Creates a seeded selector if a seed is given, otherwise an entropy one.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Returns the seed, if this selector is reproducible.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Picks one candidate with uniform probability.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyPool`] if `pool` is empty.
    pub fn choose<'a, T>(&mut self, pool: &'a [T]) -> Result<&'a T, SelectionError> {
        if pool.is_empty() {
            return Err(SelectionError::EmptyPool);
        }
        let index = self.rng.random_range(0..pool.len());
        Ok(&pool[index])
    }

    /// Picks `count` distinct candidates with uniform probability.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyPool`] if `pool` is empty, or
    /// [`SelectionError::NotEnough`] if `count` exceeds the pool size.
    pub fn choose_many<'a, T>(
        &mut self,
        pool: &'a [T],
        count: usize,
    ) -> Result<Vec<&'a T>, SelectionError> {
        if pool.is_empty() {
            return Err(SelectionError::EmptyPool);
        }
        if count > pool.len() {
            return Err(SelectionError::NotEnough {
                requested: count,
                available: pool.len(),
            });
        }

        let picked = rand::seq::index::sample(&mut self.rng, pool.len(), count);
        Ok(picked.into_iter().map(|i| &pool[i]).collect())
    }

    /// Draws `count` distinct indices, each round proportional to the
    /// remaining weights.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyPool`] for an empty slice,
    /// [`SelectionError::NotEnough`] if `count` exceeds its length, and
    /// [`SelectionError::InvalidWeights`] for negative, non-finite or
    /// all-zero weights.
    pub fn choose_weighted(
        &mut self,
        weights: &[f64],
        count: usize,
    ) -> Result<Vec<usize>, SelectionError> {
        if weights.is_empty() {
            return Err(SelectionError::EmptyPool);
        }
        if count > weights.len() {
            return Err(SelectionError::NotEnough {
                requested: count,
                available: weights.len(),
            });
        }

        let mut remaining: Vec<usize> = (0..weights.len()).collect();
        let mut picked = Vec::with_capacity(count);

        while picked.len() < count {
            let dist = WeightedIndex::new(remaining.iter().map(|&i| weights[i]))
                .map_err(|e| SelectionError::InvalidWeights(e.to_string()))?;
            let slot = dist.sample(&mut self.rng);
            picked.push(remaining.swap_remove(slot));
        }

        Ok(picked)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[test]
    fn test_choose_empty_pool() {
        let mut selector = Selector::seeded(1);
        let pool: Vec<&str> = vec![];
        for _ in 0..10 {
            assert_eq!(selector.choose(&pool), Err(SelectionError::EmptyPool));
        }
    }

    #[test]
    fn test_choose_single_member() {
        let mut selector = Selector::seeded(7);
        let pool = ["alice"];
        for _ in 0..50 {
            assert_eq!(*selector.choose(&pool).unwrap(), "alice");
        }
    }

    #[test]
    fn test_choose_returns_member() {
        let mut selector = Selector::from_entropy();
        let pool = ["alice", "bob", "carol"];
        for _ in 0..100 {
            assert!(pool.contains(selector.choose(&pool).unwrap()));
        }
    }

    #[test]
    fn test_choose_uniform_frequency() {
        let mut selector = Selector::seeded(42);
        let pool = ["alice", "bob", "carol", "dave"];
        let trials = 20_000;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..trials {
            *counts.entry(*selector.choose(&pool).unwrap()).or_default() += 1;
        }

        for name in pool {
            let freq = counts[name] as f64 / f64::from(trials);
            assert!((freq - 0.25).abs() < 0.02, "{name}: {freq}");
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let pool = ["a", "b", "c", "d", "e", "f"];
        let mut first = Selector::seeded(99);
        let mut second = Selector::seeded(99);

        let a: Vec<_> = (0..30).map(|_| *first.choose(&pool).unwrap()).collect();
        let b: Vec<_> = (0..30).map(|_| *second.choose(&pool).unwrap()).collect();
        assert_eq!(a, b);
        assert_eq!(first.seed(), Some(99));
    }

    #[test]
    fn test_choose_many_distinct() {
        let mut selector = Selector::seeded(3);
        let pool = ["a", "b", "c", "d", "e"];
        for _ in 0..50 {
            let picked = selector.choose_many(&pool, 3).unwrap();
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_choose_many_not_enough() {
        let mut selector = Selector::seeded(3);
        assert_eq!(
            selector.choose_many(&["a", "b"], 3),
            Err(SelectionError::NotEnough {
                requested: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_choose_weighted_prefers_heavy() {
        let mut selector = Selector::seeded(11);
        let weights = [0.1, 10.0];
        let heavy = (0..1000)
            .filter(|_| selector.choose_weighted(&weights, 1).unwrap()[0] == 1)
            .count();
        assert!(heavy > 900);
    }

    #[test]
    fn test_choose_weighted_all_picks_distinct() {
        let mut selector = Selector::seeded(5);
        let mut picked = selector.choose_weighted(&[1.0, 2.0, 3.0], 3).unwrap();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2]);
    }

    #[test]
    fn test_choose_weighted_invalid() {
        let mut selector = Selector::seeded(5);
        assert!(matches!(
            selector.choose_weighted(&[0.0, 0.0], 1),
            Err(SelectionError::InvalidWeights(_))
        ));
    }
}
