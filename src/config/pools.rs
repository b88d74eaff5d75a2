//! Reviewer pools configuration file.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::Reviewer;

/// Errors that can occur while loading or validating the pools file.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No pools configured")]
    NoPools,

    #[error("Pool at index {index} has an empty name")]
    EmptyPoolName { index: usize },

    #[error("Duplicate pool name found: {name}")]
    DuplicatePool { name: String },

    #[error("Pool '{pool}' lists reviewer '{slack_id}' more than once")]
    DuplicateReviewer { pool: String, slack_id: String },

    #[error("Pool '{pool}' has a reviewer with an empty slack_id")]
    EmptyReviewerId { pool: String },

    #[error("Default pool '{name}' is not defined")]
    UnknownDefaultPool { name: String },

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A named pool as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool name used in commands (`pick from <name>`).
    pub name: String,

    /// Reviewers in this pool.
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
}

impl PoolConfig {
    /// Creates a pool entry.
    #[must_use]
    pub fn new(name: impl Into<String>, reviewers: Vec<Reviewer>) -> Self {
        Self {
            name: name.into(),
            reviewers,
        }
    }
}

/// Configuration containing all reviewer pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Pool used when a command does not name one.
    pub default_pool: String,

    /// All configured pools.
    pub pools: Vec<PoolConfig>,
}

impl PoolsConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_all().into_iter().next().map_or(Ok(()), Err)
    }

    /// Returns every validation problem found, in file order.
    #[must_use]
    pub fn validate_all(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.pools.is_empty() {
            errors.push(ValidationError::NoPools);
            return errors;
        }

        let mut seen_pools = HashSet::new();

        for (index, pool) in self.pools.iter().enumerate() {
            if pool.name.trim().is_empty() {
                errors.push(ValidationError::EmptyPoolName { index });
                continue;
            }

            if !seen_pools.insert(pool.name.to_lowercase()) {
                errors.push(ValidationError::DuplicatePool {
                    name: pool.name.clone(),
                });
                continue;
            }

            let mut seen_ids = HashSet::new();
            for reviewer in &pool.reviewers {
                if reviewer.slack_id.is_empty() {
                    errors.push(ValidationError::EmptyReviewerId {
                        pool: pool.name.clone(),
                    });
                } else if !seen_ids.insert(&reviewer.slack_id) {
                    errors.push(ValidationError::DuplicateReviewer {
                        pool: pool.name.clone(),
                        slack_id: reviewer.slack_id.clone(),
                    });
                }
            }
        }

        if self.get(&self.default_pool).is_none() {
            errors.push(ValidationError::UnknownDefaultPool {
                name: self.default_pool.clone(),
            });
        }

        errors
    }

    /// Gets a pool by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns the number of pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Checks if there are no pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Total reviewers across all pools.
    #[must_use]
    pub fn reviewer_count(&self) -> usize {
        self.pools.iter().map(|p| p.reviewers.len()).sum()
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            default_pool: "backend".to_owned(),
            pools: vec![
                PoolConfig::new(
                    "backend",
                    vec![
                        Reviewer::new("U01ALICE", "alice"),
                        Reviewer::new("U02BOB", "bob"),
                        Reviewer::new("U03CAROL", "carol"),
                    ],
                ),
                PoolConfig::new(
                    "frontend",
                    vec![
                        Reviewer::new("U04DAVE", "dave"),
                        Reviewer::new("U05ERIN", "erin"),
                    ],
                ),
            ],
        }
    }
}
