//! Runtime collection of named pools built from the configuration file.

use thiserror::Error;

use super::{ReviewerPool, SelectionError};
use crate::config::{PoolConfig, PoolsConfig};

/// Errors from pool lookups and membership changes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    #[error("Unknown pool: '{0}'")]
    UnknownPool(String),

    #[error("No reviewer matching '{0}'")]
    UnknownReviewer(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// All pools, in the order the configuration file lists them.
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    pools: Vec<ReviewerPool>,
    default_pool: String,
}

impl PoolRegistry {
    /// Builds the registry from a validated configuration.
    #[must_use]
    pub fn from_config(config: &PoolsConfig) -> Self {
        let pools = config
            .pools
            .iter()
            .map(|p| {
                let mut pool = ReviewerPool::new(p.name.clone());
                for reviewer in &p.reviewers {
                    pool.add_reviewer(reviewer.clone());
                }
                pool
            })
            .collect();

        Self {
            pools,
            default_pool: config.default_pool.to_lowercase(),
        }
    }

    /// Converts membership and availability back into a configuration.
    ///
    /// Selection statistics are not part of the file.
    #[must_use]
    pub fn to_config(&self) -> PoolsConfig {
        PoolsConfig {
            default_pool: self
                .get(None)
                .map_or_else(|_| self.default_pool.clone(), |p| p.name().to_owned()),
            pools: self
                .pools
                .iter()
                .map(|p| PoolConfig::new(p.name(), p.reviewers().to_vec()))
                .collect(),
        }
    }

    /// Name of the default pool.
    #[must_use]
    pub fn default_pool(&self) -> &str {
        &self.default_pool
    }

    /// Pools in file order.
    pub fn pools(&self) -> impl Iterator<Item = &ReviewerPool> {
        self.pools.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Resolves a pool name, ignoring case and falling back to the default pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::UnknownPool`] if the name is not configured.
    pub fn get(&self, name: Option<&str>) -> Result<&ReviewerPool, PoolError> {
        let name = name.unwrap_or(&self.default_pool);
        self.pools
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| PoolError::UnknownPool(name.to_lowercase()))
    }

    /// Mutable variant of [`PoolRegistry::get`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::UnknownPool`] if the name is not configured.
    pub fn get_mut(&mut self, name: Option<&str>) -> Result<&mut ReviewerPool, PoolError> {
        let name = name.unwrap_or(&self.default_pool);
        self.pools
            .iter_mut()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| PoolError::UnknownPool(name.to_lowercase()))
    }

    /// Sets availability of a member.
    ///
    /// Without a pool name the change applies to every pool that contains
    /// the member. Returns the names of the pools that were changed.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::UnknownPool`] for an unknown pool name and
    /// [`PoolError::UnknownReviewer`] if no pool contains the member.
    pub fn set_available(
        &mut self,
        member: &str,
        pool: Option<&str>,
        available: bool,
    ) -> Result<Vec<String>, PoolError> {
        let changed: Vec<String> = match pool {
            Some(name) => {
                let pool = self.get_mut(Some(name))?;
                if pool.set_available(member, available) {
                    vec![pool.name().to_owned()]
                } else {
                    Vec::new()
                }
            }
            None => self
                .pools
                .iter_mut()
                .filter_map(|p| p.set_available(member, available).then(|| p.name().to_owned()))
                .collect(),
        };

        if changed.is_empty() {
            return Err(PoolError::UnknownReviewer(member.to_owned()));
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Reviewer;

    fn registry() -> PoolRegistry {
        let mut config = PoolsConfig::example();
        config.pools[1]
            .reviewers
            .push(Reviewer::new("U01ALICE", "alice"));
        PoolRegistry::from_config(&config)
    }

    #[test]
    fn test_default_pool_lookup() {
        let registry = registry();
        assert_eq!(registry.get(None).unwrap().name(), "backend");
        assert_eq!(registry.get(Some("FRONTEND")).unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_pool() {
        let registry = registry();
        assert_eq!(
            registry.get(Some("mobile")).unwrap_err(),
            PoolError::UnknownPool("mobile".to_owned())
        );
    }

    #[test]
    fn test_set_available_all_pools() {
        let mut registry = registry();
        let changed = registry.set_available("alice", None, false).unwrap();
        assert_eq!(changed, vec!["backend".to_owned(), "frontend".to_owned()]);
        assert!(!registry.get(Some("frontend")).unwrap().find("alice").unwrap().is_available);
    }

    #[test]
    fn test_set_available_single_pool() {
        let mut registry = registry();
        registry.set_available("alice", Some("frontend"), false).unwrap();
        assert!(registry.get(None).unwrap().find("alice").unwrap().is_available);
    }

    #[test]
    fn test_set_available_unknown_member() {
        let mut registry = registry();
        assert_eq!(
            registry.set_available("zoe", None, false),
            Err(PoolError::UnknownReviewer("zoe".to_owned()))
        );
    }

    #[test]
    fn test_round_trip_keeps_membership() {
        let mut registry = registry();
        registry
            .get_mut(Some("backend"))
            .unwrap()
            .add_reviewer(Reviewer::new("U09ZED", "zed"));

        let config = registry.to_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_pool, "backend");
        assert_eq!(config.get("backend").unwrap().reviewers.len(), 4);
    }

    #[test]
    fn test_to_config_keeps_file_order() {
        let mut config = PoolsConfig::example();
        config.pools.reverse();
        let mut registry = PoolRegistry::from_config(&config);
        registry.set_available("dave", None, false).unwrap();

        let names: Vec<String> = registry
            .to_config()
            .pools
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["frontend".to_owned(), "backend".to_owned()]);

        let listed: Vec<&str> = registry.pools().map(ReviewerPool::name).collect();
        assert_eq!(listed, vec!["frontend", "backend"]);
    }
}
