//! Reviewer pools and selection.
//!
//! Ad-hoc lists go straight through the uniform [`Selector`]; configured
//! pools use fair weights so reviewers who fell behind catch up over time.

mod audit;
mod registry;
mod reviewer;
mod roster;
mod selector;

pub use audit::{AuditLog, SelectionRecord, SelectionSource};
pub use registry::{PoolError, PoolRegistry};
pub use reviewer::Reviewer;
pub use roster::{FairnessStats, MIN_WEIGHT, ReviewerPool};
pub use selector::{SelectionError, Selector};
