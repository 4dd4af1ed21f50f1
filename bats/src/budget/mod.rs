//! Budget tracking: per-resource allowances and coarse tier classification.
//!
//! `BudgetTracker` is pure data. It is read by every component and charged only
//! by the tool invoker (`ActNode`).

mod tier;
mod tracker;

pub use tier::{BudgetTier, TierThresholds, TierThresholdsError};
pub use tracker::{BudgetError, BudgetTracker, ResourceBudget};
