//! Budget tiers (HIGH / MEDIUM / LOW / CRITICAL) and the thresholds that define them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of remaining allowance, ordered from most to least constrained.
///
/// `Critical < Low < Medium < High`, so the overall tier of several resources is
/// their minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BudgetTier {
    Critical,
    Low,
    Medium,
    High,
}

impl BudgetTier {
    /// Strategy hint injected into the planner prompt.
    pub fn guidance(self) -> &'static str {
        match self {
            BudgetTier::High => {
                "Budget is HIGH. Explore broadly: issue several diverse queries, \
                 browse the most promising sources in depth, and branch into sub-questions."
            }
            BudgetTier::Medium => {
                "Budget is MEDIUM. Balance exploration and exploitation: follow the most \
                 promising leads and avoid redundant queries."
            }
            BudgetTier::Low => {
                "Budget is LOW. Use only targeted, high-precision actions that close a \
                 specific gap in the evidence."
            }
            BudgetTier::Critical => {
                "Budget is CRITICAL. Stop exploring. Answer only from evidence already \
                 gathered; if the evidence is insufficient, stop instead of guessing."
            }
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BudgetTier::High => "HIGH",
            BudgetTier::Medium => "MEDIUM",
            BudgetTier::Low => "LOW",
            BudgetTier::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Invalid threshold ordering.
#[derive(Debug, Error, PartialEq)]
#[error("tier thresholds must satisfy 0 < low < medium < high <= 1 (got high={high}, medium={medium}, low={low})")]
pub struct TierThresholdsError {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

/// Remaining-fraction lower bounds for each tier. Defaults: 0.70 / 0.30 / 0.10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 0.70,
            medium: 0.30,
            low: 0.10,
        }
    }
}

impl TierThresholds {
    /// Builds thresholds, rejecting any ordering other than `0 < low < medium < high <= 1`.
    pub fn new(high: f64, medium: f64, low: f64) -> Result<Self, TierThresholdsError> {
        let t = Self { high, medium, low };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<(), TierThresholdsError> {
        let ok = 0.0 < self.low && self.low < self.medium && self.medium < self.high && self.high <= 1.0;
        if ok {
            Ok(())
        } else {
            Err(TierThresholdsError {
                high: self.high,
                medium: self.medium,
                low: self.low,
            })
        }
    }

    /// Tier for a single remaining fraction in `[0, 1]`.
    pub fn tier_for(&self, remaining_fraction: f64) -> BudgetTier {
        if remaining_fraction >= self.high {
            BudgetTier::High
        } else if remaining_fraction >= self.medium {
            BudgetTier::Medium
        } else if remaining_fraction >= self.low {
            BudgetTier::Low
        } else {
            BudgetTier::Critical
        }
    }
}
