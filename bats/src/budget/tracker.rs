//! Per-resource allowance (used / total) with derived remaining counts and tiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BudgetTier, TierThresholds};

/// Refused charge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("budget exhausted for resource: {0}")]
    Exhausted(String),
    #[error("resource not tracked: {0}")]
    UnknownResource(String),
}

/// Allowance for one resource. `used <= total` is upheld by `BudgetTracker::charge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBudget {
    pub used: u32,
    pub total: u32,
}

impl ResourceBudget {
    pub fn new(total: u32) -> Self {
        Self { used: 0, total }
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }

    /// Remaining share of the total; a zero total counts as fully spent.
    pub fn remaining_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.remaining()) / f64::from(self.total)
        }
    }
}

/// Authoritative record of remaining allowance per resource kind.
///
/// Ordered by resource name so prompts and logs render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetTracker {
    resources: BTreeMap<String, ResourceBudget>,
}

impl BudgetTracker {
    /// Tracker with every resource at `used = 0`.
    pub fn from_totals<I, K>(totals: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<String>,
    {
        Self {
            resources: totals
                .into_iter()
                .map(|(k, total)| (k.into(), ResourceBudget::new(total)))
                .collect(),
        }
    }

    pub fn get(&self, resource: &str) -> Option<&ResourceBudget> {
        self.resources.get(resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourceBudget)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_tracked(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// `total - used` for the resource; 0 for an untracked resource.
    pub fn remaining(&self, resource: &str) -> u32 {
        self.resources.get(resource).map_or(0, ResourceBudget::remaining)
    }

    /// True when no tracked resource has anything left (also for an empty tracker).
    pub fn all_exhausted(&self) -> bool {
        self.resources.values().all(|b| b.remaining() == 0)
    }

    pub fn classify_resource(&self, resource: &str, thresholds: &TierThresholds) -> BudgetTier {
        self.resources
            .get(resource)
            .map_or(BudgetTier::Critical, |b| thresholds.tier_for(b.remaining_fraction()))
    }

    /// Overall tier: the most constrained resource wins.
    ///
    /// Resources granted nothing (`total == 0`) take no part, so `browse: 0/0` next to
    /// `search: 3/3` is HIGH. With no funded resource at all the tier is CRITICAL.
    pub fn classify(&self, thresholds: &TierThresholds) -> BudgetTier {
        self.resources
            .values()
            .filter(|b| b.total > 0)
            .map(|b| thresholds.tier_for(b.remaining_fraction()))
            .min()
            .unwrap_or(BudgetTier::Critical)
    }

    /// Human-readable status for prompts, e.g. `browse: 2/2 remaining, search: 1/3 remaining`.
    pub fn status_line(&self) -> String {
        if self.resources.is_empty() {
            return "no tool budget".to_string();
        }
        self.resources
            .iter()
            .map(|(name, b)| format!("{}: {}/{} remaining", name, b.remaining(), b.total))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Spends one unit of `resource`. Refuses without change when nothing remains.
    pub(crate) fn charge(&mut self, resource: &str) -> Result<(), BudgetError> {
        let budget = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| BudgetError::UnknownResource(resource.to_string()))?;
        if budget.remaining() == 0 {
            return Err(BudgetError::Exhausted(resource.to_string()));
        }
        budget.used += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(search: u32, browse: u32) -> BudgetTracker {
        BudgetTracker::from_totals([("search", search), ("browse", browse)])
    }

    #[test]
    fn remaining_starts_at_total_and_unknown_is_zero() {
        let t = tracker(3, 2);
        assert_eq!(t.remaining("search"), 3);
        assert_eq!(t.remaining("browse"), 2);
        assert_eq!(t.remaining("weather"), 0);
    }

    #[test]
    fn charge_never_exceeds_total() {
        let mut t = tracker(1, 0);
        assert!(t.charge("search").is_ok());
        assert_eq!(
            t.charge("search"),
            Err(BudgetError::Exhausted("search".into()))
        );
        assert_eq!(t.get("search").unwrap().used, 1);
        assert_eq!(
            t.charge("browse"),
            Err(BudgetError::Exhausted("browse".into()))
        );
        assert_eq!(t.get("browse").unwrap().used, 0);
        assert!(matches!(
            t.charge("nope"),
            Err(BudgetError::UnknownResource(_))
        ));
    }

    #[test]
    fn classify_uses_most_constrained_resource() {
        let th = TierThresholds::default();
        let mut t = tracker(10, 10);
        assert_eq!(t.classify(&th), BudgetTier::High);
        for _ in 0..8 {
            t.charge("browse").unwrap();
        }
        // search 100%, browse 20%
        assert_eq!(t.classify_resource("search", &th), BudgetTier::High);
        assert_eq!(t.classify_resource("browse", &th), BudgetTier::Low);
        assert_eq!(t.classify(&th), BudgetTier::Low);
        t.charge("browse").unwrap();
        t.charge("browse").unwrap();
        assert_eq!(t.classify(&th), BudgetTier::Critical);
    }

    #[test]
    fn zero_budget_is_critical_and_exhausted() {
        let th = TierThresholds::default();
        let t = tracker(0, 0);
        assert_eq!(t.classify(&th), BudgetTier::Critical);
        assert!(t.all_exhausted());
        assert_eq!(BudgetTracker::default().classify(&th), BudgetTier::Critical);
    }

    #[test]
    fn unfunded_resource_does_not_drag_tier_down() {
        let th = TierThresholds::default();
        let mut t = tracker(3, 0);
        assert_eq!(t.classify(&th), BudgetTier::High);
        assert_eq!(t.classify_resource("browse", &th), BudgetTier::Critical);
        assert!(!t.all_exhausted());
        t.charge("search").unwrap();
        assert_eq!(t.classify(&th), BudgetTier::Medium);
        t.charge("search").unwrap();
        t.charge("search").unwrap();
        assert_eq!(t.classify(&th), BudgetTier::Critical);
        assert!(t.all_exhausted());
    }

    #[test]
    fn custom_thresholds_shift_tiers() {
        let th = TierThresholds::new(0.9, 0.5, 0.2).unwrap();
        let mut t = tracker(10, 10);
        t.charge("search").unwrap();
        t.charge("search").unwrap();
        assert_eq!(t.classify(&th), BudgetTier::Medium);
    }

    #[test]
    fn status_line_lists_resources_in_order() {
        let mut t = tracker(3, 2);
        t.charge("search").unwrap();
        assert_eq!(
            t.status_line(),
            "browse: 2/2 remaining, search: 2/3 remaining"
        );
    }

    #[test]
    fn serializes_as_plain_map() {
        let t = tracker(3, 2);
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["search"]["total"], 3);
        assert_eq!(v["browse"]["used"], 0);
    }
}
