//! Explicit configuration for one `ResearchRunner`.
//!
//! Built once (defaults, `from_env`, CLI flags) and shared read-only by every node.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `BATS_SEARCH_BUDGET` | default `search` total | 3 |
//! | `BATS_BROWSE_BUDGET` | default `browse` total | 2 |
//! | `BATS_BUDGET` | extra default totals, `name=total,...` | |
//! | `BATS_MAX_ATTEMPTS` | default attempt limit | 2 |
//! | `BATS_RECURSION_LIMIT` | node executions per session | 50 |
//! | `BATS_PIVOT` | `reset` or `revise` | `revise` |
//! | `BATS_TIER_HIGH` / `_MEDIUM` / `_LOW` | tier thresholds | 0.7 / 0.3 / 0.1 |
//! | `BATS_TOOL_COST` | cost per tool call | 0.001 |
//! | `BATS_TOOL_COSTS` | per-resource cost, `name=cost,...` | |
//! | `BATS_LLM_COST_PER_1K` | cost per 1K LLM tokens | 0 |
//! | `BATS_FAILURE_LIMIT` | consecutive failed tool results before a dead end | 2 |
//! | `BATS_STALL_LIMIT` | verifications without progress before a pivot | 2 |
//! | `BATS_MIN_CONFIDENCE` | finalizer confidence floor | 0 |
//! | `BATS_LLM_RETRIES` / `BATS_TOOL_RETRIES` | retries after the first try, at most 5 | 2 |
//! | `PROMPTS_DIR` | directory with prompt YAML overrides | embedded |

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::budget::{BudgetTracker, TierThresholds, TierThresholdsError};
use crate::prompts::{self, LoadError, ResearchPrompts};
use crate::retry::RetryPolicy;

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Thresholds(#[from] TierThresholdsError),
    #[error(transparent)]
    Prompts(#[from] LoadError),
}

impl ConfigError {
    fn invalid(var: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var: var.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// What a PIVOT does to the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PivotMode {
    /// Abandon open steps, open a new `Attempt N` section, drop the candidate answer.
    Reset,
    /// Mark open steps partial and append the verifier's advice as a new step.
    #[default]
    Revise,
}

impl FromStr for PivotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reset" | "full-reset" => Ok(PivotMode::Reset),
            "revise" | "incremental" => Ok(PivotMode::Revise),
            other => Err(format!("expected reset or revise, got {:?}", other)),
        }
    }
}

impl fmt::Display for PivotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PivotMode::Reset => "reset",
            PivotMode::Revise => "revise",
        })
    }
}

/// Unified cost metric: per-call tool cost plus optional LLM token cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTable {
    pub default_tool_cost: f64,
    pub per_resource: BTreeMap<String, f64>,
    pub llm_cost_per_1k_tokens: f64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            default_tool_cost: 0.001,
            per_resource: BTreeMap::new(),
            llm_cost_per_1k_tokens: 0.0,
        }
    }
}

impl CostTable {
    /// Cost of one call charged against `resource`.
    pub fn tool_cost(&self, resource: &str) -> f64 {
        self.per_resource
            .get(resource)
            .copied()
            .unwrap_or(self.default_tool_cost)
    }

    pub fn with_resource_cost(mut self, resource: impl Into<String>, cost: f64) -> Self {
        self.per_resource.insert(resource.into(), cost);
        self
    }
}

/// Runner configuration. See the module docs for the environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub thresholds: TierThresholds,
    /// Budget used when a request does not carry one.
    pub default_budget: BTreeMap<String, u32>,
    pub max_attempts: u32,
    pub recursion_limit: usize,
    pub pivot_mode: PivotMode,
    pub costs: CostTable,
    /// Refused/failed tool results in a row that count as a dead end.
    pub consecutive_failure_limit: usize,
    /// CONTINUE verdicts without new tool results before a forced PIVOT.
    pub stall_limit: u32,
    /// Finalizer answers below this confidence become the sentinel.
    pub min_confidence: f64,
    pub llm_retry: RetryPolicy,
    pub tool_retry: RetryPolicy,
    pub prompts: ResearchPrompts,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            default_budget: [("search".to_string(), 3), ("browse".to_string(), 2)]
                .into_iter()
                .collect(),
            max_attempts: 2,
            recursion_limit: crate::graph::DEFAULT_RECURSION_LIMIT,
            pivot_mode: PivotMode::default(),
            costs: CostTable::default(),
            consecutive_failure_limit: 2,
            stall_limit: 2,
            min_confidence: 0.0,
            llm_retry: RetryPolicy::standard(),
            tool_retry: RetryPolicy::standard(),
            prompts: prompts::default_from_embedded(),
        }
    }
}

fn parse_var<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(var, value, e.to_string()))
}

/// Parses `name=value,name=value`.
fn parse_pairs<T: FromStr>(var: &str, value: &str) -> Result<Vec<(String, T)>, ConfigError>
where
    T::Err: fmt::Display,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (name, v) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::invalid(var, value, "expected name=value"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::invalid(var, value, "empty resource name"));
            }
            Ok((name.to_string(), parse_var(var, v)?))
        })
        .collect()
}

/// Upper bound for `BATS_LLM_RETRIES` / `BATS_TOOL_RETRIES`.
pub const MAX_RETRIES: usize = 5;

/// A cost: finite and not negative.
fn parse_cost(var: &str, value: &str) -> Result<f64, ConfigError> {
    let cost: f64 = parse_var(var, value)?;
    if !cost.is_finite() || cost < 0.0 {
        return Err(ConfigError::invalid(var, value, "must be a finite number >= 0"));
    }
    Ok(cost)
}

fn parse_retries(var: &str, value: &str) -> Result<usize, ConfigError> {
    let retries: usize = parse_var(var, value)?;
    if retries > MAX_RETRIES {
        return Err(ConfigError::invalid(
            var,
            value,
            format!("at most {} retries", MAX_RETRIES),
        ));
    }
    Ok(retries)
}

fn standard_retry(retries: usize) -> RetryPolicy {
    if retries == 0 {
        RetryPolicy::none()
    } else {
        RetryPolicy::exponential(retries, Duration::from_secs(1), Duration::from_secs(10), 2.0)
    }
}

impl AgentConfig {
    /// Defaults overridden by `BATS_*` variables (and `PROMPTS_DIR`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BATS_SEARCH_BUDGET") {
            cfg.default_budget
                .insert("search".into(), parse_var("BATS_SEARCH_BUDGET", &v)?);
        }
        if let Some(v) = get("BATS_BROWSE_BUDGET") {
            cfg.default_budget
                .insert("browse".into(), parse_var("BATS_BROWSE_BUDGET", &v)?);
        }
        if let Some(v) = get("BATS_BUDGET") {
            cfg.default_budget.extend(parse_pairs::<u32>("BATS_BUDGET", &v)?);
        }
        if let Some(v) = get("BATS_MAX_ATTEMPTS") {
            cfg.max_attempts = parse_var("BATS_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("BATS_RECURSION_LIMIT") {
            cfg.recursion_limit = parse_var("BATS_RECURSION_LIMIT", &v)?;
            if cfg.recursion_limit == 0 {
                return Err(ConfigError::invalid("BATS_RECURSION_LIMIT", &v, "must be at least 1"));
            }
        }
        if let Some(v) = get("BATS_PIVOT") {
            cfg.pivot_mode = parse_var("BATS_PIVOT", &v)?;
        }

        let mut thresholds = cfg.thresholds;
        if let Some(v) = get("BATS_TIER_HIGH") {
            thresholds.high = parse_var("BATS_TIER_HIGH", &v)?;
        }
        if let Some(v) = get("BATS_TIER_MEDIUM") {
            thresholds.medium = parse_var("BATS_TIER_MEDIUM", &v)?;
        }
        if let Some(v) = get("BATS_TIER_LOW") {
            thresholds.low = parse_var("BATS_TIER_LOW", &v)?;
        }
        thresholds.validate()?;
        cfg.thresholds = thresholds;

        if let Some(v) = get("BATS_TOOL_COST") {
            cfg.costs.default_tool_cost = parse_cost("BATS_TOOL_COST", &v)?;
        }
        if let Some(v) = get("BATS_TOOL_COSTS") {
            for (resource, cost) in parse_pairs::<f64>("BATS_TOOL_COSTS", &v)? {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(ConfigError::invalid(
                        "BATS_TOOL_COSTS",
                        &v,
                        format!("cost for {} must be a finite number >= 0", resource),
                    ));
                }
                cfg.costs.per_resource.insert(resource, cost);
            }
        }
        if let Some(v) = get("BATS_LLM_COST_PER_1K") {
            cfg.costs.llm_cost_per_1k_tokens = parse_cost("BATS_LLM_COST_PER_1K", &v)?;
        }
        if let Some(v) = get("BATS_FAILURE_LIMIT") {
            cfg.consecutive_failure_limit = parse_var("BATS_FAILURE_LIMIT", &v)?;
        }
        if let Some(v) = get("BATS_STALL_LIMIT") {
            cfg.stall_limit = parse_var("BATS_STALL_LIMIT", &v)?;
        }
        if let Some(v) = get("BATS_MIN_CONFIDENCE") {
            let c: f64 = parse_var("BATS_MIN_CONFIDENCE", &v)?;
            if !(0.0..=1.0).contains(&c) {
                return Err(ConfigError::invalid("BATS_MIN_CONFIDENCE", &v, "must be within 0..=1"));
            }
            cfg.min_confidence = c;
        }
        if let Some(v) = get("BATS_LLM_RETRIES") {
            cfg.llm_retry = standard_retry(parse_retries("BATS_LLM_RETRIES", &v)?);
        }
        if let Some(v) = get("BATS_TOOL_RETRIES") {
            cfg.tool_retry = standard_retry(parse_retries("BATS_TOOL_RETRIES", &v)?);
        }
        if let Some(dir) = get("PROMPTS_DIR") {
            cfg.prompts = prompts::load(Some(Path::new(&dir)))?;
        }
        Ok(cfg)
    }

    /// Fresh tracker over the default budget.
    pub fn default_tracker(&self) -> BudgetTracker {
        BudgetTracker::from_totals(self.default_budget.iter().map(|(k, v)| (k.clone(), *v)))
    }

    pub fn with_pivot_mode(mut self, mode: PivotMode) -> Self {
        self.pivot_mode = mode;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Disables LLM and tool retries (tests, offline runs).
    pub fn without_retries(mut self) -> Self {
        self.llm_retry = RetryPolicy::none();
        self.tool_retry = RetryPolicy::none();
        self
    }
}
