//! Configuration management for Ontic.
//!
//! Provides the knobs of the rewriting engine: fixpoint bounds, tracing and
//! which rewrite rules take part in optimization.

use common_error::OnticResult;
use serde::{Deserialize, Serialize};

/// Configuration of the fixpoint optimizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum number of full sweeps before the optimizer stops.
    pub max_iterations: usize,
    /// Record a before/after explanation for every accepted proposal.
    pub enable_trace: bool,
    /// Rules taking part in optimization.
    pub rules: RuleSetConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            enable_trace: false,
            rules: RuleSetConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Parse a (possibly partial) JSON document. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> OnticResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the maximum number of sweeps.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enable or disable tracing.
    #[must_use]
    pub fn with_trace(mut self, enable: bool) -> Self {
        self.enable_trace = enable;
        self
    }

    /// Replace the rule selection.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSetConfig) -> Self {
        self.rules = rules;
        self
    }
}

/// Selection of the rewrite rules, in their fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSetConfig {
    /// Evaluate filter and join conditions, pruning decisive ones.
    pub boolean_simplification: bool,
    /// Remove redundant self-joins over a unique key.
    pub self_join_elimination: bool,
    /// Remove join arguments made redundant by a foreign key.
    pub foreign_key_elimination: bool,
    /// Turn left joins that always match into inner joins.
    pub left_to_inner_join: bool,
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        Self::all()
    }
}

impl RuleSetConfig {
    /// Every rule enabled.
    pub const fn all() -> Self {
        Self {
            boolean_simplification: true,
            self_join_elimination: true,
            foreign_key_elimination: true,
            left_to_inner_join: true,
        }
    }

    /// Every rule disabled.
    pub const fn none() -> Self {
        Self {
            boolean_simplification: false,
            self_join_elimination: false,
            foreign_key_elimination: false,
            left_to_inner_join: false,
        }
    }
}
