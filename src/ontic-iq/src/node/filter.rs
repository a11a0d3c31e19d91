//! Filter node.

use std::fmt;

use ontic_core::ImmutableExpression;
use serde::{Deserialize, Serialize};

/// Keeps the rows of its child for which the condition is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNode {
    condition: ImmutableExpression,
}

impl FilterNode {
    /// Create a filter.
    pub fn new(condition: ImmutableExpression) -> Self {
        Self { condition }
    }

    /// The filtering condition.
    pub fn condition(&self) -> &ImmutableExpression {
        &self.condition
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FILTER {}", self.condition)
    }
}
