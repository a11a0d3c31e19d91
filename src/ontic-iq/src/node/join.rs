//! Join nodes.

use std::fmt;

use ontic_core::ImmutableExpression;
use serde::{Deserialize, Serialize};

/// Commutative n-ary join on shared variables with an optional condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerJoinNode {
    condition: Option<ImmutableExpression>,
}

impl InnerJoinNode {
    /// Create an inner join.
    pub fn new(condition: Option<ImmutableExpression>) -> Self {
        Self { condition }
    }

    /// The join condition.
    pub fn condition(&self) -> Option<&ImmutableExpression> {
        self.condition.as_ref()
    }
}

impl fmt::Display for InnerJoinNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JOIN")?;
        if let Some(c) = &self.condition {
            write!(f, " {c}")?;
        }
        Ok(())
    }
}

/// Left outer join. The first child is the LEFT argument, the second the
/// RIGHT one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeftJoinNode {
    condition: Option<ImmutableExpression>,
}

impl LeftJoinNode {
    /// Create a left join.
    pub fn new(condition: Option<ImmutableExpression>) -> Self {
        Self { condition }
    }

    /// The join condition.
    pub fn condition(&self) -> Option<&ImmutableExpression> {
        self.condition.as_ref()
    }
}

impl fmt::Display for LeftJoinNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LJ")?;
        if let Some(c) = &self.condition {
            write!(f, " {c}")?;
        }
        Ok(())
    }
}
