//! Union node.

use std::collections::BTreeSet;
use std::fmt;

use ontic_core::Variable;
use serde::{Deserialize, Serialize};

use super::write_variables;

/// Union of children that all project exactly the same variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionNode {
    projected: BTreeSet<Variable>,
}

impl UnionNode {
    /// Create a union projecting the given variables.
    pub fn new(projected: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            projected: projected.into_iter().collect(),
        }
    }

    /// The projected variables.
    pub fn projected_variables(&self) -> &BTreeSet<Variable> {
        &self.projected
    }
}

impl fmt::Display for UnionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UNION ")?;
        write_variables(f, &self.projected)
    }
}
