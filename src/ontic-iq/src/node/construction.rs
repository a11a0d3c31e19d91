//! Construction node.

use std::collections::BTreeSet;
use std::fmt;

use common_error::{OnticError, OnticResult};
use ontic_core::{Substitution, Term, Variable};
use serde::{Deserialize, Serialize};

use super::write_variables;

/// Projects an ordered list of variables; the substitution defines the
/// variables computed from the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionNode {
    projection: Vec<Variable>,
    substitution: Substitution,
}

impl ConstructionNode {
    /// Create a construction node.
    ///
    /// The projection must not repeat a variable and the substitution may
    /// only bind projected variables.
    pub fn new(projection: Vec<Variable>, substitution: Substitution) -> OnticResult<Self> {
        let projected: BTreeSet<&Variable> = projection.iter().collect();
        if projected.len() != projection.len() {
            return Err(OnticError::invalid_query(
                "construction node projects a variable twice",
            ));
        }
        if let Some(v) = substitution.domain().iter().find(|v| !projected.contains(v)) {
            return Err(OnticError::invalid_query(format!(
                "construction node binds {v} which it does not project"
            )));
        }
        Ok(Self {
            projection,
            substitution,
        })
    }

    /// A pure projection.
    pub fn projecting(projection: Vec<Variable>) -> OnticResult<Self> {
        Self::new(projection, Substitution::new())
    }

    /// The projected variables, in order.
    pub fn projection(&self) -> &[Variable] {
        &self.projection
    }

    /// The projected variables as a set.
    pub fn projected_variables(&self) -> BTreeSet<Variable> {
        self.projection.iter().cloned().collect()
    }

    /// Bindings of computed output variables.
    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// The term defining `variable` in terms of the child's output.
    pub fn definition(&self, variable: &Variable) -> Term {
        self.substitution.apply_to_variable(variable)
    }

    /// Variables the child must project.
    pub fn child_variables(&self) -> BTreeSet<Variable> {
        let mut vars: BTreeSet<Variable> = self
            .projection
            .iter()
            .filter(|v| self.substitution.get(v).is_none())
            .cloned()
            .collect();
        vars.extend(self.substitution.range_variables());
        vars
    }
}

impl fmt::Display for ConstructionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONSTRUCT ")?;
        write_variables(f, &self.projection)?;
        if !self.substitution.is_empty() {
            write!(f, " {}", self.substitution)?;
        }
        Ok(())
    }
}
