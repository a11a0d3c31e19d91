//! Atoms: a predicate applied to terms.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use common_error::{OnticError, OnticResult};
use serde::{Deserialize, Serialize};

use crate::term::{write_comma_separated, Term, Variable};

/// A named predicate of fixed arity: a base relation or a derived query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationPredicate {
    name: Arc<str>,
    arity: usize,
}

impl RelationPredicate {
    /// Create a predicate.
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            arity,
        }
    }

    /// The predicate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for RelationPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A predicate applied to variables and constants, e.g. `R(m, n, 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataAtom {
    predicate: RelationPredicate,
    arguments: Vec<Term>,
}

impl DataAtom {
    /// Create a data atom. Arguments must be variables or constants and
    /// match the predicate arity.
    pub fn new(predicate: RelationPredicate, arguments: Vec<Term>) -> OnticResult<Self> {
        if arguments.len() != predicate.arity() {
            return Err(OnticError::invalid_parameter(format!(
                "{} has arity {}, got {} arguments",
                predicate,
                predicate.arity(),
                arguments.len()
            )));
        }
        if let Some(bad) = arguments
            .iter()
            .find(|a| !matches!(a, Term::Variable(_) | Term::Constant(_)))
        {
            return Err(OnticError::invalid_parameter(format!(
                "data atom argument {bad} is neither a variable nor a constant"
            )));
        }
        Ok(Self {
            predicate,
            arguments,
        })
    }

    /// The predicate.
    pub fn predicate(&self) -> &RelationPredicate {
        &self.predicate
    }

    /// The arguments, in column order.
    pub fn arguments(&self) -> &[Term] {
        &self.arguments
    }

    /// The argument at a 1-based column index.
    pub fn column(&self, index: usize) -> Option<&Term> {
        index.checked_sub(1).and_then(|i| self.arguments.get(i))
    }

    /// The variables occurring in the atom.
    pub fn variables(&self) -> BTreeSet<Variable> {
        self.arguments
            .iter()
            .filter_map(|a| a.as_variable().cloned())
            .collect()
    }
}

impl fmt::Display for DataAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        write_comma_separated(f, &self.arguments)?;
        write!(f, ")")
    }
}

/// Head of a query: a predicate over distinct variables, e.g. `ans1(m, n, o)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectionAtom {
    predicate: RelationPredicate,
    variables: Vec<Variable>,
}

impl ProjectionAtom {
    /// Create a projection atom over distinct variables.
    pub fn new(predicate: RelationPredicate, variables: Vec<Variable>) -> OnticResult<Self> {
        if variables.len() != predicate.arity() {
            return Err(OnticError::invalid_parameter(format!(
                "{} has arity {}, got {} variables",
                predicate,
                predicate.arity(),
                variables.len()
            )));
        }
        let distinct: BTreeSet<_> = variables.iter().collect();
        if distinct.len() != variables.len() {
            return Err(OnticError::invalid_parameter(format!(
                "projection atom {predicate} repeats a variable"
            )));
        }
        Ok(Self {
            predicate,
            variables,
        })
    }

    /// The predicate.
    pub fn predicate(&self) -> &RelationPredicate {
        &self.predicate
    }

    /// The projected variables, in order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

impl fmt::Display for ProjectionAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        write_comma_separated(f, &self.variables)?;
        write!(f, ")")
    }
}
