//! Variable substitutions and term unification.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::atom::DataAtom;
use crate::term::{ImmutableExpression, Term, Variable};

/// An immutable mapping from variables to terms.
///
/// Identity entries (`x -> x`) are never stored, so two substitutions with
/// the same effect compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Substitution {
    map: BTreeMap<Variable, Term>,
}

impl Substitution {
    /// The empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// A substitution with a single binding.
    pub fn singleton(variable: Variable, term: impl Into<Term>) -> Self {
        [(variable, term.into())].into_iter().collect()
    }

    /// Whether the substitution has no binding.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// The term bound to `variable`, if any.
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.map.get(variable)
    }

    /// Iterate over the bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.map.iter()
    }

    /// The bound variables.
    pub fn domain(&self) -> BTreeSet<Variable> {
        self.map.keys().cloned().collect()
    }

    /// The variables occurring in the bound terms.
    pub fn range_variables(&self) -> BTreeSet<Variable> {
        let mut acc = BTreeSet::new();
        self.map.values().for_each(|t| t.collect_variables(&mut acc));
        acc
    }

    /// Apply to a single variable.
    pub fn apply_to_variable(&self, variable: &Variable) -> Term {
        self.map
            .get(variable)
            .cloned()
            .unwrap_or_else(|| Term::Variable(variable.clone()))
    }

    /// Apply to a term, rewriting nested arguments.
    pub fn apply_to_term(&self, term: &Term) -> Term {
        if self.is_empty() {
            return term.clone();
        }
        match term {
            Term::Variable(v) => self.apply_to_variable(v),
            Term::Constant(_) => term.clone(),
            Term::Function(f) => {
                let args = f.arguments().iter().map(|a| self.apply_to_term(a)).collect();
                Term::Function(Arc::new(f.with_arguments(args)))
            }
            Term::Expression(e) => Term::Expression(Arc::new(self.apply_to_expression(e))),
        }
    }

    /// Apply to every argument of an expression.
    pub fn apply_to_expression(&self, expression: &ImmutableExpression) -> ImmutableExpression {
        let args = expression
            .arguments()
            .iter()
            .map(|a| self.apply_to_term(a))
            .collect();
        expression.with_arguments(args)
    }

    /// Apply to the arguments of a data atom.
    ///
    /// Returns `None` when a binding would place a compound term in the atom.
    pub fn apply_to_atom(&self, atom: &DataAtom) -> Option<DataAtom> {
        let args = atom
            .arguments()
            .iter()
            .map(|a| self.apply_to_term(a))
            .collect();
        DataAtom::new(atom.predicate().clone(), args).ok()
    }

    /// `self ∘ other`: first apply `other`, then `self`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut map: BTreeMap<Variable, Term> = other
            .map
            .iter()
            .map(|(v, t)| (v.clone(), self.apply_to_term(t)))
            .collect();
        for (v, t) in &self.map {
            map.entry(v.clone()).or_insert_with(|| t.clone());
        }
        Self::from_map(map)
    }

    /// Keep only the bindings of the given variables.
    pub fn restrict_to(&self, variables: &BTreeSet<Variable>) -> Substitution {
        self.filter(|v| variables.contains(v))
    }

    /// Drop the bindings of the given variables.
    pub fn without(&self, variables: &BTreeSet<Variable>) -> Substitution {
        self.filter(|v| !variables.contains(v))
    }

    fn filter(&self, keep: impl Fn(&Variable) -> bool) -> Substitution {
        Self {
            map: self
                .map
                .iter()
                .filter(|(v, _)| keep(v))
                .map(|(v, t)| (v.clone(), t.clone()))
                .collect(),
        }
    }

    /// Whether every binding maps to a variable and no two variables share
    /// a target.
    pub fn is_renaming(&self) -> bool {
        let mut targets = BTreeSet::new();
        self.map
            .values()
            .all(|t| t.as_variable().is_some_and(|v| targets.insert(v.clone())))
    }

    /// The inverse of a renaming; `None` for other substitutions.
    pub fn inverse_renaming(&self) -> Option<Substitution> {
        if !self.is_renaming() {
            return None;
        }
        self.map
            .iter()
            .map(|(v, t)| t.as_variable().map(|w| (w.clone(), Term::Variable(v.clone()))))
            .collect()
    }

    fn from_map(map: BTreeMap<Variable, Term>) -> Self {
        map.into_iter().collect()
    }

    /// Bind `variable` to `term`, keeping the substitution idempotent.
    fn bind(&mut self, variable: Variable, term: Term) {
        let single = Substitution::singleton(variable.clone(), term.clone());
        for value in self.map.values_mut() {
            *value = single.apply_to_term(value);
        }
        self.map.retain(|v, t| t.as_variable() != Some(v));
        self.map.insert(variable, term);
    }
}

impl FromIterator<(Variable, Term)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .filter(|(v, t)| t.as_variable() != Some(v))
                .collect(),
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, t)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v} -> {t}")?;
        }
        write!(f, "}}")
    }
}

/// Most general unifier of the given term pairs, processed in order.
///
/// When two variables are unified, a variable of `preserved` is kept as
/// the representative; otherwise the right-hand variable is replaced by the
/// left-hand one. Returns `None` when the pairs cannot be unified (distinct
/// constants, different function symbols or a cyclic binding).
pub fn unify_term_pairs(
    pairs: impl IntoIterator<Item = (Term, Term)>,
    preserved: &BTreeSet<Variable>,
) -> Option<Substitution> {
    let mut pending: VecDeque<(Term, Term)> = pairs.into_iter().collect();
    let mut unifier = Substitution::new();

    while let Some((left, right)) = pending.pop_front() {
        let left = unifier.apply_to_term(&left);
        let right = unifier.apply_to_term(&right);
        if left == right {
            continue;
        }
        match (&left, &right) {
            (Term::Variable(l), Term::Variable(r)) => {
                if preserved.contains(r) && !preserved.contains(l) {
                    unifier.bind(l.clone(), right.clone());
                } else {
                    unifier.bind(r.clone(), left.clone());
                }
            }
            (Term::Variable(v), other) | (other, Term::Variable(v)) => {
                if other.contains_variable(v) {
                    return None;
                }
                unifier.bind(v.clone(), other.clone());
            }
            (Term::Function(f), Term::Function(g))
                if f.symbol() == g.symbol() && f.arguments().len() == g.arguments().len() =>
            {
                let nested = f.arguments().iter().cloned().zip(g.arguments().iter().cloned());
                for (i, pair) in nested.enumerate() {
                    pending.insert(i, pair);
                }
            }
            _ => return None,
        }
    }
    Some(unifier)
}
