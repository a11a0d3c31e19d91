//! Immutable terms: variables, constants, functional terms and boolean
//! expressions.
//!
//! Terms are structurally compared and hashed. Compound terms are shared
//! behind an `Arc`, so cloning a term never copies its arguments.

mod expression;
mod function;
mod value;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use expression::{ExpressionOperation, ImmutableExpression};
pub use function::{FunctionSymbol, Injectivity};
pub use value::Value;

/// A variable, scoped to one query tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable(Arc<str>);

impl Variable {
    /// Create a variable with the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The variable name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Application of a function symbol to an ordered list of terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionalTerm {
    symbol: FunctionSymbol,
    arguments: Vec<Term>,
}

impl FunctionalTerm {
    /// The function symbol.
    pub fn symbol(&self) -> &FunctionSymbol {
        &self.symbol
    }

    /// The arguments, in order.
    pub fn arguments(&self) -> &[Term] {
        &self.arguments
    }

    pub(crate) fn with_arguments(&self, arguments: Vec<Term>) -> Self {
        Self {
            symbol: self.symbol.clone(),
            arguments,
        }
    }
}

impl fmt::Display for FunctionalTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.symbol.name())?;
        write_comma_separated(f, &self.arguments)?;
        write!(f, ")")
    }
}

/// A term of the query language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// A variable.
    Variable(Variable),
    /// A ground constant.
    Constant(Value),
    /// A non-boolean functional term.
    Function(Arc<FunctionalTerm>),
    /// A boolean-valued expression.
    Expression(Arc<ImmutableExpression>),
}

impl Term {
    /// Create a variable term.
    pub fn var(name: impl AsRef<str>) -> Self {
        Self::Variable(Variable::new(name))
    }

    /// Create a constant term.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    /// The NULL constant.
    pub fn null() -> Self {
        Self::Constant(Value::Null)
    }

    /// Apply a function symbol to arguments.
    ///
    /// Returns `None` when the number of arguments does not match the arity.
    pub fn function(symbol: FunctionSymbol, arguments: Vec<Term>) -> Option<Self> {
        if symbol.arity() != arguments.len() {
            return None;
        }
        Some(Self::Function(Arc::new(FunctionalTerm { symbol, arguments })))
    }

    /// Get the variable, if this term is one.
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Get the constant value, if this term is one.
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Self::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// Get the expression, if this term is one.
    pub fn as_expression(&self) -> Option<&ImmutableExpression> {
        match self {
            Self::Expression(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this term is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    /// Whether this term is the NULL constant.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Constant(Value::Null))
    }

    /// Whether this term contains no variable.
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Variable(_) => false,
            Self::Constant(_) => true,
            Self::Function(f) => f.arguments.iter().all(Term::is_ground),
            Self::Expression(e) => e.arguments().iter().all(Term::is_ground),
        }
    }

    /// Whether the variable occurs in this term.
    pub fn contains_variable(&self, variable: &Variable) -> bool {
        match self {
            Self::Variable(v) => v == variable,
            Self::Constant(_) => false,
            Self::Function(f) => f.arguments.iter().any(|a| a.contains_variable(variable)),
            Self::Expression(e) => e.arguments().iter().any(|a| a.contains_variable(variable)),
        }
    }

    /// Add the variables of this term to `acc`.
    pub fn collect_variables(&self, acc: &mut BTreeSet<Variable>) {
        match self {
            Self::Variable(v) => {
                acc.insert(v.clone());
            }
            Self::Constant(_) => {}
            Self::Function(f) => f.arguments.iter().for_each(|a| a.collect_variables(acc)),
            Self::Expression(e) => e.arguments().iter().for_each(|a| a.collect_variables(acc)),
        }
    }

    /// The variables of this term.
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut acc = BTreeSet::new();
        self.collect_variables(&mut acc);
        acc
    }

    /// Whether this term can never evaluate to NULL, given the variables
    /// known to be non-null. Function symbols are assumed to be strict.
    pub fn is_non_null(&self, non_null: &BTreeSet<Variable>) -> bool {
        match self {
            Self::Variable(v) => non_null.contains(v),
            Self::Constant(v) => !v.is_null(),
            Self::Function(f) => f.arguments.iter().all(|a| a.is_non_null(non_null)),
            Self::Expression(_) => false,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(v) => write!(f, "{v}"),
            Self::Constant(c) => write!(f, "{c}"),
            Self::Function(func) => write!(f, "{func}"),
            Self::Expression(e) => write!(f, "{e}"),
        }
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Self::Variable(v)
    }
}

impl From<&Variable> for Term {
    fn from(v: &Variable) -> Self {
        Self::Variable(v.clone())
    }
}

impl From<Value> for Term {
    fn from(v: Value) -> Self {
        Self::Constant(v)
    }
}

impl From<ImmutableExpression> for Term {
    fn from(e: ImmutableExpression) -> Self {
        Self::Expression(Arc::new(e))
    }
}

pub(crate) fn write_comma_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat() -> FunctionSymbol {
        FunctionSymbol::new("CONCAT", 2, Injectivity::Never, true)
    }

    #[test]
    fn test_structural_equality() {
        let a = Term::function(concat(), vec![Term::var("x"), Term::constant("a")]).unwrap();
        let b = Term::function(concat(), vec![Term::var("x"), Term::constant("a")]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Term::var("x"));
    }

    #[test]
    fn test_function_arity_checked() {
        assert!(Term::function(concat(), vec![Term::var("x")]).is_none());
    }

    #[test]
    fn test_variables_and_groundness() {
        let t = Term::function(concat(), vec![Term::var("x"), Term::var("y")]).unwrap();
        let vars: Vec<_> = t.variables().into_iter().map(|v| v.to_string()).collect();
        assert_eq!(vars, vec!["x", "y"]);
        assert!(!t.is_ground());
        assert!(Term::constant(1i64).is_ground());
        assert!(t.contains_variable(&Variable::new("y")));
    }

    #[test]
    fn test_non_null() {
        let x = Variable::new("x");
        let non_null: BTreeSet<_> = [x.clone()].into_iter().collect();
        assert!(Term::from(&x).is_non_null(&non_null));
        assert!(!Term::var("y").is_non_null(&non_null));
        assert!(!Term::null().is_non_null(&non_null));
        let t = Term::function(concat(), vec![Term::from(&x), Term::constant("a")]).unwrap();
        assert!(t.is_non_null(&non_null));
    }

    #[test]
    fn test_display() {
        let t = Term::function(concat(), vec![Term::var("x"), Term::constant(2i64)]).unwrap();
        assert_eq!(t.to_string(), "CONCAT(x,2)");
    }
}
