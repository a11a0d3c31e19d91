//! Boolean-valued expressions.

use std::collections::BTreeSet;
use std::fmt;

use common_error::{OnticError, OnticResult};
use serde::{Deserialize, Serialize};

use super::{write_comma_separated, Term, Variable};

/// Boolean operation of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionOperation {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// N-ary conjunction.
    And,
    /// N-ary disjunction.
    Or,
    /// Negation.
    Not,
    /// Null test.
    IsNull,
    /// Non-null test.
    IsNotNull,
    /// Truth test of a boolean term (NULL is not true).
    IsTrue,
}

impl ExpressionOperation {
    /// Expected number of arguments; `None` for the n-ary connectives.
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::Eq | Self::Neq | Self::Lt | Self::Lte | Self::Gt | Self::Gte => Some(2),
            Self::Not | Self::IsNull | Self::IsNotNull | Self::IsTrue => Some(1),
            Self::And | Self::Or => None,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::IsTrue => "IS_TRUE",
        }
    }

    /// The comparison with swapped operands (`a < b` is `b > a`).
    pub fn flipped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
            other => other,
        }
    }
}

impl fmt::Display for ExpressionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable boolean expression: an operation applied to terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImmutableExpression {
    operation: ExpressionOperation,
    arguments: Vec<Term>,
}

impl ImmutableExpression {
    /// Create an expression, checking the number of arguments.
    pub fn try_new(operation: ExpressionOperation, arguments: Vec<Term>) -> OnticResult<Self> {
        match operation.arity() {
            Some(arity) if arity != arguments.len() => Err(OnticError::invalid_parameter(format!(
                "{} expects {} arguments, got {}",
                operation,
                arity,
                arguments.len()
            ))),
            None if arguments.len() < 2 => Err(OnticError::invalid_parameter(format!(
                "{} expects at least 2 arguments, got {}",
                operation,
                arguments.len()
            ))),
            _ => Ok(Self {
                operation,
                arguments,
            }),
        }
    }

    fn binary(operation: ExpressionOperation, left: Term, right: Term) -> Self {
        Self {
            operation,
            arguments: vec![left, right],
        }
    }

    fn unary(operation: ExpressionOperation, arg: Term) -> Self {
        Self {
            operation,
            arguments: vec![arg],
        }
    }

    /// `left = right`.
    pub fn eq(left: impl Into<Term>, right: impl Into<Term>) -> Self {
        Self::binary(ExpressionOperation::Eq, left.into(), right.into())
    }

    /// `left <> right`.
    pub fn neq(left: impl Into<Term>, right: impl Into<Term>) -> Self {
        Self::binary(ExpressionOperation::Neq, left.into(), right.into())
    }

    /// A comparison; `operation` must be one of LT, LTE, GT, GTE, EQ, NEQ.
    pub fn compare(
        operation: ExpressionOperation,
        left: impl Into<Term>,
        right: impl Into<Term>,
    ) -> Self {
        debug_assert_eq!(operation.arity(), Some(2));
        Self::binary(operation, left.into(), right.into())
    }

    /// `term IS NULL`.
    pub fn is_null(term: impl Into<Term>) -> Self {
        Self::unary(ExpressionOperation::IsNull, term.into())
    }

    /// `term IS NOT NULL`.
    pub fn is_not_null(term: impl Into<Term>) -> Self {
        Self::unary(ExpressionOperation::IsNotNull, term.into())
    }

    /// `term IS TRUE`.
    pub fn is_true(term: impl Into<Term>) -> Self {
        Self::unary(ExpressionOperation::IsTrue, term.into())
    }

    /// `NOT argument`.
    pub fn not(argument: impl Into<Term>) -> Self {
        Self::unary(ExpressionOperation::Not, argument.into())
    }

    /// Disjunction of two expressions.
    pub fn or(left: ImmutableExpression, right: ImmutableExpression) -> Self {
        Self::binary(ExpressionOperation::Or, left.into(), right.into())
    }

    /// Conjunction of the given expressions, flattening nested conjunctions.
    ///
    /// Returns `None` for an empty input and the expression itself for a
    /// single conjunct.
    pub fn conjunction(expressions: impl IntoIterator<Item = ImmutableExpression>) -> Option<Self> {
        let mut conjuncts: Vec<ImmutableExpression> = Vec::new();
        for expression in expressions {
            conjuncts.extend(expression.flatten_and());
        }
        match conjuncts.len() {
            0 => None,
            1 => conjuncts.pop(),
            _ => Some(Self {
                operation: ExpressionOperation::And,
                arguments: conjuncts.into_iter().map(Term::from).collect(),
            }),
        }
    }

    /// The operation.
    pub fn operation(&self) -> ExpressionOperation {
        self.operation
    }

    /// The arguments.
    pub fn arguments(&self) -> &[Term] {
        &self.arguments
    }

    /// Build an expression whose arguments are known to fit the operation.
    pub(crate) fn from_parts(operation: ExpressionOperation, arguments: Vec<Term>) -> Self {
        Self {
            operation,
            arguments,
        }
    }

    /// Rebuild this expression with new arguments.
    pub(crate) fn with_arguments(&self, arguments: Vec<Term>) -> Self {
        Self {
            operation: self.operation,
            arguments,
        }
    }

    /// The conjuncts of this expression.
    ///
    /// Nested conjunctions are flattened and non-expression arguments of a
    /// conjunction are wrapped into `IS_TRUE`.
    pub fn flatten_and(&self) -> Vec<ImmutableExpression> {
        if self.operation != ExpressionOperation::And {
            return vec![self.clone()];
        }
        self.arguments
            .iter()
            .flat_map(|arg| match arg {
                Term::Expression(e) => e.flatten_and(),
                other => vec![Self::is_true(other.clone())],
            })
            .collect()
    }

    /// The variables of this expression.
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut acc = BTreeSet::new();
        self.arguments.iter().for_each(|a| a.collect_variables(&mut acc));
        acc
    }
}

impl fmt::Display for ImmutableExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operation)?;
        write_comma_separated(f, &self.arguments)?;
        write!(f, ")")
    }
}
