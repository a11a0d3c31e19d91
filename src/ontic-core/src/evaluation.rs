//! Boolean expression evaluation.
//!
//! Evaluation is a pure rewrite under three-valued (Kleene) logic. Every
//! intermediate step is equivalent to its input, NULL included; only the
//! final result may wrap a bare boolean term into `IS_TRUE`, which is
//! equivalent in a filtering position where NULL and false both reject.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::term::{ExpressionOperation as Op, ImmutableExpression, Term, Value, Variable};

/// Outcome of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationResult {
    /// No simplification applies.
    SameExpression,
    /// A smaller equivalent expression that cannot be decided further.
    Simplified(ImmutableExpression),
    /// The expression is always NULL.
    IsNull,
    /// The expression is always true.
    IsTrue,
    /// The expression is always false.
    IsFalse,
}

impl EvaluationResult {
    /// Whether a filter with this condition rejects every row.
    pub fn rejects_all(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsFalse)
    }
}

/// Evaluate `expression`, given the variables known to be non-null.
pub fn evaluate(
    expression: &ImmutableExpression,
    non_null: &BTreeSet<Variable>,
) -> EvaluationResult {
    match reduce(expression, non_null) {
        Reduced::True => EvaluationResult::IsTrue,
        Reduced::False => EvaluationResult::IsFalse,
        Reduced::Null => EvaluationResult::IsNull,
        Reduced::Term(Term::Expression(e)) => {
            if *e == *expression {
                EvaluationResult::SameExpression
            } else {
                EvaluationResult::Simplified(Arc::unwrap_or_clone(e))
            }
        }
        Reduced::Term(other) => EvaluationResult::Simplified(ImmutableExpression::is_true(other)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reduced {
    True,
    False,
    Null,
    Term(Term),
}

impl Reduced {
    fn expression(expression: ImmutableExpression) -> Self {
        Self::Term(expression.into())
    }

    fn truth(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

fn reduce(expression: &ImmutableExpression, non_null: &BTreeSet<Variable>) -> Reduced {
    let unchanged = || Reduced::expression(expression.clone());
    match (expression.operation(), expression.arguments()) {
        (op @ (Op::And | Op::Or), args) => reduce_connective(op, args, non_null),
        (Op::Not, [arg]) => negate(reduce_term(arg, non_null)),
        (Op::Eq, [left, right]) => reduce_eq(left, right, non_null),
        (Op::Neq, [left, right]) => negate(reduce_eq(left, right, non_null)),
        (op @ (Op::Lt | Op::Lte | Op::Gt | Op::Gte), [left, right]) => {
            reduce_comparison(op, left, right).unwrap_or_else(unchanged)
        }
        (Op::IsNull, [arg]) => reduce_is_null(arg, non_null),
        (Op::IsNotNull, [arg]) => negate(reduce_is_null(arg, non_null)),
        (Op::IsTrue, [arg]) => reduce_is_true(arg, non_null),
        _ => unchanged(),
    }
}

fn reduce_term(term: &Term, non_null: &BTreeSet<Variable>) -> Reduced {
    match term {
        Term::Expression(e) => reduce(e, non_null),
        Term::Constant(Value::Bool(b)) => Reduced::truth(*b),
        Term::Constant(Value::Null) => Reduced::Null,
        other => Reduced::Term(other.clone()),
    }
}

fn reduce_connective(op: Op, args: &[Term], non_null: &BTreeSet<Variable>) -> Reduced {
    let (absorbing, neutral) = match op {
        Op::And => (Reduced::False, Reduced::True),
        _ => (Reduced::True, Reduced::False),
    };

    let mut parts: Vec<Term> = Vec::new();
    let mut null_seen = false;
    for arg in args {
        match reduce_term(arg, non_null) {
            r if r == absorbing => return absorbing,
            r if r == neutral => {}
            Reduced::Null => null_seen = true,
            Reduced::Term(Term::Expression(e)) if e.operation() == op => {
                for nested in e.arguments() {
                    if nested.is_null() {
                        null_seen = true;
                    } else if !parts.contains(nested) {
                        parts.push(nested.clone());
                    }
                }
            }
            Reduced::Term(t) => {
                if !parts.contains(&t) {
                    parts.push(t);
                }
            }
            _ => {}
        }
    }

    if parts.is_empty() {
        return if null_seen { Reduced::Null } else { neutral };
    }
    if null_seen {
        parts.push(Term::null());
    }
    if parts.len() == 1 {
        return parts.pop().map_or(neutral, Reduced::Term);
    }
    Reduced::expression(ImmutableExpression::from_parts(op, parts))
}

fn reduce_eq(left: &Term, right: &Term, non_null: &BTreeSet<Variable>) -> Reduced {
    match (left, right) {
        (Term::Constant(a), Term::Constant(b)) => {
            if a.is_null() || b.is_null() {
                Reduced::Null
            } else {
                Reduced::truth(a == b)
            }
        }
        (Term::Constant(Value::Null), _) | (_, Term::Constant(Value::Null)) => Reduced::Null,
        _ if left == right && left.is_non_null(non_null) => Reduced::True,
        (Term::Function(f), Term::Function(g))
            if f.symbol() == g.symbol()
                && f.symbol().is_injective(f.arguments(), non_null)
                && g.symbol().is_injective(g.arguments(), non_null) =>
        {
            let conjuncts: Vec<Term> = f
                .arguments()
                .iter()
                .zip(g.arguments())
                .map(|(a, b)| ImmutableExpression::eq(a.clone(), b.clone()).into())
                .collect();
            reduce_connective(Op::And, &conjuncts, non_null)
        }
        _ => Reduced::expression(ImmutableExpression::eq(left.clone(), right.clone())),
    }
}

fn reduce_comparison(op: Op, left: &Term, right: &Term) -> Option<Reduced> {
    let (Term::Constant(a), Term::Constant(b)) = (left, right) else {
        return None;
    };
    if a.is_null() || b.is_null() {
        return Some(Reduced::Null);
    }
    let (a, b) = (a.as_int64()?, b.as_int64()?);
    let holds = match op {
        Op::Lt => a < b,
        Op::Lte => a <= b,
        Op::Gt => a > b,
        Op::Gte => a >= b,
        _ => return None,
    };
    Some(Reduced::truth(holds))
}

fn reduce_is_null(arg: &Term, non_null: &BTreeSet<Variable>) -> Reduced {
    match arg {
        Term::Constant(v) => Reduced::truth(v.is_null()),
        Term::Expression(e) => match reduce(e, non_null) {
            Reduced::Null => Reduced::True,
            Reduced::True | Reduced::False => Reduced::False,
            Reduced::Term(t) => Reduced::expression(ImmutableExpression::is_null(t)),
        },
        t if t.is_non_null(non_null) => Reduced::False,
        t => Reduced::expression(ImmutableExpression::is_null(t.clone())),
    }
}

fn reduce_is_true(arg: &Term, non_null: &BTreeSet<Variable>) -> Reduced {
    match reduce_term(arg, non_null) {
        Reduced::True => Reduced::True,
        Reduced::False | Reduced::Null => Reduced::False,
        Reduced::Term(t) => Reduced::expression(ImmutableExpression::is_true(t)),
    }
}

fn negate(reduced: Reduced) -> Reduced {
    match reduced {
        Reduced::True => Reduced::False,
        Reduced::False => Reduced::True,
        Reduced::Null => Reduced::Null,
        Reduced::Term(t) => Reduced::Term(negate_term(t)),
    }
}

/// Push a negation one level down, through De Morgan and operator flips.
fn negate_term(term: Term) -> Term {
    let Term::Expression(e) = &term else {
        return match term {
            Term::Constant(Value::Bool(b)) => Term::constant(!b),
            Term::Constant(Value::Null) => Term::null(),
            other => ImmutableExpression::not(other).into(),
        };
    };
    let args = e.arguments();
    let flipped = match e.operation() {
        Op::Eq => Some(Op::Neq),
        Op::Neq => Some(Op::Eq),
        Op::Lt => Some(Op::Gte),
        Op::Lte => Some(Op::Gt),
        Op::Gt => Some(Op::Lte),
        Op::Gte => Some(Op::Lt),
        Op::IsNull => Some(Op::IsNotNull),
        Op::IsNotNull => Some(Op::IsNull),
        _ => None,
    };
    if let Some(op) = flipped {
        return ImmutableExpression::from_parts(op, args.to_vec()).into();
    }
    match (e.operation(), args) {
        (Op::Not, [inner]) => inner.clone(),
        (Op::And, _) => {
            ImmutableExpression::from_parts(Op::Or, args.iter().cloned().map(negate_term).collect())
                .into()
        }
        (Op::Or, _) => {
            let negated = args.iter().cloned().map(negate_term).collect();
            ImmutableExpression::from_parts(Op::And, negated).into()
        }
        _ => ImmutableExpression::not(term.clone()).into(),
    }
}
