//! Reference evaluation of intermediate queries over in-memory relations.
//!
//! Bag semantics, SQL NULLs: join variables only match non-null equal
//! values, and conditions use three-valued logic.

use std::collections::{BTreeMap, BTreeSet};

use ontic_core::{DataAtom, ExpressionOperation, ImmutableExpression, Term, Value, Variable};
use ontic_iq::{IntermediateQuery, NodeId, QueryNode};

/// Base relation contents by relation name.
pub type Database = BTreeMap<String, Vec<Vec<Value>>>;

type Row = BTreeMap<Variable, Value>;

/// Answers of `query` over `db` in root projection order, sorted so that
/// equal bags compare equal.
pub fn answers(query: &IntermediateQuery, db: &Database) -> Vec<Vec<Value>> {
    let projection = query.root_construction().unwrap().projection().to_vec();
    let mut tuples: Vec<Vec<Value>> = rows(query, query.root(), db)
        .iter()
        .map(|row| projection.iter().map(|v| lookup(row, v)).collect())
        .collect();
    tuples.sort();
    tuples
}

fn lookup(row: &Row, variable: &Variable) -> Value {
    row.get(variable).cloned().unwrap_or(Value::Null)
}

fn rows(query: &IntermediateQuery, id: NodeId, db: &Database) -> Vec<Row> {
    let children = query.get_children(id);
    match query.get_node(id).unwrap() {
        QueryNode::ExtensionalData(leaf) => scan(leaf.atom(), db),
        QueryNode::IntensionalData(leaf) => panic!("cannot evaluate {leaf}"),
        QueryNode::Construction(construction) => rows(query, children[0], db)
            .iter()
            .map(|row| {
                construction
                    .projection()
                    .iter()
                    .map(|v| (v.clone(), value(&construction.definition(v), row)))
                    .collect()
            })
            .collect(),
        QueryNode::Filter(filter) => rows(query, children[0], db)
            .into_iter()
            .filter(|row| truth(filter.condition(), row) == Some(true))
            .collect(),
        QueryNode::InnerJoin(join) => {
            let mut joined = vec![Row::new()];
            for child in children {
                let right = rows(query, *child, db);
                joined = joined
                    .iter()
                    .flat_map(|l| right.iter().filter_map(move |r| merge(l, r)))
                    .collect();
            }
            joined
                .into_iter()
                .filter(|row| join.condition().map_or(true, |c| truth(c, row) == Some(true)))
                .collect()
        }
        QueryNode::LeftJoin(join) => {
            let left_vars = query.projected_variables(children[0]);
            let padding: BTreeSet<Variable> = query
                .projected_variables(children[1])
                .difference(&left_vars)
                .cloned()
                .collect();
            let right = rows(query, children[1], db);
            let mut joined = Vec::new();
            for l in rows(query, children[0], db) {
                let matches: Vec<Row> = right
                    .iter()
                    .filter_map(|r| merge(&l, r))
                    .filter(|row| join.condition().map_or(true, |c| truth(c, row) == Some(true)))
                    .collect();
                if matches.is_empty() {
                    let mut padded = l.clone();
                    padded.extend(padding.iter().map(|v| (v.clone(), Value::Null)));
                    joined.push(padded);
                } else {
                    joined.extend(matches);
                }
            }
            joined
        }
        QueryNode::Union(union) => children
            .iter()
            .flat_map(|child| rows(query, *child, db))
            .map(|row| {
                union
                    .projected_variables()
                    .iter()
                    .map(|v| (v.clone(), lookup(&row, v)))
                    .collect()
            })
            .collect(),
    }
}

fn scan(atom: &DataAtom, db: &Database) -> Vec<Row> {
    let Some(tuples) = db.get(atom.predicate().name()) else {
        return Vec::new();
    };
    tuples
        .iter()
        .filter_map(|tuple| {
            let mut row = Row::new();
            for (term, v) in atom.arguments().iter().zip(tuple) {
                match term {
                    Term::Variable(var) => match row.get(var) {
                        Some(bound) if bound.is_null() || v.is_null() || bound != v => return None,
                        Some(_) => {}
                        None => {
                            row.insert(var.clone(), v.clone());
                        }
                    },
                    Term::Constant(c) if !v.is_null() && c == v => {}
                    Term::Constant(_) => return None,
                    other => panic!("cannot scan with argument {other}"),
                }
            }
            Some(row)
        })
        .collect()
}

/// Joins two rows that agree, with non-null values, on their shared variables.
fn merge(left: &Row, right: &Row) -> Option<Row> {
    let mut merged = left.clone();
    for (var, v) in right {
        match left.get(var) {
            Some(l) if l.is_null() || v.is_null() || l != v => return None,
            Some(_) => {}
            None => {
                merged.insert(var.clone(), v.clone());
            }
        }
    }
    Some(merged)
}

fn value(term: &Term, row: &Row) -> Value {
    match term {
        Term::Variable(v) => lookup(row, v),
        Term::Constant(c) => c.clone(),
        other => panic!("cannot evaluate {other}"),
    }
}

/// Three-valued truth of `expression`; `None` is unknown.
fn truth(expression: &ImmutableExpression, row: &Row) -> Option<bool> {
    let args = expression.arguments();
    match expression.operation() {
        ExpressionOperation::And => args.iter().fold(Some(true), |acc, a| {
            match (acc, term_truth(a, row)) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            }
        }),
        ExpressionOperation::Or => args.iter().fold(Some(false), |acc, a| {
            match (acc, term_truth(a, row)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            }
        }),
        ExpressionOperation::Not => term_truth(&args[0], row).map(|b| !b),
        ExpressionOperation::IsNull => Some(value(&args[0], row).is_null()),
        ExpressionOperation::IsNotNull => Some(!value(&args[0], row).is_null()),
        ExpressionOperation::IsTrue => Some(term_truth(&args[0], row) == Some(true)),
        op => {
            let (l, r) = (value(&args[0], row), value(&args[1], row));
            if l.is_null() || r.is_null() {
                return None;
            }
            Some(match op {
                ExpressionOperation::Eq => l == r,
                ExpressionOperation::Neq => l != r,
                ExpressionOperation::Lt => l < r,
                ExpressionOperation::Lte => l <= r,
                ExpressionOperation::Gt => l > r,
                _ => l >= r,
            })
        }
    }
}

fn term_truth(term: &Term, row: &Row) -> Option<bool> {
    match term {
        Term::Expression(e) => truth(e, row),
        other => match value(other, row) {
            Value::Null => None,
            Value::Bool(b) => Some(b),
            v => panic!("{v:?} is not a boolean"),
        },
    }
}
