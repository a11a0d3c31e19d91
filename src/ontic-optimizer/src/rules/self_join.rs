//! Redundant self-join elimination.
//!
//! Two leaves over the same relation that agree on every column of a
//! unique key, with non-null key values, denote the same row. Under a left
//! join the right leaf always matches, so it can be replaced by bindings of
//! its own variables to the left terms. Under an inner join one of the
//! leaves is removed and the two atoms are unified.

use std::collections::{BTreeMap, BTreeSet};

use common_error::OnticResult;
use log::trace;
use ontic_core::substitution::unify_term_pairs;
use ontic_core::{
    evaluate, DataAtom, DbMetadata, EvaluationResult, ImmutableExpression, Substitution,
    Variable,
};
use ontic_iq::{IntermediateQuery, NodeId, QueryNode, QueryOptimizationProposal};

use super::rule::NodeCentricRule;
use crate::analysis::{extensional, extensional_pair};

/// Rule that removes self-joins made redundant by a unique key.
pub struct RedundantSelfJoin;

impl NodeCentricRule for RedundantSelfJoin {
    fn name(&self) -> &'static str {
        "RedundantSelfJoin"
    }

    fn description(&self) -> &'static str {
        "Remove self-joins over a unique key"
    }

    fn propose(
        &self,
        query: &IntermediateQuery,
        focus: NodeId,
        metadata: &DbMetadata,
    ) -> OnticResult<Option<QueryOptimizationProposal>> {
        Ok(match query.node(focus)? {
            QueryNode::LeftJoin(lj) => left_join_proposal(query, focus, lj.condition(), metadata),
            QueryNode::InnerJoin(_) => inner_join_proposal(query, focus, metadata),
            _ => None,
        })
    }
}

/// Whether both atoms hold the same non-null term on every column of `key`.
fn agree_on_key(
    left: &DataAtom,
    right: &DataAtom,
    key: &BTreeSet<usize>,
    non_null: &BTreeSet<Variable>,
) -> bool {
    key.iter().all(|c| match (left.column(*c), right.column(*c)) {
        (Some(l), Some(r)) => l == r && l.is_non_null(non_null),
        _ => false,
    })
}

/// Bindings turning `right` into `left`, provided they only bind distinct
/// variables absent from `left`. Any other difference would filter rows.
fn right_only_bindings(left: &DataAtom, right: &DataAtom) -> Option<Substitution> {
    let left_vars = left.variables();
    let mut bindings = BTreeMap::new();
    for (l, r) in left.arguments().iter().zip(right.arguments()) {
        if l == r {
            continue;
        }
        let v = r.as_variable().filter(|v| !left_vars.contains(*v))?;
        if bindings.insert(v.clone(), l.clone()).is_some() {
            return None;
        }
    }
    Some(bindings.into_iter().collect())
}

fn left_join_proposal(
    query: &IntermediateQuery,
    focus: NodeId,
    condition: Option<&ImmutableExpression>,
    metadata: &DbMetadata,
) -> Option<QueryOptimizationProposal> {
    let ((left_id, left), (_, right)) = extensional_pair(query, focus)?;
    if left.predicate() != right.predicate() {
        return None;
    }
    let non_null = metadata.non_null_variables(left);
    let keys = metadata.unique_keys(left.predicate().name());
    if !keys.iter().any(|k| agree_on_key(left, right, k, &non_null)) {
        trace!("{focus}: {left} and {right} do not agree on a non-null unique key");
        return None;
    }

    let ascending = right_only_bindings(left, right)?;
    if let Some(condition) = condition {
        let condition = ascending.apply_to_expression(condition);
        if evaluate(&condition, &non_null) != EvaluationResult::IsTrue {
            trace!("{focus}: condition {condition} does not always hold");
            return None;
        }
    }
    Some(QueryOptimizationProposal::ReplaceByChild {
        focus,
        child: left_id,
        ascending,
    })
}

fn inner_join_proposal(
    query: &IntermediateQuery,
    focus: NodeId,
    metadata: &DbMetadata,
) -> Option<QueryOptimizationProposal> {
    let children = query.get_children(focus);
    for (i, kept) in children.iter().enumerate() {
        let Some(left) = extensional(query, *kept) else {
            continue;
        };
        let non_null = metadata.non_null_variables(left);
        let keys = metadata.unique_keys(left.predicate().name());

        for removed in &children[i + 1..] {
            let Some(right) = extensional(query, *removed) else {
                continue;
            };
            if left.predicate() != right.predicate()
                || !keys.iter().any(|k| agree_on_key(left, right, k, &non_null))
            {
                continue;
            }
            let pairs = left
                .arguments()
                .iter()
                .cloned()
                .zip(right.arguments().iter().cloned());
            // Same row, different constants: the join is empty.
            return Some(match unify_term_pairs(pairs, &left.variables()) {
                Some(substitution) => QueryOptimizationProposal::RemoveJoinChildren {
                    focus,
                    removed: vec![*removed],
                    substitution,
                },
                None => QueryOptimizationProposal::DeclareEmpty { focus },
            });
        }
    }
    None
}
