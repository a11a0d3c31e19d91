//! Foreign-key join elimination.
//!
//! A leaf whose only contribution is to confirm that a referenced row
//! exists is dropped when a foreign key guarantees the match. Its own
//! variables must not be mentioned anywhere else in the query.
//!
//! Base relations are sets. A right leaf whose every column holds a
//! variable shared with the left leaf therefore matches at most one row,
//! whatever keys it declares, so a foreign key in either direction is
//! enough to drop it. A right leaf with variables of its own must be
//! reached through a foreign key into one of its unique keys.

use std::collections::BTreeSet;

use common_error::OnticResult;
use log::trace;
use ontic_core::{DataAtom, DbMetadata, ForeignKeyConstraint, Substitution, Variable};
use ontic_iq::{IntermediateQuery, NodeId, QueryNode, QueryOptimizationProposal};

use super::rule::NodeCentricRule;
use crate::analysis::{
    extensional, extensional_pair, foreign_key_matches, unused_elsewhere, ArgumentShape,
};

/// Rule that removes join arguments implied by a foreign key.
pub struct ForeignKeyJoinElimination;

impl NodeCentricRule for ForeignKeyJoinElimination {
    fn name(&self) -> &'static str {
        "ForeignKeyJoinElimination"
    }

    fn description(&self) -> &'static str {
        "Remove join arguments made redundant by a foreign key"
    }

    fn propose(
        &self,
        query: &IntermediateQuery,
        focus: NodeId,
        metadata: &DbMetadata,
    ) -> OnticResult<Option<QueryOptimizationProposal>> {
        Ok(match query.node(focus)? {
            QueryNode::LeftJoin(lj) if lj.condition().is_none() => {
                left_join_proposal(query, focus, metadata)
            }
            QueryNode::InnerJoin(_) => inner_join_proposal(query, focus, metadata),
            _ => None,
        })
    }
}

fn left_join_proposal(
    query: &IntermediateQuery,
    focus: NodeId,
    metadata: &DbMetadata,
) -> Option<QueryOptimizationProposal> {
    let ((left_id, left), (right_id, right)) = extensional_pair(query, focus)?;
    let shape = ArgumentShape::of(right, &left.variables())?;
    if !unused_elsewhere(query, right_id, &shape.local) {
        trace!("{focus}: right-only variables of {right} are used");
        return None;
    }

    let (left_name, right_name) = (left.predicate().name(), right.predicate().name());
    let referenced = metadata
        .foreign_keys_between(left_name, right_name)
        .any(|fk| foreign_key_matches(fk, left, right, &shape.shared_columns));
    // With no right-only variable the right side only confirms existence,
    // so a key in the other direction works as well.
    let referencing = shape.local.is_empty()
        && metadata.foreign_keys_between(right_name, left_name).any(|fk| {
            let source: BTreeSet<usize> = fk.source_columns().iter().copied().collect();
            source == shape.shared_columns
                && fk.column_pairs().all(|(s, t)| right.column(s) == left.column(t))
        });

    if !(referenced || referencing) {
        return None;
    }
    Some(QueryOptimizationProposal::ReplaceByChild {
        focus,
        child: left_id,
        ascending: Substitution::default(),
    })
}

/// Whether every referencing column of `fk` holds a non-null term in `source`.
fn non_null_source(
    fk: &ForeignKeyConstraint,
    source: &DataAtom,
    non_null: &BTreeSet<Variable>,
) -> bool {
    fk.source_columns()
        .iter()
        .all(|c| source.column(*c).is_some_and(|t| t.is_non_null(non_null)))
}

fn inner_join_proposal(
    query: &IntermediateQuery,
    focus: NodeId,
    metadata: &DbMetadata,
) -> Option<QueryOptimizationProposal> {
    let children = query.get_children(focus);
    for kept in children {
        let Some(source) = extensional(query, *kept) else {
            continue;
        };
        let non_null = metadata.non_null_variables(source);

        for removed in children.iter().filter(|c| *c != kept) {
            let Some(target) = extensional(query, *removed) else {
                continue;
            };
            let Some(shape) = ArgumentShape::of(target, &source.variables()) else {
                continue;
            };
            if !unused_elsewhere(query, *removed, &shape.local) {
                continue;
            }
            let implied = metadata
                .foreign_keys_between(source.predicate().name(), target.predicate().name())
                .any(|fk| {
                    non_null_source(fk, source, &non_null)
                        && foreign_key_matches(fk, source, target, &shape.shared_columns)
                });
            if implied {
                return Some(QueryOptimizationProposal::RemoveJoinChildren {
                    focus,
                    removed: vec![*removed],
                    substitution: Substitution::default(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_utils::{builder, leaf, metadata};
    use ontic_core::{ImmutableExpression, MetadataBuilder, Term};
    use ontic_iq::{InnerJoinNode, LeftJoinNode};

    fn emp_dept(projected: &[&str], inner: bool) -> (IntermediateQuery, NodeId, NodeId) {
        let (mut builder, root) = builder("ans", projected);
        let join = if inner {
            builder.add_child(root, InnerJoinNode::new(None)).unwrap()
        } else {
            builder.add_child(root, LeftJoinNode::new(None)).unwrap()
        };
        builder.add_child(join, leaf("Emp", &["e", "d"])).unwrap();
        let dept = builder.add_child(join, leaf("Dept", &["d", "n"])).unwrap();
        (builder.build().unwrap(), join, dept)
    }

    #[test]
    fn test_unused_referenced_row_is_dropped() {
        let (query, lj, _) = emp_dept(&["e", "d"], false);
        let left = query.get_children(lj)[0];
        assert_eq!(
            ForeignKeyJoinElimination.propose(&query, lj, &metadata()).unwrap(),
            Some(QueryOptimizationProposal::ReplaceByChild {
                focus: lj,
                child: left,
                ascending: Substitution::default(),
            })
        );
    }

    #[test]
    fn test_left_join_condition_declines() {
        let (mut builder, root) = builder("ans", &["e", "d"]);
        let condition = ImmutableExpression::neq(Term::var("e"), Term::var("d"));
        let lj = builder
            .add_child(root, LeftJoinNode::new(Some(condition)))
            .unwrap();
        builder.add_child(lj, leaf("Emp", &["e", "d"])).unwrap();
        builder.add_child(lj, leaf("Dept", &["d", "n"])).unwrap();
        let query = builder.build().unwrap();

        assert!(ForeignKeyJoinElimination
            .propose(&query, lj, &metadata())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_used_right_variable_declines() {
        let (query, lj, _) = emp_dept(&["e", "d", "n"], false);
        assert!(ForeignKeyJoinElimination
            .propose(&query, lj, &metadata())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_inner_join_needs_non_null_source() {
        let (query, join, dept) = emp_dept(&["e", "d"], true);
        assert_eq!(
            ForeignKeyJoinElimination.propose(&query, join, &metadata()).unwrap(),
            Some(QueryOptimizationProposal::RemoveJoinChildren {
                focus: join,
                removed: vec![dept],
                substitution: Substitution::default(),
            })
        );

        let nullable = MetadataBuilder::new()
            .relation("Emp", 2)
            .relation("Dept", 2)
            .primary_key("Dept", &[1])
            .foreign_key("Emp", &[2], "Dept", &[1])
            .build()
            .unwrap();
        assert!(ForeignKeyJoinElimination
            .propose(&query, join, &nullable)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_without_foreign_key_declines() {
        let (mut builder, root) = builder("ans", &["x"]);
        let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
        builder.add_child(lj, leaf("Code", &["x"])).unwrap();
        builder.add_child(lj, leaf("Label", &["x"])).unwrap();
        let query = builder.build().unwrap();
        assert!(ForeignKeyJoinElimination
            .propose(&query, lj, &metadata())
            .unwrap()
            .is_none());
    }
}
