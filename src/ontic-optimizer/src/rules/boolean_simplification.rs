//! Boolean expression simplification.
//!
//! Evaluates the condition of a filter or join with the variables known to
//! be non-null below it. A condition that always holds is dropped; one that
//! never holds empties a filter or inner join and cuts the right side of a
//! left join.

use std::collections::BTreeSet;

use common_error::OnticResult;
use log::trace;
use ontic_core::{evaluate, DbMetadata, EvaluationResult, Variable};
use ontic_iq::{IntermediateQuery, NodeId, QueryNode, QueryOptimizationProposal};

use super::rule::NodeCentricRule;
use crate::analysis::non_null_variables;

/// Rule that evaluates filter and join conditions.
pub struct BooleanExpressionSimplification;

impl NodeCentricRule for BooleanExpressionSimplification {
    fn name(&self) -> &'static str {
        "BooleanExpressionSimplification"
    }

    fn description(&self) -> &'static str {
        "Evaluate filter and join conditions, pruning decisive ones"
    }

    fn propose(
        &self,
        query: &IntermediateQuery,
        focus: NodeId,
        metadata: &DbMetadata,
    ) -> OnticResult<Option<QueryOptimizationProposal>> {
        let node = query.node(focus)?;
        let Some(condition) = node.condition() else {
            return Ok(None);
        };

        // A join condition only sees matching rows, so both sides count.
        let non_null: BTreeSet<Variable> = query
            .get_children(focus)
            .iter()
            .flat_map(|child| non_null_variables(query, *child, metadata))
            .collect();

        let proposal = match evaluate(condition, &non_null) {
            EvaluationResult::IsTrue => QueryOptimizationProposal::UpdateCondition {
                focus,
                condition: None,
            },
            result if result.rejects_all() => match node {
                QueryNode::LeftJoin(_) => QueryOptimizationProposal::DropRightArgument { focus },
                _ => QueryOptimizationProposal::DeclareEmpty { focus },
            },
            EvaluationResult::Simplified(simplified) if simplified != *condition => {
                QueryOptimizationProposal::UpdateCondition {
                    focus,
                    condition: Some(simplified),
                }
            }
            _ => {
                trace!("condition of {focus} cannot be simplified");
                return Ok(None);
            }
        };
        Ok(Some(proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_utils::{builder, leaf, metadata};
    use ontic_core::{ImmutableExpression, Term};
    use ontic_iq::{FilterNode, InnerJoinNode, LeftJoinNode};

    fn filtered(relation: &str, condition: ImmutableExpression) -> (IntermediateQuery, NodeId) {
        let (mut builder, root) = builder("ans", &["x"]);
        let filter = builder.add_child(root, FilterNode::new(condition)).unwrap();
        builder.add_child(filter, leaf(relation, &["x"])).unwrap();
        (builder.build().unwrap(), filter)
    }

    #[test]
    fn test_true_condition_is_dropped() {
        let (query, filter) = filtered("Code", ImmutableExpression::is_not_null(Term::var("x")));
        let proposal = BooleanExpressionSimplification
            .propose(&query, filter, &metadata())
            .unwrap();
        assert_eq!(
            proposal,
            Some(QueryOptimizationProposal::UpdateCondition {
                focus: filter,
                condition: None
            })
        );
    }

    #[test]
    fn test_false_filter_declares_empty() {
        let (query, filter) = filtered("Code", ImmutableExpression::is_null(Term::var("x")));
        let proposal = BooleanExpressionSimplification
            .propose(&query, filter, &metadata())
            .unwrap();
        assert_eq!(
            proposal,
            Some(QueryOptimizationProposal::DeclareEmpty { focus: filter })
        );
    }

    #[test]
    fn test_nullable_column_keeps_condition() {
        let (query, filter) = filtered("Label", ImmutableExpression::is_not_null(Term::var("x")));
        let proposal = BooleanExpressionSimplification
            .propose(&query, filter, &metadata())
            .unwrap();
        assert_eq!(proposal, None);
    }

    #[test]
    fn test_simplified_join_condition() {
        let condition = ImmutableExpression::conjunction([
            ImmutableExpression::is_not_null(Term::var("x")),
            ImmutableExpression::eq(Term::var("x"), Term::var("y")),
        ])
        .unwrap();
        let (mut builder, root) = builder("ans", &["x", "y"]);
        let join = builder
            .add_child(root, InnerJoinNode::new(Some(condition)))
            .unwrap();
        builder.add_child(join, leaf("Code", &["x"])).unwrap();
        builder.add_child(join, leaf("Label", &["y"])).unwrap();
        let query = builder.build().unwrap();

        let proposal = BooleanExpressionSimplification
            .propose(&query, join, &metadata())
            .unwrap();
        assert_eq!(
            proposal,
            Some(QueryOptimizationProposal::UpdateCondition {
                focus: join,
                condition: Some(ImmutableExpression::eq(Term::var("x"), Term::var("y"))),
            })
        );
    }

    #[test]
    fn test_rejected_left_join_condition_drops_right() {
        let (mut builder, root) = builder("ans", &["x", "y"]);
        let condition = ImmutableExpression::is_null(Term::var("y"));
        let lj = builder
            .add_child(root, LeftJoinNode::new(Some(condition)))
            .unwrap();
        builder.add_child(lj, leaf("Label", &["x"])).unwrap();
        builder.add_child(lj, leaf("Code", &["y"])).unwrap();
        let query = builder.build().unwrap();

        let proposal = BooleanExpressionSimplification
            .propose(&query, lj, &metadata())
            .unwrap();
        assert_eq!(
            proposal,
            Some(QueryOptimizationProposal::DropRightArgument { focus: lj })
        );
    }

    #[test]
    fn test_ignores_nodes_without_condition() {
        let (query, filter) = filtered("Code", ImmutableExpression::is_null(Term::var("x")));
        let root = query.root();
        assert!(BooleanExpressionSimplification
            .propose(&query, root, &metadata())
            .unwrap()
            .is_none());
        let leaf = query.get_first_child(filter).unwrap();
        assert!(BooleanExpressionSimplification
            .propose(&query, leaf, &metadata())
            .unwrap()
            .is_none());
    }
}
