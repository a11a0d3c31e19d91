//! Left join to inner join.
//!
//! When the left leaf references the right leaf through a foreign key on
//! non-null columns, and the two share exactly the referenced key, every
//! left row has exactly one match and the optional side is never padded.

use common_error::OnticResult;
use ontic_core::DbMetadata;
use ontic_iq::{IntermediateQuery, NodeId, QueryNode, QueryOptimizationProposal};

use super::rule::NodeCentricRule;
use crate::analysis::{extensional_pair, foreign_key_matches, ArgumentShape};

/// Rule that strengthens left joins which always match.
pub struct LeftToInnerJoin;

impl NodeCentricRule for LeftToInnerJoin {
    fn name(&self) -> &'static str {
        "LeftToInnerJoin"
    }

    fn description(&self) -> &'static str {
        "Turn left joins that always match into inner joins"
    }

    fn propose(
        &self,
        query: &IntermediateQuery,
        focus: NodeId,
        metadata: &DbMetadata,
    ) -> OnticResult<Option<QueryOptimizationProposal>> {
        let QueryNode::LeftJoin(lj) = query.node(focus)? else {
            return Ok(None);
        };
        if lj.condition().is_some() {
            return Ok(None);
        }
        let Some(((_, left), (_, right))) = extensional_pair(query, focus) else {
            return Ok(None);
        };
        let Some(shape) = ArgumentShape::of(right, &left.variables()) else {
            return Ok(None);
        };

        let non_null = metadata.non_null_variables(left);
        let always_matches = metadata
            .foreign_keys_between(left.predicate().name(), right.predicate().name())
            .any(|fk| {
                foreign_key_matches(fk, left, right, &shape.shared_columns)
                    && fk
                        .source_columns()
                        .iter()
                        .all(|c| left.column(*c).is_some_and(|t| t.is_non_null(&non_null)))
            });

        Ok(always_matches.then_some(QueryOptimizationProposal::LeftJoinToInnerJoin { focus }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_utils::{builder, leaf, metadata};
    use ontic_core::{ImmutableExpression, Term};
    use ontic_iq::LeftJoinNode;

    #[test]
    fn test_non_null_reference_strengthens() {
        let (mut builder, root) = builder("ans", &["e", "d", "n"]);
        let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
        builder.add_child(lj, leaf("Emp", &["e", "d"])).unwrap();
        builder.add_child(lj, leaf("Dept", &["d", "n"])).unwrap();
        let query = builder.build().unwrap();

        assert_eq!(
            LeftToInnerJoin.propose(&query, lj, &metadata()).unwrap(),
            Some(QueryOptimizationProposal::LeftJoinToInnerJoin { focus: lj })
        );
    }

    #[test]
    fn test_reverse_reference_declines() {
        let (mut builder, root) = builder("ans", &["e", "d", "n"]);
        let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
        builder.add_child(lj, leaf("Dept", &["d", "n"])).unwrap();
        builder.add_child(lj, leaf("Emp", &["e", "d"])).unwrap();
        let query = builder.build().unwrap();

        assert!(LeftToInnerJoin.propose(&query, lj, &metadata()).unwrap().is_none());
    }

    #[test]
    fn test_condition_declines() {
        let (mut builder, root) = builder("ans", &["e", "d", "n"]);
        let condition = ImmutableExpression::is_not_null(Term::var("n"));
        let lj = builder
            .add_child(root, LeftJoinNode::new(Some(condition)))
            .unwrap();
        builder.add_child(lj, leaf("Emp", &["e", "d"])).unwrap();
        builder.add_child(lj, leaf("Dept", &["d", "n"])).unwrap();
        let query = builder.build().unwrap();

        assert!(LeftToInnerJoin.propose(&query, lj, &metadata()).unwrap().is_none());
    }
}
