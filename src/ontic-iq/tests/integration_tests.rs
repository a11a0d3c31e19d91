//! Integration tests for ontic-iq.

use common_error::OnticError;
use ontic_core::{
    DataAtom, ImmutableExpression, ProjectionAtom, RelationPredicate, Substitution, Term, Value,
    Variable,
};
use ontic_iq::{
    ArgumentPosition, ConstructionNode, ExtensionalDataNode, FilterNode, InnerJoinNode,
    IntensionalDataNode, IntermediateQuery, IntermediateQueryBuilder, LeftJoinNode, NodeId,
    ProposalResults, QueryNode, QueryOptimizationProposal, UnionNode,
};
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn vars(names: &[&str]) -> Vec<Variable> {
    names.iter().map(Variable::new).collect()
}

fn atom(relation: &str, args: Vec<Term>) -> DataAtom {
    DataAtom::new(RelationPredicate::new(relation, args.len()), args).unwrap()
}

fn leaf(relation: &str, args: &[&str]) -> ExtensionalDataNode {
    ExtensionalDataNode::new(atom(relation, args.iter().map(Term::var).collect()))
}

fn builder(head: &str, projected: &[&str]) -> (IntermediateQueryBuilder, NodeId) {
    let projection = vars(projected);
    let atom = ProjectionAtom::new(
        RelationPredicate::new(head, projection.len()),
        projection.clone(),
    )
    .unwrap();
    let mut builder = IntermediateQueryBuilder::new(atom);
    let root = builder
        .init(ConstructionNode::projecting(projection).unwrap())
        .unwrap();
    (builder, root)
}

fn substitution(pairs: &[(&str, Term)]) -> Substitution {
    pairs
        .iter()
        .map(|(v, t)| (Variable::new(v), t.clone()))
        .collect()
}

/// ans1(m,n,o) :- R(m,n,o1) LJ R(m,n1,o)
fn self_left_join() -> (IntermediateQuery, [NodeId; 4]) {
    let (mut builder, root) = builder("ans1", &["m", "n", "o"]);
    let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
    let left = builder
        .add_child_at(lj, leaf("R", &["m", "n", "o1"]), ArgumentPosition::Left)
        .unwrap();
    let right = builder
        .add_child_at(lj, leaf("R", &["m", "n1", "o"]), ArgumentPosition::Right)
        .unwrap();
    (builder.build().unwrap(), [root, lj, left, right])
}

// =============================================================================
// Builder and validation
// =============================================================================

#[test]
fn test_builder_rejects_third_left_join_child() {
    let (mut builder, root) = builder("ans", &["x"]);
    let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
    builder.add_child(lj, leaf("R", &["x"])).unwrap();
    builder.add_child(lj, leaf("S", &["x"])).unwrap();
    let err = builder.add_child(lj, leaf("T", &["x"])).unwrap_err();
    assert!(matches!(err, OnticError::InvalidQuery(_)));
}

#[test]
fn test_builder_rejects_child_of_leaf() {
    let (mut builder, root) = builder("ans", &["x"]);
    let r = builder.add_child(root, leaf("R", &["x"])).unwrap();
    assert!(builder.add_child(r, leaf("S", &["x"])).is_err());
}

#[test]
fn test_build_rejects_missing_projected_variable() {
    let (mut builder, root) = builder("ans", &["x", "y"]);
    builder.add_child(root, leaf("R", &["x"])).unwrap();
    assert!(matches!(builder.build(), Err(OnticError::InvalidQuery(_))));
}

#[test]
fn test_build_rejects_union_schema_mismatch() {
    let (mut builder, root) = builder("ans", &["x"]);
    let union = builder.add_child(root, UnionNode::new(vars(&["x"]))).unwrap();
    builder.add_child(union, leaf("R", &["x"])).unwrap();
    builder.add_child(union, leaf("S", &["x", "y"])).unwrap();
    assert!(builder.build().is_err());
}

#[test]
fn test_explain_shows_positions() {
    let (query, _) = self_left_join();
    let text = query.explain();
    assert!(text.starts_with("ans1(m,n,o)"));
    assert!(text.contains("[LEFT] R(m,n,o1)"));
    assert!(text.contains("[RIGHT] R(m,n1,o)"));
    assert_eq!(text, query.to_string());
}

// =============================================================================
// Proposals
// =============================================================================

#[test]
fn test_replace_left_join_by_left_child() {
    let (mut query, [_, lj, left, _]) = self_left_join();
    let proposal = QueryOptimizationProposal::ReplaceByChild {
        focus: lj,
        child: left,
        ascending: substitution(&[("n1", Term::var("n")), ("o", Term::var("o1"))]),
    };
    let results = query.apply_proposal(&proposal).unwrap();
    assert_eq!(results, ProposalResults::Applied { focus: Some(left) });

    let (mut expected, root) = builder("ans1", &["m", "n", "o"]);
    expected.add_child(root, leaf("R", &["m", "n", "o"])).unwrap();
    let expected = expected.build().unwrap();
    assert!(query.is_syntactically_equivalent(&expected), "{query}");
}

#[test]
fn test_replace_by_right_child_is_rejected() {
    let (mut query, [_, lj, _, right]) = self_left_join();
    let before = query.clone();
    let proposal = QueryOptimizationProposal::ReplaceByChild {
        focus: lj,
        child: right,
        ascending: Substitution::default(),
    };
    let err = query.apply_proposal(&proposal).unwrap_err();
    assert!(err.is_invalid_proposal());
    assert!(query.is_syntactically_equivalent(&before));
}

#[test]
fn test_unknown_focus_is_rejected() {
    let (mut query, [_, lj, left, _]) = self_left_join();
    query
        .apply_proposal(&QueryOptimizationProposal::ReplaceByChild {
            focus: lj,
            child: left,
            ascending: substitution(&[("o", Term::var("o1"))]),
        })
        .unwrap();
    let err = query
        .apply_proposal(&QueryOptimizationProposal::LeftJoinToInnerJoin { focus: lj })
        .unwrap_err();
    assert!(err.is_invalid_proposal());
}

#[test]
fn test_empty_right_argument_binds_null() {
    let (mut query, [root, lj, left, right]) = self_left_join();
    let results = query
        .apply_proposal(&QueryOptimizationProposal::DeclareEmpty { focus: right })
        .unwrap();
    assert_eq!(results, ProposalResults::Applied { focus: None });

    let Some(QueryNode::Construction(c)) = query.get_node(lj) else {
        panic!("expected a construction node at {lj}: {query}");
    };
    assert_eq!(c.definition(&Variable::new("o")), Term::null());
    assert_eq!(c.definition(&Variable::new("n1")), Term::null());
    assert_eq!(query.get_children(lj), &[left]);
    assert_eq!(query.get_children(root), &[lj]);
}

#[test]
fn test_left_join_to_inner_join() {
    let (mut query, [_, lj, left, right]) = self_left_join();
    query
        .apply_proposal(&QueryOptimizationProposal::LeftJoinToInnerJoin { focus: lj })
        .unwrap();
    assert!(matches!(query.get_node(lj), Some(QueryNode::InnerJoin(_))));
    assert_eq!(query.get_children(lj), &[left, right]);
    assert_eq!(query.get_optional_position(left), None);
}

#[test]
fn test_constant_on_optional_side_stays_below_join() {
    let (mut builder, root) = builder("ans", &["x", "y"]);
    let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
    builder.add_child(lj, leaf("A", &["x"])).unwrap();
    let right = builder.add_child(lj, leaf("R", &["x", "y"])).unwrap();
    let mut query = builder.build().unwrap();

    query
        .apply_proposal(&QueryOptimizationProposal::SubstitutionPropagation {
            focus: right,
            substitution: substitution(&[("y", Term::constant(5i64))]),
        })
        .unwrap();

    // y is 5 only when the right side matches; it must not reach the root.
    let construction = query.get_children(lj)[1];
    let Some(QueryNode::Construction(c)) = query.get_node(construction) else {
        panic!("expected a construction node above {right}: {query}");
    };
    assert_eq!(c.projection(), vars(&["x", "y"]).as_slice());
    assert_eq!(c.definition(&Variable::new("y")), Term::constant(5i64));
    assert_eq!(query.get_children(construction), &[right]);
    assert_eq!(
        query.get_optional_position(construction),
        Some(ArgumentPosition::Right)
    );
    assert_eq!(
        query.root_construction().unwrap().definition(&Variable::new("y")),
        Term::var("y")
    );
    assert!(query.validate().is_ok());
}

#[test]
fn test_constant_in_union_branch_gets_construction() {
    let (mut builder, root) = builder("ans", &["x"]);
    let union = builder.add_child(root, UnionNode::new(vars(&["x"]))).unwrap();
    let r = builder.add_child(union, leaf("R", &["x"])).unwrap();
    let s = builder.add_child(union, leaf("S", &["x"])).unwrap();
    let mut query = builder.build().unwrap();

    query
        .apply_proposal(&QueryOptimizationProposal::SubstitutionPropagation {
            focus: r,
            substitution: substitution(&[("x", Term::constant(1))]),
        })
        .unwrap();

    let children = query.get_children(union).to_vec();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1], s);
    let Some(QueryNode::Construction(c)) = query.get_node(children[0]) else {
        panic!("expected a construction above the rewritten branch: {query}");
    };
    assert_eq!(c.definition(&Variable::new("x")), Term::constant(1));
    assert_eq!(query.get_children(children[0]), &[r]);
    assert_eq!(
        query.get_node(r),
        Some(&QueryNode::from(ExtensionalDataNode::new(atom(
            "R",
            vec![Term::constant(1)]
        ))))
    );
}

#[test]
fn test_rejected_filter_empties_query() {
    let (mut builder, root) = builder("ans", &["x"]);
    let filter = builder
        .add_child(
            root,
            FilterNode::new(ImmutableExpression::eq(Term::var("x"), Term::constant(1))),
        )
        .unwrap();
    let r = builder.add_child(filter, leaf("R", &["x"])).unwrap();
    let mut query = builder.build().unwrap();
    let before = query.clone();

    let results = query
        .apply_proposal(&QueryOptimizationProposal::SubstitutionPropagation {
            focus: r,
            substitution: substitution(&[("x", Term::constant(2))]),
        })
        .unwrap();
    assert_eq!(results, ProposalResults::EmptyQuery);
    assert!(query.is_syntactically_equivalent(&before));
}

#[test]
fn test_satisfied_filter_is_removed() {
    let (mut builder, root) = builder("ans", &["x"]);
    let filter = builder
        .add_child(
            root,
            FilterNode::new(ImmutableExpression::eq(Term::var("x"), Term::constant(1))),
        )
        .unwrap();
    let r = builder.add_child(filter, leaf("R", &["x"])).unwrap();
    let mut query = builder.build().unwrap();

    query
        .apply_proposal(&QueryOptimizationProposal::SubstitutionPropagation {
            focus: r,
            substitution: substitution(&[("x", Term::constant(1))]),
        })
        .unwrap();
    assert!(!query.contains(filter));
    assert_eq!(query.get_children(root), &[r]);
}

#[test]
fn test_remove_join_children_unifies_remaining() {
    let (mut builder, root) = builder("ans", &["x", "y"]);
    let join = builder.add_child(root, InnerJoinNode::new(None)).unwrap();
    let left = builder.add_child(join, leaf("R", &["x", "y"])).unwrap();
    let right = builder.add_child(join, leaf("R", &["x", "z"])).unwrap();
    let mut query = builder.build().unwrap();

    let results = query
        .apply_proposal(&QueryOptimizationProposal::RemoveJoinChildren {
            focus: join,
            removed: vec![right],
            substitution: substitution(&[("z", Term::var("y"))]),
        })
        .unwrap();
    assert_eq!(results, ProposalResults::Applied { focus: Some(left) });
    assert!(!query.contains(join));
    assert_eq!(query.get_children(root), &[left]);
}

#[test]
fn test_update_condition_on_join() {
    let (mut builder, root) = builder("ans", &["x"]);
    let join = builder.add_child(root, InnerJoinNode::new(None)).unwrap();
    builder.add_child(join, leaf("R", &["x"])).unwrap();
    builder.add_child(join, leaf("S", &["x"])).unwrap();
    let mut query = builder.build().unwrap();

    let condition = ImmutableExpression::is_not_null(Term::var("x"));
    query
        .apply_proposal(&QueryOptimizationProposal::UpdateCondition {
            focus: join,
            condition: Some(condition.clone()),
        })
        .unwrap();
    assert_eq!(query.node(join).unwrap().condition(), Some(&condition));

    let foreign = ImmutableExpression::is_not_null(Term::var("w"));
    let err = query
        .apply_proposal(&QueryOptimizationProposal::UpdateCondition {
            focus: join,
            condition: Some(foreign),
        })
        .unwrap_err();
    assert!(err.is_invalid_proposal());
}

#[test]
fn test_proposal_serde_roundtrip() {
    let (_, [_, lj, left, _]) = self_left_join();
    let proposal = QueryOptimizationProposal::ReplaceByChild {
        focus: lj,
        child: left,
        ascending: substitution(&[("n1", Term::var("n"))]),
    };
    let json = serde_json::to_string(&proposal).unwrap();
    let back: QueryOptimizationProposal = serde_json::from_str(&json).unwrap();
    assert_eq!(back, proposal);
}

// =============================================================================
// Merging
// =============================================================================

fn definition_of_p() -> IntermediateQuery {
    let (mut builder, root) = builder("p", &["a", "b"]);
    builder.add_child(root, leaf("T", &["a", "b", "c"])).unwrap();
    builder.build().unwrap()
}

#[test]
fn test_merge_sub_query() {
    let (mut builder, root) = builder("ans", &["x", "y"]);
    let join = builder.add_child(root, InnerJoinNode::new(None)).unwrap();
    let intensional = IntensionalDataNode::new(atom("p", vec![Term::var("x"), Term::var("c")]));
    builder.add_child(join, intensional).unwrap();
    builder.add_child(join, leaf("S", &["c", "y"])).unwrap();
    let mut query = builder.build().unwrap();

    query.merge_sub_query(&definition_of_p()).unwrap();

    let leaves: Vec<&DataAtom> = query
        .nodes_top_down()
        .iter()
        .filter_map(|n| match query.get_node(*n) {
            Some(QueryNode::ExtensionalData(d)) => Some(d.atom()),
            _ => None,
        })
        .collect();
    assert_eq!(leaves.len(), 2);
    let t = leaves
        .iter()
        .find(|a| a.predicate().name() == "T")
        .expect("merged leaf");
    assert_eq!(t.arguments()[0], Term::var("x"));
    assert_eq!(t.arguments()[1], Term::var("c"));
    // The sub-query's own `c` was renamed apart from the outer `c`.
    assert_ne!(t.arguments()[2], Term::var("c"));
    assert!(query.validate().is_ok());
}

#[test]
fn test_merge_with_constant_argument() {
    let (mut builder, root) = builder("ans", &["x"]);
    let intensional = IntensionalDataNode::new(atom("p", vec![Term::var("x"), Term::constant(3)]));
    builder.add_child(root, intensional).unwrap();
    let mut query = builder.build().unwrap();

    query.merge_sub_query(&definition_of_p()).unwrap();
    let t = query
        .nodes_top_down()
        .iter()
        .find_map(|n| match query.get_node(*n) {
            Some(QueryNode::ExtensionalData(d)) => Some(d.atom().clone()),
            _ => None,
        })
        .expect("merged leaf");
    assert_eq!(t.arguments()[1], Term::Constant(Value::Int64(3)));
    assert_eq!(query.root_construction().unwrap().projection(), vars(&["x"]).as_slice());
}

#[test]
fn test_merge_without_target_fails() {
    let (mut builder, root) = builder("ans", &["x"]);
    builder.add_child(root, leaf("R", &["x"])).unwrap();
    let mut query = builder.build().unwrap();
    let err = query.merge_sub_query(&definition_of_p()).unwrap_err();
    assert!(matches!(err, OnticError::QueryMerging(_)));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn test_constant_binding_reaches_root(c in any::<i64>()) {
        let (mut builder, root) = builder("ans", &["x", "y"]);
        let r = builder.add_child(root, leaf("R", &["x", "y"])).unwrap();
        let mut query = builder.build().unwrap();

        let results = query
            .apply_proposal(&QueryOptimizationProposal::SubstitutionPropagation {
                focus: r,
                substitution: substitution(&[("x", Term::constant(c))]),
            })
            .unwrap();
        prop_assert_eq!(results, ProposalResults::Applied { focus: Some(r) });

        let construction = query.root_construction().unwrap();
        let expected = vars(&["x", "y"]);
        prop_assert_eq!(construction.projection(), expected.as_slice());
        prop_assert_eq!(construction.definition(&Variable::new("x")), Term::constant(c));
        prop_assert!(query.validate().is_ok());
    }

    #[test]
    fn test_rejected_proposal_keeps_tree(name in "[a-z]{1,3}") {
        let (mut query, [_, lj, _, right]) = self_left_join();
        let before = query.clone();
        let proposal = QueryOptimizationProposal::ReplaceByChild {
            focus: lj,
            child: right,
            ascending: substitution(&[(name.as_str(), Term::var("m"))]),
        };
        prop_assert!(query.apply_proposal(&proposal).is_err());
        prop_assert!(query.is_syntactically_equivalent(&before));
    }
}
