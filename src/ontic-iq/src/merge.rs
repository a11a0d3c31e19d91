//! Grafting sub-queries onto intensional leaves.

use common_error::{OnticError, OnticResult};
use ontic_core::substitution::unify_term_pairs;
use ontic_core::{Substitution, Variable};

use crate::node::{
    ConstructionNode, ExtensionalDataNode, FilterNode, InnerJoinNode, IntensionalDataNode,
    LeftJoinNode, NodeId, QueryNode, UnionNode,
};
use crate::propagation::{Descent, TreeState};
use crate::query::IntermediateQuery;

impl IntermediateQuery {
    /// Replace every intensional leaf over the head predicate of `sub` by a
    /// copy of `sub`, renamed apart and unified with the leaf arguments.
    ///
    /// Fails with `QueryMerging`, leaving this query unchanged, when no leaf
    /// matches, when arities differ or when the result is invalid.
    pub fn merge_sub_query(&mut self, sub: &IntermediateQuery) -> OnticResult<()> {
        let head = sub.projection_atom().predicate();
        let targets: Vec<NodeId> = self
            .nodes_top_down()
            .iter()
            .copied()
            .filter(|n| {
                matches!(
                    self.get_node(*n),
                    Some(QueryNode::IntensionalData(leaf)) if leaf.atom().predicate() == head
                )
            })
            .collect();
        if targets.is_empty() {
            return Err(OnticError::query_merging(format!(
                "no intensional node over {head} to merge into"
            )));
        }

        let mut working = self.clone();
        for target in targets {
            working.merge_at(target, sub)?;
        }
        working
            .validate()
            .map_err(|e| OnticError::query_merging(format!("merging {head}: {e}")))?;
        log::debug!("merged sub-query {}", sub.projection_atom());
        *self = working;
        Ok(())
    }

    fn merge_at(&mut self, target: NodeId, sub: &IntermediateQuery) -> OnticResult<()> {
        let QueryNode::IntensionalData(leaf) = self.node(target)?.clone() else {
            return Err(OnticError::internal(format!("{target} is not an intensional node")));
        };
        let head = sub.projection_atom();
        if leaf.atom().arguments().len() != head.variables().len() {
            return Err(OnticError::query_merging(format!(
                "{} does not match the arity of {head}",
                leaf.atom()
            )));
        }

        let sub_variables = sub.known_variables();
        let generator = self.generator_mut();
        generator.register_all(sub_variables.iter().cloned());
        let renaming = generator.rename_apart(sub_variables.iter());

        let copy = self.graft_copy(target, sub, sub.root())?;
        for id in std::iter::once(copy).chain(self.get_subtree_top_down(copy)) {
            let renamed = rename_node(self.node(id)?, &renaming)?;
            self.replace_node(id, renamed)?;
        }

        let pairs = head
            .variables()
            .iter()
            .map(|v| renaming.apply_to_variable(v))
            .zip(leaf.atom().arguments().iter().cloned());
        let sigma = unify_term_pairs(pairs, &leaf.atom().variables()).ok_or_else(|| {
            OnticError::query_merging(format!("cannot unify {head} with {}", leaf.atom()))
        })?;

        let descent = self
            .propagate_down(copy, &sigma)
            .map_err(|e| OnticError::query_merging(e.to_string()))?;
        if let Descent::Empty(occupant) = descent {
            if self.propagate_empty(occupant)? == TreeState::Empty {
                return Err(OnticError::query_merging(format!(
                    "merging {head} proves the query empty"
                )));
            }
        }
        Ok(())
    }
}

fn rename_variable(renaming: &Substitution, variable: &Variable) -> OnticResult<Variable> {
    renaming
        .apply_to_variable(variable)
        .as_variable()
        .cloned()
        .ok_or_else(|| OnticError::internal(format!("{renaming} is not a renaming")))
}

/// Rename every variable of a node.
fn rename_node(node: &QueryNode, renaming: &Substitution) -> OnticResult<QueryNode> {
    let renamed = match node {
        QueryNode::Construction(c) => {
            let projection = c
                .projection()
                .iter()
                .map(|v| rename_variable(renaming, v))
                .collect::<OnticResult<Vec<_>>>()?;
            let definitions = c
                .substitution()
                .iter()
                .map(|(v, t)| Ok((rename_variable(renaming, v)?, renaming.apply_to_term(t))))
                .collect::<OnticResult<Substitution>>()?;
            ConstructionNode::new(projection, definitions)?.into()
        }
        QueryNode::Union(u) => UnionNode::new(
            u.projected_variables()
                .iter()
                .map(|v| rename_variable(renaming, v))
                .collect::<OnticResult<Vec<_>>>()?,
        )
        .into(),
        QueryNode::Filter(f) => FilterNode::new(renaming.apply_to_expression(f.condition())).into(),
        QueryNode::InnerJoin(j) => {
            InnerJoinNode::new(j.condition().map(|c| renaming.apply_to_expression(c))).into()
        }
        QueryNode::LeftJoin(lj) => {
            LeftJoinNode::new(lj.condition().map(|c| renaming.apply_to_expression(c))).into()
        }
        QueryNode::ExtensionalData(n) => ExtensionalDataNode::new(
            renaming
                .apply_to_atom(n.atom())
                .ok_or_else(|| OnticError::internal(format!("cannot rename {n}")))?,
        )
        .into(),
        QueryNode::IntensionalData(n) => IntensionalDataNode::new(
            renaming
                .apply_to_atom(n.atom())
                .ok_or_else(|| OnticError::internal(format!("cannot rename {n}")))?,
        )
        .into(),
    };
    Ok(renamed)
}
