//! Substitution propagation.
//!
//! A descending substitution states bindings that hold at the output of a
//! node: it is pushed into the node and its subtree, and the node stops
//! projecting the bound variables (except the root, whose schema is fixed).
//! An ascending substitution describes how the output of a child changed:
//! each ancestor re-derives itself until a construction node absorbs it.
//!
//! Empty subtrees are removed bottom-up; a query whose root becomes empty
//! is reported as such rather than as an error.

use std::collections::BTreeSet;

use common_error::{proposal_err, OnticError, OnticResult};
use ontic_core::substitution::unify_term_pairs;
use ontic_core::{evaluate, EvaluationResult, ImmutableExpression, Substitution, Term, Variable};

use crate::node::{
    ArgumentPosition, ConstructionNode, ExtensionalDataNode, FilterNode, InnerJoinNode,
    IntensionalDataNode, LeftJoinNode, NodeId, QueryNode, UnionNode,
};
use crate::query::IntermediateQuery;

/// Result of pushing a substitution into a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Descent {
    /// The subtree survived; the handle now occupying its position.
    Node(NodeId),
    /// The subtree yields no row; the handle occupying its position.
    Empty(NodeId),
}

/// State of the whole tree after a propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeState {
    NonEmpty,
    Empty,
}

enum ConditionUpdate {
    Rejected,
    Condition(Option<ImmutableExpression>),
}

/// Apply `substitution` to an optional condition and evaluate the result.
fn rewrite_condition(
    substitution: &Substitution,
    condition: Option<&ImmutableExpression>,
) -> ConditionUpdate {
    let Some(condition) = condition else {
        return ConditionUpdate::Condition(None);
    };
    let condition = substitution.apply_to_expression(condition);
    match evaluate(&condition, &BTreeSet::new()) {
        r if r.rejects_all() => ConditionUpdate::Rejected,
        EvaluationResult::IsTrue => ConditionUpdate::Condition(None),
        EvaluationResult::Simplified(e) => ConditionUpdate::Condition(Some(e)),
        _ => ConditionUpdate::Condition(Some(condition)),
    }
}

impl IntermediateQuery {
    fn child_at(&self, id: NodeId, index: usize) -> OnticResult<NodeId> {
        self.get_children(id).get(index).copied().ok_or_else(|| {
            OnticError::invalid_proposal(format!("{id} has no child at index {index}"))
        })
    }

    // -------------------------------------------------------------------------
    // Descending
    // -------------------------------------------------------------------------

    /// Push `substitution` into the subtree rooted at `id`.
    pub(crate) fn propagate_down(
        &mut self,
        id: NodeId,
        substitution: &Substitution,
    ) -> OnticResult<Descent> {
        let sigma = substitution.restrict_to(&self.projected_variables(id));
        if sigma.is_empty() {
            return Ok(Descent::Node(id));
        }
        log::trace!("descending {sigma} into {id}");

        match self.node(id)?.clone() {
            QueryNode::Construction(c) => self.descend_construction(id, &c, &sigma),
            QueryNode::Filter(f) => self.descend_filter(id, &f, &sigma),
            QueryNode::InnerJoin(j) => self.descend_inner_join(id, j.condition(), &sigma),
            QueryNode::LeftJoin(lj) => self.descend_left_join(id, &lj, &sigma),
            QueryNode::Union(u) => self.descend_union(id, &u, &sigma),
            QueryNode::ExtensionalData(n) => {
                let atom = sigma.apply_to_atom(n.atom()).ok_or_else(|| {
                    OnticError::invalid_proposal(format!("{sigma} places a compound term in {n}"))
                })?;
                self.replace_node(id, ExtensionalDataNode::new(atom).into())?;
                Ok(Descent::Node(id))
            }
            QueryNode::IntensionalData(n) => {
                let atom = sigma.apply_to_atom(n.atom()).ok_or_else(|| {
                    OnticError::invalid_proposal(format!("{sigma} places a compound term in {n}"))
                })?;
                self.replace_node(id, IntensionalDataNode::new(atom).into())?;
                Ok(Descent::Node(id))
            }
        }
    }

    fn descend_construction(
        &mut self,
        id: NodeId,
        node: &ConstructionNode,
        sigma: &Substitution,
    ) -> OnticResult<Descent> {
        let child = self.child_at(id, 0)?;

        // Each bound output must agree with its definition over the child.
        let pairs = sigma.iter().map(|(v, t)| (node.definition(v), t.clone()));
        let Some(tau) = unify_term_pairs(pairs, &sigma.range_variables()) else {
            return Ok(Descent::Empty(id));
        };

        let projection = if id == self.root() {
            node.projection().to_vec()
        } else {
            let mut projection: Vec<Variable> = Vec::new();
            for v in node.projection() {
                let outputs = match sigma.get(v) {
                    Some(t) => t.variables().into_iter().collect(),
                    None => vec![v.clone()],
                };
                for w in outputs {
                    if !projection.contains(&w) {
                        projection.push(w);
                    }
                }
            }
            projection
        };

        let definitions: Substitution = projection
            .iter()
            .map(|v| (v.clone(), tau.apply_to_term(&node.definition(v))))
            .collect();
        let rebuilt = ConstructionNode::new(projection, definitions)
            .map_err(|e| OnticError::invalid_proposal(e.to_string()))?;
        self.replace_node(id, rebuilt.into())?;

        match self.propagate_down(child, &tau)? {
            Descent::Empty(_) => Ok(Descent::Empty(id)),
            Descent::Node(_) => Ok(Descent::Node(id)),
        }
    }

    fn descend_filter(
        &mut self,
        id: NodeId,
        node: &FilterNode,
        sigma: &Substitution,
    ) -> OnticResult<Descent> {
        let child = self.child_at(id, 0)?;
        match rewrite_condition(sigma, Some(node.condition())) {
            ConditionUpdate::Rejected => return Ok(Descent::Empty(id)),
            ConditionUpdate::Condition(None) => {
                self.replace_by_child(id, child)?;
                return self.propagate_down(child, sigma);
            }
            ConditionUpdate::Condition(Some(c)) => {
                self.replace_node(id, FilterNode::new(c).into())?
            }
        }
        match self.propagate_down(child, sigma)? {
            Descent::Empty(_) => Ok(Descent::Empty(id)),
            Descent::Node(_) => Ok(Descent::Node(id)),
        }
    }

    fn descend_inner_join(
        &mut self,
        id: NodeId,
        condition: Option<&ImmutableExpression>,
        sigma: &Substitution,
    ) -> OnticResult<Descent> {
        match rewrite_condition(sigma, condition) {
            ConditionUpdate::Rejected => return Ok(Descent::Empty(id)),
            ConditionUpdate::Condition(c) => self.replace_node(id, InnerJoinNode::new(c).into())?,
        }
        for child in self.get_children(id).to_vec() {
            if let Descent::Empty(_) = self.propagate_down(child, sigma)? {
                return Ok(Descent::Empty(id));
            }
        }
        Ok(Descent::Node(id))
    }

    fn descend_left_join(
        &mut self,
        id: NodeId,
        node: &LeftJoinNode,
        sigma: &Substitution,
    ) -> OnticResult<Descent> {
        let left = self.child_at(id, ArgumentPosition::Left.index())?;
        let right = self.child_at(id, ArgumentPosition::Right.index())?;
        let left_vars = self.projected_variables(left);
        let right_vars = self.projected_variables(right);
        let right_only: BTreeSet<Variable> = right_vars.difference(&left_vars).cloned().collect();

        let mut strengthen = false;
        for (v, t) in sigma.iter() {
            if left_vars.contains(v) {
                if t.variables().iter().any(|w| right_only.contains(w)) {
                    proposal_err!("binding {v} -> {t} would capture a right-only variable of {id}");
                }
                continue;
            }
            match t {
                Term::Variable(w) if !left_vars.contains(w) && !right_vars.contains(w) => {}
                Term::Constant(c) if !c.is_null() => strengthen = true,
                _ => proposal_err!("cannot push {v} -> {t} into the optional side of {id}"),
            }
        }

        // A non-null value for a right-only variable proves the right side matched.
        if strengthen {
            log::trace!("left join {id} becomes an inner join");
            self.replace_node(id, InnerJoinNode::new(node.condition().cloned()).into())?;
            return self.descend_inner_join(id, node.condition(), sigma);
        }

        let never_matches = match rewrite_condition(sigma, node.condition()) {
            ConditionUpdate::Rejected => true,
            ConditionUpdate::Condition(c) => {
                self.replace_node(id, LeftJoinNode::new(c).into())?;
                false
            }
        };

        if let Descent::Empty(_) = self.propagate_down(left, sigma)? {
            return Ok(Descent::Empty(id));
        }
        let right_empty = matches!(self.propagate_down(right, sigma)?, Descent::Empty(_));
        if never_matches || right_empty {
            return self.drop_right_argument(id).map(Descent::Node);
        }
        Ok(Descent::Node(id))
    }

    fn descend_union(
        &mut self,
        id: NodeId,
        node: &UnionNode,
        sigma: &Substitution,
    ) -> OnticResult<Descent> {
        let projected: BTreeSet<Variable> = node
            .projected_variables()
            .iter()
            .flat_map(|v| sigma.apply_to_variable(v).variables())
            .collect();
        self.replace_node(id, UnionNode::new(projected).into())?;

        for child in self.get_children(id).to_vec() {
            if let Descent::Empty(occupant) = self.propagate_down(child, sigma)? {
                log::trace!("removing empty union child {occupant}");
                self.remove_subtree(occupant)?;
            }
        }

        match self.get_children(id).to_vec().as_slice() {
            [] => Ok(Descent::Empty(id)),
            [only] => {
                self.replace_by_child(id, *only)?;
                Ok(Descent::Node(*only))
            }
            _ => Ok(Descent::Node(id)),
        }
    }

    /// Replace a left join by its left child, binding the right-only
    /// variables to NULL.
    pub(crate) fn drop_right_argument(&mut self, id: NodeId) -> OnticResult<NodeId> {
        if !matches!(self.node(id)?, QueryNode::LeftJoin(_)) {
            proposal_err!("{id} is not a left join");
        }
        let left = self.child_at(id, ArgumentPosition::Left.index())?;
        let right = self.child_at(id, ArgumentPosition::Right.index())?;
        let left_vars = self.projected_variables(left);
        let projected = self.projected_variables(id);
        let nulls: Substitution = projected
            .difference(&left_vars)
            .map(|v| (v.clone(), Term::null()))
            .collect();

        log::trace!("dropping the right argument of {id}");
        if nulls.is_empty() {
            self.replace_by_child(id, left)?;
            return Ok(left);
        }
        self.remove_subtree(right)?;
        let construction = ConstructionNode::new(projected.into_iter().collect(), nulls)
            .map_err(|e| OnticError::invalid_proposal(e.to_string()))?;
        self.replace_node(id, construction.into())?;
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Ascending
    // -------------------------------------------------------------------------

    /// Propagate a change of the output of `from` to its ancestors.
    pub(crate) fn propagate_up(
        &mut self,
        from: NodeId,
        substitution: Substitution,
    ) -> OnticResult<TreeState> {
        let mut from = from;
        let mut sigma = substitution;
        loop {
            if sigma.is_empty() {
                return Ok(TreeState::NonEmpty);
            }
            let Some(parent) = self.get_parent(from) else {
                return Ok(TreeState::NonEmpty);
            };
            log::trace!("ascending {sigma} from {from} to {parent}");

            match self.node(parent)?.clone() {
                QueryNode::Construction(c) => return self.absorb(parent, &c, &sigma),
                QueryNode::Filter(f) => match rewrite_condition(&sigma, Some(f.condition())) {
                    ConditionUpdate::Rejected => return self.propagate_empty(parent),
                    ConditionUpdate::Condition(None) => self.replace_by_child(parent, from)?,
                    ConditionUpdate::Condition(Some(c)) => {
                        self.replace_node(parent, FilterNode::new(c).into())?;
                        from = parent;
                    }
                },
                QueryNode::InnerJoin(j) => {
                    match rewrite_condition(&sigma, j.condition()) {
                        ConditionUpdate::Rejected => return self.propagate_empty(parent),
                        ConditionUpdate::Condition(c) => {
                            self.replace_node(parent, InnerJoinNode::new(c).into())?
                        }
                    }
                    for sibling in self.get_children(parent).to_vec() {
                        if sibling == from {
                            continue;
                        }
                        if let Descent::Empty(_) = self.propagate_down(sibling, &sigma)? {
                            return self.propagate_empty(parent);
                        }
                    }
                    from = parent;
                }
                QueryNode::LeftJoin(lj) => match self.get_optional_position(from) {
                    Some(ArgumentPosition::Left) => {
                        let right = self.child_at(parent, ArgumentPosition::Right.index())?;
                        let never_matches = match rewrite_condition(&sigma, lj.condition()) {
                            ConditionUpdate::Rejected => true,
                            ConditionUpdate::Condition(c) => {
                                self.replace_node(parent, LeftJoinNode::new(c).into())?;
                                false
                            }
                        };
                        let right_empty =
                            matches!(self.propagate_down(right, &sigma)?, Descent::Empty(_));
                        from = if never_matches || right_empty {
                            self.drop_right_argument(parent)?
                        } else {
                            parent
                        };
                    }
                    _ => {
                        sigma = self.ascend_from_right(parent, &lj, &sigma)?;
                        from = parent;
                    }
                },
                QueryNode::Union(u) => {
                    // Re-project the union variables above the changed child.
                    let projection: Vec<Variable> =
                        u.projected_variables().iter().cloned().collect();
                    let definitions = sigma.restrict_to(u.projected_variables());
                    let construction = ConstructionNode::new(projection, definitions)
                        .map_err(|e| OnticError::invalid_proposal(e.to_string()))?;
                    self.insert_parent(from, construction.into())?;
                    return Ok(TreeState::NonEmpty);
                }
                QueryNode::ExtensionalData(_) | QueryNode::IntensionalData(_) => {
                    return Err(OnticError::internal(format!("leaf {parent} has a child")));
                }
            }
        }
    }

    /// The right child of a left join changed. Bindings of shared variables
    /// become join conditions; renamings of right-only variables continue
    /// upwards. Any other binding of a right-only variable only holds when
    /// the right side matches, so it stays below the join in a construction
    /// node above the right child. Returns the substitution to propagate
    /// further.
    fn ascend_from_right(
        &mut self,
        id: NodeId,
        node: &LeftJoinNode,
        sigma: &Substitution,
    ) -> OnticResult<Substitution> {
        let left = self.child_at(id, ArgumentPosition::Left.index())?;
        let right = self.child_at(id, ArgumentPosition::Right.index())?;
        let left_vars = self.projected_variables(left);

        let mut equalities = Vec::new();
        let mut upwards = Vec::new();
        let mut local = Vec::new();
        for (v, t) in sigma.iter() {
            if left_vars.contains(v) {
                equalities.push(ImmutableExpression::eq(v, t.clone()));
                continue;
            }
            match t.as_variable() {
                Some(w) if !left_vars.contains(w) => upwards.push((v.clone(), t.clone())),
                _ => local.push((v.clone(), t.clone())),
            }
        }

        if !local.is_empty() {
            let mut projection = self.projected_variables(right);
            projection.extend(local.iter().map(|(v, _)| v.clone()));
            let definitions: Substitution = local.into_iter().collect();
            log::trace!("keeping {definitions} on the optional side of {id}");
            let construction = ConstructionNode::new(projection.into_iter().collect(), definitions)
                .map_err(|e| OnticError::invalid_proposal(e.to_string()))?;
            self.insert_parent(right, construction.into())?;
        }

        let condition = ImmutableExpression::conjunction(
            node.condition()
                .map(|c| sigma.apply_to_expression(c))
                .into_iter()
                .chain(equalities),
        );
        self.replace_node(id, LeftJoinNode::new(condition).into())?;
        Ok(upwards.into_iter().collect())
    }

    /// A construction node absorbs the change of its child's output.
    /// Renamings to variables the node does not project are pushed back
    /// into the child so the child keeps the projected names.
    fn absorb(
        &mut self,
        id: NodeId,
        node: &ConstructionNode,
        sigma: &Substitution,
    ) -> OnticResult<TreeState> {
        let definitions: Vec<(Variable, Term)> = node
            .projection()
            .iter()
            .map(|v| (v.clone(), sigma.apply_to_term(&node.definition(v))))
            .collect();

        let projected = node.projected_variables();
        let mut claimed = BTreeSet::new();
        let mut renaming = Vec::new();
        for (v, t) in &definitions {
            if let Term::Variable(w) = t {
                if w != v && !projected.contains(w) && claimed.insert(w.clone()) {
                    renaming.push((w.clone(), Term::from(v)));
                }
            }
        }
        let renaming: Substitution = renaming.into_iter().collect();
        let definitions: Substitution = definitions
            .into_iter()
            .map(|(v, t)| (v, renaming.apply_to_term(&t)))
            .collect();

        let rebuilt = ConstructionNode::new(node.projection().to_vec(), definitions)
            .map_err(|e| OnticError::invalid_proposal(e.to_string()))?;
        self.replace_node(id, rebuilt.into())?;

        if !renaming.is_empty() {
            let child = self.child_at(id, 0)?;
            if let Descent::Empty(_) = self.propagate_down(child, &renaming)? {
                return self.propagate_empty(id);
            }
        }
        Ok(TreeState::NonEmpty)
    }

    // -------------------------------------------------------------------------
    // Emptiness
    // -------------------------------------------------------------------------

    /// Remove an empty subtree, collapsing ancestors that become empty too.
    pub(crate) fn propagate_empty(&mut self, id: NodeId) -> OnticResult<TreeState> {
        let mut current = id;
        loop {
            let Some(parent) = self.get_parent(current) else {
                log::debug!("query proven empty");
                return Ok(TreeState::Empty);
            };
            log::trace!("{current} is empty");
            match self.node(parent)? {
                QueryNode::Construction(_) | QueryNode::Filter(_) | QueryNode::InnerJoin(_) => {
                    current = parent;
                }
                QueryNode::LeftJoin(_) => match self.get_optional_position(current) {
                    Some(ArgumentPosition::Right) => {
                        self.drop_right_argument(parent)?;
                        return Ok(TreeState::NonEmpty);
                    }
                    _ => current = parent,
                },
                QueryNode::Union(_) => {
                    self.remove_subtree(current)?;
                    match self.get_children(parent).to_vec().as_slice() {
                        [] => current = parent,
                        [only] => {
                            self.replace_by_child(parent, *only)?;
                            return Ok(TreeState::NonEmpty);
                        }
                        _ => return Ok(TreeState::NonEmpty),
                    }
                }
                QueryNode::ExtensionalData(_) | QueryNode::IntensionalData(_) => {
                    return Err(OnticError::internal(format!("leaf {parent} has a child")));
                }
            }
        }
    }
}
