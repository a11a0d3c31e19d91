//! Optimization proposals and their execution.
//!
//! A rule inspects the tree and emits a [`QueryOptimizationProposal`];
//! [`IntermediateQuery::apply_proposal`] executes it on a copy of the tree
//! and installs the copy only if it still satisfies every invariant.

use std::fmt;

use common_error::{proposal_err, OnticError, OnticResult};
use ontic_core::{ImmutableExpression, Substitution};
use serde::{Deserialize, Serialize};

use crate::node::{ArgumentPosition, FilterNode, InnerJoinNode, NodeId, QueryNode};
use crate::propagation::{Descent, TreeState};
use crate::query::IntermediateQuery;

/// A tree transformation targeting a focus node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOptimizationProposal {
    /// The bindings hold at the output of `focus`: push them into its
    /// subtree and lift the resulting change through its ancestors.
    SubstitutionPropagation {
        focus: NodeId,
        substitution: Substitution,
    },
    /// Replace a join by one of its children, then lift `ascending`.
    ReplaceByChild {
        focus: NodeId,
        child: NodeId,
        ascending: Substitution,
    },
    /// Remove children of an inner join. The substitution is pushed into
    /// the remaining children and lifted through the ancestors.
    RemoveJoinChildren {
        focus: NodeId,
        removed: Vec<NodeId>,
        substitution: Substitution,
    },
    /// Replace the condition of a filter or join. A filter without
    /// condition is removed.
    UpdateCondition {
        focus: NodeId,
        condition: Option<ImmutableExpression>,
    },
    /// The subtree at `focus` yields no row.
    DeclareEmpty { focus: NodeId },
    /// The right side of a left join always matches.
    LeftJoinToInnerJoin { focus: NodeId },
    /// The right side of a left join never matches.
    DropRightArgument { focus: NodeId },
}

impl QueryOptimizationProposal {
    /// The node the proposal targets.
    pub fn focus(&self) -> NodeId {
        match self {
            Self::SubstitutionPropagation { focus, .. }
            | Self::ReplaceByChild { focus, .. }
            | Self::RemoveJoinChildren { focus, .. }
            | Self::UpdateCondition { focus, .. }
            | Self::DeclareEmpty { focus }
            | Self::LeftJoinToInnerJoin { focus }
            | Self::DropRightArgument { focus } => *focus,
        }
    }

    /// Short name of the transformation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubstitutionPropagation { .. } => "SubstitutionPropagation",
            Self::ReplaceByChild { .. } => "ReplaceByChild",
            Self::RemoveJoinChildren { .. } => "RemoveJoinChildren",
            Self::UpdateCondition { .. } => "UpdateCondition",
            Self::DeclareEmpty { .. } => "DeclareEmpty",
            Self::LeftJoinToInnerJoin { .. } => "LeftJoinToInnerJoin",
            Self::DropRightArgument { .. } => "DropRightArgument",
        }
    }
}

impl fmt::Display for QueryOptimizationProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.name(), self.focus())?;
        match self {
            Self::SubstitutionPropagation { substitution, .. } => write!(f, ", {substitution}")?,
            Self::ReplaceByChild {
                child, ascending, ..
            } => write!(f, ", {child}, {ascending}")?,
            Self::RemoveJoinChildren {
                removed,
                substitution,
                ..
            } => {
                let removed: Vec<String> = removed.iter().map(NodeId::to_string).collect();
                write!(f, ", [{}], {substitution}", removed.join(","))?
            }
            Self::UpdateCondition {
                condition: Some(c), ..
            } => write!(f, ", {c}")?,
            _ => {}
        }
        write!(f, ")")
    }
}

/// Outcome of a successfully applied proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalResults {
    /// The tree was updated. `focus` is the node now standing where the
    /// focus was, if any.
    Applied { focus: Option<NodeId> },
    /// The query yields no row. The tree is left untouched.
    EmptyQuery,
}

impl IntermediateQuery {
    /// Apply a proposal.
    ///
    /// The proposal runs on a copy of the tree. If it fails, or if the
    /// result breaks a structural invariant, an `InvalidOptimizationProposal`
    /// error is returned and this tree is unchanged.
    pub fn apply_proposal(
        &mut self,
        proposal: &QueryOptimizationProposal,
    ) -> OnticResult<ProposalResults> {
        let mut working = self.clone();
        let results = working.execute(proposal).map_err(|e| {
            if e.is_invalid_proposal() {
                e
            } else {
                OnticError::invalid_proposal(format!("{proposal}: {e}"))
            }
        })?;

        if results == ProposalResults::EmptyQuery {
            log::debug!("{proposal} proves the query empty");
            return Ok(results);
        }

        working.validate().map_err(|e| {
            OnticError::invalid_proposal(format!("{proposal} breaks the tree: {e}"))
        })?;
        log::debug!("applied {proposal}");
        *self = working;
        Ok(results)
    }

    fn execute(&mut self, proposal: &QueryOptimizationProposal) -> OnticResult<ProposalResults> {
        let focus = proposal.focus();
        if !self.contains(focus) {
            proposal_err!("focus {focus} is not part of the query");
        }

        match proposal {
            QueryOptimizationProposal::SubstitutionPropagation { substitution, .. } => {
                let before = self.projected_variables(focus);
                let sigma = substitution.restrict_to(&before);
                match self.propagate_down(focus, &sigma)? {
                    Descent::Empty(occupant) => self.finish_empty(occupant),
                    Descent::Node(occupant) => {
                        let state = self.propagate_up(occupant, sigma)?;
                        Ok(self.finish(state, occupant))
                    }
                }
            }

            QueryOptimizationProposal::ReplaceByChild {
                child, ascending, ..
            } => {
                match self.node(focus)? {
                    QueryNode::InnerJoin(_) => {}
                    QueryNode::LeftJoin(_) => {
                        if self.get_optional_position(*child) != Some(ArgumentPosition::Left) {
                            proposal_err!(
                                "left join {focus} can only be replaced by its left child"
                            );
                        }
                    }
                    other => proposal_err!("cannot replace a {} node by a child", other.name()),
                }
                let sigma = ascending.restrict_to(&self.projected_variables(focus));
                self.replace_by_child(focus, *child)?;
                let state = self.propagate_up(*child, sigma)?;
                Ok(self.finish(state, *child))
            }

            QueryOptimizationProposal::RemoveJoinChildren {
                removed,
                substitution,
                ..
            } => self.remove_join_children(focus, removed, substitution),

            QueryOptimizationProposal::UpdateCondition { condition, .. } => {
                let is_filter = matches!(self.node(focus)?, QueryNode::Filter(_));
                if is_filter && condition.is_none() {
                    let child = self.get_first_child(focus).ok_or_else(|| {
                        OnticError::invalid_proposal(format!("filter {focus} has no child"))
                    })?;
                    self.replace_by_child(focus, child)?;
                    return Ok(ProposalResults::Applied { focus: Some(child) });
                }
                let updated = self
                    .node(focus)?
                    .with_condition(condition.clone())
                    .map_err(|e| OnticError::invalid_proposal(e.to_string()))?;
                self.replace_node(focus, updated)?;
                Ok(ProposalResults::Applied { focus: Some(focus) })
            }

            QueryOptimizationProposal::DeclareEmpty { .. } => self.finish_empty(focus),

            QueryOptimizationProposal::LeftJoinToInnerJoin { .. } => {
                let QueryNode::LeftJoin(lj) = self.node(focus)? else {
                    proposal_err!("{focus} is not a left join");
                };
                let join = InnerJoinNode::new(lj.condition().cloned());
                self.replace_node(focus, join.into())?;
                Ok(ProposalResults::Applied { focus: Some(focus) })
            }

            QueryOptimizationProposal::DropRightArgument { .. } => {
                let occupant = self.drop_right_argument(focus)?;
                Ok(ProposalResults::Applied {
                    focus: Some(occupant),
                })
            }
        }
    }

    fn remove_join_children(
        &mut self,
        focus: NodeId,
        removed: &[NodeId],
        substitution: &Substitution,
    ) -> OnticResult<ProposalResults> {
        let QueryNode::InnerJoin(join) = self.node(focus)?.clone() else {
            proposal_err!("{focus} is not an inner join");
        };
        let children = self.get_children(focus).to_vec();
        if removed.is_empty() || removed.iter().any(|r| !children.contains(r)) {
            proposal_err!("{focus} does not have all the children to remove");
        }
        if removed.len() >= children.len() {
            proposal_err!("cannot remove every child of {focus}");
        }

        let sigma = substitution.restrict_to(&self.projected_variables(focus));
        for child in removed {
            self.remove_subtree(*child)?;
        }

        let condition = join.condition().map(|c| sigma.apply_to_expression(c));
        self.replace_node(focus, InnerJoinNode::new(condition.clone()).into())?;
        for child in self.get_children(focus).to_vec() {
            if let Descent::Empty(_) = self.propagate_down(child, &sigma)? {
                return self.finish_empty(focus);
            }
        }

        let occupant = match self.get_children(focus).to_vec().as_slice() {
            [only] => match condition {
                Some(c) => {
                    self.replace_node(focus, FilterNode::new(c).into())?;
                    focus
                }
                None => {
                    self.replace_by_child(focus, *only)?;
                    *only
                }
            },
            _ => focus,
        };
        let state = self.propagate_up(occupant, sigma)?;
        Ok(self.finish(state, occupant))
    }

    fn finish(&self, state: TreeState, occupant: NodeId) -> ProposalResults {
        match state {
            TreeState::Empty => ProposalResults::EmptyQuery,
            TreeState::NonEmpty => ProposalResults::Applied {
                focus: self.contains(occupant).then_some(occupant),
            },
        }
    }

    fn finish_empty(&mut self, occupant: NodeId) -> OnticResult<ProposalResults> {
        match self.propagate_empty(occupant)? {
            TreeState::Empty => Ok(ProposalResults::EmptyQuery),
            TreeState::NonEmpty => Ok(ProposalResults::Applied { focus: None }),
        }
    }
}
