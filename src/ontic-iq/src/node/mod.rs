//! Query node kinds.
//!
//! Nodes are immutable values. A rewrite installs a new node value at the
//! same tree position instead of editing a node in place.

mod construction;
mod data;
mod filter;
mod join;
mod union;

use std::collections::BTreeSet;
use std::fmt;

use common_error::{OnticError, OnticResult};
use ontic_core::{ImmutableExpression, Variable};
use serde::{Deserialize, Serialize};

pub use construction::ConstructionNode;
pub use data::{ExtensionalDataNode, IntensionalDataNode};
pub use filter::FilterNode;
pub use join::{InnerJoinNode, LeftJoinNode};
pub use union::UnionNode;

/// Handle of a node inside one query tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw index of the node slot.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Position of a child under a left join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentPosition {
    /// The preserved side.
    Left,
    /// The optional side.
    Right,
}

impl ArgumentPosition {
    /// Index of this position in the children list.
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl fmt::Display for ArgumentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
        }
    }
}

/// A node of an intermediate query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryNode {
    /// Projection plus computed and renamed output variables.
    Construction(ConstructionNode),
    /// N-ary commutative join.
    InnerJoin(InnerJoinNode),
    /// Binary join keeping every row of its left child.
    LeftJoin(LeftJoinNode),
    /// N-ary union of schema-identical children.
    Union(UnionNode),
    /// Unary selection.
    Filter(FilterNode),
    /// Leaf over a base relation.
    ExtensionalData(ExtensionalDataNode),
    /// Leaf over a derived predicate, replaced when sub-queries are merged.
    IntensionalData(IntensionalDataNode),
}

impl QueryNode {
    /// Short name of the node kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Construction(_) => "CONSTRUCT",
            Self::InnerJoin(_) => "JOIN",
            Self::LeftJoin(_) => "LJ",
            Self::Union(_) => "UNION",
            Self::Filter(_) => "FILTER",
            Self::ExtensionalData(_) => "EXTENSIONAL",
            Self::IntensionalData(_) => "INTENSIONAL",
        }
    }

    /// Whether the node kind has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::ExtensionalData(_) | Self::IntensionalData(_))
    }

    /// Allowed number of children: minimum and optional maximum.
    pub fn arity_bounds(&self) -> (usize, Option<usize>) {
        match self {
            Self::Construction(_) | Self::Filter(_) => (1, Some(1)),
            Self::LeftJoin(_) => (2, Some(2)),
            Self::InnerJoin(_) | Self::Union(_) => (2, None),
            Self::ExtensionalData(_) | Self::IntensionalData(_) => (0, Some(0)),
        }
    }

    /// The boolean condition carried by the node, if any.
    pub fn condition(&self) -> Option<&ImmutableExpression> {
        match self {
            Self::Filter(n) => Some(n.condition()),
            Self::InnerJoin(n) => n.condition(),
            Self::LeftJoin(n) => n.condition(),
            _ => None,
        }
    }

    /// The same node with another condition.
    ///
    /// Only filters and joins carry conditions; a filter cannot lose it.
    pub fn with_condition(&self, condition: Option<ImmutableExpression>) -> OnticResult<Self> {
        match (self, condition) {
            (Self::Filter(_), Some(c)) => Ok(Self::Filter(FilterNode::new(c))),
            (Self::InnerJoin(_), c) => Ok(Self::InnerJoin(InnerJoinNode::new(c))),
            (Self::LeftJoin(_), c) => Ok(Self::LeftJoin(LeftJoinNode::new(c))),
            (node, _) => Err(OnticError::invalid_query(format!(
                "cannot set the condition of {}",
                node.name()
            ))),
        }
    }

    /// Variables mentioned by the node itself, excluding its children.
    pub fn local_variables(&self) -> BTreeSet<Variable> {
        match self {
            Self::Construction(n) => {
                let mut vars: BTreeSet<Variable> = n.projection().iter().cloned().collect();
                vars.extend(n.substitution().range_variables());
                vars
            }
            Self::Union(n) => n.projected_variables().clone(),
            Self::ExtensionalData(n) => n.atom().variables(),
            Self::IntensionalData(n) => n.atom().variables(),
            other => other
                .condition()
                .map(ImmutableExpression::variables)
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction(n) => write!(f, "{n}"),
            Self::InnerJoin(n) => write!(f, "{n}"),
            Self::LeftJoin(n) => write!(f, "{n}"),
            Self::Union(n) => write!(f, "{n}"),
            Self::Filter(n) => write!(f, "{n}"),
            Self::ExtensionalData(n) => write!(f, "{n}"),
            Self::IntensionalData(n) => write!(f, "{n}"),
        }
    }
}

impl From<ConstructionNode> for QueryNode {
    fn from(n: ConstructionNode) -> Self {
        Self::Construction(n)
    }
}

impl From<InnerJoinNode> for QueryNode {
    fn from(n: InnerJoinNode) -> Self {
        Self::InnerJoin(n)
    }
}

impl From<LeftJoinNode> for QueryNode {
    fn from(n: LeftJoinNode) -> Self {
        Self::LeftJoin(n)
    }
}

impl From<UnionNode> for QueryNode {
    fn from(n: UnionNode) -> Self {
        Self::Union(n)
    }
}

impl From<FilterNode> for QueryNode {
    fn from(n: FilterNode) -> Self {
        Self::Filter(n)
    }
}

impl From<ExtensionalDataNode> for QueryNode {
    fn from(n: ExtensionalDataNode) -> Self {
        Self::ExtensionalData(n)
    }
}

impl From<IntensionalDataNode> for QueryNode {
    fn from(n: IntensionalDataNode) -> Self {
        Self::IntensionalData(n)
    }
}

pub(crate) fn write_variables(
    f: &mut fmt::Formatter<'_>,
    vars: impl IntoIterator<Item = impl fmt::Display>,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in vars.into_iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontic_core::Term;

    #[test]
    fn test_with_condition() {
        let cond = ImmutableExpression::eq(Term::var("x"), Term::var("y"));
        let join = QueryNode::from(InnerJoinNode::new(None));
        let updated = join.with_condition(Some(cond.clone())).unwrap();
        assert_eq!(updated.condition(), Some(&cond));

        let filter = QueryNode::from(FilterNode::new(cond));
        assert!(filter.with_condition(None).is_err());

        let union = QueryNode::from(UnionNode::new([Variable::new("x")]));
        assert!(union.with_condition(None).is_err());
    }

    #[test]
    fn test_arity_bounds() {
        assert_eq!(QueryNode::from(LeftJoinNode::new(None)).arity_bounds(), (2, Some(2)));
        assert_eq!(QueryNode::from(InnerJoinNode::new(None)).arity_bounds(), (2, None));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(ArgumentPosition::Left.to_string(), "LEFT");
        assert_eq!(ArgumentPosition::Right.index(), 1);
    }
}
