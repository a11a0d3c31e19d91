//! Structural comparison of query trees.

use crate::node::NodeId;
use crate::query::IntermediateQuery;

impl IntermediateQuery {
    /// Whether both trees have the same head and, from the root down, the
    /// same node values with children in the same order. Node handles are
    /// not compared.
    pub fn is_syntactically_equivalent(&self, other: &IntermediateQuery) -> bool {
        self.projection_atom() == other.projection_atom()
            && subtrees_equivalent(self, self.root(), other, other.root())
    }
}

fn subtrees_equivalent(
    left: &IntermediateQuery,
    left_id: NodeId,
    right: &IntermediateQuery,
    right_id: NodeId,
) -> bool {
    let left_children = left.get_children(left_id);
    let right_children = right.get_children(right_id);
    left.get_node(left_id) == right.get_node(right_id)
        && left_children.len() == right_children.len()
        && left_children
            .iter()
            .zip(right_children)
            .all(|(l, r)| subtrees_equivalent(left, *l, right, *r))
}
