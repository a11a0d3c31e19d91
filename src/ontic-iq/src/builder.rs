//! Incremental construction of query trees.

use std::collections::BTreeMap;

use common_error::{OnticError, OnticResult};
use ontic_core::ProjectionAtom;

use crate::node::{ArgumentPosition, ConstructionNode, NodeId, QueryNode};
use crate::query::IntermediateQuery;

/// Builds an [`IntermediateQuery`] top-down, then validates it.
///
/// ```ignore
/// let mut builder = IntermediateQueryBuilder::new(projection_atom);
/// let root = builder.init(ConstructionNode::projecting(vars)?)?;
/// let lj = builder.add_child(root, LeftJoinNode::new(None))?;
/// builder.add_child_at(lj, left_leaf, ArgumentPosition::Left)?;
/// builder.add_child_at(lj, right_leaf, ArgumentPosition::Right)?;
/// let query = builder.build()?;
/// ```
#[derive(Debug)]
pub struct IntermediateQueryBuilder {
    projection_atom: ProjectionAtom,
    query: Option<IntermediateQuery>,
    positions: BTreeMap<NodeId, ArgumentPosition>,
}

impl IntermediateQueryBuilder {
    /// Start a query named by `projection_atom`.
    pub fn new(projection_atom: ProjectionAtom) -> Self {
        Self {
            projection_atom,
            query: None,
            positions: BTreeMap::new(),
        }
    }

    /// Install the root construction node.
    pub fn init(&mut self, root: ConstructionNode) -> OnticResult<NodeId> {
        if self.query.is_some() {
            return Err(OnticError::invalid_query("builder already initialized"));
        }
        let query = IntermediateQuery::with_root(self.projection_atom.clone(), root);
        let id = query.root();
        self.query = Some(query);
        Ok(id)
    }

    fn query_ref(&self) -> OnticResult<&IntermediateQuery> {
        self.query
            .as_ref()
            .ok_or_else(|| OnticError::invalid_query("builder not initialized"))
    }

    fn query_mut(&mut self) -> OnticResult<&mut IntermediateQuery> {
        self.query
            .as_mut()
            .ok_or_else(|| OnticError::invalid_query("builder not initialized"))
    }

    /// Append a child. Under a left join the first child added without a
    /// position becomes LEFT and the second RIGHT.
    pub fn add_child(&mut self, parent: NodeId, node: impl Into<QueryNode>) -> OnticResult<NodeId> {
        if matches!(self.query_ref()?.node(parent)?, QueryNode::LeftJoin(_)) {
            let position = if self.has_child_at(parent, ArgumentPosition::Left) {
                ArgumentPosition::Right
            } else {
                ArgumentPosition::Left
            };
            return self.add_child_at(parent, node, position);
        }
        let query = self.query_mut()?;
        Self::check_capacity(query.node(parent)?, query.get_children(parent).len(), parent)?;
        let id = query.add_node(node.into());
        query.attach(parent, id, None)?;
        Ok(id)
    }

    /// Add a child of a left join at the given position.
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        node: impl Into<QueryNode>,
        position: ArgumentPosition,
    ) -> OnticResult<NodeId> {
        if self.has_child_at(parent, position) {
            return Err(OnticError::invalid_query(format!(
                "{parent} already has a {position} child"
            )));
        }
        let query = self.query_mut()?;
        if !matches!(query.node(parent)?, QueryNode::LeftJoin(_)) {
            return Err(OnticError::invalid_query(format!(
                "{parent} is not a left join; positions only apply to left joins"
            )));
        }
        let id = query.add_node(node.into());
        let index = match position {
            ArgumentPosition::Left => 0,
            ArgumentPosition::Right => query.get_children(parent).len(),
        };
        query.attach(parent, id, Some(index))?;
        self.positions.insert(id, position);
        Ok(id)
    }

    fn has_child_at(&self, parent: NodeId, position: ArgumentPosition) -> bool {
        self.query.as_ref().is_some_and(|q| {
            q.get_children(parent)
                .iter()
                .any(|c| self.positions.get(c) == Some(&position))
        })
    }

    fn check_capacity(node: &QueryNode, current: usize, id: NodeId) -> OnticResult<()> {
        match node.arity_bounds() {
            (_, Some(max)) if current >= max => Err(OnticError::invalid_query(format!(
                "{} node {id} accepts at most {max} children",
                node.name()
            ))),
            _ => Ok(()),
        }
    }

    /// Validate and return the query.
    pub fn build(self) -> OnticResult<IntermediateQuery> {
        let query = self
            .query
            .ok_or_else(|| OnticError::invalid_query("builder not initialized"))?;
        query.validate()?;
        Ok(query)
    }
}
