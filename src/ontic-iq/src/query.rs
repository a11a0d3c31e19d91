//! The intermediate query tree.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Each slot stores the node
//! value, its parent and its ordered children; a left join keeps its LEFT
//! child first. Traversal orders are computed on first use and dropped on
//! every structural mutation.

use std::cell::OnceCell;
use std::collections::BTreeSet;

use common_error::{OnticError, OnticResult};
use ontic_core::{ProjectionAtom, Variable, VariableGenerator};

use crate::node::{ArgumentPosition, ConstructionNode, NodeId, QueryNode};

#[derive(Debug, Clone)]
struct Slot {
    node: QueryNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct TraversalOrders {
    top_down: Vec<NodeId>,
    bottom_up: Vec<NodeId>,
}

/// A tree of query nodes rooted at a construction node.
#[derive(Debug, Clone)]
pub struct IntermediateQuery {
    projection_atom: ProjectionAtom,
    slots: Vec<Option<Slot>>,
    root: NodeId,
    generator: VariableGenerator,
    orders: OnceCell<TraversalOrders>,
}

impl IntermediateQuery {
    pub(crate) fn with_root(projection_atom: ProjectionAtom, root: ConstructionNode) -> Self {
        let slot = Slot {
            node: QueryNode::Construction(root),
            parent: None,
            children: Vec::new(),
        };
        Self {
            projection_atom,
            slots: vec![Some(slot)],
            root: NodeId(0),
            generator: VariableGenerator::default(),
            orders: OnceCell::new(),
        }
    }

    /// The head atom naming the query.
    pub fn projection_atom(&self) -> &ProjectionAtom {
        &self.projection_atom
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root construction node.
    pub fn root_construction(&self) -> OnticResult<&ConstructionNode> {
        match self.node(self.root)? {
            QueryNode::Construction(c) => Ok(c),
            other => Err(OnticError::invalid_query(format!(
                "root is a {} node",
                other.name()
            ))),
        }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether the tree holds no node (never the case for a built query).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: NodeId) -> OnticResult<&mut Slot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| OnticError::node_not_found(format!("{id}")))
    }

    /// Whether the node belongs to this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    /// The node value, if the handle belongs to this tree.
    pub fn get_node(&self, id: NodeId) -> Option<&QueryNode> {
        self.slot(id).map(|s| &s.node)
    }

    /// The node value.
    pub fn node(&self, id: NodeId) -> OnticResult<&QueryNode> {
        self.get_node(id)
            .ok_or_else(|| OnticError::node_not_found(format!("{id}")))
    }

    /// Children of a node, in order.
    pub fn get_children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// Parent of a node; `None` for the root.
    pub fn get_parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|s| s.parent)
    }

    /// Ancestors from the parent up to the root.
    pub fn get_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.get_parent(id);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.get_parent(parent);
        }
        ancestors
    }

    /// The first child of a node.
    pub fn get_first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get_children(id).first().copied()
    }

    /// The sibling following a node under its parent.
    pub fn get_next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.get_children(self.get_parent(id)?);
        let index = siblings.iter().position(|c| *c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Position of a child of a left join.
    pub fn get_optional_position(&self, id: NodeId) -> Option<ArgumentPosition> {
        let parent = self.get_parent(id)?;
        if !matches!(self.get_node(parent)?, QueryNode::LeftJoin(_)) {
            return None;
        }
        match self.get_children(parent).iter().position(|c| *c == id)? {
            0 => Some(ArgumentPosition::Left),
            _ => Some(ArgumentPosition::Right),
        }
    }

    /// The child of a left join at the given position.
    pub fn get_child_at(&self, id: NodeId, position: ArgumentPosition) -> Option<NodeId> {
        self.get_children(id).get(position.index()).copied()
    }

    /// The node itself if it is a construction node, else the closest
    /// construction ancestor.
    pub fn get_closest_construction_node(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.get_ancestors(id))
            .find(|n| matches!(self.get_node(*n), Some(QueryNode::Construction(_))))
    }

    /// Nodes of the subtree below `id` in pre-order, excluding `id`.
    pub fn get_subtree_top_down(&self, id: NodeId) -> Vec<NodeId> {
        let mut acc = Vec::new();
        let mut stack: Vec<NodeId> = self.get_children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            acc.push(next);
            stack.extend(self.get_children(next).iter().rev().copied());
        }
        acc
    }

    fn orders(&self) -> &TraversalOrders {
        self.orders.get_or_init(|| {
            let mut top_down = vec![self.root];
            top_down.extend(self.get_subtree_top_down(self.root));
            let bottom_up = top_down.iter().rev().copied().collect();
            TraversalOrders {
                top_down,
                bottom_up,
            }
        })
    }

    /// All nodes, parents before children.
    pub fn nodes_top_down(&self) -> &[NodeId] {
        &self.orders().top_down
    }

    /// All nodes, children before parents.
    pub fn nodes_bottom_up(&self) -> &[NodeId] {
        &self.orders().bottom_up
    }

    /// Variables projected by a node.
    pub fn projected_variables(&self, id: NodeId) -> BTreeSet<Variable> {
        match self.get_node(id) {
            Some(QueryNode::Construction(c)) => c.projected_variables(),
            Some(QueryNode::Union(u)) => u.projected_variables().clone(),
            Some(QueryNode::ExtensionalData(n)) => n.variables(),
            Some(QueryNode::IntensionalData(n)) => n.atom().variables(),
            Some(QueryNode::Filter(_) | QueryNode::InnerJoin(_) | QueryNode::LeftJoin(_)) => self
                .get_children(id)
                .iter()
                .flat_map(|c| self.projected_variables(*c))
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Every variable mentioned in the subtree rooted at `id`.
    pub fn variables_in_subtree(&self, id: NodeId) -> BTreeSet<Variable> {
        std::iter::once(id)
            .chain(self.get_subtree_top_down(id))
            .filter_map(|n| self.get_node(n))
            .flat_map(QueryNode::local_variables)
            .collect()
    }

    /// Every variable mentioned in the tree.
    pub fn known_variables(&self) -> BTreeSet<Variable> {
        self.variables_in_subtree(self.root)
    }

    /// A variable that occurs nowhere in the tree. When `former` is given
    /// the new name is derived from it and differs from it.
    pub fn generate_fresh_variable(&mut self, former: Option<&Variable>) -> Variable {
        let known = self.known_variables();
        self.generator.register_all(known);
        match former {
            Some(v) => self.generator.generate_new_variable_from(v),
            None => self.generator.generate_new_variable(),
        }
    }

    pub(crate) fn generator_mut(&mut self) -> &mut VariableGenerator {
        let known = self.known_variables();
        self.generator.register_all(known);
        &mut self.generator
    }

    // -------------------------------------------------------------------------
    // Mutation primitives. Callers are responsible for re-validating.
    // -------------------------------------------------------------------------

    fn invalidate(&mut self) {
        self.orders.take();
    }

    /// Add a detached node.
    pub(crate) fn add_node(&mut self, node: QueryNode) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Some(Slot {
            node,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    /// Attach a detached node under `parent`, at `index` or last.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> OnticResult<()> {
        self.slot_mut(child)?.parent = Some(parent);
        let children = &mut self.slot_mut(parent)?.children;
        match index {
            Some(i) if i <= children.len() => children.insert(i, child),
            _ => children.push(child),
        }
        self.invalidate();
        Ok(())
    }

    /// Install a new node value at the position of `id`.
    pub(crate) fn replace_node(&mut self, id: NodeId, node: QueryNode) -> OnticResult<()> {
        self.slot_mut(id)?.node = node;
        Ok(())
    }

    /// Put `child` (a child of `id`) in place of `id`; the other children of
    /// `id` are removed with their subtrees.
    pub(crate) fn replace_by_child(&mut self, id: NodeId, child: NodeId) -> OnticResult<()> {
        if self.get_parent(child) != Some(id) {
            return Err(OnticError::invalid_proposal(format!(
                "{child} is not a child of {id}"
            )));
        }
        for other in self.get_children(id).to_vec() {
            if other != child {
                self.remove_subtree(other)?;
            }
        }
        let parent = self.get_parent(id);
        self.slot_mut(child)?.parent = parent;
        match parent {
            Some(p) => {
                for c in self.slot_mut(p)?.children.iter_mut() {
                    if *c == id {
                        *c = child;
                    }
                }
            }
            None => self.root = child,
        }
        self.slots[id.0] = None;
        self.invalidate();
        Ok(())
    }

    /// Remove a node and its subtree, detaching it from its parent.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> OnticResult<()> {
        if !self.contains(id) {
            return Err(OnticError::node_not_found(format!("{id}")));
        }
        if let Some(parent) = self.get_parent(id) {
            self.slot_mut(parent)?.children.retain(|c| *c != id);
        }
        for n in self.get_subtree_top_down(id) {
            self.slots[n.0] = None;
        }
        self.slots[id.0] = None;
        self.invalidate();
        Ok(())
    }

    /// Insert a new node between `child` and its parent.
    pub(crate) fn insert_parent(&mut self, child: NodeId, node: QueryNode) -> OnticResult<NodeId> {
        let parent = self
            .get_parent(child)
            .ok_or_else(|| OnticError::invalid_proposal("cannot insert a parent above the root"))?;
        let id = self.add_node(node);
        for c in self.slot_mut(parent)?.children.iter_mut() {
            if *c == child {
                *c = id;
            }
        }
        self.slot_mut(id)?.parent = Some(parent);
        self.slot_mut(id)?.children.push(child);
        self.slot_mut(child)?.parent = Some(id);
        self.invalidate();
        Ok(id)
    }

    /// Replace the subtree at `id` with a copy of the subtree rooted at
    /// `source` in `other`. Returns the handle of the copied root.
    pub(crate) fn graft_copy(
        &mut self,
        id: NodeId,
        other: &IntermediateQuery,
        source: NodeId,
    ) -> OnticResult<NodeId> {
        let parent = self.get_parent(id);
        let copy = self.copy_from(other, source)?;
        self.slot_mut(copy)?.parent = parent;
        match parent {
            Some(p) => {
                for c in self.slot_mut(p)?.children.iter_mut() {
                    if *c == id {
                        *c = copy;
                    }
                }
            }
            None => self.root = copy,
        }
        for n in self.get_subtree_top_down(id) {
            self.slots[n.0] = None;
        }
        self.slots[id.0] = None;
        self.invalidate();
        Ok(copy)
    }

    fn copy_from(&mut self, other: &IntermediateQuery, source: NodeId) -> OnticResult<NodeId> {
        let id = self.add_node(other.node(source)?.clone());
        for child in other.get_children(source) {
            let copied = self.copy_from(other, *child)?;
            self.slot_mut(copied)?.parent = Some(id);
            self.slot_mut(id)?.children.push(copied);
        }
        Ok(id)
    }
}
