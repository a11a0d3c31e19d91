//! Textual rendering of query trees.

use std::fmt;

use common_display::{DisplayTree, TreeNode};

use crate::node::NodeId;
use crate::query::IntermediateQuery;

/// A node of a query seen through the display machinery.
#[derive(Clone, Copy)]
struct QueryTreeView<'a> {
    query: &'a IntermediateQuery,
    id: NodeId,
}

impl TreeNode for QueryTreeView<'_> {
    fn name(&self) -> String {
        self.query
            .get_node(self.id)
            .map_or_else(|| format!("<missing {}>", self.id), ToString::to_string)
    }

    fn children(&self) -> Vec<Self> {
        self.query
            .get_children(self.id)
            .iter()
            .map(|id| QueryTreeView {
                query: self.query,
                id: *id,
            })
            .collect()
    }

    fn label(&self) -> Option<String> {
        self.query
            .get_optional_position(self.id)
            .map(|p| p.to_string())
    }
}

impl IntermediateQuery {
    /// Render the tree, one node per line, under the query head.
    pub fn explain(&self) -> String {
        let view = QueryTreeView {
            query: self,
            id: self.root(),
        };
        format!("{}\n{}", self.projection_atom(), DisplayTree::new(view))
    }
}

impl fmt::Display for IntermediateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain())
    }
}
