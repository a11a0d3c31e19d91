//! Structural validation of query trees.
//!
//! Checks performed:
//! - the root is a construction node projecting the head atom variables in order
//! - parent and child links agree, and every stored node is reachable
//! - each node kind has an allowed number of children
//! - construction nodes find the variables they need in their child
//! - union children project exactly the union variables
//! - conditions only mention variables available at their node

use common_error::{ensure, OnticError, OnticResult};

use crate::node::QueryNode;
use crate::query::IntermediateQuery;

impl IntermediateQuery {
    /// Check every structural invariant of the tree.
    pub fn validate(&self) -> OnticResult<()> {
        let root = self.root_construction()?;
        ensure!(
            root.projection() == self.projection_atom().variables(),
            InvalidQuery: "root projects [{}] but the query head is {}",
            root.projection()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            self.projection_atom()
        );
        ensure!(
            self.get_parent(self.root()).is_none(),
            InvalidQuery: "root {} has a parent",
            self.root()
        );

        let reachable = self.nodes_top_down();
        ensure!(
            reachable.len() == self.len(),
            InvalidQuery: "{} nodes stored but only {} reachable from the root",
            self.len(),
            reachable.len()
        );

        for &id in reachable {
            let node = self.node(id)?;
            let children = self.get_children(id);

            for &child in children {
                ensure!(
                    self.get_parent(child) == Some(id),
                    InvalidQuery: "{child} is listed under {id} but points elsewhere"
                );
            }

            let (min, max) = node.arity_bounds();
            ensure!(
                children.len() >= min && max.map_or(true, |m| children.len() <= m),
                InvalidQuery: "{} node {id} has {} children",
                node.name(),
                children.len()
            );

            match node {
                QueryNode::Construction(c) => {
                    let available = children
                        .first()
                        .map(|child| self.projected_variables(*child))
                        .unwrap_or_default();
                    let missing = c.child_variables().into_iter().find(|v| !available.contains(v));
                    if let Some(missing) = missing {
                        return Err(OnticError::invalid_query(format!(
                            "construction node {id} needs {missing}, not projected by its child"
                        )));
                    }
                }
                QueryNode::Union(u) => {
                    for &child in children {
                        ensure!(
                            &self.projected_variables(child) == u.projected_variables(),
                            InvalidQuery: "union child {child} does not project the union variables"
                        );
                    }
                }
                _ => {}
            }

            if let Some(condition) = node.condition() {
                let available = self.projected_variables(id);
                let missing = condition.variables().into_iter().find(|v| !available.contains(v));
                if let Some(missing) = missing {
                    return Err(OnticError::invalid_query(format!(
                        "condition {condition} of {id} uses unavailable variable {missing}"
                    )));
                }
            }
        }
        Ok(())
    }
}
