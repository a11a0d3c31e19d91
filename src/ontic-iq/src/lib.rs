//! Intermediate query trees for the Ontic rewriting engine.
//!
//! An [`IntermediateQuery`] is a tree of relational operators rooted at a
//! construction node. This crate provides:
//! - the node kinds ([`QueryNode`]) and their projected variables
//! - the arena-backed tree with navigation and cached traversal orders
//! - [`IntermediateQueryBuilder`] and structural validation
//! - substitution propagation, ascending and descending
//! - optimization proposals and their transactional execution
//! - sub-query merging and textual rendering
//!
//! # Example
//!
//! ```rust
//! use ontic_core::{DataAtom, ProjectionAtom, RelationPredicate, Term, Variable};
//! use ontic_iq::{ConstructionNode, ExtensionalDataNode, IntermediateQueryBuilder};
//!
//! let x = Variable::new("x");
//! let head = ProjectionAtom::new(RelationPredicate::new("ans", 1), vec![x.clone()]).unwrap();
//! let atom = DataAtom::new(RelationPredicate::new("R", 1), vec![Term::from(&x)]).unwrap();
//!
//! let mut builder = IntermediateQueryBuilder::new(head);
//! let root = builder.init(ConstructionNode::projecting(vec![x]).unwrap()).unwrap();
//! builder.add_child(root, ExtensionalDataNode::new(atom)).unwrap();
//! let query = builder.build().unwrap();
//!
//! assert!(query.explain().contains("R(x)"));
//! ```

mod builder;
mod equivalence;
mod explain;
mod merge;
pub mod node;
mod propagation;
mod proposal;
mod query;
mod validation;

// Re-export commonly used types
pub use builder::IntermediateQueryBuilder;
pub use node::{
    ArgumentPosition, ConstructionNode, ExtensionalDataNode, FilterNode, InnerJoinNode,
    IntensionalDataNode, LeftJoinNode, NodeId, QueryNode, UnionNode,
};
pub use proposal::{ProposalResults, QueryOptimizationProposal};
pub use query::IntermediateQuery;
