//! Ontic - intermediate-query optimizer for ontology-based data access
//!
//! Ontic rewrites the query trees produced by unfolding a SPARQL query
//! through mappings, using the keys and foreign keys of the underlying
//! database to remove joins that cannot change the answer.
//!
//! ```
//! use ontic::core::{DataAtom, MetadataBuilder, ProjectionAtom, RelationPredicate, Term, Variable};
//! use ontic::iq::{ConstructionNode, ExtensionalDataNode, IntermediateQueryBuilder, LeftJoinNode};
//!
//! let metadata = MetadataBuilder::new()
//!     .relation("R", 3)
//!     .primary_key("R", &[1])
//!     .build()
//!     .unwrap();
//!
//! let r = RelationPredicate::new("R", 3);
//! let leaf = |args: [&str; 3]| {
//!     let atom = DataAtom::new(r.clone(), args.iter().map(Term::var).collect()).unwrap();
//!     ExtensionalDataNode::new(atom)
//! };
//! let projection: Vec<Variable> = ["m", "n", "o1"].iter().map(Variable::new).collect();
//! let head = ProjectionAtom::new(RelationPredicate::new("ans", 3), projection.clone()).unwrap();
//!
//! let mut builder = IntermediateQueryBuilder::new(head);
//! let root = builder.init(ConstructionNode::projecting(projection).unwrap()).unwrap();
//! let lj = builder.add_child(root, LeftJoinNode::new(None)).unwrap();
//! builder.add_child(lj, leaf(["m", "n", "o1"])).unwrap();
//! builder.add_child(lj, leaf(["m", "n1", "o"])).unwrap();
//! let query = builder.build().unwrap();
//!
//! let optimized = ontic::optimizer::optimize(query, &metadata).unwrap();
//! assert_eq!(optimized.query().unwrap().len(), 2);
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_display as display;
pub use common_error as error;
pub use ontic_core as core;
pub use ontic_iq as iq;
pub use ontic_optimizer as optimizer;

/// Ontic version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
