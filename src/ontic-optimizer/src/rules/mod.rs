//! Rewrite rules for intermediate queries.
//!
//! Every rule is node-centric: it looks at one focus node and its
//! neighbourhood and either declines or emits a single proposal. Proposals
//! are applied by the query itself, which rejects any that would break a
//! structural invariant.
//!
//! # Rule priority
//!
//! 1. Boolean expression simplification
//! 2. Redundant self-join elimination
//! 3. Foreign-key join elimination
//! 4. Left join to inner join
//!
//! # Soundness
//!
//! A rewrite is legal only if, for every instance of the base relations,
//! the query returns the same answers before and after, under three-valued
//! logic for conditions.

mod boolean_simplification;
mod foreign_key;
mod left_to_inner_join;
mod optimizer;
mod rule;
mod self_join;

pub use boolean_simplification::BooleanExpressionSimplification;
pub use foreign_key::ForeignKeyJoinElimination;
pub use left_to_inner_join::LeftToInnerJoin;
pub use optimizer::Optimizer;
pub use rule::{NodeCentricRule, OptimizationOutcome, OptimizedQuery, ProposalTrace};
pub use self_join::RedundantSelfJoin;
