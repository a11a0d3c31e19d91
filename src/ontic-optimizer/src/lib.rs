//! Rule-based fixpoint optimizer for intermediate queries.
//!
//! Rules inspect one focus node at a time and emit proposals; the
//! [`Optimizer`] applies them until a full sweep produces none or the query
//! is proven empty.

mod analysis;
mod rules;

pub use rules::{
    BooleanExpressionSimplification, ForeignKeyJoinElimination, LeftToInnerJoin,
    NodeCentricRule, OptimizationOutcome, OptimizedQuery, Optimizer, ProposalTrace,
    RedundantSelfJoin,
};

use common_error::OnticResult;
use ontic_core::DbMetadata;
use ontic_iq::IntermediateQuery;

/// Optimize a query using the default optimizer.
pub fn optimize(
    query: IntermediateQuery,
    metadata: &DbMetadata,
) -> OnticResult<OptimizationOutcome> {
    Optimizer::default().optimize(query, metadata)
}
