//! Node-centric rule trait and optimization results.

use common_error::OnticResult;
use ontic_core::DbMetadata;
use ontic_iq::{IntermediateQuery, NodeId, QueryOptimizationProposal};

/// A rewrite rule inspecting one focus node at a time.
///
/// A rule never edits the tree. It returns a proposal, and the query applies
/// it transactionally. A rule must not propose again on the state its own
/// proposal produced, otherwise the fixpoint never terminates.
pub trait NodeCentricRule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Inspect `focus`, returning a proposal when the rule applies there.
    fn propose(
        &self,
        query: &IntermediateQuery,
        focus: NodeId,
        metadata: &DbMetadata,
    ) -> OnticResult<Option<QueryOptimizationProposal>>;
}

/// A trace entry for one accepted proposal.
#[derive(Debug, Clone)]
pub struct ProposalTrace {
    /// The rule that emitted the proposal.
    pub rule: String,
    /// The proposal, rendered.
    pub proposal: String,
    /// The query before the proposal (as explain string).
    pub before: String,
    /// The query after the proposal (as explain string).
    pub after: String,
}

impl ProposalTrace {
    /// Create a new trace entry.
    pub fn new(
        rule: impl Into<String>,
        proposal: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            proposal: proposal.into(),
            before: before.into(),
            after: after.into(),
        }
    }
}

/// A query that reached the fixpoint.
#[derive(Debug, Clone)]
pub struct OptimizedQuery {
    /// The final query.
    pub query: IntermediateQuery,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Number of proposals that were accepted.
    pub proposals_applied: usize,
    /// Accepted proposals in order (if tracing was enabled).
    pub trace: Vec<ProposalTrace>,
}

impl OptimizedQuery {
    /// Format the trace as a human-readable string.
    pub fn format_trace(&self) -> String {
        let mut output = format!(
            "Optimization completed in {} iterations, {} proposals applied\n",
            self.iterations, self.proposals_applied
        );

        if self.trace.is_empty() {
            output.push_str("  (no trace available)\n");
            return output;
        }
        for (i, entry) in self.trace.iter().enumerate() {
            output.push_str(&format!(
                "\n--- Proposal {} by {}: {} ---\n",
                i + 1,
                entry.rule,
                entry.proposal
            ));
            output.push_str("Before:\n");
            output.push_str(&entry.before);
            output.push_str("\nAfter:\n");
            output.push_str(&entry.after);
        }
        output
    }
}

/// Result of optimizing a query.
#[derive(Debug, Clone)]
pub enum OptimizationOutcome {
    /// The rewritten query.
    Optimized(OptimizedQuery),
    /// The query provably returns no row.
    Empty,
}

impl OptimizationOutcome {
    /// Whether the query was proven empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The optimized query, unless proven empty.
    pub fn query(&self) -> Option<&IntermediateQuery> {
        match self {
            Self::Optimized(optimized) => Some(&optimized.query),
            Self::Empty => None,
        }
    }

    /// Take the optimized query, unless proven empty.
    pub fn into_query(self) -> Option<IntermediateQuery> {
        match self {
            Self::Optimized(optimized) => Some(optimized.query),
            Self::Empty => None,
        }
    }
}
