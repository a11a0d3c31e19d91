//! The fixpoint driver applying node-centric rules to a query.
//!
//! Each iteration sweeps the nodes top-down. At every node the rules are
//! consulted in priority order and the first proposal is applied. The
//! driver stops after a sweep without accepted proposal, when the query is
//! proven empty, or after `max_iterations` sweeps.

use common_config::{OptimizerConfig, RuleSetConfig};
use common_error::OnticResult;
use log::debug;
use ontic_core::DbMetadata;
use ontic_iq::{IntermediateQuery, ProposalResults, QueryNode};

use super::rule::{NodeCentricRule, OptimizationOutcome, OptimizedQuery, ProposalTrace};
use super::{
    BooleanExpressionSimplification, ForeignKeyJoinElimination, LeftToInnerJoin,
    RedundantSelfJoin,
};

/// Applies rules to intermediate queries until none fires.
pub struct Optimizer {
    /// The rules to apply (in order).
    rules: Vec<Box<dyn NodeCentricRule>>,
    /// Configuration.
    config: OptimizerConfig,
}

impl Optimizer {
    /// Create a new optimizer with the given rules.
    pub fn new(rules: Vec<Box<dyn NodeCentricRule>>) -> Self {
        Self {
            rules,
            config: OptimizerConfig::default(),
        }
    }

    /// Create an optimizer running the rules selected by `config`.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            rules: Self::rules_for(&config.rules),
            config,
        }
    }

    /// The built-in rules enabled in `selection`, in priority order.
    pub fn rules_for(selection: &RuleSetConfig) -> Vec<Box<dyn NodeCentricRule>> {
        let mut rules: Vec<Box<dyn NodeCentricRule>> = Vec::new();
        if selection.boolean_simplification {
            rules.push(Box::new(BooleanExpressionSimplification));
        }
        if selection.self_join_elimination {
            rules.push(Box::new(RedundantSelfJoin));
        }
        if selection.foreign_key_elimination {
            rules.push(Box::new(ForeignKeyJoinElimination));
        }
        if selection.left_to_inner_join {
            rules.push(Box::new(LeftToInnerJoin));
        }
        rules
    }

    /// Add a rule after the existing ones.
    pub fn add_rule<R: NodeCentricRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// Names of the rules, in priority order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Optimize a query against `metadata`.
    ///
    /// Every extensional leaf must refer to a declared relation with the
    /// right arity. A proposal rejected by the query is returned as an
    /// error: it means a rule is wrong, not that the data is unusual.
    pub fn optimize(
        &self,
        query: IntermediateQuery,
        metadata: &DbMetadata,
    ) -> OnticResult<OptimizationOutcome> {
        query.validate()?;
        for id in query.nodes_top_down() {
            if let Some(QueryNode::ExtensionalData(leaf)) = query.get_node(*id) {
                metadata.check_atom(leaf.atom())?;
            }
        }

        let mut query = query;
        let mut iterations = 0;
        let mut proposals_applied = 0;
        let mut trace = Vec::new();

        loop {
            if iterations >= self.config.max_iterations {
                debug!(
                    "Optimizer reached max iterations ({}), stopping",
                    self.config.max_iterations
                );
                break;
            }

            iterations += 1;
            let mut changed_this_iteration = false;

            for focus in query.nodes_top_down().to_vec() {
                if !query.contains(focus) {
                    continue;
                }
                for rule in &self.rules {
                    let Some(proposal) = rule.propose(&query, focus, metadata)? else {
                        continue;
                    };
                    let before = self.config.enable_trace.then(|| query.explain());

                    if query.apply_proposal(&proposal)? == ProposalResults::EmptyQuery {
                        debug!(
                            "Rule '{}' proved the query empty in iteration {}",
                            rule.name(),
                            iterations
                        );
                        return Ok(OptimizationOutcome::Empty);
                    }

                    changed_this_iteration = true;
                    proposals_applied += 1;
                    debug!(
                        "Rule '{}' applied {proposal} in iteration {iterations}",
                        rule.name()
                    );

                    if let Some(before) = before {
                        trace.push(ProposalTrace::new(
                            rule.name(),
                            proposal.to_string(),
                            before,
                            query.explain(),
                        ));
                    }
                    // The focus may be gone; later rules see it next sweep.
                    break;
                }
            }

            if !changed_this_iteration {
                debug!("No changes in iteration {}, reached fixpoint", iterations);
                break;
            }
        }

        Ok(OptimizationOutcome::Optimized(OptimizedQuery {
            query,
            iterations,
            proposals_applied,
            trace,
        }))
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_config(OptimizerConfig::default())
    }
}
