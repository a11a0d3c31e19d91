//! Fresh variable generation.

use std::collections::BTreeSet;

use crate::substitution::Substitution;
use crate::term::{Term, Variable};

/// Generates variables that do not clash with any registered variable.
#[derive(Debug, Clone, Default)]
pub struct VariableGenerator {
    known: BTreeSet<Variable>,
    counter: usize,
}

impl VariableGenerator {
    /// Create a generator aware of the given variables.
    pub fn new(known: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            known: known.into_iter().collect(),
            counter: 0,
        }
    }

    /// Register a variable so it is never generated.
    pub fn register(&mut self, variable: Variable) {
        self.known.insert(variable);
    }

    /// Register several variables.
    pub fn register_all(&mut self, variables: impl IntoIterator<Item = Variable>) {
        self.known.extend(variables);
    }

    /// Whether the variable is known to the generator.
    pub fn is_known(&self, variable: &Variable) -> bool {
        self.known.contains(variable)
    }

    /// The registered variables.
    pub fn known_variables(&self) -> &BTreeSet<Variable> {
        &self.known
    }

    /// A new variable (`v0`, `v1`, ...).
    pub fn generate_new_variable(&mut self) -> Variable {
        self.next_with(|n| format!("v{n}"))
    }

    /// A new variable derived from `former` (`xf0`, `xf1`, ...).
    pub fn generate_new_variable_from(&mut self, former: &Variable) -> Variable {
        self.register(former.clone());
        self.next_with(|n| format!("{}f{n}", former.name()))
    }

    /// A renaming mapping each variable to a fresh one derived from it.
    pub fn rename_apart<'a>(
        &mut self,
        variables: impl IntoIterator<Item = &'a Variable>,
    ) -> Substitution {
        variables
            .into_iter()
            .map(|v| (v.clone(), Term::Variable(self.generate_new_variable_from(v))))
            .collect()
    }

    fn next_with(&mut self, name: impl Fn(usize) -> String) -> Variable {
        loop {
            let candidate = Variable::new(name(self.counter));
            self.counter += 1;
            if self.known.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
