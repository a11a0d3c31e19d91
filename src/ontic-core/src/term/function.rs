//! Function symbols of functional terms.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Term, Variable};

/// When a function symbol is injective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Injectivity {
    /// Different arguments may produce the same value.
    Never,
    /// Distinct argument tuples always produce distinct values.
    Always,
    /// Injective as long as every argument is non-null (e.g. IRI templates).
    WhenArgumentsNonNull,
}

/// A function symbol: name, arity and the properties rewrites rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSymbol {
    name: Arc<str>,
    arity: usize,
    injectivity: Injectivity,
    post_processable: bool,
}

impl FunctionSymbol {
    /// Create a new function symbol.
    pub fn new(
        name: impl AsRef<str>,
        arity: usize,
        injectivity: Injectivity,
        post_processable: bool,
    ) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            arity,
            injectivity,
            post_processable,
        }
    }

    /// An IRI template: injective over non-null arguments, evaluable
    /// outside the source relation.
    pub fn iri_template(template: impl AsRef<str>, arity: usize) -> Self {
        Self::new(template, arity, Injectivity::WhenArgumentsNonNull, true)
    }

    /// The symbol name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The injectivity class.
    pub fn injectivity(&self) -> Injectivity {
        self.injectivity
    }

    /// Whether the function can be computed after the data leaves the source.
    pub fn can_be_post_processed(&self) -> bool {
        self.post_processable
    }

    /// Whether the symbol is injective for these arguments, given the
    /// variables known to be non-null.
    pub fn is_injective(&self, arguments: &[Term], non_null: &BTreeSet<Variable>) -> bool {
        match self.injectivity {
            Injectivity::Never => false,
            Injectivity::Always => true,
            Injectivity::WhenArgumentsNonNull => arguments.iter().all(|a| a.is_non_null(non_null)),
        }
    }
}
