//! Data leaves.

use std::collections::BTreeSet;
use std::fmt;

use ontic_core::{DataAtom, Variable};
use serde::{Deserialize, Serialize};

/// Leaf reading a base relation; each column holds a variable or a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionalDataNode {
    atom: DataAtom,
}

impl ExtensionalDataNode {
    /// Create a leaf over the given atom.
    pub fn new(atom: DataAtom) -> Self {
        Self { atom }
    }

    /// The atom.
    pub fn atom(&self) -> &DataAtom {
        &self.atom
    }

    /// The relation name.
    pub fn relation(&self) -> &str {
        self.atom.predicate().name()
    }

    /// Variables of the atom.
    pub fn variables(&self) -> BTreeSet<Variable> {
        self.atom.variables()
    }
}

impl fmt::Display for ExtensionalDataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.atom)
    }
}

/// Leaf over a derived predicate, answered by another query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensionalDataNode {
    atom: DataAtom,
}

impl IntensionalDataNode {
    /// Create a leaf over the given atom.
    pub fn new(atom: DataAtom) -> Self {
        Self { atom }
    }

    /// The atom.
    pub fn atom(&self) -> &DataAtom {
        &self.atom
    }
}

impl fmt::Display for IntensionalDataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INTENSIONAL {}", self.atom)
    }
}
