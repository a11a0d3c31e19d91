//! Relational metadata: arities, nullability, unique keys and foreign keys.
//!
//! Column indices are 1-based throughout, as in relational catalogs.

use std::collections::{BTreeMap, BTreeSet};

use common_error::{OnticError, OnticResult};
use serde::{Deserialize, Serialize};

use crate::atom::{DataAtom, RelationPredicate};
use crate::term::Variable;

/// Description of one base relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    predicate: RelationPredicate,
    nullable: Vec<bool>,
    unique_keys: Vec<BTreeSet<usize>>,
}

impl RelationDefinition {
    /// A relation whose columns are all nullable and which has no key.
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Self {
            predicate: RelationPredicate::new(name, arity),
            nullable: vec![true; arity],
            unique_keys: Vec::new(),
        }
    }

    /// The relation predicate.
    pub fn predicate(&self) -> &RelationPredicate {
        &self.predicate
    }

    /// Number of columns.
    pub fn arity(&self) -> usize {
        self.predicate.arity()
    }

    /// Whether a column may hold NULL. Unknown columns are nullable.
    pub fn is_nullable(&self, column: usize) -> bool {
        column
            .checked_sub(1)
            .and_then(|i| self.nullable.get(i))
            .copied()
            .unwrap_or(true)
    }

    /// The candidate unique keys.
    pub fn unique_keys(&self) -> &[BTreeSet<usize>] {
        &self.unique_keys
    }

    /// Whether `columns` is exactly one of the declared unique keys.
    pub fn is_unique_key(&self, columns: &BTreeSet<usize>) -> bool {
        self.unique_keys.iter().any(|k| k == columns)
    }

    fn check_column(&self, column: usize) -> OnticResult<()> {
        if column == 0 || column > self.arity() {
            return Err(OnticError::metadata_lookup(format!(
                "column {} out of range for {} (arity {})",
                column,
                self.predicate,
                self.arity()
            )));
        }
        Ok(())
    }
}

/// An inclusion dependency `source(source_columns) ⊆ target(target_columns)`
/// where the target columns form a unique key of the target relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    source: String,
    source_columns: Vec<usize>,
    target: String,
    target_columns: Vec<usize>,
}

impl ForeignKeyConstraint {
    /// The referencing relation.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Referencing columns, positionally matched with the target columns.
    pub fn source_columns(&self) -> &[usize] {
        &self.source_columns
    }

    /// The referenced relation.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Referenced columns.
    pub fn target_columns(&self) -> &[usize] {
        &self.target_columns
    }

    /// Column pairs `(source column, target column)`.
    pub fn column_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.source_columns
            .iter()
            .copied()
            .zip(self.target_columns.iter().copied())
    }
}

/// Read-only catalog consulted by the rewrite rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbMetadata {
    relations: BTreeMap<String, RelationDefinition>,
    foreign_keys: Vec<ForeignKeyConstraint>,
}

impl DbMetadata {
    /// Start building a catalog.
    pub fn builder() -> MetadataBuilder {
        MetadataBuilder::default()
    }

    /// The relation with the given name, if declared.
    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.get(name)
    }

    /// The relation with the given name.
    pub fn lookup(&self, name: &str) -> OnticResult<&RelationDefinition> {
        self.relation(name)
            .ok_or_else(|| OnticError::metadata_lookup(format!("unknown relation {name}")))
    }

    /// Unique keys of a relation; empty for unknown relations.
    pub fn unique_keys(&self, name: &str) -> &[BTreeSet<usize>] {
        self.relation(name)
            .map(|r| r.unique_keys())
            .unwrap_or_default()
    }

    /// All foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKeyConstraint] {
        &self.foreign_keys
    }

    /// Foreign keys from `source` into `target`.
    pub fn foreign_keys_between<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a ForeignKeyConstraint> + 'a {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.source == source && fk.target == target)
    }

    /// Check that an atom refers to a declared relation with the right arity.
    pub fn check_atom(&self, atom: &DataAtom) -> OnticResult<&RelationDefinition> {
        let relation = self.lookup(atom.predicate().name())?;
        if relation.arity() != atom.arguments().len() {
            return Err(OnticError::metadata_lookup(format!(
                "{} has arity {} in metadata but is used with {} arguments",
                relation.predicate(),
                relation.arity(),
                atom.arguments().len()
            )));
        }
        Ok(relation)
    }

    /// Variables of the atom placed in non-nullable columns.
    pub fn non_null_variables(&self, atom: &DataAtom) -> BTreeSet<Variable> {
        let Some(relation) = self.relation(atom.predicate().name()) else {
            return BTreeSet::new();
        };
        atom.arguments()
            .iter()
            .enumerate()
            .filter(|(i, _)| !relation.is_nullable(i + 1))
            .filter_map(|(_, t)| t.as_variable().cloned())
            .collect()
    }
}

/// Fluent builder for [`DbMetadata`]; all checks run in [`MetadataBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder {
    relations: Vec<(String, usize)>,
    not_null: Vec<(String, Vec<usize>)>,
    unique_keys: Vec<(String, Vec<usize>)>,
    foreign_keys: Vec<ForeignKeyConstraint>,
}

impl MetadataBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a relation.
    pub fn relation(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.relations.push((name.into(), arity));
        self
    }

    /// Declare columns as non-nullable.
    pub fn not_null(mut self, relation: impl Into<String>, columns: &[usize]) -> Self {
        self.not_null.push((relation.into(), columns.to_vec()));
        self
    }

    /// Declare a candidate unique key.
    pub fn unique_key(mut self, relation: impl Into<String>, columns: &[usize]) -> Self {
        self.unique_keys.push((relation.into(), columns.to_vec()));
        self
    }

    /// Declare a unique key whose columns are also non-nullable.
    pub fn primary_key(self, relation: impl Into<String>, columns: &[usize]) -> Self {
        let relation = relation.into();
        self.not_null(relation.clone(), columns)
            .unique_key(relation, columns)
    }

    /// Declare a foreign key.
    pub fn foreign_key(
        mut self,
        source: impl Into<String>,
        source_columns: &[usize],
        target: impl Into<String>,
        target_columns: &[usize],
    ) -> Self {
        self.foreign_keys.push(ForeignKeyConstraint {
            source: source.into(),
            source_columns: source_columns.to_vec(),
            target: target.into(),
            target_columns: target_columns.to_vec(),
        });
        self
    }

    /// Validate the declarations and build the catalog.
    pub fn build(self) -> OnticResult<DbMetadata> {
        let mut relations = BTreeMap::new();
        for (name, arity) in self.relations {
            if relations.contains_key(&name) {
                return Err(OnticError::metadata_lookup(format!(
                    "relation {name} declared twice"
                )));
            }
            relations.insert(name.clone(), RelationDefinition::new(name, arity));
        }

        fn get<'a>(
            relations: &'a mut BTreeMap<String, RelationDefinition>,
            name: &str,
        ) -> OnticResult<&'a mut RelationDefinition> {
            relations
                .get_mut(name)
                .ok_or_else(|| OnticError::metadata_lookup(format!("unknown relation {name}")))
        }

        for (name, columns) in self.not_null {
            let relation = get(&mut relations, &name)?;
            for column in columns {
                relation.check_column(column)?;
                relation.nullable[column - 1] = false;
            }
        }

        for (name, columns) in self.unique_keys {
            let relation = get(&mut relations, &name)?;
            if columns.is_empty() {
                return Err(OnticError::metadata_lookup(format!("empty unique key on {name}")));
            }
            for &column in &columns {
                relation.check_column(column)?;
            }
            let key: BTreeSet<usize> = columns.into_iter().collect();
            if !relation.is_unique_key(&key) {
                relation.unique_keys.push(key);
            }
        }

        for fk in &self.foreign_keys {
            if fk.source_columns.is_empty() || fk.source_columns.len() != fk.target_columns.len() {
                return Err(OnticError::metadata_lookup(format!(
                    "foreign key {} -> {} has mismatched columns",
                    fk.source, fk.target
                )));
            }
            let source = get(&mut relations, &fk.source)?;
            for &column in &fk.source_columns {
                source.check_column(column)?;
            }
            let target = get(&mut relations, &fk.target)?;
            for &column in &fk.target_columns {
                target.check_column(column)?;
            }
            let referenced: BTreeSet<usize> = fk.target_columns.iter().copied().collect();
            if !target.is_unique_key(&referenced) {
                return Err(OnticError::metadata_lookup(format!(
                    "foreign key {} -> {} does not reference a unique key of {}",
                    fk.source, fk.target, fk.target
                )));
            }
        }

        Ok(DbMetadata {
            relations,
            foreign_keys: self.foreign_keys,
        })
    }
}
