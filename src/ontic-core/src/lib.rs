//! Core data model for the Ontic query rewriting engine.
//!
//! This crate provides the leaf layer every other crate builds on:
//! - `Term`, `Variable`, `Value` and `ImmutableExpression` for the term algebra
//! - `evaluate` for boolean-expression simplification
//! - `Substitution` and term unification
//! - `VariableGenerator` for fresh variables
//! - `DataAtom`, `ProjectionAtom` and `DbMetadata` (unique keys, foreign keys,
//!   nullability) describing the relational source

pub mod atom;
pub mod evaluation;
pub mod generator;
pub mod metadata;
pub mod substitution;
pub mod term;

// Re-export commonly used types
pub use atom::{DataAtom, ProjectionAtom, RelationPredicate};
pub use evaluation::{evaluate, EvaluationResult};
pub use generator::VariableGenerator;
pub use metadata::{DbMetadata, ForeignKeyConstraint, MetadataBuilder, RelationDefinition};
pub use substitution::Substitution;
pub use term::{
    ExpressionOperation, FunctionSymbol, FunctionalTerm, ImmutableExpression, Injectivity, Term,
    Value, Variable,
};
