//! Error types and result aliases for Ontic.
//!
//! Every fallible operation of the rewriting engine reports an [`OnticError`].
//! Proving that a query has no answer is *not* an error and never shows up
//! here: it is a regular outcome of proposal execution and optimization.

mod error;

pub use error::{OnticError, OnticResult};
