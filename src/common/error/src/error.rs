//! Core error types for Ontic.

use thiserror::Error;

/// Result type alias using `OnticError`.
pub type OnticResult<T> = std::result::Result<T, OnticError>;

/// Core error type for Ontic operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OnticError {
    /// A rewrite rule produced a proposal that violates a tree invariant or
    /// references metadata inconsistent with the tree.
    #[error("InvalidOptimizationProposal: {0}")]
    InvalidOptimizationProposal(String),

    /// A sub-query cannot be grafted at the requested frontier.
    #[error("QueryMerging: {0}")]
    QueryMerging(String),

    /// Unknown relation or column referenced by metadata or by the query.
    #[error("MetadataLookup: {0}")]
    MetadataLookup(String),

    /// A query tree violates a structural invariant.
    #[error("InvalidQuery: {0}")]
    InvalidQuery(String),

    /// A node handle that does not belong to the query tree.
    #[error("NodeNotFound: {0}")]
    NodeNotFound(String),

    /// Invalid parameter provided.
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// Internal error (bug in Ontic).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl OnticError {
    /// Create a new `InvalidOptimizationProposal` error.
    pub fn invalid_proposal<S: Into<String>>(msg: S) -> Self {
        Self::InvalidOptimizationProposal(msg.into())
    }

    /// Create a new `QueryMerging` error.
    pub fn query_merging<S: Into<String>>(msg: S) -> Self {
        Self::QueryMerging(msg.into())
    }

    /// Create a new `MetadataLookup` error.
    pub fn metadata_lookup<S: Into<String>>(msg: S) -> Self {
        Self::MetadataLookup(msg.into())
    }

    /// Create a new `InvalidQuery` error.
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create a new `NodeNotFound` error.
    pub fn node_not_found<S: Into<String>>(msg: S) -> Self {
        Self::NodeNotFound(msg.into())
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Whether this error signals a programming error in a rewrite rule.
    pub fn is_invalid_proposal(&self) -> bool {
        matches!(self, Self::InvalidOptimizationProposal(_))
    }
}

/// Ensure a condition holds, returning an `InvalidQuery` error if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::OnticError::InvalidQuery($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::OnticError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with an `InvalidOptimizationProposal` error.
#[macro_export]
macro_rules! proposal_err {
    ($($arg:tt)*) => {
        return Err($crate::OnticError::InvalidOptimizationProposal(format!($($arg)*)))
    };
}
