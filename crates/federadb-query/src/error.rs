//! Error types for query planning and execution.

use thiserror::Error;

use federadb_core::CoreError;

use crate::plan::PlanError;

/// Errors raised while planning or executing a window query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Planning failed.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Evaluating a window function argument, key or result failed.
    #[error("error evaluating {function}: {message}")]
    RowEvaluation {
        /// The function or operator being evaluated.
        function: String,
        /// What went wrong.
        message: String,
    },

    /// A value operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// More rows were buffered than the configured limit.
    #[error("query too large: {actual} rows buffered, limit is {limit}")]
    QueryTooLarge {
        /// Rows buffered when the limit was hit.
        actual: usize,
        /// The configured limit.
        limit: usize,
    },

    /// Execution was cancelled.
    #[error("query cancelled")]
    Cancelled,

    /// The data source failed.
    #[error("data source error: {0}")]
    Source(String),

    /// An operator was used out of order.
    #[error("invalid operator state: {0}")]
    InvalidState(String),
}

impl QueryError {
    /// Creates a row evaluation error.
    pub fn row_evaluation(function: impl Into<String>, message: impl ToString) -> Self {
        Self::RowEvaluation { function: function.into(), message: message.to_string() }
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
