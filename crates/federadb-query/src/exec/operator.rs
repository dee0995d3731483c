//! Operator trait and base types.
//!
//! Every execution node implements [`Operator`]: rows are pulled one at a
//! time from the root, which pulls from its children.

use std::sync::Arc;

use crate::error::QueryError;

use super::context::ExecutionContext;
use super::row::{Row, Schema};

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, QueryError>;

/// The state of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    /// Operator has not been opened yet.
    Created,
    /// Operator is open and ready to produce rows.
    Open,
    /// Operator has finished producing rows.
    Finished,
    /// Operator has been closed.
    Closed,
}

impl OperatorState {
    /// Returns true if the operator is open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the operator has finished.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true if the operator is closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Pull-based execution operator.
///
/// # Lifecycle
///
/// 1. **Created**: after construction
/// 2. **Open**: after `open()`; rows can be pulled
/// 3. **Finished**: after `next()` returned `None`
/// 4. **Closed**: after `close()`; buffers released, `next()` yields `None`
///
/// Operators are `Send` so a plan can move between threads, but they are
/// driven by one thread at a time.
pub trait Operator: Send {
    /// Opens the operator and its children.
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()>;

    /// Returns the next row, or `None` at end of stream.
    fn next(&mut self) -> OperatorResult<Option<Row>>;

    /// Closes the operator and its children, releasing resources.
    fn close(&mut self) -> OperatorResult<()>;

    /// Returns the output schema.
    fn schema(&self) -> Arc<Schema>;

    /// Returns the current state.
    fn state(&self) -> OperatorState;

    /// Returns the operator name.
    fn name(&self) -> &'static str;
}

/// A boxed operator for dynamic dispatch.
pub type BoxedOperator = Box<dyn Operator>;

/// State and counters shared by all operators.
#[derive(Debug)]
pub struct OperatorBase {
    schema: Arc<Schema>,
    state: OperatorState,
    rows_produced: u64,
}

impl OperatorBase {
    /// Creates a new operator base with the given schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema, state: OperatorState::Created, rows_produced: 0 }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> OperatorState {
        self.state
    }

    /// Sets the state to open.
    pub fn set_open(&mut self) {
        self.state = OperatorState::Open;
    }

    /// Sets the state to finished.
    pub fn set_finished(&mut self) {
        self.state = OperatorState::Finished;
    }

    /// Sets the state to closed.
    pub fn set_closed(&mut self) {
        self.state = OperatorState::Closed;
    }

    /// Increments the rows produced counter.
    pub fn inc_rows_produced(&mut self) {
        self.rows_produced += 1;
    }

    /// Returns the number of rows produced.
    #[must_use]
    pub const fn rows_produced(&self) -> u64 {
        self.rows_produced
    }

    /// Fails unless the operator has been opened and not closed.
    pub fn ensure_open(&self, operator: &str) -> OperatorResult<()> {
        match self.state {
            OperatorState::Created => {
                Err(QueryError::InvalidState(format!("{operator}: next() called before open()")))
            }
            OperatorState::Open | OperatorState::Finished | OperatorState::Closed => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_state_transitions() {
        let mut base = OperatorBase::new(Arc::new(Schema::empty()));
        assert_eq!(base.state(), OperatorState::Created);
        assert!(base.ensure_open("Test").is_err());

        base.set_open();
        assert!(base.state().is_open());
        assert!(base.ensure_open("Test").is_ok());

        base.set_finished();
        assert!(base.state().is_finished());

        base.set_closed();
        assert!(base.state().is_closed());
    }

    #[test]
    fn operator_base_rows() {
        let mut base = OperatorBase::new(Arc::new(Schema::empty()));
        base.inc_rows_produced();
        base.inc_rows_produced();
        assert_eq!(base.rows_produced(), 2);
    }
}
