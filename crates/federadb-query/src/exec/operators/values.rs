//! Values operator.
//!
//! Produces rows from inline data without reading from a source.

use std::sync::Arc;

use federadb_core::Value;

use crate::exec::context::ExecutionContext;
use crate::exec::operator::{Operator, OperatorBase, OperatorResult, OperatorState};
use crate::exec::row::{Row, Schema};

/// Values operator - produces rows from inline data.
pub struct ValuesOp {
    base: OperatorBase,
    rows: std::vec::IntoIter<Vec<Value>>,
    /// Kept so the operator can be reopened.
    data: Vec<Vec<Value>>,
}

impl ValuesOp {
    /// Creates a new values operator.
    #[must_use]
    pub fn new(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> Self {
        Self { base: OperatorBase::new(schema), rows: Vec::new().into_iter(), data: rows }
    }

    /// Creates a values operator from column names.
    #[must_use]
    pub fn with_columns(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self::new(Arc::new(Schema::new(columns)), rows)
    }
}

impl Operator for ValuesOp {
    fn open(&mut self, _ctx: &ExecutionContext) -> OperatorResult<()> {
        self.rows = self.data.clone().into_iter();
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.base.state().is_closed() {
            return Ok(None);
        }
        match self.rows.next() {
            Some(values) => {
                self.base.inc_rows_produced();
                Ok(Some(Row::new(self.base.schema(), values)))
            }
            None => {
                self.base.set_finished();
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> OperatorResult<()> {
        self.rows = Vec::new().into_iter();
        self.base.set_closed();
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> OperatorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Values"
    }
}
