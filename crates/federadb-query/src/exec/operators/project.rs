//! Projection operator.

use std::sync::Arc;

use federadb_core::Value;

use crate::exec::context::ExecutionContext;
use crate::exec::operator::{BoxedOperator, Operator, OperatorBase, OperatorResult, OperatorState};
use crate::exec::operators::eval::evaluate_expr;
use crate::exec::row::{Row, Schema};
use crate::plan::logical::LogicalExpr;

/// Projection operator.
///
/// Evaluates one expression per output column over each input row.
pub struct ProjectOp {
    base: OperatorBase,
    exprs: Vec<LogicalExpr>,
    input: BoxedOperator,
}

impl ProjectOp {
    /// Creates a projection with the given output names.
    #[must_use]
    pub fn new(exprs: Vec<LogicalExpr>, names: Vec<String>, input: BoxedOperator) -> Self {
        Self { base: OperatorBase::new(Arc::new(Schema::new(names))), exprs, input }
    }

    /// Returns the projection expressions.
    #[must_use]
    pub fn expressions(&self) -> &[LogicalExpr] {
        &self.exprs
    }
}

impl Operator for ProjectOp {
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()> {
        self.input.open(ctx)?;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.base.state().is_closed() {
            return Ok(None);
        }
        match self.input.next()? {
            Some(input_row) => {
                let values: Vec<Value> = self
                    .exprs
                    .iter()
                    .map(|expr| evaluate_expr(expr, &input_row))
                    .collect::<OperatorResult<Vec<_>>>()?;

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
        self.input.close()?;
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
        "Project"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::operators::values::ValuesOp;

    #[test]
    fn projects_and_renames() {
        let input = Box::new(ValuesOp::with_columns(
            vec!["e1".to_string(), "w_0".to_string()],
            vec![vec![Value::from("a"), Value::Int(1)], vec![Value::from("b"), Value::Int(2)]],
        ));
        let mut op = ProjectOp::new(
            vec![LogicalExpr::column("w_0").mul(LogicalExpr::integer(10)), LogicalExpr::column("e1")],
            vec!["x".to_string(), "e1".to_string()],
            input,
        );

        op.open(&ExecutionContext::new()).unwrap();
        let row = op.next().unwrap().unwrap();
        assert_eq!(row.schema().columns(), vec!["x", "e1"]);
        assert_eq!(row.values(), &[Value::Int(10), Value::from("a")]);
        assert!(op.next().unwrap().is_some());
        assert!(op.next().unwrap().is_none());
        op.close().unwrap();
    }
}
