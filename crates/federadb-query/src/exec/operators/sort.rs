//! Sort operator.
//!
//! A blocking, stable sort: rows with equal keys keep their input order.

use std::cmp::Ordering;
use std::sync::Arc;

use federadb_core::{compare_with_nulls, Value};

use crate::error::QueryError;
use crate::exec::context::{CancellationToken, ExecutionContext};
use crate::exec::operator::{BoxedOperator, Operator, OperatorBase, OperatorResult, OperatorState};
use crate::exec::operators::eval::evaluate_expr;
use crate::exec::row::{Row, Schema};
use crate::plan::capabilities::NullOrder;
use crate::plan::logical::SortOrder;

/// Compares two key values under a sort key.
///
/// An explicit `NULLS FIRST/LAST` wins; otherwise `null_order` decides.
/// An unknown null order sorts NULLs low.
pub(crate) fn compare_key(a: &Value, b: &Value, key: &SortOrder, null_order: NullOrder) -> Ordering {
    let nulls_first = key
        .nulls_first
        .or_else(|| null_order.places_nulls_first(key.ascending))
        .unwrap_or(key.ascending);
    if key.ascending {
        compare_with_nulls(a, b, nulls_first)
    } else {
        compare_with_nulls(a, b, !nulls_first).reverse()
    }
}

/// Compares two evaluated key tuples, key by key.
pub(crate) fn compare_keys(a: &[Value], b: &[Value], keys: &[SortOrder], null_order: NullOrder) -> Ordering {
    a.iter()
        .zip(b)
        .zip(keys)
        .map(|((a, b), key)| compare_key(a, b, key, null_order))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Sort operator.
pub struct SortOp {
    base: OperatorBase,
    order_by: Vec<SortOrder>,
    null_order: NullOrder,
    input: BoxedOperator,
    sorted: std::vec::IntoIter<Row>,
    materialized: bool,
    max_rows_in_memory: usize,
    cancellation: CancellationToken,
}

impl SortOp {
    /// Creates a sort operator.
    #[must_use]
    pub fn new(order_by: Vec<SortOrder>, null_order: NullOrder, input: BoxedOperator) -> Self {
        let schema = input.schema();
        Self {
            base: OperatorBase::new(schema),
            order_by,
            null_order,
            input,
            sorted: Vec::new().into_iter(),
            materialized: false,
            max_rows_in_memory: 0,
            cancellation: CancellationToken::new(),
        }
    }

    fn materialize(&mut self) -> OperatorResult<()> {
        let mut keyed: Vec<(Vec<Value>, Row)> = Vec::new();
        while let Some(row) = self.input.next()? {
            if self.cancellation.is_cancelled() {
                tracing::warn!(operator = "Sort", buffered = keyed.len(), "cancelled while buffering");
                return Err(QueryError::Cancelled);
            }
            let key = self
                .order_by
                .iter()
                .map(|k| evaluate_expr(&k.expr, &row))
                .collect::<OperatorResult<Vec<_>>>()?;
            keyed.push((key, row));

            if self.max_rows_in_memory > 0 && keyed.len() > self.max_rows_in_memory {
                return Err(QueryError::QueryTooLarge {
                    actual: keyed.len(),
                    limit: self.max_rows_in_memory,
                });
            }
        }

        // slice::sort_by is stable
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, &self.order_by, self.null_order));

        self.sorted = keyed.into_iter().map(|(_, row)| row).collect::<Vec<_>>().into_iter();
        self.materialized = true;
        Ok(())
    }
}

impl Operator for SortOp {
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()> {
        self.input.open(ctx)?;
        self.sorted = Vec::new().into_iter();
        self.materialized = false;
        self.max_rows_in_memory = ctx.max_rows_in_memory();
        self.cancellation = ctx.cancellation_token();
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.base.state().is_closed() {
            return Ok(None);
        }
        if !self.materialized {
            self.materialize()?;
        }

        match self.sorted.next() {
            Some(row) => {
                self.base.inc_rows_produced();
                Ok(Some(row))
            }
            None => {
                self.base.set_finished();
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> OperatorResult<()> {
        self.input.close()?;
        self.sorted = Vec::new().into_iter();
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
        "Sort"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::context::ExecutionConfig;
    use crate::exec::operators::values::ValuesOp;
    use crate::plan::logical::LogicalExpr;

    fn input() -> BoxedOperator {
        Box::new(ValuesOp::with_columns(
            vec!["k".to_string(), "tag".to_string()],
            vec![
                vec![Value::from("b"), Value::Int(1)],
                vec![Value::Null, Value::Int(2)],
                vec![Value::from("a"), Value::Int(3)],
                vec![Value::from("b"), Value::Int(4)],
            ],
        ))
    }

    fn tags(op: &mut SortOp) -> Vec<i64> {
        op.open(&ExecutionContext::new()).unwrap();
        let mut out = Vec::new();
        while let Some(row) = op.next().unwrap() {
            out.push(row.get_by_name("tag").and_then(Value::as_int).unwrap());
        }
        out
    }

    #[test]
    fn ascending_nulls_low() {
        let mut op = SortOp::new(vec![SortOrder::asc(LogicalExpr::column("k"))], NullOrder::Low, input());
        assert_eq!(tags(&mut op), vec![2, 3, 1, 4]);
    }

    #[test]
    fn descending_nulls_low_puts_nulls_last() {
        let mut op = SortOp::new(vec![SortOrder::desc(LogicalExpr::column("k"))], NullOrder::Low, input());
        assert_eq!(tags(&mut op), vec![1, 4, 3, 2]);
    }

    #[test]
    fn explicit_null_placement_wins() {
        let key = SortOrder::asc(LogicalExpr::column("k")).nulls_last();
        let mut op = SortOp::new(vec![key], NullOrder::Low, input());
        assert_eq!(tags(&mut op), vec![3, 1, 4, 2]);
    }

    #[test]
    fn buffer_limit() {
        let mut op = SortOp::new(vec![SortOrder::asc(LogicalExpr::column("k"))], NullOrder::Low, input());
        let ctx = ExecutionContext::new().with_config(ExecutionConfig::new().with_max_rows_in_memory(3));
        op.open(&ctx).unwrap();
        assert!(matches!(op.next(), Err(QueryError::QueryTooLarge { actual: 4, limit: 3 })));
    }

    #[test]
    fn compare_key_directions() {
        let asc = SortOrder::asc(LogicalExpr::column("k"));
        let desc = SortOrder::desc(LogicalExpr::column("k"));
        let one = Value::Int(1);
        assert_eq!(compare_key(&Value::Null, &one, &asc, NullOrder::High), Ordering::Greater);
        assert_eq!(compare_key(&Value::Null, &one, &desc, NullOrder::High), Ordering::Less);
        assert_eq!(compare_key(&Value::Null, &one, &asc, NullOrder::Last), Ordering::Greater);
        assert_eq!(compare_key(&Value::Null, &one, &desc, NullOrder::First), Ordering::Less);
        assert_eq!(compare_key(&Value::Int(2), &one, &desc, NullOrder::Low), Ordering::Less);
    }
}
