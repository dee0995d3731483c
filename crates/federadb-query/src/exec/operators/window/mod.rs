//! Window operator.
//!
//! Appends one value per window function to every input row. Rows come out
//! in input order with their original columns unchanged.
//!
//! Two modes:
//!
//! - **Materialized**: the whole input is buffered, then each group of
//!   functions sharing a specification is evaluated over it.
//! - **Streaming**: when the input arrives sorted by the partition keys of a
//!   single group, only the current partition is buffered. It is evaluated
//!   and emitted once the next partition's first row (or end of input) is
//!   seen.

mod accumulator;
mod evaluate;
mod frame;
mod partition;

use std::sync::Arc;

use federadb_core::Value;

use crate::error::QueryError;
use crate::exec::context::{CancellationToken, ExecutionContext};
use crate::exec::operator::{BoxedOperator, Operator, OperatorBase, OperatorResult, OperatorState};
use crate::exec::row::{Row, Schema};
use crate::plan::physical::WindowExecNode;

use self::evaluate::evaluate_group;
use self::partition::{evaluate_key, keys_equal};

/// Window operator.
pub struct WindowOp {
    base: OperatorBase,
    node: WindowExecNode,
    input: BoxedOperator,
    streaming: bool,
    output: std::vec::IntoIter<Row>,
    /// First row of the next partition, read ahead while streaming.
    pending: Option<(Vec<Value>, Row)>,
    input_done: bool,
    max_rows_in_memory: usize,
    cancellation: CancellationToken,
}

impl WindowOp {
    /// Creates a window operator over `input`.
    #[must_use]
    pub fn new(node: WindowExecNode, input: BoxedOperator) -> Self {
        let schema = Arc::new(input.schema().extend(node.functions.iter().map(|f| f.alias.as_str())));
        let streaming = node.presorted && node.groups.len() == 1;
        Self {
            base: OperatorBase::new(schema),
            node,
            input,
            streaming,
            output: Vec::new().into_iter(),
            pending: None,
            input_done: false,
            max_rows_in_memory: 0,
            cancellation: CancellationToken::new(),
        }
    }

    /// Returns true if the operator buffers one partition at a time.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn check_buffer(&self, buffered: usize) -> OperatorResult<()> {
        if self.cancellation.is_cancelled() {
            tracing::warn!(operator = "Window", buffered, "cancelled while buffering");
            return Err(QueryError::Cancelled);
        }
        if self.max_rows_in_memory > 0 && buffered > self.max_rows_in_memory {
            return Err(QueryError::QueryTooLarge { actual: buffered, limit: self.max_rows_in_memory });
        }
        Ok(())
    }

    /// Evaluates every group over `rows` and queues the extended rows.
    fn evaluate(&mut self, rows: Vec<Row>) -> OperatorResult<()> {
        let mut results = vec![vec![Value::Null; self.node.functions.len()]; rows.len()];
        for group in &self.node.groups {
            evaluate_group(&self.node.functions, group, &rows, self.node.null_order, &mut results)?;
        }

        let schema = self.base.schema();
        self.output = rows
            .into_iter()
            .zip(results)
            .map(|(row, values)| row.extended(Arc::clone(&schema), values))
            .collect::<Vec<_>>()
            .into_iter();
        Ok(())
    }

    fn materialize(&mut self) -> OperatorResult<()> {
        let mut rows = Vec::new();
        while let Some(row) = self.input.next()? {
            rows.push(row);
            self.check_buffer(rows.len())?;
        }
        self.input_done = true;
        tracing::trace!(rows = rows.len(), "window input materialized");
        self.evaluate(rows)
    }

    /// Buffers and evaluates the next partition. Returns false at end of input.
    fn next_partition(&mut self) -> OperatorResult<bool> {
        let partition_keys = match self.node.groups.first() {
            Some(group) => group.spec.partition_keys().to_vec(),
            None => Vec::new(),
        };

        let (key, first) = match self.pending.take() {
            Some(pending) => pending,
            None => match self.input.next()? {
                Some(row) => (evaluate_key(&partition_keys, &row, "PARTITION BY")?, row),
                None => {
                    self.input_done = true;
                    return Ok(false);
                }
            },
        };

        let mut rows = vec![first];
        loop {
            let Some(row) = self.input.next()? else {
                self.input_done = true;
                break;
            };
            let row_key = evaluate_key(&partition_keys, &row, "PARTITION BY")?;
            if !keys_equal(&row_key, &key) {
                self.pending = Some((row_key, row));
                break;
            }
            rows.push(row);
            self.check_buffer(rows.len())?;
        }

        tracing::trace!(rows = rows.len(), "window partition buffered");
        self.evaluate(rows)?;
        Ok(true)
    }
}

impl Operator for WindowOp {
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()> {
        self.input.open(ctx)?;
        self.output = Vec::new().into_iter();
        self.pending = None;
        self.input_done = false;
        self.max_rows_in_memory = ctx.max_rows_in_memory();
        self.cancellation = ctx.cancellation_token();
        tracing::debug!(
            functions = self.node.functions.len(),
            groups = self.node.groups.len(),
            mode = if self.streaming { "streaming" } else { "materialized" },
            "window operator opened"
        );
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.base.state().is_closed() {
            return Ok(None);
        }

        loop {
            if let Some(row) = self.output.next() {
                self.base.inc_rows_produced();
                return Ok(Some(row));
            }
            if self.input_done && self.pending.is_none() {
                self.base.set_finished();
                return Ok(None);
            }
            if self.streaming {
                if !self.next_partition()? {
                    self.base.set_finished();
                    return Ok(None);
                }
            } else {
                self.materialize()?;
            }
        }
    }

    fn close(&mut self) -> OperatorResult<()> {
        self.input.close()?;
        self.output = Vec::new().into_iter();
        self.pending = None;
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
        "Window"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::exec::context::ExecutionConfig;
    use crate::exec::operators::values::ValuesOp;
    use crate::plan::catalog::WindowFunctionKind;
    use crate::plan::logical::{LogicalExpr, SortOrder, WindowFunctionCall, WindowSpecification};
    use crate::plan::physical::WindowFunctionExpr;

    fn make_input() -> BoxedOperator {
        Box::new(ValuesOp::with_columns(
            vec!["name".to_string(), "dept".to_string(), "salary".to_string()],
            vec![
                vec![Value::from("Alice"), Value::from("Sales"), Value::Int(100)],
                vec![Value::from("Bob"), Value::from("Sales"), Value::Int(90)],
                vec![Value::from("Carol"), Value::from("IT"), Value::Int(90)],
                vec![Value::from("Dave"), Value::from("IT"), Value::Int(80)],
            ],
        ))
    }

    fn by_dept_salary_desc() -> WindowSpecification {
        WindowSpecification::new()
            .partition_by(vec![LogicalExpr::column("dept")])
            .order_by(vec![SortOrder::desc(LogicalExpr::column("salary"))])
    }

    fn node(calls: Vec<WindowFunctionCall>) -> WindowExecNode {
        WindowExecNode::new(
            calls
                .into_iter()
                .enumerate()
                .map(|(i, call)| WindowFunctionExpr { call, alias: format!("w_{i}") })
                .collect(),
        )
    }

    fn collect(op: &mut WindowOp, ctx: &ExecutionContext) -> OperatorResult<Vec<Row>> {
        op.open(ctx)?;
        let mut rows = Vec::new();
        while let Some(row) = op.next()? {
            rows.push(row);
        }
        Ok(rows)
    }

    #[test]
    fn row_number_per_partition() {
        let call = WindowFunctionCall::new(WindowFunctionKind::RowNumber, vec![], by_dept_salary_desc());
        let mut op = WindowOp::new(node(vec![call]), make_input());
        let rows = collect(&mut op, &ExecutionContext::new()).unwrap();

        assert_eq!(rows.len(), 4);
        let by_name: HashMap<String, i64> = rows
            .iter()
            .map(|r| {
                let name = r.get_by_name("name").and_then(Value::as_str).unwrap().to_string();
                (name, r.get_by_name("w_0").and_then(Value::as_int).unwrap())
            })
            .collect();
        assert_eq!(by_name["Alice"], 1);
        assert_eq!(by_name["Bob"], 2);
        assert_eq!(by_name["Carol"], 1);
        assert_eq!(by_name["Dave"], 2);

        // input order and columns are preserved
        assert_eq!(rows[0].schema().columns(), vec!["name", "dept", "salary", "w_0"]);
        assert_eq!(rows[2].get_by_name("name"), Some(&Value::from("Carol")));
        op.close().unwrap();
    }

    #[test]
    fn multiple_groups_in_one_pass() {
        let rank = WindowFunctionCall::new(WindowFunctionKind::Rank, vec![], by_dept_salary_desc());
        let total = WindowFunctionCall::new(
            WindowFunctionKind::Sum,
            vec![LogicalExpr::column("salary")],
            WindowSpecification::new(),
        );
        let node = node(vec![rank, total]);
        assert_eq!(node.groups.len(), 2);

        let mut op = WindowOp::new(node, make_input());
        let rows = collect(&mut op, &ExecutionContext::new()).unwrap();
        let totals: Vec<&Value> = rows.iter().filter_map(|r| r.get_by_name("w_1")).collect();
        assert!(totals.iter().all(|v| **v == Value::Int(360)));
        assert_eq!(rows[1].get_by_name("w_0"), Some(&Value::Int(2)));
    }

    #[test]
    fn streaming_mode_matches_materialized() {
        let sorted_input = || -> BoxedOperator {
            Box::new(ValuesOp::with_columns(
                vec!["dept".to_string(), "salary".to_string()],
                vec![
                    vec![Value::from("IT"), Value::Int(90)],
                    vec![Value::from("IT"), Value::Int(80)],
                    vec![Value::from("Sales"), Value::Int(100)],
                    vec![Value::from("Sales"), Value::Int(90)],
                    vec![Value::from("Sales"), Value::Int(90)],
                ],
            ))
        };
        let call = WindowFunctionCall::new(WindowFunctionKind::Rank, vec![], by_dept_salary_desc());

        let mut streaming = WindowOp::new(node(vec![call.clone()]).with_presorted(true), sorted_input());
        assert!(streaming.is_streaming());
        let mut materialized = WindowOp::new(node(vec![call]), sorted_input());
        assert!(!materialized.is_streaming());

        let ctx = ExecutionContext::new();
        let a = collect(&mut streaming, &ctx).unwrap();
        let b = collect(&mut materialized, &ctx).unwrap();
        assert_eq!(a, b);
        let ranks: Vec<i64> = a.iter().filter_map(|r| r.get_by_name("w_0").and_then(Value::as_int)).collect();
        assert_eq!(ranks, vec![1, 2, 1, 2, 2]);
    }

    #[test]
    fn streaming_buffers_one_partition() {
        let call = WindowFunctionCall::new(
            WindowFunctionKind::CountStar,
            vec![],
            WindowSpecification::new().partition_by(vec![LogicalExpr::column("dept")]),
        );
        let input = Box::new(ValuesOp::with_columns(
            vec!["dept".to_string()],
            vec![
                vec![Value::from("a")],
                vec![Value::from("a")],
                vec![Value::from("b")],
                vec![Value::from("b")],
                vec![Value::from("c")],
            ],
        ));
        let mut op = WindowOp::new(node(vec![call]).with_presorted(true), input);
        let ctx = ExecutionContext::new().with_config(ExecutionConfig::new().with_max_rows_in_memory(2));
        let rows = collect(&mut op, &ctx).unwrap();
        let counts: Vec<i64> = rows.iter().filter_map(|r| r.get_by_name("w_0").and_then(Value::as_int)).collect();
        assert_eq!(counts, vec![2, 2, 2, 2, 1]);
    }

    #[test]
    fn materialized_respects_memory_limit() {
        let call = WindowFunctionCall::new(WindowFunctionKind::RowNumber, vec![], WindowSpecification::new());
        let mut op = WindowOp::new(node(vec![call]), make_input());
        let ctx = ExecutionContext::new().with_config(ExecutionConfig::new().with_max_rows_in_memory(3));
        assert_eq!(
            collect(&mut op, &ctx).unwrap_err(),
            QueryError::QueryTooLarge { actual: 4, limit: 3 }
        );
    }

    #[test]
    fn cancellation_aborts_buffering() {
        let call = WindowFunctionCall::new(WindowFunctionKind::RowNumber, vec![], WindowSpecification::new());
        let mut op = WindowOp::new(node(vec![call]), make_input());
        let ctx = ExecutionContext::new();
        op.open(&ctx).unwrap();
        ctx.cancel();
        assert_eq!(op.next(), Err(QueryError::Cancelled));
    }

    #[test]
    fn empty_input_and_close() {
        let call = WindowFunctionCall::new(WindowFunctionKind::RowNumber, vec![], WindowSpecification::new());
        let input = Box::new(ValuesOp::with_columns(vec!["x".to_string()], vec![]));
        let mut op = WindowOp::new(node(vec![call]), input);
        assert!(collect(&mut op, &ExecutionContext::new()).unwrap().is_empty());
        assert_eq!(op.state(), OperatorState::Finished);
        op.close().unwrap();
        assert!(op.next().unwrap().is_none());
    }
}
