//! Per-group window function evaluation.
//!
//! Every function of a [`WindowGroup`] is computed over the same sorted
//! partitions. Results are written back by buffer position, so the caller
//! emits rows in the order it buffered them.

use federadb_core::Value;

use crate::error::QueryError;
use crate::exec::operator::OperatorResult;
use crate::exec::operators::eval::{evaluate_expr, is_true};
use crate::exec::row::Row;
use crate::plan::capabilities::NullOrder;
use crate::plan::catalog::{EvaluationBranch, WindowFunctionKind};
use crate::plan::logical::{LogicalExpr, WindowFunctionCall};
use crate::plan::physical::{WindowFunctionExpr, WindowGroup};

use super::accumulator::Accumulator;
use super::frame::{frame_range, starts_at_partition_start};
use super::partition::{partition_rows, Partition, WindowKeys};

/// Argument values and FILTER outcome of one call, per buffered row.
struct CallInputs {
    args: Vec<Vec<Value>>,
    included: Vec<bool>,
}

impl CallInputs {
    fn evaluate(call: &WindowFunctionCall, rows: &[Row]) -> OperatorResult<Self> {
        let fail = |e: QueryError| QueryError::row_evaluation(call.kind.name(), e);
        let mut inputs = Self { args: Vec::with_capacity(rows.len()), included: Vec::with_capacity(rows.len()) };
        for row in rows {
            let args = call
                .args
                .iter()
                .map(|arg| match arg {
                    LogicalExpr::Wildcard => Ok(Value::Null),
                    arg => evaluate_expr(arg, row).map_err(fail),
                })
                .collect::<OperatorResult<Vec<_>>>()?;
            let included = match &call.filter {
                Some(predicate) => is_true(&evaluate_expr(predicate, row).map_err(fail)?),
                None => true,
            };
            inputs.args.push(args);
            inputs.included.push(included);
        }
        Ok(inputs)
    }

    fn arg(&self, row: usize, index: usize) -> &Value {
        self.args[row].get(index).unwrap_or(&Value::Null)
    }
}

/// Returns a literal integer argument, or `default` when it is absent.
fn literal_usize(call: &WindowFunctionCall, index: usize, default: usize) -> usize {
    match call.args.get(index).and_then(LogicalExpr::as_literal) {
        Some(Value::Int(n)) => usize::try_from(*n).unwrap_or(usize::MAX),
        _ => default,
    }
}

/// Computes the functions of `group` over `rows` into `out[row][function]`.
pub(crate) fn evaluate_group(
    functions: &[WindowFunctionExpr],
    group: &WindowGroup,
    rows: &[Row],
    null_order: NullOrder,
    out: &mut [Vec<Value>],
) -> OperatorResult<()> {
    let keys = WindowKeys::evaluate(&group.spec, rows)?;
    let partitions = partition_rows(&group.spec, &keys, null_order);
    tracing::trace!(spec = %group.spec, rows = rows.len(), partitions = partitions.len(), "evaluating window group");

    for &index in &group.functions {
        let call = &functions[index].call;
        let inputs = CallInputs::evaluate(call, rows)?;
        for partition in &partitions {
            let values = match call.kind.branch() {
                EvaluationBranch::Ranking => ranking(call, partition, &inputs),
                EvaluationBranch::Aggregate => aggregate(call, partition, &inputs)?,
                EvaluationBranch::Offset => offset(call, partition, &inputs),
                EvaluationBranch::Value => frame_value(call, partition, &inputs),
            };
            for (pos, value) in values.into_iter().enumerate() {
                out[partition.rows[pos]][index] = value;
            }
        }
    }
    Ok(())
}

/// Numbering over the rows that pass FILTER; the others get NULL.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn ranking(call: &WindowFunctionCall, partition: &Partition, inputs: &CallInputs) -> Vec<Value> {
    let members: Vec<usize> =
        (0..partition.len()).filter(|&pos| inputs.included[partition.rows[pos]]).collect();
    let n = members.len();

    // index of the last member tied with each member
    let mut group_last = vec![0; n];
    for i in (0..n).rev() {
        let same_group = i + 1 < n && partition.peers(members[i]) == partition.peers(members[i + 1]);
        group_last[i] = if same_group { group_last[i + 1] } else { i };
    }

    let buckets = literal_usize(call, 0, 1).max(1);
    let (base, extra) = (n / buckets, n % buckets);

    let mut values = vec![Value::Null; partition.len()];
    let mut rank = 0;
    let mut dense_rank = 0;
    for (i, &pos) in members.iter().enumerate() {
        if i == 0 || partition.peers(pos) != partition.peers(members[i - 1]) {
            rank = i + 1;
            dense_rank += 1;
        }
        values[pos] = match call.kind {
            WindowFunctionKind::RowNumber => Value::Int((i + 1) as i64),
            WindowFunctionKind::Rank => Value::Int(rank as i64),
            WindowFunctionKind::DenseRank => Value::Int(dense_rank as i64),
            WindowFunctionKind::PercentRank => {
                Value::Float(if n > 1 { (rank - 1) as f64 / (n - 1) as f64 } else { 0.0 })
            }
            WindowFunctionKind::CumeDist => Value::Float((group_last[i] + 1) as f64 / n as f64),
            WindowFunctionKind::Ntile => {
                // the first `extra` buckets hold one row more
                let large = extra * (base + 1);
                let bucket = if i < large { i / (base + 1) } else { extra + (i - large) / base };
                Value::Int((bucket + 1) as i64)
            }
            _ => Value::Null,
        };
    }
    values
}

/// Aggregates over each row's frame.
fn aggregate(call: &WindowFunctionCall, partition: &Partition, inputs: &CallInputs) -> OperatorResult<Vec<Value>> {
    let add = |acc: &mut Accumulator, pos: usize| -> OperatorResult<()> {
        let row = partition.rows[pos];
        if inputs.included[row] {
            acc.update(inputs.arg(row, 0)).map_err(|e| QueryError::row_evaluation(call.kind.name(), e))?;
        }
        Ok(())
    };

    let mut values = Vec::with_capacity(partition.len());
    if starts_at_partition_start(&call.spec) {
        let mut acc = Accumulator::new(call.kind, call.distinct);
        let mut consumed = 0;
        for pos in 0..partition.len() {
            let frame = frame_range(&call.spec, partition, pos);
            while consumed < frame.end {
                add(&mut acc, consumed)?;
                consumed += 1;
            }
            values.push(acc.value());
        }
    } else {
        for pos in 0..partition.len() {
            let mut acc = Accumulator::new(call.kind, call.distinct);
            for frame_pos in frame_range(&call.spec, partition, pos) {
                add(&mut acc, frame_pos)?;
            }
            values.push(acc.value());
        }
    }
    Ok(values)
}

/// LEAD and LAG. Outside the partition the default is evaluated on the
/// current row.
fn offset(call: &WindowFunctionCall, partition: &Partition, inputs: &CallInputs) -> Vec<Value> {
    let distance = literal_usize(call, 1, 1);
    (0..partition.len())
        .map(|pos| {
            let target = if call.kind == WindowFunctionKind::Lag {
                pos.checked_sub(distance)
            } else {
                pos.checked_add(distance).filter(|&t| t < partition.len())
            };
            match target {
                Some(target) => inputs.arg(partition.rows[target], 0).clone(),
                None => inputs.arg(partition.rows[pos], 2).clone(),
            }
        })
        .collect()
}

/// FIRST_VALUE, LAST_VALUE and NTH_VALUE. A NULL at the chosen position is
/// returned as is.
fn frame_value(call: &WindowFunctionCall, partition: &Partition, inputs: &CallInputs) -> Vec<Value> {
    (0..partition.len())
        .map(|pos| {
            let frame = frame_range(&call.spec, partition, pos);
            let target = match call.kind {
                WindowFunctionKind::FirstValue => Some(frame.start),
                WindowFunctionKind::LastValue => frame.end.checked_sub(1),
                _ => frame.start.checked_add(literal_usize(call, 1, 1).saturating_sub(1)),
            };
            target
                .filter(|t| frame.contains(t))
                .map_or(Value::Null, |t| inputs.arg(partition.rows[t], 0).clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::exec::row::Schema;
    use crate::plan::logical::{FrameBound, SortOrder, WindowFrame, WindowSpecification};
    use crate::plan::physical::WindowExecNode;

    fn rows(values: &[(Value, Value)]) -> Vec<Row> {
        let schema = Arc::new(Schema::from(vec!["e1", "e2"]));
        values.iter().map(|(a, b)| Row::new(Arc::clone(&schema), vec![a.clone(), b.clone()])).collect()
    }

    fn run(calls: Vec<WindowFunctionCall>, rows: &[Row]) -> Vec<Vec<Value>> {
        let functions: Vec<WindowFunctionExpr> = calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| WindowFunctionExpr { call, alias: format!("w_{i}") })
            .collect();
        let node = WindowExecNode::new(functions);
        let mut out = vec![vec![Value::Null; node.functions.len()]; rows.len()];
        for group in &node.groups {
            evaluate_group(&node.functions, group, rows, NullOrder::Low, &mut out).unwrap();
        }
        out
    }

    fn column(out: &[Vec<Value>], i: usize) -> Vec<Value> {
        out.iter().map(|r| r[i].clone()).collect()
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Int(*v)).collect()
    }

    fn by_e2() -> WindowSpecification {
        WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::column("e2"))])
    }

    #[test]
    fn ranking_with_ties() {
        let data = rows(&[
            (Value::from("x"), Value::Int(2)),
            (Value::from("x"), Value::Int(1)),
            (Value::from("x"), Value::Int(2)),
            (Value::from("x"), Value::Int(3)),
        ]);
        let out = run(
            vec![
                WindowFunctionCall::new(WindowFunctionKind::Rank, vec![], by_e2()),
                WindowFunctionCall::new(WindowFunctionKind::DenseRank, vec![], by_e2()),
                WindowFunctionCall::new(WindowFunctionKind::PercentRank, vec![], by_e2()),
                WindowFunctionCall::new(WindowFunctionKind::CumeDist, vec![], by_e2()),
            ],
            &data,
        );
        assert_eq!(column(&out, 0), ints(&[2, 1, 2, 4]));
        assert_eq!(column(&out, 1), ints(&[2, 1, 2, 3]));
        assert_eq!(column(&out, 2)[3], Value::Float(1.0));
        assert_eq!(column(&out, 2)[1], Value::Float(0.0));
        assert_eq!(column(&out, 3)[0], Value::Float(0.75));
    }

    #[test]
    fn ntile_puts_larger_buckets_first() {
        let data: Vec<Row> = rows(&(1..=5).map(|i| (Value::Null, Value::Int(i))).collect::<Vec<_>>());
        let out = run(
            vec![WindowFunctionCall::new(WindowFunctionKind::Ntile, vec![LogicalExpr::integer(2)], by_e2())],
            &data,
        );
        assert_eq!(column(&out, 0), ints(&[1, 1, 1, 2, 2]));

        let out = run(
            vec![WindowFunctionCall::new(WindowFunctionKind::Ntile, vec![LogicalExpr::integer(8)], by_e2())],
            &data,
        );
        assert_eq!(column(&out, 0), ints(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn filtered_ranking_skips_rows() {
        let data = rows(&[
            (Value::from("a"), Value::Int(1)),
            (Value::Null, Value::Int(2)),
            (Value::from("b"), Value::Int(3)),
        ]);
        let call = WindowFunctionCall::new(WindowFunctionKind::RowNumber, vec![], by_e2())
            .with_filter(LogicalExpr::column("e1").is_not_null());
        let out = run(vec![call], &data);
        assert_eq!(column(&out, 0), vec![Value::Int(1), Value::Null, Value::Int(2)]);
    }

    #[test]
    fn aggregate_frames() {
        let data: Vec<Row> = rows(&(1..=4).map(|i| (Value::Int(i * 10), Value::Int(i))).collect::<Vec<_>>());
        let e1 = || vec![LogicalExpr::column("e1")];
        let out = run(
            vec![
                WindowFunctionCall::new(WindowFunctionKind::Sum, e1(), WindowSpecification::new()),
                WindowFunctionCall::new(WindowFunctionKind::Sum, e1(), by_e2()),
                WindowFunctionCall::new(
                    WindowFunctionKind::Sum,
                    e1(),
                    by_e2().frame(WindowFrame::rows_between(FrameBound::Preceding(1), FrameBound::CurrentRow)),
                ),
                WindowFunctionCall::new(
                    WindowFunctionKind::Count,
                    e1(),
                    by_e2().frame(WindowFrame::rows_between(FrameBound::Following(5), FrameBound::Following(6))),
                ),
            ],
            &data,
        );
        assert_eq!(column(&out, 0), ints(&[100, 100, 100, 100]));
        assert_eq!(column(&out, 1), ints(&[10, 30, 60, 100]));
        assert_eq!(column(&out, 2), ints(&[10, 30, 50, 70]));
        assert_eq!(column(&out, 3), ints(&[0, 0, 0, 0]));
    }

    #[test]
    fn aggregate_filter_does_not_drop_rows() {
        let data = rows(&[(Value::Int(1), Value::Int(1)), (Value::Int(5), Value::Int(2))]);
        let call = WindowFunctionCall::new(WindowFunctionKind::Max, vec![LogicalExpr::column("e1")], WindowSpecification::new())
            .with_filter(LogicalExpr::column("e1").lt(LogicalExpr::integer(3)));
        let out = run(vec![call], &data);
        assert_eq!(column(&out, 0), ints(&[1, 1]));
    }

    #[test]
    fn sum_overflow_is_a_row_error() {
        let data = rows(&[(Value::Int(i64::MAX), Value::Int(1)), (Value::Int(1), Value::Int(2))]);
        let node = WindowExecNode::new(vec![WindowFunctionExpr {
            call: WindowFunctionCall::new(WindowFunctionKind::Sum, vec![LogicalExpr::column("e1")], WindowSpecification::new()),
            alias: "w_0".into(),
        }]);
        let mut out = vec![vec![Value::Null]; 2];
        let err = evaluate_group(&node.functions, &node.groups[0], &data, NullOrder::Low, &mut out).unwrap_err();
        assert!(matches!(err, QueryError::RowEvaluation { ref function, .. } if function == "SUM"));
    }

    #[test]
    fn lead_lag_defaults() {
        let data = rows(&[(Value::from("a"), Value::Int(1)), (Value::from("b"), Value::Int(2))]);
        let out = run(
            vec![
                WindowFunctionCall::new(WindowFunctionKind::Lead, vec![LogicalExpr::column("e1")], by_e2()),
                WindowFunctionCall::new(
                    WindowFunctionKind::Lag,
                    vec![LogicalExpr::column("e1"), LogicalExpr::integer(1), LogicalExpr::column("e2")],
                    by_e2(),
                ),
                WindowFunctionCall::new(
                    WindowFunctionKind::Lead,
                    vec![LogicalExpr::column("e1"), LogicalExpr::integer(0)],
                    by_e2(),
                ),
            ],
            &data,
        );
        assert_eq!(column(&out, 0), vec![Value::from("b"), Value::Null]);
        // the default is evaluated on the current row
        assert_eq!(column(&out, 1), vec![Value::Int(1), Value::from("a")]);
        assert_eq!(column(&out, 2), vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn value_functions_keep_nulls() {
        let data = rows(&[
            (Value::Null, Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
            (Value::from("c"), Value::Int(3)),
        ]);
        let e1 = || vec![LogicalExpr::column("e1")];
        let out = run(
            vec![
                WindowFunctionCall::new(WindowFunctionKind::FirstValue, e1(), by_e2()),
                WindowFunctionCall::new(WindowFunctionKind::LastValue, e1(), by_e2()),
                WindowFunctionCall::new(
                    WindowFunctionKind::NthValue,
                    vec![LogicalExpr::column("e1"), LogicalExpr::integer(2)],
                    by_e2(),
                ),
            ],
            &data,
        );
        assert_eq!(column(&out, 0), vec![Value::Null; 3]);
        assert_eq!(column(&out, 1), vec![Value::Null, Value::from("b"), Value::from("c")]);
        assert_eq!(column(&out, 2), vec![Value::Null, Value::from("b"), Value::from("b")]);
    }
}
