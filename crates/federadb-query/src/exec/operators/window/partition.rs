//! Partitioning and peer groups.
//!
//! Buffered rows are put in window order with a stable index sort, then cut
//! into partitions (runs of equal partition keys) and, inside each
//! partition, peer groups (runs of equal order keys).

use std::cmp::Ordering;
use std::ops::Range;

use federadb_core::{compare_with_nulls, Value};

use crate::error::QueryError;
use crate::exec::operator::OperatorResult;
use crate::exec::operators::eval::evaluate_expr;
use crate::exec::operators::sort::compare_keys;
use crate::exec::row::Row;
use crate::plan::capabilities::NullOrder;
use crate::plan::logical::{LogicalExpr, WindowSpecification};

/// Rows of one partition in window order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Partition {
    /// Indexes into the evaluated row buffer.
    pub rows: Vec<usize>,
    /// Peer group of each position.
    peers: Vec<Range<usize>>,
}

impl Partition {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns the positions tied with `pos` on the order keys.
    pub(crate) fn peers(&self, pos: usize) -> Range<usize> {
        self.peers[pos].clone()
    }
}

/// Partition and order key values for each buffered row.
#[derive(Debug, Default)]
pub(crate) struct WindowKeys {
    partition: Vec<Vec<Value>>,
    order: Vec<Vec<Value>>,
}

/// Evaluates a list of key expressions over a row.
pub(crate) fn evaluate_key(exprs: &[LogicalExpr], row: &Row, clause: &str) -> OperatorResult<Vec<Value>> {
    exprs
        .iter()
        .map(|expr| evaluate_expr(expr, row).map_err(|e| QueryError::row_evaluation(clause, e)))
        .collect()
}

/// Returns true if two keys are equal, NULLs included.
pub(crate) fn keys_equal(a: &[Value], b: &[Value]) -> bool {
    a.iter().zip(b).all(|(a, b)| compare_with_nulls(a, b, true) == Ordering::Equal)
}

impl WindowKeys {
    pub(crate) fn evaluate(spec: &WindowSpecification, rows: &[Row]) -> OperatorResult<Self> {
        let order_exprs: Vec<LogicalExpr> = spec.order_keys().iter().map(|k| k.expr.clone()).collect();
        let mut keys = Self {
            partition: Vec::with_capacity(rows.len()),
            order: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            keys.partition.push(evaluate_key(spec.partition_keys(), row, "PARTITION BY")?);
            keys.order.push(evaluate_key(&order_exprs, row, "ORDER BY")?);
        }
        Ok(keys)
    }
}

/// Sorts the rows into window order and splits them into partitions.
///
/// Partitions come out in ascending key order; rows with equal keys keep
/// their buffer order.
pub(crate) fn partition_rows(
    spec: &WindowSpecification,
    keys: &WindowKeys,
    null_order: NullOrder,
) -> Vec<Partition> {
    let order = spec.order_keys();
    let mut indices: Vec<usize> = (0..keys.order.len()).collect();
    indices.sort_by(|&a, &b| {
        keys.partition[a]
            .iter()
            .zip(&keys.partition[b])
            .map(|(x, y)| compare_with_nulls(x, y, true))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| compare_keys(&keys.order[a], &keys.order[b], order, null_order))
    });

    let mut partitions = Vec::new();
    let mut start = 0;
    while start < indices.len() {
        let key = &keys.partition[indices[start]];
        let end = indices[start..]
            .iter()
            .position(|&i| !keys_equal(&keys.partition[i], key))
            .map_or(indices.len(), |offset| start + offset);
        partitions.push(build_partition(indices[start..end].to_vec(), &keys.order));
        start = end;
    }
    partitions
}

fn build_partition(rows: Vec<usize>, order_keys: &[Vec<Value>]) -> Partition {
    let mut peers = Vec::with_capacity(rows.len());
    let mut group_start = 0;
    for pos in 1..=rows.len() {
        let boundary =
            pos == rows.len() || !keys_equal(&order_keys[rows[pos]], &order_keys[rows[group_start]]);
        if boundary {
            peers.extend(std::iter::repeat(group_start..pos).take(pos - group_start));
            group_start = pos;
        }
    }
    Partition { rows, peers }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::exec::row::Schema;
    use crate::plan::logical::SortOrder;

    fn rows(data: &[(Value, i64)]) -> Vec<Row> {
        let schema = Arc::new(Schema::from(vec!["k", "v"]));
        data.iter()
            .map(|(k, v)| Row::new(Arc::clone(&schema), vec![k.clone(), Value::Int(*v)]))
            .collect()
    }

    #[test]
    fn splits_partitions_and_peers() {
        let rows = rows(&[
            (Value::from("x"), 2),
            (Value::from("y"), 1),
            (Value::from("x"), 1),
            (Value::from("x"), 2),
        ]);
        let spec = WindowSpecification::new()
            .partition_by(vec![LogicalExpr::column("k")])
            .order_by(vec![SortOrder::asc(LogicalExpr::column("v"))]);
        let keys = WindowKeys::evaluate(&spec, &rows).unwrap();
        let parts = partition_rows(&spec, &keys, NullOrder::Low);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].rows, vec![2, 0, 3]);
        assert_eq!(parts[0].peers(0), 0..1);
        assert_eq!(parts[0].peers(1), 1..3);
        assert_eq!(parts[0].peers(2), 1..3);
        assert_eq!(parts[1].rows, vec![1]);
    }

    #[test]
    fn null_partition_keys_group_together() {
        let rows = rows(&[(Value::Null, 1), (Value::from("a"), 2), (Value::Null, 3)]);
        let spec = WindowSpecification::new().partition_by(vec![LogicalExpr::column("k")]);
        let keys = WindowKeys::evaluate(&spec, &rows).unwrap();
        let parts = partition_rows(&spec, &keys, NullOrder::Low);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].rows, vec![0, 2]);
        // without ORDER BY every row of a partition is a peer
        assert_eq!(parts[0].peers(0), 0..2);
    }

    #[test]
    fn empty_input_has_no_partitions() {
        let spec = WindowSpecification::new();
        let keys = WindowKeys::evaluate(&spec, &[]).unwrap();
        assert!(partition_rows(&spec, &keys, NullOrder::Low).is_empty());
    }

    #[test]
    fn key_errors_name_the_clause() {
        let rows = rows(&[(Value::from("a"), 1)]);
        let spec = WindowSpecification::new()
            .order_by(vec![SortOrder::asc(LogicalExpr::column("v").div(LogicalExpr::integer(0)))]);
        let err = WindowKeys::evaluate(&spec, &rows).unwrap_err();
        assert_eq!(err.to_string(), "error evaluating ORDER BY: division by zero");
    }
}
