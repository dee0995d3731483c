//! Property-based tests for local window evaluation.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use proptest::prelude::*;

use federadb_core::Value;
use federadb_query::exec::{ExecutionContext, Executor, HardcodedDataSource};
use federadb_query::plan::catalog::WindowFunctionKind;
use federadb_query::plan::{
    BasicSourceCapabilities, LogicalExpr, PlannerConfig, SelectQuery, SortOrder, WindowFunctionCall,
    WindowPlanner, WindowSpecification,
};

const LOCAL_SQL: &str = "SELECT g_0.p, g_0.o FROM t AS g_0";
const PRESORTED_SQL: &str = "SELECT g_0.p AS c_0, g_0.o AS c_1 FROM t AS g_0 ORDER BY c_0, c_1";

/// Rows of `(p, o)`; `None` is a NULL ordering key.
fn arb_rows() -> impl Strategy<Value = Vec<(i64, Option<i64>)>> {
    prop::collection::vec((0..3i64, prop::option::of(0..5i64)), 0..40)
}

fn to_values(rows: &[(i64, Option<i64>)]) -> Vec<Vec<Value>> {
    rows.iter().map(|(p, o)| vec![Value::Int(*p), o.map_or(Value::Null, Value::Int)]).collect()
}

fn ranked(kind: WindowFunctionKind) -> LogicalExpr {
    let spec = WindowSpecification::new()
        .partition_by(vec![LogicalExpr::column("p")])
        .order_by(vec![SortOrder::asc(LogicalExpr::column("o"))]);
    LogicalExpr::window(WindowFunctionCall::new(kind, vec![], spec))
}

fn ranking_query() -> SelectQuery {
    SelectQuery::new("t")
        .select(LogicalExpr::column("p"))
        .select(LogicalExpr::column("o"))
        .select_as(ranked(WindowFunctionKind::RowNumber), "rn")
        .select_as(ranked(WindowFunctionKind::Rank), "rk")
        .select_as(ranked(WindowFunctionKind::DenseRank), "dr")
}

fn execute(query: &SelectQuery, config: PlannerConfig, sql: &str, rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let plan = WindowPlanner::new(config).plan(query, &BasicSourceCapabilities::typical()).unwrap();
    assert_eq!(plan.source_sql(), Some(sql));
    let source = HardcodedDataSource::new().with_data(sql, rows);
    let ctx = ExecutionContext::new().with_data_source(Arc::new(source));
    Executor::new(&plan, ctx)
        .unwrap()
        .collect_rows()
        .unwrap()
        .into_iter()
        .map(|row| row.into_values())
        .collect()
}

fn int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        other => panic!("expected an integer, got {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rows_keep_input_order(rows in arb_rows()) {
        let input = to_values(&rows);
        let output = execute(&ranking_query(), PlannerConfig::default(), LOCAL_SQL, input.clone());

        prop_assert_eq!(output.len(), input.len());
        for (out, row) in output.iter().zip(&input) {
            prop_assert_eq!(&out[..2], &row[..]);
        }
    }

    #[test]
    fn ranks_follow_the_ordering_key(rows in arb_rows()) {
        let output = execute(&ranking_query(), PlannerConfig::default(), LOCAL_SQL, to_values(&rows));

        for (i, (p, o)) in rows.iter().enumerate() {
            let peers: Vec<Option<i64>> =
                rows.iter().filter(|(q, _)| q == p).map(|(_, key)| *key).collect();
            let below = peers.iter().filter(|key| *key < o).count() as i64;
            let mut distinct_below: Vec<Option<i64>> =
                peers.iter().copied().filter(|key| key < o).collect();
            distinct_below.sort_unstable();
            distinct_below.dedup();

            let (rn, rk, dr) = (int(&output[i][2]), int(&output[i][3]), int(&output[i][4]));
            prop_assert_eq!(rk, below + 1);
            prop_assert_eq!(dr, distinct_below.len() as i64 + 1);
            prop_assert!(rk <= rn);
            prop_assert!(rn <= peers.len() as i64);
        }
    }

    #[test]
    fn row_numbers_are_a_permutation_per_partition(rows in arb_rows()) {
        let output = execute(&ranking_query(), PlannerConfig::default(), LOCAL_SQL, to_values(&rows));

        for p in 0..3 {
            let mut numbers: Vec<i64> =
                output.iter().filter(|row| row[0] == Value::Int(p)).map(|row| int(&row[2])).collect();
            numbers.sort_unstable();
            let expected: Vec<i64> = (1..=numbers.len() as i64).collect();
            prop_assert_eq!(numbers, expected);
        }
    }

    #[test]
    fn streaming_matches_materialized(mut rows in arb_rows()) {
        // the presorted source returns rows ordered by partition, then key
        rows.sort();
        let input = to_values(&rows);

        let streamed = execute(
            &ranking_query(),
            PlannerConfig::new().with_presort_window_input(true),
            PRESORTED_SQL,
            input.clone(),
        );
        let materialized = execute(&ranking_query(), PlannerConfig::default(), LOCAL_SQL, input);
        prop_assert_eq!(streamed, materialized);
    }

    #[test]
    fn count_over_empty_window_is_row_count(rows in arb_rows()) {
        let query = SelectQuery::new("t").select(LogicalExpr::column("p")).select_as(
            LogicalExpr::window(WindowFunctionCall::new(
                WindowFunctionKind::CountStar,
                vec![],
                WindowSpecification::new(),
            )),
            "n",
        );
        let input: Vec<Vec<Value>> = rows.iter().map(|(p, _)| vec![Value::Int(*p)]).collect();
        let output = execute(&query, PlannerConfig::default(), "SELECT g_0.p FROM t AS g_0", input);

        for row in &output {
            prop_assert_eq!(int(&row[1]), rows.len() as i64);
        }
    }
}
