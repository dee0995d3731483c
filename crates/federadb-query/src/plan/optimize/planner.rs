//! Window query planner.
//!
//! Turns a [`SelectQuery`] into a [`PhysicalPlan`]. When every window
//! function can be evaluated by the source the whole query becomes a single
//! access; otherwise every window function is evaluated locally over the
//! base columns the source returns:
//!
//! ```text
//! Project(output columns)
//!   Sort(ORDER BY)                 -- only when the source cannot sort
//!     Window(w_0, w_1, ...)
//!       Access(SELECT base columns [WHERE ...] [ORDER BY ...])
//! ```

use serde::{Deserialize, Serialize};

use crate::plan::capabilities::{Capability, NullOrder, SourceCapabilities};
use crate::plan::logical::{
    validate_call, LogicalExpr, PlanError, PlanResult, SelectQuery, SortOrder, WindowFunctionCall,
};
use crate::plan::physical::{
    AccessNode, PhysicalPlan, ProjectExecNode, SortExecNode, SourceQuery, SqlDialect,
    WindowExecNode, WindowFunctionExpr,
};

use super::window_pushdown::{null_ordering_supported, WindowPushdown};

/// Planner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Ask the source to sort local window input by the partition keys so
    /// the window operator can stream one partition at a time.
    pub presort_window_input: bool,
    /// NULL placement the engine uses when none is written.
    pub engine_null_order: NullOrder,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { presort_window_input: false, engine_null_order: NullOrder::Low }
    }
}

impl PlannerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables presorting of local window input.
    #[must_use]
    pub const fn with_presort_window_input(mut self, presort: bool) -> Self {
        self.presort_window_input = presort;
        self
    }

    /// Sets the engine NULL placement.
    #[must_use]
    pub const fn with_engine_null_order(mut self, order: NullOrder) -> Self {
        self.engine_null_order = order;
        self
    }
}

/// Plans window queries against one source.
#[derive(Debug, Clone, Default)]
pub struct WindowPlanner {
    config: PlannerConfig,
    pushdown: WindowPushdown,
}

impl WindowPlanner {
    /// Creates a planner.
    #[must_use]
    pub const fn new(config: PlannerConfig) -> Self {
        Self { config, pushdown: WindowPushdown::new() }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans `query` for a source with the given capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Usage`] for an invalid window function call,
    /// [`PlanError::Capability`] for a frame the source must but cannot
    /// evaluate, and [`PlanError::InvalidQuery`] or
    /// [`PlanError::Unsupported`] for query shapes outside window
    /// evaluation.
    pub fn plan(&self, query: &SelectQuery, caps: &dyn SourceCapabilities) -> PlanResult<PhysicalPlan> {
        check_shape(query)?;

        let order_by: Vec<SortOrder> = query.order_by.iter().map(|key| query.resolve_order_key(key)).collect();
        let calls = unique_window_calls(query, &order_by);
        for call in &calls {
            validate_call(call)?;
        }

        let mut all_pushed = true;
        for call in &calls {
            all_pushed &= self.pushdown.decide(call, caps)?.is_pushdown();
        }

        let dialect = SqlDialect::for_source(caps, self.config.engine_null_order);
        let order_pushable = order_by.is_empty() || sort_pushable(&order_by, caps);

        if all_pushed && order_pushable {
            let source = SourceQuery {
                select: query.projection.iter().map(|item| item.expr.clone()).collect(),
                from: query.from.clone(),
                selection: query.selection.clone(),
                order_by,
            };
            return Ok(access(source, query.output_names(), &dialect));
        }

        self.plan_local(query, order_by, calls, caps, &dialect)
    }

    fn plan_local(
        &self,
        query: &SelectQuery,
        order_by: Vec<SortOrder>,
        calls: Vec<WindowFunctionCall>,
        caps: &dyn SourceCapabilities,
        dialect: &SqlDialect,
    ) -> PlanResult<PhysicalPlan> {
        if let Some(call) = calls.iter().find(|call| call.spec.order_by_references_aggregate()) {
            return Err(PlanError::Unsupported(format!(
                "{}: ordering by an aggregate requires a source that evaluates the window",
                call.kind
            )));
        }

        let mut columns = Vec::new();
        for item in &query.projection {
            collect_base_columns(&item.expr, &mut columns);
        }
        for call in &calls {
            call.collect_columns(&mut columns);
        }
        for key in &order_by {
            collect_base_columns(&key.expr, &mut columns);
        }
        let columns = unqualified(columns);

        let order_local = order_by.iter().any(|key| key.expr.contains_window_function())
            || !sort_pushable(&order_by, caps);

        let mut source = SourceQuery {
            select: columns,
            from: query.from.clone(),
            selection: query.selection.clone(),
            order_by: if order_local {
                Vec::new()
            } else {
                order_by.iter().map(|key| key.with_expr(strip_qualifiers(&key.expr))).collect()
            },
        };

        let presorted = self.presort(&mut source, &order_by, &calls, caps);

        let mut names: Vec<String> =
            source.select.iter().filter_map(LogicalExpr::column_name).map(str::to_owned).collect();
        if source.select.is_empty() {
            source.select.push(LogicalExpr::integer(1));
            names.push("expr1".to_owned());
        }

        let mut plan = access(source, names, dialect);

        let functions: Vec<WindowFunctionExpr> = calls
            .iter()
            .enumerate()
            .map(|(i, call)| WindowFunctionExpr { call: call.clone(), alias: window_alias(i) })
            .collect();
        if !functions.is_empty() {
            let node = WindowExecNode::new(functions)
                .with_presorted(presorted)
                .with_null_order(self.config.engine_null_order);
            plan = PhysicalPlan::Window { node: Box::new(node), input: Box::new(plan) };
        }

        if order_local && !order_by.is_empty() {
            let keys = order_by
                .iter()
                .map(|key| Ok(key.with_expr(replace_windows(&key.expr, &calls)?)))
                .collect::<PlanResult<Vec<_>>>()?;
            plan = PhysicalPlan::Sort {
                node: SortExecNode::new(keys, self.config.engine_null_order),
                input: Box::new(plan),
            };
        }

        let exprs = query
            .projection
            .iter()
            .map(|item| replace_windows(&item.expr, &calls))
            .collect::<PlanResult<Vec<_>>>()?;
        Ok(PhysicalPlan::Project {
            node: ProjectExecNode::new(exprs, query.output_names()),
            input: Box::new(plan),
        })
    }

    /// Adds the partition and order keys of the only window specification
    /// to the source ORDER BY. Returns true when the input will arrive
    /// grouped by partition.
    fn presort(
        &self,
        source: &mut SourceQuery,
        order_by: &[SortOrder],
        calls: &[WindowFunctionCall],
        caps: &dyn SourceCapabilities,
    ) -> bool {
        if !self.config.presort_window_input || !order_by.is_empty() {
            return false;
        }
        let Some(first) = calls.first() else {
            return false;
        };
        if calls.iter().any(|call| call.spec != first.spec) || first.spec.partition_keys().is_empty() {
            return false;
        }
        let keys: Vec<SortOrder> = first
            .spec
            .partition_keys()
            .iter()
            .cloned()
            .map(SortOrder::asc)
            .chain(first.spec.order_keys().iter().cloned())
            .map(|key| key.with_expr(strip_qualifiers(&key.expr)))
            .collect();
        if !sort_pushable(&keys, caps) {
            return false;
        }
        tracing::debug!(spec = %first.spec, "presorting window input at the source");
        source.order_by = keys;
        true
    }
}

fn check_shape(query: &SelectQuery) -> PlanResult<()> {
    if query.projection.is_empty() {
        return Err(PlanError::InvalidQuery("empty projection".to_owned()));
    }
    if query.selection.as_ref().is_some_and(LogicalExpr::contains_window_function) {
        return Err(PlanError::InvalidQuery("window functions are not allowed in WHERE".to_owned()));
    }
    let plain_aggregate = query
        .projection
        .iter()
        .map(|item| &item.expr)
        .chain(query.order_by.iter().map(|key| &key.expr))
        .any(has_plain_aggregate);
    if plain_aggregate {
        return Err(PlanError::Unsupported("aggregate functions outside a window".to_owned()));
    }
    Ok(())
}

/// Returns true if `expr` has an aggregate outside any window call.
fn has_plain_aggregate(expr: &LogicalExpr) -> bool {
    match expr {
        LogicalExpr::AggregateFunction { .. } => true,
        LogicalExpr::BinaryOp { left, right, .. } => has_plain_aggregate(left) || has_plain_aggregate(right),
        LogicalExpr::UnaryOp { operand, .. } => has_plain_aggregate(operand),
        _ => false,
    }
}

fn sort_pushable(keys: &[SortOrder], caps: &dyn SourceCapabilities) -> bool {
    caps.supports(Capability::QueryOrderBy) && keys.iter().all(|key| null_ordering_supported(key, caps))
}

/// Window calls in the projection and ORDER BY, without duplicates.
fn unique_window_calls(query: &SelectQuery, order_by: &[SortOrder]) -> Vec<WindowFunctionCall> {
    let mut found = Vec::new();
    for item in &query.projection {
        item.expr.collect_window_functions(&mut found);
    }
    for key in order_by {
        key.expr.collect_window_functions(&mut found);
    }
    let mut calls: Vec<WindowFunctionCall> = Vec::new();
    for call in found {
        if !calls.contains(call) {
            calls.push(call.clone());
        }
    }
    calls
}

fn window_alias(index: usize) -> String {
    format!("w_{index}")
}

/// Replaces every window call with a reference to its output column.
fn replace_windows(expr: &LogicalExpr, calls: &[WindowFunctionCall]) -> PlanResult<LogicalExpr> {
    let mut found = Vec::new();
    expr.collect_window_functions(&mut found);
    if let Some(call) = found.into_iter().find(|call| !calls.contains(call)) {
        return Err(PlanError::Unsupported(format!("{}: window call has no evaluated output", call.kind)));
    }
    let replaced = expr.transform(&|e| match e {
        LogicalExpr::WindowFunction(call) => calls
            .iter()
            .position(|c| c == call.as_ref())
            .map(|i| LogicalExpr::column(window_alias(i))),
        _ => None,
    });
    Ok(strip_qualifiers(&replaced))
}

/// Collects column references outside window calls.
fn collect_base_columns(expr: &LogicalExpr, out: &mut Vec<LogicalExpr>) {
    match expr {
        LogicalExpr::WindowFunction(_) => {}
        LogicalExpr::BinaryOp { left, right, .. } => {
            collect_base_columns(left, out);
            collect_base_columns(right, out);
        }
        LogicalExpr::UnaryOp { operand, .. } => collect_base_columns(operand, out),
        other => other.collect_columns(out),
    }
}

fn strip_qualifiers(expr: &LogicalExpr) -> LogicalExpr {
    expr.transform(&|e| match e {
        LogicalExpr::Column { qualifier: Some(_), name } => Some(LogicalExpr::column(name.clone())),
        _ => None,
    })
}

/// Drops qualifiers and the duplicates that leaves.
fn unqualified(columns: Vec<LogicalExpr>) -> Vec<LogicalExpr> {
    let mut out: Vec<LogicalExpr> = Vec::with_capacity(columns.len());
    for column in columns {
        let column = strip_qualifiers(&column);
        if !out.contains(&column) {
            out.push(column);
        }
    }
    out
}

fn access(query: SourceQuery, columns: Vec<String>, dialect: &SqlDialect) -> PhysicalPlan {
    let sql = query.to_sql(dialect);
    tracing::debug!(%sql, "generated source query");
    PhysicalPlan::Access(Box::new(AccessNode { query, sql, columns }))
}
