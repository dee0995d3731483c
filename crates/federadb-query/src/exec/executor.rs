//! Main query executor.
//!
//! This module provides the [`Executor`] that builds and runs operator
//! trees from physical plans.

use std::sync::Arc;

use crate::error::QueryError;
use crate::plan::physical::PhysicalPlan;

use super::context::ExecutionContext;
use super::operator::{BoxedOperator, OperatorResult, OperatorState};
use super::operators::{AccessOp, ProjectOp, SortOp, WindowOp};
use super::row::{Row, Schema};

/// The main query executor.
///
/// Builds an operator tree from a physical plan and pulls rows from it.
pub struct Executor {
    root: BoxedOperator,
    ctx: ExecutionContext,
    opened: bool,
}

impl Executor {
    /// Creates a new executor for the given physical plan.
    ///
    /// # Errors
    ///
    /// Fails if the plan cannot be turned into operators.
    pub fn new(plan: &PhysicalPlan, ctx: ExecutionContext) -> OperatorResult<Self> {
        let root = build_operator(plan)?;
        Ok(Self { root, ctx, opened: false })
    }

    /// Returns the output schema.
    #[must_use]
    pub fn schema(&self) -> Arc<Schema> {
        self.root.schema()
    }

    /// Opens the operator tree. Opening twice is a no-op.
    pub fn open(&mut self) -> OperatorResult<()> {
        if !self.opened {
            self.root.open(&self.ctx)?;
            self.opened = true;
        }
        Ok(())
    }

    /// Returns the next row, or `None` if there are no more rows.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Cancelled`] once the context is cancelled, and
    /// any error raised by an operator.
    pub fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.open()?;

        if self.ctx.is_cancelled() {
            tracing::warn!("query execution cancelled");
            return Err(QueryError::Cancelled);
        }

        let row = self.root.next()?;
        if row.is_some() {
            self.ctx.record_rows_produced(1);
        }
        Ok(row)
    }

    /// Closes the executor and releases resources.
    pub fn close(&mut self) -> OperatorResult<()> {
        if self.opened {
            self.root.close()?;
            self.opened = false;
        }
        Ok(())
    }

    /// Returns the execution context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Returns the state of the root operator.
    #[must_use]
    pub fn state(&self) -> OperatorState {
        self.root.state()
    }

    /// Runs the plan to completion and returns every row.
    pub fn collect_rows(&mut self) -> OperatorResult<Vec<Row>> {
        self.open()?;

        let mut rows = Vec::new();
        while let Some(row) = self.next()? {
            rows.push(row);
        }

        self.close()?;
        Ok(rows)
    }
}

/// Builds an operator tree from a physical plan.
pub fn build_operator(plan: &PhysicalPlan) -> OperatorResult<BoxedOperator> {
    match plan {
        PhysicalPlan::Access(node) => Ok(Box::new(AccessOp::new(node))),

        PhysicalPlan::Window { node, input } => {
            let input_op = build_operator(input)?;
            Ok(Box::new(WindowOp::new((**node).clone(), input_op)))
        }

        PhysicalPlan::Sort { node, input } => {
            let input_op = build_operator(input)?;
            Ok(Box::new(SortOp::new(node.order_by.clone(), node.null_order, input_op)))
        }

        PhysicalPlan::Project { node, input } => {
            let input_op = build_operator(input)?;
            Ok(Box::new(ProjectOp::new(node.exprs.clone(), node.names.clone(), input_op)))
        }
    }
}

/// Executes a plan against a context and collects the rows.
pub fn execute_plan(plan: &PhysicalPlan, ctx: ExecutionContext) -> OperatorResult<Vec<Row>> {
    Executor::new(plan, ctx)?.collect_rows()
}
