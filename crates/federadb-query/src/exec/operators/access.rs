//! Access operator.
//!
//! Sends the SQL of an access node to the context's data source and
//! streams back the rows it returns.

use std::sync::Arc;

use crate::error::QueryError;
use crate::exec::context::{CancellationToken, ExecutionContext, ExecutionStats};
use crate::exec::operator::{BoxedOperator, Operator, OperatorBase, OperatorResult, OperatorState};
use crate::exec::row::{Row, Schema};
use crate::plan::physical::AccessNode;

/// Access operator.
pub struct AccessOp {
    base: OperatorBase,
    sql: String,
    source_rows: Option<BoxedOperator>,
    cancellation: CancellationToken,
    stats: Option<Arc<ExecutionStats>>,
}

impl AccessOp {
    /// Creates an access operator for a planned source query.
    #[must_use]
    pub fn new(node: &AccessNode) -> Self {
        Self {
            base: OperatorBase::new(Arc::new(Schema::new(node.columns.clone()))),
            sql: node.sql.clone(),
            source_rows: None,
            cancellation: CancellationToken::new(),
            stats: None,
        }
    }

    /// Returns the SQL sent to the source.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Operator for AccessOp {
    fn open(&mut self, ctx: &ExecutionContext) -> OperatorResult<()> {
        let source = ctx
            .data_source()
            .ok_or_else(|| QueryError::Source("no data source configured".to_owned()))?;

        tracing::debug!(sql = %self.sql, "executing source query");
        let mut rows = source.execute(&self.sql, self.base.schema())?;
        rows.open(ctx)?;

        self.source_rows = Some(rows);
        self.cancellation = ctx.cancellation_token();
        self.stats = ctx.stats_handle();
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> OperatorResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        let Some(rows) = self.source_rows.as_mut() else {
            return Ok(None);
        };
        if self.cancellation.is_cancelled() {
            tracing::warn!(sql = %self.sql, "source query cancelled");
            return Err(QueryError::Cancelled);
        }

        match rows.next()? {
            Some(row) => {
                if let Some(stats) = &self.stats {
                    stats.add_rows_read(1);
                }
                self.base.inc_rows_produced();
                Ok(Some(Row::new(self.base.schema(), row.into_values())))
            }
            None => {
                self.base.set_finished();
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> OperatorResult<()> {
        if let Some(mut rows) = self.source_rows.take() {
            rows.close()?;
        }
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
        "Access"
    }
}
