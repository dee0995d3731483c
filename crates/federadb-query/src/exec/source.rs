//! Data sources.
//!
//! A [`DataSource`] executes the SQL produced for an access node and
//! returns the rows as an operator. [`HardcodedDataSource`] answers from a
//! fixed table of SQL text to rows and records every query it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use federadb_core::Value;

use crate::error::QueryError;

use super::operator::{BoxedOperator, OperatorResult};
use super::operators::values::ValuesOp;
use super::row::Schema;

/// Something that can run a source query.
pub trait DataSource: Send + Sync {
    /// Executes `sql`, returning rows shaped by `schema`.
    fn execute(&self, sql: &str, schema: Arc<Schema>) -> OperatorResult<BoxedOperator>;
}

/// A data source answering from registered query results.
#[derive(Debug, Default)]
pub struct HardcodedDataSource {
    data: HashMap<String, Vec<Vec<Value>>>,
    executed: Mutex<Vec<String>>,
}

impl HardcodedDataSource {
    /// Creates a source with no registered queries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the rows returned for an exact SQL string.
    pub fn add_data(&mut self, sql: impl Into<String>, rows: Vec<Vec<Value>>) {
        self.data.insert(sql.into(), rows);
    }

    /// Builder form of [`add_data`](Self::add_data).
    #[must_use]
    pub fn with_data(mut self, sql: impl Into<String>, rows: Vec<Vec<Value>>) -> Self {
        self.add_data(sql, rows);
        self
    }

    /// Returns every query executed so far, in order.
    #[must_use]
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().map(|queries| queries.clone()).unwrap_or_default()
    }
}

impl DataSource for HardcodedDataSource {
    fn execute(&self, sql: &str, schema: Arc<Schema>) -> OperatorResult<BoxedOperator> {
        self.executed
            .lock()
            .map_err(|e| QueryError::Source(format!("query log poisoned: {e}")))?
            .push(sql.to_owned());

        let rows = self
            .data
            .get(sql)
            .ok_or_else(|| QueryError::Source(format!("no data registered for query: {sql}")))?;

        if let Some(row) = rows.iter().find(|row| row.len() != schema.len()) {
            return Err(QueryError::Source(format!(
                "row has {} values, query returns {} columns",
                row.len(),
                schema.len()
            )));
        }

        Ok(Box::new(ValuesOp::new(schema, rows.clone())))
    }
}
