//! `FederaDB` Query
//!
//! Window function planning and evaluation for a federated query engine.
//!
//! # Overview
//!
//! A window query is planned against the capabilities of the data source
//! that owns its table. If the source can evaluate every window function
//! call, the whole query is rendered as one SQL statement and pushed down.
//! Otherwise the source only returns the base columns and the window
//! functions are evaluated locally:
//!
//! ```text
//! Project ← [Sort] ← Window ← Access
//! ```
//!
//! # Modules
//!
//! - [`plan`] - Logical model, function catalog, capabilities, pushdown rule
//!   and physical plans
//! - [`exec`] - Pull-based operators, including the window operator
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use federadb_core::Value;
//! use federadb_query::exec::{ExecutionContext, Executor, HardcodedDataSource};
//! use federadb_query::plan::catalog::WindowFunctionKind;
//! use federadb_query::plan::{
//!     BasicSourceCapabilities, LogicalExpr, PlannerConfig, SelectQuery, SortOrder,
//!     WindowFunctionCall, WindowPlanner, WindowSpecification,
//! };
//!
//! let rank = WindowFunctionCall::new(
//!     WindowFunctionKind::Rank,
//!     vec![],
//!     WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::column("e2"))]),
//! );
//! let query = SelectQuery::new("pm1.g1")
//!     .select(LogicalExpr::column("e1"))
//!     .select_as(LogicalExpr::window(rank), "r");
//!
//! // the source has no window support, so RANK runs locally
//! let caps = BasicSourceCapabilities::typical();
//! let plan = WindowPlanner::new(PlannerConfig::default()).plan(&query, &caps)?;
//! assert_eq!(plan.source_sql(), Some("SELECT g_0.e1, g_0.e2 FROM pm1.g1 AS g_0"));
//!
//! let source = HardcodedDataSource::new().with_data(
//!     "SELECT g_0.e1, g_0.e2 FROM pm1.g1 AS g_0",
//!     vec![
//!         vec![Value::from("a"), Value::Int(2)],
//!         vec![Value::from("b"), Value::Int(1)],
//!     ],
//! );
//! let ctx = ExecutionContext::new().with_data_source(Arc::new(source));
//! let rows = Executor::new(&plan, ctx)?.collect_rows()?;
//! assert_eq!(rows[0].get_by_name("r"), Some(&Value::Int(2)));
//! assert_eq!(rows[1].get_by_name("r"), Some(&Value::Int(1)));
//! # Ok::<(), federadb_query::QueryError>(())
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod exec;
pub mod plan;

pub use error::{QueryError, QueryResult};
pub use exec::{ExecutionConfig, ExecutionContext, Executor, Row, Schema};
pub use plan::{
    BasicSourceCapabilities, Capability, LogicalExpr, NullOrder, PhysicalPlan, PlanError,
    PlannerConfig, SelectQuery, SourceCapabilities, WindowFunctionCall, WindowPlanner,
    WindowSpecification,
};
