//! Window query optimization.
//!
//! - **Window Pushdown**: decide per window function call whether the
//!   source can evaluate it
//! - **Planner**: build the physical plan, pushing the whole query to the
//!   source or evaluating window functions locally
//!
//! # Example
//!
//! ```
//! use federadb_query::plan::capabilities::BasicSourceCapabilities;
//! use federadb_query::plan::catalog::WindowFunctionKind;
//! use federadb_query::plan::logical::{
//!     LogicalExpr, SelectQuery, SortOrder, WindowFunctionCall, WindowSpecification,
//! };
//! use federadb_query::plan::optimize::{PlannerConfig, WindowPlanner};
//!
//! let rank = WindowFunctionCall::new(
//!     WindowFunctionKind::Rank,
//!     vec![],
//!     WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::column("e1"))]),
//! );
//! let query = SelectQuery::new("pm1.g1")
//!     .select(LogicalExpr::column("e1"))
//!     .select(LogicalExpr::window(rank));
//!
//! let plan = WindowPlanner::new(PlannerConfig::default())
//!     .plan(&query, &BasicSourceCapabilities::typical())
//!     .unwrap();
//! assert_eq!(plan.source_sql(), Some("SELECT g_0.e1 FROM pm1.g1 AS g_0"));
//! ```

mod planner;
mod window_pushdown;

pub use planner::{PlannerConfig, WindowPlanner};
pub use window_pushdown::{null_ordering_supported, LocalReason, WindowPlacement, WindowPushdown};
