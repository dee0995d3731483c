//! Physical query plan.
//!
//! Physical plans describe *how* a window query runs: which part is sent to
//! the data source as SQL and which operators evaluate the rest locally.
//!
//! # Plan Types
//!
//! - **Access**: the query sent to the source, with its rendered SQL
//! - **Window**: local window function evaluation
//! - **Sort**: local stable sort for ORDER BY keys the source cannot apply
//! - **Project**: final output columns

mod node;
mod source_query;

pub use node::{
    AccessNode, DisplayTree, PhysicalPlan, ProjectExecNode, SortExecNode, WindowExecNode,
    WindowFunctionExpr, WindowGroup,
};
pub use source_query::{SourceQuery, SqlDialect, GROUP_ALIAS};
