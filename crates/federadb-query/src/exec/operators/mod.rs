//! Concrete operator implementations.
//!
//! - [`access`]: source query execution
//! - [`values`]: inline rows
//! - [`window`]: window function evaluation
//! - [`sort`]: stable local sort
//! - [`project`]: output projection
//! - [`eval`]: row-wise expression evaluation shared by the operators

pub mod access;
pub mod eval;
pub mod project;
pub mod sort;
pub mod values;
pub mod window;

pub use access::AccessOp;
pub use eval::evaluate_expr;
pub use project::ProjectOp;
pub use sort::SortOp;
pub use values::ValuesOp;
pub use window::WindowOp;
