//! Query execution.
//!
//! Plans run as a tree of pull-based [`Operator`]s. The [`Executor`] builds
//! the tree from a [`PhysicalPlan`](crate::plan::PhysicalPlan) and drives it.

pub mod context;
pub mod executor;
pub mod operator;
pub mod operators;
pub mod row;
pub mod source;

pub use context::{CancellationToken, ExecutionConfig, ExecutionContext, ExecutionStats};
pub use executor::{build_operator, execute_plan, Executor};
pub use operator::{BoxedOperator, Operator, OperatorBase, OperatorResult, OperatorState};
pub use row::{Row, Schema};
pub use source::{DataSource, HardcodedDataSource};
