//! Query planning.
//!
//! - [`logical`]: expressions, window specifications and the SELECT model
//! - [`catalog`]: the window function catalog
//! - [`capabilities`]: what a source can execute
//! - [`optimize`]: the window pushdown rule and planner facade
//! - [`physical`]: executable plans and source SQL generation

pub mod capabilities;
pub mod catalog;
pub mod logical;
pub mod optimize;
pub mod physical;

pub use capabilities::{BasicSourceCapabilities, Capability, NullOrder, SourceCapabilities};
pub use catalog::{EvaluationBranch, FunctionDescriptor, WindowFunctionKind};
pub use logical::{
    LogicalExpr, PlanError, PlanResult, SelectQuery, SortOrder, WindowFrame, WindowFunctionCall,
    WindowSpecification,
};
pub use optimize::{PlannerConfig, WindowPlanner};
pub use physical::{PhysicalPlan, SourceQuery};
