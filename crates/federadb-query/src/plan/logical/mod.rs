//! Logical query model.
//!
//! Expressions, window specifications and calls, and the single-source
//! SELECT command the window planner consumes.

pub mod expr;
pub mod query;
pub mod validate;
pub mod window;

pub use expr::{AggregateFunction, BinaryOp, LogicalExpr, SortOrder, UnaryOp};
pub use query::{GroupSymbol, SelectItem, SelectQuery};
pub use validate::{validate_call, PlanError, PlanResult};
pub use window::{FrameBound, FrameMode, WindowFrame, WindowFunctionCall, WindowSpecification};
