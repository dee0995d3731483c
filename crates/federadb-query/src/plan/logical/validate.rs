//! Plan-time validation of window function calls.
//!
//! [`validate_call`] checks a call against its catalog entry before any
//! pushdown decision is made. Failures are usage errors and abort planning.

use thiserror::Error;

use federadb_core::Value;

use crate::plan::capabilities::Capability;
use crate::plan::catalog::WindowFunctionKind;

use super::expr::LogicalExpr;
use super::window::{FrameMode, WindowFunctionCall};

/// Errors raised while planning a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The query needs a construct the source cannot execute and that has no
    /// local fallback.
    #[error("{function}: {clause} requires source capability {capability}")]
    Capability {
        /// The function being planned.
        function: String,
        /// The offending clause.
        clause: String,
        /// The missing capability.
        capability: Capability,
    },

    /// A window function is used incorrectly.
    #[error("invalid use of {function}: {message}")]
    Usage {
        /// The function name.
        function: String,
        /// What is wrong.
        message: String,
    },

    /// Reference to unknown column.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// The query shape is not valid.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Unsupported operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for planning.
pub type PlanResult<T> = Result<T, PlanError>;

fn usage(call: &WindowFunctionCall, message: impl Into<String>) -> PlanError {
    PlanError::Usage { function: call.kind.name().to_owned(), message: message.into() }
}

/// Returns the integer value of a literal argument.
fn literal_int(expr: &LogicalExpr) -> Option<i64> {
    match expr.as_literal() {
        Some(Value::Int(n)) => Some(*n),
        _ => None,
    }
}

/// Validates a window function call against its catalog entry.
///
/// # Errors
///
/// Returns [`PlanError::Usage`] for a wrong argument count, a modifier the
/// function does not accept, a missing ORDER BY, a non-literal or
/// out-of-range offset or bucket count, or an invalid frame.
pub fn validate_call(call: &WindowFunctionCall) -> PlanResult<()> {
    let desc = call.descriptor();

    let argc = call.args.len();
    if argc < desc.min_args || argc > desc.max_args {
        let expected = if desc.min_args == desc.max_args {
            desc.min_args.to_string()
        } else {
            format!("{} to {}", desc.min_args, desc.max_args)
        };
        return Err(usage(call, format!("expected {expected} argument(s), got {argc}")));
    }

    if call.args.iter().any(|arg| arg.contains_window_function()) {
        return Err(usage(call, "window functions cannot be nested"));
    }
    if call.kind != WindowFunctionKind::CountStar
        && call.args.iter().any(|arg| matches!(arg, LogicalExpr::Wildcard))
    {
        return Err(usage(call, "* is only valid in COUNT(*)"));
    }

    if call.distinct && !desc.accepts_distinct {
        return Err(usage(call, "DISTINCT is not allowed"));
    }
    if call.filter.is_some() && !desc.accepts_filter {
        return Err(usage(call, "FILTER is not allowed"));
    }
    if call.filter.as_ref().is_some_and(LogicalExpr::contains_window_function) {
        return Err(usage(call, "FILTER cannot contain a window function"));
    }

    if desc.requires_order_by && !call.spec.has_order_by() {
        return Err(usage(call, "the window must have an ORDER BY"));
    }

    match call.kind {
        WindowFunctionKind::Lead | WindowFunctionKind::Lag => {
            if let Some(offset) = call.args.get(1) {
                match literal_int(offset) {
                    Some(n) if n >= 0 => {}
                    _ => return Err(usage(call, "offset must be a non-negative integer literal")),
                }
            }
        }
        WindowFunctionKind::Ntile => match call.args.first().and_then(literal_int) {
            Some(n) if n > 0 => {}
            _ => return Err(usage(call, "bucket count must be a positive integer literal")),
        },
        WindowFunctionKind::NthValue => match call.args.get(1).and_then(literal_int) {
            Some(n) if n > 0 => {}
            _ => return Err(usage(call, "position must be a positive integer literal")),
        },
        _ => {}
    }

    if let Some(frame) = &call.spec.frame {
        let end = frame.end_bound();
        if frame.mode == FrameMode::Range && (frame.start.is_offset() || end.is_offset()) {
            return Err(usage(call, "RANGE frames only support UNBOUNDED and CURRENT ROW bounds"));
        }
        if frame.start.position() > end.position() || frame.start.position() == i128::MAX {
            return Err(usage(call, format!("frame {frame} starts after it ends")));
        }
        if end.position() == i128::MIN {
            return Err(usage(call, "frame cannot end at UNBOUNDED PRECEDING"));
        }
    }

    Ok(())
}
