//! Row-wise expression evaluation.

use std::cmp::Ordering;

use federadb_core::{CoreError, Value};

use crate::error::QueryError;
use crate::exec::operator::OperatorResult;
use crate::exec::row::Row;
use crate::plan::logical::{BinaryOp, LogicalExpr, PlanError, UnaryOp};

/// Evaluates an expression against a row.
///
/// Comparisons and arithmetic with a NULL operand yield NULL; AND and OR
/// use three-valued logic. Aggregate and window calls are not row-wise
/// expressions and fail.
///
/// # Errors
///
/// Fails on unknown columns, operand type mismatches, integer overflow and
/// division by zero.
pub fn evaluate_expr(expr: &LogicalExpr, row: &Row) -> OperatorResult<Value> {
    match expr {
        LogicalExpr::Literal(value) => Ok(value.clone()),

        LogicalExpr::Column { qualifier, name } => {
            let qualified = qualifier.as_ref().and_then(|q| row.get_by_name(&format!("{q}.{name}")));
            qualified
                .or_else(|| row.get_by_name(name))
                .cloned()
                .ok_or_else(|| QueryError::Plan(PlanError::UnknownColumn(name.clone())))
        }

        LogicalExpr::BinaryOp { left, op, right } => {
            let left = evaluate_expr(left, row)?;
            let right = evaluate_expr(right, row)?;
            evaluate_binary_op(&left, *op, &right)
        }

        LogicalExpr::UnaryOp { op, operand } => {
            let value = evaluate_expr(operand, row)?;
            evaluate_unary_op(*op, &value)
        }

        LogicalExpr::AggregateFunction { func, .. } => Err(QueryError::Plan(PlanError::Unsupported(
            format!("{func} cannot be evaluated row by row"),
        ))),

        LogicalExpr::WindowFunction(call) => Err(QueryError::Plan(PlanError::Unsupported(format!(
            "{} must be evaluated by a window operator",
            call.kind
        )))),

        LogicalExpr::Wildcard => {
            Err(QueryError::Plan(PlanError::Unsupported("* is not a row expression".to_owned())))
        }
    }
}

/// Returns true only for a boolean TRUE; NULL and FALSE reject.
#[must_use]
pub fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn as_truth(value: &Value) -> OperatorResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(CoreError::type_mismatch_with_value("boolean", other.type_name(), other).into()),
    }
}

fn evaluate_binary_op(left: &Value, op: BinaryOp, right: &Value) -> OperatorResult<Value> {
    match op {
        BinaryOp::And => {
            let value = match (as_truth(left)?, as_truth(right)?) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
            Ok(value.map_or(Value::Null, Value::Bool))
        }
        BinaryOp::Or => {
            let value = match (as_truth(left)?, as_truth(right)?) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            };
            Ok(value.map_or(Value::Null, Value::Bool))
        }
        BinaryOp::Add => Ok(left.checked_add(right)?),
        BinaryOp::Sub => Ok(left.checked_sub(right)?),
        BinaryOp::Mul => Ok(left.checked_mul(right)?),
        BinaryOp::Div => Ok(left.checked_div(right)?),
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let ord = left.compare(right);
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
    }
}

fn evaluate_unary_op(op: UnaryOp, value: &Value) -> OperatorResult<Value> {
    match op {
        UnaryOp::Not => Ok(as_truth(value)?.map_or(Value::Null, |b| Value::Bool(!b))),
        UnaryOp::Neg => Ok(value.checked_neg()?),
        UnaryOp::IsNull => Ok(Value::Bool(value.is_null())),
        UnaryOp::IsNotNull => Ok(Value::Bool(!value.is_null())),
    }
}
