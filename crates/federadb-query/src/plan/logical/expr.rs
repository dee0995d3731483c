//! Logical plan expressions.
//!
//! This module defines the expression types used in queries handed to the
//! planner and in the plans it produces.

// Allow arithmetic method names that match std traits - we intentionally
// don't implement the traits because these return new expressions, not Self
#![allow(clippy::should_implement_trait)]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use federadb_core::Value;

use super::window::WindowFunctionCall;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition (+).
    Add,
    /// Subtraction (-).
    Sub,
    /// Multiplication (*).
    Mul,
    /// Division (/).
    Div,
    /// Equal (=).
    Eq,
    /// Not equal (<>).
    NotEq,
    /// Less than (<).
    Lt,
    /// Less than or equal (<=).
    LtEq,
    /// Greater than (>).
    Gt,
    /// Greater than or equal (>=).
    GtEq,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{op}")
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Numeric negation (-).
    Neg,
    /// IS NULL.
    IsNull,
    /// IS NOT NULL.
    IsNotNull,
}

/// Plain (non-window) aggregate functions.
///
/// These only appear inside window ORDER BY keys, where the planner needs to
/// know that a key references an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    /// COUNT(expr).
    Count,
    /// SUM(expr).
    Sum,
    /// AVG(expr).
    Avg,
    /// MIN(expr).
    Min,
    /// MAX(expr).
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        };
        write!(f, "{name}")
    }
}

/// An expression in a query or plan.
///
/// Float literals compare and hash by their bit pattern, so a NaN literal
/// equals itself and `0.0` differs from `-0.0`, matching how they render.
#[derive(Debug, Clone)]
pub enum LogicalExpr {
    /// A literal value.
    Literal(Value),

    /// A column reference with optional table qualifier.
    Column {
        /// Table/alias qualifier (e.g., "g1" in "g1.e1").
        qualifier: Option<String>,
        /// Column name.
        name: String,
    },

    /// A binary operation.
    BinaryOp {
        /// Left operand.
        left: Box<LogicalExpr>,
        /// The operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<LogicalExpr>,
    },

    /// A unary operation.
    UnaryOp {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<LogicalExpr>,
    },

    /// A plain aggregate function call.
    AggregateFunction {
        /// Aggregate function.
        func: AggregateFunction,
        /// Arguments to the aggregate function.
        args: Vec<LogicalExpr>,
        /// Whether DISTINCT is specified.
        distinct: bool,
    },

    /// A window function call with its OVER clause.
    WindowFunction(Box<WindowFunctionCall>),

    /// Wildcard (*), only valid as the argument of `COUNT(*)`.
    Wildcard,
}

impl LogicalExpr {
    // ========== Literals ==========

    /// Creates a NULL literal.
    #[must_use]
    pub const fn null() -> Self {
        Self::Literal(Value::Null)
    }

    /// Creates a boolean literal.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }

    /// Creates an integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Value::Int(value))
    }

    /// Creates a float literal.
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::Literal(Value::Float(value))
    }

    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Value::String(value.into()))
    }

    /// Creates a literal from any value.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    // ========== Columns ==========

    /// Creates an unqualified column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column { qualifier: None, name: name.into() }
    }

    /// Creates a qualified column reference.
    #[must_use]
    pub fn qualified_column(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column { qualifier: Some(qualifier.into()), name: name.into() }
    }

    /// Creates a wildcard.
    #[must_use]
    pub const fn wildcard() -> Self {
        Self::Wildcard
    }

    // ========== Operators ==========

    fn binary(self, op: BinaryOp, other: Self) -> Self {
        Self::BinaryOp { left: Box::new(self), op, right: Box::new(other) }
    }

    fn unary(self, op: UnaryOp) -> Self {
        Self::UnaryOp { op, operand: Box::new(self) }
    }

    /// Creates `self AND other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// Creates `self OR other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// Creates `self = other`.
    #[must_use]
    pub fn eq(self, other: Self) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// Creates `self <> other`.
    #[must_use]
    pub fn not_eq(self, other: Self) -> Self {
        self.binary(BinaryOp::NotEq, other)
    }

    /// Creates `self < other`.
    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    /// Creates `self <= other`.
    #[must_use]
    pub fn lt_eq(self, other: Self) -> Self {
        self.binary(BinaryOp::LtEq, other)
    }

    /// Creates `self > other`.
    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    /// Creates `self >= other`.
    #[must_use]
    pub fn gt_eq(self, other: Self) -> Self {
        self.binary(BinaryOp::GtEq, other)
    }

    /// Creates `self + other`.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    /// Creates `self - other`.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    /// Creates `self * other`.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    /// Creates `self / other`.
    #[must_use]
    pub fn div(self, other: Self) -> Self {
        self.binary(BinaryOp::Div, other)
    }

    /// Creates `NOT self`.
    #[must_use]
    pub fn not(self) -> Self {
        self.unary(UnaryOp::Not)
    }

    /// Creates `-self`.
    #[must_use]
    pub fn neg(self) -> Self {
        self.unary(UnaryOp::Neg)
    }

    /// Creates `self IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        self.unary(UnaryOp::IsNull)
    }

    /// Creates `self IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.unary(UnaryOp::IsNotNull)
    }

    // ========== Functions ==========

    /// Creates a plain aggregate call.
    #[must_use]
    pub fn aggregate(func: AggregateFunction, arg: Self, distinct: bool) -> Self {
        Self::AggregateFunction { func, args: vec![arg], distinct }
    }

    /// Wraps a window function call.
    #[must_use]
    pub fn window(call: WindowFunctionCall) -> Self {
        Self::WindowFunction(Box::new(call))
    }

    // ========== Inspection ==========

    /// Returns the column name if this is a column reference.
    #[must_use]
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Self::Column { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the literal value if this is a literal.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if this expression contains a plain aggregate function.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::AggregateFunction { .. } => true,
            Self::BinaryOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Self::UnaryOp { operand, .. } => operand.contains_aggregate(),
            Self::WindowFunction(call) => {
                call.args.iter().any(Self::contains_aggregate)
                    || call.spec.partition_keys().iter().any(Self::contains_aggregate)
                    || call.spec.order_keys().iter().any(|s| s.expr.contains_aggregate())
            }
            _ => false,
        }
    }

    /// Returns true if this expression contains a window function.
    #[must_use]
    pub fn contains_window_function(&self) -> bool {
        match self {
            Self::WindowFunction(_) => true,
            Self::BinaryOp { left, right, .. } => {
                left.contains_window_function() || right.contains_window_function()
            }
            Self::UnaryOp { operand, .. } => operand.contains_window_function(),
            Self::AggregateFunction { args, .. } => args.iter().any(Self::contains_window_function),
            _ => false,
        }
    }

    /// Appends every column referenced by this expression to `out`, in order
    /// of first appearance, skipping columns already present.
    ///
    /// Inside a window function the order is arguments, filter, partition
    /// keys, then order keys.
    pub fn collect_columns(&self, out: &mut Vec<LogicalExpr>) {
        match self {
            Self::Column { .. } => {
                if !out.contains(self) {
                    out.push(self.clone());
                }
            }
            Self::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Self::UnaryOp { operand, .. } => operand.collect_columns(out),
            Self::AggregateFunction { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
            Self::WindowFunction(call) => call.collect_columns(out),
            Self::Literal(_) | Self::Wildcard => {}
        }
    }

    /// Collects every window function call in this expression, in order of
    /// appearance.
    pub fn collect_window_functions<'a>(&'a self, out: &mut Vec<&'a WindowFunctionCall>) {
        match self {
            Self::WindowFunction(call) => out.push(call.as_ref()),
            Self::BinaryOp { left, right, .. } => {
                left.collect_window_functions(out);
                right.collect_window_functions(out);
            }
            Self::UnaryOp { operand, .. } => operand.collect_window_functions(out),
            Self::AggregateFunction { args, .. } => {
                for arg in args {
                    arg.collect_window_functions(out);
                }
            }
            Self::Literal(_) | Self::Column { .. } | Self::Wildcard => {}
        }
    }

    /// Rewrites the expression bottom-up, replacing every node for which
    /// `f` returns `Some`.
    #[must_use]
    pub fn transform(&self, f: &impl Fn(&Self) -> Option<Self>) -> Self {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            Self::BinaryOp { left, op, right } => Self::BinaryOp {
                left: Box::new(left.transform(f)),
                op: *op,
                right: Box::new(right.transform(f)),
            },
            Self::UnaryOp { op, operand } => {
                Self::UnaryOp { op: *op, operand: Box::new(operand.transform(f)) }
            }
            Self::AggregateFunction { func, args, distinct } => Self::AggregateFunction {
                func: *func,
                args: args.iter().map(|a| a.transform(f)).collect(),
                distinct: *distinct,
            },
            other => other.clone(),
        }
    }
}

fn literal_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn hash_literal<H: Hasher>(value: &Value, state: &mut H) {
    mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Int(i) => i.hash(state),
        Value::Float(x) => x.to_bits().hash(state),
        Value::String(s) => s.hash(state),
        Value::Bytes(b) => b.hash(state),
    }
}

impl PartialEq for LogicalExpr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => literal_eq(a, b),
            (Self::Column { qualifier: q1, name: n1 }, Self::Column { qualifier: q2, name: n2 }) => {
                q1 == q2 && n1 == n2
            }
            (
                Self::BinaryOp { left: l1, op: o1, right: r1 },
                Self::BinaryOp { left: l2, op: o2, right: r2 },
            ) => o1 == o2 && l1 == l2 && r1 == r2,
            (Self::UnaryOp { op: o1, operand: e1 }, Self::UnaryOp { op: o2, operand: e2 }) => {
                o1 == o2 && e1 == e2
            }
            (
                Self::AggregateFunction { func: f1, args: a1, distinct: d1 },
                Self::AggregateFunction { func: f2, args: a2, distinct: d2 },
            ) => f1 == f2 && d1 == d2 && a1 == a2,
            (Self::WindowFunction(a), Self::WindowFunction(b)) => a == b,
            (Self::Wildcard, Self::Wildcard) => true,
            _ => false,
        }
    }
}

impl Eq for LogicalExpr {}

impl Hash for LogicalExpr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Self::Literal(value) => hash_literal(value, state),
            Self::Column { qualifier, name } => {
                qualifier.hash(state);
                name.hash(state);
            }
            Self::BinaryOp { left, op, right } => {
                left.hash(state);
                op.hash(state);
                right.hash(state);
            }
            Self::UnaryOp { op, operand } => {
                op.hash(state);
                operand.hash(state);
            }
            Self::AggregateFunction { func, args, distinct } => {
                func.hash(state);
                args.hash(state);
                distinct.hash(state);
            }
            Self::WindowFunction(call) => call.hash(state),
            Self::Wildcard => {}
        }
    }
}

impl From<Value> for LogicalExpr {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

/// Formats a literal the way it is written in SQL.
pub(crate) fn fmt_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "NULL"),
        Value::Bool(true) => write!(f, "TRUE"),
        Value::Bool(false) => write!(f, "FALSE"),
        Value::Int(i) => write!(f, "{i}"),
        Value::Float(x) => {
            if x.is_finite() && x.fract() == 0.0 {
                write!(f, "{x:.1}")
            } else {
                write!(f, "{x}")
            }
        }
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::Bytes(b) => {
            write!(f, "X'")?;
            for byte in b {
                write!(f, "{byte:02X}")?;
            }
            write!(f, "'")
        }
    }
}

impl fmt::Display for LogicalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => fmt_literal(f, value),
            Self::Column { qualifier, name } => {
                if let Some(q) = qualifier {
                    write!(f, "{q}.{name}")
                } else {
                    write!(f, "{name}")
                }
            }
            Self::BinaryOp { left, op, right } => write!(f, "({left} {op} {right})"),
            Self::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::IsNull => write!(f, "{operand} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{operand} IS NOT NULL"),
            },
            Self::AggregateFunction { func, args, distinct } => {
                write!(f, "{func}(")?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::WindowFunction(call) => write!(f, "{call}"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

/// Sort order for ORDER BY expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortOrder {
    /// The expression to sort by.
    pub expr: LogicalExpr,
    /// Whether to sort ascending (true) or descending (false).
    pub ascending: bool,
    /// Explicit NULL placement; `None` uses the engine default.
    pub nulls_first: Option<bool>,
}

impl SortOrder {
    /// Creates an ascending sort order.
    #[must_use]
    pub fn asc(expr: LogicalExpr) -> Self {
        Self { expr, ascending: true, nulls_first: None }
    }

    /// Creates a descending sort order.
    #[must_use]
    pub fn desc(expr: LogicalExpr) -> Self {
        Self { expr, ascending: false, nulls_first: None }
    }

    /// Sets nulls first ordering.
    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls_first = Some(true);
        self
    }

    /// Sets nulls last ordering.
    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls_first = Some(false);
        self
    }

    /// Returns true if NULLS FIRST or NULLS LAST was written explicitly.
    #[must_use]
    pub const fn has_explicit_null_order(&self) -> bool {
        self.nulls_first.is_some()
    }

    /// Returns the same ordering over a different expression.
    #[must_use]
    pub fn with_expr(&self, expr: LogicalExpr) -> Self {
        Self { expr, ascending: self.ascending, nulls_first: self.nulls_first }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if !self.ascending {
            write!(f, " DESC")?;
        }
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST")?,
            Some(false) => write!(f, " NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::catalog::WindowFunctionKind;
    use crate::plan::logical::window::WindowSpecification;

    #[test]
    fn expr_builders() {
        let expr = LogicalExpr::column("age").gt(LogicalExpr::integer(21));
        assert_eq!(expr.to_string(), "(age > 21)");
    }

    #[test]
    fn compound_expressions() {
        let expr = LogicalExpr::column("e2")
            .gt(LogicalExpr::integer(0))
            .and(LogicalExpr::column("e1").eq(LogicalExpr::string("it's")));
        assert_eq!(expr.to_string(), "((e2 > 0) AND (e1 = 'it''s'))");
    }

    #[test]
    fn literal_display() {
        assert_eq!(LogicalExpr::null().to_string(), "NULL");
        assert_eq!(LogicalExpr::boolean(false).to_string(), "FALSE");
        assert_eq!(LogicalExpr::float(2.0).to_string(), "2.0");
        assert_eq!(LogicalExpr::float(0.25).to_string(), "0.25");
    }

    #[test]
    fn collect_columns_dedups_in_order() {
        let expr = LogicalExpr::column("b")
            .add(LogicalExpr::column("a"))
            .add(LogicalExpr::column("b"));
        let mut cols = Vec::new();
        expr.collect_columns(&mut cols);
        assert_eq!(cols, vec![LogicalExpr::column("b"), LogicalExpr::column("a")]);
    }

    #[test]
    fn window_columns_follow_clause_order() {
        let call = WindowFunctionCall::new(
            WindowFunctionKind::Count,
            vec![LogicalExpr::column("e1")],
            WindowSpecification::new()
                .partition_by(vec![LogicalExpr::column("e3")])
                .order_by(vec![SortOrder::asc(LogicalExpr::column("e2"))]),
        )
        .with_filter(LogicalExpr::column("e4").is_not_null());
        let mut cols = Vec::new();
        LogicalExpr::window(call).collect_columns(&mut cols);
        let names: Vec<_> = cols.iter().filter_map(LogicalExpr::column_name).collect();
        assert_eq!(names, vec!["e1", "e4", "e3", "e2"]);
    }

    #[test]
    fn aggregate_detection() {
        let agg = LogicalExpr::aggregate(AggregateFunction::Max, LogicalExpr::column("x"), false);
        assert!(agg.contains_aggregate());
        assert!(!LogicalExpr::column("x").contains_aggregate());
        assert_eq!(agg.to_string(), "MAX(x)");
    }

    #[test]
    fn transform_replaces_nodes() {
        let expr = LogicalExpr::column("c").add(LogicalExpr::integer(1));
        let rewritten = expr.transform(&|e| match e {
            LogicalExpr::Column { name, .. } if name == "c" => Some(LogicalExpr::column("w_0")),
            _ => None,
        });
        assert_eq!(rewritten.to_string(), "(w_0 + 1)");
    }

    fn hash_of(expr: &LogicalExpr) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        expr.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn float_literals_compare_by_bits() {
        let nan = LogicalExpr::float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash_of(&nan), hash_of(&nan.clone()));

        let zero = LogicalExpr::float(0.0);
        let negative_zero = LogicalExpr::float(-0.0);
        assert_ne!(zero, negative_zero);
        assert_ne!(zero.to_string(), negative_zero.to_string());
        assert_eq!(hash_of(&zero), hash_of(&LogicalExpr::float(0.0)));
    }

    #[test]
    fn sort_order_display() {
        let order = SortOrder::desc(LogicalExpr::column("e1")).nulls_last();
        assert_eq!(order.to_string(), "e1 DESC NULLS LAST");
        assert!(order.has_explicit_null_order());
        assert_eq!(SortOrder::asc(LogicalExpr::column("e1")).to_string(), "e1");
    }
}
