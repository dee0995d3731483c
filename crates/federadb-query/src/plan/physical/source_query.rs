//! Source query generation.
//!
//! A [`SourceQuery`] is the SELECT sent to a data source. It renders to SQL
//! text in a fixed form: the group is aliased `g_0`, columns are qualified
//! with that alias, and when the query has an ORDER BY every select item is
//! aliased `c_<i>` so ordering keys can refer to it.
//!
//! Rendering is a pure function of the query and the [`SqlDialect`], so
//! identical inputs always give identical text.
//!
//! # Example
//!
//! ```
//! use federadb_query::plan::logical::{GroupSymbol, LogicalExpr, SortOrder};
//! use federadb_query::plan::physical::{SourceQuery, SqlDialect};
//!
//! let query = SourceQuery {
//!     select: vec![LogicalExpr::column("e1")],
//!     from: GroupSymbol::new("pm1.g1"),
//!     selection: None,
//!     order_by: vec![SortOrder::asc(LogicalExpr::column("e1"))],
//! };
//! assert_eq!(
//!     query.to_sql(&SqlDialect::default()),
//!     "SELECT g_0.e1 AS c_0 FROM pm1.g1 AS g_0 ORDER BY c_0"
//! );
//! ```

use std::fmt::{self, Write as _};

use crate::plan::capabilities::{Capability, NullOrder, SourceCapabilities};
use crate::plan::catalog::WindowFunctionKind;
use crate::plan::logical::expr::{fmt_literal, LogicalExpr, SortOrder, UnaryOp};
use crate::plan::logical::query::GroupSymbol;
use crate::plan::logical::window::{WindowFunctionCall, WindowSpecification};

/// Alias given to the single group of a source query.
pub const GROUP_ALIAS: &str = "g_0";

/// How NULL ordering is written for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlDialect {
    /// NULL placement the source applies when none is written.
    pub source_null_order: NullOrder,
    /// Whether the source accepts `NULLS FIRST` / `NULLS LAST`.
    pub supports_null_ordering: bool,
    /// NULL placement the engine expects.
    pub engine_null_order: NullOrder,
}

impl Default for SqlDialect {
    fn default() -> Self {
        Self {
            source_null_order: NullOrder::Low,
            supports_null_ordering: false,
            engine_null_order: NullOrder::Low,
        }
    }
}

impl SqlDialect {
    /// Builds the dialect for a source.
    #[must_use]
    pub fn for_source(caps: &dyn SourceCapabilities, engine_null_order: NullOrder) -> Self {
        Self {
            source_null_order: caps.default_null_order(),
            supports_null_ordering: caps.supports(Capability::QueryOrderByNullOrdering),
            engine_null_order,
        }
    }

    /// Returns the NULL placement to write for `key`, if any.
    ///
    /// An explicit request is always written. Otherwise the engine default
    /// is written when the source can express it and its own default is
    /// different or unknown.
    #[must_use]
    pub fn null_ordering(&self, key: &SortOrder) -> Option<bool> {
        if key.nulls_first.is_some() {
            return key.nulls_first;
        }
        if !self.supports_null_ordering {
            return None;
        }
        let engine = self.engine_null_order.places_nulls_first(key.ascending)?;
        match self.source_null_order.places_nulls_first(key.ascending) {
            Some(source) if source == engine => None,
            _ => Some(engine),
        }
    }
}

/// A SELECT over a single source group.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    /// Select items, in output order.
    pub select: Vec<LogicalExpr>,
    /// The group queried.
    pub from: GroupSymbol,
    /// WHERE predicate.
    pub selection: Option<LogicalExpr>,
    /// ORDER BY keys.
    pub order_by: Vec<SortOrder>,
}

impl SourceQuery {
    /// Renders the query as SQL text.
    #[must_use]
    pub fn to_sql(&self, dialect: &SqlDialect) -> String {
        let mut sql = String::from("SELECT ");
        let aliased = !self.order_by.is_empty();

        if self.select.is_empty() {
            sql.push('1');
            if aliased {
                sql.push_str(" AS c_0");
            }
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "{}", Sql { expr: item, dialect, top: true });
            if aliased {
                let _ = write!(sql, " AS c_{i}");
            }
        }

        let _ = write!(sql, " FROM {} AS {GROUP_ALIAS}", self.from);

        if let Some(selection) = &self.selection {
            let _ = write!(sql, " WHERE {}", Sql { expr: selection, dialect, top: true });
        }

        if aliased {
            sql.push_str(" ORDER BY ");
            for (i, key) in self.order_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                match self.select.iter().position(|item| *item == key.expr) {
                    Some(pos) => {
                        let _ = write!(sql, "c_{pos}");
                    }
                    None => {
                        let _ = write!(sql, "{}", Sql { expr: &key.expr, dialect, top: true });
                    }
                }
                write_direction(&mut sql, key, dialect);
            }
        }

        sql
    }
}

fn write_direction(out: &mut String, key: &SortOrder, dialect: &SqlDialect) {
    if !key.ascending {
        out.push_str(" DESC");
    }
    match dialect.null_ordering(key) {
        Some(true) => out.push_str(" NULLS FIRST"),
        Some(false) => out.push_str(" NULLS LAST"),
        None => {}
    }
}

/// Renders an expression with columns qualified by the group alias.
struct Sql<'a> {
    expr: &'a LogicalExpr,
    dialect: &'a SqlDialect,
    /// Top-level binary operations are written without parentheses.
    top: bool,
}

impl<'a> Sql<'a> {
    fn nested(&self, expr: &'a LogicalExpr) -> Self {
        Sql { expr, dialect: self.dialect, top: false }
    }

    fn fmt_list(&self, f: &mut fmt::Formatter<'_>, exprs: &'a [LogicalExpr]) -> fmt::Result {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", Sql { expr, dialect: self.dialect, top: true })?;
        }
        Ok(())
    }

    fn fmt_window(&self, f: &mut fmt::Formatter<'_>, call: &'a WindowFunctionCall) -> fmt::Result {
        write!(f, "{}(", call.kind)?;
        if call.kind == WindowFunctionKind::CountStar {
            write!(f, "*")?;
        }
        if call.distinct {
            write!(f, "DISTINCT ")?;
        }
        self.fmt_list(f, &call.args)?;
        write!(f, ")")?;
        if let Some(filter) = &call.filter {
            write!(f, " FILTER (WHERE {})", Sql { expr: filter, dialect: self.dialect, top: true })?;
        }
        write!(f, " OVER (")?;
        self.fmt_spec(f, &call.spec)?;
        write!(f, ")")
    }

    fn fmt_spec(&self, f: &mut fmt::Formatter<'_>, spec: &'a WindowSpecification) -> fmt::Result {
        let mut parts = Vec::new();
        if !spec.partition_keys().is_empty() {
            let mut part = String::from("PARTITION BY ");
            for (i, key) in spec.partition_keys().iter().enumerate() {
                if i > 0 {
                    part.push_str(", ");
                }
                let _ = write!(part, "{}", Sql { expr: key, dialect: self.dialect, top: true });
            }
            parts.push(part);
        }
        if spec.has_order_by() {
            let mut part = String::from("ORDER BY ");
            for (i, key) in spec.order_keys().iter().enumerate() {
                if i > 0 {
                    part.push_str(", ");
                }
                let _ = write!(part, "{}", Sql { expr: &key.expr, dialect: self.dialect, top: true });
                write_direction(&mut part, key, self.dialect);
            }
            parts.push(part);
        }
        if let Some(frame) = &spec.frame {
            parts.push(frame.to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}

impl fmt::Display for Sql<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            LogicalExpr::Literal(value) => fmt_literal(f, value),
            LogicalExpr::Column { name, .. } => write!(f, "{GROUP_ALIAS}.{name}"),
            LogicalExpr::BinaryOp { left, op, right } => {
                if self.top {
                    write!(f, "{} {op} {}", self.nested(left), self.nested(right))
                } else {
                    write!(f, "({} {op} {})", self.nested(left), self.nested(right))
                }
            }
            LogicalExpr::UnaryOp { op, operand } => {
                let operand = self.nested(operand);
                match op {
                    UnaryOp::Not => write!(f, "NOT {operand}"),
                    UnaryOp::Neg => write!(f, "-{operand}"),
                    UnaryOp::IsNull => write!(f, "{operand} IS NULL"),
                    UnaryOp::IsNotNull => write!(f, "{operand} IS NOT NULL"),
                }
            }
            LogicalExpr::AggregateFunction { func, args, distinct } => {
                write!(f, "{func}(")?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                self.fmt_list(f, args)?;
                write!(f, ")")
            }
            LogicalExpr::WindowFunction(call) => self.fmt_window(f, call),
            LogicalExpr::Wildcard => write!(f, "*"),
        }
    }
}
