//! Single-source SELECT commands.
//!
//! [`SelectQuery`] is the resolved form of a query over one source group:
//! a projection that may contain window function calls, an optional WHERE
//! predicate and an optional ORDER BY. It is the input to the window
//! planner.

use std::fmt;

use super::expr::{LogicalExpr, SortOrder};
use super::window::WindowFunctionCall;

/// A source group (table) referenced in FROM.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupSymbol {
    /// Fully qualified group name, as the source knows it.
    pub name: String,
}

impl GroupSymbol {
    /// Creates a group symbol.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for GroupSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One projected expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// The expression.
    pub expr: LogicalExpr,
    /// Output alias.
    pub alias: Option<String>,
}

impl SelectItem {
    /// Returns the output name, or `None` when the expression is unnamed.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.alias.as_deref().or_else(|| self.expr.column_name())
    }
}

/// A SELECT over a single source group.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Projected expressions, in output order.
    pub projection: Vec<SelectItem>,
    /// The source group.
    pub from: GroupSymbol,
    /// WHERE predicate.
    pub selection: Option<LogicalExpr>,
    /// ORDER BY keys; may reference projection aliases or window calls.
    pub order_by: Vec<SortOrder>,
}

impl SelectQuery {
    /// Creates a query over `group` with an empty projection.
    #[must_use]
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            projection: Vec::new(),
            from: GroupSymbol::new(group),
            selection: None,
            order_by: Vec::new(),
        }
    }

    /// Adds an unaliased projection item.
    #[must_use]
    pub fn select(mut self, expr: LogicalExpr) -> Self {
        self.projection.push(SelectItem { expr, alias: None });
        self
    }

    /// Adds an aliased projection item.
    #[must_use]
    pub fn select_as(mut self, expr: LogicalExpr, alias: impl Into<String>) -> Self {
        self.projection.push(SelectItem { expr, alias: Some(alias.into()) });
        self
    }

    /// Sets the WHERE predicate.
    #[must_use]
    pub fn filter(mut self, predicate: LogicalExpr) -> Self {
        self.selection = Some(predicate);
        self
    }

    /// Sets the ORDER BY keys.
    #[must_use]
    pub fn order_by(mut self, keys: Vec<SortOrder>) -> Self {
        self.order_by = keys;
        self
    }

    /// Output column names: the alias, else the column name, else
    /// `expr<n>` with a 1-based position.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.projection
            .iter()
            .enumerate()
            .map(|(i, item)| item.name().map_or_else(|| format!("expr{}", i + 1), str::to_owned))
            .collect()
    }

    /// Every window function call in the projection, then in ORDER BY.
    #[must_use]
    pub fn window_functions(&self) -> Vec<&WindowFunctionCall> {
        let mut calls = Vec::new();
        for item in &self.projection {
            item.expr.collect_window_functions(&mut calls);
        }
        for key in &self.order_by {
            key.expr.collect_window_functions(&mut calls);
        }
        calls
    }

    /// Returns true if any projected or ordering expression is windowed.
    #[must_use]
    pub fn has_window_functions(&self) -> bool {
        self.projection.iter().any(|item| item.expr.contains_window_function())
            || self.order_by.iter().any(|key| key.expr.contains_window_function())
    }

    /// Resolves an ORDER BY key that names a projection alias to the
    /// aliased expression.
    #[must_use]
    pub fn resolve_order_key(&self, key: &SortOrder) -> SortOrder {
        if let LogicalExpr::Column { qualifier: None, name } = &key.expr {
            let aliased = self
                .projection
                .iter()
                .find(|item| item.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(name)));
            if let Some(item) = aliased {
                return key.with_expr(item.expr.clone());
            }
        }
        key.clone()
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        for (i, item) in self.projection.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item.expr)?;
            if let Some(alias) = &item.alias {
                write!(f, " AS {alias}")?;
            }
        }
        write!(f, " FROM {}", self.from)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {selection}")?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, key) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::catalog::WindowFunctionKind;
    use crate::plan::logical::window::WindowSpecification;

    fn count_by_e3() -> LogicalExpr {
        LogicalExpr::window(WindowFunctionCall::new(
            WindowFunctionKind::Count,
            vec![LogicalExpr::column("e1")],
            WindowSpecification::new().partition_by(vec![LogicalExpr::column("e3")]),
        ))
    }

    #[test]
    fn output_names() {
        let query = SelectQuery::new("pm1.g1")
            .select(LogicalExpr::column("e1"))
            .select_as(count_by_e3(), "c")
            .select(LogicalExpr::integer(1));
        assert_eq!(query.output_names(), vec!["e1", "c", "expr3"]);
    }

    #[test]
    fn finds_window_calls_in_order_by() {
        let query = SelectQuery::new("pm1.g1")
            .select(LogicalExpr::column("e2"))
            .order_by(vec![SortOrder::asc(count_by_e3())]);
        assert!(query.has_window_functions());
        assert_eq!(query.window_functions().len(), 1);
    }

    #[test]
    fn resolves_alias_in_order_by() {
        let query = SelectQuery::new("pm1.g1")
            .select_as(count_by_e3(), "c")
            .order_by(vec![SortOrder::desc(LogicalExpr::column("c"))]);
        let resolved = query.resolve_order_key(&query.order_by[0]);
        assert_eq!(resolved.expr, count_by_e3());
        assert!(!resolved.ascending);

        let plain = SortOrder::asc(LogicalExpr::column("e2"));
        assert_eq!(query.resolve_order_key(&plain), plain);
    }

    #[test]
    fn display() {
        let query = SelectQuery::new("pm1.g1")
            .select(LogicalExpr::column("e1"))
            .select_as(count_by_e3(), "c")
            .filter(LogicalExpr::column("e3").eq(LogicalExpr::boolean(false)))
            .order_by(vec![SortOrder::asc(LogicalExpr::column("c"))]);
        assert_eq!(
            query.to_string(),
            "SELECT e1, COUNT(e1) OVER (PARTITION BY e3) AS c FROM pm1.g1 WHERE (e3 = FALSE) ORDER BY c"
        );
    }
}
