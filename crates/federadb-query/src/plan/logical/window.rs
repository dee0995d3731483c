//! Window specifications and window function calls.
//!
//! A [`WindowSpecification`] is the content of one `OVER (...)` clause.
//! Specifications compare and hash structurally, so calls with equal
//! specifications can be grouped and evaluated over a single sorted stream.
//!
//! # Example
//!
//! ```
//! use federadb_query::plan::catalog::WindowFunctionKind;
//! use federadb_query::plan::logical::{
//!     LogicalExpr, SortOrder, WindowFunctionCall, WindowSpecification,
//! };
//!
//! let spec = WindowSpecification::new()
//!     .partition_by(vec![LogicalExpr::column("e3")])
//!     .order_by(vec![SortOrder::asc(LogicalExpr::column("e2"))]);
//!
//! let call = WindowFunctionCall::new(
//!     WindowFunctionKind::Lag,
//!     vec![LogicalExpr::column("e1"), LogicalExpr::integer(2), LogicalExpr::string("d")],
//!     spec.clone(),
//! );
//! assert_eq!(call.to_string(), "LAG(e1, 2, 'd') OVER (PARTITION BY e3 ORDER BY e2)");
//! assert_eq!(call.spec, spec);
//! ```

use std::fmt;

use crate::plan::catalog::{FunctionDescriptor, WindowFunctionKind};

use super::expr::{LogicalExpr, SortOrder};

/// Unit of a window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMode {
    /// Bounds count physical rows.
    Rows,
    /// Bounds are relative to the current row's peer group.
    Range,
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "ROWS"),
            Self::Range => write!(f, "RANGE"),
        }
    }
}

/// One end of a window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameBound {
    /// `UNBOUNDED PRECEDING`.
    UnboundedPreceding,
    /// `n PRECEDING`.
    Preceding(u64),
    /// `CURRENT ROW`.
    CurrentRow,
    /// `n FOLLOWING`.
    Following(u64),
    /// `UNBOUNDED FOLLOWING`.
    UnboundedFollowing,
}

impl FrameBound {
    /// Position of the bound on the line from the partition start to its
    /// end, relative to the current row.
    pub(crate) const fn position(self) -> i128 {
        match self {
            Self::UnboundedPreceding => i128::MIN,
            Self::Preceding(n) => -(n as i128),
            Self::CurrentRow => 0,
            Self::Following(n) => n as i128,
            Self::UnboundedFollowing => i128::MAX,
        }
    }

    /// Returns true for `n PRECEDING` and `n FOLLOWING`.
    #[must_use]
    pub const fn is_offset(self) -> bool {
        matches!(self, Self::Preceding(_) | Self::Following(_))
    }
}

impl fmt::Display for FrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            Self::Preceding(n) => write!(f, "{n} PRECEDING"),
            Self::CurrentRow => write!(f, "CURRENT ROW"),
            Self::Following(n) => write!(f, "{n} FOLLOWING"),
            Self::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}

/// An explicit window frame.
///
/// Without an end bound the frame ends at the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowFrame {
    /// Frame unit.
    pub mode: FrameMode,
    /// Start bound.
    pub start: FrameBound,
    /// Optional end bound.
    pub end: Option<FrameBound>,
}

impl WindowFrame {
    /// Creates a `ROWS <start>` frame.
    #[must_use]
    pub const fn rows(start: FrameBound) -> Self {
        Self { mode: FrameMode::Rows, start, end: None }
    }

    /// Creates a `ROWS BETWEEN <start> AND <end>` frame.
    #[must_use]
    pub const fn rows_between(start: FrameBound, end: FrameBound) -> Self {
        Self { mode: FrameMode::Rows, start, end: Some(end) }
    }

    /// Creates a `RANGE BETWEEN <start> AND <end>` frame.
    #[must_use]
    pub const fn range_between(start: FrameBound, end: FrameBound) -> Self {
        Self { mode: FrameMode::Range, start, end: Some(end) }
    }

    /// Returns the end bound, defaulting to the current row.
    #[must_use]
    pub fn end_bound(&self) -> FrameBound {
        self.end.unwrap_or(FrameBound::CurrentRow)
    }
}

impl fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} BETWEEN {} AND {end}", self.mode, self.start),
            None => write!(f, "{} {}", self.mode, self.start),
        }
    }
}

/// The content of an `OVER (...)` clause.
///
/// An empty partition list is kept distinct from an absent one; both group
/// the whole input into a single partition at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WindowSpecification {
    /// PARTITION BY expressions.
    pub partition: Option<Vec<LogicalExpr>>,
    /// ORDER BY keys.
    pub order_by: Option<Vec<SortOrder>>,
    /// Explicit frame.
    pub frame: Option<WindowFrame>,
}

impl WindowSpecification {
    /// Creates an empty specification, as in `OVER ()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the partition keys.
    #[must_use]
    pub fn partition_by(mut self, keys: Vec<LogicalExpr>) -> Self {
        self.partition = Some(keys);
        self
    }

    /// Sets the ordering keys.
    #[must_use]
    pub fn order_by(mut self, keys: Vec<SortOrder>) -> Self {
        self.order_by = Some(keys);
        self
    }

    /// Sets the frame.
    #[must_use]
    pub fn frame(mut self, frame: WindowFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Returns the partition keys, empty when absent.
    #[must_use]
    pub fn partition_keys(&self) -> &[LogicalExpr] {
        self.partition.as_deref().unwrap_or_default()
    }

    /// Returns the ordering keys, empty when absent.
    #[must_use]
    pub fn order_keys(&self) -> &[SortOrder] {
        self.order_by.as_deref().unwrap_or_default()
    }

    /// Returns true if there is at least one ordering key.
    #[must_use]
    pub fn has_order_by(&self) -> bool {
        !self.order_keys().is_empty()
    }

    /// Returns true if any ordering key requests NULLS FIRST or NULLS LAST.
    #[must_use]
    pub fn has_explicit_null_order(&self) -> bool {
        self.order_keys().iter().any(SortOrder::has_explicit_null_order)
    }

    /// Returns true if any ordering key references an aggregate expression.
    #[must_use]
    pub fn order_by_references_aggregate(&self) -> bool {
        self.order_keys().iter().any(|key| key.expr.contains_aggregate())
    }

    /// Appends the partition and order key columns to `out`.
    pub fn collect_columns(&self, out: &mut Vec<LogicalExpr>) {
        for key in self.partition_keys() {
            key.collect_columns(out);
        }
        for key in self.order_keys() {
            key.expr.collect_columns(out);
        }
    }
}

impl fmt::Display for WindowSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut needs_space = false;
        if !self.partition_keys().is_empty() {
            write!(f, "PARTITION BY ")?;
            for (i, key) in self.partition_keys().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
            needs_space = true;
        }
        if self.has_order_by() {
            if needs_space {
                write!(f, " ")?;
            }
            write!(f, "ORDER BY ")?;
            for (i, key) in self.order_keys().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
            needs_space = true;
        }
        if let Some(frame) = &self.frame {
            if needs_space {
                write!(f, " ")?;
            }
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}

/// One window function invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowFunctionCall {
    /// The function kind.
    pub kind: WindowFunctionKind,
    /// Argument expressions.
    pub args: Vec<LogicalExpr>,
    /// Whether DISTINCT was specified.
    pub distinct: bool,
    /// FILTER predicate restricting which rows contribute.
    pub filter: Option<LogicalExpr>,
    /// The OVER clause.
    pub spec: WindowSpecification,
}

impl WindowFunctionCall {
    /// Creates a call without modifiers.
    #[must_use]
    pub fn new(kind: WindowFunctionKind, args: Vec<LogicalExpr>, spec: WindowSpecification) -> Self {
        Self { kind, args, distinct: false, filter: None, spec }
    }

    /// Marks the call DISTINCT.
    #[must_use]
    pub fn with_distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Attaches a FILTER predicate.
    #[must_use]
    pub fn with_filter(mut self, predicate: LogicalExpr) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Returns the catalog entry for this call's kind.
    #[must_use]
    pub const fn descriptor(&self) -> FunctionDescriptor {
        self.kind.descriptor()
    }

    /// Returns the first argument, if any.
    #[must_use]
    pub fn argument(&self) -> Option<&LogicalExpr> {
        self.args.first()
    }

    /// Appends referenced columns: arguments, filter, partition keys, then
    /// order keys.
    pub fn collect_columns(&self, out: &mut Vec<LogicalExpr>) {
        for arg in &self.args {
            arg.collect_columns(out);
        }
        if let Some(filter) = &self.filter {
            filter.collect_columns(out);
        }
        self.spec.collect_columns(out);
    }
}

impl fmt::Display for WindowFunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        if self.kind == WindowFunctionKind::CountStar {
            write!(f, "*")?;
        }
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")?;
        if let Some(filter) = &self.filter {
            write!(f, " FILTER (WHERE {filter})")?;
        }
        write!(f, " OVER ({})", self.spec)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    use super::*;

    fn hash_of(spec: &WindowSpecification) -> u64 {
        let mut hasher = DefaultHasher::new();
        spec.hash(&mut hasher);
        hasher.finish()
    }

    fn by_e2() -> WindowSpecification {
        WindowSpecification::new()
            .partition_by(vec![LogicalExpr::column("e3")])
            .order_by(vec![SortOrder::asc(LogicalExpr::column("e2"))])
    }

    #[test]
    fn structural_equality_and_hash() {
        let a = by_e2();
        let b = by_e2();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = by_e2().frame(WindowFrame::rows(FrameBound::UnboundedPreceding));
        assert_ne!(a, c);

        let specs: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn float_keys_are_reflexive_and_hash_consistently() {
        let nan = WindowSpecification::new().partition_by(vec![LogicalExpr::float(f64::NAN)]);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash_of(&nan), hash_of(&nan.clone()));

        let zero = WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::float(0.0))]);
        let negative_zero = WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::float(-0.0))]);
        assert_ne!(zero, negative_zero);
        let specs: HashSet<_> = [zero.clone(), negative_zero, zero].into_iter().collect();
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn empty_partition_differs_from_absent() {
        let absent = WindowSpecification::new();
        let empty = WindowSpecification::new().partition_by(vec![]);
        assert_ne!(absent, empty);
        assert!(absent.partition_keys().is_empty());
        assert!(empty.partition_keys().is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let original = by_e2();
        let mut copy = original.clone();
        copy.order_by = Some(vec![SortOrder::desc(LogicalExpr::column("e1"))]);
        if let Some(keys) = copy.partition.as_mut() {
            keys.push(LogicalExpr::column("e4"));
        }
        assert_eq!(original, by_e2());
        assert_ne!(original, copy);
    }

    #[test]
    fn frame_display() {
        assert_eq!(
            WindowFrame::rows(FrameBound::UnboundedPreceding).to_string(),
            "ROWS UNBOUNDED PRECEDING"
        );
        assert_eq!(
            WindowFrame::rows_between(FrameBound::Preceding(1), FrameBound::Following(2))
                .to_string(),
            "ROWS BETWEEN 1 PRECEDING AND 2 FOLLOWING"
        );
        assert_eq!(
            WindowFrame::rows(FrameBound::Preceding(3)).end_bound(),
            FrameBound::CurrentRow
        );
    }

    #[test]
    fn call_display() {
        let call = WindowFunctionCall::new(
            WindowFunctionKind::Count,
            vec![LogicalExpr::column("e1")],
            WindowSpecification::new().partition_by(vec![LogicalExpr::column("e3")]),
        )
        .with_distinct();
        assert_eq!(call.to_string(), "COUNT(DISTINCT e1) OVER (PARTITION BY e3)");

        let star = WindowFunctionCall::new(WindowFunctionKind::CountStar, vec![], WindowSpecification::new());
        assert_eq!(star.to_string(), "COUNT(*) OVER ()");

        let filtered = WindowFunctionCall::new(
            WindowFunctionKind::RowNumber,
            vec![],
            WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::column("e1"))]),
        )
        .with_filter(LogicalExpr::column("e1").is_not_null());
        assert_eq!(
            filtered.to_string(),
            "ROW_NUMBER() FILTER (WHERE e1 IS NOT NULL) OVER (ORDER BY e1)"
        );
    }

    #[test]
    fn null_order_and_aggregate_detection() {
        let spec = WindowSpecification::new()
            .order_by(vec![SortOrder::asc(LogicalExpr::column("e1")).nulls_first()]);
        assert!(spec.has_explicit_null_order());
        assert!(!spec.order_by_references_aggregate());
        assert!(!by_e2().has_explicit_null_order());
    }
}
