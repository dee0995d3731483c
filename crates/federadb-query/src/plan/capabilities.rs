//! Source capabilities.
//!
//! A data source advertises what it can execute natively through the
//! [`SourceCapabilities`] trait. The planner consults it, read-only, to
//! decide whether window functions are pushed to the source or evaluated
//! locally.
//!
//! # Example
//!
//! ```
//! use federadb_query::plan::capabilities::{
//!     BasicSourceCapabilities, Capability, NullOrder, SourceCapabilities,
//! };
//!
//! let mut caps = BasicSourceCapabilities::typical();
//! caps.set_capability_support(Capability::ElementaryOlap, true);
//!
//! assert!(caps.supports(Capability::ElementaryOlap));
//! assert!(!caps.supports(Capability::WindowFunctionFrameClause));
//! assert_eq!(caps.default_null_order(), NullOrder::Low);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named capability a source may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Window functions with `OVER (...)` at all.
    ElementaryOlap,
    /// Aggregate window functions whose window has an ORDER BY.
    WindowFunctionOrderByAggregates,
    /// `DISTINCT` inside an aggregate window function.
    WindowFunctionDistinctAggregates,
    /// Explicit `ROWS`/`RANGE` frame clauses.
    WindowFunctionFrameClause,
    /// `NTILE(n)`.
    WindowFunctionNtile,
    /// `PERCENT_RANK()`.
    WindowFunctionPercentRank,
    /// `CUME_DIST()`.
    WindowFunctionCumeDist,
    /// `NTH_VALUE(expr, n)`.
    WindowFunctionNthValue,
    /// `SUM`.
    QueryAggregatesSum,
    /// `AVG`.
    QueryAggregatesAvg,
    /// `MIN`.
    QueryAggregatesMin,
    /// `MAX`.
    QueryAggregatesMax,
    /// `COUNT(expr)`.
    QueryAggregatesCount,
    /// `COUNT(*)`.
    QueryAggregatesCountStar,
    /// `DISTINCT` inside aggregates.
    QueryAggregatesDistinct,
    /// `ORDER BY` on the query.
    #[serde(rename = "QUERY_ORDERBY")]
    QueryOrderBy,
    /// Explicit `NULLS FIRST` / `NULLS LAST`.
    #[serde(rename = "QUERY_ORDERBY_NULL_ORDERING")]
    QueryOrderByNullOrdering,
}

impl Capability {
    /// Returns the configuration name of this capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ElementaryOlap => "ELEMENTARY_OLAP",
            Self::WindowFunctionOrderByAggregates => "WINDOW_FUNCTION_ORDER_BY_AGGREGATES",
            Self::WindowFunctionDistinctAggregates => "WINDOW_FUNCTION_DISTINCT_AGGREGATES",
            Self::WindowFunctionFrameClause => "WINDOW_FUNCTION_FRAME_CLAUSE",
            Self::WindowFunctionNtile => "WINDOW_FUNCTION_NTILE",
            Self::WindowFunctionPercentRank => "WINDOW_FUNCTION_PERCENT_RANK",
            Self::WindowFunctionCumeDist => "WINDOW_FUNCTION_CUME_DIST",
            Self::WindowFunctionNthValue => "WINDOW_FUNCTION_NTH_VALUE",
            Self::QueryAggregatesSum => "QUERY_AGGREGATES_SUM",
            Self::QueryAggregatesAvg => "QUERY_AGGREGATES_AVG",
            Self::QueryAggregatesMin => "QUERY_AGGREGATES_MIN",
            Self::QueryAggregatesMax => "QUERY_AGGREGATES_MAX",
            Self::QueryAggregatesCount => "QUERY_AGGREGATES_COUNT",
            Self::QueryAggregatesCountStar => "QUERY_AGGREGATES_COUNT_STAR",
            Self::QueryAggregatesDistinct => "QUERY_AGGREGATES_DISTINCT",
            Self::QueryOrderBy => "QUERY_ORDERBY",
            Self::QueryOrderByNullOrdering => "QUERY_ORDERBY_NULL_ORDERING",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a sort places NULL values when no `NULLS FIRST/LAST` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullOrder {
    /// NULL is the highest value: last ascending, first descending.
    High,
    /// NULL is the lowest value: first ascending, last descending.
    #[default]
    Low,
    /// NULLs always come first.
    First,
    /// NULLs always come last.
    Last,
    /// Placement is not known.
    Unknown,
}

impl NullOrder {
    /// Returns whether NULLs sort first for the given direction, or `None`
    /// when the placement is unknown.
    #[must_use]
    pub const fn places_nulls_first(self, ascending: bool) -> Option<bool> {
        match self {
            Self::High => Some(!ascending),
            Self::Low => Some(ascending),
            Self::First => Some(true),
            Self::Last => Some(false),
            Self::Unknown => None,
        }
    }
}

/// Read-only view of what a source can execute.
///
/// Implementations are shared between concurrent planning passes.
pub trait SourceCapabilities: Send + Sync {
    /// Returns whether the capability is supported.
    fn supports(&self, capability: Capability) -> bool;

    /// Returns the source's default NULL placement.
    fn default_null_order(&self) -> NullOrder {
        NullOrder::Unknown
    }
}

/// A capability set backed by an explicit list of flags.
///
/// Deserializes from configuration such as
/// `{"supported": ["ELEMENTARY_OLAP"], "default_null_order": "LOW"}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicSourceCapabilities {
    /// Supported capabilities.
    supported: BTreeSet<Capability>,
    /// Default NULL placement of the source.
    default_null_order: NullOrder,
}

impl BasicSourceCapabilities {
    /// Creates a capability set that supports nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities of a typical relational source without window support:
    /// ORDER BY with NULLs sorting low.
    #[must_use]
    pub fn typical() -> Self {
        let mut caps = Self::new();
        caps.set_capability_support(Capability::QueryOrderBy, true);
        caps
    }

    /// Capabilities of a source that supports every window construct.
    #[must_use]
    pub fn full() -> Self {
        Self {
            supported: [
                Capability::ElementaryOlap,
                Capability::WindowFunctionOrderByAggregates,
                Capability::WindowFunctionDistinctAggregates,
                Capability::WindowFunctionFrameClause,
                Capability::WindowFunctionNtile,
                Capability::WindowFunctionPercentRank,
                Capability::WindowFunctionCumeDist,
                Capability::WindowFunctionNthValue,
                Capability::QueryAggregatesSum,
                Capability::QueryAggregatesAvg,
                Capability::QueryAggregatesMin,
                Capability::QueryAggregatesMax,
                Capability::QueryAggregatesCount,
                Capability::QueryAggregatesCountStar,
                Capability::QueryAggregatesDistinct,
                Capability::QueryOrderBy,
                Capability::QueryOrderByNullOrdering,
            ]
            .into_iter()
            .collect(),
            default_null_order: NullOrder::Low,
        }
    }

    /// Turns a capability on or off.
    pub fn set_capability_support(&mut self, capability: Capability, supported: bool) {
        if supported {
            self.supported.insert(capability);
        } else {
            self.supported.remove(&capability);
        }
    }

    /// Sets the default NULL placement.
    pub fn set_default_null_order(&mut self, order: NullOrder) {
        self.default_null_order = order;
    }

    /// Builder form of [`set_capability_support`](Self::set_capability_support).
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.set_capability_support(capability, true);
        self
    }

    /// Builder form of [`set_default_null_order`](Self::set_default_null_order).
    #[must_use]
    pub fn with_default_null_order(mut self, order: NullOrder) -> Self {
        self.default_null_order = order;
        self
    }
}

impl SourceCapabilities for BasicSourceCapabilities {
    fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    fn default_null_order(&self) -> NullOrder {
        self.default_null_order
    }
}
