//! Window function catalog.
//!
//! Every supported window function kind has a [`FunctionDescriptor`] that
//! records its arity, the modifiers it accepts, the evaluation branch the
//! window operator uses for it, and the source capability that governs
//! whether it can be pushed down.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::capabilities::Capability;

/// How a window function is evaluated over a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationBranch {
    /// Position-based numbering within the ordered partition.
    Ranking,
    /// Aggregate over the frame of each row.
    Aggregate,
    /// Value of another row at a fixed distance from the current row.
    Offset,
    /// Value at a position within the frame.
    Value,
}

/// The supported window function kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowFunctionKind {
    /// `ROW_NUMBER()`.
    RowNumber,
    /// `RANK()`.
    Rank,
    /// `DENSE_RANK()`.
    DenseRank,
    /// `PERCENT_RANK()`.
    PercentRank,
    /// `CUME_DIST()`.
    CumeDist,
    /// `NTILE(n)`.
    Ntile,
    /// `COUNT(expr)`.
    Count,
    /// `COUNT(*)`.
    CountStar,
    /// `SUM(expr)`.
    Sum,
    /// `AVG(expr)`.
    Avg,
    /// `MIN(expr)`.
    Min,
    /// `MAX(expr)`.
    Max,
    /// `LEAD(expr [, offset [, default]])`.
    Lead,
    /// `LAG(expr [, offset [, default]])`.
    Lag,
    /// `FIRST_VALUE(expr)`.
    FirstValue,
    /// `LAST_VALUE(expr)`.
    LastValue,
    /// `NTH_VALUE(expr, n)`.
    NthValue,
}

/// Static facts about a window function kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// SQL name of the function.
    pub name: &'static str,
    /// Minimum number of arguments.
    pub min_args: usize,
    /// Maximum number of arguments.
    pub max_args: usize,
    /// Whether the window specification must have an ORDER BY.
    pub requires_order_by: bool,
    /// Whether `DISTINCT` may be applied to the argument.
    pub accepts_distinct: bool,
    /// Whether a `FILTER (WHERE ...)` clause may be attached.
    pub accepts_filter: bool,
    /// Evaluation branch used by the window operator.
    pub branch: EvaluationBranch,
    /// Source capability needed to push the function down, beyond
    /// elementary window support.
    pub capability: Option<Capability>,
}

impl FunctionDescriptor {
    const fn ranking(name: &'static str, capability: Option<Capability>) -> Self {
        Self {
            name,
            min_args: 0,
            max_args: 0,
            requires_order_by: false,
            accepts_distinct: false,
            accepts_filter: true,
            branch: EvaluationBranch::Ranking,
            capability,
        }
    }

    const fn aggregate(name: &'static str, capability: Capability) -> Self {
        Self {
            name,
            min_args: 1,
            max_args: 1,
            requires_order_by: false,
            accepts_distinct: true,
            accepts_filter: true,
            branch: EvaluationBranch::Aggregate,
            capability: Some(capability),
        }
    }

    const fn offset(name: &'static str) -> Self {
        Self {
            name,
            min_args: 1,
            max_args: 3,
            requires_order_by: true,
            accepts_distinct: false,
            accepts_filter: false,
            branch: EvaluationBranch::Offset,
            capability: None,
        }
    }

    const fn value(name: &'static str, args: usize, capability: Option<Capability>) -> Self {
        Self {
            name,
            min_args: args,
            max_args: args,
            requires_order_by: false,
            accepts_distinct: false,
            accepts_filter: false,
            branch: EvaluationBranch::Value,
            capability,
        }
    }
}

impl WindowFunctionKind {
    /// Every kind in the catalog.
    pub const ALL: [Self; 17] = [
        Self::RowNumber,
        Self::Rank,
        Self::DenseRank,
        Self::PercentRank,
        Self::CumeDist,
        Self::Ntile,
        Self::Count,
        Self::CountStar,
        Self::Sum,
        Self::Avg,
        Self::Min,
        Self::Max,
        Self::Lead,
        Self::Lag,
        Self::FirstValue,
        Self::LastValue,
        Self::NthValue,
    ];

    /// Returns the catalog entry for this kind.
    #[must_use]
    pub const fn descriptor(self) -> FunctionDescriptor {
        match self {
            Self::RowNumber => FunctionDescriptor::ranking("ROW_NUMBER", None),
            Self::Rank => FunctionDescriptor::ranking("RANK", None),
            Self::DenseRank => FunctionDescriptor::ranking("DENSE_RANK", None),
            Self::PercentRank => {
                FunctionDescriptor::ranking("PERCENT_RANK", Some(Capability::WindowFunctionPercentRank))
            }
            Self::CumeDist => {
                FunctionDescriptor::ranking("CUME_DIST", Some(Capability::WindowFunctionCumeDist))
            }
            Self::Ntile => FunctionDescriptor {
                min_args: 1,
                max_args: 1,
                requires_order_by: true,
                ..FunctionDescriptor::ranking("NTILE", Some(Capability::WindowFunctionNtile))
            },
            Self::Count => FunctionDescriptor::aggregate("COUNT", Capability::QueryAggregatesCount),
            Self::CountStar => FunctionDescriptor {
                min_args: 0,
                max_args: 0,
                accepts_distinct: false,
                ..FunctionDescriptor::aggregate("COUNT", Capability::QueryAggregatesCountStar)
            },
            Self::Sum => FunctionDescriptor::aggregate("SUM", Capability::QueryAggregatesSum),
            Self::Avg => FunctionDescriptor::aggregate("AVG", Capability::QueryAggregatesAvg),
            Self::Min => FunctionDescriptor::aggregate("MIN", Capability::QueryAggregatesMin),
            Self::Max => FunctionDescriptor::aggregate("MAX", Capability::QueryAggregatesMax),
            Self::Lead => FunctionDescriptor::offset("LEAD"),
            Self::Lag => FunctionDescriptor::offset("LAG"),
            Self::FirstValue => FunctionDescriptor::value("FIRST_VALUE", 1, None),
            Self::LastValue => FunctionDescriptor::value("LAST_VALUE", 1, None),
            Self::NthValue => {
                FunctionDescriptor::value("NTH_VALUE", 2, Some(Capability::WindowFunctionNthValue))
            }
        }
    }

    /// Returns the SQL name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Returns the evaluation branch of this kind.
    #[must_use]
    pub const fn branch(self) -> EvaluationBranch {
        self.descriptor().branch
    }

    /// Returns true for the aggregate kinds.
    #[must_use]
    pub const fn is_aggregate(self) -> bool {
        matches!(self.branch(), EvaluationBranch::Aggregate)
    }

    /// Resolves a function name, ignoring case.
    ///
    /// `COUNT` resolves to [`Self::Count`]; `COUNT(*)` is chosen by the
    /// caller based on the argument list.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.into_iter().find(|kind| kind.name() == upper && *kind != Self::CountStar)
    }
}

impl fmt::Display for WindowFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
