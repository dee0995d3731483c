//! Window function pushdown.
//!
//! Decides, per window function call, whether the data source can evaluate
//! it. The decision depends only on the call and the source capabilities.
//!
//! Checks run from the most general to the most specific; the first one
//! that fails keeps the call local:
//!
//! 1. the source has no window support at all
//! 2. the function (or DISTINCT on it) needs an aggregate capability
//! 3. DISTINCT inside a window aggregate
//! 4. an aggregate over an ordered window, or an ordering key that
//!    references an aggregate
//! 5. an explicit NULLS FIRST/LAST the source cannot honor
//!
//! A call that passes all of these but has an explicit frame the source
//! cannot express is a planning error: there is no fallback for it.

use std::fmt;

use crate::plan::capabilities::{Capability, SourceCapabilities};
use crate::plan::logical::{PlanError, PlanResult, SortOrder, WindowFunctionCall};

/// Why a call is evaluated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalReason {
    /// The source supports no window functions.
    NoWindowSupport,
    /// A capability for the function or one of its modifiers is missing.
    MissingCapability(Capability),
    /// An explicit NULL ordering cannot be expressed at the source.
    NullOrdering,
}

impl fmt::Display for LocalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWindowSupport => write!(f, "source has no window function support"),
            Self::MissingCapability(cap) => write!(f, "missing {cap}"),
            Self::NullOrdering => write!(f, "explicit null ordering not supported"),
        }
    }
}

/// Where a window function call is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPlacement {
    /// Evaluated by the data source.
    Pushdown,
    /// Evaluated by the local window operator.
    Local(LocalReason),
}

impl WindowPlacement {
    /// Returns true for [`WindowPlacement::Pushdown`].
    #[must_use]
    pub const fn is_pushdown(self) -> bool {
        matches!(self, Self::Pushdown)
    }
}

/// Returns true if the source orders NULLs as `key` requests, either by
/// writing it explicitly or because its default already does so.
#[must_use]
pub fn null_ordering_supported(key: &SortOrder, caps: &dyn SourceCapabilities) -> bool {
    match key.nulls_first {
        None => true,
        Some(requested) => {
            caps.supports(Capability::QueryOrderByNullOrdering)
                || caps.default_null_order().places_nulls_first(key.ascending) == Some(requested)
        }
    }
}

/// Window function pushdown rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowPushdown {}

impl WindowPushdown {
    /// Creates the rule.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Decides where `call` is evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Capability`] when the call would be pushed but
    /// has an explicit frame and the source lacks frame clause support.
    pub fn decide(
        &self,
        call: &WindowFunctionCall,
        caps: &dyn SourceCapabilities,
    ) -> PlanResult<WindowPlacement> {
        let placement = match self.local_reason(call, caps) {
            Some(reason) => WindowPlacement::Local(reason),
            None => {
                if call.spec.frame.is_some() && !caps.supports(Capability::WindowFunctionFrameClause) {
                    return Err(PlanError::Capability {
                        function: call.kind.name().to_owned(),
                        clause: "window frame".to_owned(),
                        capability: Capability::WindowFunctionFrameClause,
                    });
                }
                WindowPlacement::Pushdown
            }
        };
        tracing::debug!(function = %call.kind, call = %call, ?placement, "window pushdown decision");
        Ok(placement)
    }

    fn local_reason(&self, call: &WindowFunctionCall, caps: &dyn SourceCapabilities) -> Option<LocalReason> {
        let missing = |cap: Capability| (!caps.supports(cap)).then_some(LocalReason::MissingCapability(cap));

        if !caps.supports(Capability::ElementaryOlap) {
            return Some(LocalReason::NoWindowSupport);
        }

        let desc = call.descriptor();
        if let Some(reason) = desc.capability.and_then(missing) {
            return Some(reason);
        }
        if call.distinct {
            if let Some(reason) = missing(Capability::QueryAggregatesDistinct) {
                return Some(reason);
            }
            if let Some(reason) = missing(Capability::WindowFunctionDistinctAggregates) {
                return Some(reason);
            }
        }

        let ordered_aggregate = call.kind.is_aggregate() && call.spec.has_order_by();
        if ordered_aggregate || call.spec.order_by_references_aggregate() {
            if let Some(reason) = missing(Capability::WindowFunctionOrderByAggregates) {
                return Some(reason);
            }
        }

        if !call.spec.order_keys().iter().all(|key| null_ordering_supported(key, caps)) {
            return Some(LocalReason::NullOrdering);
        }

        None
    }
}
