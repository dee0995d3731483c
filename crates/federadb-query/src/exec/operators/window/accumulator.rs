//! Aggregate accumulation over window frames.

use std::cmp::Ordering;
use std::collections::HashSet;

use federadb_core::{CoreError, CoreResult, Value};

use crate::plan::catalog::WindowFunctionKind;

/// Hashable identity of a value for DISTINCT aggregation.
///
/// Integral floats map to the integer they equal, so `1` and `1.0` count once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DistinctKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Bytes(Vec<u8>),
}

impl DistinctKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int(i) => Some(Self::Int(*i)),
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(Self::Int(*f as i64)),
            Value::Float(f) => Some(Self::Float(f.to_bits())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Bytes(b) => Some(Self::Bytes(b.clone())),
        }
    }
}

/// Running state of one aggregate.
#[derive(Debug, Clone)]
pub(crate) struct Accumulator {
    kind: WindowFunctionKind,
    count: i64,
    sum: Option<Value>,
    extreme: Option<Value>,
    seen: Option<HashSet<DistinctKey>>,
}

impl Accumulator {
    pub(crate) fn new(kind: WindowFunctionKind, distinct: bool) -> Self {
        Self { kind, count: 0, sum: None, extreme: None, seen: distinct.then(HashSet::new) }
    }

    /// Adds a row's argument value. `COUNT(*)` counts every row; the other
    /// aggregates skip NULL.
    pub(crate) fn update(&mut self, value: &Value) -> CoreResult<()> {
        if self.kind == WindowFunctionKind::CountStar {
            self.count += 1;
            return Ok(());
        }
        if value.is_null() {
            return Ok(());
        }
        if let Some(seen) = &mut self.seen {
            if DistinctKey::of(value).is_some_and(|key| !seen.insert(key)) {
                return Ok(());
            }
        }

        match self.kind {
            WindowFunctionKind::Sum | WindowFunctionKind::Avg => {
                if !value.is_numeric() {
                    return Err(CoreError::type_mismatch_with_value("numeric", value.type_name(), value));
                }
                self.sum = Some(match &self.sum {
                    Some(sum) => sum.checked_add(value)?,
                    None => value.clone(),
                });
            }
            WindowFunctionKind::Min | WindowFunctionKind::Max => {
                let wanted = if self.kind == WindowFunctionKind::Min { Ordering::Less } else { Ordering::Greater };
                if self.extreme.as_ref().map_or(true, |current| value.compare(current) == wanted) {
                    self.extreme = Some(value.clone());
                }
            }
            _ => {}
        }
        self.count += 1;
        Ok(())
    }

    /// Returns the aggregate of the values added so far.
    pub(crate) fn value(&self) -> Value {
        match self.kind {
            WindowFunctionKind::Count | WindowFunctionKind::CountStar => Value::Int(self.count),
            WindowFunctionKind::Sum => self.sum.clone().unwrap_or(Value::Null),
            #[allow(clippy::cast_precision_loss)]
            WindowFunctionKind::Avg => match self.sum.as_ref().and_then(Value::to_f64) {
                Some(sum) if self.count > 0 => Value::Float(sum / self.count as f64),
                _ => Value::Null,
            },
            WindowFunctionKind::Min | WindowFunctionKind::Max => self.extreme.clone().unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(kind: WindowFunctionKind, distinct: bool, values: &[Value]) -> CoreResult<Value> {
        let mut acc = Accumulator::new(kind, distinct);
        for value in values {
            acc.update(value)?;
        }
        Ok(acc.value())
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(aggregate(WindowFunctionKind::Count, false, &[]).unwrap(), Value::Int(0));
        assert_eq!(aggregate(WindowFunctionKind::CountStar, false, &[]).unwrap(), Value::Int(0));
        assert_eq!(aggregate(WindowFunctionKind::Sum, false, &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(aggregate(WindowFunctionKind::Avg, false, &[]).unwrap(), Value::Null);
        assert_eq!(aggregate(WindowFunctionKind::Max, false, &[]).unwrap(), Value::Null);
    }

    #[test]
    fn count_skips_nulls_count_star_does_not() {
        let values = [Value::from("a"), Value::Null, Value::from("b")];
        assert_eq!(aggregate(WindowFunctionKind::Count, false, &values).unwrap(), Value::Int(2));
        assert_eq!(aggregate(WindowFunctionKind::CountStar, false, &values).unwrap(), Value::Int(3));
    }

    #[test]
    fn distinct() {
        let values = [Value::from("a"), Value::from("a"), Value::Null, Value::from("b")];
        assert_eq!(aggregate(WindowFunctionKind::Count, true, &values).unwrap(), Value::Int(2));

        let numbers = [Value::Int(1), Value::Float(1.0), Value::Int(2)];
        assert_eq!(aggregate(WindowFunctionKind::Sum, true, &numbers).unwrap(), Value::Int(3));
    }

    #[test]
    fn without_distinct_every_non_null_value_counts() {
        let values = [Value::from("a"), Value::from("a"), Value::Null, Value::Bytes(vec![1]), Value::Bytes(vec![1])];
        let mut acc = Accumulator::new(WindowFunctionKind::Count, false);
        for value in &values {
            acc.update(value).unwrap();
        }
        assert!(acc.seen.is_none());
        assert_eq!(acc.value(), Value::Int(4));
    }

    #[test]
    fn sum_and_avg_types() {
        let ints = [Value::Int(1), Value::Int(2)];
        assert_eq!(aggregate(WindowFunctionKind::Sum, false, &ints).unwrap(), Value::Int(3));
        assert_eq!(aggregate(WindowFunctionKind::Avg, false, &ints).unwrap(), Value::Float(1.5));

        let mixed = [Value::Int(1), Value::Float(0.5)];
        assert_eq!(aggregate(WindowFunctionKind::Sum, false, &mixed).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn sum_errors() {
        let overflow = [Value::Int(i64::MAX), Value::Int(1)];
        assert!(matches!(
            aggregate(WindowFunctionKind::Sum, false, &overflow),
            Err(CoreError::Overflow(_))
        ));
        assert!(matches!(
            aggregate(WindowFunctionKind::Avg, false, &[Value::from("x")]),
            Err(CoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn min_max() {
        let values = [Value::from("b"), Value::Null, Value::from("a"), Value::from("c")];
        assert_eq!(aggregate(WindowFunctionKind::Min, false, &values).unwrap(), Value::from("a"));
        assert_eq!(aggregate(WindowFunctionKind::Max, false, &values).unwrap(), Value::from("c"));
    }
}
