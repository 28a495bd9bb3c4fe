//! A single timestamped observation.

use crate::bbox::TBox;
use crate::span::Period;
use crate::spanset::PeriodSet;
use crate::time::{TimeDelta, Timestamp};
use crate::value::TValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A value observed at one instant in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TInstant {
    pub value: TValue,
    pub t: Timestamp,
}

impl TInstant {
    pub fn new(value: TValue, t: Timestamp) -> Self {
        TInstant { value, t }
    }

    pub fn bbox(&self) -> TBox {
        TBox::from_instant(&self.value, self.t)
    }

    pub fn shift(&self, delta: TimeDelta) -> TInstant {
        TInstant {
            value: self.value.clone(),
            t: self.t + delta,
        }
    }

    /// Restrict to a timestamp: the instant survives only on an exact hit.
    pub fn at_timestamp(&self, t: Timestamp) -> Option<TInstant> {
        (self.t == t).then(|| self.clone())
    }

    pub fn at_period(&self, period: &Period) -> Option<TInstant> {
        period.contains_point(self.t).then(|| self.clone())
    }

    pub fn at_period_set(&self, periods: &PeriodSet) -> Option<TInstant> {
        periods.contains_point(self.t).then(|| self.clone())
    }

    pub fn at_value(&self, value: &TValue) -> Option<TInstant> {
        (&self.value == value).then(|| self.clone())
    }

    pub fn format(&self, maxdd: usize) -> String {
        format!("{}@{}", self.value.format(maxdd), self.t)
    }
}

/// Instants order by timestamp first, then by value, matching sequence
/// ordering.
impl Ord for TInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.t
            .cmp(&other.t)
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

impl PartialOrd for TInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(12))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn ts(s: i64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    #[test]
    fn test_at_timestamp_exact_hit_only() {
        let i = TInstant::new(TValue::Int(7), ts(5));
        assert!(i.at_timestamp(ts(5)).is_some());
        assert!(i.at_timestamp(ts(6)).is_none());
    }

    #[test]
    fn test_at_period_respects_bounds() {
        let i = TInstant::new(TValue::Int(7), ts(10));
        let open = Span::new(ts(0), ts(10), true, false).unwrap();
        let closed = Span::new(ts(0), ts(10), true, true).unwrap();
        assert!(i.at_period(&open).is_none());
        assert!(i.at_period(&closed).is_some());
    }

    #[test]
    fn test_ordering_by_time_then_value() {
        let a = TInstant::new(TValue::Int(9), ts(1));
        let b = TInstant::new(TValue::Int(1), ts(2));
        assert!(a < b);
        let c = TInstant::new(TValue::Int(2), ts(1));
        assert!(a > c);
    }

    #[test]
    fn test_format() {
        let i = TInstant::new(TValue::Float(1.25), Timestamp::from_micros(42));
        assert_eq!(i.format(6), "1.25@42");
    }
}
