//! Closed-or-open intervals over an ordered domain.
//!
//! A `Span<T>` pairs lower and upper bounds with inclusivity flags. Time
//! spans (`Period`) and numeric value spans (`Span<f64>`) share the same
//! arithmetic: overlap, containment, intersection, difference, shift, scale.

use crate::error::{Result, TempoError};
use crate::time::{TimeDelta, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Domain of a span bound. Implementors supply a total order even when the
/// underlying type (f64) only has a partial one.
pub trait SpanBound: Copy + PartialEq + PartialOrd + fmt::Debug {
    fn total_cmp(&self, other: &Self) -> Ordering;
}

impl SpanBound for Timestamp {
    fn total_cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }
}

impl SpanBound for i64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }
}

impl SpanBound for f64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }
}

/// An interval with independently inclusive or exclusive endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span<T: SpanBound> {
    pub lower: T,
    pub upper: T,
    pub lower_inc: bool,
    pub upper_inc: bool,
}

/// A time interval.
pub type Period = Span<Timestamp>;

impl<T: SpanBound> Span<T> {
    /// Build a span, rejecting inverted bounds and empty degenerate spans.
    ///
    /// A degenerate span (`lower == upper`) must be closed on both sides,
    /// otherwise it would denote an empty set.
    pub fn new(lower: T, upper: T, lower_inc: bool, upper_inc: bool) -> Result<Self> {
        match lower.total_cmp(&upper) {
            Ordering::Greater => Err(TempoError::InvalidArgument(format!(
                "span lower bound {lower:?} exceeds upper bound {upper:?}"
            ))),
            Ordering::Equal if !(lower_inc && upper_inc) => Err(TempoError::InvalidArgument(
                format!("degenerate span at {lower:?} must be inclusive on both sides"),
            )),
            _ => Ok(Span {
                lower,
                upper,
                lower_inc,
                upper_inc,
            }),
        }
    }

    /// A closed span `[lower, upper]`.
    pub fn closed(lower: T, upper: T) -> Result<Self> {
        Span::new(lower, upper, true, true)
    }

    /// A single-point span `[point, point]`.
    pub fn singleton(point: T) -> Self {
        Span {
            lower: point,
            upper: point,
            lower_inc: true,
            upper_inc: true,
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.lower.total_cmp(&self.upper) == Ordering::Equal
    }

    /// Whether the span contains a single point.
    pub fn contains_point(&self, point: T) -> bool {
        let lo = match point.total_cmp(&self.lower) {
            Ordering::Less => return false,
            Ordering::Equal => self.lower_inc,
            Ordering::Greater => true,
        };
        let hi = match point.total_cmp(&self.upper) {
            Ordering::Greater => return false,
            Ordering::Equal => self.upper_inc,
            Ordering::Less => true,
        };
        lo && hi
    }

    /// Whether `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span<T>) -> bool {
        let lo_ok = match self.lower.total_cmp(&other.lower) {
            Ordering::Less => true,
            Ordering::Equal => self.lower_inc || !other.lower_inc,
            Ordering::Greater => false,
        };
        let hi_ok = match self.upper.total_cmp(&other.upper) {
            Ordering::Greater => true,
            Ordering::Equal => self.upper_inc || !other.upper_inc,
            Ordering::Less => false,
        };
        lo_ok && hi_ok
    }

    /// Whether the two spans share at least one point.
    pub fn overlaps(&self, other: &Span<T>) -> bool {
        !self.left_of(other) && !other.left_of(self)
    }

    /// Whether `self` lies entirely before `other`. Touching bounds count as
    /// disjoint only when at most one of the touching bounds is inclusive.
    pub fn left_of(&self, other: &Span<T>) -> bool {
        match self.upper.total_cmp(&other.lower) {
            Ordering::Less => true,
            Ordering::Equal => !(self.upper_inc && other.lower_inc),
            Ordering::Greater => false,
        }
    }

    /// Whether the spans touch without overlapping, so that their union is a
    /// single span.
    pub fn is_adjacent(&self, other: &Span<T>) -> bool {
        (self.upper.total_cmp(&other.lower) == Ordering::Equal
            && self.upper_inc != other.lower_inc)
            || (other.upper.total_cmp(&self.lower) == Ordering::Equal
                && other.upper_inc != self.lower_inc)
    }

    /// The overlapping part of two spans, if any.
    pub fn intersection(&self, other: &Span<T>) -> Option<Span<T>> {
        if !self.overlaps(other) {
            return None;
        }
        let (lower, lower_inc) = match self.lower.total_cmp(&other.lower) {
            Ordering::Greater => (self.lower, self.lower_inc),
            Ordering::Less => (other.lower, other.lower_inc),
            Ordering::Equal => (self.lower, self.lower_inc && other.lower_inc),
        };
        let (upper, upper_inc) = match self.upper.total_cmp(&other.upper) {
            Ordering::Less => (self.upper, self.upper_inc),
            Ordering::Greater => (other.upper, other.upper_inc),
            Ordering::Equal => (self.upper, self.upper_inc && other.upper_inc),
        };
        Some(Span {
            lower,
            upper,
            lower_inc,
            upper_inc,
        })
    }

    /// Union of two overlapping or adjacent spans. `None` when the spans are
    /// separated.
    pub fn union(&self, other: &Span<T>) -> Option<Span<T>> {
        if !self.overlaps(other) && !self.is_adjacent(other) {
            return None;
        }
        let (lower, lower_inc) = match self.lower.total_cmp(&other.lower) {
            Ordering::Less => (self.lower, self.lower_inc),
            Ordering::Greater => (other.lower, other.lower_inc),
            Ordering::Equal => (self.lower, self.lower_inc || other.lower_inc),
        };
        let (upper, upper_inc) = match self.upper.total_cmp(&other.upper) {
            Ordering::Greater => (self.upper, self.upper_inc),
            Ordering::Less => (other.upper, other.upper_inc),
            Ordering::Equal => (self.upper, self.upper_inc || other.upper_inc),
        };
        Some(Span {
            lower,
            upper,
            lower_inc,
            upper_inc,
        })
    }

    /// Subtract `other`, yielding zero, one, or two remainder spans.
    pub fn minus(&self, other: &Span<T>) -> Vec<Span<T>> {
        let Some(inter) = self.intersection(other) else {
            return vec![*self];
        };
        let mut out = Vec::with_capacity(2);
        // Left remainder: [self.lower, inter.lower)
        let left_nonempty = match self.lower.total_cmp(&inter.lower) {
            Ordering::Less => true,
            Ordering::Equal => self.lower_inc && !inter.lower_inc,
            Ordering::Greater => false,
        };
        if left_nonempty {
            out.push(Span {
                lower: self.lower,
                upper: inter.lower,
                lower_inc: self.lower_inc,
                upper_inc: !inter.lower_inc,
            });
        }
        let right_nonempty = match inter.upper.total_cmp(&self.upper) {
            Ordering::Less => true,
            Ordering::Equal => self.upper_inc && !inter.upper_inc,
            Ordering::Greater => false,
        };
        if right_nonempty {
            out.push(Span {
                lower: inter.upper,
                upper: self.upper,
                lower_inc: !inter.upper_inc,
                upper_inc: self.upper_inc,
            });
        }
        out
    }

    /// Total order: lower bound first (an inclusive lower sorts before an
    /// exclusive one at the same point), then upper bound.
    pub fn cmp_spans(&self, other: &Span<T>) -> Ordering {
        self.lower
            .total_cmp(&other.lower)
            .then_with(|| other.lower_inc.cmp(&self.lower_inc))
            .then_with(|| self.upper.total_cmp(&other.upper))
            .then_with(|| self.upper_inc.cmp(&other.upper_inc))
    }
}

impl Period {
    pub fn duration(&self) -> TimeDelta {
        self.upper - self.lower
    }

    /// Translate the period by a signed delta.
    pub fn shift(&self, delta: TimeDelta) -> Period {
        Span {
            lower: self.lower + delta,
            upper: self.upper + delta,
            ..*self
        }
    }

    /// Stretch or shrink the period to the given duration, keeping the lower
    /// bound fixed.
    pub fn scale(&self, new_duration: TimeDelta) -> Result<Period> {
        if !new_duration.is_positive() {
            return Err(TempoError::InvalidArgument(format!(
                "period duration must be positive, got {new_duration}"
            )));
        }
        Ok(Span {
            upper: self.lower + new_duration,
            ..*self
        })
    }
}

impl Span<f64> {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Extend in place so the span covers `v`.
    pub fn expand_value(&mut self, v: f64) {
        if v < self.lower {
            self.lower = v;
            self.lower_inc = true;
        }
        if v > self.upper {
            self.upper = v;
            self.upper_inc = true;
        }
    }

    /// Extend in place so the span covers `other` entirely.
    pub fn expand_span(&mut self, other: &Span<f64>) {
        match other.lower.total_cmp(&self.lower) {
            Ordering::Less => {
                self.lower = other.lower;
                self.lower_inc = other.lower_inc;
            }
            Ordering::Equal => self.lower_inc |= other.lower_inc,
            Ordering::Greater => {}
        }
        match other.upper.total_cmp(&self.upper) {
            Ordering::Greater => {
                self.upper = other.upper;
                self.upper_inc = other.upper_inc;
            }
            Ordering::Equal => self.upper_inc |= other.upper_inc,
            Ordering::Less => {}
        }
    }
}

impl Period {
    /// Extend in place so the period covers `other` entirely.
    pub fn expand_period(&mut self, other: &Period) {
        match other.lower.cmp(&self.lower) {
            Ordering::Less => {
                self.lower = other.lower;
                self.lower_inc = other.lower_inc;
            }
            Ordering::Equal => self.lower_inc |= other.lower_inc,
            Ordering::Greater => {}
        }
        match other.upper.cmp(&self.upper) {
            Ordering::Greater => {
                self.upper = other.upper;
                self.upper_inc = other.upper_inc;
            }
            Ordering::Equal => self.upper_inc |= other.upper_inc,
            Ordering::Less => {}
        }
    }
}

impl<T: SpanBound + fmt::Display> fmt::Display for Span<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.lower_inc { '[' } else { '(' },
            self.lower,
            self.upper,
            if self.upper_inc { ']' } else { ')' },
        )
    }
}
