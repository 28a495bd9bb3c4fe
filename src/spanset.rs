//! Sorted sets of disjoint spans.
//!
//! A `SpanSet<T>` holds its spans normalized: sorted by lower bound, with
//! overlapping or exactly-touching neighbors merged into one span. The
//! binary-search `find` location contract defined here is shared by sequence
//! set timestamp lookup.

use crate::span::{Span, SpanBound};
use crate::time::{TimeDelta, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanSet<T: SpanBound> {
    spans: Vec<Span<T>>,
}

/// A set of disjoint time intervals.
pub type PeriodSet = SpanSet<Timestamp>;

impl<T: SpanBound> SpanSet<T> {
    pub fn empty() -> Self {
        SpanSet { spans: Vec::new() }
    }

    /// Build from spans in any order, merging overlapping or adjacent ones.
    pub fn from_spans(mut spans: Vec<Span<T>>) -> Self {
        spans.sort_by(Span::cmp_spans);
        let mut merged: Vec<Span<T>> = Vec::with_capacity(spans.len());
        for s in spans {
            if let Some(last) = merged.last_mut()
                && let Some(u) = last.union(&s)
            {
                *last = u;
                continue;
            }
            merged.push(s);
        }
        SpanSet { spans: merged }
    }

    /// Build from spans already sorted and pairwise disjoint. Not checked.
    pub(crate) fn from_normalized(spans: Vec<Span<T>>) -> Self {
        SpanSet { spans }
    }

    pub fn spans(&self) -> &[Span<T>] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The tightest single span covering the whole set. `None` when empty.
    pub fn bounding_span(&self) -> Option<Span<T>> {
        let first = self.spans.first()?;
        let last = self.spans.last()?;
        Some(Span {
            lower: first.lower,
            upper: last.upper,
            lower_inc: first.lower_inc,
            upper_inc: last.upper_inc,
        })
    }

    /// Binary-search for the span containing `point`.
    ///
    /// On a hit, returns `(true, index)`. On a miss, returns `(false, L)`
    /// where every span before `L` ends strictly before the point and every
    /// span at or after `L` starts at or after it: a point sitting at a
    /// span's exclusive upper bound, or strictly between two spans, locates
    /// at the following span's index.
    pub fn find(&self, point: T) -> (bool, usize) {
        let mut lo = 0usize;
        let mut hi = self.spans.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let s = &self.spans[mid];
            if s.contains_point(point) {
                return (true, mid);
            }
            if point.total_cmp(&s.lower) == Ordering::Greater {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        (false, lo)
    }

    pub fn contains_point(&self, point: T) -> bool {
        self.find(point).0
    }

    pub fn overlaps_span(&self, span: &Span<T>) -> bool {
        self.spans.iter().any(|s| s.overlaps(span))
    }

    /// Restrict to the part covered by `span`.
    pub fn intersect_span(&self, span: &Span<T>) -> SpanSet<T> {
        let spans = self
            .spans
            .iter()
            .filter_map(|s| s.intersection(span))
            .collect();
        SpanSet { spans }
    }

    /// Intersection of two sets, by a two-cursor walk over both span lists.
    pub fn intersection(&self, other: &SpanSet<T>) -> SpanSet<T> {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.spans.len() && j < other.spans.len() {
            let a = &self.spans[i];
            let b = &other.spans[j];
            if let Some(inter) = a.intersection(b) {
                out.push(inter);
            }
            // advance whichever span ends first
            match a.upper.total_cmp(&b.upper) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if a.upper_inc == b.upper_inc {
                        i += 1;
                        j += 1;
                    } else if a.upper_inc {
                        j += 1;
                    } else {
                        i += 1;
                    }
                }
            }
        }
        SpanSet { spans: out }
    }

    /// Remove the part covered by `other`.
    pub fn minus(&self, other: &SpanSet<T>) -> SpanSet<T> {
        let mut out = Vec::new();
        for s in &self.spans {
            let mut rest = vec![*s];
            for o in &other.spans {
                if rest.is_empty() {
                    break;
                }
                let mut next = Vec::with_capacity(rest.len() + 1);
                for r in rest {
                    next.extend(r.minus(o));
                }
                rest = next;
            }
            out.extend(rest);
        }
        SpanSet { spans: out }
    }

    pub fn minus_span(&self, span: &Span<T>) -> SpanSet<T> {
        let mut out = Vec::new();
        for s in &self.spans {
            out.extend(s.minus(span));
        }
        SpanSet { spans: out }
    }

    pub fn union(&self, other: &SpanSet<T>) -> SpanSet<T> {
        let mut all = self.spans.clone();
        all.extend_from_slice(&other.spans);
        SpanSet::from_spans(all)
    }
}

impl PeriodSet {
    /// Total covered duration, gaps excluded.
    pub fn duration(&self) -> TimeDelta {
        self.spans
            .iter()
            .fold(TimeDelta::ZERO, |acc, p| acc + p.duration())
    }

    pub fn shift(&self, delta: TimeDelta) -> PeriodSet {
        SpanSet {
            spans: self.spans.iter().map(|p| p.shift(delta)).collect(),
        }
    }
}

impl<T: SpanBound + fmt::Display> fmt::Display for SpanSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, s) in self.spans.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{s}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;

    fn ts(s: i64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    fn period(lo: i64, hi: i64, li: bool, ui: bool) -> Span<Timestamp> {
        Span::new(ts(lo), ts(hi), li, ui).unwrap()
    }

    fn two_piece() -> PeriodSet {
        SpanSet::from_spans(vec![period(0, 10, true, false), period(20, 30, true, true)])
    }

    #[test]
    fn test_normalize_merges_touching_spans() {
        let set = SpanSet::from_spans(vec![
            period(20, 30, true, true),
            period(0, 10, true, false),
            period(10, 15, true, true),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.spans()[0].upper, ts(15));
    }

    #[test]
    fn test_normalize_keeps_separated_exclusive_touch() {
        // (.., 10) and (10, ..) do not cover 10, so they stay apart
        let set = SpanSet::from_spans(vec![period(0, 10, true, false), period(10, 20, false, true)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_find_hit() {
        let set = two_piece();
        assert_eq!(set.find(ts(5)), (true, 0));
        assert_eq!(set.find(ts(20)), (true, 1));
        assert_eq!(set.find(ts(30)), (true, 1));
    }

    #[test]
    fn test_find_miss_locations() {
        let set = two_piece();
        // before everything
        assert_eq!(set.find(ts(-5)), (false, 0));
        // at the first span's exclusive upper bound
        assert_eq!(set.find(ts(10)), (false, 1));
        // strictly between the two spans
        assert_eq!(set.find(ts(15)), (false, 1));
        // after everything
        assert_eq!(set.find(ts(40)), (false, 2));
    }

    #[test]
    fn test_intersection_walk() {
        let a = two_piece();
        let b = SpanSet::from_spans(vec![period(5, 25, true, true)]);
        let i = a.intersection(&b);
        assert_eq!(i.len(), 2);
        assert_eq!(i.spans()[0], period(5, 10, true, false));
        assert_eq!(i.spans()[1], period(20, 25, true, true));
    }

    #[test]
    fn test_minus_punches_hole() {
        let a = SpanSet::from_spans(vec![period(0, 30, true, true)]);
        let b = SpanSet::from_spans(vec![period(10, 20, false, false)]);
        let m = a.minus(&b);
        assert_eq!(m.len(), 2);
        assert_eq!(m.spans()[0], period(0, 10, true, true));
        assert_eq!(m.spans()[1], period(20, 30, true, true));
    }

    #[test]
    fn test_minus_self_is_empty() {
        let a = two_piece();
        assert!(a.minus(&a).is_empty());
    }

    #[test]
    fn test_duration_skips_gaps() {
        let set = two_piece();
        assert_eq!(set.duration(), TimeDelta::from_secs(20));
    }
}
