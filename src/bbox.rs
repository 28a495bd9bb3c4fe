//! Temporal bounding boxes.
//!
//! A `TBox` summarizes a temporal value: its time span always, plus a value
//! span for numeric domains or a spatial rectangle for point domains. Boxes
//! drive the short-circuit checks in front of every restriction operator.

use crate::span::{Period, Span};
use crate::time::Timestamp;
use crate::value::TValue;
use geo::{Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TBox {
    /// Time extent, always present
    pub period: Period,
    /// Value extent for numeric domains
    pub value: Option<Span<f64>>,
    /// Spatial extent for point domains
    pub space: Option<Rect<f64>>,
}

impl TBox {
    /// The box of a single observation.
    pub fn from_instant(value: &TValue, t: Timestamp) -> Self {
        let period = Period::singleton(t);
        match value {
            TValue::Point(p) => TBox {
                period,
                value: None,
                space: Some(Rect::new(p.0, p.0)),
            },
            v => TBox {
                period,
                value: v.as_f64().map(Span::singleton),
                space: None,
            },
        }
    }

    /// Grow in place to cover another box.
    pub fn expand(&mut self, other: &TBox) {
        self.period.expand_period(&other.period);
        match (&mut self.value, &other.value) {
            (Some(a), Some(b)) => a.expand_span(b),
            (None, Some(b)) => self.value = Some(*b),
            _ => {}
        }
        match (&mut self.space, &other.space) {
            (Some(a), Some(b)) => *a = union_rect(a, b),
            (None, Some(b)) => self.space = Some(*b),
            _ => {}
        }
    }

    /// Grow in place to cover one more observation.
    pub fn expand_instant(&mut self, value: &TValue, t: Timestamp) {
        self.expand(&TBox::from_instant(value, t));
    }

    pub fn contains_timestamp(&self, t: Timestamp) -> bool {
        self.period.contains_point(t)
    }

    /// Whether the time extents intersect.
    pub fn overlaps_period(&self, period: &Period) -> bool {
        self.period.overlaps(period)
    }

    /// Whether a scalar could possibly occur in the summarized value.
    /// Boxes without a value span cannot exclude anything.
    pub fn may_contain_value(&self, value: &TValue) -> bool {
        match value {
            TValue::Point(p) => match &self.space {
                Some(r) => {
                    p.x() >= r.min().x
                        && p.x() <= r.max().x
                        && p.y() >= r.min().y
                        && p.y() <= r.max().y
                }
                None => true,
            },
            v => match (&self.value, v.as_f64()) {
                (Some(span), Some(x)) => span.contains_point(x),
                _ => true,
            },
        }
    }

    /// Whether a value span could intersect the summarized values.
    pub fn may_overlap_value_span(&self, span: &Span<f64>) -> bool {
        match &self.value {
            Some(own) => own.overlaps(span),
            None => true,
        }
    }

    pub fn overlaps(&self, other: &TBox) -> bool {
        if !self.period.overlaps(&other.period) {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.value, &other.value)
            && !a.overlaps(b)
        {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.space, &other.space)
            && !rects_intersect(a, b)
        {
            return false;
        }
        true
    }

    pub fn center_point(&self) -> Option<Point<f64>> {
        self.space.map(|r| r.center().into())
    }
}

fn union_rect(a: &Rect<f64>, b: &Rect<f64>) -> Rect<f64> {
    Rect::new(
        geo::coord! {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        geo::coord! {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    !(a.max().x < b.min().x
        || a.min().x > b.max().x
        || a.max().y < b.min().y
        || a.min().y > b.max().y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: i64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    #[test]
    fn test_from_instant_numeric() {
        let b = TBox::from_instant(&TValue::Float(3.5), ts(10));
        assert_eq!(b.period, Period::singleton(ts(10)));
        assert_eq!(b.value, Some(Span::singleton(3.5)));
        assert!(b.space.is_none());
    }

    #[test]
    fn test_expand_covers_both() {
        let mut b = TBox::from_instant(&TValue::Float(1.0), ts(0));
        b.expand_instant(&TValue::Float(5.0), ts(10));
        assert_eq!(b.period.lower, ts(0));
        assert_eq!(b.period.upper, ts(10));
        let v = b.value.unwrap();
        assert_eq!(v.lower, 1.0);
        assert_eq!(v.upper, 5.0);
    }

    #[test]
    fn test_point_box_union() {
        let mut b = TBox::from_instant(&TValue::Point(Point::new(0.0, 0.0)), ts(0));
        b.expand_instant(&TValue::Point(Point::new(3.0, -2.0)), ts(5));
        let r = b.space.unwrap();
        assert_eq!(r.min().x, 0.0);
        assert_eq!(r.min().y, -2.0);
        assert_eq!(r.max().x, 3.0);
        assert_eq!(r.max().y, 0.0);
    }

    #[test]
    fn test_may_contain_value() {
        let mut b = TBox::from_instant(&TValue::Float(1.0), ts(0));
        b.expand_instant(&TValue::Float(5.0), ts(10));
        assert!(b.may_contain_value(&TValue::Float(3.0)));
        assert!(!b.may_contain_value(&TValue::Float(9.0)));
        // text values are not summarized, so never excluded
        assert!(b.may_contain_value(&TValue::Text("x".into())));
    }

    #[test]
    fn test_overlaps_requires_all_dimensions() {
        let mut a = TBox::from_instant(&TValue::Float(1.0), ts(0));
        a.expand_instant(&TValue::Float(2.0), ts(10));
        let mut b = TBox::from_instant(&TValue::Float(5.0), ts(5));
        b.expand_instant(&TValue::Float(6.0), ts(15));
        // time overlaps but value spans do not
        assert!(!a.overlaps(&b));
    }
}
