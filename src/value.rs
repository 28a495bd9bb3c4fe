//! Base value domain for temporal values.
//!
//! A `TValue` is one observation payload: boolean, integer, float, text,
//! geographic point, or a small fixed vector of doubles (used internally by
//! aggregation transforms). Floats get a total order and a bitwise hash so
//! temporal values can live in ordered and hashed collections.

use geo::Point;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Discriminant of a `TValue`, used for domain checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Point,
    DoubleN,
}

impl ValueKind {
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Point => "point",
            ValueKind::DoubleN => "doublen",
        }
    }

    /// Whether values of this kind vary continuously, and so admit linear
    /// interpolation.
    pub const fn is_continuous(self) -> bool {
        matches!(self, ValueKind::Float | ValueKind::Point | ValueKind::DoubleN)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Point(Point<f64>),
    DoubleN(SmallVec<[f64; 4]>),
}

impl TValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TValue::Bool(_) => ValueKind::Bool,
            TValue::Int(_) => ValueKind::Int,
            TValue::Float(_) => ValueKind::Float,
            TValue::Text(_) => ValueKind::Text,
            TValue::Point(_) => ValueKind::Point,
            TValue::DoubleN(_) => ValueKind::DoubleN,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.kind().is_continuous()
    }

    /// Numeric view for bounding-box purposes. `None` for non-numeric kinds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TValue::Int(v) => Some(*v as f64),
            TValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Total order. Values of different kinds order by kind, so mixed
    /// collections still sort deterministically.
    pub fn total_cmp(&self, other: &TValue) -> Ordering {
        use TValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Point(a), Point(b)) => a
                .x()
                .total_cmp(&b.x())
                .then_with(|| a.y().total_cmp(&b.y())),
            (DoubleN(a), DoubleN(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let c = x.total_cmp(y);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            TValue::Bool(_) => 0,
            TValue::Int(_) => 1,
            TValue::Float(_) => 2,
            TValue::Text(_) => 3,
            TValue::Point(_) => 4,
            TValue::DoubleN(_) => 5,
        }
    }

    /// Linear interpolation between two values of the same continuous kind at
    /// `ratio` in `[0, 1]`. `None` for discrete kinds or mismatched kinds.
    pub fn lerp(&self, other: &TValue, ratio: f64) -> Option<TValue> {
        match (self, other) {
            (TValue::Float(a), TValue::Float(b)) => Some(TValue::Float(a + (b - a) * ratio)),
            (TValue::Point(a), TValue::Point(b)) => Some(TValue::Point(Point::new(
                a.x() + (b.x() - a.x()) * ratio,
                a.y() + (b.y() - a.y()) * ratio,
            ))),
            (TValue::DoubleN(a), TValue::DoubleN(b)) if a.len() == b.len() => Some(TValue::DoubleN(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| x + (y - x) * ratio)
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Distance between two values of the same kind, when a metric exists.
    pub fn distance(&self, other: &TValue) -> Option<f64> {
        match (self, other) {
            (TValue::Int(a), TValue::Int(b)) => Some((a - b).abs() as f64),
            (TValue::Float(a), TValue::Float(b)) => Some((a - b).abs()),
            (TValue::Point(a), TValue::Point(b)) => {
                let dx = a.x() - b.x();
                let dy = a.y() - b.y();
                Some((dx * dx + dy * dy).sqrt())
            }
            (TValue::DoubleN(a), TValue::DoubleN(b)) if a.len() == b.len() => Some(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt(),
            ),
            _ => None,
        }
    }

    /// Ratio in `(0, 1)` at which two linear segments `a1 -> a2` and
    /// `b1 -> b2` (sharing the same time span) cross value-wise, if they do.
    pub fn segment_crossing(a1: &TValue, a2: &TValue, b1: &TValue, b2: &TValue) -> Option<f64> {
        match (a1, a2, b1, b2) {
            (TValue::Float(a1), TValue::Float(a2), TValue::Float(b1), TValue::Float(b2)) => {
                float_crossing(*a1, *a2, *b1, *b2)
            }
            (TValue::Point(a1), TValue::Point(a2), TValue::Point(b1), TValue::Point(b2)) => {
                // cross only when both coordinates meet at the same ratio
                let rx = float_crossing(a1.x(), a2.x(), b1.x(), b2.x());
                let ry = float_crossing(a1.y(), a2.y(), b1.y(), b2.y());
                match (rx, ry) {
                    (Some(rx), Some(ry)) if (rx - ry).abs() < f64::EPSILON => Some(rx),
                    (Some(rx), None) if a1.y() == b1.y() && a2.y() == b2.y() => Some(rx),
                    (None, Some(ry)) if a1.x() == b1.x() && a2.x() == b2.x() => Some(ry),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Componentwise sum, used by aggregation states.
    pub fn add(&self, other: &TValue) -> Option<TValue> {
        match (self, other) {
            (TValue::Int(a), TValue::Int(b)) => Some(TValue::Int(a + b)),
            (TValue::Float(a), TValue::Float(b)) => Some(TValue::Float(a + b)),
            (TValue::DoubleN(a), TValue::DoubleN(b)) if a.len() == b.len() => Some(TValue::DoubleN(
                a.iter().zip(b.iter()).map(|(x, y)| x + y).collect(),
            )),
            _ => None,
        }
    }

    /// Render with at most `maxdd` decimal digits on float components,
    /// trailing zeros trimmed.
    pub fn format(&self, maxdd: usize) -> String {
        match self {
            TValue::Bool(v) => if *v { "t" } else { "f" }.to_string(),
            TValue::Int(v) => v.to_string(),
            TValue::Float(v) => fmt_float(*v, maxdd),
            TValue::Text(v) => format!("\"{v}\""),
            TValue::Point(p) => format!(
                "POINT({} {})",
                fmt_float(p.x(), maxdd),
                fmt_float(p.y(), maxdd)
            ),
            TValue::DoubleN(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| fmt_float(*v, maxdd)).collect();
                format!("({})", parts.join(", "))
            }
        }
    }
}

fn float_crossing(a1: f64, a2: f64, b1: f64, b2: f64) -> Option<f64> {
    let denom = (a2 - a1) - (b2 - b1);
    if denom == 0.0 {
        return None;
    }
    let r = (b1 - a1) / denom;
    if r > 0.0 && r < 1.0 { Some(r) } else { None }
}

/// Format a float with at most `maxdd` fractional digits, trimming trailing
/// zeros but keeping at least one digit after the point.
pub fn fmt_float(v: f64, maxdd: usize) -> String {
    let s = format!("{v:.maxdd$}");
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

impl PartialEq for TValue {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl Eq for TValue {}

impl PartialOrd for TValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_cmp(other))
    }
}

impl Ord for TValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl Hash for TValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            TValue::Bool(v) => v.hash(state),
            TValue::Int(v) => v.hash(state),
            TValue::Float(v) => v.to_bits().hash(state),
            TValue::Text(v) => v.hash(state),
            TValue::Point(p) => {
                p.x().to_bits().hash(state);
                p.y().to_bits().hash(state);
            }
            TValue::DoubleN(vs) => {
                for v in vs {
                    v.to_bits().hash(state);
                }
            }
        }
    }
}

impl fmt::Display for TValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(12))
    }
}
