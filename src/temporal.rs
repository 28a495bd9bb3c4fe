//! Uniform dispatch over the three temporal shapes.
//!
//! Callers that receive "some temporal value" work through `Temporal`, which
//! forwards each operation to the instant, sequence, or sequence set behind
//! it. Restrictions simplify their result back to the smallest shape that
//! holds it.

use crate::bbox::TBox;
use crate::error::{Result, TempoError};
use crate::instant::TInstant;
use crate::sequence::{Interp, TSequence};
use crate::span::Period;
use crate::spanset::PeriodSet;
use crate::time::{TimeDelta, Timestamp};
use crate::value::{TValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporal {
    Instant(TInstant),
    Sequence(TSequence),
    SequenceSet(TSequenceSet),
}

use crate::seqset::TSequenceSet;

impl Temporal {
    /// Collapse to the smallest shape: a one-sequence set becomes a
    /// sequence, a one-instant discrete sequence becomes an instant.
    pub fn simplify(self) -> Temporal {
        match self {
            Temporal::SequenceSet(set) if set.num_sequences() == 1 => {
                Temporal::Sequence(set.sequences()[0].clone()).simplify()
            }
            Temporal::Sequence(seq)
                if seq.num_instants() == 1 && seq.interp() == Interp::Discrete =>
            {
                Temporal::Instant(seq.instants()[0].clone())
            }
            other => other,
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            Temporal::Instant(i) => i.value.kind(),
            Temporal::Sequence(s) => s.value_kind(),
            Temporal::SequenceSet(s) => s.value_kind(),
        }
    }

    pub fn bbox(&self) -> TBox {
        match self {
            Temporal::Instant(i) => i.bbox(),
            Temporal::Sequence(s) => s.bbox().clone(),
            Temporal::SequenceSet(s) => s.bbox().clone(),
        }
    }

    pub fn period(&self) -> Period {
        match self {
            Temporal::Instant(i) => Period::singleton(i.t),
            Temporal::Sequence(s) => s.period(),
            Temporal::SequenceSet(s) => s.period(),
        }
    }

    pub fn time_span_set(&self) -> PeriodSet {
        match self {
            Temporal::Instant(i) => {
                PeriodSet::from_spans(vec![Period::singleton(i.t)])
            }
            Temporal::Sequence(s) => match s.interp() {
                Interp::Discrete => PeriodSet::from_spans(
                    s.instants()
                        .iter()
                        .map(|i| Period::singleton(i.t))
                        .collect(),
                ),
                _ => PeriodSet::from_spans(vec![s.period()]),
            },
            Temporal::SequenceSet(s) => s.time_span_set(),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        match self {
            Temporal::Instant(_) => TimeDelta::ZERO,
            Temporal::Sequence(s) => s.duration(),
            Temporal::SequenceSet(s) => s.duration(),
        }
    }

    pub fn num_instants(&self) -> usize {
        match self {
            Temporal::Instant(_) => 1,
            Temporal::Sequence(s) => s.num_instants(),
            Temporal::SequenceSet(s) => s.num_instants(),
        }
    }

    pub fn value_at(&self, t: Timestamp, strict: bool) -> Option<TValue> {
        match self {
            Temporal::Instant(i) => (i.t == t).then(|| i.value.clone()),
            Temporal::Sequence(s) => s.value_at(t, strict),
            Temporal::SequenceSet(s) => s.value_at(t, strict),
        }
    }

    pub fn at_timestamp(&self, t: Timestamp) -> Option<TInstant> {
        match self {
            Temporal::Instant(i) => i.at_timestamp(t),
            Temporal::Sequence(s) => s.at_timestamp(t),
            Temporal::SequenceSet(s) => s.at_timestamp(t),
        }
    }

    pub fn at_period(&self, period: &Period) -> Option<Temporal> {
        match self {
            Temporal::Instant(i) => i.at_period(period).map(Temporal::Instant),
            Temporal::Sequence(s) => s.at_period(period).map(Temporal::Sequence),
            Temporal::SequenceSet(s) => s
                .at_period(period)
                .map(|r| Temporal::SequenceSet(r).simplify()),
        }
    }

    pub fn at_period_set(&self, periods: &PeriodSet) -> Option<Temporal> {
        match self {
            Temporal::Instant(i) => i.at_period_set(periods).map(Temporal::Instant),
            Temporal::Sequence(s) => {
                let seqs = s.at_period_set(periods);
                match s.interp() {
                    Interp::Discrete => seqs
                        .into_iter()
                        .next()
                        .map(|r| Temporal::Sequence(r).simplify()),
                    _ => TSequenceSet::new(seqs, false)
                        .ok()
                        .map(|r| Temporal::SequenceSet(r).simplify()),
                }
            }
            Temporal::SequenceSet(s) => s
                .at_period_set(periods)
                .map(|r| Temporal::SequenceSet(r).simplify()),
        }
    }

    pub fn minus_period(&self, period: &Period) -> Option<Temporal> {
        self.at_period_set(&self.time_span_set().minus_span(period))
    }

    pub fn minus_period_set(&self, periods: &PeriodSet) -> Option<Temporal> {
        self.at_period_set(&self.time_span_set().minus(periods))
    }

    pub fn at_value(&self, value: &TValue) -> Result<Option<Temporal>> {
        match self {
            Temporal::Instant(i) => Ok(i.at_value(value).map(Temporal::Instant)),
            Temporal::Sequence(s) => {
                let seqs = s.at_value(value)?;
                Ok(match s.interp() {
                    Interp::Discrete => seqs
                        .into_iter()
                        .next()
                        .map(|r| Temporal::Sequence(r).simplify()),
                    _ => TSequenceSet::new(seqs, false)
                        .ok()
                        .map(|r| Temporal::SequenceSet(r).simplify()),
                })
            }
            Temporal::SequenceSet(s) => Ok(s
                .at_value(value)?
                .map(|r| Temporal::SequenceSet(r).simplify())),
        }
    }

    pub fn minus_value(&self, value: &TValue) -> Result<Option<Temporal>> {
        let covered = match self.at_value(value)? {
            Some(at) => at.time_span_set(),
            None => return Ok(Some(self.clone())),
        };
        Ok(self.at_period_set(&self.time_span_set().minus(&covered)))
    }

    pub fn ever_eq(&self, value: &TValue) -> Result<bool> {
        match self {
            Temporal::Instant(i) => Ok(i.at_value(value).is_some()),
            Temporal::Sequence(s) => s.ever_eq(value),
            Temporal::SequenceSet(s) => s.ever_eq(value),
        }
    }

    pub fn always_eq(&self, value: &TValue) -> Result<bool> {
        match self {
            Temporal::Instant(i) => Ok(&i.value == value),
            Temporal::Sequence(s) => s.always_eq(value),
            Temporal::SequenceSet(s) => s.always_eq(value),
        }
    }

    pub fn shift(&self, delta: TimeDelta) -> Temporal {
        match self {
            Temporal::Instant(i) => Temporal::Instant(i.shift(delta)),
            Temporal::Sequence(s) => Temporal::Sequence(s.shift(delta)),
            Temporal::SequenceSet(s) => Temporal::SequenceSet(s.shift(delta)),
        }
    }

    /// Time-align two temporal values over their overlapping domain. With
    /// `cross`, exact crossing instants of linear segment pairs are
    /// inserted. `None` when the domains do not overlap.
    ///
    /// A discrete operand (an instant or a discrete sequence) restricts
    /// both sides to its timestamps covered by the other operand.
    pub fn synchronize(&self, other: &Temporal, cross: bool) -> Option<(Temporal, Temporal)> {
        if let Some(insts) = self.discrete_instants() {
            let mut left = Vec::new();
            let mut right = Vec::new();
            for inst in insts {
                if let Some(v) = other.value_at(inst.t, true) {
                    right.push(TInstant::new(v, inst.t));
                    left.push(inst);
                }
            }
            return Temporal::discrete_pair(left, right);
        }
        if let Some(insts) = other.discrete_instants() {
            let mut left = Vec::new();
            let mut right = Vec::new();
            for inst in insts {
                if let Some(v) = self.value_at(inst.t, true) {
                    left.push(TInstant::new(v, inst.t));
                    right.push(inst);
                }
            }
            return Temporal::discrete_pair(left, right);
        }
        let a = self.as_sequence_set()?;
        let b = other.as_sequence_set()?;
        let (sa, sb) = a.synchronize(&b, cross)?;
        Some((
            Temporal::SequenceSet(sa).simplify(),
            Temporal::SequenceSet(sb).simplify(),
        ))
    }

    /// The instants behind a discrete-shaped value, `None` for continuous
    /// sequences and sets.
    fn discrete_instants(&self) -> Option<Vec<TInstant>> {
        match self {
            Temporal::Instant(i) => Some(vec![i.clone()]),
            Temporal::Sequence(s) if s.interp() == Interp::Discrete => {
                Some(s.instants().to_vec())
            }
            _ => None,
        }
    }

    fn discrete_pair(left: Vec<TInstant>, right: Vec<TInstant>) -> Option<(Temporal, Temporal)> {
        let l = TSequence::new(left, Interp::Discrete, true, true).ok()?;
        let r = TSequence::new(right, Interp::Discrete, true, true).ok()?;
        Some((
            Temporal::Sequence(l).simplify(),
            Temporal::Sequence(r).simplify(),
        ))
    }

    // Only reached for continuous shapes; discrete ones are routed through
    // discrete_instants first.
    fn as_sequence_set(&self) -> Option<TSequenceSet> {
        match self {
            Temporal::Instant(_) => None,
            Temporal::Sequence(s) => TSequenceSet::from_sequence(s.clone()).ok(),
            Temporal::SequenceSet(s) => Some(s.clone()),
        }
    }

    /// Merge two temporal values of the same kind. Operands of different
    /// shapes are first lifted to the smallest shape that can hold both.
    pub fn merge(&self, other: &Temporal) -> Result<Temporal> {
        if let (Some(a), Some(b)) = (self.discrete_instants(), other.discrete_instants()) {
            return Temporal::merge_discrete(a, b);
        }
        let interp = self
            .shape_interp()
            .or_else(|| other.shape_interp())
            .unwrap_or(Interp::Discrete);
        let sa = self.lift_to_set(interp)?;
        let sb = other.lift_to_set(interp)?;
        Ok(Temporal::SequenceSet(sa.merge(&sb)?).simplify())
    }

    fn merge_discrete(a: Vec<TInstant>, b: Vec<TInstant>) -> Result<Temporal> {
        let mut all = a;
        all.extend(b);
        all.sort_by(|x, y| x.t.cmp(&y.t));
        let mut merged: Vec<TInstant> = Vec::with_capacity(all.len());
        for inst in all {
            match merged.last() {
                Some(prev) if prev.t == inst.t => {
                    if prev.value != inst.value {
                        return Err(TempoError::ValueConflict { at: inst.t });
                    }
                }
                _ => merged.push(inst),
            }
        }
        Ok(Temporal::Sequence(TSequence::new(merged, Interp::Discrete, true, true)?).simplify())
    }

    fn shape_interp(&self) -> Option<Interp> {
        match self {
            Temporal::Instant(_) => None,
            Temporal::Sequence(s) => Some(s.interp()),
            Temporal::SequenceSet(s) => Some(s.interp()),
        }
    }

    fn lift_to_set(&self, interp: Interp) -> Result<TSequenceSet> {
        match self {
            Temporal::Instant(i) => {
                TSequenceSet::from_sequence(TSequence::from_instant(i.clone(), interp))
            }
            Temporal::Sequence(s) => TSequenceSet::from_sequence(s.clone()),
            Temporal::SequenceSet(s) => Ok(s.clone()),
        }
    }

    pub fn integral(&self) -> Result<f64> {
        match self {
            Temporal::Instant(_) => Ok(0.0),
            Temporal::Sequence(s) => s.integral(),
            Temporal::SequenceSet(s) => s.integral(),
        }
    }

    pub fn time_weighted_average(&self) -> Result<f64> {
        match self {
            Temporal::Instant(i) => i.value.as_f64().ok_or(TempoError::DomainMismatch {
                expected: "int or float",
                actual: "non-numeric",
            }),
            Temporal::Sequence(s) => s.time_weighted_average(),
            Temporal::SequenceSet(s) => s.time_weighted_average(),
        }
    }

    pub fn format(&self, maxdd: usize) -> String {
        match self {
            Temporal::Instant(i) => i.format(maxdd),
            Temporal::Sequence(s) => s.format(maxdd),
            Temporal::SequenceSet(s) => s.format(maxdd),
        }
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(12))
    }
}

impl From<TInstant> for Temporal {
    fn from(i: TInstant) -> Self {
        Temporal::Instant(i)
    }
}

impl From<TSequence> for Temporal {
    fn from(s: TSequence) -> Self {
        Temporal::Sequence(s)
    }
}

impl From<TSequenceSet> for Temporal {
    fn from(s: TSequenceSet) -> Self {
        Temporal::SequenceSet(s)
    }
}
