//! Combinable temporal-average aggregation.
//!
//! A running average over many temporal values cannot be kept as a plain
//! float because contributions overlap in time. The accumulator instead
//! lifts every numeric observation into a `DoubleN` pair `(sum, count)` and
//! keeps those pairs as a temporal value of their own: overlapping regions
//! add componentwise, disjoint regions merge untouched. Finalizing divides
//! sum by count pointwise. Two accumulators built over different inputs
//! combine the same way, so the aggregation parallelizes.

use smallvec::smallvec;

use crate::error::{Result, TempoError};
use crate::instant::TInstant;
use crate::sequence::{Interp, TSequence};
use crate::seqset::TSequenceSet;
use crate::temporal::Temporal;
use crate::value::TValue;

/// Running state of a temporal average.
///
/// Instant-shaped and sequence-shaped inputs keep time in incompatible
/// ways, so a state locks onto the shape of its first input and rejects the
/// other shape afterwards.
#[derive(Debug, Clone, Default)]
pub struct TAvgState {
    store: Store,
}

#[derive(Debug, Clone, Default)]
enum Store {
    #[default]
    Empty,
    /// One `(sum, count)` instant per distinct timestamp, time-ordered.
    Discrete(Vec<TInstant>),
    Continuous(TSequenceSet),
}

impl TAvgState {
    pub fn new() -> Self {
        TAvgState::default()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.store, Store::Empty)
    }

    /// Fold one temporal value into the state.
    pub fn accumulate(&mut self, value: &Temporal) -> Result<()> {
        match value {
            Temporal::Instant(inst) => self.accumulate_instants(&[inst.clone()]),
            Temporal::Sequence(seq) if seq.interp() == Interp::Discrete => {
                self.accumulate_instants(seq.instants())
            }
            Temporal::Sequence(seq) => {
                let lifted = TSequenceSet::from_sequence(lift_sequence(seq)?)?;
                self.accumulate_continuous(lifted)
            }
            Temporal::SequenceSet(set) => {
                let lifted = lift_set(set)?;
                self.accumulate_continuous(lifted)
            }
        }
    }

    /// Fold another state into this one.
    pub fn combine(&mut self, other: TAvgState) -> Result<()> {
        match other.store {
            Store::Empty => Ok(()),
            Store::Discrete(instants) => self.accumulate_instants(&instants),
            Store::Continuous(set) => self.accumulate_continuous(set),
        }
    }

    /// The averaged temporal value, `None` when nothing accumulated.
    pub fn finalize(&self) -> Result<Option<Temporal>> {
        match &self.store {
            Store::Empty => Ok(None),
            Store::Discrete(instants) => {
                let averaged: Vec<TInstant> = instants
                    .iter()
                    .map(|i| TInstant::new(final_avg(&i.value), i.t))
                    .collect();
                let seq = TSequence::new(averaged, Interp::Discrete, true, true)?;
                Ok(Some(Temporal::Sequence(seq).simplify()))
            }
            Store::Continuous(set) => {
                let mut sequences = Vec::with_capacity(set.num_sequences());
                for seq in set.sequences() {
                    let averaged: Vec<TInstant> = seq
                        .instants()
                        .iter()
                        .map(|i| TInstant::new(final_avg(&i.value), i.t))
                        .collect();
                    sequences.push(TSequence::new(
                        averaged,
                        seq.interp(),
                        seq.lower_inc(),
                        seq.upper_inc(),
                    )?);
                }
                let set = TSequenceSet::new(sequences, true)?;
                Ok(Some(Temporal::SequenceSet(set).simplify()))
            }
        }
    }

    fn accumulate_instants(&mut self, instants: &[TInstant]) -> Result<()> {
        let store = match &mut self.store {
            Store::Empty => {
                self.store = Store::Discrete(Vec::with_capacity(instants.len()));
                let Store::Discrete(v) = &mut self.store else {
                    unreachable!()
                };
                v
            }
            Store::Discrete(v) => v,
            Store::Continuous(_) => {
                return Err(TempoError::InvalidArgument(
                    "cannot aggregate instants into a sequence-shaped average".into(),
                ));
            }
        };
        for inst in instants {
            let lifted = lift_value(&inst.value)?;
            match store.binary_search_by(|probe| probe.t.cmp(&inst.t)) {
                Ok(pos) => {
                    let prev = &store[pos].value;
                    let sum = prev.add(&lifted).ok_or(TempoError::DomainMismatch {
                        expected: "matching aggregate widths",
                        actual: "mismatched widths",
                    })?;
                    store[pos] = TInstant::new(sum, inst.t);
                }
                Err(pos) => store.insert(pos, TInstant::new(lifted, inst.t)),
            }
        }
        Ok(())
    }

    fn accumulate_continuous(&mut self, lifted: TSequenceSet) -> Result<()> {
        match &self.store {
            Store::Empty => {
                self.store = Store::Continuous(lifted);
                Ok(())
            }
            Store::Discrete(_) => Err(TempoError::InvalidArgument(
                "cannot aggregate sequences into an instant-shaped average".into(),
            )),
            Store::Continuous(state) => {
                let merged = add_sets(state, &lifted)?;
                self.store = Store::Continuous(merged);
                Ok(())
            }
        }
    }
}

/// Componentwise sum of two `(sum, count)` sets: overlapping time adds,
/// disjoint time passes through.
fn add_sets(a: &TSequenceSet, b: &TSequenceSet) -> Result<TSequenceSet> {
    let Some((sa, sb)) = a.synchronize(b, false) else {
        return a.merge(b);
    };
    let mut summed = Vec::with_capacity(sa.num_sequences());
    for (pa, pb) in sa.sequences().iter().zip(sb.sequences()) {
        let instants: Vec<TInstant> = pa
            .instants()
            .iter()
            .zip(pb.instants())
            .map(|(ia, ib)| {
                ia.value
                    .add(&ib.value)
                    .map(|sum| TInstant::new(sum, ia.t))
                    .ok_or(TempoError::DomainMismatch {
                        expected: "matching aggregate widths",
                        actual: "mismatched widths",
                    })
            })
            .collect::<Result<_>>()?;
        summed.push(TSequence::new(
            instants,
            pa.interp(),
            pa.lower_inc(),
            pa.upper_inc(),
        )?);
    }
    let overlap = sa.time_span_set();
    let sum_set = TSequenceSet::new(summed, true)?;
    let mut parts: Vec<TSequenceSet> = vec![sum_set];
    if let Some(rest) = a.minus_period_set(&overlap) {
        parts.push(rest);
    }
    if let Some(rest) = b.minus_period_set(&overlap) {
        parts.push(rest);
    }
    let refs: Vec<&TSequenceSet> = parts.iter().collect();
    TSequenceSet::merge_array(&refs)
}

fn lift_value(value: &TValue) -> Result<TValue> {
    let v = value.as_f64().ok_or(TempoError::DomainMismatch {
        expected: "a numeric value",
        actual: value.kind().name(),
    })?;
    Ok(TValue::DoubleN(smallvec![v, 1.0]))
}

fn lift_sequence(seq: &TSequence) -> Result<TSequence> {
    let instants: Vec<TInstant> = seq
        .instants()
        .iter()
        .map(|i| lift_value(&i.value).map(|v| TInstant::new(v, i.t)))
        .collect::<Result<_>>()?;
    TSequence::new(instants, seq.interp(), seq.lower_inc(), seq.upper_inc())
}

fn lift_set(set: &TSequenceSet) -> Result<TSequenceSet> {
    let sequences: Vec<TSequence> = set
        .sequences()
        .iter()
        .map(lift_sequence)
        .collect::<Result<_>>()?;
    TSequenceSet::new(sequences, false)
}

fn final_avg(value: &TValue) -> TValue {
    match value {
        TValue::DoubleN(pair) if pair.len() == 2 && pair[1] != 0.0 => {
            TValue::Float(pair[0] / pair[1])
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;

    fn ts(s: i64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    fn linear(points: &[(f64, i64)]) -> Temporal {
        let instants = points
            .iter()
            .map(|(v, t)| TInstant::new(TValue::Float(*v), ts(*t)))
            .collect();
        Temporal::Sequence(TSequence::new(instants, Interp::Linear, true, true).unwrap())
    }

    #[test]
    fn test_average_of_overlapping_sequences() {
        let mut state = TAvgState::new();
        state.accumulate(&linear(&[(10.0, 0), (10.0, 10)])).unwrap();
        state.accumulate(&linear(&[(20.0, 0), (20.0, 10)])).unwrap();
        let avg = state.finalize().unwrap().unwrap();
        assert_eq!(avg.value_at(ts(5), true), Some(TValue::Float(15.0)));
    }

    #[test]
    fn test_disjoint_contributions_pass_through() {
        let mut state = TAvgState::new();
        state.accumulate(&linear(&[(10.0, 0), (10.0, 10)])).unwrap();
        state.accumulate(&linear(&[(30.0, 20), (30.0, 30)])).unwrap();
        let avg = state.finalize().unwrap().unwrap();
        assert_eq!(avg.value_at(ts(5), true), Some(TValue::Float(10.0)));
        assert_eq!(avg.value_at(ts(25), true), Some(TValue::Float(30.0)));
        assert_eq!(avg.value_at(ts(15), true), None);
    }

    #[test]
    fn test_partial_overlap_counts_per_region() {
        let mut state = TAvgState::new();
        state.accumulate(&linear(&[(10.0, 0), (10.0, 20)])).unwrap();
        state.accumulate(&linear(&[(20.0, 10), (20.0, 30)])).unwrap();
        let avg = state.finalize().unwrap().unwrap();
        assert_eq!(avg.value_at(ts(5), true), Some(TValue::Float(10.0)));
        assert_eq!(avg.value_at(ts(15), true), Some(TValue::Float(15.0)));
        assert_eq!(avg.value_at(ts(25), true), Some(TValue::Float(20.0)));
    }

    #[test]
    fn test_instant_group_average() {
        let mut state = TAvgState::new();
        state
            .accumulate(&Temporal::Instant(TInstant::new(TValue::Int(4), ts(0))))
            .unwrap();
        state
            .accumulate(&Temporal::Instant(TInstant::new(TValue::Int(8), ts(0))))
            .unwrap();
        let avg = state.finalize().unwrap().unwrap();
        assert_eq!(avg.value_at(ts(0), true), Some(TValue::Float(6.0)));
    }

    #[test]
    fn test_combine_matches_sequential_accumulation() {
        let a = linear(&[(10.0, 0), (10.0, 10)]);
        let b = linear(&[(20.0, 0), (20.0, 10)]);

        let mut sequential = TAvgState::new();
        sequential.accumulate(&a).unwrap();
        sequential.accumulate(&b).unwrap();

        let mut left = TAvgState::new();
        left.accumulate(&a).unwrap();
        let mut right = TAvgState::new();
        right.accumulate(&b).unwrap();
        left.combine(right).unwrap();

        assert_eq!(
            sequential.finalize().unwrap(),
            left.finalize().unwrap()
        );
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let mut state = TAvgState::new();
        state
            .accumulate(&Temporal::Instant(TInstant::new(TValue::Int(1), ts(0))))
            .unwrap();
        let err = state.accumulate(&linear(&[(1.0, 0), (1.0, 10)]));
        assert!(matches!(err, Err(TempoError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let mut state = TAvgState::new();
        let err = state.accumulate(&Temporal::Instant(TInstant::new(
            TValue::Text("x".into()),
            ts(0),
        )));
        assert!(matches!(err, Err(TempoError::DomainMismatch { .. })));
    }
}
