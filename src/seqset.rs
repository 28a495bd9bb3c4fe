//! Time-disjoint collections of sequences, representing values with gaps.
//!
//! The sequence set is where the delicate algorithms live: binary-search
//! location, the merge-walk behind period-set restriction and
//! synchronization, splice/append, and the insert/delete family with its
//! gap-bridging policy. Component sequences are kept sorted; construction
//! optionally normalizes by fusing adjacent, boundary-compatible neighbors.

use crate::bbox::TBox;
use crate::error::{Result, TempoError};
use crate::instant::TInstant;
use crate::sequence::{normalize_runs, Appended, Interp, TSequence};
use crate::span::{Period, Span};
use crate::spanset::{PeriodSet, SpanSet};
use crate::time::{TimeDelta, Timestamp};
use crate::value::{TValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TSequenceSet {
    interp: Interp,
    sequences: Vec<TSequence>,
    bbox: TBox,
}

impl TSequenceSet {
    /// Build a set from time-ordered, pairwise disjoint sequences sharing
    /// one interpolation and value kind. With `normalize`, adjacent
    /// sequences whose shared boundary carries an equal value are fused.
    pub fn new(sequences: Vec<TSequence>, normalize: bool) -> Result<Self> {
        if sequences.is_empty() {
            return Err(TempoError::InvalidArgument(
                "sequence set requires at least one sequence".into(),
            ));
        }
        let interp = sequences[0].interp();
        if interp == Interp::Discrete {
            return Err(TempoError::InvalidArgument(
                "sequence sets hold continuous sequences, not discrete ones".into(),
            ));
        }
        let kind = sequences[0].value_kind();
        for seq in &sequences[1..] {
            if seq.interp() != interp {
                return Err(TempoError::InvalidArgument(format!(
                    "mixed interpolation in sequence set: {} and {}",
                    interp,
                    seq.interp()
                )));
            }
            if seq.value_kind() != kind {
                return Err(TempoError::DomainMismatch {
                    expected: kind.name(),
                    actual: seq.value_kind().name(),
                });
            }
        }
        for pair in sequences.windows(2) {
            if !pair[0].period().left_of(&pair[1].period()) {
                return Err(TempoError::InvalidArgument(format!(
                    "sequences overlap in time: {} and {}",
                    pair[0].period(),
                    pair[1].period()
                )));
            }
        }
        let sequences = if normalize {
            normalize_runs(sequences)
        } else {
            sequences
        };
        let mut bbox = sequences[0].bbox().clone();
        for seq in &sequences[1..] {
            bbox.expand(seq.bbox());
        }
        Ok(TSequenceSet {
            interp,
            sequences,
            bbox,
        })
    }

    pub fn from_sequence(seq: TSequence) -> Result<Self> {
        TSequenceSet::new(vec![seq], false)
    }

    /// Group a flat instant stream into sequences, starting a new sequence
    /// whenever consecutive instants are separated by more than the given
    /// time gap or value distance.
    pub fn from_instants_with_gaps(
        instants: Vec<TInstant>,
        interp: Interp,
        max_dist: Option<f64>,
        max_gap: Option<TimeDelta>,
    ) -> Result<Self> {
        if instants.is_empty() {
            return Err(TempoError::InvalidArgument(
                "instant stream must not be empty".into(),
            ));
        }
        let mut groups: Vec<Vec<TInstant>> = vec![Vec::new()];
        for inst in instants {
            let current = groups.last_mut().unwrap_or_else(|| unreachable!());
            if let Some(prev) = current.last() {
                let gap_exceeded = max_gap.is_some_and(|g| inst.t - prev.t > g);
                let dist_exceeded = max_dist
                    .is_some_and(|d| prev.value.distance(&inst.value).is_some_and(|x| x > d));
                if gap_exceeded || dist_exceeded {
                    groups.push(Vec::new());
                }
            }
            groups
                .last_mut()
                .unwrap_or_else(|| unreachable!())
                .push(inst);
        }
        let sequences = groups
            .into_iter()
            .map(|g| TSequence::new(g, interp, true, true))
            .collect::<Result<Vec<_>>>()?;
        TSequenceSet::new(sequences, false)
    }

    /// A constant value over each period of the set.
    pub fn from_base(value: TValue, periods: &PeriodSet, interp: Interp) -> Result<Self> {
        let sequences = periods
            .spans()
            .iter()
            .map(|p| TSequence::from_base(value.clone(), p, interp))
            .collect::<Result<Vec<_>>>()?;
        TSequenceSet::new(sequences, false)
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    pub fn sequences(&self) -> &[TSequence] {
        &self.sequences
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn seq_n(&self, n: usize) -> Option<&TSequence> {
        self.sequences.get(n)
    }

    pub fn num_instants(&self) -> usize {
        self.sequences.iter().map(TSequence::num_instants).sum()
    }

    pub fn instants(&self) -> impl Iterator<Item = &TInstant> {
        self.sequences.iter().flat_map(|s| s.instants().iter())
    }

    pub fn bbox(&self) -> &TBox {
        &self.bbox
    }

    pub fn value_kind(&self) -> ValueKind {
        self.sequences[0].value_kind()
    }

    pub fn start_timestamp(&self) -> Timestamp {
        self.sequences[0].start_timestamp()
    }

    pub fn end_timestamp(&self) -> Timestamp {
        self.sequences[self.sequences.len() - 1].end_timestamp()
    }

    pub fn start_value(&self) -> &TValue {
        self.sequences[0].start_value()
    }

    pub fn end_value(&self) -> &TValue {
        self.sequences[self.sequences.len() - 1].end_value()
    }

    /// The tightest single period covering every sequence, gaps included.
    pub fn period(&self) -> Period {
        let first = self.sequences[0].period();
        let last = self.sequences[self.sequences.len() - 1].period();
        Span {
            lower: first.lower,
            upper: last.upper,
            lower_inc: first.lower_inc,
            upper_inc: last.upper_inc,
        }
    }

    /// The exact time domain, gaps excluded.
    pub fn time_span_set(&self) -> PeriodSet {
        PeriodSet::from_spans(self.sequences.iter().map(|s| s.period()).collect())
    }

    /// Total duration over the actual domain.
    pub fn duration(&self) -> TimeDelta {
        self.sequences
            .iter()
            .fold(TimeDelta::ZERO, |acc, s| acc + s.duration())
    }

    /// Distinct instant timestamps in increasing order.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        let mut out: Vec<Timestamp> = self.instants().map(|i| i.t).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn num_timestamps(&self) -> usize {
        self.timestamps().len()
    }

    pub fn distinct_values(&self) -> Vec<TValue> {
        let mut out: Vec<TValue> = Vec::new();
        for inst in self.instants() {
            if !out.contains(&inst.value) {
                out.push(inst.value.clone());
            }
        }
        out
    }

    pub fn min_value(&self) -> &TValue {
        self.instants()
            .map(|i| &i.value)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or_else(|| unreachable!())
    }

    pub fn max_value(&self) -> &TValue {
        self.instants()
            .map(|i| &i.value)
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or_else(|| unreachable!())
    }

    /// The instant carrying the smallest value, earliest on ties.
    pub fn min_instant(&self) -> &TInstant {
        self.instants()
            .min_by(|a, b| a.value.total_cmp(&b.value))
            .unwrap_or_else(|| unreachable!())
    }

    /// The instant carrying the largest value, earliest on ties.
    pub fn max_instant(&self) -> &TInstant {
        let mut iter = self.instants();
        let mut best = iter.next().unwrap_or_else(|| unreachable!());
        for inst in iter {
            if inst.value.total_cmp(&best.value) == Ordering::Greater {
                best = inst;
            }
        }
        best
    }

    /// Binary-search for the sequence whose span contains `t`.
    ///
    /// Follows the span-set location contract: on a miss, the returned index
    /// is the first sequence that starts at or after `t`.
    pub fn find_timestamp(&self, t: Timestamp) -> (bool, usize) {
        let mut lo = 0usize;
        let mut hi = self.sequences.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let p = self.sequences[mid].period();
            if p.contains_point(t) {
                return (true, mid);
            }
            if t > p.lower {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        (false, lo)
    }

    /// Evaluate the value at `t`.
    ///
    /// The non-strict variant first checks every sequence's boundary
    /// instants directly, which short-circuits the common case of hitting a
    /// segment boundary; strict mode goes straight through the binary-search
    /// location.
    pub fn value_at(&self, t: Timestamp, strict: bool) -> Option<TValue> {
        if !strict {
            for seq in &self.sequences {
                if seq.start_timestamp() > t {
                    break;
                }
                if seq.start_timestamp() == t {
                    return Some(seq.start_value().clone());
                }
                if seq.end_timestamp() == t {
                    return Some(seq.end_value().clone());
                }
            }
        }
        let (found, idx) = self.find_timestamp(t);
        if !found {
            return None;
        }
        self.sequences[idx].value_at(t, strict)
    }

    pub fn at_timestamp(&self, t: Timestamp) -> Option<TInstant> {
        self.value_at(t, true).map(|v| TInstant::new(v, t))
    }

    pub fn at_timestamp_set(&self, times: &[Timestamp]) -> Vec<TInstant> {
        times.iter().filter_map(|&t| self.at_timestamp(t)).collect()
    }

    pub fn minus_timestamp(&self, t: Timestamp) -> Option<TSequenceSet> {
        self.minus_period_set(&PeriodSet::from_spans(vec![Period::singleton(t)]))
    }

    pub fn minus_timestamp_set(&self, times: &[Timestamp]) -> Option<TSequenceSet> {
        let spans = times.iter().map(|&t| Period::singleton(t)).collect();
        self.minus_period_set(&PeriodSet::from_spans(spans))
    }

    /// Restrict to a single period.
    pub fn at_period(&self, period: &Period) -> Option<TSequenceSet> {
        if !self.bbox.overlaps_period(period) {
            return None;
        }
        if self.sequences.len() == 1 {
            let seq = self.sequences[0].at_period(period)?;
            return TSequenceSet::from_sequence(seq).ok();
        }
        let (_, start) = self.find_timestamp(period.lower);
        let mut out = Vec::new();
        for seq in &self.sequences[start..] {
            if period.left_of(&seq.period()) {
                break;
            }
            if let Some(r) = seq.at_period(period) {
                out.push(r);
            }
        }
        TSequenceSet::new(out, false).ok()
    }

    /// Restrict to a period set with a forward merge-walk over both lists.
    ///
    /// Cursor rule at each step, comparing sequence upper against region
    /// upper: equal with the same inclusivity advances both; otherwise the
    /// side that ends first advances, an exclusive bound counting as ending
    /// before an inclusive one at the same point.
    pub fn at_period_set(&self, periods: &PeriodSet) -> Option<TSequenceSet> {
        let span = periods.bounding_span()?;
        if !self.bbox.overlaps_period(&span) {
            return None;
        }
        if self.sequences.len() == 1 {
            let seqs = self.sequences[0].at_period_set(periods);
            return TSequenceSet::new(seqs, false).ok();
        }
        let (_, mut i) = self.find_timestamp(span.lower);
        let mut j = 0;
        let mut out = Vec::new();
        while i < self.sequences.len() && j < periods.len() {
            let seq = &self.sequences[i];
            let p = &periods.spans()[j];
            if let Some(r) = seq.at_period(p) {
                out.push(r);
            }
            let sp = seq.period();
            match sp.upper.cmp(&p.upper) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if sp.upper_inc == p.upper_inc {
                        i += 1;
                        j += 1;
                    } else if p.upper_inc {
                        i += 1;
                    } else {
                        j += 1;
                    }
                }
            }
        }
        TSequenceSet::new(out, false).ok()
    }

    /// Complement restriction: subtract the covered time domain from the own
    /// domain, then re-apply `at` with the complement.
    pub fn minus_period(&self, period: &Period) -> Option<TSequenceSet> {
        self.minus_period_set(&PeriodSet::from_spans(vec![*period]))
    }

    pub fn minus_period_set(&self, periods: &PeriodSet) -> Option<TSequenceSet> {
        let complement = self.time_span_set().minus(periods);
        if complement.is_empty() {
            return None;
        }
        self.at_period_set(&complement)
    }

    fn check_value_domain(&self, value: &TValue) -> Result<()> {
        let kind = self.value_kind();
        if value.kind() != kind {
            return Err(TempoError::DomainMismatch {
                expected: kind.name(),
                actual: value.kind().name(),
            });
        }
        Ok(())
    }

    fn collect_value_restriction<F>(&self, per_seq: F) -> Result<Option<TSequenceSet>>
    where
        F: Fn(&TSequence) -> Result<Vec<TSequence>>,
    {
        if self.sequences.len() == 1 {
            let seqs = per_seq(&self.sequences[0])?;
            return Ok(TSequenceSet::new(seqs, false).ok());
        }
        let mut out = Vec::new();
        for seq in &self.sequences {
            out.extend(per_seq(seq)?);
        }
        Ok(TSequenceSet::new(out, false).ok())
    }

    pub fn at_value(&self, value: &TValue) -> Result<Option<TSequenceSet>> {
        self.check_value_domain(value)?;
        if !self.bbox.may_contain_value(value) {
            return Ok(None);
        }
        self.collect_value_restriction(|s| s.at_value(value))
    }

    pub fn at_value_set(&self, values: &[TValue]) -> Result<Option<TSequenceSet>> {
        for v in values {
            self.check_value_domain(v)?;
        }
        self.collect_value_restriction(|s| s.at_value_set(values))
    }

    pub fn at_value_span(&self, span: &Span<f64>) -> Result<Option<TSequenceSet>> {
        if !self.bbox.may_overlap_value_span(span) {
            return Ok(None);
        }
        self.collect_value_restriction(|s| s.at_value_span(span))
    }

    pub fn at_value_span_set(&self, spans: &SpanSet<f64>) -> Result<Option<TSequenceSet>> {
        if !spans
            .spans()
            .iter()
            .any(|span| self.bbox.may_overlap_value_span(span))
        {
            return Ok(None);
        }
        self.collect_value_restriction(|s| s.at_value_span_set(spans))
    }

    fn minus_covered(&self, at: Option<TSequenceSet>) -> Option<TSequenceSet> {
        match at {
            Some(at) => self.minus_period_set(&at.time_span_set()),
            None => Some(self.clone()),
        }
    }

    pub fn minus_value(&self, value: &TValue) -> Result<Option<TSequenceSet>> {
        let at = self.at_value(value)?;
        Ok(self.minus_covered(at))
    }

    pub fn minus_value_set(&self, values: &[TValue]) -> Result<Option<TSequenceSet>> {
        let at = self.at_value_set(values)?;
        Ok(self.minus_covered(at))
    }

    pub fn minus_value_span(&self, span: &Span<f64>) -> Result<Option<TSequenceSet>> {
        let at = self.at_value_span(span)?;
        Ok(self.minus_covered(at))
    }

    pub fn minus_value_span_set(&self, spans: &SpanSet<f64>) -> Result<Option<TSequenceSet>> {
        let at = self.at_value_span_set(spans)?;
        Ok(self.minus_covered(at))
    }

    pub fn ever_eq(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        if !self.bbox.may_contain_value(value) {
            return Ok(false);
        }
        for seq in &self.sequences {
            if seq.ever_eq(value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn always_eq(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        for seq in &self.sequences {
            if !seq.always_eq(value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn overlaps_timestamp(&self, t: Timestamp) -> bool {
        self.find_timestamp(t).0
    }

    pub fn overlaps_timestamp_set(&self, times: &[Timestamp]) -> bool {
        times.iter().any(|&t| self.overlaps_timestamp(t))
    }

    pub fn overlaps_period(&self, period: &Period) -> bool {
        self.time_span_set().overlaps_span(period)
    }

    pub fn overlaps_period_set(&self, periods: &PeriodSet) -> bool {
        periods
            .spans()
            .iter()
            .any(|span| self.overlaps_period(span))
    }

    pub fn overlaps_tbox(&self, other: &TBox) -> bool {
        self.bbox.overlaps(other)
    }

    /// Time-align two sets over their overlapping domain, pairing sequences
    /// with the same merge-walk used by restriction. With `cross`, exact
    /// crossing instants of linear segment pairs are inserted.
    pub fn synchronize(
        &self,
        other: &TSequenceSet,
        cross: bool,
    ) -> Option<(TSequenceSet, TSequenceSet)> {
        if !self.bbox.overlaps_period(&other.period()) {
            return None;
        }
        let mut i = 0;
        let mut j = 0;
        let mut left = Vec::new();
        let mut right = Vec::new();
        while i < self.sequences.len() && j < other.sequences.len() {
            let a = &self.sequences[i];
            let b = &other.sequences[j];
            if let Some((sa, sb)) = a.synchronize(b, cross) {
                left.push(sa);
                right.push(sb);
            }
            let pa = a.period();
            let pb = b.period();
            match pa.upper.cmp(&pb.upper) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if pa.upper_inc == pb.upper_inc {
                        i += 1;
                        j += 1;
                    } else if pb.upper_inc {
                        i += 1;
                    } else {
                        j += 1;
                    }
                }
            }
        }
        let left = TSequenceSet::new(left, false).ok()?;
        let right = TSequenceSet::new(right, false).ok()?;
        Some((left, right))
    }

    /// Merge with another set whose sequences are time-disjoint from this
    /// one, except possibly sharing single boundary instants with equal
    /// values.
    pub fn merge(&self, other: &TSequenceSet) -> Result<TSequenceSet> {
        TSequenceSet::merge_array(&[self, other])
    }

    pub fn merge_array(sets: &[&TSequenceSet]) -> Result<TSequenceSet> {
        let Some(first) = sets.first() else {
            return Err(TempoError::InvalidArgument(
                "merge requires at least one sequence set".into(),
            ));
        };
        let interp = first.interp;
        let mut all: Vec<TSequence> = Vec::new();
        for set in sets {
            if set.interp != interp {
                return Err(TempoError::InvalidArgument(format!(
                    "cannot merge {} and {} interpolation",
                    interp, set.interp
                )));
            }
            all.extend(set.sequences.iter().cloned());
        }
        all.sort_by(|a, b| a.period().cmp_spans(&b.period()));
        for pair in all.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.period().left_of(&b.period()) {
                continue;
            }
            // the only tolerated contact is one shared boundary instant
            let shared = a.end_timestamp() == b.start_timestamp()
                && a.upper_inc()
                && b.lower_inc()
                && a.period().upper == b.period().lower;
            if !shared {
                return Err(TempoError::InvalidArgument(format!(
                    "merged sequences overlap in time: {} and {}",
                    a.period(),
                    b.period()
                )));
            }
            if a.end_value() != b.start_value() {
                return Err(TempoError::ValueConflict {
                    at: a.end_timestamp(),
                });
            }
        }
        TSequenceSet::new(normalize_runs(all), false)
    }

    /// Append one instant, delegating to the last sequence and absorbing a
    /// possible two-piece split.
    pub fn append_instant(
        &self,
        instant: TInstant,
        max_dist: Option<f64>,
        max_gap: Option<TimeDelta>,
    ) -> Result<TSequenceSet> {
        let mut sequences = self.sequences.clone();
        let last = sequences.pop().unwrap_or_else(|| unreachable!());
        match last.append(instant, max_dist, max_gap)? {
            Appended::Extended(seq) => sequences.push(seq),
            Appended::Split(a, b) => {
                sequences.push(a);
                sequences.push(b);
            }
        }
        TSequenceSet::new(sequences, false)
    }

    /// Append a whole sequence, fusing with the tail when join-compatible.
    pub fn append_sequence(&self, seq: TSequence) -> Result<TSequenceSet> {
        if seq.interp() != self.interp {
            return Err(TempoError::InvalidArgument(format!(
                "cannot append a {} sequence to a {} set",
                seq.interp(),
                self.interp
            )));
        }
        self.check_value_domain(seq.start_value())?;
        let last = &self.sequences[self.sequences.len() - 1];
        let lp = last.period();
        let np = seq.period();
        if np.lower < lp.upper || (np.lower == lp.upper && lp.upper_inc && np.lower_inc) {
            // a single shared boundary instant is fine when values agree
            let shared = np.lower == lp.upper
                && lp.upper_inc
                && np.lower_inc
                && last.end_timestamp() == seq.start_timestamp();
            if !shared || np.lower < lp.upper {
                return Err(TempoError::InvalidArgument(format!(
                    "appended sequence starting {} overlaps set ending {}",
                    np.lower, lp.upper
                )));
            }
            if last.end_value() != seq.start_value() {
                return Err(TempoError::ValueConflict {
                    at: seq.start_timestamp(),
                });
            }
        }
        let mut sequences = self.sequences.clone();
        sequences.push(seq);
        TSequenceSet::new(normalize_runs(sequences), false)
    }

    /// Splice another set's timeline into this one. Time gaps opened between
    /// pieces of different origin are closed with a minimal bridging
    /// sequence; disagreement at a shared instant is a consistency error.
    pub fn insert(&self, other: &TSequenceSet) -> Result<TSequenceSet> {
        if other.interp != self.interp {
            return Err(TempoError::InvalidArgument(format!(
                "cannot insert a {} set into a {} set",
                other.interp, self.interp
            )));
        }
        self.check_value_domain(other.start_value())?;
        // values must agree wherever both domains attain one
        for inst in self.instants().chain(other.instants()) {
            if let Some(own) = self.value_at(inst.t, true)
                && let Some(theirs) = other.value_at(inst.t, true)
                && own != theirs
            {
                return Err(TempoError::ValueConflict { at: inst.t });
            }
        }
        let mut pieces: Vec<(TSequence, bool)> = self
            .sequences
            .iter()
            .cloned()
            .map(|s| (s, false))
            .collect();
        if let Some(fresh) = other.minus_period_set(&self.time_span_set()) {
            pieces.extend(fresh.sequences.into_iter().map(|s| (s, true)));
        }
        pieces.sort_by(|a, b| a.0.period().cmp_spans(&b.0.period()));
        let mut out: Vec<TSequence> = Vec::with_capacity(pieces.len());
        let mut last_origin = None;
        for (seq, origin) in pieces {
            if let Some(prev) = out.last()
                && last_origin != Some(origin)
                && let Some(bridge) = bridge_gap(prev, &seq, self.interp)
            {
                out.push(bridge);
            }
            out.push(seq);
            last_origin = Some(origin);
        }
        TSequenceSet::new(out, true)
    }

    /// Replace this set's value over `other`'s time domain with `other`.
    pub fn update(&self, other: &TSequenceSet) -> Result<TSequenceSet> {
        match self.minus_period_set(&other.time_span_set()) {
            Some(rest) => rest.insert(other),
            None => Ok(other.clone()),
        }
    }

    /// Remove the instant at `t`, keeping its sequence connected.
    pub fn delete_timestamp(&self, t: Timestamp) -> Option<TSequenceSet> {
        let (found, idx) = self.find_timestamp(t);
        if !found {
            return Some(self.clone());
        }
        let seq = &self.sequences[idx];
        let Ok(pos) = seq.instants().binary_search_by(|i| i.t.cmp(&t)) else {
            // not a stored instant: connecting over it changes nothing
            return Some(self.clone());
        };
        let mut sequences = self.sequences.clone();
        let mut instants = seq.instants().to_vec();
        instants.remove(pos);
        if instants.is_empty() {
            sequences.remove(idx);
        } else {
            let (lower_inc, upper_inc) = if instants.len() == 1 {
                (true, true)
            } else {
                (
                    if pos == 0 { true } else { seq.lower_inc() },
                    if pos == instants.len() { true } else { seq.upper_inc() },
                )
            };
            sequences[idx] = TSequence::new(instants, self.interp, lower_inc, upper_inc).ok()?;
        }
        if sequences.is_empty() {
            None
        } else {
            TSequenceSet::new(sequences, false).ok()
        }
    }

    pub fn delete_timestamp_set(&self, times: &[Timestamp]) -> Option<TSequenceSet> {
        let mut current = self.clone();
        for &t in times {
            current = current.delete_timestamp(t)?;
        }
        Some(current)
    }

    /// Remove a time stretch and bridge the gap it opened, so pieces that
    /// were contiguous before the deletion stay joined.
    pub fn delete_period(&self, period: &Period) -> Option<TSequenceSet> {
        self.delete_period_set(&PeriodSet::from_spans(vec![*period]))
    }

    pub fn delete_period_set(&self, periods: &PeriodSet) -> Option<TSequenceSet> {
        let remaining = self.minus_period_set(periods)?;
        let mut out: Vec<TSequence> = Vec::with_capacity(remaining.sequences.len());
        for seq in remaining.sequences {
            if let Some(prev) = out.last() {
                let gap = Span::new(
                    prev.end_timestamp(),
                    seq.start_timestamp(),
                    !prev.upper_inc(),
                    !seq.lower_inc(),
                );
                let carved = gap.is_ok_and(|g| periods.overlaps_span(&g));
                if carved && let Some(bridge) = bridge_gap(prev, &seq, self.interp) {
                    out.push(bridge);
                }
            }
            out.push(seq);
        }
        TSequenceSet::new(out, true).ok()
    }

    /// The single component sequence, when there is exactly one.
    pub fn to_sequence(&self) -> Result<TSequence> {
        if self.sequences.len() == 1 {
            Ok(self.sequences[0].clone())
        } else {
            Err(TempoError::UnsupportedConversion(format!(
                "sequence set with {} components to a single sequence",
                self.sequences.len()
            )))
        }
    }

    /// A discrete sequence, when every component is instantaneous.
    pub fn to_discrete(&self) -> Result<TSequence> {
        let mut instants = Vec::with_capacity(self.sequences.len());
        for seq in &self.sequences {
            if seq.num_instants() != 1 {
                return Err(TempoError::UnsupportedConversion(
                    "non-instantaneous sequence set to discrete".into(),
                ));
            }
            instants.push(seq.instants()[0].clone());
        }
        TSequence::new(instants, Interp::Discrete, true, true)
    }

    /// Reinterpret stepwise data under linear interpolation by splitting
    /// every jump into constant linear pieces.
    pub fn with_interp(&self, interp: Interp) -> Result<TSequenceSet> {
        if interp == self.interp {
            return Ok(self.clone());
        }
        match (self.interp, interp) {
            (Interp::Stepwise, Interp::Linear) => {
                if !self.value_kind().is_continuous() {
                    return Err(TempoError::UnsupportedConversion(format!(
                        "stepwise {} set to linear interpolation",
                        self.value_kind()
                    )));
                }
                let mut out = Vec::new();
                for seq in &self.sequences {
                    out.extend(step_seq_to_linear(seq)?);
                }
                TSequenceSet::new(out, false)
            }
            _ => Err(TempoError::UnsupportedConversion(format!(
                "{} sequence set to {} interpolation",
                self.interp, interp
            ))),
        }
    }

    pub fn shift(&self, delta: TimeDelta) -> TSequenceSet {
        let sequences: Vec<TSequence> =
            self.sequences.iter().map(|s| s.shift(delta)).collect();
        let mut bbox = self.bbox.clone();
        bbox.period = bbox.period.shift(delta);
        TSequenceSet {
            interp: self.interp,
            sequences,
            bbox,
        }
    }

    /// Rescale the whole set so its covering period has `new_duration`,
    /// keeping the start fixed and all instant spacing proportional.
    pub fn scale(&self, new_duration: TimeDelta) -> Result<TSequenceSet> {
        if !new_duration.is_positive() {
            return Err(TempoError::InvalidArgument(format!(
                "set duration must be positive, got {new_duration}"
            )));
        }
        let start = self.start_timestamp();
        let old = (self.end_timestamp() - start).as_micros();
        if old == 0 {
            return Ok(self.clone());
        }
        let new = new_duration.as_micros();
        let remap = |t: Timestamp| {
            let offset = (t - start).as_micros() as i128 * new as i128 / old as i128;
            start + TimeDelta::from_micros(offset as i64)
        };
        let sequences = self
            .sequences
            .iter()
            .map(|s| {
                let instants = s
                    .instants()
                    .iter()
                    .map(|i| TInstant::new(i.value.clone(), remap(i.t)))
                    .collect();
                TSequence::new(instants, s.interp(), s.lower_inc(), s.upper_inc())
            })
            .collect::<Result<Vec<_>>>()?;
        TSequenceSet::new(sequences, false)
    }

    /// Shift then rescale in one step.
    pub fn shift_scale(&self, delta: TimeDelta, new_duration: TimeDelta) -> Result<TSequenceSet> {
        self.shift(delta).scale(new_duration)
    }

    /// Cast integer values to floats, keeping shape and interpolation.
    pub fn to_float(&self) -> Result<TSequenceSet> {
        let sequences = self
            .sequences
            .iter()
            .map(TSequence::to_float)
            .collect::<Result<Vec<_>>>()?;
        TSequenceSet::new(sequences, false)
    }

    /// Cast float values to integers by rounding; rejected under linear
    /// interpolation.
    pub fn to_int(&self) -> Result<TSequenceSet> {
        let sequences = self
            .sequences
            .iter()
            .map(TSequence::to_int)
            .collect::<Result<Vec<_>>>()?;
        TSequenceSet::new(sequences, true)
    }

    /// Area under the piecewise curve, summed per sequence.
    pub fn integral(&self) -> Result<f64> {
        let mut total = 0.0;
        for seq in &self.sequences {
            total += seq.integral()?;
        }
        Ok(total)
    }

    /// Time-weighted average over the actual domain. When every component is
    /// instantaneous, falls back to the arithmetic mean of the per-sequence
    /// averages.
    pub fn time_weighted_average(&self) -> Result<f64> {
        let dur = self.duration().as_secs_f64();
        if dur == 0.0 {
            let mut sum = 0.0;
            for seq in &self.sequences {
                sum += seq.time_weighted_average()?;
            }
            return Ok(sum / self.sequences.len() as f64);
        }
        Ok(self.integral()? / dur)
    }

    /// Order-sensitive hash combining per-sequence hashes with a
    /// rotate-and-add mix.
    pub fn hash_value(&self) -> u64 {
        let mut result: u64 = 1;
        for seq in &self.sequences {
            let mut h = DefaultHasher::new();
            seq.hash(&mut h);
            let sh = h.finish();
            result = result
                .wrapping_shl(5)
                .wrapping_sub(result)
                .wrapping_add(sh);
        }
        result
    }

    pub fn format(&self, maxdd: usize) -> String {
        let prefix =
            if self.interp == Interp::Stepwise && self.value_kind().is_continuous() {
                "Interp=Step;"
            } else {
                ""
            };
        let body: Vec<String> = self
            .sequences
            .iter()
            .map(|s| {
                let rendered = s.format(maxdd);
                rendered
                    .strip_prefix("Interp=Step;")
                    .unwrap_or(&rendered)
                    .to_string()
            })
            .collect();
        format!("{}{{{}}}", prefix, body.join(", "))
    }
}

/// Minimal sequence closing the gap between two pieces. Duplicates the
/// adjoining endpoint values so stepwise and linear data both stay
/// consistent; a single-point gap gets a one-instant closed bridge carrying
/// the preceding value. `None` when the pieces are already contiguous.
fn bridge_gap(prev: &TSequence, next: &TSequence, interp: Interp) -> Option<TSequence> {
    let lower = prev.end_timestamp();
    let upper = next.start_timestamp();
    let lower_inc = !prev.upper_inc();
    let upper_inc = !next.lower_inc();
    match lower.cmp(&upper) {
        Ordering::Greater => None,
        Ordering::Equal => {
            if lower_inc && upper_inc {
                Some(TSequence::from_instant(
                    TInstant::new(prev.end_value().clone(), lower),
                    interp,
                ))
            } else {
                None
            }
        }
        Ordering::Less => {
            let end_value = match interp {
                Interp::Stepwise => prev.end_value().clone(),
                _ => next.start_value().clone(),
            };
            TSequence::new(
                vec![
                    TInstant::new(prev.end_value().clone(), lower),
                    TInstant::new(end_value, upper),
                ],
                interp,
                lower_inc,
                upper_inc,
            )
            .ok()
        }
    }
}

// Split one stepwise sequence into constant linear pieces.
fn step_seq_to_linear(seq: &TSequence) -> Result<Vec<TSequence>> {
    let instants = seq.instants();
    let n = instants.len();
    if n == 1 {
        return Ok(vec![TSequence::new(
            instants.to_vec(),
            Interp::Linear,
            true,
            true,
        )?]);
    }
    let mut out = Vec::new();
    for k in 0..n - 1 {
        let a = &instants[k];
        let b = &instants[k + 1];
        let lower_inc = if k == 0 { seq.lower_inc() } else { true };
        let constant = a.value == b.value;
        let last = k == n - 2;
        let upper_inc = last && constant && seq.upper_inc();
        out.push(TSequence::new(
            vec![
                a.clone(),
                TInstant::new(a.value.clone(), b.t),
            ],
            Interp::Linear,
            lower_inc,
            upper_inc,
        )?);
        if last && !constant && seq.upper_inc() {
            out.push(TSequence::from_instant(b.clone(), Interp::Linear));
        }
    }
    Ok(normalize_runs(out))
}

impl PartialEq for TSequenceSet {
    fn eq(&self, other: &Self) -> bool {
        // cheap checks first
        self.interp == other.interp
            && self.sequences.len() == other.sequences.len()
            && self.bbox == other.bbox
            && self.sequences == other.sequences
    }
}

impl Eq for TSequenceSet {}

impl Ord for TSequenceSet {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.sequences.iter().zip(other.sequences.iter()) {
            let c = a.cmp(b);
            if c != Ordering::Equal {
                return c;
            }
        }
        self.sequences.len().cmp(&other.sequences.len())
    }
}

impl PartialOrd for TSequenceSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for TSequenceSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl fmt::Display for TSequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(12))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: i64) -> Timestamp {
        Timestamp::from_secs(s)
    }

    fn inst(v: i64, t: i64) -> TInstant {
        TInstant::new(TValue::Int(v), ts(t))
    }

    fn finst(v: f64, t: i64) -> TInstant {
        TInstant::new(TValue::Float(v), ts(t))
    }

    fn step_seq(pairs: &[(i64, i64)], lower_inc: bool, upper_inc: bool) -> TSequence {
        let instants = pairs.iter().map(|&(v, t)| inst(v, t)).collect();
        TSequence::new(instants, Interp::Stepwise, lower_inc, upper_inc).unwrap()
    }

    fn period(lo: i64, hi: i64, li: bool, ui: bool) -> Period {
        Span::new(ts(lo), ts(hi), li, ui).unwrap()
    }

    /// The two-piece stepwise set used throughout:
    /// {[1@0, 1@10], [2@20, 2@30]}
    fn sample_set() -> TSequenceSet {
        TSequenceSet::new(
            vec![
                step_seq(&[(1, 0), (1, 10)], true, true),
                step_seq(&[(2, 20), (2, 30)], true, true),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_overlap_and_mixed_kinds() {
        let a = step_seq(&[(1, 0), (1, 10)], true, true);
        let b = step_seq(&[(2, 5), (2, 15)], true, true);
        assert!(TSequenceSet::new(vec![a.clone(), b], false).is_err());
        let float = TSequence::new(
            vec![TInstant::new(TValue::Float(1.0), ts(20))],
            Interp::Stepwise,
            true,
            true,
        )
        .unwrap();
        assert!(matches!(
            TSequenceSet::new(vec![a, float], false),
            Err(TempoError::DomainMismatch { .. })
        ));
    }

    #[test]
    fn test_make_preserves_input_order_and_values() {
        let set = sample_set();
        assert_eq!(set.num_sequences(), 2);
        assert_eq!(set.sequences()[0].start_value(), &TValue::Int(1));
        assert_eq!(set.sequences()[1].start_value(), &TValue::Int(2));
    }

    #[test]
    fn test_make_normalize_fuses_compatible_boundary() {
        let a = step_seq(&[(1, 0), (1, 10)], true, false);
        let b = step_seq(&[(1, 10), (1, 20)], true, true);
        let set = TSequenceSet::new(vec![a, b], true).unwrap();
        assert_eq!(set.num_sequences(), 1);
        assert_eq!(set.sequences()[0].period(), period(0, 20, true, true));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let set = sample_set();
        let again = TSequenceSet::new(set.sequences().to_vec(), true).unwrap();
        assert_eq!(set, again);
    }

    #[test]
    fn test_find_timestamp_contract() {
        let set = sample_set();
        assert_eq!(set.find_timestamp(ts(5)), (true, 0));
        assert_eq!(set.find_timestamp(ts(20)), (true, 1));
        // strictly between the two sequences
        assert_eq!(set.find_timestamp(ts(15)), (false, 1));
        assert_eq!(set.find_timestamp(ts(-1)), (false, 0));
        assert_eq!(set.find_timestamp(ts(99)), (false, 2));
    }

    #[test]
    fn test_value_at() {
        let set = sample_set();
        assert_eq!(set.value_at(ts(5), true), Some(TValue::Int(1)));
        assert_eq!(set.value_at(ts(25), true), Some(TValue::Int(2)));
        assert_eq!(set.value_at(ts(15), true), None);
        // non-strict boundary fast path
        assert_eq!(set.value_at(ts(20), false), Some(TValue::Int(2)));
    }

    #[test]
    fn test_at_period_scenario() {
        let set = sample_set();
        let r = set.at_period(&period(5, 25, true, true)).unwrap();
        assert_eq!(r.num_sequences(), 2);
        assert_eq!(r.sequences()[0].instants(), &[inst(1, 5), inst(1, 10)]);
        assert_eq!(r.sequences()[1].instants(), &[inst(2, 20), inst(2, 25)]);
    }

    #[test]
    fn test_minus_period_scenario() {
        let set = sample_set();
        let r = set.minus_period(&period(5, 25, true, true)).unwrap();
        assert_eq!(r.num_sequences(), 2);
        let first = &r.sequences()[0];
        assert_eq!(first.instants(), &[inst(1, 0), inst(1, 5)]);
        assert!(!first.upper_inc());
        let second = &r.sequences()[1];
        assert_eq!(second.instants(), &[inst(2, 25), inst(2, 30)]);
        assert!(!second.lower_inc());
    }

    #[test]
    fn test_at_period_set_merge_walk() {
        let set = sample_set();
        let ps = PeriodSet::from_spans(vec![
            period(0, 5, true, true),
            period(8, 22, true, true),
            period(28, 40, true, true),
        ]);
        let r = set.at_period_set(&ps).unwrap();
        assert_eq!(r.num_sequences(), 4);
        assert_eq!(r.sequences()[0].period(), period(0, 5, true, true));
        assert_eq!(r.sequences()[1].period(), period(8, 10, true, true));
        assert_eq!(r.sequences()[2].period(), period(20, 22, true, true));
        assert_eq!(r.sequences()[3].period(), period(28, 30, true, true));
    }

    #[test]
    fn test_at_value_and_minus_value_partition_domain() {
        let set = sample_set();
        let at = set.at_value(&TValue::Int(1)).unwrap().unwrap();
        let minus = set.minus_value(&TValue::Int(1)).unwrap().unwrap();
        assert!(set
            .at_value(&TValue::Int(1))
            .unwrap()
            .unwrap()
            .minus_value(&TValue::Int(1))
            .unwrap()
            .is_none());
        let reunion = at.time_span_set().union(&minus.time_span_set());
        assert_eq!(reunion, set.time_span_set());
    }

    #[test]
    fn test_at_value_bbox_short_circuit() {
        let set = sample_set();
        assert!(set.at_value(&TValue::Int(99)).unwrap().is_none());
    }

    #[test]
    fn test_append_instant_step_value_change_splits() {
        let set = sample_set();
        let r = set.append_instant(inst(1, 40), None, None).unwrap();
        assert_eq!(r.num_sequences(), 3);
        assert_eq!(r.sequences()[2].instants(), &[inst(1, 40)]);
    }

    #[test]
    fn test_append_instant_same_value_extends() {
        let set = sample_set();
        let r = set.append_instant(inst(2, 40), None, None).unwrap();
        assert_eq!(r.num_sequences(), 2);
        let tail = &r.sequences()[1];
        assert_eq!(tail.end_timestamp(), ts(40));
        // interior instant at 30 was redundant
        assert_eq!(tail.num_instants(), 2);
    }

    #[test]
    fn test_append_sequence_fuses_when_joinable() {
        let set = sample_set();
        let tail = step_seq(&[(2, 30), (3, 40)], false, true);
        let r = set.append_sequence(tail).unwrap();
        assert_eq!(r.num_sequences(), 2);
        assert_eq!(r.end_timestamp(), ts(40));
    }

    #[test]
    fn test_append_sequence_conflict() {
        let set = sample_set();
        let tail = step_seq(&[(9, 30), (9, 40)], true, true);
        assert!(matches!(
            set.append_sequence(tail),
            Err(TempoError::ValueConflict { .. })
        ));
    }

    #[test]
    fn test_merge_disjoint_sets() {
        let a = sample_set();
        let b = TSequenceSet::from_sequence(step_seq(&[(5, 40), (5, 50)], true, true)).unwrap();
        let m = a.merge(&b).unwrap();
        assert_eq!(m.num_sequences(), 3);
        // symmetric
        assert_eq!(b.merge(&a).unwrap(), m);
    }

    #[test]
    fn test_merge_overlap_rejected() {
        let a = sample_set();
        let b = TSequenceSet::from_sequence(step_seq(&[(9, 5), (9, 15)], true, true)).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_insert_bridges_gap() {
        let a = TSequenceSet::from_sequence(step_seq(&[(1, 0), (1, 10)], true, true)).unwrap();
        let b = TSequenceSet::from_sequence(step_seq(&[(2, 20), (2, 30)], true, true)).unwrap();
        let r = a.insert(&b).unwrap();
        // domain is contiguous from 0 to 30
        assert_eq!(
            r.time_span_set(),
            PeriodSet::from_spans(vec![period(0, 30, true, true)])
        );
    }

    #[test]
    fn test_insert_conflict() {
        let a = sample_set();
        let b = TSequenceSet::from_sequence(step_seq(&[(9, 25), (9, 26)], true, true)).unwrap();
        assert!(matches!(
            a.insert(&b),
            Err(TempoError::ValueConflict { .. })
        ));
    }

    #[test]
    fn test_update_replaces_overlap() {
        let a = sample_set();
        let b = TSequenceSet::from_sequence(step_seq(&[(7, 22), (7, 28)], true, true)).unwrap();
        let r = a.update(&b).unwrap();
        assert_eq!(r.value_at(ts(25), true), Some(TValue::Int(7)));
        assert_eq!(r.value_at(ts(5), true), Some(TValue::Int(1)));
    }

    #[test]
    fn test_delete_timestamp_keeps_sequence_connected() {
        let set =
            TSequenceSet::from_sequence(step_seq(&[(1, 0), (2, 10), (3, 20)], true, true)).unwrap();
        let r = set.delete_timestamp(ts(10)).unwrap();
        assert_eq!(r.num_sequences(), 1);
        assert_eq!(r.sequences()[0].instants(), &[inst(1, 0), inst(3, 20)]);
        // value over the middle now holds 1
        assert_eq!(r.value_at(ts(15), true), Some(TValue::Int(1)));
    }

    #[test]
    fn test_delete_period_bridges_deletion_gap() {
        let set =
            TSequenceSet::from_sequence(step_seq(&[(1, 0), (1, 30)], true, true)).unwrap();
        let r = set.delete_period(&period(10, 20, false, false)).unwrap();
        assert_eq!(
            r.time_span_set(),
            PeriodSet::from_spans(vec![period(0, 30, true, true)])
        );
    }

    #[test]
    fn test_delete_period_does_not_bridge_preexisting_gap() {
        let set = sample_set();
        let r = set.delete_period(&period(0, 5, true, false)).unwrap();
        // the original gap (10, 20) stays a gap
        assert_eq!(r.num_sequences(), 2);
        assert!(r.value_at(ts(15), true).is_none());
    }

    #[test]
    fn test_synchronize_sets() {
        let a = sample_set();
        let b = TSequenceSet::from_sequence(step_seq(&[(9, 5), (9, 25)], true, true)).unwrap();
        let (sa, sb) = a.synchronize(&b, false).unwrap();
        assert_eq!(sa.time_span_set(), sb.time_span_set());
        assert_eq!(
            sa.time_span_set(),
            PeriodSet::from_spans(vec![period(5, 10, true, true), period(20, 25, true, true)])
        );
        // symmetric up to argument order
        let (sb2, sa2) = b.synchronize(&a, false).unwrap();
        assert_eq!(sa, sa2);
        assert_eq!(sb, sb2);
    }

    #[test]
    fn test_from_instants_with_gaps() {
        let instants = vec![inst(1, 0), inst(1, 5), inst(2, 60), inst(2, 65)];
        let set = TSequenceSet::from_instants_with_gaps(
            instants,
            Interp::Stepwise,
            None,
            Some(TimeDelta::from_secs(30)),
        )
        .unwrap();
        assert_eq!(set.num_sequences(), 2);
        assert_eq!(set.sequences()[0].period(), period(0, 5, true, true));
        assert_eq!(set.sequences()[1].period(), period(60, 65, true, true));
    }

    #[test]
    fn test_integral_and_twavg() {
        let set = sample_set();
        // 1 over [0,10] and 2 over [20,30]
        assert_eq!(set.integral().unwrap(), 30.0);
        assert_eq!(set.time_weighted_average().unwrap(), 1.5);
    }

    #[test]
    fn test_twavg_all_instantaneous() {
        let set = TSequenceSet::new(
            vec![
                TSequence::from_instant(inst(2, 0), Interp::Stepwise),
                TSequence::from_instant(inst(4, 10), Interp::Stepwise),
            ],
            false,
        )
        .unwrap();
        assert_eq!(set.time_weighted_average().unwrap(), 3.0);
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let a = sample_set();
        let b = TSequenceSet::new(
            vec![
                step_seq(&[(2, 0), (2, 10)], true, true),
                step_seq(&[(1, 20), (1, 30)], true, true),
            ],
            false,
        )
        .unwrap();
        assert_ne!(a.hash_value(), b.hash_value());
        assert_eq!(a.hash_value(), sample_set().hash_value());
    }

    #[test]
    fn test_ordering_lexicographic() {
        let a = sample_set();
        let b = TSequenceSet::from_sequence(step_seq(&[(1, 0), (1, 10)], true, true)).unwrap();
        // equal prefix, fewer sequences sorts first
        assert!(b < a);
    }

    #[test]
    fn test_to_discrete() {
        let set = TSequenceSet::new(
            vec![
                TSequence::from_instant(inst(1, 0), Interp::Stepwise),
                TSequence::from_instant(inst(2, 10), Interp::Stepwise),
            ],
            false,
        )
        .unwrap();
        let d = set.to_discrete().unwrap();
        assert_eq!(d.interp(), Interp::Discrete);
        assert_eq!(d.num_instants(), 2);
        assert!(sample_set().to_discrete().is_err());
    }

    #[test]
    fn test_step_to_linear() {
        let set = TSequenceSet::from_sequence(
            TSequence::new(
                vec![
                    TInstant::new(TValue::Float(1.0), ts(0)),
                    TInstant::new(TValue::Float(2.0), ts(10)),
                ],
                Interp::Stepwise,
                true,
                true,
            )
            .unwrap(),
        )
        .unwrap();
        let lin = set.with_interp(Interp::Linear).unwrap();
        assert_eq!(lin.interp(), Interp::Linear);
        assert_eq!(lin.num_sequences(), 2);
        // constant piece then the final jump point
        assert_eq!(lin.value_at(ts(5), true), Some(TValue::Float(1.0)));
        assert_eq!(lin.value_at(ts(10), true), Some(TValue::Float(2.0)));
    }

    #[test]
    fn test_format() {
        let set = sample_set();
        let us = |s: i64| ts(s).as_micros();
        assert_eq!(
            set.format(6),
            format!(
                "{{[1@{}, 1@{}], [2@{}, 2@{}]}}",
                us(0),
                us(10),
                us(20),
                us(30)
            )
        );
    }

    #[test]
    fn test_overlaps_predicates() {
        let set = sample_set();
        assert!(set.overlaps_timestamp(ts(5)));
        assert!(!set.overlaps_timestamp(ts(15)));
        assert!(set.overlaps_timestamp_set(&[ts(15), ts(25)]));
        assert!(set.overlaps_period(&period(15, 22, true, true)));
        assert!(!set.overlaps_period(&period(12, 18, true, true)));
        assert!(set.overlaps_period_set(&PeriodSet::from_spans(vec![
            period(12, 18, true, true),
            period(28, 40, true, true),
        ])));
    }

    #[test]
    fn test_counting_accessors() {
        let set = sample_set();
        assert_eq!(set.num_instants(), 4);
        assert_eq!(set.num_timestamps(), 4);
        assert_eq!(set.seq_n(1), Some(&set.sequences()[1]));
        assert_eq!(set.seq_n(2), None);
        assert_eq!(set.min_instant(), &inst(1, 0));
        assert_eq!(set.max_instant(), &inst(2, 20));
    }

    #[test]
    fn test_int_float_casts() {
        let set = sample_set();
        let f = set.to_float().unwrap();
        assert_eq!(f.value_kind(), ValueKind::Float);
        assert_eq!(f.to_int().unwrap(), set);
    }

    #[test]
    fn test_value_span_set_restriction() {
        let triangle = TSequenceSet::from_sequence(
            TSequence::new(
                vec![finst(0.0, 0), finst(10.0, 10), finst(0.0, 20)],
                Interp::Linear,
                true,
                true,
            )
            .unwrap(),
        )
        .unwrap();
        let ranges = SpanSet::from_spans(vec![
            Span::closed(0.0, 2.0).unwrap(),
            Span::closed(8.0, 10.0).unwrap(),
        ]);

        let at = triangle.at_value_span_set(&ranges).unwrap().unwrap();
        // low band at both ends, high band around the peak
        assert_eq!(at.num_sequences(), 3);
        assert_eq!(at.value_at(ts(1), true), Some(TValue::Float(1.0)));
        assert_eq!(at.value_at(ts(10), true), Some(TValue::Float(10.0)));
        assert_eq!(at.value_at(ts(5), true), None);

        let minus = triangle.minus_value_span_set(&ranges).unwrap().unwrap();
        assert_eq!(minus.num_sequences(), 2);
        assert_eq!(minus.value_at(ts(5), true), Some(TValue::Float(5.0)));
    }
}
