//! Time-contiguous runs of instants under one interpolation mode.
//!
//! A `TSequence` owns a strictly time-ordered instant list, the inclusivity
//! flags of its time span, and a precomputed bounding box. Sequences are
//! immutable; every operation returns a new value. Restriction to periods
//! synthesizes boundary instants by evaluating the interpolation function at
//! the cut points, so sub-sequences remain self-contained.

use crate::bbox::TBox;
use crate::error::{Result, TempoError};
use crate::instant::TInstant;
use crate::span::{Period, Span};
use crate::spanset::{PeriodSet, SpanSet};
use crate::time::{TimeDelta, Timestamp};
use crate::value::{TValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Rule for evaluating a value between two consecutive instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interp {
    /// Isolated points only, no value between instants
    Discrete,
    /// Value held until the next instant
    Stepwise,
    /// Numeric or point interpolation between consecutive instants
    Linear,
}

impl fmt::Display for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Interp::Discrete => "Discrete",
            Interp::Stepwise => "Step",
            Interp::Linear => "Linear",
        })
    }
}

/// Outcome of appending an instant to a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Appended {
    /// The instant joined the sequence
    Extended(TSequence),
    /// The sequence could not absorb the instant; the result is two pieces
    Split(TSequence, TSequence),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TSequence {
    interp: Interp,
    instants: Vec<TInstant>,
    lower_inc: bool,
    upper_inc: bool,
    bbox: TBox,
}

impl TSequence {
    /// Build a sequence, validating eagerly.
    ///
    /// Timestamps must be strictly increasing and all values must share one
    /// kind. Linear interpolation requires a continuous kind. Discrete
    /// sequences are always closed on both sides, and a single-instant
    /// sequence must be closed as well.
    pub fn new(
        instants: Vec<TInstant>,
        interp: Interp,
        lower_inc: bool,
        upper_inc: bool,
    ) -> Result<Self> {
        if instants.is_empty() {
            return Err(TempoError::InvalidArgument(
                "sequence requires at least one instant".into(),
            ));
        }
        let kind = instants[0].value.kind();
        for pair in instants.windows(2) {
            if pair[1].t <= pair[0].t {
                return Err(TempoError::InvalidArgument(format!(
                    "instant timestamps must be strictly increasing, got {} after {}",
                    pair[1].t, pair[0].t
                )));
            }
            if pair[1].value.kind() != kind {
                return Err(TempoError::DomainMismatch {
                    expected: kind.name(),
                    actual: pair[1].value.kind().name(),
                });
            }
        }
        if interp == Interp::Linear && !kind.is_continuous() {
            return Err(TempoError::InvalidArgument(format!(
                "linear interpolation is not defined over {kind} values"
            )));
        }
        let (lower_inc, upper_inc) = if interp == Interp::Discrete {
            (true, true)
        } else {
            (lower_inc, upper_inc)
        };
        if instants.len() == 1 && !(lower_inc && upper_inc) {
            return Err(TempoError::InvalidArgument(
                "single-instant sequence must be closed on both sides".into(),
            ));
        }
        let mut bbox = instants[0].bbox();
        for inst in &instants[1..] {
            bbox.expand_instant(&inst.value, inst.t);
        }
        Ok(TSequence {
            interp,
            instants,
            lower_inc,
            upper_inc,
            bbox,
        })
    }

    pub fn from_instant(instant: TInstant, interp: Interp) -> Self {
        let bbox = instant.bbox();
        TSequence {
            interp,
            instants: vec![instant],
            lower_inc: true,
            upper_inc: true,
            bbox,
        }
    }

    /// A constant sequence holding `value` over `period`.
    pub fn from_base(value: TValue, period: &Period, interp: Interp) -> Result<Self> {
        if interp == Interp::Discrete {
            return Err(TempoError::InvalidArgument(
                "a constant sequence over a period cannot be discrete".into(),
            ));
        }
        let instants = if period.is_singleton() {
            vec![TInstant::new(value, period.lower)]
        } else {
            vec![
                TInstant::new(value.clone(), period.lower),
                TInstant::new(value, period.upper),
            ]
        };
        TSequence::new(instants, interp, period.lower_inc, period.upper_inc)
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    pub fn instants(&self) -> &[TInstant] {
        &self.instants
    }

    pub fn num_instants(&self) -> usize {
        self.instants.len()
    }

    pub fn inst_n(&self, n: usize) -> Option<&TInstant> {
        self.instants.get(n)
    }

    pub fn lower_inc(&self) -> bool {
        self.lower_inc
    }

    pub fn upper_inc(&self) -> bool {
        self.upper_inc
    }

    pub fn bbox(&self) -> &TBox {
        &self.bbox
    }

    pub fn value_kind(&self) -> ValueKind {
        self.instants[0].value.kind()
    }

    pub fn start_timestamp(&self) -> Timestamp {
        self.instants[0].t
    }

    pub fn end_timestamp(&self) -> Timestamp {
        self.instants[self.instants.len() - 1].t
    }

    pub fn start_value(&self) -> &TValue {
        &self.instants[0].value
    }

    pub fn end_value(&self) -> &TValue {
        &self.instants[self.instants.len() - 1].value
    }

    /// The time span of the sequence. Discrete sequences span their first to
    /// last instant, closed on both sides.
    pub fn period(&self) -> Period {
        Span {
            lower: self.start_timestamp(),
            upper: self.end_timestamp(),
            lower_inc: self.lower_inc,
            upper_inc: self.upper_inc,
        }
    }

    /// Total duration. Zero for discrete sequences, which occupy no interval.
    pub fn duration(&self) -> TimeDelta {
        match self.interp {
            Interp::Discrete => TimeDelta::ZERO,
            _ => self.period().duration(),
        }
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.instants.iter().map(|i| i.t).collect()
    }

    pub fn values(&self) -> Vec<TValue> {
        self.instants.iter().map(|i| i.value.clone()).collect()
    }

    /// Distinct values in first-seen order.
    pub fn distinct_values(&self) -> Vec<TValue> {
        let mut out: Vec<TValue> = Vec::new();
        for inst in &self.instants {
            if !out.contains(&inst.value) {
                out.push(inst.value.clone());
            }
        }
        out
    }

    pub fn shift(&self, delta: TimeDelta) -> TSequence {
        let instants = self.instants.iter().map(|i| i.shift(delta)).collect();
        let mut out = self.clone();
        out.instants = instants;
        out.bbox.period = out.bbox.period.shift(delta);
        out
    }

    /// Rescale so the sequence covers `new_duration`, keeping the start fixed
    /// and instant spacing proportional.
    pub fn scale(&self, new_duration: TimeDelta) -> Result<TSequence> {
        if !new_duration.is_positive() {
            return Err(TempoError::InvalidArgument(format!(
                "sequence duration must be positive, got {new_duration}"
            )));
        }
        let start = self.start_timestamp();
        let old = (self.end_timestamp() - start).as_micros();
        if old == 0 {
            return Ok(self.clone());
        }
        let new = new_duration.as_micros();
        let instants: Vec<TInstant> = self
            .instants
            .iter()
            .map(|i| {
                let offset = (i.t - start).as_micros() as i128 * new as i128 / old as i128;
                TInstant::new(i.value.clone(), start + TimeDelta::from_micros(offset as i64))
            })
            .collect();
        TSequence::new(instants, self.interp, self.lower_inc, self.upper_inc)
    }

    /// Shift then rescale in one step.
    pub fn shift_scale(&self, delta: TimeDelta, new_duration: TimeDelta) -> Result<TSequence> {
        self.shift(delta).scale(new_duration)
    }

    /// Evaluate the value at `t`.
    ///
    /// Strict mode returns `None` outside the sequence's span, including at
    /// exclusive endpoints. Non-strict mode still evaluates at an exclusive
    /// endpoint, yielding the interpolation limit there; restriction uses it
    /// to synthesize boundary instants.
    pub fn value_at(&self, t: Timestamp, strict: bool) -> Option<TValue> {
        if self.interp == Interp::Discrete {
            return match self.instants.binary_search_by(|i| i.t.cmp(&t)) {
                Ok(i) => Some(self.instants[i].value.clone()),
                Err(_) => None,
            };
        }
        if strict {
            if !self.period().contains_point(t) {
                return None;
            }
        } else if t < self.start_timestamp() || t > self.end_timestamp() {
            return None;
        }
        match self.instants.binary_search_by(|i| i.t.cmp(&t)) {
            Ok(i) => Some(self.instants[i].value.clone()),
            Err(i) => {
                // strictly between instants i-1 and i
                let prev = &self.instants[i - 1];
                match self.interp {
                    Interp::Stepwise => Some(prev.value.clone()),
                    Interp::Linear => {
                        let next = &self.instants[i];
                        let ratio = (t - prev.t).as_micros() as f64
                            / (next.t - prev.t).as_micros() as f64;
                        prev.value.lerp(&next.value, ratio)
                    }
                    Interp::Discrete => unreachable!(),
                }
            }
        }
    }

    /// The value approaching `t` from the left. Differs from `value_at` only
    /// for stepwise sequences when `t` lands exactly on an instant.
    fn left_limit_value(&self, t: Timestamp) -> Option<TValue> {
        match self.instants.binary_search_by(|i| i.t.cmp(&t)) {
            Ok(i) if i > 0 && self.interp == Interp::Stepwise => {
                Some(self.instants[i - 1].value.clone())
            }
            Ok(i) => Some(self.instants[i].value.clone()),
            Err(_) => self.value_at(t, false),
        }
    }

    pub fn at_timestamp(&self, t: Timestamp) -> Option<TInstant> {
        self.value_at(t, true).map(|v| TInstant::new(v, t))
    }

    pub fn at_timestamp_set(&self, times: &[Timestamp]) -> Vec<TInstant> {
        times.iter().filter_map(|&t| self.at_timestamp(t)).collect()
    }

    /// Restrict to a period, producing one maximal sub-sequence or nothing.
    pub fn at_period(&self, period: &Period) -> Option<TSequence> {
        if self.interp == Interp::Discrete {
            let kept: Vec<TInstant> = self
                .instants
                .iter()
                .filter(|i| period.contains_point(i.t))
                .cloned()
                .collect();
            if kept.is_empty() {
                return None;
            }
            return Some(
                TSequence::new(kept, Interp::Discrete, true, true)
                    .unwrap_or_else(|_| unreachable!()),
            );
        }
        let inter = self.period().intersection(period)?;
        if inter.is_singleton() {
            let v = self.value_at(inter.lower, false)?;
            return Some(TSequence::from_instant(
                TInstant::new(v, inter.lower),
                self.interp,
            ));
        }
        let mut instants = Vec::new();
        let start_value = self.value_at(inter.lower, false)?;
        instants.push(TInstant::new(start_value, inter.lower));
        for inst in &self.instants {
            if inst.t > inter.lower && inst.t < inter.upper {
                instants.push(inst.clone());
            }
        }
        let end_value = if inter.upper_inc {
            self.value_at(inter.upper, false)?
        } else {
            self.left_limit_value(inter.upper)?
        };
        instants.push(TInstant::new(end_value, inter.upper));
        TSequence::new(instants, self.interp, inter.lower_inc, inter.upper_inc).ok()
    }

    pub fn at_period_set(&self, periods: &PeriodSet) -> Vec<TSequence> {
        if self.interp == Interp::Discrete {
            let kept: Vec<TInstant> = self
                .instants
                .iter()
                .filter(|i| periods.contains_point(i.t))
                .cloned()
                .collect();
            return match TSequence::new(kept, Interp::Discrete, true, true) {
                Ok(seq) => vec![seq],
                Err(_) => Vec::new(),
            };
        }
        periods
            .spans()
            .iter()
            .filter_map(|p| self.at_period(p))
            .collect()
    }

    /// Restrict to the times where the sequence takes `value`.
    pub fn at_value(&self, value: &TValue) -> Result<Vec<TSequence>> {
        let kind = self.value_kind();
        if value.kind() != kind {
            return Err(TempoError::DomainMismatch {
                expected: kind.name(),
                actual: value.kind().name(),
            });
        }
        if !self.bbox.may_contain_value(value) {
            return Ok(Vec::new());
        }
        let seqs = match self.interp {
            Interp::Discrete => {
                let kept: Vec<TInstant> = self
                    .instants
                    .iter()
                    .filter(|i| &i.value == value)
                    .cloned()
                    .collect();
                match TSequence::new(kept, Interp::Discrete, true, true) {
                    Ok(seq) => vec![seq],
                    Err(_) => Vec::new(),
                }
            }
            Interp::Stepwise => self.step_at_value(value),
            Interp::Linear => self.linear_at_value(value),
        };
        Ok(normalize_runs(seqs))
    }

    // Maximal runs where the held value equals the target.
    fn step_at_value(&self, value: &TValue) -> Vec<TSequence> {
        self.step_runs(&|v: &TValue| v == value)
    }

    // Exact hits, constant stretches, and mid-segment crossings.
    fn linear_at_value(&self, value: &TValue) -> Vec<TSequence> {
        let n = self.instants.len();
        if n == 1 {
            return if self.start_value() == value {
                vec![self.clone()]
            } else {
                Vec::new()
            };
        }
        let mut out = Vec::new();
        for k in 0..n - 1 {
            let a = &self.instants[k];
            let b = &self.instants[k + 1];
            let seg_lower_inc = if k == 0 { self.lower_inc } else { true };
            let seg_upper_inc = if k == n - 2 { self.upper_inc } else { false };
            if &a.value == value && &b.value == value {
                if let Ok(seq) = TSequence::new(
                    vec![a.clone(), b.clone()],
                    Interp::Linear,
                    seg_lower_inc,
                    seg_upper_inc,
                ) {
                    out.push(seq);
                }
                continue;
            }
            if &a.value == value && seg_lower_inc {
                out.push(TSequence::from_instant(a.clone(), Interp::Linear));
            }
            if &b.value == value && seg_upper_inc {
                out.push(TSequence::from_instant(b.clone(), Interp::Linear));
            }
            if &a.value != value
                && &b.value != value
                && let Some(r) = segment_ratio_at(&a.value, &b.value, value)
            {
                let dt = (b.t - a.t).as_micros() as f64;
                let t = a.t + TimeDelta::from_micros((dt * r).round() as i64);
                out.push(TSequence::from_instant(
                    TInstant::new(value.clone(), t),
                    Interp::Linear,
                ));
            }
        }
        out
    }

    pub fn at_value_set(&self, values: &[TValue]) -> Result<Vec<TSequence>> {
        let mut all = Vec::new();
        for v in values {
            all.extend(self.at_value(v)?);
        }
        all.sort_by(|a, b| a.period().cmp_spans(&b.period()));
        Ok(normalize_runs(all))
    }

    /// Time domain left after removing `periods`.
    fn complement(&self, covered: &PeriodSet) -> PeriodSet {
        PeriodSet::from_spans(vec![self.period()]).minus(covered)
    }

    pub fn minus_period(&self, period: &Period) -> Vec<TSequence> {
        self.minus_period_set(&PeriodSet::from_spans(vec![*period]))
    }

    pub fn minus_period_set(&self, periods: &PeriodSet) -> Vec<TSequence> {
        if self.interp == Interp::Discrete {
            let kept: Vec<TInstant> = self
                .instants
                .iter()
                .filter(|i| !periods.contains_point(i.t))
                .cloned()
                .collect();
            return match TSequence::new(kept, Interp::Discrete, true, true) {
                Ok(seq) => vec![seq],
                Err(_) => Vec::new(),
            };
        }
        self.at_period_set(&self.complement(periods))
    }

    pub fn minus_timestamp(&self, t: Timestamp) -> Vec<TSequence> {
        self.minus_period_set(&PeriodSet::from_spans(vec![Period::singleton(t)]))
    }

    pub fn minus_timestamp_set(&self, times: &[Timestamp]) -> Vec<TSequence> {
        let spans = times.iter().map(|&t| Period::singleton(t)).collect();
        self.minus_period_set(&PeriodSet::from_spans(spans))
    }

    /// Complement of `at_value`: the restriction to times where the value
    /// differs from the target.
    pub fn minus_value(&self, value: &TValue) -> Result<Vec<TSequence>> {
        let at = self.at_value(value)?;
        Ok(self.minus_period_set(&time_span_set(&at)))
    }

    pub fn minus_value_set(&self, values: &[TValue]) -> Result<Vec<TSequence>> {
        let at = self.at_value_set(values)?;
        Ok(self.minus_period_set(&time_span_set(&at)))
    }

    /// Restrict a numeric sequence to the times its value lies in `span`.
    pub fn at_value_span(&self, span: &Span<f64>) -> Result<Vec<TSequence>> {
        let kind = self.value_kind();
        if !matches!(kind, ValueKind::Int | ValueKind::Float) {
            return Err(TempoError::DomainMismatch {
                expected: "int or float",
                actual: kind.name(),
            });
        }
        if !self.bbox.may_overlap_value_span(span) {
            return Ok(Vec::new());
        }
        let in_span =
            |v: &TValue| v.as_f64().is_some_and(|x| span.contains_point(x));
        let seqs = match self.interp {
            Interp::Discrete => {
                let kept: Vec<TInstant> = self
                    .instants
                    .iter()
                    .filter(|i| in_span(&i.value))
                    .cloned()
                    .collect();
                match TSequence::new(kept, Interp::Discrete, true, true) {
                    Ok(seq) => vec![seq],
                    Err(_) => Vec::new(),
                }
            }
            Interp::Stepwise => self.step_runs(&in_span),
            Interp::Linear => self.linear_at_value_span(span),
        };
        Ok(normalize_runs(seqs))
    }

    pub fn minus_value_span(&self, span: &Span<f64>) -> Result<Vec<TSequence>> {
        let at = self.at_value_span(span)?;
        Ok(self.minus_period_set(&time_span_set(&at)))
    }

    /// Restrict to a set of disjoint value ranges.
    pub fn at_value_span_set(&self, spans: &SpanSet<f64>) -> Result<Vec<TSequence>> {
        let mut out = Vec::new();
        for span in spans.spans() {
            out.extend(self.at_value_span(span)?);
        }
        out.sort_by(|a, b| a.period().cmp_spans(&b.period()));
        Ok(normalize_runs(out))
    }

    pub fn minus_value_span_set(&self, spans: &SpanSet<f64>) -> Result<Vec<TSequence>> {
        let at = self.at_value_span_set(spans)?;
        Ok(self.minus_period_set(&time_span_set(&at)))
    }

    // Clip each linear segment to the value range.
    fn linear_at_value_span(&self, span: &Span<f64>) -> Vec<TSequence> {
        let n = self.instants.len();
        if n == 1 {
            let inside = self
                .start_value()
                .as_f64()
                .is_some_and(|x| span.contains_point(x));
            return if inside { vec![self.clone()] } else { Vec::new() };
        }
        let mut out = Vec::new();
        for k in 0..n - 1 {
            let a = &self.instants[k];
            let b = &self.instants[k + 1];
            let (Some(v0), Some(v1)) = (a.value.as_f64(), b.value.as_f64()) else {
                continue;
            };
            let seg_lower_inc = if k == 0 { self.lower_inc } else { true };
            let seg_upper_inc = if k == n - 2 { self.upper_inc } else { false };
            if v0 == v1 {
                if span.contains_point(v0)
                    && let Ok(seq) = TSequence::new(
                        vec![a.clone(), b.clone()],
                        Interp::Linear,
                        seg_lower_inc,
                        seg_upper_inc,
                    )
                {
                    out.push(seq);
                }
                continue;
            }
            // parameter range of the segment whose value falls inside `span`
            let (mut r0, mut r0_inc) = (0.0, seg_lower_inc);
            let (mut r1, mut r1_inc) = (1.0, seg_upper_inc);
            let rising = v1 > v0;
            let (enter, enter_inc, exit, exit_inc) = if rising {
                (span.lower, span.lower_inc, span.upper, span.upper_inc)
            } else {
                (span.upper, span.upper_inc, span.lower, span.lower_inc)
            };
            let r_enter = (enter - v0) / (v1 - v0);
            let r_exit = (exit - v0) / (v1 - v0);
            if r_enter > r0 {
                r0 = r_enter;
                r0_inc = enter_inc;
            }
            if r_exit < r1 {
                r1 = r_exit;
                r1_inc = exit_inc;
            }
            if r0 > r1 || r0 > 1.0 || r1 < 0.0 || (r0 == r1 && !(r0_inc && r1_inc)) {
                continue;
            }
            let dt = (b.t - a.t).as_micros() as f64;
            let t0 = a.t + TimeDelta::from_micros((dt * r0).round() as i64);
            let t1 = a.t + TimeDelta::from_micros((dt * r1).round() as i64);
            let val = |r: f64| TValue::Float(v0 + (v1 - v0) * r);
            let seq = if t0 == t1 {
                Ok(TSequence::from_instant(
                    TInstant::new(val(r0), t0),
                    Interp::Linear,
                ))
            } else {
                let lo = if r0 == 0.0 {
                    a.clone()
                } else {
                    TInstant::new(val(r0), t0)
                };
                let hi = if r1 == 1.0 {
                    b.clone()
                } else {
                    TInstant::new(val(r1), t1)
                };
                TSequence::new(vec![lo, hi], Interp::Linear, r0_inc, r1_inc)
            };
            if let Ok(seq) = seq {
                out.push(seq);
            }
        }
        out
    }

    // Maximal stepwise runs where the held value satisfies the predicate.
    fn step_runs(&self, pred: &dyn Fn(&TValue) -> bool) -> Vec<TSequence> {
        let n = self.instants.len();
        let mut out = Vec::new();
        let mut i = 0;
        while i < n {
            if !pred(&self.instants[i].value) {
                i += 1;
                continue;
            }
            let run_start = i;
            while i + 1 < n && pred(&self.instants[i + 1].value) {
                i += 1;
            }
            let lower_inc = if run_start == 0 { self.lower_inc } else { true };
            let seq = if i + 1 < n {
                let mut instants: Vec<TInstant> = self.instants[run_start..=i].to_vec();
                instants.push(TInstant::new(
                    self.instants[i].value.clone(),
                    self.instants[i + 1].t,
                ));
                TSequence::new(instants, Interp::Stepwise, lower_inc, false)
            } else {
                if run_start == i && !self.upper_inc && n > 1 {
                    break;
                }
                TSequence::new(
                    self.instants[run_start..=i].to_vec(),
                    Interp::Stepwise,
                    lower_inc,
                    self.upper_inc,
                )
            };
            if let Ok(seq) = seq {
                out.push(seq);
            }
            i += 1;
        }
        out
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

    /// Whether the value is ever equal to `value`.
    pub fn ever_eq(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        if !self.bbox.may_contain_value(value) {
            return Ok(false);
        }
        Ok(!self.at_value(value)?.is_empty())
    }

    /// Whether the value is equal to `value` at every instant of its domain.
    pub fn always_eq(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        Ok(self.instants.iter().all(|i| &i.value == value))
    }

    pub fn ever_lt(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        Ok(self
            .instants
            .iter()
            .any(|i| i.value.total_cmp(value) == Ordering::Less))
    }

    pub fn always_lt(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        Ok(self
            .instants
            .iter()
            .all(|i| i.value.total_cmp(value) == Ordering::Less))
    }

    pub fn ever_le(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        Ok(self
            .instants
            .iter()
            .any(|i| i.value.total_cmp(value) != Ordering::Greater))
    }

    pub fn always_le(&self, value: &TValue) -> Result<bool> {
        self.check_value_domain(value)?;
        Ok(self
            .instants
            .iter()
            .all(|i| i.value.total_cmp(value) != Ordering::Greater))
    }

    pub fn min_value(&self) -> &TValue {
        self.instants
            .iter()
            .map(|i| &i.value)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or_else(|| unreachable!())
    }

    pub fn max_value(&self) -> &TValue {
        self.instants
            .iter()
            .map(|i| &i.value)
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or_else(|| unreachable!())
    }

    /// The instant carrying the smallest value, earliest on ties.
    pub fn min_instant(&self) -> &TInstant {
        self.instants
            .iter()
            .min_by(|a, b| a.value.total_cmp(&b.value))
            .unwrap_or_else(|| unreachable!())
    }

    /// The instant carrying the largest value, earliest on ties.
    pub fn max_instant(&self) -> &TInstant {
        let mut best = &self.instants[0];
        for inst in &self.instants[1..] {
            if inst.value.total_cmp(&best.value) == Ordering::Greater {
                best = inst;
            }
        }
        best
    }

    /// Append one instant.
    ///
    /// The instant extends the sequence when it can, yielding
    /// `Appended::Extended`, with a redundant interior instant coalesced
    /// away (equal held values under stepwise, collinear points under
    /// linear). It produces `Appended::Split` when the sequence cannot
    /// absorb it: the tail bound is exclusive, the configured time gap or
    /// value distance is exceeded, or a stepwise value change occurs.
    /// Appending at the current end timestamp with a different value is a
    /// consistency error; with the same value it is a no-op.
    pub fn append(
        &self,
        instant: TInstant,
        max_dist: Option<f64>,
        max_gap: Option<TimeDelta>,
    ) -> Result<Appended> {
        self.check_value_domain(&instant.value)?;
        let last = &self.instants[self.instants.len() - 1];
        match instant.t.cmp(&last.t) {
            Ordering::Less => Err(TempoError::InvalidArgument(format!(
                "cannot append instant at {} before sequence end {}",
                instant.t, last.t
            ))),
            Ordering::Equal => {
                if instant.value == last.value {
                    Ok(Appended::Extended(self.clone()))
                } else {
                    Err(TempoError::ValueConflict { at: instant.t })
                }
            }
            Ordering::Greater => {
                if self.interp == Interp::Discrete {
                    let mut out = self.clone();
                    out.bbox.expand_instant(&instant.value, instant.t);
                    out.instants.push(instant);
                    return Ok(Appended::Extended(out));
                }
                let gap_exceeded = max_gap.is_some_and(|g| instant.t - last.t > g);
                let dist_exceeded = max_dist.is_some_and(|d| {
                    last.value.distance(&instant.value).is_some_and(|x| x > d)
                });
                let step_jump =
                    self.interp == Interp::Stepwise && instant.value != last.value;
                if !self.upper_inc || gap_exceeded || dist_exceeded || step_jump {
                    return Ok(Appended::Split(
                        self.clone(),
                        TSequence::from_instant(instant, self.interp),
                    ));
                }
                let mut out = self.clone();
                if out.instants.len() >= 2 {
                    let n = out.instants.len();
                    let redundant = match self.interp {
                        Interp::Stepwise => out.instants[n - 1].value == out.instants[n - 2].value,
                        Interp::Linear => {
                            let a = &out.instants[n - 2];
                            let b = &out.instants[n - 1];
                            let ratio = (b.t - a.t).as_micros() as f64
                                / (instant.t - a.t).as_micros() as f64;
                            a.value.lerp(&instant.value, ratio).as_ref() == Some(&b.value)
                        }
                        Interp::Discrete => false,
                    };
                    if redundant {
                        out.instants.pop();
                    }
                }
                out.bbox.expand_instant(&instant.value, instant.t);
                out.instants.push(instant);
                Ok(Appended::Extended(out))
            }
        }
    }

    /// Fuse with a sequence that starts exactly where this one ends with the
    /// same value, and where the shared boundary is covered by exactly one
    /// side or carries a duplicate instant. `None` when not joinable.
    pub fn join(&self, other: &TSequence) -> Option<TSequence> {
        if self.interp != other.interp || self.interp == Interp::Discrete {
            return None;
        }
        if self.end_timestamp() != other.start_timestamp() {
            return None;
        }
        if !self.upper_inc && !other.lower_inc {
            return None;
        }
        if self.end_value() != other.start_value() {
            return None;
        }
        let mut instants = self.instants.clone();
        instants.extend_from_slice(&other.instants[1..]);
        TSequence::new(instants, self.interp, self.lower_inc, other.upper_inc).ok()
    }

    /// Time-align two overlapping sequences onto the union of their
    /// timestamps. With `cross`, additionally inserts the exact instant at
    /// which two linear segments cross value-wise.
    pub fn synchronize(
        &self,
        other: &TSequence,
        cross: bool,
    ) -> Option<(TSequence, TSequence)> {
        if self.interp == Interp::Discrete || other.interp == Interp::Discrete {
            let (disc, cont) = if self.interp == Interp::Discrete {
                (self, other)
            } else {
                (other, self)
            };
            let mut a = Vec::new();
            let mut b = Vec::new();
            for inst in &disc.instants {
                if let Some(v) = cont.value_at(inst.t, true) {
                    a.push(inst.clone());
                    b.push(TInstant::new(v, inst.t));
                }
            }
            let sa = TSequence::new(a, Interp::Discrete, true, true).ok()?;
            let sb = TSequence::new(b, Interp::Discrete, true, true).ok()?;
            return if self.interp == Interp::Discrete {
                Some((sa, sb))
            } else {
                Some((sb, sa))
            };
        }

        let inter = self.period().intersection(&other.period())?;
        let mut times: Vec<Timestamp> = vec![inter.lower];
        for inst in self.instants.iter().chain(other.instants.iter()) {
            if inst.t > inter.lower && inst.t < inter.upper {
                times.push(inst.t);
            }
        }
        if inter.upper > inter.lower {
            times.push(inter.upper);
        }
        times.sort();
        times.dedup();

        let mut a: Vec<TInstant> = Vec::with_capacity(times.len());
        let mut b: Vec<TInstant> = Vec::with_capacity(times.len());
        for &t in &times {
            a.push(TInstant::new(self.value_at(t, false)?, t));
            b.push(TInstant::new(other.value_at(t, false)?, t));
        }

        if cross && self.interp == Interp::Linear && other.interp == Interp::Linear {
            let mut xa: Vec<TInstant> = Vec::with_capacity(a.len());
            let mut xb: Vec<TInstant> = Vec::with_capacity(b.len());
            for j in 0..a.len() {
                if j > 0
                    && let Some(r) = TValue::segment_crossing(
                        &a[j - 1].value,
                        &a[j].value,
                        &b[j - 1].value,
                        &b[j].value,
                    )
                {
                    let dt = (a[j].t - a[j - 1].t).as_micros() as f64;
                    let tc = a[j - 1].t + TimeDelta::from_micros((dt * r).round() as i64);
                    if tc > a[j - 1].t && tc < a[j].t {
                        if let Some(va) = a[j - 1].value.lerp(&a[j].value, r) {
                            xa.push(TInstant::new(va, tc));
                        }
                        if let Some(vb) = b[j - 1].value.lerp(&b[j].value, r) {
                            xb.push(TInstant::new(vb, tc));
                        }
                    }
                }
                xa.push(a[j].clone());
                xb.push(b[j].clone());
            }
            a = xa;
            b = xb;
        }

        let sa = TSequence::new(a, self.interp, inter.lower_inc, inter.upper_inc).ok()?;
        let sb = TSequence::new(b, other.interp, inter.lower_inc, inter.upper_inc).ok()?;
        Some((sa, sb))
    }

    /// Change the interpolation mode where the change is lossless.
    pub fn with_interp(&self, interp: Interp) -> Result<TSequence> {
        if interp == self.interp {
            return Ok(self.clone());
        }
        let fail = || TempoError::UnsupportedConversion(format!(
            "{} sequence to {} interpolation",
            self.interp, interp
        ));
        match (self.interp, interp) {
            (_, Interp::Discrete) | (Interp::Discrete, _) => {
                if self.instants.len() == 1 {
                    TSequence::new(self.instants.clone(), interp, true, true)
                } else {
                    Err(fail())
                }
            }
            (Interp::Stepwise, Interp::Linear) => {
                if !self.value_kind().is_continuous() {
                    return Err(fail());
                }
                // lossless only when the sequence is piecewise constant
                if self.instants.windows(2).all(|w| w[0].value == w[1].value) {
                    TSequence::new(
                        self.instants.clone(),
                        Interp::Linear,
                        self.lower_inc,
                        self.upper_inc,
                    )
                } else {
                    Err(fail())
                }
            }
            (Interp::Linear, Interp::Stepwise) => Err(fail()),
            _ => Err(fail()),
        }
    }

    /// Promote to a single-component sequence set.
    pub fn to_sequence_set(&self) -> Result<crate::seqset::TSequenceSet> {
        crate::seqset::TSequenceSet::from_sequence(self.clone())
    }

    /// Cast integer values to floats, keeping shape and interpolation.
    pub fn to_float(&self) -> Result<TSequence> {
        let instants = self
            .instants
            .iter()
            .map(|i| match &i.value {
                TValue::Int(v) => Ok(TInstant::new(TValue::Float(*v as f64), i.t)),
                TValue::Float(_) => Ok(i.clone()),
                other => Err(TempoError::UnsupportedConversion(format!(
                    "{} sequence to float",
                    other.kind()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        TSequence::new(instants, self.interp, self.lower_inc, self.upper_inc)
    }

    /// Cast float values to integers by rounding. A linear sequence cannot
    /// take integer values mid-segment, so the cast is rejected there.
    pub fn to_int(&self) -> Result<TSequence> {
        if self.interp == Interp::Linear {
            return Err(TempoError::UnsupportedConversion(
                "linear float sequence to integer".into(),
            ));
        }
        let instants = self
            .instants
            .iter()
            .map(|i| match &i.value {
                TValue::Float(v) => Ok(TInstant::new(TValue::Int(v.round() as i64), i.t)),
                TValue::Int(_) => Ok(i.clone()),
                other => Err(TempoError::UnsupportedConversion(format!(
                    "{} sequence to integer",
                    other.kind()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        TSequence::new(instants, self.interp, self.lower_inc, self.upper_inc)
    }

    /// Area under the piecewise curve, for numeric domains.
    pub fn integral(&self) -> Result<f64> {
        let kind = self.value_kind();
        if !matches!(kind, ValueKind::Int | ValueKind::Float) {
            return Err(TempoError::DomainMismatch {
                expected: "int or float",
                actual: kind.name(),
            });
        }
        if self.interp == Interp::Discrete {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for w in self.instants.windows(2) {
            let dt = (w[1].t - w[0].t).as_secs_f64();
            let v0 = w[0].value.as_f64().unwrap_or_else(|| unreachable!());
            let v1 = w[1].value.as_f64().unwrap_or_else(|| unreachable!());
            total += match self.interp {
                Interp::Stepwise => v0 * dt,
                Interp::Linear => (v0 + v1) / 2.0 * dt,
                Interp::Discrete => unreachable!(),
            };
        }
        Ok(total)
    }

    /// Time-weighted average. Falls back to the arithmetic mean of the
    /// instant values when the sequence is instantaneous.
    pub fn time_weighted_average(&self) -> Result<f64> {
        let dur = self.duration().as_secs_f64();
        if dur == 0.0 {
            let kind = self.value_kind();
            if !matches!(kind, ValueKind::Int | ValueKind::Float) {
                return Err(TempoError::DomainMismatch {
                    expected: "int or float",
                    actual: kind.name(),
                });
            }
            let sum: f64 = self.instants.iter().filter_map(|i| i.value.as_f64()).sum();
            return Ok(sum / self.instants.len() as f64);
        }
        Ok(self.integral()? / dur)
    }

    pub fn format(&self, maxdd: usize) -> String {
        let body: Vec<String> = self.instants.iter().map(|i| i.format(maxdd)).collect();
        match self.interp {
            Interp::Discrete => format!("{{{}}}", body.join(", ")),
            _ => {
                let prefix = if self.interp == Interp::Stepwise
                    && self.value_kind().is_continuous()
                {
                    "Interp=Step;"
                } else {
                    ""
                };
                format!(
                    "{}{}{}{}",
                    prefix,
                    if self.lower_inc { '[' } else { '(' },
                    body.join(", "),
                    if self.upper_inc { ']' } else { ')' },
                )
            }
        }
    }
}

/// Ratio in `[0, 1]` at which the linear segment `a -> b` attains `target`,
/// assuming neither endpoint equals it.
fn segment_ratio_at(a: &TValue, b: &TValue, target: &TValue) -> Option<f64> {
    match (a, b, target) {
        (TValue::Float(a), TValue::Float(b), TValue::Float(t)) => {
            if a == b || (t - a) * (t - b) > 0.0 {
                return None;
            }
            Some((t - a) / (b - a))
        }
        (TValue::Point(a), TValue::Point(b), TValue::Point(t)) => {
            let dx = b.x() - a.x();
            let dy = b.y() - a.y();
            let r = if dx != 0.0 {
                (t.x() - a.x()) / dx
            } else if dy != 0.0 {
                (t.y() - a.y()) / dy
            } else {
                return None;
            };
            if !(0.0..=1.0).contains(&r) {
                return None;
            }
            // the other coordinate must agree
            let ex = a.x() + dx * r;
            let ey = a.y() + dy * r;
            ((ex - t.x()).abs() < f64::EPSILON && (ey - t.y()).abs() < f64::EPSILON).then_some(r)
        }
        _ => None,
    }
}

/// Merge adjacent, join-compatible sequences in a time-sorted list.
pub(crate) fn normalize_runs(seqs: Vec<TSequence>) -> Vec<TSequence> {
    let mut out: Vec<TSequence> = Vec::with_capacity(seqs.len());
    for seq in seqs {
        if let Some(last) = out.last()
            && let Some(joined) = last.join(&seq)
        {
            *out.last_mut().unwrap_or_else(|| unreachable!()) = joined;
            continue;
        }
        out.push(seq);
    }
    out
}

/// The time domain covered by a list of sequences.
pub(crate) fn time_span_set(seqs: &[TSequence]) -> PeriodSet {
    PeriodSet::from_spans(seqs.iter().map(|s| s.period()).collect())
}

impl PartialEq for TSequence {
    fn eq(&self, other: &Self) -> bool {
        self.interp == other.interp
            && self.lower_inc == other.lower_inc
            && self.upper_inc == other.upper_inc
            && self.instants == other.instants
    }
}

impl Eq for TSequence {}

impl Ord for TSequence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instants
            .cmp(&other.instants)
            .then_with(|| self.lower_inc.cmp(&other.lower_inc))
            .then_with(|| self.upper_inc.cmp(&other.upper_inc))
    }
}

impl PartialOrd for TSequence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for TSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.interp.hash(state);
        self.lower_inc.hash(state);
        self.upper_inc.hash(state);
        self.instants.hash(state);
    }
}

impl fmt::Display for TSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(12))
    }
}
