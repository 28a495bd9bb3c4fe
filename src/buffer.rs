//! Growable, uniquely-owned staging buffer for streaming ingestion.
//!
//! The immutable `TSequenceSet` is the default value type; write-heavy
//! callers that ingest an instant stream use `SeqSetBuffer` instead, a
//! capability-typed handle that appends in place. Exclusivity is enforced by
//! ownership: every mutating call takes `&mut self`, so no other view into
//! the buffer can outlive an append. Capacity grows by doubling when
//! exhausted; `freeze` hands back the immutable value.

use crate::config::Config;
use crate::error::{Result, TempoError};
use crate::instant::TInstant;
use crate::sequence::{Appended, Interp, TSequence};
use crate::seqset::TSequenceSet;
use crate::time::TimeDelta;

#[derive(Debug)]
pub struct SeqSetBuffer {
    interp: Interp,
    sequences: Vec<TSequence>,
    capacity: usize,
    max_dist: Option<f64>,
    max_gap: Option<TimeDelta>,
}

impl SeqSetBuffer {
    /// An empty buffer with room for `capacity` sequences before the first
    /// regrowth.
    pub fn with_capacity(interp: Interp, capacity: usize) -> Result<Self> {
        if interp == Interp::Discrete {
            return Err(TempoError::InvalidArgument(
                "buffers hold continuous sequences, not discrete ones".into(),
            ));
        }
        if capacity == 0 {
            return Err(TempoError::InvalidArgument(
                "buffer capacity must be greater than zero".into(),
            ));
        }
        Ok(SeqSetBuffer {
            interp,
            sequences: Vec::with_capacity(capacity),
            capacity,
            max_dist: None,
            max_gap: None,
        })
    }

    /// An empty buffer whose capacity and split policy come from `config`.
    pub fn with_config(interp: Interp, config: &Config) -> Result<Self> {
        let max_gap = config
            .max_time_gap_seconds
            .map(|s| TimeDelta::from_micros((s * 1_000_000.0) as i64));
        Ok(Self::with_capacity(interp, config.initial_buffer_capacity)?
            .with_gap_policy(config.max_value_distance, max_gap))
    }

    /// Start from an existing immutable value, reserving extra headroom.
    pub fn from_set(set: &TSequenceSet, extra_capacity: usize) -> Self {
        let capacity = set.num_sequences() + extra_capacity.max(1);
        let mut sequences = Vec::with_capacity(capacity);
        sequences.extend_from_slice(set.sequences());
        SeqSetBuffer {
            interp: set.interp(),
            sequences,
            capacity,
            max_dist: None,
            max_gap: None,
        }
    }

    /// Split policy applied on append: exceeding either bound starts a new
    /// sequence instead of extending the tail.
    pub fn with_gap_policy(mut self, max_dist: Option<f64>, max_gap: Option<TimeDelta>) -> Self {
        self.max_dist = max_dist;
        self.max_gap = max_gap;
        self
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn num_instants(&self) -> usize {
        self.sequences.iter().map(TSequence::num_instants).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn ensure_room(&mut self, extra: usize) {
        let old = self.capacity;
        while self.sequences.len() + extra > self.capacity {
            self.capacity *= 2;
        }
        if self.capacity != old {
            log::debug!("Buffer capacity grown from {old} to {}", self.capacity);
        }
        if self.capacity > self.sequences.capacity() {
            self.sequences
                .reserve(self.capacity - self.sequences.len());
        }
    }

    /// Append one instant in place, delegating the split decision to the
    /// tail sequence.
    pub fn push_instant(&mut self, instant: TInstant) -> Result<()> {
        let Some(last) = self.sequences.pop() else {
            self.ensure_room(1);
            self.sequences
                .push(TSequence::from_instant(instant, self.interp));
            return Ok(());
        };
        match last.append(instant, self.max_dist, self.max_gap) {
            Ok(Appended::Extended(seq)) => {
                self.sequences.push(seq);
                Ok(())
            }
            Ok(Appended::Split(a, b)) => {
                self.sequences.push(a);
                self.ensure_room(1);
                self.sequences.push(b);
                Ok(())
            }
            Err(e) => {
                self.sequences.push(last);
                Err(e)
            }
        }
    }

    /// Append a whole sequence, fusing with the tail when join-compatible.
    pub fn push_sequence(&mut self, seq: TSequence) -> Result<()> {
        if seq.interp() != self.interp {
            return Err(TempoError::InvalidArgument(format!(
                "cannot push a {} sequence into a {} buffer",
                seq.interp(),
                self.interp
            )));
        }
        if let Some(last) = self.sequences.last() {
            if !last.period().left_of(&seq.period()) {
                return Err(TempoError::InvalidArgument(format!(
                    "pushed sequence starting {} overlaps buffer ending {}",
                    seq.period().lower,
                    last.period().upper
                )));
            }
            if let Some(joined) = last.join(&seq) {
                let n = self.sequences.len();
                self.sequences[n - 1] = joined;
                return Ok(());
            }
        }
        self.ensure_room(1);
        self.sequences.push(seq);
        Ok(())
    }

    /// Hand back the immutable value, consuming the buffer.
    pub fn freeze(self) -> Result<TSequenceSet> {
        TSequenceSet::new(self.sequences, true)
    }
}
