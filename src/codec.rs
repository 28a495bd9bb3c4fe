//! Packed binary encoding.
//!
//! Every temporal shape serializes to a flat, variable-length buffer:
//! a one-byte shape tag, the value kind, then the shape payload. Sequence
//! sets add a bounding box and a relative offset table in front of the
//! concatenated sequence payloads, each payload padded to an 8-byte
//! boundary. The offsets let `SeqSetView` hand out the n-th sequence
//! without decoding the rest of the buffer, which is what the storage and
//! index layers rely on.
//!
//! All multi-byte integers are little-endian. The decoder never trusts the
//! input: every read is bounds-checked and short buffers surface as
//! [`TempoError::UnexpectedEof`].

use bytes::{BufMut, Bytes, BytesMut};
use geo::{Point, coord};
use smallvec::SmallVec;

use crate::error::{Result, TempoError};
use crate::instant::TInstant;
use crate::sequence::{Interp, TSequence};
use crate::seqset::TSequenceSet;
use crate::span::{Period, Span};
use crate::temporal::Temporal;
use crate::time::Timestamp;
use crate::value::{TValue, ValueKind};

const TAG_INSTANT: u8 = 1;
const TAG_SEQUENCE: u8 = 2;
const TAG_SEQUENCE_SET: u8 = 3;

const ALIGN: usize = 8;

/// Serialize any temporal shape.
pub fn encode(value: &Temporal) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    match value {
        Temporal::Instant(inst) => {
            buf.put_u8(TAG_INSTANT);
            buf.put_u8(kind_tag(inst.value.kind()));
            put_instant(&mut buf, inst);
        }
        Temporal::Sequence(seq) => {
            buf.put_u8(TAG_SEQUENCE);
            buf.put_u8(kind_tag(seq.value_kind()));
            put_sequence_body(&mut buf, seq);
        }
        Temporal::SequenceSet(set) => {
            buf.put_u8(TAG_SEQUENCE_SET);
            buf.put_u8(kind_tag(set.value_kind()));
            put_sequence_set_body(&mut buf, set);
        }
    }
    buf.freeze()
}

/// Deserialize any temporal shape.
pub fn decode(buf: &[u8]) -> Result<Temporal> {
    let mut r = Reader::new(buf);
    let tag = r.u8()?;
    let kind = kind_from_tag(r.u8()?)?;
    match tag {
        TAG_INSTANT => Ok(Temporal::Instant(r.instant(kind)?)),
        TAG_SEQUENCE => Ok(Temporal::Sequence(r.sequence_body(kind)?)),
        TAG_SEQUENCE_SET => {
            let view = SeqSetView::parse_body(kind, r)?;
            Ok(Temporal::SequenceSet(view.to_owned()?))
        }
        other => {
            log::warn!("Rejecting buffer with unknown shape tag {other}");
            Err(TempoError::InvalidFormat(format!(
                "unknown shape tag {other}"
            )))
        }
    }
}

pub fn encode_sequence_set(set: &TSequenceSet) -> Bytes {
    encode(&Temporal::SequenceSet(set.clone()))
}

/// Zero-copy reader over an encoded sequence set.
///
/// Parsing the view only touches the fixed header and the offset table;
/// individual sequences decode on demand through [`SeqSetView::sequence`].
#[derive(Debug)]
pub struct SeqSetView<'a> {
    kind: ValueKind,
    interp: Interp,
    count: usize,
    bbox_period: Period,
    // offset table and payload region, offsets relative to payload start
    offsets: &'a [u8],
    payload: &'a [u8],
}

impl<'a> SeqSetView<'a> {
    /// Parse the header of a buffer produced by [`encode_sequence_set`].
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(buf);
        let tag = r.u8()?;
        if tag != TAG_SEQUENCE_SET {
            return Err(TempoError::InvalidFormat(format!(
                "expected a sequence set buffer, found shape tag {tag}"
            )));
        }
        let kind = kind_from_tag(r.u8()?)?;
        Self::parse_body(kind, r)
    }

    fn parse_body(kind: ValueKind, mut r: Reader<'a>) -> Result<Self> {
        let interp = interp_from_tag(r.u8()?)?;
        let count = r.u32()? as usize;
        if count == 0 {
            return Err(TempoError::InvalidFormat(
                "sequence set buffer holds zero sequences".into(),
            ));
        }
        let bbox_period = r.period()?;
        r.skip_bbox_extent()?;
        let offsets = r.take(count * 4)?;
        r.align()?;
        let payload = r.rest();
        Ok(SeqSetView {
            kind,
            interp,
            count,
            bbox_period,
            offsets,
            payload,
        })
    }

    pub fn value_kind(&self) -> ValueKind {
        self.kind
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    pub fn num_sequences(&self) -> usize {
        self.count
    }

    /// Time extent straight from the header, no sequence decoding.
    pub fn period(&self) -> Period {
        self.bbox_period
    }

    /// Decode the n-th sequence only.
    pub fn sequence(&self, n: usize) -> Result<TSequence> {
        if n >= self.count {
            return Err(TempoError::InvalidArgument(format!(
                "sequence index {n} out of range for a set of {}",
                self.count
            )));
        }
        let off = u32::from_le_bytes(self.offsets[n * 4..n * 4 + 4].try_into().unwrap()) as usize;
        if off > self.payload.len() {
            return Err(TempoError::UnexpectedEof);
        }
        let mut r = Reader::new(&self.payload[off..]);
        r.sequence_body(self.kind)
    }

    /// Decode the whole set.
    pub fn to_owned(&self) -> Result<TSequenceSet> {
        let mut sequences = Vec::with_capacity(self.count);
        for n in 0..self.count {
            sequences.push(self.sequence(n)?);
        }
        TSequenceSet::new(sequences, false)
    }
}

fn kind_tag(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Bool => 0,
        ValueKind::Int => 1,
        ValueKind::Float => 2,
        ValueKind::Text => 3,
        ValueKind::Point => 4,
        ValueKind::DoubleN => 5,
    }
}

fn kind_from_tag(tag: u8) -> Result<ValueKind> {
    match tag {
        0 => Ok(ValueKind::Bool),
        1 => Ok(ValueKind::Int),
        2 => Ok(ValueKind::Float),
        3 => Ok(ValueKind::Text),
        4 => Ok(ValueKind::Point),
        5 => Ok(ValueKind::DoubleN),
        other => Err(TempoError::InvalidFormat(format!(
            "unknown value kind tag {other}"
        ))),
    }
}

fn interp_tag(interp: Interp) -> u8 {
    match interp {
        Interp::Discrete => 0,
        Interp::Stepwise => 1,
        Interp::Linear => 2,
    }
}

fn interp_from_tag(tag: u8) -> Result<Interp> {
    match tag {
        0 => Ok(Interp::Discrete),
        1 => Ok(Interp::Stepwise),
        2 => Ok(Interp::Linear),
        other => Err(TempoError::InvalidFormat(format!(
            "unknown interpolation tag {other}"
        ))),
    }
}

fn put_value(buf: &mut BytesMut, value: &TValue) {
    match value {
        TValue::Bool(v) => buf.put_u8(*v as u8),
        TValue::Int(v) => buf.put_i64_le(*v),
        TValue::Float(v) => buf.put_f64_le(*v),
        TValue::Text(s) => {
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        TValue::Point(p) => {
            buf.put_f64_le(p.x());
            buf.put_f64_le(p.y());
        }
        TValue::DoubleN(vs) => {
            buf.put_u8(vs.len() as u8);
            for v in vs {
                buf.put_f64_le(*v);
            }
        }
    }
}

fn put_instant(buf: &mut BytesMut, inst: &TInstant) {
    buf.put_i64_le(inst.t.as_micros());
    put_value(buf, &inst.value);
}

// flags byte: bit0 lower_inc, bit1 upper_inc, bits 2-3 interpolation
fn put_sequence_body(buf: &mut BytesMut, seq: &TSequence) {
    let flags = seq.lower_inc() as u8
        | (seq.upper_inc() as u8) << 1
        | interp_tag(seq.interp()) << 2;
    buf.put_u8(flags);
    buf.put_u32_le(seq.num_instants() as u32);
    for inst in seq.instants() {
        put_instant(buf, inst);
    }
}

fn put_sequence_set_body(buf: &mut BytesMut, set: &TSequenceSet) {
    buf.put_u8(interp_tag(set.interp()));
    buf.put_u32_le(set.num_sequences() as u32);
    put_bbox(buf, set);

    // encode sequence payloads first to learn their aligned offsets
    let mut payload = BytesMut::new();
    let mut offsets = Vec::with_capacity(set.num_sequences());
    for seq in set.sequences() {
        while payload.len() % ALIGN != 0 {
            payload.put_u8(0);
        }
        offsets.push(payload.len() as u32);
        put_sequence_body(&mut payload, seq);
    }

    for off in offsets {
        buf.put_u32_le(off);
    }
    while buf.len() % ALIGN != 0 {
        buf.put_u8(0);
    }
    buf.put_slice(&payload);
}

fn put_bbox(buf: &mut BytesMut, set: &TSequenceSet) {
    let bbox = set.bbox();
    put_period(buf, &bbox.period);
    match (&bbox.value, &bbox.space) {
        (Some(span), _) => {
            buf.put_u8(1);
            buf.put_f64_le(span.lower);
            buf.put_f64_le(span.upper);
            buf.put_u8(span.lower_inc as u8 | (span.upper_inc as u8) << 1);
        }
        (None, Some(rect)) => {
            buf.put_u8(2);
            buf.put_f64_le(rect.min().x);
            buf.put_f64_le(rect.min().y);
            buf.put_f64_le(rect.max().x);
            buf.put_f64_le(rect.max().y);
        }
        (None, None) => buf.put_u8(0),
    }
}

fn put_period(buf: &mut BytesMut, period: &Period) {
    buf.put_i64_le(period.lower.as_micros());
    buf.put_i64_le(period.upper.as_micros());
    buf.put_u8(period.lower_inc as u8 | (period.upper_inc as u8) << 1);
}

/// Bounds-checked cursor over an input buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(TempoError::UnexpectedEof);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn align(&mut self) -> Result<()> {
        while self.pos % ALIGN != 0 {
            self.u8()?;
        }
        Ok(())
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn period(&mut self) -> Result<Period> {
        let lower = Timestamp::from_micros(self.i64()?);
        let upper = Timestamp::from_micros(self.i64()?);
        let flags = self.u8()?;
        Span::new(lower, upper, flags & 1 != 0, flags & 2 != 0)
    }

    fn skip_bbox_extent(&mut self) -> Result<()> {
        match self.u8()? {
            0 => Ok(()),
            1 => {
                self.take(17)?;
                Ok(())
            }
            2 => {
                self.take(32)?;
                Ok(())
            }
            other => Err(TempoError::InvalidFormat(format!(
                "unknown bounding-box extent tag {other}"
            ))),
        }
    }

    fn value(&mut self, kind: ValueKind) -> Result<TValue> {
        match kind {
            ValueKind::Bool => Ok(TValue::Bool(self.u8()? != 0)),
            ValueKind::Int => Ok(TValue::Int(self.i64()?)),
            ValueKind::Float => Ok(TValue::Float(self.f64()?)),
            ValueKind::Text => {
                let len = self.u32()? as usize;
                let raw = self.take(len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| TempoError::InvalidFormat("text payload is not UTF-8".into()))?;
                Ok(TValue::Text(s.to_owned()))
            }
            ValueKind::Point => {
                let x = self.f64()?;
                let y = self.f64()?;
                Ok(TValue::Point(Point(coord! { x: x, y: y })))
            }
            ValueKind::DoubleN => {
                let n = self.u8()? as usize;
                let mut vs = SmallVec::with_capacity(n);
                for _ in 0..n {
                    vs.push(self.f64()?);
                }
                Ok(TValue::DoubleN(vs))
            }
        }
    }

    fn instant(&mut self, kind: ValueKind) -> Result<TInstant> {
        let t = Timestamp::from_micros(self.i64()?);
        let value = self.value(kind)?;
        Ok(TInstant::new(value, t))
    }

    fn sequence_body(&mut self, kind: ValueKind) -> Result<TSequence> {
        let flags = self.u8()?;
        let interp = interp_from_tag(flags >> 2)?;
        let count = self.u32()? as usize;
        let mut instants = Vec::with_capacity(count);
        for _ in 0..count {
            instants.push(self.instant(kind)?);
        }
        TSequence::new(instants, interp, flags & 1 != 0, flags & 2 != 0)
    }
}
