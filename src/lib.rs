//! Temporal-value algebra engine: values that vary over time, with restriction,
//! synchronization, merge, and aggregation operators across three temporal
//! shapes (instant, sequence, sequence set) and three interpolation modes.
//!
//! ```rust
//! use tempo::{Interp, TInstant, TSequence, TValue, Timestamp};
//!
//! let speed = TSequence::new(
//!     vec![
//!         TInstant::new(TValue::Float(0.0), Timestamp::from_secs(0)),
//!         TInstant::new(TValue::Float(30.0), Timestamp::from_secs(60)),
//!     ],
//!     Interp::Linear,
//!     true,
//!     true,
//! )?;
//!
//! assert_eq!(
//!     speed.value_at(Timestamp::from_secs(30), true),
//!     Some(TValue::Float(15.0))
//! );
//! # Ok::<(), tempo::TempoError>(())
//! ```

pub mod agg;
pub mod bbox;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod instant;
pub mod sequence;
pub mod seqset;
pub mod span;
pub mod spanset;
pub mod temporal;
pub mod time;
pub mod value;

pub use error::{Result, TempoError};

pub use geo::{Point, Rect};

pub use time::{TimeDelta, Timestamp};

pub use span::{Period, Span, SpanBound};

pub use spanset::{PeriodSet, SpanSet};

pub use value::{TValue, ValueKind};

pub use bbox::TBox;

pub use instant::TInstant;

pub use sequence::{Appended, Interp, TSequence};

pub use seqset::TSequenceSet;

pub use temporal::Temporal;

pub use buffer::SeqSetBuffer;

pub use codec::{SeqSetView, decode, encode};

pub use agg::TAvgState;

pub use config::Config;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Result, TempoError};

    pub use crate::{TimeDelta, Timestamp};

    pub use crate::{Period, PeriodSet, Span, SpanSet};

    pub use crate::{TValue, ValueKind};

    pub use crate::{Appended, Interp, TInstant, TSequence, TSequenceSet, Temporal};

    pub use crate::{Config, SeqSetBuffer, SeqSetView, TAvgState, TBox};

    pub use geo::{Point, Rect};
}
