//! Lock model: per-endpoint lock state and rank comparison.
//!
//! ## Ranks
//!
//! | Lock | Rank | Writable by propagation | Set by |
//! |------|------|-------------------------|--------|
//! | `undefined` | 0 | yes | nobody (initial) |
//! | `unlocked` | 0 | yes | user (clear) |
//! | `auto` | 0 | yes | propagation |
//! | `soft` | 1 | no | soft derivation |
//! | `hard` | 2 | no | user |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::segment::{Segment, SegmentKind};

/// Lock state of a temporal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// Never set.
    #[default]
    Undefined,
    /// Explicitly cleared by the user.
    Unlocked,
    /// Written by propagation.
    Auto,
    /// Derived from two hard-locked sibling fields.
    Soft,
    /// Pinned by the user.
    Hard,
}

impl LockState {
    /// Rank used for every precedence comparison.
    pub fn rank(self) -> u8 {
        match self {
            Self::Undefined | Self::Unlocked | Self::Auto => 0,
            Self::Soft => 1,
            Self::Hard => 2,
        }
    }

    /// Whether propagation may overwrite a field holding this lock.
    pub fn is_writable(self) -> bool {
        self.rank() <= Self::Auto.rank()
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Unlocked => write!(f, "unlocked"),
            Self::Auto => write!(f, "auto"),
            Self::Soft => write!(f, "soft"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

/// A timestamp plus its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Endpoint {
    /// UTC timestamp, if known.
    pub utc: Option<DateTime<Utc>>,
    /// Lock state.
    #[serde(default)]
    pub lock: LockState,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(utc: Option<DateTime<Utc>>, lock: LockState) -> Self {
        Self { utc, lock }
    }

    /// A user-pinned endpoint.
    pub fn hard(utc: DateTime<Utc>) -> Self {
        Self::new(Some(utc), LockState::Hard)
    }

    /// A propagation-written endpoint.
    pub fn auto(utc: DateTime<Utc>) -> Self {
        Self::new(Some(utc), LockState::Auto)
    }

    /// Whether propagation may overwrite this endpoint.
    pub fn is_writable(&self) -> bool {
        self.lock.is_writable()
    }

    /// Whether this endpoint has a timestamp and a lock of at least `soft`.
    pub fn is_pinned(&self) -> bool {
        self.utc.is_some() && self.lock.rank() >= LockState::Soft.rank()
    }

    /// Rank of the lock.
    pub fn rank(&self) -> u8 {
        self.lock.rank()
    }
}

/// Duration in hours plus its lock.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DurationField {
    /// Length in hours, if known.
    pub val: Option<f64>,
    /// Lock state.
    #[serde(default)]
    pub lock: LockState,
}

impl DurationField {
    /// Create a duration field.
    pub fn new(val: Option<f64>, lock: LockState) -> Self {
        Self { val, lock }
    }

    /// A user-pinned duration.
    pub fn hard(hours: f64) -> Self {
        Self::new(Some(hours), LockState::Hard)
    }

    /// An unlocked duration hint, used by propagation but freely overwritable.
    pub fn unlocked(hours: f64) -> Self {
        Self::new(Some(hours), LockState::Unlocked)
    }
}

/// Longest duration a user may enter for one segment (a leap year).
pub const MAX_SEGMENT_HOURS: f64 = 24.0 * 366.0;

/// Convert fractional hours to a millisecond-precision duration.
///
/// `None` when the value is not finite or does not fit a `Duration`.
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    let millis = (hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Shift a timestamp by fractional hours, `None` on overflow.
pub fn shift_by_hours(utc: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    utc.checked_add_signed(hours_to_duration(hours)?)
}

/// Convert a duration to fractional hours.
pub fn duration_to_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.0
}

/// Re-derive the soft field of a stop.
///
/// With exactly two of `start`, `end`, `duration` hard-locked, the third is
/// computed from them and marked `soft`. With zero or one hard field every
/// `soft` field is retracted to `unlocked`. Non-stops are returned unchanged.
pub fn derive_soft_field(segment: &Segment) -> Segment {
    let mut seg = segment.clone();
    if !matches!(seg.kind, SegmentKind::Stop) {
        return seg;
    }

    let start = seg.start.utc.filter(|_| seg.start.lock == LockState::Hard);
    let end = seg.end.utc.filter(|_| seg.end.lock == LockState::Hard);
    let hours = seg.duration.val.filter(|_| seg.duration.lock == LockState::Hard);

    let derived = match (start, end, hours) {
        (Some(start), Some(end), None) => {
            seg.duration = DurationField::new(Some(duration_to_hours(end - start)), LockState::Soft);
            true
        }
        (Some(start), None, Some(hours)) => match shift_by_hours(start, hours) {
            Some(end) => {
                seg.end = Endpoint::new(Some(end), LockState::Soft);
                true
            }
            None => false,
        },
        (None, Some(end), Some(hours)) => match shift_by_hours(end, -hours) {
            Some(start) => {
                seg.start = Endpoint::new(Some(start), LockState::Soft);
                true
            }
            None => false,
        },
        (Some(_), Some(_), Some(_)) => true,
        _ => false,
    };

    if !derived {
        if seg.start.lock == LockState::Soft {
            seg.start.lock = LockState::Unlocked;
        }
        if seg.end.lock == LockState::Soft {
            seg.end.lock = LockState::Unlocked;
        }
        if seg.duration.lock == LockState::Soft {
            seg.duration.lock = LockState::Unlocked;
        }
    }

    seg
}
