//! Timestamps, durations, and time base conversion.
//!
//! Presentation times are stored as integer ticks against a rational
//! time base so that rescaling between track clocks stays exact.

use std::cmp::Ordering;
use std::fmt;

use crate::rational::Rational;

/// Sentinel tick value for an unset timestamp.
const NONE_VALUE: i64 = i64::MIN;

/// A time base expressed as seconds per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase {
    /// Numerator of the seconds-per-tick fraction.
    pub num: u32,
    /// Denominator of the seconds-per-tick fraction.
    pub den: u32,
}

impl TimeBase {
    /// Microsecond time base (1/1,000,000).
    pub const MICROSECONDS: Self = Self {
        num: 1,
        den: 1_000_000,
    };

    /// Millisecond time base (1/1,000).
    pub const MILLISECONDS: Self = Self { num: 1, den: 1_000 };

    /// MPEG 90 kHz time base.
    pub const MPEG: Self = Self { num: 1, den: 90_000 };

    /// Create a new time base.
    #[must_use]
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Time base for a given frame rate (one tick per frame).
    #[must_use]
    pub fn from_frame_rate(rate: Rational) -> Self {
        Self {
            num: rate.den.unsigned_abs(),
            den: rate.num.unsigned_abs().max(1),
        }
    }

    /// Seconds represented by one tick.
    #[must_use]
    pub fn tick_seconds(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            f64::from(self.num) / f64::from(self.den)
        }
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// A presentation or decode timestamp in a specific time base.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    /// Tick count, or the unset sentinel.
    pub value: i64,
    /// Time base the ticks are counted in.
    pub base: TimeBase,
}

impl Timestamp {
    /// Create a timestamp.
    #[must_use]
    pub const fn new(value: i64, base: TimeBase) -> Self {
        Self { value, base }
    }

    /// An unset timestamp.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: NONE_VALUE,
            base: TimeBase::MICROSECONDS,
        }
    }

    /// Whether the timestamp carries a real value.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.value != NONE_VALUE && self.base.den != 0
    }

    /// Rescale into another time base, rounding to nearest.
    #[must_use]
    pub fn rescale(&self, target: TimeBase) -> Self {
        if !self.is_valid() || target.den == 0 {
            return Self {
                value: NONE_VALUE,
                base: target,
            };
        }
        // value * (num/den) / (t_num/t_den) in 128-bit to avoid overflow.
        let num = i128::from(self.value) * i128::from(self.base.num) * i128::from(target.den);
        let den = i128::from(self.base.den) * i128::from(target.num).max(1);
        let rounded = (num + den / 2).div_euclid(den);
        Self {
            value: rounded as i64,
            base: target,
        }
    }

    /// The timestamp in seconds, or `None` if unset.
    #[must_use]
    pub fn as_secs_f64(&self) -> Option<f64> {
        if self.is_valid() {
            Some(self.value as f64 * self.base.tick_seconds())
        } else {
            None
        }
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Timestamp {
    /// Compare across time bases by cross-multiplying tick counts.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let lhs = i128::from(self.value) * i128::from(self.base.num) * i128::from(other.base.den);
        let rhs = i128::from(other.value) * i128::from(other.base.num) * i128::from(self.base.den);
        lhs.partial_cmp(&rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}@{}", self.value, self.base)
        } else {
            write!(f, "NONE")
        }
    }
}

/// A span of media time in a specific time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// Tick count.
    pub value: i64,
    /// Time base the ticks are counted in.
    pub base: TimeBase,
}

impl Duration {
    /// Create a duration.
    #[must_use]
    pub const fn new(value: i64, base: TimeBase) -> Self {
        Self { value, base }
    }

    /// The zero duration.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            value: 0,
            base: TimeBase::MICROSECONDS,
        }
    }

    /// Duration from a second count.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            value: (secs * 1_000_000.0).round() as i64,
            base: TimeBase::MICROSECONDS,
        }
    }

    /// The duration in seconds.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 * self.base.tick_seconds()
    }

    /// Rescale into another time base, rounding to nearest.
    #[must_use]
    pub fn rescale(&self, target: TimeBase) -> Self {
        let ts = Timestamp::new(self.value, self.base).rescale(target);
        Self {
            value: if ts.is_valid() { ts.value } else { 0 },
            base: target,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}
